//! Instance directory: decides which resolver instances a resolution tries.
//!
//! Two strategies, selected by configuration:
//! - `StaticDirectory`: fixed hand-maintained list, same order every call
//! - `MonitoredDirectory`: healthy instances reported by a public monitoring
//!   endpoint, shuffled per call, with a hardcoded fallback instance
//!
//! Neither ever fails or returns an empty list.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use rand::seq::SliceRandom;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use super::instance::{ApiVersion, Instance, InstanceList};
use crate::core::config::{DirectoryConfig, DirectoryStrategy};
use crate::core::error::AppResult;
use crate::core::metrics;

/// Source of candidate instances for one resolution.
#[async_trait]
pub trait InstanceDirectory: Send + Sync {
    /// Short strategy name for logs
    fn name(&self) -> &str;

    /// Candidates in trial order. Never empty.
    async fn list_candidates(&self) -> InstanceList;
}

/// Builds the directory selected by `config.strategy`.
pub fn build_directory(config: &DirectoryConfig) -> AppResult<Arc<dyn InstanceDirectory>> {
    let directory: Arc<dyn InstanceDirectory> = match config.strategy {
        DirectoryStrategy::Static => Arc::new(StaticDirectory::new(
            config.static_instances.clone(),
            config.fallback.clone(),
        )),
        DirectoryStrategy::Dynamic => Arc::new(MonitoredDirectory::new(config)?),
    };
    log::info!("Instance directory: {}", directory.name());
    Ok(directory)
}

/// Fixed list, consulted in the same order every call.
pub struct StaticDirectory {
    instances: InstanceList,
}

impl StaticDirectory {
    /// An empty list degrades to `fallback` alone.
    pub fn new(instances: InstanceList, fallback: Instance) -> Self {
        let instances = if instances.is_empty() { vec![fallback] } else { instances };
        Self { instances }
    }
}

#[async_trait]
impl InstanceDirectory for StaticDirectory {
    fn name(&self) -> &str {
        "static"
    }

    async fn list_candidates(&self) -> InstanceList {
        self.instances.clone()
    }
}

/// One record of the monitoring endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthRecord {
    pub url: String,
    #[serde(default)]
    pub score: f64,
    /// `0`/`1` on the wire; some monitors send a boolean
    #[serde(default)]
    pub cors: serde_json::Value,
    #[serde(default)]
    pub version: String,
}

impl HealthRecord {
    pub fn cors_enabled(&self) -> bool {
        match &self.cors {
            serde_json::Value::Bool(flag) => *flag,
            serde_json::Value::Number(n) => n.as_i64() == Some(1),
            _ => false,
        }
    }
}

/// Filter applied to monitoring records.
#[derive(Debug, Clone)]
pub struct EligibilityRules {
    pub min_score: f64,
    pub version_prefix: String,
    pub excluded: Vec<String>,
}

impl EligibilityRules {
    fn from_config(config: &DirectoryConfig) -> Self {
        Self {
            min_score: config.min_score,
            version_prefix: config.version_prefix.clone(),
            excluded: config.excluded.clone(),
        }
    }

    /// Instance for `record` if it passes every rule: https, score, cors,
    /// version prefix, not excluded.
    pub fn admit(&self, record: &HealthRecord) -> Option<Instance> {
        if record.score < self.min_score || !record.cors_enabled() {
            return None;
        }
        if !record.version.starts_with(&self.version_prefix) {
            return None;
        }
        let version = ApiVersion::from_version_string(&record.version)?;
        let instance = Instance::parse(&format!("{}|{}", record.url.trim(), version)).ok()?;
        if self.excluded.iter().any(|excluded| instance.same_endpoint(excluded)) {
            return None;
        }
        Some(instance)
    }
}

/// Decodes monitor records one by one; a malformed record is skipped.
pub fn parse_records(raw: Vec<serde_json::Value>) -> Vec<HealthRecord> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<HealthRecord>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                log::debug!("Skipping malformed monitor record: {}", e);
                None
            }
        })
        .collect()
}

/// Eligible instances in record order, without duplicates.
pub fn eligible_instances(records: &[HealthRecord], rules: &EligibilityRules) -> InstanceList {
    let mut eligible: InstanceList = Vec::new();
    for instance in records.iter().filter_map(|record| rules.admit(record)) {
        if !eligible.iter().any(|known| known.same_endpoint(instance.id())) {
            eligible.push(instance);
        }
    }
    eligible
}

/// Reasons the monitor could not supply candidates; all end in the fallback.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("monitor request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("monitor returned HTTP {0}")]
    Status(StatusCode),

    #[error("none of {0} monitored instance(s) passed the health filter")]
    NoneEligible(usize),
}

/// Healthy instances discovered through the monitoring endpoint.
///
/// All eligible instances are returned, shuffled, so concurrent users start
/// at different instances and still fall through the rest in order.
pub struct MonitoredDirectory {
    client: reqwest::Client,
    monitor_url: Url,
    rules: EligibilityRules,
    fallback: Instance,
    cache: Option<Cache<(), Arc<InstanceList>>>,
}

impl MonitoredDirectory {
    pub fn new(config: &DirectoryConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.monitor_timeout)
            .user_agent(concat!("vidrelay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = (!config.cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(1)
                .time_to_live(config.cache_ttl)
                .build()
        });

        Ok(Self {
            client,
            monitor_url: config.monitor_url.clone(),
            rules: EligibilityRules::from_config(config),
            fallback: config.fallback.clone(),
            cache,
        })
    }

    async fn fetch_eligible(&self) -> Result<Arc<InstanceList>, MonitorError> {
        let response = self.client.get(self.monitor_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::Status(status));
        }

        let raw: Vec<serde_json::Value> = response.json().await?;
        let records = parse_records(raw);
        let eligible = eligible_instances(&records, &self.rules);
        log::info!(
            "Instance monitor reported {} instance(s), {} eligible",
            records.len(),
            eligible.len()
        );

        if eligible.is_empty() {
            return Err(MonitorError::NoneEligible(records.len()));
        }
        Ok(Arc::new(eligible))
    }

    /// Concurrent callers share one in-flight fetch; failures are not cached.
    async fn eligible(&self) -> Result<Arc<InstanceList>, Arc<MonitorError>> {
        match &self.cache {
            Some(cache) => cache.try_get_with((), self.fetch_eligible()).await,
            None => self.fetch_eligible().await.map_err(Arc::new),
        }
    }
}

#[async_trait]
impl InstanceDirectory for MonitoredDirectory {
    fn name(&self) -> &str {
        "dynamic"
    }

    async fn list_candidates(&self) -> InstanceList {
        match self.eligible().await {
            Ok(eligible) => {
                let mut candidates = eligible.as_ref().clone();
                candidates.shuffle(&mut rand::rng());
                candidates
            }
            Err(e) => {
                log::warn!("Instance monitor unavailable ({}); falling back to {}", e, self.fallback);
                metrics::DIRECTORY_FALLBACKS_TOTAL.inc();
                vec![self.fallback.clone()]
            }
        }
    }
}
