//! Resolution across multiple unreliable resolver instances.
//!
//! [`Resolver::resolve`] walks the candidate list strictly in order, one
//! bounded attempt per instance, and stops at the first direct link. Every
//! failed attempt leaves exactly one line in the [`FailureReport`].

pub mod directory;
pub mod instance;
pub mod payload;

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER};
use reqwest::StatusCode;
use tokio::time::{timeout, Instant};
use url::Url;

use crate::core::config::ResolverConfig;
use crate::core::error::{AppError, AppResult};
use crate::core::metrics;

pub use directory::{InstanceDirectory, MonitoredDirectory, StaticDirectory};
pub use instance::{ApiVersion, Instance, InstanceList};
pub use payload::{RequestBody, ResolverResponsePayload};

/// Why a single instance attempt produced no link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// DNS, connect or read failure
    Unreachable(String),
    /// No response within the attempt timeout
    TimedOut(Duration),
    /// Non-success HTTP status
    Rejected(StatusCode),
    /// 2xx with a body that is not a resolver payload
    Malformed(String),
    /// Valid payload without an extractable link
    NoLink(String),
    /// Not attempted, the total resolve deadline was already spent
    DeadlineReached,
}

impl FailureReason {
    /// Label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FailureReason::Unreachable(_) => "unreachable",
            FailureReason::TimedOut(_) => "timeout",
            FailureReason::Rejected(_) => "rejected",
            FailureReason::Malformed(_) => "malformed",
            FailureReason::NoLink(_) => "no_link",
            FailureReason::DeadlineReached => "deadline",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Unreachable(err) => write!(f, "{}", err),
            FailureReason::TimedOut(after) => write!(f, "timed out after {:.1}s", after.as_secs_f64()),
            FailureReason::Rejected(status) => write!(f, "HTTP {}", status),
            FailureReason::Malformed(err) => write!(f, "malformed response: {}", err),
            FailureReason::NoLink(what) => write!(f, "no usable link ({})", what),
            FailureReason::DeadlineReached => write!(f, "skipped, resolve deadline reached"),
        }
    }
}

/// One diagnostic line: which instance failed and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub instance: String,
    pub reason: FailureReason,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.instance, self.reason)
    }
}

/// Failed attempts in attempt order; renders as one line per attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureReport {
    attempts: Vec<AttemptFailure>,
}

impl FailureReport {
    pub fn attempts(&self) -> &[AttemptFailure] {
        &self.attempts
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    fn record(&mut self, instance: &Instance, reason: FailureReason) {
        log::warn!("Resolver instance {} failed: {}", instance, reason);
        metrics::INSTANCE_ATTEMPTS_TOTAL.with_label_values(&[reason.kind()]).inc();
        self.attempts.push(AttemptFailure {
            instance: instance.id().to_string(),
            reason,
        });
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, attempt) in self.attempts.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", attempt)?;
        }
        Ok(())
    }
}

/// Result of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// First usable link; `failed_before` lists the instances that failed first
    Success { direct_url: Url, failed_before: FailureReport },
    /// Every candidate failed
    Failure(FailureReport),
}

impl ResolveOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ResolveOutcome::Success { .. })
    }

    pub fn direct_url(&self) -> Option<&Url> {
        match self {
            ResolveOutcome::Success { direct_url, .. } => Some(direct_url),
            ResolveOutcome::Failure(_) => None,
        }
    }

    /// Diagnostics recorded during the resolution, successful or not.
    pub fn report(&self) -> &FailureReport {
        match self {
            ResolveOutcome::Success { failed_before, .. } => failed_before,
            ResolveOutcome::Failure(report) => report,
        }
    }
}

/// Sends resolve requests to instances.
pub struct Resolver {
    client: reqwest::Client,
    config: ResolverConfig,
}

impl Resolver {
    /// Creates a resolver with its own HTTP client carrying the browser-like header set.
    pub fn new(config: ResolverConfig) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(origin) = &config.origin {
            let origin_value = HeaderValue::from_str(origin)
                .map_err(|e| AppError::Config(format!("Invalid resolver origin '{}': {}", origin, e)))?;
            let referer_value = HeaderValue::from_str(&format!("{}/", origin.trim_end_matches('/')))
                .map_err(|e| AppError::Config(format!("Invalid resolver origin '{}': {}", origin, e)))?;
            headers.insert(ORIGIN, origin_value);
            headers.insert(REFERER, referer_value);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Tries `candidates` in order and returns the first direct link.
    ///
    /// Never fails as a whole: individual attempt errors are recorded and the
    /// next instance is tried. Attempts are never retried or run in parallel.
    pub async fn resolve(&self, request_url: &str, candidates: &[Instance]) -> ResolveOutcome {
        let started = Instant::now();
        let mut report = FailureReport::default();

        log::info!("Resolving {} across {} instance(s)", request_url, candidates.len());

        for (idx, instance) in candidates.iter().enumerate() {
            let remaining = self.config.deadline.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                report.record(instance, FailureReason::DeadlineReached);
                continue;
            }
            let attempt_timeout = self.config.attempt_timeout.min(remaining);

            log::debug!(
                "Attempt {}/{} via {} (timeout {:?})",
                idx + 1,
                candidates.len(),
                instance,
                attempt_timeout
            );

            match self.attempt(instance, request_url, attempt_timeout).await {
                Ok(direct_url) => {
                    log::info!(
                        "Resolved {} via {} after {} failed attempt(s) in {:.2}s",
                        request_url,
                        instance,
                        report.len(),
                        started.elapsed().as_secs_f64()
                    );
                    metrics::INSTANCE_ATTEMPTS_TOTAL.with_label_values(&["success"]).inc();
                    return ResolveOutcome::Success {
                        direct_url,
                        failed_before: report,
                    };
                }
                Err(reason) => report.record(instance, reason),
            }
        }

        log::warn!(
            "All {} instance(s) failed for {} in {:.2}s",
            candidates.len(),
            request_url,
            started.elapsed().as_secs_f64()
        );
        ResolveOutcome::Failure(report)
    }

    /// One POST to one instance, bounded by `limit` end to end (including the body read).
    async fn attempt(&self, instance: &Instance, request_url: &str, limit: Duration) -> Result<Url, FailureReason> {
        let body = RequestBody::new(
            instance.version(),
            request_url,
            &self.config.video_codec,
            &self.config.filename_style,
        );
        let excerpt_len = self.config.error_excerpt_chars;

        let exchange = async {
            let response = self
                .client
                .post(instance.endpoint())
                .json(&body)
                .send()
                .await
                .map_err(|e| FailureReason::Unreachable(excerpt(&e.without_url().to_string(), excerpt_len)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FailureReason::Rejected(status));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| FailureReason::Unreachable(excerpt(&e.without_url().to_string(), excerpt_len)))?;
            let payload = ResolverResponsePayload::from_slice(&bytes)
                .map_err(|e| FailureReason::Malformed(excerpt(&e.to_string(), excerpt_len)))?;

            payload
                .direct_link()
                .ok_or_else(|| FailureReason::NoLink(payload.describe()))
        };

        match timeout(limit, exchange).await {
            Ok(result) => result,
            Err(_) => Err(FailureReason::TimedOut(limit)),
        }
    }
}

/// Truncates `text` to `max` characters, marking the cut.
fn excerpt(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}
