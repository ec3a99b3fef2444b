//! Application context
//!
//! Built once at process start and shared by reference (`Arc<App>`) with the
//! webhook server, the polling dispatcher and the CLI.

use std::sync::Arc;

use crate::core::config::Config;
use crate::core::error::AppResult;
use crate::core::metrics;
use crate::resolver::directory::{build_directory, InstanceDirectory};
use crate::resolver::{InstanceList, ResolveOutcome, Resolver};

pub struct App {
    config: Config,
    resolver: Resolver,
    directory: Arc<dyn InstanceDirectory>,
}

impl App {
    /// Builds the resolver and the configured instance directory.
    pub fn new(config: Config) -> AppResult<Self> {
        let resolver = Resolver::new(config.resolver.clone())?;
        let directory = build_directory(&config.directory)?;
        Ok(Self::from_parts(config, resolver, directory))
    }

    /// Assembles a context from prebuilt parts.
    pub fn from_parts(config: Config, resolver: Resolver, directory: Arc<dyn InstanceDirectory>) -> Self {
        Self {
            config,
            resolver,
            directory,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current candidate list from the directory.
    pub async fn candidates(&self) -> InstanceList {
        self.directory.list_candidates().await
    }

    /// Fetches candidates and resolves `url` across them.
    pub async fn resolve(&self, url: &str) -> ResolveOutcome {
        let timer = metrics::RESOLVE_DURATION_SECONDS.start_timer();
        let candidates = self.candidates().await;
        let outcome = self.resolver.resolve(url, &candidates).await;
        timer.observe_duration();

        let result = if outcome.is_success() { "success" } else { "failure" };
        metrics::RESOLVE_REQUESTS_TOTAL.with_label_values(&[result]).inc();
        outcome
    }
}
