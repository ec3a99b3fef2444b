//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console, plus an optional log file)
//! - A startup summary of the resolver configuration

use std::fs::File;

use anyhow::Result;
use simplelog::*;

use crate::core::config::{Config, DirectoryStrategy};

/// Initialize logger for console and, when `log_file_path` is set, file output
///
/// # Arguments
/// * `level` - Minimum level to emit
/// * `log_file_path` - Optional path to the log file (created/truncated)
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Log file could not be created or a logger is already set
pub fn init_logger(level: LevelFilter, log_file_path: Option<&str>) -> Result<()> {
    let config = ConfigBuilder::new()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("reqwest")
        .add_filter_ignore_str("h2")
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    if let Some(path) = log_file_path {
        let log_file = File::create(path).map_err(|e| anyhow::anyhow!("Failed to create log file {}: {}", path, e))?;
        loggers.push(WriteLogger::new(level, config, log_file));
    }

    CombinedLogger::init(loggers).map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the resolver and directory configuration at startup
///
/// Warns when the static list could outlive the resolve deadline if every
/// instance times out.
pub fn log_resolver_configuration(config: &Config) {
    let resolver = &config.resolver;
    let directory = &config.directory;

    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("🔗 Resolver configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!(
        "Attempt timeout: {}s, resolve deadline: {}s",
        resolver.attempt_timeout.as_secs(),
        resolver.deadline.as_secs()
    );
    log::info!("Codec: {}, filename style: {}", resolver.video_codec, resolver.filename_style);
    match &resolver.origin {
        Some(origin) => log::info!("Origin/Referer: {}", origin),
        None => log::info!("Origin/Referer: disabled"),
    }

    match directory.strategy {
        DirectoryStrategy::Static => {
            log::info!("Directory: static, {} instance(s)", directory.static_instances.len());
            for instance in &directory.static_instances {
                log::info!("  • {} (protocol {})", instance, instance.version());
            }
            let worst_case = config.worst_case_static_latency();
            if worst_case > resolver.deadline {
                log::warn!(
                    "⚠️  {} instance(s) × {}s timeout = {}s exceeds the {}s resolve deadline; trailing instances may be skipped",
                    directory.static_instances.len(),
                    resolver.attempt_timeout.as_secs(),
                    worst_case.as_secs(),
                    resolver.deadline.as_secs()
                );
            }
        }
        DirectoryStrategy::Dynamic => {
            log::info!("Directory: dynamic via {}", directory.monitor_url);
            log::info!(
                "  min score {}, version prefix '{}', cache {}s",
                directory.min_score,
                directory.version_prefix,
                directory.cache_ttl.as_secs()
            );
        }
    }
    log::info!("Fallback instance: {}", directory.fallback);
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
