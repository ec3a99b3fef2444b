//! Runtime configuration
//!
//! Everything is read once at startup from the process environment (after
//! `.env` has been loaded) into [`Config`], which is then owned by the
//! application context. Defaults live in the submodules below.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use strum::{Display, EnumString};
use url::Url;

use crate::core::error::{AppError, AppResult};
use crate::resolver::instance::{parse_instance_list, Instance, InstanceList};

/// HTTP front door defaults
pub mod server {
    /// Default listen address
    pub const BIND_ADDR: &str = "0.0.0.0";

    /// Default listen port
    pub const PORT: u16 = 8080;
}

/// Resolver request defaults
pub mod resolver {
    use super::Duration;

    /// Per-instance attempt timeout (in seconds)
    pub const ATTEMPT_TIMEOUT_SECS: u64 = 8;

    /// Total budget for the instance attempts of one resolution (in seconds)
    /// Covers resolver calls only; the monitor fetch and video delivery come on top
    pub const RESOLVE_DEADLINE_SECS: u64 = 50;

    /// Codec requested from instances; Telegram only previews h264 inline
    pub const VIDEO_CODEC: &str = "h264";

    /// Filename style requested from instances
    pub const FILENAME_STYLE: &str = "basic";

    /// Browser-like client identifier
    pub const USER_AGENT: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

    /// Public front-end of the resolver service, sent as Origin/Referer
    pub const ORIGIN: &str = "https://cobalt.tools";

    /// Max characters of a transport error kept in a diagnostic line
    pub const ERROR_EXCERPT_CHARS: usize = 120;

    /// Attempt timeout duration
    pub fn attempt_timeout() -> Duration {
        Duration::from_secs(ATTEMPT_TIMEOUT_SECS)
    }

    /// Resolve deadline duration
    pub fn deadline() -> Duration {
        Duration::from_secs(RESOLVE_DEADLINE_SECS)
    }
}

/// Instance directory defaults
pub mod directory {
    use super::Duration;

    /// Hand-maintained list used by the static strategy
    pub const STATIC_INSTANCES: &[&str] = &[
        "https://cobalt-api.kwiatekmiki.com",
        "https://cobalt-backend.canine.tools",
        "https://cobalt.255x.ru",
        "https://co.eepy.today|7",
    ];

    /// Monitoring endpoint listing public instances with health data
    pub const MONITOR_URL: &str = "https://instances.cobalt.best/instances.json";

    /// Monitoring request timeout (in seconds)
    pub const MONITOR_TIMEOUT_SECS: u64 = 5;

    /// Minimum health score (0.0-1.0) for an instance to be eligible
    pub const MIN_SCORE: f64 = 0.9;

    /// Supported protocol version prefix
    pub const VERSION_PREFIX: &str = "10.";

    /// Official endpoint; it answers bots with an interactive challenge
    pub const EXCLUDED_INSTANCES: &[&str] = &["https://api.cobalt.tools"];

    /// Used whenever the monitor is down or nothing passes the filter
    pub const FALLBACK_INSTANCE: &str = "https://cobalt-api.kwiatekmiki.com";

    /// How long a fetched instance list is reused (in seconds)
    pub const CACHE_TTL_SECS: u64 = 300;

    /// Monitoring timeout duration
    pub fn monitor_timeout() -> Duration {
        Duration::from_secs(MONITOR_TIMEOUT_SECS)
    }

    /// Cache TTL duration
    pub fn cache_ttl() -> Duration {
        Duration::from_secs(CACHE_TTL_SECS)
    }
}

/// Which instance directory strategy to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DirectoryStrategy {
    /// Fixed, hand-maintained list tried in order
    Static,
    /// Healthy instances discovered through the monitoring service
    #[default]
    Dynamic,
}

/// Settings for the outgoing resolve requests
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub attempt_timeout: Duration,
    pub deadline: Duration,
    pub video_codec: String,
    pub filename_style: String,
    pub user_agent: String,
    /// `None` disables the Origin/Referer pair
    pub origin: Option<String>,
    pub error_excerpt_chars: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: resolver::attempt_timeout(),
            deadline: resolver::deadline(),
            video_codec: resolver::VIDEO_CODEC.to_string(),
            filename_style: resolver::FILENAME_STYLE.to_string(),
            user_agent: resolver::USER_AGENT.to_string(),
            origin: Some(resolver::ORIGIN.to_string()),
            error_excerpt_chars: resolver::ERROR_EXCERPT_CHARS,
        }
    }
}

/// Settings for the instance directory
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub strategy: DirectoryStrategy,
    pub static_instances: InstanceList,
    pub monitor_url: Url,
    pub monitor_timeout: Duration,
    pub min_score: f64,
    pub version_prefix: String,
    pub excluded: Vec<String>,
    pub fallback: Instance,
    /// Zero disables caching
    pub cache_ttl: Duration,
}

impl DirectoryConfig {
    /// Built-in defaults.
    pub fn defaults() -> AppResult<Self> {
        Ok(Self {
            strategy: DirectoryStrategy::default(),
            static_instances: parse_instance_list(&directory::STATIC_INSTANCES.join(","))?,
            monitor_url: Url::parse(directory::MONITOR_URL)?,
            monitor_timeout: directory::monitor_timeout(),
            min_score: directory::MIN_SCORE,
            version_prefix: directory::VERSION_PREFIX.to_string(),
            excluded: directory::EXCLUDED_INSTANCES.iter().map(|s| s.to_string()).collect(),
            fallback: Instance::parse(directory::FALLBACK_INSTANCE)?,
            cache_ttl: directory::cache_ttl(),
        })
    }
}

/// Full process configuration
#[derive(Debug)]
pub struct Config {
    /// `None` only for commands that never talk to Telegram
    pub bot_token: Option<SecretString>,
    /// Custom (e.g. local) Bot API server
    pub bot_api_url: Option<Url>,
    pub listen_addr: SocketAddr,
    pub webhook_url: Option<Url>,
    pub webhook_secret: Option<SecretString>,
    pub log_level: log::LevelFilter,
    pub log_file: Option<String>,
    pub resolver: ResolverConfig,
    pub directory: DirectoryConfig,
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = get("BOT_TOKEN").or_else(|| get("TELOXIDE_TOKEN")).map(SecretString::from);

        let bot_api_url = get("BOT_API_URL").map(|v| Url::parse(&v)).transpose()?;

        let bind_ip: IpAddr = parse_var("BIND_ADDR", get("BIND_ADDR"), server::BIND_ADDR.parse().ok())?;
        let port: u16 = parse_var("PORT", get("PORT"), Some(server::PORT))?;

        let webhook_url = get("WEBHOOK_URL").map(|v| Url::parse(&v)).transpose()?;
        let webhook_secret = get("WEBHOOK_SECRET").map(SecretString::from);

        let log_level = parse_var("LOG_LEVEL", get("LOG_LEVEL"), Some(log::LevelFilter::Info))?;
        let log_file = get("LOG_FILE_PATH");

        let mut resolver = ResolverConfig::default();
        if let Some(secs) = get("ATTEMPT_TIMEOUT_SECS") {
            resolver.attempt_timeout = parse_positive_secs("ATTEMPT_TIMEOUT_SECS", secs)?;
        }
        if let Some(secs) = get("RESOLVE_DEADLINE_SECS") {
            resolver.deadline = parse_positive_secs("RESOLVE_DEADLINE_SECS", secs)?;
        }
        if let Some(ua) = get("RESOLVER_USER_AGENT") {
            resolver.user_agent = ua;
        }
        if let Some(origin) = lookup("RESOLVER_ORIGIN") {
            let origin = origin.trim().to_string();
            resolver.origin = (!origin.is_empty()).then_some(origin);
        }

        let mut directory = DirectoryConfig::defaults()?;
        if let Some(strategy) = get("INSTANCE_STRATEGY") {
            directory.strategy = DirectoryStrategy::from_str(&strategy)
                .map_err(|_| AppError::Config(format!("INSTANCE_STRATEGY must be static or dynamic, got '{}'", strategy)))?;
        }
        if let Some(list) = get("RESOLVER_INSTANCES") {
            directory.static_instances = parse_instance_list(&list)?;
            if directory.static_instances.is_empty() {
                return Err(AppError::Config("RESOLVER_INSTANCES is empty".to_string()));
            }
        }
        if let Some(url) = get("MONITOR_URL") {
            directory.monitor_url = Url::parse(&url)?;
        }
        if let Some(secs) = get("MONITOR_TIMEOUT_SECS") {
            directory.monitor_timeout = parse_positive_secs("MONITOR_TIMEOUT_SECS", secs)?;
        }
        if let Some(score) = get("MONITOR_MIN_SCORE") {
            directory.min_score = parse_var("MONITOR_MIN_SCORE", Some(score), None)?;
        }
        if let Some(prefix) = get("MONITOR_VERSION_PREFIX") {
            directory.version_prefix = prefix;
        }
        if let Some(secs) = get("MONITOR_CACHE_SECS") {
            directory.cache_ttl = Duration::from_secs(parse_var("MONITOR_CACHE_SECS", Some(secs), None)?);
        }
        if let Some(excluded) = get("EXCLUDED_INSTANCES") {
            directory.excluded = excluded
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(fallback) = get("FALLBACK_INSTANCE") {
            directory.fallback = Instance::parse(&fallback)?;
        }

        Ok(Self {
            bot_token,
            bot_api_url,
            listen_addr: SocketAddr::new(bind_ip, port),
            webhook_url,
            webhook_secret,
            log_level,
            log_file,
            resolver,
            directory,
        })
    }

    /// Returns the bot token or a fatal configuration error.
    pub fn require_bot_token(&self) -> AppResult<&SecretString> {
        self.bot_token
            .as_ref()
            .ok_or_else(|| AppError::Config("BOT_TOKEN environment variable not set".to_string()))
    }

    /// Worst-case time the static list can take if every instance times out.
    pub fn worst_case_static_latency(&self) -> Duration {
        let count = u32::try_from(self.directory.static_instances.len()).unwrap_or(u32::MAX);
        self.resolver.attempt_timeout.saturating_mul(count)
    }
}

/// Parses a whole number of seconds that must be greater than zero.
fn parse_positive_secs(key: &str, raw: String) -> AppResult<Duration> {
    let secs: u64 = parse_var(key, Some(raw), None)?;
    if secs == 0 {
        return Err(AppError::Config(format!("{} must be greater than zero", key)));
    }
    Ok(Duration::from_secs(secs))
}

/// Parses `value`, falling back to `default`; errors name the variable.
fn parse_var<T: FromStr>(key: &str, value: Option<String>, default: Option<T>) -> AppResult<T> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: '{}'", key, raw))),
        None => default.ok_or_else(|| AppError::Config(format!("{} is not set", key))),
    }
}
