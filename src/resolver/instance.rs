//! Resolver instances: one deployment of the public video-resolution API.

use std::fmt;
use std::str::FromStr;

use strum::{Display, EnumString};
use url::Url;

use crate::core::error::{AppError, AppResult};

/// Wire protocol revision advertised by an instance.
///
/// The revision decides the request path and the body field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
pub enum ApiVersion {
    /// Legacy protocol: `POST /api/json`, `vCodec` + `filenamePattern`
    #[strum(serialize = "7")]
    V7,
    /// Current protocol: `POST /`, `videoCodec` + `filenameStyle`
    #[default]
    #[strum(serialize = "10")]
    V10,
}

impl ApiVersion {
    /// Maps an advertised version string ("10.4.1", "7.15") to a protocol revision.
    pub fn from_version_string(version: &str) -> Option<Self> {
        let major = version.trim().split('.').next()?;
        Self::from_str(major).ok()
    }

    /// Path appended to the instance base URL.
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            ApiVersion::V7 => "/api/json",
            ApiVersion::V10 => "",
        }
    }
}

/// A single resolver deployment (scheme + host, optionally a path).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instance {
    base_url: Url,
    version: ApiVersion,
}

/// Candidates for one resolution attempt, in trial order.
pub type InstanceList = Vec<Instance>;

impl Instance {
    /// Creates an instance without scheme checks.
    ///
    /// Use [`Instance::parse`] for anything coming from configuration or the
    /// monitoring service; this constructor exists for locally built lists.
    pub fn new(base_url: Url, version: ApiVersion) -> Self {
        Self { base_url, version }
    }

    /// Parses `https://host[/path]` or `https://host[/path]|7`.
    ///
    /// Only `https` endpoints are accepted.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let raw = raw.trim();
        let (url_part, version) = match raw.rsplit_once('|') {
            Some((url_part, version)) => {
                let version = ApiVersion::from_version_string(version)
                    .ok_or_else(|| AppError::Validation(format!("Unknown protocol version in '{}'", raw)))?;
                (url_part.trim(), version)
            }
            None => (raw, ApiVersion::default()),
        };

        let base_url = Url::parse(url_part)?;
        if base_url.scheme() != "https" {
            return Err(AppError::Validation(format!(
                "Instance {} rejected: only https endpoints are allowed",
                url_part
            )));
        }
        if base_url.host_str().is_none() {
            return Err(AppError::Validation(format!("Instance {} has no host", url_part)));
        }

        Ok(Self { base_url, version })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn version(&self) -> ApiVersion {
        self.version
    }

    /// Full URL the resolve request is POSTed to.
    pub fn endpoint(&self) -> Url {
        let mut endpoint = self.base_url.clone();
        let suffix = self.version.endpoint_path();
        if !suffix.is_empty() {
            let path = format!("{}{}", endpoint.path().trim_end_matches('/'), suffix);
            endpoint.set_path(&path);
        }
        endpoint
    }

    /// Human-readable identifier used in diagnostics: the base URL without a trailing slash.
    pub fn id(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// True when both refer to the same deployment, ignoring trailing slashes and case.
    pub fn same_endpoint(&self, other: &str) -> bool {
        self.id().eq_ignore_ascii_case(other.trim().trim_end_matches('/'))
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Instance {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parses a comma separated instance list, skipping blanks.
pub fn parse_instance_list(raw: &str) -> AppResult<InstanceList> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(Instance::parse)
        .collect()
}
