//! Wire format of the resolver service.
//!
//! Request body field names depend on the protocol revision; responses come in
//! a handful of shapes that all reduce to "a direct link" or "nothing usable".

use serde::{Deserialize, Serialize};
use url::Url;

use super::instance::ApiVersion;

/// Outgoing resolve request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RequestBody<'a> {
    V10 {
        url: &'a str,
        #[serde(rename = "videoCodec")]
        video_codec: &'a str,
        #[serde(rename = "filenameStyle")]
        filename_style: &'a str,
    },
    V7 {
        url: &'a str,
        #[serde(rename = "vCodec")]
        video_codec: &'a str,
        #[serde(rename = "filenamePattern")]
        filename_style: &'a str,
    },
}

impl<'a> RequestBody<'a> {
    pub fn new(version: ApiVersion, url: &'a str, video_codec: &'a str, filename_style: &'a str) -> Self {
        match version {
            ApiVersion::V10 => RequestBody::V10 {
                url,
                video_codec,
                filename_style,
            },
            ApiVersion::V7 => RequestBody::V7 {
                url,
                video_codec,
                filename_style,
            },
        }
    }
}

/// One entry of a `picker` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PickerItem {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Response body of a resolver instance.
///
/// Every field is optional: instances disagree on what they send, and a
/// missing field only means "no usable link".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolverResponsePayload {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub picker: Option<Vec<PickerItem>>,
    /// Error text (protocol 7)
    #[serde(default)]
    pub text: Option<String>,
    /// Error object `{"code": ...}` (protocol 10)
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl ResolverResponsePayload {
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    /// Direct media link, if the payload carries one.
    ///
    /// `stream` and `redirect` use the top-level `url`; `picker` uses the first
    /// item only. Anything else yields `None`.
    pub fn direct_link(&self) -> Option<Url> {
        let raw = match self.status.as_deref()? {
            "stream" | "redirect" => self.url.as_deref()?,
            "picker" => self.picker.as_ref()?.first()?.url.as_deref()?,
            _ => return None,
        };
        Url::parse(raw.trim()).ok()
    }

    /// Short description for a diagnostic line when no link was found.
    pub fn describe(&self) -> String {
        let status = self.status.as_deref().unwrap_or("missing");
        let detail = self
            .error
            .as_ref()
            .and_then(|err| match err {
                serde_json::Value::String(code) => Some(code.clone()),
                serde_json::Value::Object(map) => map.get("code").and_then(|c| c.as_str()).map(str::to_string),
                _ => None,
            })
            .or_else(|| self.text.clone());

        match (status, detail) {
            ("stream" | "redirect" | "picker", _) => format!("status {} without a usable url", status),
            (_, Some(detail)) => format!("status {} ({})", status, detail),
            (_, None) => format!("status {}", status),
        }
    }
}
