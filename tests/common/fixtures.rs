//! Test fixtures: mock resolver instances, application contexts and Telegram JSON

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use url::Url;
use vidrelay::core::config::{Config, ResolverConfig};
use vidrelay::resolver::{ApiVersion, Instance, Resolver, StaticDirectory};
use vidrelay::App;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Configuration with built-in defaults and no environment.
pub fn test_config() -> Config {
    Config::from_lookup(|_| None).unwrap()
}

/// Resolver settings with short timeouts for tests.
pub fn quick_resolver_config() -> ResolverConfig {
    ResolverConfig {
        attempt_timeout: Duration::from_millis(500),
        deadline: Duration::from_secs(10),
        ..ResolverConfig::default()
    }
}

/// Protocol 10 instance pointing at a mock server.
pub fn instance_for(server: &MockServer) -> Instance {
    Instance::new(Url::parse(&server.uri()).unwrap(), ApiVersion::V10)
}

/// Instance on a port nothing listens on.
pub fn closed_port_instance() -> Instance {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    Instance::new(Url::parse(&format!("http://127.0.0.1:{}", port)).unwrap(), ApiVersion::V10)
}

/// `{"status":"redirect","url":...}` body.
pub fn redirect_body(url: &str) -> serde_json::Value {
    json!({ "status": "redirect", "url": url })
}

/// Application context using a static directory over `instances`.
pub fn app_with_instances(instances: Vec<Instance>, resolver_config: ResolverConfig) -> Arc<App> {
    app_with_config(test_config(), instances, resolver_config)
}

/// Same as [`app_with_instances`] with a caller-supplied base configuration.
pub fn app_with_config(config: Config, instances: Vec<Instance>, resolver_config: ResolverConfig) -> Arc<App> {
    let fallback = config.directory.fallback.clone();
    let resolver = Resolver::new(resolver_config).unwrap();
    let directory = Arc::new(StaticDirectory::new(instances, fallback));
    Arc::new(App::from_parts(config, resolver, directory))
}

/// Bot whose API calls go to `server`.
pub fn bot_for(server: &MockServer) -> teloxide::Bot {
    teloxide::Bot::new("123456:TEST_TOKEN").set_api_url(server.uri().parse().unwrap())
}

/// Telegram message JSON as returned by sendMessage.
pub fn sent_message_json(chat_id: i64, message_id: i32, text: &str) -> serde_json::Value {
    json!({
        "message_id": message_id,
        "date": 1_700_000_000,
        "chat": { "id": chat_id, "type": "private", "first_name": "Ann" },
        "text": text
    })
}

/// Mounts a sendMessage endpoint that succeeds, expecting `times` calls.
pub async fn mock_send_message(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path_regex(r"(?i)/bot[^/]+/sendmessage$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": sent_message_json(42, 100, "reply")
        })))
        .expect(times)
        .mount(server)
        .await;
}

/// Webhook update carrying a private text message.
pub fn message_update_json(update_id: u32, text: &str) -> serde_json::Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": 7,
            "date": 1_700_000_000,
            "chat": { "id": 42, "type": "private", "first_name": "Ann" },
            "from": { "id": 42, "is_bot": false, "first_name": "Ann", "language_code": "en" },
            "text": text
        }
    })
}
