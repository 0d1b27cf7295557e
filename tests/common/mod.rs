//! Shared helpers: a simulated provider and a service pointed at it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use oauth1_poster::{
    ConsumerCredentials, Endpoints, MemoryPropertyStore, OAuthVersion, Service, ServiceConfig,
};
use url::Url;
use wiremock::matchers::{header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const REQUEST_TOKEN: &str = "req-token";
pub const REQUEST_SECRET: &str = "req-secret";
pub const ACCESS_TOKEN: &str = "acc-token";
pub const ACCESS_SECRET: &str = "acc-secret";
pub const VERIFIER: &str = "good-verifier";

pub fn config(provider: &MockServer, version: OAuthVersion) -> ServiceConfig {
    let uri = provider.uri();
    let endpoints = Endpoints::new(
        &format!("{}/oauth/request_token", uri),
        &format!("{}/oauth/authorize", uri),
        &format!("{}/oauth/access_token", uri),
    )
    .expect("endpoints");
    ServiceConfig::new(
        ConsumerCredentials::new("K", "S").expect("consumer"),
        endpoints,
        Url::parse("http://127.0.0.1:8080").expect("callback base"),
    )
    .version(version)
}

pub fn service(
    provider: &MockServer,
    store: Arc<MemoryPropertyStore>,
    version: OAuthVersion,
) -> Service {
    Service::configure(config(provider, version), store).expect("configure")
}

/// A service whose access-token endpoint refuses connections.
pub fn unreachable_exchange_service(provider: &MockServer) -> Service {
    let mut config = config(provider, OAuthVersion::V1_0a);
    config.endpoints.access_token_url =
        Url::parse("http://127.0.0.1:1/oauth/access_token").expect("access url");
    Service::configure(config, Arc::new(MemoryPropertyStore::new())).expect("configure")
}

/// Request-token endpoint answering with [`REQUEST_TOKEN`].
pub fn request_token_mock() -> Mock {
    Mock::given(method("POST"))
        .and(path("/oauth/request_token"))
        .and(header_regex("authorization", r#"oauth_consumer_key="K""#))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "oauth_token={}&oauth_token_secret={}&oauth_callback_confirmed=true",
            REQUEST_TOKEN, REQUEST_SECRET
        )))
}

/// Access-token endpoint that only accepts the pending request token with
/// [`VERIFIER`]; any other exchange falls through to a 404.
pub fn access_token_mock() -> Mock {
    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .and(header_regex(
            "authorization",
            &format!(r#"oauth_token="{}""#, REQUEST_TOKEN),
        ))
        .and(header_regex(
            "authorization",
            &format!(r#"oauth_verifier="{}""#, VERIFIER),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "oauth_token={}&oauth_token_secret={}&user_id=42&screen_name=someone",
            ACCESS_TOKEN, ACCESS_SECRET
        )))
}

pub fn callback_params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
