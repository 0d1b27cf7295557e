//! Deployment configuration.
//!
//! Built once at startup and handed to [`crate::Service::configure`]; nothing
//! in the crate reads ambient state after that.

use std::env;
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::{ConsumerCredentials, Error, PropertyStore, Result};

/// Property (and environment variable) holding the consumer key.
pub const CONSUMER_KEY_PROPERTY: &str = "TWITTER_CONSUMER_KEY";
/// Property (and environment variable) holding the consumer secret.
pub const CONSUMER_SECRET_PROPERTY: &str = "TWITTER_CONSUMER_SECRET";

pub const TWITTER_REQUEST_TOKEN_URL: &str = "https://api.twitter.com/oauth/request_token";
pub const TWITTER_AUTHORIZATION_URL: &str = "https://api.twitter.com/oauth/authorize";
pub const TWITTER_ACCESS_TOKEN_URL: &str = "https://api.twitter.com/oauth/access_token";

pub const DEFAULT_SERVICE_NAME: &str = "twitter";
pub const DEFAULT_CALLBACK_IDENTIFIER: &str = "authCallback";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// OAuth protocol revision spoken with the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OAuthVersion {
    /// `oauth_callback` goes on the authorization URL and callbacks need no
    /// verifier.
    V1_0,
    /// `oauth_callback` goes with the request-token call and callbacks must
    /// carry `oauth_verifier`.
    #[default]
    V1_0a,
}

/// Provider endpoints of the three-legged handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub request_token_url: Url,
    pub authorization_url: Url,
    pub access_token_url: Url,
}

impl Endpoints {
    pub fn new(
        request_token_url: &str,
        authorization_url: &str,
        access_token_url: &str,
    ) -> Result<Self> {
        Ok(Endpoints {
            request_token_url: parse_endpoint("request token", request_token_url)?,
            authorization_url: parse_endpoint("authorization", authorization_url)?,
            access_token_url: parse_endpoint("access token", access_token_url)?,
        })
    }

    pub fn twitter() -> Result<Self> {
        Self::new(
            TWITTER_REQUEST_TOKEN_URL,
            TWITTER_AUTHORIZATION_URL,
            TWITTER_ACCESS_TOKEN_URL,
        )
    }
}

fn parse_endpoint(name: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| Error::Configuration(format!("{} url {:?}: {}", name, value, e)))
}

/// Everything [`crate::Service`] needs besides its property store.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Namespaces the stored token, `oauth1.<name>`.
    pub name: String,
    pub consumer: ConsumerCredentials,
    pub endpoints: Endpoints,
    /// Base URL the callback route is reachable under.
    pub callback_base: Url,
    /// Path segment of the callback route.
    pub callback_identifier: String,
    pub version: OAuthVersion,
    pub realm: Option<String>,
    pub timeout: Option<Duration>,
}

impl ServiceConfig {
    pub fn new(consumer: ConsumerCredentials, endpoints: Endpoints, callback_base: Url) -> Self {
        ServiceConfig {
            name: DEFAULT_SERVICE_NAME.to_string(),
            consumer,
            endpoints,
            callback_base,
            callback_identifier: DEFAULT_CALLBACK_IDENTIFIER.to_string(),
            version: OAuthVersion::default(),
            realm: None,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    pub fn name<T: Into<String>>(self, name: T) -> Self {
        ServiceConfig {
            name: name.into(),
            ..self
        }
    }

    pub fn callback_identifier<T: Into<String>>(self, identifier: T) -> Self {
        ServiceConfig {
            callback_identifier: identifier.into(),
            ..self
        }
    }

    pub fn version(self, version: OAuthVersion) -> Self {
        ServiceConfig { version, ..self }
    }

    pub fn realm<T: Into<String>>(self, realm: T) -> Self {
        ServiceConfig {
            realm: Some(realm.into()),
            ..self
        }
    }

    pub fn timeout(self, timeout: Option<Duration>) -> Self {
        ServiceConfig { timeout, ..self }
    }
}

impl ConsumerCredentials {
    /// Reads the consumer pair from a deployment-scoped property store.
    pub fn from_properties(properties: &dyn PropertyStore) -> Result<Self> {
        let key = properties.get(CONSUMER_KEY_PROPERTY)?;
        let secret = properties.get(CONSUMER_SECRET_PROPERTY)?;
        Self::from_parts(key, secret)
    }

    /// Environment first (after loading `.env` when present), then the
    /// deployment property store.
    pub fn from_env_or_properties(properties: &dyn PropertyStore) -> Result<Self> {
        if dotenvy::dotenv().is_ok() {
            debug!("loaded .env");
        }
        let key = match env::var(CONSUMER_KEY_PROPERTY).ok() {
            Some(key) => Some(key),
            None => properties.get(CONSUMER_KEY_PROPERTY)?,
        };
        let secret = match env::var(CONSUMER_SECRET_PROPERTY).ok() {
            Some(secret) => Some(secret),
            None => properties.get(CONSUMER_SECRET_PROPERTY)?,
        };
        Self::from_parts(key, secret)
    }

    fn from_parts(key: Option<String>, secret: Option<String>) -> Result<Self> {
        match (key, secret) {
            (Some(key), Some(secret)) => Self::new(key, secret),
            (None, _) => Err(Error::Configuration(format!("{} is not set", CONSUMER_KEY_PROPERTY))),
            (_, None) => Err(Error::Configuration(format!(
                "{} is not set",
                CONSUMER_SECRET_PROPERTY
            ))),
        }
    }
}
