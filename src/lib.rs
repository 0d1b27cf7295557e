/*!
oauth1-poster: three-legged OAuth1 and a signed status post, on reqwest ♡ oauth1-request.

# Overview

This crate walks a user through the OAuth 1.0a handshake of a provider
(Twitter by default), keeps the resulting access token in a [`PropertyStore`],
and sends requests signed with it. The signature itself is computed by the
[oauth1-request](https://crates.io/crates/oauth1-request) crate.

# How to use

## Acquiring the access token

```ignore
use std::sync::Arc;

use oauth1_poster::{ConsumerCredentials, Endpoints, FilePropertyStore, Service, ServiceConfig};
use url::Url;

let consumer = ConsumerCredentials::new("[CONSUMER_KEY]", "[CONSUMER_SECRET]")?;
let config = ServiceConfig::new(
    consumer,
    Endpoints::twitter()?,
    Url::parse("http://127.0.0.1:8080")?,
);
let service = Service::configure(config, Arc::new(FilePropertyStore::new("user.json")))?;

// step 1: obtain a request token and send the user to the provider
let url = service.begin_authorization().await?;
println!("please access to: {}", url);

// step 2: the provider redirects to http://127.0.0.1:8080/authCallback,
// served by `server::router`, which calls `handle_callback`.
```

## Sending the tweet

```ignore
use oauth1_poster::{post_message, TWEETS_ENDPOINT};

let posted = post_message(&service, TWEETS_ENDPOINT, "Hello, world!").await?;
println!("{} {}", posted.status, posted.body);
```
*/
mod client;
mod config;
mod error;
mod post;
mod request;
mod secrets;
#[cfg(feature = "server")]
pub mod server;
mod signer;
mod store;
mod token_reader;

// exposed to external program
pub use client::{AuthorizationState, Service};
pub use config::{
    Endpoints, OAuthVersion, ServiceConfig, CONSUMER_KEY_PROPERTY, CONSUMER_SECRET_PROPERTY,
    DEFAULT_CALLBACK_IDENTIFIER, DEFAULT_SERVICE_NAME, DEFAULT_TIMEOUT, TWITTER_ACCESS_TOKEN_URL,
    TWITTER_AUTHORIZATION_URL, TWITTER_REQUEST_TOKEN_URL,
};
pub use error::{
    Error, Result, StoreError, StoreResult, TokenReaderError, TokenReaderResult,
};
pub use post::{post_message, PostedMessage, DEFAULT_MESSAGE, TWEETS_ENDPOINT};
pub use request::{FetchOptions, Payload};
pub use secrets::{ConsumerCredentials, Secrets, SecretsProvider, TokenPair};
pub use signer::{OAuthParameters, Signer};
pub use store::{FilePropertyStore, MemoryPropertyStore, PropertyStore};
pub use token_reader::{TokenReader, TokenReaderFuture, TokenResponse};

// exposed constant variables
/// Represents `oauth_callback`.
pub const OAUTH_CALLBACK_KEY: &str = "oauth_callback";
/// Represents `oauth_token`.
pub const OAUTH_TOKEN_KEY: &str = "oauth_token";
/// Represents `oauth_token_secret`.
pub const OAUTH_TOKEN_SECRET_KEY: &str = "oauth_token_secret";
/// Represents `oauth_verifier`.
pub const OAUTH_VERIFIER_KEY: &str = "oauth_verifier";
/// Represents `oauth_callback_confirmed`.
pub const OAUTH_CALLBACK_CONFIRMED_KEY: &str = "oauth_callback_confirmed";
/// Set by Twitter on the callback when the user refused access.
pub const DENIED_KEY: &str = "denied";
/// Represents `realm`.
pub const REALM_KEY: &str = "realm";

// crate-private constant variables
pub(crate) const OAUTH_KEY_PREFIX: &str = "oauth_";
