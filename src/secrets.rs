use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Gives the signer access to the consumer pair and, once a handshake has
/// progressed, to the request or access token pair.
pub trait SecretsProvider {
    fn consumer_pair(&self) -> (&str, &str);

    fn token_pair(&self) -> Option<(&str, &str)>;

    fn token_option_pair(&self) -> (Option<&str>, Option<&str>) {
        self.token_pair()
            .map(|(token, secret)| (Some(token), Some(secret)))
            .unwrap_or((None, None))
    }
}

/// Credentials identifying the application to the provider.
///
/// Set once at deployment and never mutated afterwards.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerCredentials {
    key: String,
    secret: String,
}

impl ConsumerCredentials {
    /// Fails with [`Error::Configuration`] when either value is empty or blank.
    /// Values are kept as given.
    pub fn new<TKey, TSecret>(key: TKey, secret: TSecret) -> Result<Self>
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        let key = key.into();
        let secret = secret.into();
        if key.trim().is_empty() {
            return Err(Error::Configuration("consumer key is empty".into()));
        }
        if secret.trim().is_empty() {
            return Err(Error::Configuration("consumer secret is empty".into()));
        }
        Ok(ConsumerCredentials { key, secret })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for ConsumerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerCredentials")
            .field("key", &self.key)
            .field("secret", &"[redacted]")
            .finish()
    }
}

/// A token and its secret. Used for both request tokens and access tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub token: String,
    pub secret: String,
}

impl TokenPair {
    pub fn new<TToken, TSecret>(token: TToken, secret: TSecret) -> Self
    where
        TToken: Into<String>,
        TSecret: Into<String>,
    {
        TokenPair {
            token: token.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("token", &self.token)
            .field("secret", &"[redacted]")
            .finish()
    }
}

/// Borrowed view over the secrets of one signed request.
#[derive(Debug, Clone, Copy)]
pub struct Secrets<'a> {
    consumer: &'a ConsumerCredentials,
    token: Option<&'a TokenPair>,
}

impl<'a> Secrets<'a> {
    pub fn new(consumer: &'a ConsumerCredentials) -> Self {
        Secrets {
            consumer,
            token: None,
        }
    }

    pub fn token(self, token: &'a TokenPair) -> Self {
        Secrets {
            token: Some(token),
            ..self
        }
    }
}

impl SecretsProvider for Secrets<'_> {
    fn consumer_pair(&self) -> (&str, &str) {
        (self.consumer.key(), self.consumer.secret())
    }

    fn token_pair(&self) -> Option<(&str, &str)> {
        self.token.map(|t| (t.token.as_str(), t.secret.as_str()))
    }
}
