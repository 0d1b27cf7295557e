//! The OAuth1 client: three-legged handshake, token persistence and signed
//! fetches.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::{Client as ReqwestClient, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    Error, FetchOptions, OAuthParameters, OAuthVersion, PropertyStore, Result, Secrets,
    ServiceConfig, Signer, StoreError, TokenPair, TokenReaderError, TokenReaderFuture,
    TokenResponse, DENIED_KEY, OAUTH_CALLBACK_KEY, OAUTH_TOKEN_KEY, OAUTH_VERIFIER_KEY,
};

const TOKEN_KEY_PREFIX: &str = "oauth1.";

/// Derived from what the property store holds; never stored itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationState {
    Unauthorized,
    PendingCallback,
    Authorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TokenKind {
    Request,
    Access,
}

/// The single token record kept per service and user. Request and access
/// tokens share one key so that replacing or deleting it is one store call.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    kind: TokenKind,
    #[serde(flatten)]
    pair: TokenPair,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    attributes: HashMap<String, String>,
}

/// OAuth1 client bound to one provider and one user's property store.
pub struct Service {
    config: ServiceConfig,
    properties: Arc<dyn PropertyStore>,
    http: ReqwestClient,
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("config", &self.config)
            .field("properties", &"..")
            .finish()
    }
}

impl Service {
    /// Binds the client to its endpoints, callback route and token storage.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] when the service name or callback identifier
    /// is empty, or the HTTP client cannot be built.
    pub fn configure(config: ServiceConfig, properties: Arc<dyn PropertyStore>) -> Result<Self> {
        if config.name.trim().is_empty() {
            return Err(Error::Configuration("service name is empty".into()));
        }
        let identifier = config.callback_identifier.trim();
        if identifier.is_empty() || identifier.contains('/') {
            return Err(Error::Configuration(format!(
                "invalid callback identifier {:?}",
                config.callback_identifier
            )));
        }
        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::Configuration(format!("http client: {}", e)))?;
        Ok(Service {
            config,
            properties,
            http,
        })
    }

    /// Replace the underlying HTTP client.
    pub fn with_client(self, http: ReqwestClient) -> Self {
        Service { http, ..self }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn callback_identifier(&self) -> &str {
        &self.config.callback_identifier
    }

    /// The URL the provider redirects to after the user's decision.
    pub fn callback_url(&self) -> Url {
        let mut url = self.config.callback_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&self.config.callback_identifier);
        }
        url
    }

    /// Obtains a fresh request token and returns the URL the user has to
    /// visit to grant access.
    ///
    /// A pending request token from an earlier attempt is replaced.
    pub async fn begin_authorization(&self) -> Result<Url> {
        if self.state()? == AuthorizationState::Authorized {
            return Err(Error::Authorization(
                "already authorized; reset before starting a new handshake".into(),
            ));
        }
        let callback = self.callback_url();
        let mut parameters = self.parameters();
        if self.config.version == OAuthVersion::V1_0a {
            parameters = parameters.callback(callback.as_str());
        }

        let secrets = Secrets::new(&self.config.consumer);
        let response = self
            .signed(
                self.config.endpoints.request_token_url.clone(),
                FetchOptions::post(),
                &Signer::new(&secrets, parameters),
            )?
            .send()
            .parse_oauth_token()
            .await?;
        if self.config.version == OAuthVersion::V1_0a && !response.callback_confirmed() {
            warn!(service = %self.config.name, "provider did not confirm oauth_callback");
        }
        self.save(&StoredToken {
            kind: TokenKind::Request,
            pair: response.pair(),
            attributes: HashMap::new(),
        })?;

        let mut url = self.config.endpoints.authorization_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(OAUTH_TOKEN_KEY, &response.oauth_token);
            if self.config.version == OAuthVersion::V1_0 {
                query.append_pair(OAUTH_CALLBACK_KEY, callback.as_str());
            }
        }
        info!(service = %self.config.name, "request token obtained, waiting for user authorization");
        Ok(url)
    }

    /// Completes the handshake with the parameters of the provider's redirect.
    ///
    /// Returns `Ok(false)` when there is nothing to complete, the user denied
    /// access, the token or verifier does not match, or the provider rejects
    /// the exchange. The pending request token is discarded in all those
    /// cases, unless another callback already replaced it.
    pub async fn handle_callback(&self, parameters: &HashMap<String, String>) -> Result<bool> {
        let (raw, pending) = match self.load_raw()? {
            Some((raw, stored)) if stored.kind == TokenKind::Request => (raw, stored.pair),
            _ => {
                warn!(service = %self.config.name, "callback without a pending request token");
                return Ok(false);
            }
        };
        if parameters.contains_key(DENIED_KEY) {
            info!(service = %self.config.name, "user denied access");
            self.discard_pending(&raw)?;
            return Ok(false);
        }
        if parameters.get(OAUTH_TOKEN_KEY) != Some(&pending.token) {
            warn!(service = %self.config.name, "callback token does not match the pending request token");
            self.discard_pending(&raw)?;
            return Ok(false);
        }
        let verifier = parameters
            .get(OAUTH_VERIFIER_KEY)
            .filter(|v| !v.trim().is_empty());
        let mut oauth = self.parameters();
        match (verifier, self.config.version) {
            (Some(verifier), _) => oauth = oauth.verifier(verifier.as_str()),
            (None, OAuthVersion::V1_0) => {}
            (None, OAuthVersion::V1_0a) => {
                warn!(service = %self.config.name, "callback without oauth_verifier");
                self.discard_pending(&raw)?;
                return Ok(false);
            }
        }

        let secrets = Secrets::new(&self.config.consumer).token(&pending);
        let exchanged = match self.signed(
            self.config.endpoints.access_token_url.clone(),
            FetchOptions::post(),
            &Signer::new(&secrets, oauth),
        ) {
            Ok(request) => request.send().parse_oauth_token().await,
            Err(err) => Err(err),
        };
        match exchanged {
            Ok(response) => {
                self.save_access(response)?;
                Ok(true)
            }
            Err(Error::TokenReader(err)) => {
                match err {
                    TokenReaderError::Rejected { status, .. } => {
                        warn!(service = %self.config.name, status, "provider rejected the token exchange")
                    }
                    TokenReaderError::TokenKeyNotFound(key, _) => {
                        warn!(service = %self.config.name, key, "malformed access token response")
                    }
                }
                self.discard_pending(&raw)?;
                Ok(false)
            }
            Err(err) => {
                self.discard_pending(&raw)?;
                Err(err)
            }
        }
    }

    /// Whether an access token is stored.
    pub fn has_access(&self) -> Result<bool> {
        Ok(self.state()? == AuthorizationState::Authorized)
    }

    pub fn state(&self) -> Result<AuthorizationState> {
        Ok(match self.load()? {
            None => AuthorizationState::Unauthorized,
            Some(stored) => match stored.kind {
                TokenKind::Request => AuthorizationState::PendingCallback,
                TokenKind::Access => AuthorizationState::Authorized,
            },
        })
    }

    /// Extra attributes the provider returned with the access token, such as
    /// `screen_name`.
    pub fn access_attributes(&self) -> Result<Option<HashMap<String, String>>> {
        Ok(self
            .load()?
            .filter(|stored| stored.kind == TokenKind::Access)
            .map(|stored| stored.attributes))
    }

    /// Sends a request signed with the consumer and access credentials.
    ///
    /// # Errors
    ///
    /// [`Error::Authorization`] without touching the network when no access
    /// token is stored; [`Error::Transport`] on network failures;
    /// [`Error::HttpStatus`] on non-2xx statuses only when the options turn
    /// `mute_http_exceptions` off.
    pub async fn signed_fetch(&self, url: &str, options: FetchOptions) -> Result<Response> {
        let access = match self.load()? {
            Some(stored) if stored.kind == TokenKind::Access => stored.pair,
            _ => {
                return Err(Error::Authorization(
                    "no access token; run the authorization flow first".into(),
                ))
            }
        };
        let url = Url::parse(url)?;
        let muted = options.is_muted();
        let secrets = Secrets::new(&self.config.consumer).token(&access);

        debug!(service = %self.config.name, method = %options.get_method(), %url, "signed fetch");
        let response = self
            .signed(url, options, &Signer::new(&secrets, self.parameters()))?
            .send()
            .await?;
        if !muted && !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await?;
            return Err(Error::HttpStatus { status, body });
        }
        Ok(response)
    }

    /// Forgets the pending request token and the access token. Calling it in
    /// `Unauthorized` state does nothing.
    pub fn reset(&self) -> Result<()> {
        self.properties.delete(&self.token_key())?;
        debug!(service = %self.config.name, "stored token cleared");
        Ok(())
    }

    fn parameters(&self) -> OAuthParameters {
        match self.config.realm {
            Some(ref realm) => OAuthParameters::new().realm(realm.as_str()),
            None => OAuthParameters::new(),
        }
    }

    fn signed(
        &self,
        url: Url,
        options: FetchOptions,
        signer: &Signer<'_, Secrets<'_>>,
    ) -> Result<reqwest::RequestBuilder> {
        options.build(&self.http, url, signer)
    }

    fn save_access(&self, response: TokenResponse) -> Result<()> {
        let pair = response.pair();
        let attributes = response.remain;
        match attributes.get("screen_name") {
            Some(screen_name) => {
                info!(service = %self.config.name, %screen_name, "access token obtained")
            }
            None => info!(service = %self.config.name, "access token obtained"),
        }
        self.save(&StoredToken {
            kind: TokenKind::Access,
            pair,
            attributes,
        })
    }

    fn token_key(&self) -> String {
        format!("{}{}", TOKEN_KEY_PREFIX, self.config.name)
    }

    fn load(&self) -> Result<Option<StoredToken>> {
        Ok(self.load_raw()?.map(|(_, stored)| stored))
    }

    fn load_raw(&self) -> Result<Option<(String, StoredToken)>> {
        match self.properties.get(&self.token_key())? {
            Some(raw) => {
                let stored = serde_json::from_str(&raw).map_err(StoreError::from)?;
                Ok(Some((raw, stored)))
            }
            None => Ok(None),
        }
    }

    /// Drops the request token record `raw`, leaving any newer record alone.
    fn discard_pending(&self, raw: &str) -> Result<()> {
        if !self.properties.delete_if(&self.token_key(), raw)? {
            debug!(service = %self.config.name, "pending request token already replaced");
        }
        Ok(())
    }

    fn save(&self, token: &StoredToken) -> Result<()> {
        let raw = serde_json::to_string(token).map_err(StoreError::from)?;
        self.properties.set(&self.token_key(), &raw)?;
        Ok(())
    }
}
