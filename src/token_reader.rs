use std::{collections::HashMap, future::Future};

use async_trait::async_trait;
use reqwest::Response;
use serde::Deserialize;

use crate::{
    Error, Result, TokenPair, TokenReaderError, TokenReaderResult, OAUTH_CALLBACK_CONFIRMED_KEY,
    OAUTH_TOKEN_KEY, OAUTH_TOKEN_SECRET_KEY,
};

/// Represents response of the request-token and access-token endpoints.
#[derive(Deserialize, Debug, Clone)]
pub struct TokenResponse {
    /// OAuth Token
    pub oauth_token: String,
    /// OAuth Token Secret
    pub oauth_token_secret: String,
    /// Other contents, e.g. `user_id` and `screen_name` on Twitter
    #[serde(flatten)]
    pub remain: HashMap<String, String>,
}

impl TokenResponse {
    /// Whether the provider acknowledged the `oauth_callback` of a
    /// request-token call.
    pub fn callback_confirmed(&self) -> bool {
        self.remain
            .get(OAUTH_CALLBACK_CONFIRMED_KEY)
            .map(|v| v == "true")
            .unwrap_or(false)
    }

    pub fn pair(&self) -> TokenPair {
        TokenPair::new(self.oauth_token.as_str(), self.oauth_token_secret.as_str())
    }
}

/// Add parse_oauth_token feature to reqwest::Response.
// this trait is sealed
#[async_trait]
pub trait TokenReader: private::Sealed {
    async fn parse_oauth_token(self) -> Result<TokenResponse>;
}

#[async_trait]
impl TokenReader for Response {
    async fn parse_oauth_token(self) -> Result<TokenResponse> {
        let status = self.status();
        let text = self.text().await?;
        if !status.is_success() {
            return Err(TokenReaderError::Rejected {
                status: status.as_u16(),
                body: text,
            }
            .into());
        }
        Ok(read_oauth_token(text)?)
    }
}

/// Add parse_oauth_token feature to Future of reqwest::Response.
// this trait is also sealed
#[async_trait]
pub trait TokenReaderFuture: private::SealedWrapper {
    async fn parse_oauth_token(self) -> Result<TokenResponse>;
}

#[async_trait]
impl<T, E> TokenReaderFuture for T
where
    T: Future<Output = std::result::Result<Response, E>> + Send,
    E: Into<Error> + Send + 'static,
{
    async fn parse_oauth_token(self) -> Result<TokenResponse> {
        match self.await {
            Ok(resp) => resp.parse_oauth_token().await,
            Err(err) => Err(err.into()),
        }
    }
}

fn read_oauth_token(text: String) -> TokenReaderResult<TokenResponse> {
    let mut destructured = url::form_urlencoded::parse(text.as_bytes())
        .into_owned()
        .collect::<HashMap<String, String>>();
    let oauth_token = destructured.remove(OAUTH_TOKEN_KEY);
    let oauth_token_secret = destructured.remove(OAUTH_TOKEN_SECRET_KEY);
    match (oauth_token, oauth_token_secret) {
        (Some(t), Some(s)) => Ok(TokenResponse {
            oauth_token: t,
            oauth_token_secret: s,
            remain: destructured,
        }),
        (None, _) => Err(TokenReaderError::TokenKeyNotFound(OAUTH_TOKEN_KEY, text)),
        (_, _) => Err(TokenReaderError::TokenKeyNotFound(
            OAUTH_TOKEN_SECRET_KEY,
            text,
        )),
    }
}

mod private {
    use std::future::Future;

    use reqwest::Response;

    use crate::Error;

    pub trait Sealed {}
    impl Sealed for Response {}
    pub trait SealedWrapper {}
    impl<T, E> SealedWrapper for T
    where
        T: Future<Output = Result<Response, E>>,
        E: Into<Error>,
    {
    }
}
