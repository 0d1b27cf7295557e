use std::fmt;
use std::time::Duration;

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{
    header::HeaderMap, header::HeaderName, header::HeaderValue, Client as ReqwestClient, Method,
    RequestBuilder as ReqwestRequestBuilder, Url,
};
use serde::Serialize;

use crate::{Error, Result, SecretsProvider, Signer};

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Body of a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Serialized JSON, sent as `application/json`. Not signed.
    Json(String),
    /// Urlencoded pairs, sent as `application/x-www-form-urlencoded`.
    /// Every pair is part of the signature.
    Form(String),
    /// Any other body. Not signed.
    Raw { content_type: String, body: Vec<u8> },
}

impl Payload {
    fn content_type(&self) -> &str {
        match self {
            Payload::Json(_) => JSON_CONTENT_TYPE,
            Payload::Form(_) => FORM_CONTENT_TYPE,
            Payload::Raw { content_type, .. } => content_type,
        }
    }
}

/// Options of a signed fetch: method, body, extra headers and error policy.
///
/// Non-2xx responses are handed back as ordinary responses unless
/// [`FetchOptions::mute_http_exceptions`] is turned off.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    method: Method,
    headers: HeaderMap,
    payload: Option<Payload>,
    mute_http_exceptions: bool,
    timeout: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            method: Method::GET,
            headers: HeaderMap::new(),
            payload: None,
            mute_http_exceptions: true,
            timeout: None,
        }
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get() -> Self {
        Self::new()
    }

    pub fn post() -> Self {
        Self::new().method(Method::POST)
    }

    pub fn method(self, method: Method) -> Self {
        FetchOptions { method, ..self }
    }

    /// Add a header.
    ///
    /// Fails with [`Error::Request`] when the name or value is not a valid
    /// header.
    pub fn header<K, V>(mut self, key: K, value: V) -> Result<Self>
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: fmt::Display,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: fmt::Display,
    {
        let key = HeaderName::try_from(key)
            .map_err(|e| Error::Request(format!("header name: {}", e)))?;
        let value = HeaderValue::try_from(value)
            .map_err(|e| Error::Request(format!("value of {}: {}", key, e)))?;
        self.headers.append(key, value);
        Ok(self)
    }

    /// Serialize `body` as JSON.
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self> {
        let body = serde_json::to_string(body)?;
        Ok(self.payload(Payload::Json(body)))
    }

    /// Serialize `body` as a urlencoded form.
    pub fn form<T: Serialize + ?Sized>(self, body: &T) -> Result<Self> {
        let body = serde_urlencoded::to_string(body)?;
        Ok(self.payload(Payload::Form(body)))
    }

    pub fn payload(self, payload: Payload) -> Self {
        FetchOptions {
            payload: Some(payload),
            ..self
        }
    }

    /// When `false`, a non-2xx status becomes [`crate::Error::HttpStatus`].
    pub fn mute_http_exceptions(self, mute: bool) -> Self {
        FetchOptions {
            mute_http_exceptions: mute,
            ..self
        }
    }

    /// Per-request timeout, overriding the client's.
    pub fn timeout(self, timeout: Duration) -> Self {
        FetchOptions {
            timeout: Some(timeout),
            ..self
        }
    }

    pub fn get_method(&self) -> &Method {
        &self.method
    }

    pub fn get_payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    pub fn is_muted(&self) -> bool {
        self.mute_http_exceptions
    }

    /// Sign and build the request on `client`.
    pub(crate) fn build<S>(
        self,
        client: &ReqwestClient,
        url: Url,
        signer: &Signer<'_, S>,
    ) -> Result<ReqwestRequestBuilder>
    where
        S: SecretsProvider,
    {
        let form_body = match self.payload {
            Some(Payload::Form(ref body)) => Some(body.as_str()),
            _ => None,
        };
        let authorization = signer.authorization(&self.method, &url, form_body)?;

        let mut builder = client
            .request(self.method, url)
            .headers(self.headers)
            .header(AUTHORIZATION, authorization);
        if let Some(payload) = self.payload {
            builder = builder.header(CONTENT_TYPE, payload.content_type());
            builder = match payload {
                Payload::Json(body) | Payload::Form(body) => builder.body(body),
                Payload::Raw { body, .. } => builder.body(body),
            };
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use http::header::{AUTHORIZATION, CONTENT_TYPE};

    use super::*;
    use crate::signer::tests::header_field;
    use crate::{ConsumerCredentials, OAuthParameters, Secrets, TokenPair};

    fn signed(options: FetchOptions, url: &str) -> reqwest::Request {
        let consumer = ConsumerCredentials::new("K", "S").unwrap();
        let token = TokenPair::new("T", "TS");
        let secrets = Secrets::new(&consumer).token(&token);
        let signer = Signer::new(&secrets, OAuthParameters::new());
        options
            .build(&ReqwestClient::new(), Url::parse(url).unwrap(), &signer)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn json_payload_sets_content_type_and_body() {
        let options = FetchOptions::post()
            .json(&serde_json::json!({ "text": "Hello, world!" }))
            .unwrap();
        let req = signed(options, "https://api.twitter.com/2/tweets");

        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.headers()[CONTENT_TYPE], "application/json");
        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, br#"{"text":"Hello, world!"}"#);
        let auth = req.headers()[AUTHORIZATION].to_str().unwrap();
        assert_eq!(header_field(auth, "oauth_token").unwrap(), "T");
    }

    #[test]
    fn form_payload_is_urlencoded() {
        let options = FetchOptions::post()
            .form(&[("status", "少女終末旅行")])
            .unwrap();
        assert_eq!(
            options.get_payload(),
            Some(&Payload::Form(
                "status=%E5%B0%91%E5%A5%B3%E7%B5%82%E6%9C%AB%E6%97%85%E8%A1%8C".to_string()
            ))
        );
        let req = signed(options, "https://api.example.com/update");
        assert_eq!(
            req.headers()[CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
    }

    #[test]
    fn defaults_are_get_and_muted() {
        let options = FetchOptions::new();
        assert_eq!(options.get_method(), Method::GET);
        assert!(options.is_muted());
        assert!(!options.clone().mute_http_exceptions(false).is_muted());

        let req = signed(
            options.header("x-trace", "abc").unwrap(),
            "https://api.example.com/me?fields=id",
        );
        assert_eq!(req.url().query(), Some("fields=id"));
        assert_eq!(req.headers()["x-trace"], "abc");
        assert!(req.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn invalid_headers_are_reported() {
        assert!(matches!(
            FetchOptions::get().header("bad header", "v"),
            Err(Error::Request(_))
        ));
        assert!(matches!(
            FetchOptions::get().header("x-trace", "line\nbreak"),
            Err(Error::Request(_))
        ));
    }
}
