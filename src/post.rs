use reqwest::StatusCode;
use serde::Serialize;
use tracing::info;

use crate::{Error, FetchOptions, Result, Service};

/// Status creation endpoint of the Twitter v2 API.
pub const TWEETS_ENDPOINT: &str = "https://api.twitter.com/2/tweets";
pub const DEFAULT_MESSAGE: &str = "Hello, world!";

#[derive(Serialize)]
struct NewMessage<'a> {
    text: &'a str,
}

/// Raw outcome of a post. Provider errors (rate limits, validation) are
/// reported here, not as [`Error`].
#[derive(Debug, Clone)]
pub struct PostedMessage {
    pub status: StatusCode,
    pub body: String,
}

impl PostedMessage {
    pub fn is_created(&self) -> bool {
        self.status == StatusCode::CREATED
    }

    /// `data.id` of the API's success document, if the body is one.
    pub fn id(&self) -> Option<String> {
        let document: serde_json::Value = serde_json::from_str(&self.body).ok()?;
        document
            .pointer("/data/id")
            .and_then(|id| id.as_str())
            .map(str::to_string)
    }
}

/// Posts `text` as a new status.
///
/// # Errors
///
/// [`Error::Authorization`] before any network call when `service` holds no
/// access token.
pub async fn post_message(service: &Service, endpoint: &str, text: &str) -> Result<PostedMessage> {
    if !service.has_access()? {
        return Err(Error::Authorization(
            "no access yet; run the authorize flow first".into(),
        ));
    }
    let options = FetchOptions::post()
        .json(&NewMessage { text })?
        .mute_http_exceptions(true);
    let response = service.signed_fetch(endpoint, options).await?;
    let status = response.status();
    let body = response.text().await?;
    info!(service = service.name(), status = status.as_u16(), %body, "message posted");
    Ok(PostedMessage { status, body })
}
