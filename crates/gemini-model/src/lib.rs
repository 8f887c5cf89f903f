//! A story provider backed by the Google Gemini API.

#[macro_use]
extern crate tracing;

mod config;
mod prompt;
mod proto;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use mime::Mime;
use reqwest::{Client, StatusCode, header};
use story_weaver_model::{
    ErrorKind, StoryBeat, StoryProvider, StoryProviderError, StoryRequest,
};

pub use config::{GeminiConfig, GeminiConfigBuilder};

/// Error type for [`GeminiProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl StoryProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Gemini story provider.
///
/// Sends a single non-streaming `generateContent` request per story
/// beat, instructing the model to reply with a JSON object holding the
/// next piece of narration and exactly two branching choices.
#[derive(Clone, Debug)]
pub struct GeminiProvider {
    client: Client,
    config: Arc<GeminiConfig>,
}

impl GeminiProvider {
    /// Creates a new `GeminiProvider` with the given configuration.
    #[inline]
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }
}

impl StoryProvider for GeminiProvider {
    type Error = Error;

    fn generate(
        &self,
        req: &StoryRequest,
    ) -> impl Future<Output = Result<StoryBeat, Self::Error>> + Send + 'static
    {
        let gemini_req = proto::create_request(req);
        let resp_fut = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.config.base_url, self.config.model
            ))
            .header("x-goog-api-key", &self.config.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&gemini_req)
            .send();

        async move {
            trace!("sending a generate request");
            let resp = match resp_fut.await {
                Ok(resp) => resp,
                Err(err) => {
                    return Err(Error::new(
                        format!("{err}"),
                        ErrorKind::Network,
                    ));
                }
            };

            let status = resp.status();
            if !status.is_success() {
                let kind = match status {
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                        ErrorKind::Auth
                    }
                    _ => ErrorKind::Network,
                };
                return Err(Error::new(
                    format!("server returned {status}"),
                    kind,
                ));
            }

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let is_valid_content_type = content_type
                .and_then(|v| v.parse().ok())
                .map(|m: Mime| m.subtype() == mime::JSON)
                .unwrap_or(false);
            if !is_valid_content_type {
                return Err(Error::new(
                    format!("unexpected content type: {content_type:?}"),
                    ErrorKind::MalformedOutput,
                ));
            }

            let resp: proto::GenerateContentResponse = match resp.json().await
            {
                Ok(resp) => resp,
                Err(err) => {
                    return Err(Error::new(
                        format!("{err}"),
                        ErrorKind::MalformedOutput,
                    ));
                }
            };

            let Some(text) = proto::extract_text(&resp) else {
                return Err(Error::new(
                    "response contains no candidate text",
                    ErrorKind::MalformedOutput,
                ));
            };
            trace!("received a candidate of {} bytes", text.len());
            parse_story_beat(&text)
        }
    }
}

/// Parses the model's structured output into a [`StoryBeat`].
///
/// The model sometimes wraps its JSON in markdown code fences, which
/// are stripped before parsing. All three fields must be present and
/// non-empty.
fn parse_story_beat(raw: &str) -> Result<StoryBeat, Error> {
    let cleaned = strip_markdown_fences(raw);
    let payload: proto::StoryPayload =
        serde_json::from_str(cleaned).map_err(|err| {
            Error::new(
                format!("invalid structured output: {err}"),
                ErrorKind::MalformedOutput,
            )
        })?;
    if payload.story.is_empty()
        || payload.choice1.is_empty()
        || payload.choice2.is_empty()
    {
        return Err(Error::new(
            "structured output has empty fields",
            ErrorKind::MalformedOutput,
        ));
    }
    Ok(StoryBeat {
        story: payload.story,
        choices: [payload.choice1, payload.choice2],
    })
}

fn strip_markdown_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}
