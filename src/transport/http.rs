use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Proxy;
use serde_json::Value;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ProviderClient, TransportError};
use crate::drivers::{ProviderKind, ProviderRequest};
use crate::settings::{HttpSettings, Settings};
use crate::{Error, Result};

const REQUEST_ID_HEADER: &str = "x-ai-config-request-id";
const GEMINI_KEY_HEADER: &str = "x-goog-api-key";

/// Everything but RFC 3986 unreserved characters, so model ids such as
/// `anthropic.claude-3-haiku-20240307-v1:0` fit in one path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// reqwest-backed client for the HTTP-native provider families.
///
/// | Kind | Endpoint | Auth |
/// |------|----------|------|
/// | openai | `{base}/chat/completions` | bearer `OPENAI_API_KEY` |
/// | gemini | `{base}/models/{model}:generateContent` | `x-goog-api-key: GOOGLE_API_KEY` |
/// | bedrock | `{base}/model/{model}/converse` | bearer `AWS_BEARER_TOKEN_BEDROCK` |
pub struct HttpProviderClient {
    client: reqwest::Client,
    http: HttpSettings,
    api_keys: HashMap<ProviderKind, String>,
}

impl HttpProviderClient {
    pub fn new(http: HttpSettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(http.timeout())
            .pool_max_idle_per_host(
                env::var("AI_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("AI_PROXY_URL") {
            match Proxy::all(&proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => warn!(error = %e, "ignoring invalid AI_PROXY_URL"),
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            http,
            api_keys: Self::api_keys_from_env(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.http.clone())
    }

    /// Override (or set) the credential used for one provider family.
    pub fn with_api_key(mut self, kind: ProviderKind, key: impl Into<String>) -> Self {
        self.api_keys.insert(kind, key.into());
        self
    }

    fn api_keys_from_env() -> HashMap<ProviderKind, String> {
        [
            (ProviderKind::OpenAi, "OPENAI_API_KEY"),
            (ProviderKind::Gemini, "GOOGLE_API_KEY"),
            (ProviderKind::Bedrock, "AWS_BEARER_TOKEN_BEDROCK"),
        ]
        .into_iter()
        .filter_map(|(kind, var)| {
            env::var(var)
                .ok()
                .filter(|v| !v.is_empty())
                .map(|v| (kind, v))
        })
        .collect()
    }

    /// Full URL for a request; framework kinds have none.
    pub fn endpoint(&self, request: &ProviderRequest) -> Result<String> {
        let base = self
            .http
            .base_url(request.kind)
            .ok_or(Error::NotHttpNative {
                provider: request.kind,
            })?
            .trim_end_matches('/');
        let model = utf8_percent_encode(&request.model, PATH_SEGMENT);
        let url = match request.kind {
            ProviderKind::OpenAi => format!("{}/chat/completions", base),
            ProviderKind::Gemini => format!("{}/models/{}:generateContent", base, model),
            ProviderKind::Bedrock => format!("{}/model/{}/converse", base, model),
            ProviderKind::LangChain | ProviderKind::LangGraph => {
                return Err(Error::NotHttpNative {
                    provider: request.kind,
                })
            }
        };
        Ok(url)
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn invoke(&self, request: &ProviderRequest) -> Result<Value> {
        let url = self.endpoint(request)?;
        let request_id = uuid::Uuid::new_v4().to_string();

        let mut req = self
            .client
            .post(&url)
            .json(&request.body)
            .header(REQUEST_ID_HEADER, &request_id);

        if let Some(key) = self.api_keys.get(&request.kind) {
            req = match request.kind {
                ProviderKind::Gemini => req.header(GEMINI_KEY_HEADER, key),
                _ => req.bearer_auth(key),
            };
        }

        debug!(provider = %request.kind, model = %request.model, request_id = %request_id, "sending provider request");

        let response = req
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = remote_message(&text);
            warn!(
                provider = %request.kind,
                status = status.as_u16(),
                request_id = %request_id,
                "provider returned an error"
            );
            return Err(Error::Remote {
                provider: request.kind,
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))
    }
}

/// Best-effort error message from a provider error body.
fn remote_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("message"))
                .or_else(|| v.get("error"))
        })
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(kind: ProviderKind, model: &str) -> ProviderRequest {
        ProviderRequest {
            kind,
            model: model.to_string(),
            body: json!({}),
        }
    }

    #[test]
    fn test_endpoints_per_kind() {
        let client = HttpProviderClient::new(HttpSettings {
            openai_base_url: "http://localhost:9/v1/".into(),
            ..HttpSettings::default()
        })
        .unwrap();
        assert_eq!(
            client.endpoint(&request(ProviderKind::OpenAi, "gpt-4o")).unwrap(),
            "http://localhost:9/v1/chat/completions"
        );
        assert_eq!(
            client
                .endpoint(&request(ProviderKind::Gemini, "gemini-2.0-flash"))
                .unwrap(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(
            client
                .endpoint(&request(
                    ProviderKind::Bedrock,
                    "anthropic.claude-3-haiku-20240307-v1:0"
                ))
                .unwrap(),
            "https://bedrock-runtime.us-east-1.amazonaws.com/model/anthropic.claude-3-haiku-20240307-v1%3A0/converse"
        );
    }

    #[test]
    fn test_model_path_segment_escapes_reserved_characters() {
        let client = HttpProviderClient::new(HttpSettings {
            bedrock_base_url: "http://localhost:9".into(),
            ..HttpSettings::default()
        })
        .unwrap();
        assert_eq!(
            client
                .endpoint(&request(ProviderKind::Bedrock, "arn:aws/model id~v1"))
                .unwrap(),
            "http://localhost:9/model/arn%3Aaws%2Fmodel%20id~v1/converse"
        );
    }

    #[test]
    fn test_framework_kinds_not_http_native() {
        let client = HttpProviderClient::new(HttpSettings::default()).unwrap();
        let err = client
            .endpoint(&request(ProviderKind::LangGraph, "gpt-4o"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NotHttpNative {
                provider: ProviderKind::LangGraph
            }
        ));
    }

    #[test]
    fn test_remote_message_extraction() {
        assert_eq!(
            remote_message(r#"{"error": {"message": "Rate limit reached"}}"#),
            "Rate limit reached"
        );
        assert_eq!(
            remote_message(r#"{"message": "ThrottlingException"}"#),
            "ThrottlingException"
        );
        assert_eq!(remote_message("bad gateway\n"), "bad gateway");
    }
}
