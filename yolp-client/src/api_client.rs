//! HTTP implementation of the request gateway.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use yolp_core::{ClientError, ClientResult, Method, RequestGateway};

use crate::config::ClientConfig;
use crate::session::SessionJar;

/// Error body returned by the directory API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Gateway talking to the directory API over HTTP.
///
/// The session is cookie based: every request carries the cookies held in
/// the gateway's [`SessionJar`], and clones share that jar.
#[derive(Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    session: Arc<SessionJar>,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig, session: Arc<SessionJar>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .cookie_provider(Arc::clone(&session))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionJar {
        &self.session
    }

    async fn parse_response(response: reqwest::Response) -> ClientResult<Value> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::network(e.to_string()))?;
        if status.is_success() {
            parse_success_body(&text)
        } else {
            Err(error_from_body(status.as_u16(), &text))
        }
    }
}

#[async_trait]
impl RequestGateway for HttpGateway {
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::trace!(method = %method, path, "Sending request");
        let response = request.send().await.map_err(|e| {
            tracing::debug!(method = %method, path, error = %e, "Request failed");
            ClientError::network(e.to_string())
        })?;
        Self::parse_response(response).await
    }
}

/// Empty success bodies (204, sign-out) decode as `null`.
fn parse_success_body(text: &str) -> ClientResult<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(text)?)
}

/// Build the error for a non-success response, preferring the server's
/// `message` field over the raw body.
fn error_from_body(status: u16, text: &str) -> ClientError {
    let message = serde_json::from_str::<ErrorBody>(text)
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| text.trim().to_string());
    ClientError::http(status, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_body_message_is_used() {
        let err = error_from_body(409, r#"{"message":"Email already registered"}"#);
        assert_eq!(err, ClientError::http(409, "Email already registered"));
        assert_eq!(err.user_message("Error"), "Email already registered");
    }

    #[test]
    fn test_error_body_without_message_keeps_text() {
        let err = error_from_body(502, "Bad Gateway\n");
        assert_eq!(err, ClientError::http(502, "Bad Gateway"));

        let err = error_from_body(500, "");
        assert_eq!(err.user_message("Error adding restaurant"), "Error adding restaurant");
    }

    #[test]
    fn test_gateway_shares_session_jar() {
        let config = ClientConfig::from_toml(
            r#"
api_base_url = "http://localhost:3000/"
request_timeout_ms = 1000

[cache]

[log]
json = false
"#,
        )
        .unwrap();
        let session = Arc::new(SessionJar::in_memory());
        session.store("sid=abc123");

        let gateway = HttpGateway::new(&config, Arc::clone(&session)).unwrap();
        assert_eq!(gateway.base_url(), "http://localhost:3000");
        assert_eq!(gateway.clone().session().get("sid").as_deref(), Some("abc123"));
    }

    #[test]
    fn test_empty_success_body_is_null() {
        assert_eq!(parse_success_body(""), Ok(Value::Null));
        assert_eq!(parse_success_body(r#"{"id":1}"#), Ok(json!({ "id": 1 })));
        assert!(matches!(
            parse_success_body("<html>"),
            Err(ClientError::Decode { .. })
        ));
    }
}
