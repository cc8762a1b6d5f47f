//! HTTP client for the MCP Streamable HTTP transport
//!
//! Wraps `reqwest::Client` so that caller-supplied request headers travel
//! with every request, and so that servers answering notifications with
//! `200 OK` and an empty body (instead of `202 Accepted`) still work.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, StatusCode};
use rmcp::{
    model::{ClientJsonRpcMessage, ServerJsonRpcMessage},
    transport::streamable_http_client::{
        AuthRequiredError, StreamableHttpClient, StreamableHttpError, StreamableHttpPostResponse,
    },
};
use sse_stream::{Error as SseError, Sse, SseStream};
use tracing::debug;

use crate::error::{McpError, Result};

const HEADER_SESSION_ID: &str = "mcp-session-id";
const HEADER_LAST_EVENT_ID: &str = "last-event-id";
const EVENT_STREAM_MIME_TYPE: &str = "text/event-stream";
const JSON_MIME_TYPE: &str = "application/json";

type HttpResult<T> = std::result::Result<T, StreamableHttpError<reqwest::Error>>;

/// Streamable HTTP client carrying custom request headers
#[derive(Clone, Debug, Default)]
pub struct HeaderHttpClient {
    inner: reqwest::Client,
}

impl HeaderHttpClient {
    /// Build a client that sends `headers` with every request
    ///
    /// `Authorization` is skipped here: the transport sends it as bearer auth.
    ///
    /// # Errors
    /// Returns an error for header names or values HTTP does not allow
    pub fn with_headers(headers: &HashMap<String, String>) -> Result<Self> {
        let mut defaults = HeaderMap::new();
        for (name, value) in headers {
            if name.eq_ignore_ascii_case("authorization") {
                continue;
            }
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| McpError::Config(format!("invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| McpError::Config(format!("invalid value for header '{name}': {e}")))?;
            defaults.insert(name, value);
        }

        let inner = reqwest::Client::builder()
            .default_headers(defaults)
            .build()
            .map_err(|e| McpError::Transport(e.to_string()))?;
        Ok(Self { inner })
    }

    fn accepting(&self, builder: RequestBuilder, auth_token: Option<String>) -> RequestBuilder {
        let builder = builder.header(ACCEPT, format!("{EVENT_STREAM_MIME_TYPE}, {JSON_MIME_TYPE}"));
        match auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

fn content_type(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .map(|ct| String::from_utf8_lossy(ct.as_bytes()).to_string())
}

fn event_stream(response: Response) -> BoxStream<'static, std::result::Result<Sse, SseError>> {
    SseStream::from_byte_stream(response.bytes_stream()).boxed()
}

fn auth_challenge(response: &Response) -> HttpResult<Option<AuthRequiredError>> {
    if response.status() != StatusCode::UNAUTHORIZED {
        return Ok(None);
    }
    let Some(header) = response.headers().get(http::header::WWW_AUTHENTICATE) else {
        return Ok(None);
    };
    let header = header.to_str().map_err(|_| {
        StreamableHttpError::UnexpectedServerResponse(Cow::from(
            "invalid www-authenticate header value",
        ))
    })?;
    Ok(Some(AuthRequiredError {
        www_authenticate_header: header.to_string(),
    }))
}

impl StreamableHttpClient for HeaderHttpClient {
    type Error = reqwest::Error;

    async fn get_stream(
        &self,
        uri: Arc<str>,
        session_id: Arc<str>,
        last_event_id: Option<String>,
        auth_token: Option<String>,
    ) -> HttpResult<BoxStream<'static, std::result::Result<Sse, SseError>>> {
        let mut request = self
            .accepting(self.inner.get(uri.as_ref()), auth_token)
            .header(HEADER_SESSION_ID, session_id.as_ref());
        if let Some(last_event_id) = last_event_id {
            request = request.header(HEADER_LAST_EVENT_ID, last_event_id);
        }

        let response = request.send().await.map_err(StreamableHttpError::Client)?;
        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            return Err(StreamableHttpError::ServerDoesNotSupportSse);
        }
        let response = response
            .error_for_status()
            .map_err(StreamableHttpError::Client)?;

        match content_type(&response) {
            Some(ct) if ct.starts_with(EVENT_STREAM_MIME_TYPE) || ct.starts_with(JSON_MIME_TYPE) => {
                Ok(event_stream(response))
            }
            other => Err(StreamableHttpError::UnexpectedContentType(other)),
        }
    }

    async fn delete_session(
        &self,
        uri: Arc<str>,
        session: Arc<str>,
        auth_token: Option<String>,
    ) -> HttpResult<()> {
        let mut request = self.inner.delete(uri.as_ref());
        if let Some(token) = auth_token {
            request = request.bearer_auth(token);
        }
        let response = request
            .header(HEADER_SESSION_ID, session.as_ref())
            .send()
            .await
            .map_err(StreamableHttpError::Client)?;

        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            debug!("server does not support deleting sessions");
            return Ok(());
        }
        response
            .error_for_status()
            .map_err(StreamableHttpError::Client)?;
        Ok(())
    }

    async fn post_message(
        &self,
        uri: Arc<str>,
        message: ClientJsonRpcMessage,
        session_id: Option<Arc<str>>,
        auth_token: Option<String>,
    ) -> HttpResult<StreamableHttpPostResponse> {
        let mut request = self.accepting(self.inner.post(uri.as_ref()), auth_token);
        if let Some(session_id) = session_id {
            request = request.header(HEADER_SESSION_ID, session_id.as_ref());
        }
        let response = request
            .json(&message)
            .send()
            .await
            .map_err(StreamableHttpError::Client)?;

        let status = response.status();
        let content_type = content_type(&response);
        debug!(%status, content_type = ?content_type, uri = %uri, "MCP HTTP response received");

        if let Some(challenge) = auth_challenge(&response)? {
            return Err(StreamableHttpError::AuthRequired(challenge));
        }

        if matches!(status, StatusCode::ACCEPTED | StatusCode::NO_CONTENT) {
            return Ok(StreamableHttpPostResponse::Accepted);
        }
        if status == StatusCode::OK && content_type.is_none() {
            debug!("200 OK without content-type, treating as accepted");
            return Ok(StreamableHttpPostResponse::Accepted);
        }

        let session_id = response
            .headers()
            .get(HEADER_SESSION_ID)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        match content_type.as_deref() {
            Some(ct) if ct.starts_with(EVENT_STREAM_MIME_TYPE) => Ok(
                StreamableHttpPostResponse::Sse(event_stream(response), session_id),
            ),
            Some(ct) if ct.starts_with(JSON_MIME_TYPE) => {
                // text + from_str keeps serde errors distinguishable from transport errors
                let body = response.text().await.map_err(StreamableHttpError::Client)?;
                let message: ServerJsonRpcMessage =
                    serde_json::from_str(&body).map_err(StreamableHttpError::Deserialize)?;
                Ok(StreamableHttpPostResponse::Json(message, session_id))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(
                    content_type = ?content_type,
                    body_preview = %body.chars().take(200).collect::<String>(),
                    "unexpected content type"
                );
                Err(StreamableHttpError::UnexpectedContentType(content_type))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_with_headers_accepts_custom_headers() {
        let mut headers = HashMap::new();
        headers.insert("X-Api-Version".to_string(), "2025-06-18".to_string());
        headers.insert("Authorization".to_string(), "Bearer secret".to_string());
        assert!(HeaderHttpClient::with_headers(&headers).is_ok());
    }

    #[test]
    fn test_with_headers_rejects_invalid_name() {
        let mut headers = HashMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        let err = HeaderHttpClient::with_headers(&headers).unwrap_err();
        assert!(matches!(err, McpError::Config(_)));
    }
}
