use async_trait::async_trait;
use dytomate_core::api::{self as core_api, Endpoint, SavePayload, Transport};
use std::{error::Error as StdError, fmt};

const BODY_PREVIEW_LIMIT: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveHttpErrorKind {
    Timeout,
    Connect,
    Request,
    Body,
    Status,
    Unknown,
}

impl SaveHttpErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Request => "request",
            Self::Body => "body",
            Self::Status => "status",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SaveHttpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct SaveHttpError {
    kind: SaveHttpErrorKind,
    status: Option<u16>,
    url: String,
    message: String,
    source: Option<reqwest::Error>,
}

impl SaveHttpError {
    pub fn kind(&self) -> SaveHttpErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        let kind = if err.is_timeout() {
            SaveHttpErrorKind::Timeout
        } else if err.is_connect() {
            SaveHttpErrorKind::Connect
        } else if err.is_request() {
            SaveHttpErrorKind::Request
        } else if err.is_body() || err.is_decode() {
            SaveHttpErrorKind::Body
        } else {
            SaveHttpErrorKind::Unknown
        };
        SaveHttpError {
            kind,
            status: err.status().map(|s| s.as_u16()),
            url: url.to_string(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    fn status_error(status: u16, url: &str, preview: String) -> Self {
        SaveHttpError {
            kind: SaveHttpErrorKind::Status,
            status: Some(status),
            url: url.to_string(),
            message: preview,
            source: None,
        }
    }
}

impl fmt::Display for SaveHttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "save http error kind={}", self.kind)?;
        if let Some(status) = self.status {
            write!(f, " status={}", status)?;
        }
        write!(f, " url={}: {}", self.url, self.message)
    }
}

impl StdError for SaveHttpError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|err| err as &(dyn StdError + 'static))
    }
}

fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    let mut out: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
    if trimmed.chars().nth(BODY_PREVIEW_LIMIT).is_some() {
        out.push_str("...");
    }
    out
}

/// Posts save and upload payloads as JSON to the configured endpoints.
#[derive(Clone)]
pub struct HttpTransport {
    api_key: String,
    http: reqwest::Client,
    url_save: String,
    url_upload: String,
}

impl HttpTransport {
    pub fn new(cfg: &core_api::HttpConfig) -> anyhow::Result<Self> {
        let url_save = cfg.resolve(&cfg.save_url);
        let url_upload = cfg.resolve(&cfg.upload_url);
        for url in [&url_save, &url_upload] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!(
                    "endpoint `{url}` is not absolute; set http.base_url or DYTOMATE_BASE_URL"
                );
            }
        }
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(cfg.timeout_ms))
            .build()?;
        Ok(Self {
            api_key: cfg.api_key.clone(),
            http,
            url_save,
            url_upload,
        })
    }

    pub fn url_for(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Save => &self.url_save,
            Endpoint::Upload => &self.url_upload,
        }
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.trim().is_empty() {
            req
        } else {
            req.bearer_auth(&self.api_key)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, endpoint: Endpoint, payload: &SavePayload) -> anyhow::Result<String> {
        let url = self.url_for(endpoint);
        tracing::debug!(
            target: "dytomate.http",
            stage = "http.send.in",
            url = %url,
            endpoint = endpoint.as_str(),
            key = %payload.key,
            attributes = payload.attributes.len()
        );

        let req = self.http.post(url).json(payload);
        let resp = self
            .auth(req)
            .send()
            .await
            .map_err(|err| SaveHttpError::from_reqwest(err, url))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|err| SaveHttpError::from_reqwest(err, url))?;

        if !status.is_success() {
            return Err(SaveHttpError::status_error(status.as_u16(), url, preview_body(&body)).into());
        }

        tracing::debug!(
            target: "dytomate.http",
            stage = "http.send.out",
            status = %status,
            body_len = body.len()
        );
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_api::{HttpConfig, SaveValue};
    use mockito::{Matcher, Server};
    use pretty_assertions::assert_eq;

    fn config(base_url: String) -> HttpConfig {
        HttpConfig {
            base_url,
            timeout_ms: 1_000,
            ..HttpConfig::default()
        }
    }

    fn payload(key: &str, value: SaveValue) -> SavePayload {
        SavePayload {
            key: key.to_string(),
            value,
            attributes: [("class".to_string(), "lead".to_string())].into(),
        }
    }

    #[test]
    fn test_preview_body_empty() {
        assert_eq!(preview_body("   "), "<empty body>");
    }

    #[test]
    fn test_preview_body_truncates() {
        let body = "a".repeat(BODY_PREVIEW_LIMIT + 10);
        let preview = preview_body(&body);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.len(), BODY_PREVIEW_LIMIT + 3);
        assert_eq!(preview_body(&"b".repeat(BODY_PREVIEW_LIMIT)).len(), BODY_PREVIEW_LIMIT);
    }

    #[test]
    fn test_status_error_display() {
        let err = SaveHttpError::status_error(
            502,
            "https://cms.example.com/api/dytomate/save",
            "bad gateway".to_string(),
        );
        let msg = err.to_string();
        assert!(msg.contains("kind=status"));
        assert!(msg.contains("status=502"));
        assert!(msg.contains("url=https://cms.example.com/api/dytomate/save"));
        assert!(msg.contains("bad gateway"));
    }

    #[test]
    fn test_relative_endpoints_need_base_url() {
        let err = HttpTransport::new(&HttpConfig::default()).err().unwrap();
        assert!(err.to_string().contains("not absolute"));

        let cfg = HttpConfig {
            save_url: "https://a.example.com/save".to_string(),
            upload_url: "https://a.example.com/upload".to_string(),
            ..HttpConfig::default()
        };
        let transport = HttpTransport::new(&cfg).unwrap();
        assert_eq!(transport.url_for(Endpoint::Upload), "https://a.example.com/upload");
    }

    #[tokio::test]
    async fn test_save_posts_json_and_returns_body() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api/dytomate/save")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "key": "home.title",
                "value": "<b>Hi</b>",
                "attributes": {"class": "lead"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(&config(server.url())).unwrap();
        let body = transport
            .send(
                Endpoint::Save,
                &payload("home.title", SaveValue::Text("<b>Hi</b>".to_string())),
            )
            .await
            .unwrap();
        assert_eq!(body, r#"{"success": true}"#);
    }

    #[tokio::test]
    async fn test_upload_sends_base64_file_with_bearer() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api/dytomate/upload")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "key": "home.logo",
                "value": {"name": "logo.png", "content": "aGVsbG8="}
            })))
            .with_status(200)
            .with_body(r#"{"success": 1}"#)
            .create_async()
            .await;

        let cfg = HttpConfig {
            api_key: "secret".to_string(),
            ..config(server.url())
        };
        let transport = HttpTransport::new(&cfg).unwrap();
        let file = core_api::FileUpload::from_bytes("logo.png", b"hello");
        let body = transport
            .send(Endpoint::Upload, &payload("home.logo", SaveValue::File(file)))
            .await
            .unwrap();
        assert!(body.contains("success"));
    }

    #[tokio::test]
    async fn test_status_error_is_classified() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api/dytomate/save")
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        let transport = HttpTransport::new(&config(server.url())).unwrap();
        let err = transport
            .send(Endpoint::Save, &payload("k", SaveValue::Text("v".to_string())))
            .await
            .unwrap_err();
        let http_err = err.downcast_ref::<SaveHttpError>().unwrap();
        assert_eq!(http_err.kind(), SaveHttpErrorKind::Status);
        assert_eq!(http_err.status(), Some(500));
        assert!(http_err.to_string().contains("internal error"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_connect_error() {
        // Nothing listens on port 9 locally.
        let transport = HttpTransport::new(&config("http://127.0.0.1:9".to_string())).unwrap();
        let err = transport
            .send(Endpoint::Save, &payload("k", SaveValue::Text("v".to_string())))
            .await
            .unwrap_err();
        let http_err = err.downcast_ref::<SaveHttpError>().unwrap();
        assert_eq!(http_err.kind(), SaveHttpErrorKind::Connect);
        assert_eq!(http_err.url(), "http://127.0.0.1:9/api/dytomate/save");
    }
}
