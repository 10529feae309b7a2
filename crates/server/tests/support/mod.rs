#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use portfolio_server::chat::provider::{ChatTurn, CompletionProvider, ProviderError};
use portfolio_server::contact::mailer::{DeliveryReport, MailError, Mailer, OutgoingMail};
use portfolio_server::core::{router, AppState, ServerConfig};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "X-PORTFOLIO-TEST-BOUNDARY";

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingMail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn verify(&self) -> Result<(), MailError> {
        Ok(())
    }

    async fn send(&self, mail: OutgoingMail) -> Result<DeliveryReport, MailError> {
        self.sent.lock().unwrap().push(mail);
        Ok(DeliveryReport {
            accepted: vec!["owner@example.com".to_string()],
            response: "250 OK".to_string(),
        })
    }
}

/// Replies with the last user message, prefixed.
#[derive(Default)]
pub struct EchoProvider {
    pub calls: Mutex<Vec<Vec<ChatTurn>>>,
}

#[async_trait]
impl CompletionProvider for EchoProvider {
    async fn complete(&self, messages: Vec<ChatTurn>) -> Result<Option<String>, ProviderError> {
        let last = messages.last().map(|t| t.content.clone()).unwrap_or_default();
        self.calls.lock().unwrap().push(messages);
        Ok(Some(format!("echo: {last}")))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub provider: Arc<EchoProvider>,
    _dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(configure: impl FnOnce(&mut ServerConfig)) -> Self {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("test.sqlite").display());

        let mut config = ServerConfig::new(url, "integration-test-secret-0123456789abcdef");
        config.bcrypt_cost = 4;
        configure(&mut config);

        let mailer = Arc::new(RecordingMailer::default());
        let provider = Arc::new(EchoProvider::default());
        let state = AppState::new(config, Some(mailer.clone()), Some(provider.clone()))
            .await
            .unwrap();

        Self {
            router: router(state.clone()),
            state,
            mailer,
            provider,
            _dir: dir,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(req).await
    }

    pub async fn multipart(&self, method: Method, uri: &str, token: &str, body: Vec<u8>) -> TestResponse {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }

    /// Register a user and return their token.
    pub async fn register(&self, name: &str, email: &str) -> String {
        let res = self
            .json(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(serde_json::json!({ "name": name, "email": email, "password": "secret123" })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.json());
        res.json()["token"].as_str().unwrap().to_string()
    }

    pub async fn project_count(&self) -> usize {
        let res = self.json(Method::GET, "/api/v1/projects", None, None).await;
        res.json().as_array().unwrap().len()
    }
}

pub fn words(n: usize) -> String {
    vec!["portfolio"; n].join(" ")
}

pub fn project_json(title: &str) -> Value {
    serde_json::json!({
        "title": title,
        "description": words(80),
        "technologies": "Rust, axum",
        "githubLink": "https://github.com/me/project",
    })
}

/// Builds a `multipart/form-data` body delimited by `BOUNDARY`.
#[derive(Default)]
pub struct MultipartBody {
    buf: Vec<u8>,
}

impl MultipartBody {
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.buf
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.buf
    }
}

/// Fake JPEG of exactly `len` bytes.
pub fn jpeg(len: usize) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.extend((0..len - 4).map(|i| (i % 251) as u8));
    data
}
