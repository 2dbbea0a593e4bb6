//! reqwest-backed transport

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::submit::{PayloadPart, ProgressSink, SubmissionPayload};
use crate::transport::{Method, Transport, UploadRequest, UploadTarget};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// File parts are streamed in chunks of this size
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Multipart transport over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpTransport {
    /// Create a transport from client configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            token: config.token.clone(),
        })
    }

    fn endpoint(&self, target: &UploadTarget) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let raw = format!("{base}/{}", target.path());
        Url::parse(&raw).map_err(|e| Error::Config(format!("invalid endpoint {raw}: {e}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: UploadRequest, progress: ProgressSink) -> Result<Value> {
        let url = self.endpoint(&request.target)?;
        let form = build_form(request.payload, &progress)?;

        let builder = match request.target.method() {
            Method::Create => self.client.post(url),
            Method::Update => self.client.put(url),
        };
        let builder = match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };

        debug!("Sending {}", request.target);
        let response = builder.multipart(form).send().await.map_err(network_error)?;
        let status = response.status();
        let body = response.text().await.map_err(network_error)?;

        if !status.is_success() {
            return Err(rejection(status, &body));
        }

        info!("{} accepted ({status})", request.target);
        parse_entity(&body)
    }
}

fn build_form(payload: SubmissionPayload, progress: &ProgressSink) -> Result<Form> {
    let total = payload.total_bytes();
    let loaded = Arc::new(AtomicU64::new(0));
    let mut form = Form::new();

    for part in payload.into_parts() {
        match part {
            PayloadPart::Text { name, value } => {
                loaded.fetch_add(value.len() as u64, Ordering::Relaxed);
                form = form.text(name, value);
            }
            PayloadPart::File { name, file } => {
                let len = file.size();
                let body = chunked_body(file.bytes, Arc::clone(&loaded), total, progress.clone());
                let part = Part::stream_with_length(body, len)
                    .file_name(file.name)
                    .mime_str(&file.mime)?;
                form = form.part(name, part);
            }
        }
    }

    progress.report(loaded.load(Ordering::Relaxed), total);
    Ok(form)
}

/// Body that reports progress as each chunk is polled by the client
fn chunked_body(bytes: Vec<u8>, loaded: Arc<AtomicU64>, total: u64, progress: ProgressSink) -> Body {
    let chunks: Vec<Vec<u8>> = bytes.chunks(CHUNK_SIZE).map(<[u8]>::to_vec).collect();
    let stream = futures::stream::iter(chunks).map(move |chunk| {
        let len = chunk.len() as u64;
        let sent = loaded.fetch_add(len, Ordering::Relaxed) + len;
        progress.report(sent, total);
        Ok::<_, std::io::Error>(chunk)
    });
    Body::wrap_stream(stream)
}

fn network_error(e: reqwest::Error) -> Error {
    Error::Transport {
        status: e.status().map(|s| s.as_u16()),
        message: e.to_string(),
    }
}

/// Prefer the server's JSON `message`, then the raw body, then the status text
fn rejection(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    Error::Transport {
        status: Some(status.as_u16()),
        message,
    }
}

/// Unwrap the `{ "data": ... }` envelope; bodies without one are returned whole
fn parse_entity(body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    let mut value: Value = serde_json::from_str(body)?;
    if let Some(data) = value.get_mut("data") {
        return Ok(data.take());
    }
    Ok(value)
}
