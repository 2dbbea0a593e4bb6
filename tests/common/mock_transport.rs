//! Mock transport for testing
//!
//! These are test utilities - not all may be used in every test binary.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use storefront_media::error::{Error, Result};
use storefront_media::submit::{ProgressSink, SubmissionPayload};
use storefront_media::transport::{Transport, UploadRequest, UploadTarget};

/// Call record for `send`
#[derive(Debug, Clone)]
pub struct SendCall {
    pub target: UploadTarget,
    pub payload: SubmissionPayload,
}

/// Simple recording transport
///
/// Features:
/// - Call tracking for verification
/// - Progress reported in quarters of the declared total
/// - Queued responses, defaulting to `{ "_id": "mock-<n>" }`
/// - Error injection for failure path testing
#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<SendCall>>,
    responses: Mutex<VecDeque<Value>>,
    errors: Mutex<VecDeque<(Option<u16>, String)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the entity returned by the next successful send
    pub fn respond_with(&self, entity: Value) {
        self.responses.lock().unwrap().push_back(entity);
    }

    /// Make the next send fail
    pub fn fail_next(&self, status: Option<u16>, message: &str) {
        self.errors
            .lock()
            .unwrap()
            .push_back((status, message.to_string()));
    }

    /// Every recorded call, in order
    pub fn calls(&self) -> Vec<SendCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The most recent call
    pub fn last_call(&self) -> SendCall {
        self.calls
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no calls recorded")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: UploadRequest, progress: ProgressSink) -> Result<Value> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(SendCall {
                target: request.target.clone(),
                payload: request.payload.clone(),
            });
            calls.len()
        };

        let total = request.payload.total_bytes();
        for quarter in 1..=4 {
            progress.report(total * quarter / 4, total);
            tokio::task::yield_now().await;
        }

        if let Some((status, message)) = self.errors.lock().unwrap().pop_front() {
            return Err(Error::Transport { status, message });
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| json!({ "_id": format!("mock-{n}") })))
    }
}
