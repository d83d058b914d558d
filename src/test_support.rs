//! Test doubles shared by unit tests

use crate::error::{Error, Result};
use crate::http::{RawResponse, RequestSpec, Sleeper, Transport};
use crate::logger::RequestLogger;
use crate::types::CompletionMode;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records requested sleeps and returns immediately
#[derive(Debug, Default)]
pub(crate) struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// One scripted transport outcome
pub(crate) enum Scripted {
    Respond(u16, String),
    Fail(fn() -> Error),
}

/// Replays a fixed sequence of outcomes and records what was sent
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    sent: Mutex<Vec<RequestSpec>>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn attempts(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub(crate) fn sent(&self) -> Vec<RequestSpec> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RequestSpec, _mode: CompletionMode) -> Result<RawResponse> {
        self.sent.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Respond(status, body)) => Ok(RawResponse::buffered(
                StatusCode::from_u16(status).unwrap(),
                body,
            )),
            Some(Scripted::Fail(make)) => Err(make()),
            None => Err(Error::Other("script exhausted".into())),
        }
    }
}

/// Logger that keeps a line per event
#[derive(Debug, Default)]
pub(crate) struct RecordingLogger {
    events: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl RequestLogger for RecordingLogger {
    fn log_request(&self, request: &RequestSpec) {
        self.events
            .lock()
            .unwrap()
            .push(format!("request {}", request.url));
    }

    fn log_response(&self, response: &RawResponse) {
        self.events
            .lock()
            .unwrap()
            .push(format!("response {}", response.status().as_u16()));
    }

    fn log_exception(&self, error: &Error) {
        self.events
            .lock()
            .unwrap()
            .push(format!("exception {}", error.kind()));
    }

    fn log_info(&self, info: &str) {
        self.events.lock().unwrap().push(format!("info {info}"));
    }
}

pub(crate) fn timeout_error() -> Error {
    Error::Timeout { timeout_ms: 100 }
}
