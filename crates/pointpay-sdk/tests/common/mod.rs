#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pointpay_sdk::token::{IssueTokenRequest, IssueTokenResponse};
use pointpay_sdk::{
    PaymentBackend, Result, SdkError, SessionConfig, SessionController, SessionRegistry,
    StatusResponse, TokenStatus,
};

/// One scripted reply to a status check.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Active,
    Inactive,
    Status(TokenStatus),
    Fail,
}

/// In-memory backend that answers status checks from a script. Once the
/// script runs out the token stays active.
pub struct MockBackend {
    script: Mutex<VecDeque<Reply>>,
    delay: Option<Duration>,
    fail_issue: bool,
    issue_calls: AtomicUsize,
    status_calls: AtomicUsize,
    requests: Mutex<Vec<IssueTokenRequest>>,
}

impl MockBackend {
    pub fn new(script: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            delay: None,
            fail_issue: false,
            issue_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always_active() -> Self {
        Self::new([])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing_issue() -> Self {
        let mut backend = Self::always_active();
        backend.fail_issue = true;
        backend
    }

    pub fn issue_calls(&self) -> usize {
        self.issue_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<IssueTokenRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentBackend for MockBackend {
    async fn issue_token(&self, request: &IssueTokenRequest) -> Result<IssueTokenResponse> {
        self.issue_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_issue {
            return Err(SdkError::Issuance("insufficient balance".into()));
        }
        Ok(IssueTokenResponse {
            token: "tok123".into(),
            qr_code_base64: "iVBORw0KGgo=".into(),
            expiry: None,
        })
    }

    async fn token_status(&self, _token: &str) -> Result<StatusResponse> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.script.lock().unwrap().pop_front().unwrap_or(Reply::Active);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match reply {
            Reply::Active => Ok(StatusResponse::active()),
            Reply::Inactive => Ok(StatusResponse::inactive()),
            Reply::Status(status) => Ok(StatusResponse::with_status(status)),
            Reply::Fail => Err(SdkError::TransientPoll("connection reset".into())),
        }
    }
}

/// Controller over a private registry with default timings.
pub fn controller(backend: Arc<MockBackend>) -> SessionController {
    SessionController::with_registry(backend, SessionConfig::default(), SessionRegistry::new())
}
