use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use crate::backend::BackendRef;
use crate::config::SessionConfig;
use crate::error::{Result, SdkError};
use crate::machine::Outcome;
use crate::registry::{SessionId, SessionRegistry};
use crate::session::{drive, Session, SessionNotice};
use crate::token::{IssueTokenRequest, PaymentToken, MAX_TTL_SECS};

/// Starts payment confirmation sessions and owns them until they finish.
pub struct SessionController {
    backend: BackendRef,
    config: SessionConfig,
    registry: SessionRegistry,
    notices: broadcast::Sender<SessionNotice>,
}

impl SessionController {
    /// Controller backed by the process-wide session registry.
    pub fn new(backend: BackendRef, config: SessionConfig) -> Self {
        Self::with_registry(backend, config, SessionRegistry::global())
    }

    pub fn with_registry(
        backend: BackendRef,
        config: SessionConfig,
        registry: SessionRegistry,
    ) -> Self {
        let (notices, _) = broadcast::channel(config.notice_capacity.max(1));
        Self {
            backend,
            config,
            registry,
            notices,
        }
    }

    /// Validates the request and asks the backend for a payment token.
    /// Makes exactly one network call; any failure is an `Issuance` error.
    pub async fn request_token(&self, amount: u64, merchant: &str) -> Result<PaymentToken> {
        let request = IssueTokenRequest::new(amount, merchant, self.config.payment_type)?;
        if self.config.ttl_secs > MAX_TTL_SECS {
            return Err(SdkError::InvalidInput(format!(
                "token TTL of {}s exceeds the {}s limit",
                self.config.ttl_secs, MAX_TTL_SECS
            )));
        }

        let issued = self
            .backend
            .issue_token(&request)
            .await
            .map_err(|e| match e {
                SdkError::Issuance(_) => e,
                other => SdkError::Issuance(other.to_string()),
            })?;

        PaymentToken::issued(&request, issued, Utc::now(), self.config.ttl_secs)
    }

    /// Issues a payment token, then starts its countdown and poller.
    ///
    /// Nothing is registered and no timer runs unless issuance succeeded.
    /// Must be called from within a Tokio runtime.
    pub async fn start(&self, amount: u64, merchant: &str) -> Result<SessionHandle> {
        let token = self.request_token(amount, merchant).await?;
        let merchant = token.merchant.clone();
        let id = self.registry.allocate_id();
        let session = Arc::new(Session::new(
            id,
            token,
            self.config.ttl_secs,
            self.notices.clone(),
        ));
        self.registry.insert(session.clone()).await;

        info!(
            session = %id,
            token = %session.token_id(),
            amount,
            merchant = %merchant,
            ttl_secs = self.config.ttl_secs,
            "payment confirmation session started"
        );

        tokio::spawn(drive(
            session.clone(),
            self.backend.clone(),
            self.config.poll_interval(),
            self.registry.clone(),
        ));

        Ok(SessionHandle::new(session))
    }

    /// Gives a fresh UI handle to a detached session that is still pending.
    pub async fn attach(&self, id: SessionId) -> Result<SessionHandle> {
        let session = self
            .registry
            .get(id)
            .await
            .filter(|s| s.is_detached() && !s.outcome().is_terminal())
            .ok_or(SdkError::SessionNotFound(id))?;

        session.set_detached(false);
        debug!(session = %id, "session reattached");
        Ok(SessionHandle::new(session))
    }

    /// Cancels a session by id, e.g. a detached one. Returns whether this
    /// call ended it; a session that already finished gives `Ok(false)`.
    pub async fn cancel(&self, id: SessionId) -> Result<bool> {
        match self.registry.get(id).await {
            Some(session) => Ok(session.cancel()),
            None if self.registry.was_allocated(id) => Ok(false),
            None => Err(SdkError::SessionNotFound(id)),
        }
    }

    /// Terminal notices of every session this controller starts.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

/// The UI's view of a session.
///
/// Dropping the handle cancels the session unless it was detached first.
pub struct SessionHandle {
    session: Arc<Session>,
    outcome: watch::Receiver<Outcome>,
    released: bool,
}

impl SessionHandle {
    fn new(session: Arc<Session>) -> Self {
        let outcome = session.subscribe();
        Self {
            session,
            outcome,
            released: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.session.id()
    }

    pub fn token(&self) -> PaymentToken {
        self.session.token()
    }

    pub fn token_id(&self) -> String {
        self.session.token_id()
    }

    pub fn qr_code_base64(&self) -> String {
        self.session.token().qr_code_base64
    }

    pub fn outcome(&self) -> Outcome {
        self.session.outcome()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.session.remaining_secs()
    }

    /// Observable outcome; changes exactly once, from `Pending` to terminal.
    pub fn watch(&self) -> watch::Receiver<Outcome> {
        self.outcome.clone()
    }

    pub async fn wait(&mut self) -> Outcome {
        match self.outcome.wait_for(|o| o.is_terminal()).await {
            Ok(outcome) => *outcome,
            Err(_) => self.session.outcome(),
        }
    }

    /// Stops both timers and settles on `Cancelled`. Idempotent: returns true
    /// only for the call that actually cancelled.
    pub fn cancel(&self) -> bool {
        self.session.cancel()
    }

    /// Lets the session run on in the background. It stays in the registry
    /// until terminal and announces its outcome through
    /// [`SessionController::subscribe`].
    pub fn detach(mut self) -> SessionId {
        self.released = true;
        self.session.set_detached(true);
        info!(session = %self.session.id(), "session detached, completing in background");
        self.session.id()
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.session.id())
            .field("outcome", &self.session.outcome())
            .field("detached", &self.session.is_detached())
            .finish()
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if !self.released && self.session.cancel() {
            debug!(session = %self.session.id(), "handle dropped, session cancelled");
        }
    }
}
