//! Payment tokens and the wire types exchanged with the wallet API.
//!
//! A token is a single-use, server-issued payment intent. The payer shows it
//! as a QR code; a merchant consumes it. Its status only ever moves out of
//! `Active`, once.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SdkError};
use crate::machine::Outcome;

/// Lifetime of a freshly issued token
pub const TOKEN_TTL_SECS: u64 = 600;

/// Longest countdown a session accepts: one day.
pub const MAX_TTL_SECS: u64 = 86_400;

/// `now + ttl_secs`, or `InvalidInput` when the sum leaves chrono's range.
pub fn expiry_after(now: DateTime<Utc>, ttl_secs: u64) -> Result<DateTime<Utc>> {
    i64::try_from(ttl_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| SdkError::InvalidInput(format!("token TTL of {}s is out of range", ttl_secs)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Purchase,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    Active,
    Consumed,
    Expired,
    Cancelled,
}

impl TokenStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TokenStatus::Active)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentToken {
    pub id: String,
    /// Points, always positive
    pub amount: u64,
    pub merchant: String,
    pub payment_type: PaymentType,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: TokenStatus,
    /// PNG of the QR payload, base64. Rendered by the UI, never decoded here.
    pub qr_code_base64: String,
}

impl PaymentToken {
    pub fn issued(
        request: &IssueTokenRequest,
        response: IssueTokenResponse,
        now: DateTime<Utc>,
        ttl_secs: u64,
    ) -> Result<Self> {
        let expires_at = match response.expiry {
            Some(expiry) => expiry,
            None => expiry_after(now, ttl_secs)?,
        };

        Ok(Self {
            id: response.token,
            amount: request.amount,
            merchant: request.merchant.clone(),
            payment_type: request.payment_type,
            created_at: now,
            expires_at,
            status: TokenStatus::Active,
            qr_code_base64: response.qr_code_base64,
        })
    }

    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at - now).num_seconds().max(0) as u64
    }

    /// Moves the token out of `Active`. Any other transition is rejected.
    pub fn transition(&mut self, next: TokenStatus) -> Result<()> {
        if self.status.is_terminal() || !next.is_terminal() {
            return Err(SdkError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueTokenRequest {
    pub amount: u64,
    pub merchant: String,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
}

impl IssueTokenRequest {
    pub fn new(amount: u64, merchant: &str, payment_type: PaymentType) -> Result<Self> {
        if amount == 0 {
            return Err(SdkError::InvalidInput("Amount must be greater than zero".into()));
        }
        let merchant = merchant.trim();
        if merchant.is_empty() {
            return Err(SdkError::InvalidInput("Merchant must not be empty".into()));
        }

        Ok(Self {
            amount,
            merchant: merchant.to_string(),
            payment_type,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueTokenResponse {
    pub token: String,
    #[serde(default)]
    pub qr_code_base64: String,
    pub expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub is_active: bool,
    /// Newer backends report the exact status; older ones only `is_active`.
    pub status: Option<TokenStatus>,
}

impl StatusResponse {
    pub fn active() -> Self {
        Self {
            is_active: true,
            status: Some(TokenStatus::Active),
        }
    }

    pub fn with_status(status: TokenStatus) -> Self {
        Self {
            is_active: !status.is_terminal(),
            status: Some(status),
        }
    }

    /// Legacy reply: only the boolean.
    pub fn inactive() -> Self {
        Self {
            is_active: false,
            status: None,
        }
    }

    /// Terminal outcome this reply implies, or `None` while the token is live.
    ///
    /// An explicit status wins. Without one, the first `is_active == false`
    /// counts as consumed: the boolean cannot tell consumption from expiry,
    /// and expiry is tracked by the local countdown anyway.
    pub fn terminal_outcome(&self) -> Option<Outcome> {
        match self.status {
            Some(TokenStatus::Active) => None,
            Some(TokenStatus::Consumed) => Some(Outcome::Succeeded),
            Some(TokenStatus::Expired) => Some(Outcome::Expired),
            Some(TokenStatus::Cancelled) => Some(Outcome::Cancelled),
            None if self.is_active => None,
            None => Some(Outcome::Succeeded),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Wallet,
    Qr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub product_id: u64,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_token: Option<String>,
}

impl PurchaseRequest {
    pub fn wallet(product_id: u64) -> Self {
        Self {
            product_id,
            payment_method: PaymentMethod::Wallet,
            payment_token: None,
        }
    }

    pub fn qr(product_id: u64, token: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(SdkError::InvalidInput("QR payment requires a token".into()));
        }
        Ok(Self {
            product_id,
            payment_method: PaymentMethod::Qr,
            payment_token: Some(token.to_string()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    #[serde(default)]
    pub id: u64,
    pub wallet_id: u64,
    pub product_id: u64,
    pub amount: i64,
    pub total_amount: i64,
    pub quantity: u32,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumeRequest {
    pub token: String,
}

/// Wallet transaction a merchant consume may echo back. Current backends
/// acknowledge with `data: null`, so callers get this as an `Option`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumeReceipt {
    pub id: u64,
    pub wallet_id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: i64,
    pub direction: String,
    pub status: String,
    pub description: String,
}
