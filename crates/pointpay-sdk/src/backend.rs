use std::sync::Arc;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use pointpay_net::{ApiClient, Config as NetConfig};

use crate::error::{Result, SdkError};
use crate::token::{
    ConsumeReceipt, ConsumeRequest, IssueTokenRequest, IssueTokenResponse, PurchaseReceipt,
    PurchaseRequest, StatusResponse,
};

pub const ISSUE_TOKEN_PATH: &str = "/mahasiswa/payment/token";
pub const PURCHASE_PATH: &str = "/marketplace/purchase";
pub const CONSUME_TOKEN_PATH: &str = "/merchant/payment/consume";

/// Bytes that cannot appear raw inside one path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Status route for `token`; the token is opaque, so it is percent-encoded.
pub fn token_status_path(token: &str) -> String {
    format!(
        "{}/{}/status",
        ISSUE_TOKEN_PATH,
        utf8_percent_encode(token, PATH_SEGMENT)
    )
}

/// The two calls a confirmation session makes.
#[async_trait]
pub trait PaymentBackend: Send + Sync {
    async fn issue_token(&self, request: &IssueTokenRequest) -> Result<IssueTokenResponse>;
    async fn token_status(&self, token: &str) -> Result<StatusResponse>;
}

pub type BackendRef = Arc<dyn PaymentBackend>;

/// Wallet REST API behind [`PaymentBackend`], plus the purchase and
/// merchant-side calls that run outside a session.
pub struct HttpBackend {
    client: ApiClient,
}

impl HttpBackend {
    pub fn new(config: NetConfig) -> Result<Self> {
        Ok(Self {
            client: ApiClient::new(config)?,
        })
    }

    pub fn from_client(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn purchase(&self, request: &PurchaseRequest) -> Result<PurchaseReceipt> {
        Ok(self.client.post_data(PURCHASE_PATH, request).await?)
    }

    /// Merchant scan: consumes an active token and moves the points.
    ///
    /// `Ok(None)` is a successful consume acknowledged without a body.
    pub async fn consume_token(&self, token: &str) -> Result<Option<ConsumeReceipt>> {
        let request = ConsumeRequest {
            token: token.to_string(),
        };
        Ok(self
            .client
            .post_optional_data(CONSUME_TOKEN_PATH, &request)
            .await?)
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[async_trait]
impl PaymentBackend for HttpBackend {
    async fn issue_token(&self, request: &IssueTokenRequest) -> Result<IssueTokenResponse> {
        let response: IssueTokenResponse = self.client.post_data(ISSUE_TOKEN_PATH, request).await?;
        if response.token.is_empty() {
            return Err(SdkError::Issuance("server returned an empty token".into()));
        }
        Ok(response)
    }

    async fn token_status(&self, token: &str) -> Result<StatusResponse> {
        self.client
            .get_data(&token_status_path(token))
            .await
            .map_err(|e| {
                if e.is_transient() {
                    SdkError::TransientPoll(e.to_string())
                } else {
                    SdkError::Network(e)
                }
            })
    }
}
