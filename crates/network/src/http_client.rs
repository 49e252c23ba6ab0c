use std::time::Duration;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::{NetError, Result};

/// Body shape shared by every wallet API reply.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Resolves the envelope against the HTTP status it arrived with.
    pub fn into_result(self, status: u16) -> Result<T> {
        self.into_optional(status)?.ok_or_else(missing_data)
    }

    /// Like [`into_result`](Self::into_result), for endpoints whose success
    /// reply may carry no `data` or `data: null`.
    pub fn into_optional(self, status: u16) -> Result<Option<T>> {
        let http_ok = (200..300).contains(&status);
        if !http_ok || self.success == Some(false) {
            let message = self
                .error
                .or(self.message)
                .unwrap_or_else(|| "request failed".to_string());
            return Err(NetError::Api { status, message });
        }

        Ok(self.data)
    }
}

pub struct ApiClient {
    client: Client,
    config: Config,
}

impl ApiClient {
    pub fn new(config: Config) -> Result<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));

        if !config.verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| NetError::Config(format!("Failed to build client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = self.config.url(path);
        debug!("GET {}", url);
        self.authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| NetError::from_reqwest("GET request failed", e))
    }

    pub async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response> {
        let url = self.config.url(path);
        debug!("POST {}", url);
        self.authorize(self.client.post(&url).json(body))
            .send()
            .await
            .map_err(|e| NetError::from_reqwest("POST request failed", e))
    }

    /// GET and unwrap the `{success, message, data}` envelope.
    pub async fn get_data<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let response = self.get(path).await?;
        unwrap_envelope::<R>(response).await?.ok_or_else(missing_data)
    }

    /// POST and unwrap the `{success, message, data}` envelope.
    pub async fn post_data<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R> {
        let response = self.post(path, body).await?;
        unwrap_envelope::<R>(response).await?.ok_or_else(missing_data)
    }

    /// POST to an endpoint that may acknowledge success without `data`.
    pub async fn post_optional_data<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Option<R>> {
        let response = self.post(path, body).await?;
        unwrap_envelope(response).await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn missing_data() -> NetError {
    NetError::Decode("response envelope carries no data".into())
}

async fn unwrap_envelope<R: DeserializeOwned>(response: Response) -> Result<Option<R>> {
    let status = response.status().as_u16();
    let body = response
        .bytes()
        .await
        .map_err(|e| NetError::from_reqwest("Failed to read response body", e))?;

    match serde_json::from_slice::<ApiResponse<R>>(&body) {
        Ok(envelope) => envelope.into_optional(status),
        Err(_) if !(200..300).contains(&status) => Err(NetError::Api {
            status,
            message: String::from_utf8_lossy(&body).trim().to_string(),
        }),
        Err(e) => Err(NetError::Decode(format!("JSON parse failed: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Token {
        token: String,
    }

    #[test]
    fn test_envelope_success() {
        let envelope: ApiResponse<Token> =
            serde_json::from_str(r#"{"success":true,"message":"ok","data":{"token":"t1"}}"#)
                .unwrap();
        assert_eq!(
            envelope.into_result(200).unwrap(),
            Token {
                token: "t1".into()
            }
        );
    }

    #[test]
    fn test_envelope_failure_prefers_error_field() {
        let envelope: ApiResponse<Token> = serde_json::from_str(
            r#"{"success":false,"message":"Bad request","error":"insufficient points"}"#,
        )
        .unwrap();
        match envelope.into_result(400) {
            Err(NetError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "insufficient points");
            }
            other => panic!("expected api error, got {:?}", other),
        }
    }

    #[test]
    fn test_envelope_success_flag_overrides_2xx() {
        let envelope: ApiResponse<Token> =
            serde_json::from_str(r#"{"success":false,"message":"wallet not found"}"#).unwrap();
        assert!(matches!(
            envelope.into_result(200),
            Err(NetError::Api { status: 200, .. })
        ));
    }

    #[test]
    fn test_envelope_without_data() {
        let envelope: ApiResponse<Token> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(matches!(envelope.into_result(200), Err(NetError::Decode(_))));
    }

    #[test]
    fn test_optional_envelope_accepts_null_data() {
        let envelope: ApiResponse<Token> = serde_json::from_str(
            r#"{"success":true,"message":"Payment successful","data":null}"#,
        )
        .unwrap();
        assert!(matches!(envelope.into_optional(200), Ok(None)));

        let failed: ApiResponse<Token> =
            serde_json::from_str(r#"{"success":false,"error":"invalid or expired QR token"}"#)
                .unwrap();
        assert!(matches!(
            failed.into_optional(400),
            Err(NetError::Api { status: 400, .. })
        ));
    }
}
