//! # Remote Store
//!
//! `PaymentStore`/`RequestStore` over HTTP against the deposit-api
//! mirror. Record shapes on the wire are identical to the local store;
//! the server assigns ids and timestamps.

use async_trait::async_trait;
use deposit_core::error::{DepositError, DepositResult};
use deposit_core::record::{DormRequest, PaymentDraft, PaymentRecord, PaymentStatus, RequestDraft};
use deposit_core::store::{PaymentStore, RequestStore};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

/// HTTP-backed store talking to a running deposit-api instance
pub struct RemoteStore {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl RemoteStore {
    /// Create a store against `base_url` (e.g. `http://localhost:3001`)
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
        }
    }

    /// Attach a session token to every request
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn parse<T: DeserializeOwned>(&self, response: Response) -> DepositResult<T> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| DepositError::Serialization(e.to_string()));
        }

        let message = response
            .json::<ApiError>()
            .await
            .map(|e| e.error)
            .unwrap_or_else(|_| format!("HTTP {}", status));

        Err(match status {
            StatusCode::NOT_FOUND => DepositError::RecordNotFound { id: message },
            StatusCode::CONFLICT => DepositError::InvalidTransition {
                from: "remote".to_string(),
                to: message,
            },
            StatusCode::UNAUTHORIZED => DepositError::Unauthorized,
            StatusCode::FORBIDDEN => DepositError::Forbidden,
            StatusCode::BAD_REQUEST => DepositError::Validation {
                field: "request".to_string(),
                message,
            },
            _ => DepositError::Network(message),
        })
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> DepositResult<T> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| DepositError::Network(e.to_string()))?;
        self.parse(response).await
    }
}

#[async_trait]
impl PaymentStore for RemoteStore {
    async fn append(&self, draft: PaymentDraft) -> DepositResult<PaymentRecord> {
        self.send(self.client.post(self.url("/api/payments")).json(&draft))
            .await
    }

    async fn list_all(&self) -> DepositResult<Vec<PaymentRecord>> {
        self.send(self.client.get(self.url("/api/payments"))).await
    }

    async fn set_status(&self, id: &str, status: PaymentStatus) -> DepositResult<PaymentRecord> {
        let path = format!("/api/payments/{}/status", id);
        self.send(
            self.client
                .post(self.url(&path))
                .json(&json!({ "status": status })),
        )
        .await
    }

    async fn clear(&self) -> DepositResult<()> {
        let _: serde_json::Value = self
            .send(self.client.delete(self.url("/api/payments")))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RequestStore for RemoteStore {
    async fn append(&self, draft: RequestDraft) -> DepositResult<DormRequest> {
        self.send(self.client.post(self.url("/api/requests")).json(&draft))
            .await
    }

    async fn list_all(&self) -> DepositResult<Vec<DormRequest>> {
        self.send(self.client.get(self.url("/api/requests"))).await
    }

    async fn delete(&self, id: &str) -> DepositResult<()> {
        let path = format!("/api/requests/{}", id);
        let _: serde_json::Value = self.send(self.client.delete(self.url(&path))).await?;
        Ok(())
    }

    async fn attach_payment(&self, request_id: &str, payment_id: &str) -> DepositResult<()> {
        let path = format!("/api/requests/{}/payment", request_id);
        let _: serde_json::Value = self
            .send(
                self.client
                    .post(self.url(&path))
                    .json(&json!({ "paymentId": payment_id })),
            )
            .await?;
        Ok(())
    }

    async fn clear(&self) -> DepositResult<()> {
        let _: serde_json::Value = self
            .send(self.client.delete(self.url("/api/requests")))
            .await?;
        Ok(())
    }
}
