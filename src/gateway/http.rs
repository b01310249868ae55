use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::GatewaySettings;
use crate::errors::CheckoutError;
use crate::models::order::{Order, OrderPage};

use super::{CreateOrderRequest, OrderGateway};

/// HTTP binding of [`OrderGateway`] against the storefront backend.
///
/// Reads retry transient network failures with exponential backoff.
/// Creates are sent exactly once; callers decide whether to resubmit.
#[derive(Clone)]
pub struct HttpOrderGateway {
    client: Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
    max_read_retries: u32,
    retry_backoff: Duration,
}

impl HttpOrderGateway {
    pub fn new(settings: &GatewaySettings) -> Result<Self, CheckoutError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| {
                CheckoutError::Unexpected(anyhow::anyhow!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
            max_read_retries: settings.max_read_retries.max(1),
            retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
        })
    }

    pub fn with_bearer_token(self, token: impl Into<String>) -> Self {
        self.set_bearer_token(token);
        self
    }

    /// Installs the session token used for subsequent requests.
    pub fn set_bearer_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.into());
    }

    /// Drops the session token, e.g. on sign-out.
    pub fn clear_bearer_token(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Session precondition: every request carries a bearer token, so the
    /// absence of one fails before any network attempt.
    fn require_token(&self) -> Result<String, CheckoutError> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| CheckoutError::Auth("No active session".to_string()))
    }

    fn orders_url(&self) -> String {
        format!("{}/orders", self.base_url)
    }

    fn order_url(&self, order_id: Uuid) -> String {
        format!("{}/orders/{}", self.base_url, order_id)
    }

    async fn try_get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, CheckoutError> {
        let token = self.require_token()?;
        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(token)
            .send()
            .await?;
        decode_response(response).await
    }

    async fn get_with_retry<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        op: &str,
    ) -> Result<T, CheckoutError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.try_get(url, query).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_read_retries => {
                    let backoff = self.retry_backoff * 2_u32.pow(attempt - 1);
                    warn!(
                        error = %err,
                        attempt,
                        max_retries = self.max_read_retries,
                        "{} failed, retrying in {:?}",
                        op,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl OrderGateway for HttpOrderGateway {
    #[instrument(skip(self, request), fields(delivery_type = %request.delivery_type))]
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, CheckoutError> {
        request.validate()?;
        let token = self.require_token()?;

        debug!("Submitting order to backend");
        let response = self
            .client
            .post(self.orders_url())
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        decode_response(response).await
    }

    #[instrument(skip(self))]
    async fn list_orders(
        &self,
        page: u64,
        size: u64,
        sort: Option<&str>,
    ) -> Result<OrderPage, CheckoutError> {
        let mut query = vec![("page", page.to_string()), ("size", size.to_string())];
        if let Some(sort) = sort {
            query.push(("sort", sort.to_string()));
        }
        self.get_with_retry(&self.orders_url(), &query, "Order list request")
            .await
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn get_order(&self, order_id: Uuid) -> Result<Order, CheckoutError> {
        self.get_with_retry(&self.order_url(order_id), &[], "Order fetch request")
            .await
    }
}

async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, CheckoutError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }
    let body = response.text().await.unwrap_or_default();
    Err(map_status(status, &body))
}

fn map_status(status: StatusCode, body: &str) -> CheckoutError {
    let message = extract_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CheckoutError::Auth(message),
        StatusCode::NOT_FOUND => CheckoutError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            CheckoutError::Validation(message)
        }
        s if s.is_server_error() => {
            CheckoutError::Network(format!("Backend returned {}: {}", s.as_u16(), message))
        }
        s => CheckoutError::Unexpected(anyhow::anyhow!(
            "Unexpected status {}: {}",
            s.as_u16(),
            message
        )),
    }
}

/// Pulls the human-readable message out of the backend error envelope.
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
