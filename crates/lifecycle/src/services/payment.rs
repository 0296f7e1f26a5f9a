//! Payment gateway port, callback signature verification and adapters.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{Currency, Money, PaymentProof};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::sync::RwLock;

use crate::error::GatewayError;

type HmacSha256 = Hmac<Sha256>;

/// An order created at the gateway for a booking's amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    /// Gateway-assigned order id; stored as the booking's transaction id.
    pub order_id: String,
    pub amount: Money,
    pub currency: Currency,
    pub receipt: String,
}

/// Trait for payment gateway operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a gateway order for `amount`, which must already be validated.
    async fn create_order(
        &self,
        amount: Money,
        currency: &Currency,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError>;

    /// Returns true if `signature` is the gateway's signature over the
    /// order and payment ids. Deterministic and side-effect free.
    fn verify_callback(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;
}

#[async_trait]
impl<T: PaymentGateway + ?Sized> PaymentGateway for Arc<T> {
    async fn create_order(
        &self,
        amount: Money,
        currency: &Currency,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        (**self).create_order(amount, currency, receipt).await
    }

    fn verify_callback(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        (**self).verify_callback(order_id, payment_id, signature)
    }
}

/// HMAC-SHA256 signer for gateway callbacks.
///
/// The signature is the lowercase hex HMAC of `order_id + "|" + payment_id`
/// keyed with the shared secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    mac: HmacSha256,
}

impl SignatureVerifier {
    /// Creates a verifier for a shared secret. The secret must be non-empty.
    pub fn new(secret: &str) -> Result<Self, GatewayError> {
        if secret.is_empty() {
            return Err(GatewayError::Configuration(
                "payment key secret is empty".to_string(),
            ));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Computes the expected signature for an order and payment.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Checks a signature in constant time.
    pub fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let expected = self.sign(order_id, payment_id);
        let provided = signature.trim().to_ascii_lowercase();
        constant_time_eq::constant_time_eq(expected.as_bytes(), provided.as_bytes())
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    orders: HashMap<String, GatewayOrder>,
    next_order: u32,
    next_payment: u32,
    fail_on_create: bool,
}

/// In-memory payment gateway for tests and local runs.
///
/// Orders are kept in memory. Callbacks are verified with the same signer as
/// the real adapter; `simulate_payment` plays the part of the gateway
/// checkout and hands back a correctly signed proof.
#[derive(Debug, Clone)]
pub struct InMemoryPaymentGateway {
    verifier: SignatureVerifier,
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway signing with `verifier`.
    pub fn new(verifier: SignatureVerifier) -> Self {
        Self {
            verifier,
            state: Arc::new(RwLock::new(InMemoryGatewayState::default())),
        }
    }

    /// Configures the gateway to fail order creation.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    /// Returns the number of orders created.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns a created order by id.
    pub async fn order(&self, order_id: &str) -> Option<GatewayOrder> {
        self.state.read().await.orders.get(order_id).cloned()
    }

    /// Pays an order and returns the signed callback values.
    pub async fn simulate_payment(&self, order_id: &str) -> PaymentProof {
        let mut state = self.state.write().await;
        state.next_payment += 1;
        let payment_id = format!("pay_{:06}", state.next_payment);
        let signature = self.verifier.sign(order_id, &payment_id);
        PaymentProof::new(order_id, payment_id, signature)
    }

    /// Returns the signer, for building callbacks by hand.
    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_order(
        &self,
        amount: Money,
        currency: &Currency,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let mut state = self.state.write().await;

        if state.fail_on_create {
            return Err(GatewayError::Unavailable(
                "order creation declined".to_string(),
            ));
        }

        state.next_order += 1;
        let order = GatewayOrder {
            order_id: format!("order_{:06}", state.next_order),
            amount,
            currency: currency.clone(),
            receipt: receipt.to_string(),
        };
        state.orders.insert(order.order_id.clone(), order.clone());

        Ok(order)
    }

    fn verify_callback(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        self.verifier.verify(order_id, payment_id, signature)
    }
}

#[derive(Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Deserialize)]
struct CreateOrderResponse {
    id: String,
    amount: i64,
    currency: String,
    receipt: Option<String>,
}

/// Razorpay orders API adapter.
#[derive(Clone)]
pub struct RazorpayGateway {
    key_id: String,
    key_secret: String,
    verifier: SignatureVerifier,
    api_base: String,
    http_client: Client,
}

impl RazorpayGateway {
    /// Production API root.
    pub const DEFAULT_API_BASE: &'static str = "https://api.razorpay.com/v1";

    /// Creates an adapter authenticating with the given key pair.
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Result<Self, GatewayError> {
        let key_id = key_id.into();
        let key_secret = key_secret.into();
        if key_id.is_empty() {
            return Err(GatewayError::Configuration(
                "payment key id is empty".to_string(),
            ));
        }
        let verifier = SignatureVerifier::new(&key_secret)?;

        Ok(Self {
            key_id,
            key_secret,
            verifier,
            api_base: Self::DEFAULT_API_BASE.to_string(),
            http_client: Client::new(),
        })
    }

    /// Points the adapter at another API root.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

impl std::fmt::Debug for RazorpayGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayGateway")
            .field("key_id", &self.key_id)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    #[tracing::instrument(skip(self), fields(api_base = %self.api_base))]
    async fn create_order(
        &self,
        amount: Money,
        currency: &Currency,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let response = self
            .http_client
            .post(format!("{}/orders", self.api_base))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateOrderRequest {
                amount: amount.minor(),
                currency: currency.as_str(),
                receipt,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "gateway rejected order creation");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let created: CreateOrderResponse = response.json().await?;
        if created.amount != amount.minor() {
            return Err(GatewayError::InvalidResponse(format!(
                "order {} amount {} does not match requested {}",
                created.id,
                created.amount,
                amount.minor()
            )));
        }
        let currency = Currency::new(&created.currency)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        tracing::info!(order_id = %created.id, "gateway order created");

        Ok(GatewayOrder {
            order_id: created.id,
            amount,
            currency,
            receipt: created.receipt.unwrap_or_else(|| receipt.to_string()),
        })
    }

    fn verify_callback(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        self.verifier.verify(order_id, payment_id, signature)
    }
}
