use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    RequiresPaymentMethod,
    Processing,
    Succeeded,
    Canceled,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String, // Provider's ID (e.g., pi_123)
    pub booking_id: Uuid,
    pub amount_cents: i32,
    pub currency: String,
    pub status: PaymentStatus,
    pub reference: Option<String>,
    pub client_secret: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Normalized webhook notification. Gateways deliver different payload
/// shapes; the API layer reduces them to this before the core sees them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub gateway: String,
    pub kind: GatewayEventKind,
    pub intent_id: String,
    pub amount_cents: Option<i32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayEventKind {
    PaymentSucceeded,
    PaymentFailed,
    PaymentRefunded,
}

#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    /// Create a payment intent with the provider
    async fn create_intent(
        &self,
        booking_id: Uuid,
        amount_cents: i32,
        currency: &str,
    ) -> Result<PaymentIntent, Box<dyn std::error::Error + Send + Sync>>;

    /// Retrieve intent status
    async fn get_intent(
        &self,
        intent_id: &str,
    ) -> Result<PaymentIntent, Box<dyn std::error::Error + Send + Sync>>;

    /// Process a payment (Direct Checkout)
    async fn process_payment(
        &self,
        payment: &PaymentIntent,
    ) -> Result<PaymentStatus, Box<dyn std::error::Error + Send + Sync>>;

    /// Refund a captured payment, partially or in full
    async fn refund(
        &self,
        intent_id: &str,
        amount_cents: i32,
    ) -> Result<PaymentStatus, Box<dyn std::error::Error + Send + Sync>>;
}
