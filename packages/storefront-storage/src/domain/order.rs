//! Orders and shipping addresses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order lifecycle state
///
/// `Open` is an editable cart. Checkout moves it to `AwaitingPayment` with
/// the provider's session id; the success callback settles it as `Paid`.
/// A cancelled payment drops it back to `Open`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderState {
    Open,
    AwaitingPayment {
        session_id: String,
        started_at: DateTime<Utc>,
    },
    Paid {
        session_id: String,
        paid_at: DateTime<Utc>,
    },
}

impl OrderState {
    pub fn state_name(&self) -> &'static str {
        match self {
            OrderState::Open => "open",
            OrderState::AwaitingPayment { .. } => "awaiting_payment",
            OrderState::Paid { .. } => "paid",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Paid { .. })
    }

    pub fn payment_session_id(&self) -> Option<&str> {
        match self {
            OrderState::Open => None,
            OrderState::AwaitingPayment { session_id, .. } | OrderState::Paid { session_id, .. } => {
                Some(session_id)
            }
        }
    }
}

/// Customer order; the non-paid one is the cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub state: OrderState,
    pub shipping: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(id: i64, customer_id: i64, state: OrderState) -> Self {
        let now = Utc::now();
        Self {
            id,
            customer_id,
            state,
            shipping: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_editable(&self) -> bool {
        self.state == OrderState::Open
    }
}

/// Delivery address recorded at checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub id: i64,
    pub customer_id: i64,
    pub order_id: i64,
    pub city: String,
    pub state: String,
    pub street: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShippingAddress {
    pub customer_id: i64,
    pub order_id: i64,
    pub city: String,
    pub state: String,
    pub street: String,
}
