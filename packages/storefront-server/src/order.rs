use chrono::Utc;
use storefront_storage::domain::{CheckoutStore, Order, OrderState};

use crate::error::{Result, ServerError};

/// Order state machine for checkout transitions
///
/// ```text
/// Open ──begin_payment──▶ AwaitingPayment ──confirm_payment──▶ Paid
///   ▲                          │
///   └──────────reopen──────────┘
/// ```
///
/// Remembers the state the order was loaded in; `commit` only lands while
/// storage still holds that state.
pub struct OrderStateMachine {
    order: Order,
    loaded: OrderState,
}

impl OrderStateMachine {
    pub fn new(order: Order) -> Self {
        let loaded = order.state.clone();
        Self { order, loaded }
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    /// State as read from storage
    pub fn loaded_state(&self) -> &OrderState {
        &self.loaded
    }

    /// Persist the current state, failing with a storage `Conflict` when a
    /// concurrent request moved the order first
    pub async fn commit<S>(&mut self, store: &S) -> Result<()>
    where
        S: CheckoutStore + ?Sized,
    {
        store.save_order_state(&self.order, &self.loaded).await?;
        self.loaded = self.order.state.clone();
        Ok(())
    }

    pub fn into_order(self) -> Order {
        self.order
    }

    /// Transition: OPEN | AWAITING_PAYMENT → AWAITING_PAYMENT
    ///
    /// Restarting checkout replaces the previous session.
    pub fn begin_payment(&mut self, session_id: impl Into<String>) -> Result<()> {
        match &self.order.state {
            OrderState::Open | OrderState::AwaitingPayment { .. } => {
                let now = Utc::now();
                self.order.state = OrderState::AwaitingPayment {
                    session_id: session_id.into(),
                    started_at: now,
                };
                self.order.updated_at = now;
                Ok(())
            }
            _ => Err(self.invalid("awaiting_payment")),
        }
    }

    /// Transition: AWAITING_PAYMENT → PAID
    pub fn confirm_payment(&mut self) -> Result<()> {
        match &self.order.state {
            OrderState::AwaitingPayment { session_id, .. } => {
                let now = Utc::now();
                self.order.state = OrderState::Paid {
                    session_id: session_id.clone(),
                    paid_at: now,
                };
                self.order.updated_at = now;
                Ok(())
            }
            _ => Err(self.invalid("paid")),
        }
    }

    /// Transition: AWAITING_PAYMENT → OPEN (payment cancelled)
    pub fn reopen(&mut self) -> Result<()> {
        match &self.order.state {
            OrderState::AwaitingPayment { .. } => {
                self.order.state = OrderState::Open;
                self.order.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(self.invalid("open")),
        }
    }

    /// Lines may only change while the order is open
    pub fn ensure_editable(order: &Order) -> Result<()> {
        if order.is_editable() {
            Ok(())
        } else {
            Err(ServerError::InvalidStateTransition {
                from: order.state.state_name().to_string(),
                to: "open".to_string(),
            })
        }
    }

    fn invalid(&self, to: &str) -> ServerError {
        ServerError::InvalidStateTransition {
            from: self.order.state.state_name().to_string(),
            to: to.to_string(),
        }
    }
}
