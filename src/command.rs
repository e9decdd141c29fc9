//! Command and Event types for the engine.
//!
//! Commands are inputs from whoever feeds the single-writer loop.
//! Events are outputs to downstream consumers (display, market data).

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::ClobError;
use crate::order::{Order, OrderId, OrderType, Side};
use crate::trade::Trade;

// ============================================================================
// Input Commands
// ============================================================================

/// Submit a new order; the engine assigns the identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewOrder {
    pub side: Side,
    pub order_type: OrderType,
    /// Required for limit orders, ignored for market orders
    pub price: Option<Decimal>,
    pub quantity: u64,
}

impl NewOrder {
    pub fn limit(side: Side, price: Decimal, quantity: u64) -> Self {
        Self {
            side,
            order_type: OrderType::Limit,
            price: Some(price),
            quantity,
        }
    }

    pub fn market(side: Side, quantity: u64) -> Self {
        Self {
            side,
            order_type: OrderType::Market,
            price: None,
            quantity,
        }
    }
}

/// Input commands for the engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Submit a new order
    Submit(NewOrder),
    /// Match a caller-built order under its own identifier
    Place(Order),
    /// Cancel a resting order
    Cancel(OrderId),
}

// ============================================================================
// Output Events
// ============================================================================

/// Order was accepted and its remainder is resting in the book
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct OrderAccepted {
    pub order_id: OrderId,
    pub side: Side,
    pub price: Decimal,
    /// Quantity left resting after any immediate fills
    pub resting_qty: u64,
}

/// Order was fully filled on arrival
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct OrderFilled {
    pub order_id: OrderId,
    pub quantity: u64,
}

/// Market order remainder found no liquidity and was dropped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct OrderDiscarded {
    pub order_id: OrderId,
    pub discarded_qty: u64,
}

/// Order was canceled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct OrderCanceled {
    pub order_id: OrderId,
    /// Remaining quantity that was canceled
    pub canceled_qty: u64,
}

/// Command was rejected with no state change
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderRejected {
    pub order_id: OrderId,
    pub reason: String,
}

impl OrderRejected {
    pub fn from_error(order_id: OrderId, err: &ClobError) -> Self {
        Self {
            order_id,
            reason: err.to_string(),
        }
    }
}

/// Output events from the engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutputEvent {
    /// Trade executed
    Trade(Trade),
    /// Order resting in the book
    Accepted(OrderAccepted),
    /// Order filled completely on arrival
    Filled(OrderFilled),
    /// Market remainder dropped
    Discarded(OrderDiscarded),
    /// Order canceled
    Canceled(OrderCanceled),
    /// Command rejected
    Rejected(OrderRejected),
}

impl OutputEvent {
    /// The trade carried by this event, if any.
    pub fn as_trade(&self) -> Option<&Trade> {
        match self {
            OutputEvent::Trade(trade) => Some(trade),
            _ => None,
        }
    }
}
