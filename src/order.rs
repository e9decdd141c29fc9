//! Order types: identity, side, type and the mutable remaining quantity.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ClobError, RejectReason, Result};

/// Opaque order identifier. Never reused within one engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Order side
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Side {
    /// Buy side (bids)
    Buy = 0,
    /// Sell side (asks)
    Sell = 1,
}

impl Side {
    /// Returns the opposite side
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Matches up to its limit price, remainder rests
    Limit,
    /// Matches at any price, remainder is discarded
    Market,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Limit => f.write_str("LIMIT"),
            OrderType::Market => f.write_str("MARKET"),
        }
    }
}

/// Lifecycle state. `Filled` and `Cancelled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
}

impl OrderStatus {
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }
}

/// A single buy/sell instruction.
///
/// `remaining` only ever decreases; it reaches zero exactly when the order
/// is fully filled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub order_type: OrderType,
    /// Limit price. Always `None` for market orders.
    pub price: Option<Decimal>,
    /// Original quantity
    pub quantity: u64,
    /// Quantity not yet filled
    pub remaining: u64,
    /// Arrival sequence, stamped by the book when the order starts resting
    pub sequence: u64,
    #[serde(skip)]
    cancelled: bool,
}

impl Order {
    /// Create a limit order.
    pub fn limit(id: OrderId, side: Side, price: Decimal, quantity: u64) -> Self {
        Self {
            id,
            side,
            order_type: OrderType::Limit,
            price: Some(price),
            quantity,
            remaining: quantity,
            sequence: 0,
            cancelled: false,
        }
    }

    /// Create a market order. Market orders carry no price.
    pub fn market(id: OrderId, side: Side, quantity: u64) -> Self {
        Self {
            id,
            side,
            order_type: OrderType::Market,
            price: None,
            quantity,
            remaining: quantity,
            sequence: 0,
            cancelled: false,
        }
    }

    /// Build an order from loosely-typed input, as received from a
    /// presentation layer. A price given with a market order is dropped.
    pub fn new(
        id: OrderId,
        side: Side,
        order_type: OrderType,
        price: Option<Decimal>,
        quantity: u64,
    ) -> Self {
        let price = match order_type {
            OrderType::Limit => price,
            OrderType::Market => None,
        };
        Self {
            id,
            side,
            order_type,
            price,
            quantity,
            remaining: quantity,
            sequence: 0,
            cancelled: false,
        }
    }

    /// Check quantity and price. Performs no mutation.
    pub fn validate(&self) -> Result<()> {
        if self.quantity == 0 {
            return Err(ClobError::invalid(self.id, RejectReason::ZeroQuantity));
        }
        if self.remaining > self.quantity {
            return Err(ClobError::invalid(self.id, RejectReason::RemainingExceedsQuantity));
        }
        if self.remaining == 0 {
            return Err(ClobError::invalid(self.id, RejectReason::AlreadyFilled));
        }
        if self.cancelled {
            return Err(ClobError::invalid(self.id, RejectReason::AlreadyCancelled));
        }
        match self.order_type {
            OrderType::Limit => match self.price {
                None => Err(ClobError::invalid(self.id, RejectReason::MissingLimitPrice)),
                Some(price) if price <= Decimal::ZERO => {
                    Err(ClobError::invalid(self.id, RejectReason::NonPositivePrice))
                }
                Some(_) => Ok(()),
            },
            OrderType::Market => Ok(()),
        }
    }

    #[inline]
    pub fn is_filled(&self) -> bool {
        self.remaining == 0
    }

    /// Quantity executed so far
    #[inline]
    pub fn filled(&self) -> u64 {
        self.quantity.saturating_sub(self.remaining)
    }

    /// Reduce the remaining quantity by `qty`.
    #[inline]
    pub fn fill(&mut self, qty: u64) {
        debug_assert!(qty <= self.remaining, "fill {} exceeds remaining {}", qty, self.remaining);
        self.remaining = self.remaining.saturating_sub(qty);
    }

    /// Mark the order cancelled. Has no effect on a filled order.
    pub fn cancel(&mut self) {
        if !self.is_filled() {
            self.cancelled = true;
        }
    }

    pub fn status(&self) -> OrderStatus {
        if self.cancelled {
            OrderStatus::Cancelled
        } else if self.remaining == 0 {
            OrderStatus::Filled
        } else if self.remaining < self.quantity {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::New
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}/{}", self.id, self.side, self.remaining, self.quantity)?;
        match self.price {
            Some(price) => write!(f, " @ {}", price),
            None => f.write_str(" @ MARKET"),
        }
    }
}
