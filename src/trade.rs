//! Trade - the immutable record of one executed match.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::order::{OrderId, Side};

/// Unique trade identifier
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TradeId(pub u64);

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// A trade was executed between a resting (maker) order and the
/// incoming (aggressor) order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Trade {
    pub trade_id: TradeId,
    /// Position in the engine's global match order
    pub sequence: u64,
    /// Maker (passive) order ID
    pub resting_order_id: OrderId,
    /// Taker (aggressive) order ID
    pub incoming_order_id: OrderId,
    /// Side of the incoming order
    pub aggressor_side: Side,
    /// Execution price, always the resting order's limit price
    pub price: Decimal,
    /// Executed quantity
    pub quantity: u64,
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    /// The buy-side participant
    #[inline]
    pub fn buy_order_id(&self) -> OrderId {
        match self.aggressor_side {
            Side::Buy => self.incoming_order_id,
            Side::Sell => self.resting_order_id,
        }
    }

    /// The sell-side participant
    #[inline]
    pub fn sell_order_id(&self) -> OrderId {
        match self.aggressor_side {
            Side::Buy => self.resting_order_id,
            Side::Sell => self.incoming_order_id,
        }
    }

    /// Traded value (price x quantity)
    pub fn notional(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} @ {} (buy={}, sell={})",
            self.trade_id,
            self.quantity,
            self.price,
            self.buy_order_id(),
            self.sell_order_id()
        )
    }
}
