//! Error types for the order book and matching engine.
//!
//! Every rejection happens before any state is touched, so a caller that
//! receives an error can fix the request and resubmit.

use std::fmt;

use crate::order::OrderId;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClobError>;

/// Why an order was refused by validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RejectReason {
    /// Quantity was zero
    ZeroQuantity = 0,
    /// Limit price was zero or negative
    NonPositivePrice = 1,
    /// Limit order submitted without a price
    MissingLimitPrice = 2,
    /// Market orders never rest in the book
    MarketOrderNotRestable = 3,
    /// Order has no remaining quantity left to match or rest
    AlreadyFilled = 4,
    /// Order was cancelled or had its remainder discarded
    AlreadyCancelled = 5,
    /// Remaining quantity is larger than the original quantity
    RemainingExceedsQuantity = 6,
    /// Resting quantity at the price level would overflow
    LevelQuantityOverflow = 7,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectReason::ZeroQuantity => "quantity must be positive",
            RejectReason::NonPositivePrice => "price must be positive",
            RejectReason::MissingLimitPrice => "limit orders must have a price",
            RejectReason::MarketOrderNotRestable => "market orders cannot rest in the book",
            RejectReason::AlreadyFilled => "order has no remaining quantity",
            RejectReason::AlreadyCancelled => "order is cancelled",
            RejectReason::RemainingExceedsQuantity => "remaining quantity exceeds order quantity",
            RejectReason::LevelQuantityOverflow => "price level quantity would overflow",
        };
        f.write_str(text)
    }
}

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum ClobError {
    /// The order failed validation and was not applied.
    #[error("invalid order {order_id}: {reason}")]
    InvalidOrder {
        order_id: OrderId,
        reason: RejectReason,
    },

    /// No resting order carries this identifier (never existed, filled, or cancelled).
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// An order with this identifier is already resting.
    #[error("duplicate order id: {0}")]
    DuplicateOrderId(OrderId),

    /// The arena index space is exhausted; no further order can rest.
    #[error("order book is full")]
    BookFull,

    /// A configuration value was present but unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// A replay row parsed but does not describe a valid command.
    #[error("replay line {line}: {message}")]
    Replay { line: u64, message: String },

    /// A replay file could not be parsed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A replay file could not be opened or read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClobError {
    /// Shorthand for building an [`ClobError::InvalidOrder`].
    pub fn invalid(order_id: OrderId, reason: RejectReason) -> Self {
        ClobError::InvalidOrder { order_id, reason }
    }

    /// The rejection reason, if this is a validation failure.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            ClobError::InvalidOrder { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}
