//! # clob-engine
//!
//! A central limit order book with a price-time priority matching engine.
//!
//! ## Design Principles
//!
//! - **Exact prices**: `rust_decimal::Decimal`, never floating point
//! - **Price-time priority**: best price first, oldest order first within a price
//! - **All-or-nothing**: every rejection happens before the book is touched
//! - **Single-Writer**: one owner mutates the book; concurrent callers go
//!   through the command loop
//! - **Cache-Optimized**: 64-byte aligned nodes, 32-bit indices
//!
//! ## Architecture
//!
//! ```text
//! [Producers] --> [SPSC Ring Buffer] --> [Engine (owns OrderBook)]
//!                                               |
//!                                        [Output Events]
//! ```
//!
//! ## Example
//!
//! ```
//! use clob_engine::{Engine, Side};
//! use rust_decimal::Decimal;
//!
//! let mut engine = Engine::with_capacity(1024);
//! engine.submit_limit(Side::Sell, Decimal::new(1000, 2), 100).unwrap();
//! let result = engine.submit_limit(Side::Buy, Decimal::new(1000, 2), 40).unwrap();
//!
//! assert_eq!(result.trades.len(), 1);
//! assert_eq!(engine.depth(1).asks[0].quantity, 60);
//! ```

pub mod arena;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod matching;
pub mod order;
pub mod order_book;
pub mod price_level;
pub mod replay;
pub mod sample;
pub mod trade;

// Re-exports for convenience
pub use arena::{Arena, ArenaIndex, OrderNode, NULL_INDEX};
pub use command::{Command, NewOrder, OutputEvent};
pub use config::EngineConfig;
pub use engine::{Engine, SubmitResult};
pub use error::{ClobError, RejectReason, Result};
pub use matching::MatchingEngine;
pub use order::{Order, OrderId, OrderStatus, OrderType, Side};
pub use order_book::{BookDepth, DepthLevel, OrderBook, RestingOrder};
pub use price_level::PriceLevel;
pub use trade::{Trade, TradeId};
