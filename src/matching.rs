//! Matching Engine - Core order matching algorithm.
//!
//! Implements the cross/rest algorithm:
//! 1. CROSSING: Match the incoming order against the opposite side,
//!    best price first, oldest order first within a price
//! 2. RESTING: Place a limit order's remaining quantity in the book;
//!    a market order's remainder is discarded

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::error::{ClobError, RejectReason, Result};
use crate::order::{Order, OrderType, Side};
use crate::order_book::{OrderBook, RestingOrder};
use crate::trade::{Trade, TradeId};

/// The matching algorithm.
///
/// Holds no book state of its own, only the trade sequence counter, and
/// works on whichever [`OrderBook`] it is handed.
#[derive(Debug)]
pub struct MatchingEngine {
    next_trade_seq: u64,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self { next_trade_seq: 1 }
    }

    /// Process an incoming order against `book`.
    ///
    /// # Algorithm
    /// 1. Validate (quantity, price, duplicate ID) before touching the book
    /// 2. Cross against the opposite side while the price is acceptable
    /// 3. Rest a limit remainder at its own price, discard a market remainder
    ///
    /// `order.remaining` is decremented in place; a discarded market
    /// remainder leaves the order `Cancelled`.
    ///
    /// # Returns
    /// Trades in execution order
    pub fn process_order(&mut self, book: &mut OrderBook, order: &mut Order) -> Result<Vec<Trade>> {
        order.validate()?;
        if book.contains_order(order.id) {
            return Err(ClobError::DuplicateOrderId(order.id));
        }
        if order.order_type == OrderType::Limit && !book.has_capacity() {
            return Err(ClobError::BookFull);
        }
        // An own-side level at the limit price means the order cannot cross,
        // so its whole remainder would join that level.
        if let (OrderType::Limit, Some(price)) = (order.order_type, order.price) {
            if !book.level_has_room(order.side, price, order.remaining) {
                return Err(ClobError::invalid(order.id, RejectReason::LevelQuantityOverflow));
            }
        }

        let trades = self.cross_order(book, order);

        match order.order_type {
            OrderType::Limit => {
                if order.remaining > 0 {
                    // Cannot fail: validated, not resting, capacity checked above.
                    let resting = book.add_order(order)?;
                    order.sequence = resting.sequence;
                }
            }
            OrderType::Market => {
                if order.remaining > 0 {
                    debug!(
                        order_id = %order.id,
                        discarded = order.remaining,
                        "market order remainder discarded"
                    );
                    order.cancel();
                }
            }
        }

        Ok(trades)
    }

    /// Cross (match) an incoming order against the opposite side.
    fn cross_order(&mut self, book: &mut OrderBook, order: &mut Order) -> Vec<Trade> {
        let maker_side = order.side.opposite();
        let mut trades = Vec::new();

        while order.remaining > 0 {
            let Some(level) = book.best_level(maker_side) else {
                break; // No orders on opposite side
            };

            if !Self::price_acceptable(order, level.price()) {
                break;
            }

            let Some(maker) = level.front() else {
                break;
            };

            let qty = order.remaining.min(maker.remaining);
            book.fill_front(maker_side, qty);
            order.fill(qty);

            trades.push(self.record_trade(order, &maker, qty));
        }

        trades
    }

    /// Check if the incoming order accepts the opposite best price.
    #[inline]
    fn price_acceptable(order: &Order, opposite_best: Decimal) -> bool {
        match order.order_type {
            OrderType::Market => true,
            OrderType::Limit => match (order.side, order.price) {
                // Buyer willing to pay >= lowest ask
                (Side::Buy, Some(limit)) => opposite_best <= limit,
                // Seller willing to accept <= highest bid
                (Side::Sell, Some(limit)) => opposite_best >= limit,
                (_, None) => false,
            },
        }
    }

    fn record_trade(&mut self, taker: &Order, maker: &RestingOrder, qty: u64) -> Trade {
        let seq = self.next_trade_seq;
        self.next_trade_seq += 1;

        let trade = Trade {
            trade_id: TradeId(seq),
            sequence: seq,
            resting_order_id: maker.order_id,
            incoming_order_id: taker.id,
            aggressor_side: taker.side,
            // Price improvement goes to the aggressor
            price: maker.price,
            quantity: qty,
            executed_at: Utc::now(),
        };

        trace!(
            trade_id = %trade.trade_id,
            maker = %maker.order_id,
            taker = %taker.id,
            price = %trade.price,
            qty,
            "trade"
        );

        trade
    }

    /// Number of trades produced so far
    pub fn trade_count(&self) -> u64 {
        self.next_trade_seq - 1
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}
