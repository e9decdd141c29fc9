//! Engine - the single owned book instance and its public surface.
//!
//! Owns the order book and the matching algorithm, assigns order
//! identifiers, and serializes every mutation. Callers either use the
//! direct methods (`submit`, `cancel`, `depth`) or feed [`Command`]s into
//! the single-writer loop via rtrb ring buffers.

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::command::{
    Command, NewOrder, OrderAccepted, OrderCanceled, OrderDiscarded, OrderFilled, OrderRejected,
    OutputEvent,
};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::matching::MatchingEngine;
use crate::order::{Order, OrderId, OrderStatus, OrderType, Side};
use crate::order_book::{BookDepth, OrderBook, RestingOrder};
use crate::trade::Trade;

/// Outcome of a successful [`Engine::submit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitResult {
    /// Identifier assigned by the engine
    pub order_id: OrderId,
    /// Trades in execution order
    pub trades: Vec<Trade>,
    /// State of the order once the call returned
    pub status: OrderStatus,
    /// Quantity left resting in the book (always 0 for market orders)
    pub resting_quantity: u64,
}

impl SubmitResult {
    /// Total quantity executed on arrival
    pub fn filled_quantity(&self) -> u64 {
        self.trades.iter().map(|t| t.quantity).sum()
    }
}

/// The engine: one book, one writer.
pub struct Engine {
    book: OrderBook,
    matcher: MatchingEngine,
    config: EngineConfig,
    /// Next identifier handed out by `submit`
    next_order_id: u64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        info!(
            initial_capacity = config.initial_capacity,
            depth_levels = config.depth_levels,
            "engine created"
        );
        Self {
            book: OrderBook::with_capacity(config.initial_capacity),
            matcher: MatchingEngine::new(),
            config,
            next_order_id: 1,
        }
    }

    /// Create an engine with the specified initial order capacity.
    pub fn with_capacity(capacity: u32) -> Self {
        Self::new(EngineConfig {
            initial_capacity: capacity,
            ..EngineConfig::default()
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read-only access to the book
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Build an order, assign it an identifier and match it.
    ///
    /// The identifier is only consumed when the order is accepted, so a
    /// rejected submission leaves no gap.
    pub fn submit(
        &mut self,
        side: Side,
        order_type: OrderType,
        price: Option<Decimal>,
        quantity: u64,
    ) -> Result<SubmitResult> {
        let order_id = OrderId(self.next_order_id);
        let mut order = Order::new(order_id, side, order_type, price, quantity);
        let trades = self.process_order(&mut order)?;

        let resting_quantity = match order.status() {
            OrderStatus::New | OrderStatus::PartiallyFilled => order.remaining,
            OrderStatus::Filled | OrderStatus::Cancelled => 0,
        };

        Ok(SubmitResult {
            order_id,
            trades,
            status: order.status(),
            resting_quantity,
        })
    }

    /// Shorthand for a limit [`submit`](Self::submit).
    pub fn submit_limit(&mut self, side: Side, price: Decimal, quantity: u64) -> Result<SubmitResult> {
        self.submit(side, OrderType::Limit, Some(price), quantity)
    }

    /// Shorthand for a market [`submit`](Self::submit).
    pub fn submit_market(&mut self, side: Side, quantity: u64) -> Result<SubmitResult> {
        self.submit(side, OrderType::Market, None, quantity)
    }

    /// Match a caller-built order.
    ///
    /// The engine's own identifier counter is moved past `order.id` so
    /// later `submit` calls never reuse it.
    pub fn process_order(&mut self, order: &mut Order) -> Result<Vec<Trade>> {
        match self.matcher.process_order(&mut self.book, order) {
            Ok(trades) => {
                self.next_order_id = self.next_order_id.max(order.id.0.saturating_add(1));
                debug!(
                    order_id = %order.id,
                    trades = trades.len(),
                    status = ?order.status(),
                    "order processed"
                );
                Ok(trades)
            }
            Err(err) => {
                warn!(order_id = %order.id, error = %err, "order rejected");
                Err(err)
            }
        }
    }

    /// Cancel a resting order, reporting success as a boolean.
    pub fn cancel(&mut self, order_id: OrderId) -> bool {
        self.try_cancel(order_id).is_ok()
    }

    /// Cancel a resting order.
    ///
    /// # Errors
    /// [`ClobError::OrderNotFound`](crate::ClobError::OrderNotFound) if the
    /// identifier is not resting (never existed, filled, or cancelled).
    pub fn try_cancel(&mut self, order_id: OrderId) -> Result<RestingOrder> {
        let removed = self.book.remove_order(order_id);
        if let Err(err) = &removed {
            debug!(%order_id, error = %err, "cancel failed");
        }
        removed
    }

    /// Aggregated depth, up to `levels` per side from the best price outward.
    pub fn depth(&self, levels: usize) -> BookDepth {
        self.book.depth(levels)
    }

    /// Depth using the configured number of levels.
    pub fn default_depth(&self) -> BookDepth {
        self.book.depth(self.config.depth_levels)
    }

    /// Drop every resting order. Identifiers keep counting up.
    pub fn reset(&mut self) {
        info!(dropped = self.book.len(), "engine reset");
        self.book.clear();
    }

    /// Process a single command and return output events.
    ///
    /// This is the entry point of the single-writer loop and of
    /// synchronous callers that want events rather than results.
    pub fn process_command(&mut self, cmd: Command) -> Vec<OutputEvent> {
        match cmd {
            Command::Submit(new_order) => self.process_submit(new_order),
            Command::Place(order) => self.process_place(order),
            Command::Cancel(order_id) => match self.try_cancel(order_id) {
                Ok(removed) => vec![OutputEvent::Canceled(OrderCanceled {
                    order_id,
                    canceled_qty: removed.remaining,
                })],
                Err(err) => vec![OutputEvent::Rejected(OrderRejected::from_error(order_id, &err))],
            },
        }
    }

    fn process_submit(&mut self, new_order: NewOrder) -> Vec<OutputEvent> {
        let order = Order::new(
            OrderId(self.next_order_id),
            new_order.side,
            new_order.order_type,
            new_order.price,
            new_order.quantity,
        );
        self.process_place(order)
    }

    fn process_place(&mut self, mut order: Order) -> Vec<OutputEvent> {
        let trades = match self.process_order(&mut order) {
            Ok(trades) => trades,
            Err(err) => return vec![OutputEvent::Rejected(OrderRejected::from_error(order.id, &err))],
        };

        let mut events: Vec<OutputEvent> = trades.into_iter().map(OutputEvent::Trade).collect();

        match order.status() {
            OrderStatus::Filled => events.push(OutputEvent::Filled(OrderFilled {
                order_id: order.id,
                quantity: order.quantity,
            })),
            OrderStatus::Cancelled => events.push(OutputEvent::Discarded(OrderDiscarded {
                order_id: order.id,
                discarded_qty: order.remaining,
            })),
            OrderStatus::New | OrderStatus::PartiallyFilled => {
                if let Some(resting) = self.book.get_order(order.id) {
                    events.push(OutputEvent::Accepted(OrderAccepted {
                        order_id: order.id,
                        side: resting.side,
                        price: resting.price,
                        resting_qty: resting.remaining,
                    }));
                }
            }
        }

        events
    }

    /// Run the engine event loop.
    ///
    /// # Arguments
    /// * `input` - Consumer end of the command ring buffer
    /// * `output` - Producer end of the output event ring buffer
    ///
    /// Returns once the producer side of `input` is dropped and drained.
    #[cfg(feature = "runtime")]
    pub fn run(
        &mut self,
        input: &mut rtrb::Consumer<Command>,
        output: &mut rtrb::Producer<OutputEvent>,
    ) {
        if self.config.pin_to_core {
            self.pin_to_core();
        }

        self.warm_up();
        info!(pinned = self.config.pin_to_core, "engine loop started");

        // Main event loop (busy-wait)
        loop {
            while let Ok(cmd) = input.pop() {
                for event in self.process_command(cmd) {
                    // Best effort - drop if full
                    if output.push(event).is_err() {
                        warn!("output ring full, event dropped");
                    }
                }
            }
            if input.is_abandoned() && input.is_empty() {
                break;
            }
            std::hint::spin_loop();
        }

        info!(resting = self.book.len(), "engine loop stopped");
    }

    /// Pin the current thread to the last available CPU core.
    ///
    /// The last core is typically isolated from OS interrupts.
    pub fn pin_to_core(&self) -> bool {
        let pinned = core_affinity::get_core_ids()
            .and_then(|ids| ids.last().copied())
            .map(core_affinity::set_for_current)
            .unwrap_or(false);
        if !pinned {
            warn!("could not pin engine thread to a core");
        }
        pinned
    }

    /// Warm up the engine by pre-faulting memory pages.
    pub fn warm_up(&mut self) {
        self.book.warm_up();
    }

    #[inline]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.book.best_bid_price()
    }

    #[inline]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.book.best_ask_price()
    }

    #[inline]
    pub fn spread(&self) -> Option<Decimal> {
        self.book.spread()
    }

    /// Number of resting orders.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.book.len()
    }

    /// Number of trades produced since construction.
    pub fn trade_count(&self) -> u64 {
        self.matcher.trade_count()
    }

    /// Compute state hash for determinism testing.
    #[inline]
    pub fn state_hash(&self) -> u64 {
        self.book.state_hash()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order_book::DepthLevel;
    use rust_decimal_macros::dec;

    #[test]
    fn test_engine_creation() {
        let engine = Engine::with_capacity(10_000);
        assert_eq!(engine.order_count(), 0);
        assert_eq!(engine.best_bid(), None);
        assert_eq!(engine.best_ask(), None);
        assert_eq!(engine.config().depth_levels, 10);
    }

    #[test]
    fn test_submit_assigns_sequential_ids() {
        let mut engine = Engine::with_capacity(16);

        let a = engine.submit_limit(Side::Buy, dec!(10), 5).unwrap();
        let b = engine.submit_limit(Side::Buy, dec!(9), 5).unwrap();

        assert_eq!(a.order_id, OrderId(1));
        assert_eq!(b.order_id, OrderId(2));
        assert_eq!(a.status, OrderStatus::New);
        assert_eq!(a.resting_quantity, 5);
    }

    #[test]
    fn test_rejected_submit_does_not_consume_id() {
        let mut engine = Engine::with_capacity(16);

        assert!(engine.submit_limit(Side::Buy, dec!(0), 5).is_err());
        assert!(engine.submit(Side::Buy, OrderType::Limit, None, 5).is_err());
        let ok = engine.submit_limit(Side::Buy, dec!(1), 5).unwrap();

        assert_eq!(ok.order_id, OrderId(1));
    }

    #[test]
    fn test_submit_market_reports_discard() {
        let mut engine = Engine::with_capacity(16);
        engine.submit_limit(Side::Sell, dec!(10), 30).unwrap();

        let result = engine.submit_market(Side::Buy, 50).unwrap();

        assert_eq!(result.filled_quantity(), 30);
        assert_eq!(result.status, OrderStatus::Cancelled);
        assert_eq!(result.resting_quantity, 0);
        assert_eq!(engine.order_count(), 0);
    }

    #[test]
    fn test_process_order_advances_id_counter() {
        let mut engine = Engine::with_capacity(16);
        let mut order = Order::limit(OrderId(41), Side::Sell, dec!(5), 1);
        engine.process_order(&mut order).unwrap();

        let next = engine.submit_limit(Side::Sell, dec!(6), 1).unwrap();
        assert_eq!(next.order_id, OrderId(42));
    }

    #[test]
    fn test_cancel_round_trip() {
        let mut engine = Engine::with_capacity(16);
        let placed = engine.submit_limit(Side::Buy, dec!(10), 100).unwrap();

        assert!(engine.cancel(placed.order_id));
        assert!(engine.depth(5).bids.is_empty());
        assert!(!engine.cancel(placed.order_id));
        assert!(matches!(
            engine.try_cancel(placed.order_id),
            Err(crate::ClobError::OrderNotFound(id)) if id == placed.order_id
        ));
    }

    #[test]
    fn test_depth_delegates_to_book() {
        let mut engine = Engine::with_capacity(16);
        engine.submit_limit(Side::Buy, dec!(10), 5).unwrap();
        engine.submit_limit(Side::Buy, dec!(10), 7).unwrap();
        engine.submit_limit(Side::Sell, dec!(11), 3).unwrap();

        let depth = engine.depth(1);
        assert_eq!(
            depth.bids,
            vec![DepthLevel { price: dec!(10), quantity: 12, order_count: 2 }]
        );
        assert_eq!(
            depth.asks,
            vec![DepthLevel { price: dec!(11), quantity: 3, order_count: 1 }]
        );
        assert_eq!(engine.spread(), Some(dec!(1)));
    }

    #[test]
    fn test_reset_keeps_id_counter() {
        let mut engine = Engine::with_capacity(16);
        engine.submit_limit(Side::Buy, dec!(10), 5).unwrap();
        engine.reset();

        assert_eq!(engine.order_count(), 0);
        assert_eq!(engine.submit_limit(Side::Buy, dec!(10), 5).unwrap().order_id, OrderId(2));
    }

    #[test]
    fn test_engine_process_submit_events() {
        let mut engine = Engine::with_capacity(16);

        let events = engine.process_command(Command::Submit(NewOrder::limit(Side::Sell, dec!(10), 10)));
        assert_eq!(
            events,
            vec![OutputEvent::Accepted(OrderAccepted {
                order_id: OrderId(1),
                side: Side::Sell,
                price: dec!(10),
                resting_qty: 10,
            })]
        );

        let events = engine.process_command(Command::Submit(NewOrder::market(Side::Buy, 15)));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_trade().map(|t| t.quantity), Some(10));
        assert_eq!(
            events[1],
            OutputEvent::Discarded(OrderDiscarded { order_id: OrderId(2), discarded_qty: 5 })
        );
    }

    #[test]
    fn test_engine_process_cancel_events() {
        let mut engine = Engine::with_capacity(16);
        engine.process_command(Command::Submit(NewOrder::limit(Side::Buy, dec!(10), 100)));

        let events = engine.process_command(Command::Cancel(OrderId(1)));
        assert_eq!(
            events,
            vec![OutputEvent::Canceled(OrderCanceled { order_id: OrderId(1), canceled_qty: 100 })]
        );

        let events = engine.process_command(Command::Cancel(OrderId(1)));
        assert!(matches!(events.as_slice(), [OutputEvent::Rejected(r)] if r.order_id == OrderId(1)));
    }

    #[test]
    fn test_engine_state_hash_determinism() {
        let mut engine1 = Engine::with_capacity(1000);
        let mut engine2 = Engine::with_capacity(1000);

        for i in 0..100u64 {
            let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
            let price = dec!(100) + Decimal::from(i % 10) / dec!(10);
            let cmd = Command::Submit(NewOrder::limit(side, price, 100));
            engine1.process_command(cmd.clone());
            engine2.process_command(cmd);
        }

        assert_eq!(engine1.state_hash(), engine2.state_hash());
    }

    #[test]
    fn test_engine_warm_up() {
        let mut engine = Engine::with_capacity(1000);
        engine.warm_up(); // Should not panic
    }
}
