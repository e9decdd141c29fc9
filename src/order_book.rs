//! Order Book - The central limit order book data structure.
//!
//! Bids and asks each live in a `BTreeMap<Decimal, PriceLevel>`: the best
//! bid is the last key, the best ask the first, both O(log n) in the number
//! of distinct prices. Resting orders are arena nodes, and a reverse index
//! maps each order ID to its side, price and arena slot so a cancel never
//! scans a level.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use crate::arena::{Arena, ArenaIndex, OrderNode, NULL_INDEX};
use crate::error::{ClobError, RejectReason, Result};
use crate::order::{Order, OrderId, OrderType, Side};
use crate::price_level::PriceLevel;

/// Mapping from OrderId to its location for O(1) cancel lookup
pub type OrderMap = FxHashMap<OrderId, OrderInfo>;

/// Where a resting order lives
#[derive(Clone, Copy, Debug)]
pub struct OrderInfo {
    /// Index in the arena (position marker within the level)
    pub arena_index: ArenaIndex,
    /// Order side (needed for cancel to find correct book side)
    pub side: Side,
    /// Price level (needed for cancel to find the PriceLevel)
    pub price: Decimal,
}

/// Read-only copy of a resting order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RestingOrder {
    pub order_id: OrderId,
    pub side: Side,
    pub price: Decimal,
    pub quantity: u64,
    pub remaining: u64,
    pub sequence: u64,
}

impl RestingOrder {
    /// Rebuild the full order record.
    pub fn to_order(&self) -> Order {
        let mut order = Order::limit(self.order_id, self.side, self.price, self.quantity);
        order.remaining = self.remaining;
        order.sequence = self.sequence;
        order
    }
}

impl From<&OrderNode> for RestingOrder {
    fn from(node: &OrderNode) -> Self {
        Self {
            order_id: node.order_id,
            side: node.side,
            price: node.price,
            quantity: node.quantity,
            remaining: node.remaining,
            sequence: node.sequence,
        }
    }
}

/// Aggregate of one price level, for display
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DepthLevel {
    pub price: Decimal,
    /// Sum of remaining quantity at this price
    pub quantity: u64,
    pub order_count: u32,
}

impl DepthLevel {
    fn from_level(level: &PriceLevel) -> Self {
        Self {
            price: level.price,
            quantity: level.total_qty,
            order_count: level.count,
        }
    }
}

/// Both sides of the book, best price first
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BookDepth {
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}

/// Borrowed view of one price level and its queue
#[derive(Clone, Copy)]
pub struct LevelView<'a> {
    level: &'a PriceLevel,
    arena: &'a Arena,
}

impl<'a> LevelView<'a> {
    #[inline]
    pub fn price(&self) -> Decimal {
        self.level.price
    }

    #[inline]
    pub fn total_qty(&self) -> u64 {
        self.level.total_qty
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.level.count as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.level.is_empty()
    }

    /// The order that will match next at this price
    pub fn front(&self) -> Option<RestingOrder> {
        match self.level.peek_head() {
            NULL_INDEX => None,
            index => Some(RestingOrder::from(self.arena.get(index))),
        }
    }

    /// The queue in time priority
    pub fn orders(&self) -> impl Iterator<Item = RestingOrder> + 'a {
        let arena = self.arena;
        self.level
            .indices(arena)
            .map(move |index| RestingOrder::from(arena.get(index)))
    }
}

/// Price-ordered, time-ordered storage of resting limit orders.
pub struct OrderBook {
    /// Bid price levels (buy orders), best = highest key
    bids: BTreeMap<Decimal, PriceLevel>,
    /// Ask price levels (sell orders), best = lowest key
    asks: BTreeMap<Decimal, PriceLevel>,
    /// Storage for every resting order
    arena: Arena,
    /// Order lookup map: OrderId -> OrderInfo
    order_map: OrderMap,
    /// Arrival counter stamped on each order as it starts resting
    next_sequence: u64,
}

impl OrderBook {
    /// Create a new empty order book
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a new order book with room for `orders` resting orders
    /// before the arena has to grow
    pub fn with_capacity(orders: u32) -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            arena: Arena::new(orders),
            order_map: FxHashMap::with_capacity_and_hasher(orders as usize, Default::default()),
            next_sequence: 1,
        }
    }

    fn levels(&self, side: Side) -> &BTreeMap<Decimal, PriceLevel> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    // ========================================================================
    // Order Management
    // ========================================================================

    /// Rest a limit order at the back of its price level.
    ///
    /// The order's current `remaining` quantity is what rests. Fails without
    /// touching the book if the order is a market order, fails validation,
    /// or reuses the ID of an order already resting.
    pub fn add_order(&mut self, order: &Order) -> Result<RestingOrder> {
        if order.order_type == OrderType::Market {
            return Err(ClobError::invalid(order.id, RejectReason::MarketOrderNotRestable));
        }
        order.validate()?;
        let price = order
            .price
            .ok_or(ClobError::invalid(order.id, RejectReason::MissingLimitPrice))?;

        if self.order_map.contains_key(&order.id) {
            return Err(ClobError::DuplicateOrderId(order.id));
        }
        if !self.level_has_room(order.side, price, order.remaining) {
            return Err(ClobError::invalid(order.id, RejectReason::LevelQuantityOverflow));
        }

        let arena_index = self.arena.alloc().ok_or(ClobError::BookFull)?;
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let mut node = OrderNode::new(order.id, order.side, price, order.quantity, sequence);
        node.remaining = order.remaining;
        *self.arena.get_mut(arena_index) = node;

        self.order_map.insert(
            order.id,
            OrderInfo {
                arena_index,
                side: order.side,
                price,
            },
        );

        let levels = match order.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
            .push_back(&mut self.arena, arena_index);

        debug!(
            order_id = %order.id,
            side = %order.side,
            %price,
            remaining = order.remaining,
            sequence,
            "order resting"
        );

        Ok(RestingOrder::from(&node))
    }

    /// Remove a resting order (cancel).
    ///
    /// The level is dropped if this was its last order.
    pub fn remove_order(&mut self, order_id: OrderId) -> Result<RestingOrder> {
        let info = self
            .order_map
            .remove(&order_id)
            .ok_or(ClobError::OrderNotFound(order_id))?;

        let removed = RestingOrder::from(self.arena.get(info.arena_index));

        let levels = match info.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        if let Some(level) = levels.get_mut(&info.price) {
            if level.remove(&mut self.arena, info.arena_index) {
                levels.remove(&info.price);
            }
        }
        self.arena.free(info.arena_index);

        debug!(%order_id, side = %info.side, price = %info.price, remaining = removed.remaining, "order removed");
        Ok(removed)
    }

    /// Execute `qty` against the oldest order at the best price on `side`.
    ///
    /// A resting order that reaches zero is unlinked, dropped from the
    /// reverse index and freed in the same step, and its level with it if
    /// the level empties. Returns the order as it stands after the fill.
    pub(crate) fn fill_front(&mut self, side: Side, qty: u64) -> Option<RestingOrder> {
        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let mut entry = match side {
            Side::Buy => levels.last_entry(),
            Side::Sell => levels.first_entry(),
        }?;

        let level = entry.get_mut();
        let index = level.peek_head();
        if index == NULL_INDEX {
            return None;
        }

        let node = self.arena.get(index);
        debug_assert!(qty > 0 && qty <= node.remaining);
        let qty = qty.min(node.remaining);
        let mut filled = RestingOrder::from(node);
        filled.remaining -= qty;

        if filled.remaining == 0 {
            level.pop_front(&mut self.arena);
            if level.is_empty() {
                entry.remove();
            }
            self.order_map.remove(&filled.order_id);
            self.arena.free(index);
        } else {
            self.arena.get_mut(index).remaining = filled.remaining;
            level.subtract_qty(qty);
        }

        Some(filled)
    }

    /// Look up a resting order by ID.
    pub fn get_order(&self, order_id: OrderId) -> Option<RestingOrder> {
        self.order_map
            .get(&order_id)
            .map(|info| RestingOrder::from(self.arena.get(info.arena_index)))
    }

    /// Check if an order is resting.
    #[inline]
    pub fn contains_order(&self, order_id: OrderId) -> bool {
        self.order_map.contains_key(&order_id)
    }

    /// Returns true if another order can be rested.
    #[inline]
    pub fn has_capacity(&self) -> bool {
        !self.arena.is_full()
    }

    /// Returns true if `qty` more can rest at `price` without the level
    /// aggregate overflowing.
    pub fn level_has_room(&self, side: Side, price: Decimal, qty: u64) -> bool {
        self.levels(side)
            .get(&price)
            .map_or(true, |level| level.total_qty.checked_add(qty).is_some())
    }

    // ========================================================================
    // Best Price Access
    // ========================================================================

    /// Highest bid level and its queue
    pub fn best_bid(&self) -> Option<LevelView<'_>> {
        self.best_level(Side::Buy)
    }

    /// Lowest ask level and its queue
    pub fn best_ask(&self) -> Option<LevelView<'_>> {
        self.best_level(Side::Sell)
    }

    /// Top-of-book level on a given side
    pub fn best_level(&self, side: Side) -> Option<LevelView<'_>> {
        let level = match side {
            Side::Buy => self.bids.last_key_value(),
            Side::Sell => self.asks.first_key_value(),
        }
        .map(|(_, level)| level)?;
        Some(LevelView {
            level,
            arena: &self.arena,
        })
    }

    #[inline]
    pub fn best_bid_price(&self) -> Option<Decimal> {
        self.bids.last_key_value().map(|(_, level)| level.price)
    }

    #[inline]
    pub fn best_ask_price(&self) -> Option<Decimal> {
        self.asks.first_key_value().map(|(_, level)| level.price)
    }

    /// Calculate spread (best_ask - best_bid)
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Midpoint between best bid and best ask
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => Some(bid + (ask - bid) / Decimal::TWO),
            _ => None,
        }
    }

    // ========================================================================
    // Depth Snapshots
    // ========================================================================

    /// Up to `levels` aggregated levels on `side`, best price first.
    pub fn peek_depth(&self, side: Side, levels: usize) -> Vec<DepthLevel> {
        match side {
            Side::Buy => self
                .bids
                .values()
                .rev()
                .take(levels)
                .map(DepthLevel::from_level)
                .collect(),
            Side::Sell => self
                .asks
                .values()
                .take(levels)
                .map(DepthLevel::from_level)
                .collect(),
        }
    }

    /// Up to `levels` aggregated levels on both sides.
    pub fn depth(&self, levels: usize) -> BookDepth {
        BookDepth {
            bids: self.peek_depth(Side::Buy, levels),
            asks: self.peek_depth(Side::Sell, levels),
        }
    }

    /// Get (total quantity, order count) at a price level
    pub fn depth_at(&self, side: Side, price: Decimal) -> (u64, u32) {
        self.levels(side)
            .get(&price)
            .map(|l| (l.total_qty, l.count))
            .unwrap_or((0, 0))
    }

    /// Every resting order on `side` in price-time priority.
    pub fn iter_side(&self, side: Side) -> Vec<RestingOrder> {
        let collect_level = |level: &PriceLevel| {
            level
                .indices(&self.arena)
                .map(|index| RestingOrder::from(self.arena.get(index)))
                .collect::<Vec<_>>()
        };
        match side {
            Side::Buy => self.bids.values().rev().flat_map(collect_level).collect(),
            Side::Sell => self.asks.values().flat_map(collect_level).collect(),
        }
    }

    // ========================================================================
    // Utility Methods
    // ========================================================================

    /// Get the total number of orders in the book
    pub fn len(&self) -> usize {
        self.order_map.len()
    }

    /// Check if the book is empty
    pub fn is_empty(&self) -> bool {
        self.order_map.is_empty()
    }

    /// Get the number of bid levels
    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    /// Get the number of ask levels
    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    /// Clear all orders from the book
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.order_map.clear();
        self.arena.clear();
    }

    /// Pre-fault the arena's pages
    pub fn warm_up(&mut self) {
        self.arena.warm_up();
    }

    /// Compute a hash of the current state (for determinism testing)
    pub fn state_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();

        for (side, levels) in [(Side::Buy, &self.bids), (Side::Sell, &self.asks)] {
            side.hash(&mut hasher);
            for level in levels.values() {
                level.price.normalize().hash(&mut hasher);
                level.total_qty.hash(&mut hasher);
                for index in level.indices(&self.arena) {
                    let node = self.arena.get(index);
                    node.order_id.hash(&mut hasher);
                    node.remaining.hash(&mut hasher);
                }
            }
        }

        self.order_map.len().hash(&mut hasher);
        hasher.finish()
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("best_bid", &self.best_bid_price())
            .field("best_ask", &self.best_ask_price())
            .field("bid_levels", &self.bids.len())
            .field("ask_levels", &self.asks.len())
            .field("order_count", &self.order_map.len())
            .finish()
    }
}
