//! Arena Allocator - slab of cache-line aligned resting-order nodes.
//!
//! The arena pre-allocates a contiguous block of nodes at startup and
//! hands them out through a free list. An order's arena index is its
//! position marker: the book's reverse index stores it so a cancel can
//! unlink the node without scanning its price level.
//!
//! Unlike a fixed pool, the arena grows by one node when the free list is
//! exhausted, up to the `u32` index space.

use std::fmt;

use rust_decimal::Decimal;

use crate::order::{OrderId, Side};

/// Sentinel value representing a null/invalid index (like nullptr)
pub const NULL_INDEX: u32 = u32::MAX;

/// Type alias for arena indices - our "compressed pointers"
pub type ArenaIndex = u32;

/// A single resting order - exactly 64 bytes (one cache line).
///
/// # Memory Layout
///
/// | Field      | Type    | Offset | Size |
/// |------------|---------|--------|------|
/// | price      | Decimal | 0      | 16   |
/// | remaining  | u64     | 16     | 8    |
/// | quantity   | u64     | 24     | 8    |
/// | order_id   | OrderId | 32     | 8    |
/// | sequence   | u64     | 40     | 8    |
/// | next       | u32     | 48     | 4    |
/// | prev       | u32     | 52     | 4    |
/// | side       | Side    | 56     | 1    |
/// | _reserved  | [u8;7]  | 57     | 7    |
/// | **Total**  |         |        | 64   |
#[repr(C)]
#[repr(align(64))]
#[derive(Clone, Copy)]
pub struct OrderNode {
    // === Hot Data (frequently accessed during matching) ===

    /// Exact limit price
    pub price: Decimal,

    /// Remaining quantity to fill
    pub remaining: u64,

    /// Original quantity
    pub quantity: u64,

    /// External order ID
    pub order_id: OrderId,

    /// Arrival sequence (tie-break within a level)
    pub sequence: u64,

    // === Linkage (FIFO queue pointers within a PriceLevel) ===

    /// Index of next order at same price level
    pub next: ArenaIndex,

    /// Index of previous order (enables O(1) cancel)
    pub prev: ArenaIndex,

    pub side: Side,

    pub _reserved: [u8; 7],
}

// Compile-time assertion: OrderNode must be exactly 64 bytes
const _: () = assert!(
    std::mem::size_of::<OrderNode>() == 64,
    "OrderNode must be exactly 64 bytes (one cache line)"
);

// Compile-time assertion: OrderNode must be 64-byte aligned
const _: () = assert!(
    std::mem::align_of::<OrderNode>() == 64,
    "OrderNode must be 64-byte aligned"
);

impl OrderNode {
    /// Create a new order node with the given data
    #[inline]
    pub fn new(order_id: OrderId, side: Side, price: Decimal, quantity: u64, sequence: u64) -> Self {
        Self {
            price,
            remaining: quantity,
            quantity,
            order_id,
            sequence,
            next: NULL_INDEX,
            prev: NULL_INDEX,
            side,
            _reserved: [0u8; 7],
        }
    }

    /// Create an empty/uninitialized node (for free list)
    #[inline]
    pub const fn empty() -> Self {
        Self {
            price: Decimal::ZERO,
            remaining: 0,
            quantity: 0,
            order_id: OrderId(0),
            sequence: 0,
            next: NULL_INDEX,
            prev: NULL_INDEX,
            side: Side::Buy,
            _reserved: [0u8; 7],
        }
    }
}

impl fmt::Debug for OrderNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderNode")
            .field("order_id", &self.order_id)
            .field("side", &self.side)
            .field("price", &self.price)
            .field("remaining", &self.remaining)
            .field("quantity", &self.quantity)
            .field("sequence", &self.sequence)
            .field("prev", &self.prev)
            .field("next", &self.next)
            .finish()
    }
}

/// Node pool with O(1) allocation and deallocation.
///
/// Uses a free list threaded through the `next` field of unused nodes.
pub struct Arena {
    /// Contiguous block of nodes
    nodes: Vec<OrderNode>,

    /// Head of the free list (index of first available node)
    free_head: ArenaIndex,

    /// Number of currently allocated nodes
    allocated_count: u32,
}

impl Arena {
    /// Create a new arena with `capacity` nodes pre-allocated.
    ///
    /// # Panics
    /// Panics if capacity is not below `NULL_INDEX` (reserved as the sentinel)
    pub fn new(capacity: u32) -> Self {
        assert!(capacity < NULL_INDEX, "Capacity must be less than NULL_INDEX");

        let mut arena = Self {
            nodes: vec![OrderNode::empty(); capacity as usize],
            free_head: NULL_INDEX,
            allocated_count: 0,
        };
        arena.thread_free_list();
        arena
    }

    /// Link every node into the free list, lowest index first.
    fn thread_free_list(&mut self) {
        let len = self.nodes.len();
        for (i, node) in self.nodes.iter_mut().enumerate() {
            *node = OrderNode::empty();
            node.next = if i + 1 < len { (i + 1) as ArenaIndex } else { NULL_INDEX };
        }
        self.free_head = if len > 0 { 0 } else { NULL_INDEX };
        self.allocated_count = 0;
    }

    /// Allocate a node from the arena, growing it if the free list is empty.
    ///
    /// Returns `None` only once the `u32` index space is exhausted.
    ///
    /// # Complexity
    /// O(1) amortized
    #[inline]
    pub fn alloc(&mut self) -> Option<ArenaIndex> {
        if self.free_head == NULL_INDEX {
            if self.nodes.len() >= NULL_INDEX as usize {
                return None;
            }
            let index = self.nodes.len() as ArenaIndex;
            self.nodes.push(OrderNode::empty());
            self.allocated_count += 1;
            return Some(index);
        }

        let index = self.free_head;
        self.free_head = self.nodes[index as usize].next;
        self.allocated_count += 1;

        self.nodes[index as usize].next = NULL_INDEX;
        self.nodes[index as usize].prev = NULL_INDEX;

        Some(index)
    }

    /// Free a node back to the arena.
    ///
    /// The caller must ensure the index was previously allocated and
    /// has not already been freed.
    ///
    /// # Complexity
    /// O(1) - pushes to head of free list
    #[inline]
    pub fn free(&mut self, index: ArenaIndex) {
        debug_assert!((index as usize) < self.nodes.len(), "Index out of bounds");
        debug_assert!(self.allocated_count > 0, "Double free detected");

        self.nodes[index as usize] = OrderNode::empty();
        self.nodes[index as usize].next = self.free_head;
        self.free_head = index;
        self.allocated_count -= 1;
    }

    #[inline]
    pub fn get(&self, index: ArenaIndex) -> &OrderNode {
        &self.nodes[index as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, index: ArenaIndex) -> &mut OrderNode {
        &mut self.nodes[index as usize]
    }

    /// Returns the number of currently allocated nodes.
    #[inline]
    pub fn allocated(&self) -> u32 {
        self.allocated_count
    }

    /// Returns the number of nodes backing the arena.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.nodes.len() as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.allocated_count == 0
    }

    /// Returns true if no further node can be handed out.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.free_head == NULL_INDEX && self.nodes.len() >= NULL_INDEX as usize
    }

    /// Release every node without shrinking the backing storage.
    pub fn clear(&mut self) {
        self.thread_free_list();
    }

    /// Pre-fault all memory pages (warm-up routine).
    ///
    /// Walks through all nodes to force the OS to map virtual pages
    /// to physical RAM, preventing page faults in the hot path.
    pub fn warm_up(&mut self) {
        for node in &mut self.nodes {
            // SAFETY: `node` is a valid, exclusive reference into the Vec.
            unsafe {
                std::ptr::write_volatile(&mut node._reserved[0], 0);
            }
        }
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.nodes.len())
            .field("allocated", &self.allocated_count)
            .field("free_head", &self.free_head)
            .finish()
    }
}
