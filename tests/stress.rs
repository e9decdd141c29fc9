//! Stress Tests - Push the engine to its limits.
//!
//! These tests verify correctness under extreme conditions:
//! - Operation past the pre-allocated capacity
//! - High contention at single price levels
//! - Rapid order churn
//! - Extreme values for prices and quantities
//! - Many threads serialized through one engine

use clob_engine::{
    ClobError, Command, Engine, NewOrder, Order, OrderId, OrderStatus, OutputEvent, RejectReason,
    Side,
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};
use std::thread;

fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

// ============================================================================
// Capacity Stress Tests
// ============================================================================

#[test]
fn test_grows_past_initial_capacity() {
    const CAPACITY: u32 = 100;
    let mut engine = Engine::with_capacity(CAPACITY);

    // Non-overlapping prices: bids 80.00-80.99, asks 100.00-100.99
    for i in 0..(CAPACITY as i64 * 5) {
        let (side, price) = if i % 2 == 0 {
            (Side::Buy, cents(8000 + i % 100))
        } else {
            (Side::Sell, cents(10000 + i % 100))
        };
        let result = engine.submit_limit(side, price, 100).unwrap();
        assert_eq!(result.status, OrderStatus::New, "Order {} should rest", i);
    }

    assert_eq!(engine.order_count(), CAPACITY as usize * 5);
}

#[test]
fn test_arena_reuse_after_cancel() {
    let mut engine = Engine::with_capacity(100);

    for _ in 0..100 {
        engine.submit_limit(Side::Buy, dec!(90), 100).unwrap();
    }
    assert!(engine.cancel(OrderId(50)));

    let result = engine.submit_limit(Side::Buy, dec!(90), 100).unwrap();
    assert_eq!(result.resting_quantity, 100);
    assert_eq!(engine.order_count(), 100);

    // The replacement queues behind every surviving order
    let last = engine.book().iter_side(Side::Buy).last().copied().unwrap();
    assert_eq!(last.order_id, result.order_id);
}

#[test]
fn test_arena_returns_all_slots() {
    const COUNT: i64 = 1000;
    let mut engine = Engine::with_capacity(COUNT as u32);

    for i in 0..COUNT {
        let (side, price) = if i % 2 == 0 {
            (Side::Buy, cents(5000 + (i / 2) % 500))
        } else {
            (Side::Sell, cents(15000 + (i / 2) % 500))
        };
        engine.submit_limit(side, price, 100).unwrap();
    }
    assert_eq!(engine.order_count(), COUNT as usize);

    for id in 1..=COUNT as u64 {
        assert!(engine.cancel(OrderId(id)), "cancel #{} failed", id);
    }
    assert_eq!(engine.order_count(), 0);
    assert_eq!(engine.book().bid_levels(), 0);
    assert_eq!(engine.book().ask_levels(), 0);

    for _ in 0..COUNT {
        engine.submit_limit(Side::Buy, dec!(100), 100).unwrap();
    }
    assert_eq!(engine.depth(1).bids[0].order_count, COUNT as u32);
}

// ============================================================================
// High Contention Tests
// ============================================================================

#[test]
fn test_single_price_level_contention() {
    let mut engine = Engine::with_capacity(10_000);
    const ORDERS: u64 = 1000;

    for _ in 0..ORDERS {
        engine.submit_limit(Side::Sell, dec!(100), 10).unwrap();
    }
    assert_eq!(engine.book().ask_levels(), 1);
    assert_eq!(engine.book().depth_at(Side::Sell, dec!(100)), (ORDERS * 10, ORDERS as u32));

    // One big buy sweeps the whole level
    let result = engine.submit_limit(Side::Buy, dec!(100), ORDERS * 10).unwrap();

    assert_eq!(result.trades.len(), ORDERS as usize);
    assert_eq!(result.status, OrderStatus::Filled);
    assert_eq!(engine.order_count(), 0);
    assert_eq!(engine.best_ask(), None);
}

#[test]
fn test_fifo_priority_under_contention() {
    let mut engine = Engine::with_capacity(10_000);

    for _ in 0..500 {
        engine.submit_limit(Side::Buy, dec!(50.25), 3).unwrap();
    }

    // Sell in odd-sized chunks; makers must be consumed strictly in id order
    let mut expected_maker = 1u64;
    let mut maker_left = 3u64;
    for _ in 0..100 {
        let result = engine.submit_limit(Side::Sell, dec!(50.25), 7).unwrap();
        for trade in &result.trades {
            assert_eq!(trade.resting_order_id, OrderId(expected_maker));
            maker_left -= trade.quantity;
            if maker_left == 0 {
                expected_maker += 1;
                maker_left = 3;
            }
        }
    }
}

// ============================================================================
// Rapid Churn Tests
// ============================================================================

#[test]
fn test_rapid_add_cancel_cycles() {
    let mut engine = Engine::with_capacity(1000);

    for cycle in 0..10_000u64 {
        let result = engine.submit_limit(Side::Buy, dec!(100), 100).unwrap();
        assert!(engine.cancel(result.order_id), "cycle {}", cycle);
    }

    assert_eq!(engine.order_count(), 0);
    assert!(engine.book().is_empty());
}

#[test]
fn test_rapid_match_cycles() {
    let mut engine = Engine::with_capacity(1000);

    for _ in 0..10_000 {
        engine.submit_limit(Side::Sell, dec!(100), 100).unwrap();
        let result = engine.submit_limit(Side::Buy, dec!(100), 100).unwrap();
        assert_eq!(result.trades.len(), 1);
    }

    assert_eq!(engine.order_count(), 0);
    assert_eq!(engine.trade_count(), 10_000);
}

// ============================================================================
// Edge Case Tests
// ============================================================================

#[test]
fn test_zero_price_rejected() {
    let mut engine = Engine::with_capacity(100);

    let err = engine.submit_limit(Side::Buy, Decimal::ZERO, 100).unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::NonPositivePrice));

    let err = engine.submit_limit(Side::Sell, dec!(-1.5), 100).unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::NonPositivePrice));

    assert_eq!(engine.order_count(), 0);
}

#[test]
fn test_tiny_and_huge_prices() {
    let mut engine = Engine::with_capacity(100);

    engine.submit_limit(Side::Buy, dec!(0.00000001), 1).unwrap();
    engine.submit_limit(Side::Sell, Decimal::MAX, 1).unwrap();

    assert_eq!(engine.best_bid(), Some(dec!(0.00000001)));
    assert_eq!(engine.best_ask(), Some(Decimal::MAX));

    // A market buy takes the absurd ask at exactly its price
    let result = engine.submit_market(Side::Buy, 1).unwrap();
    assert_eq!(result.trades[0].price, Decimal::MAX);
}

#[test]
fn test_max_quantity() {
    let mut engine = Engine::with_capacity(100);

    engine.submit_limit(Side::Sell, dec!(100), u64::MAX).unwrap();
    let result = engine.submit_limit(Side::Buy, dec!(100), u64::MAX - 1).unwrap();

    assert_eq!(result.trades[0].quantity, u64::MAX - 1);
    assert_eq!(engine.book().depth_at(Side::Sell, dec!(100)), (1, 1));
}

#[test]
fn test_mid_price_with_huge_ask() {
    let mut engine = Engine::with_capacity(100);

    engine.submit_limit(Side::Buy, dec!(1), 1).unwrap();
    engine.submit_limit(Side::Sell, Decimal::MAX, 1).unwrap();

    let mid = engine.book().mid_price().unwrap();
    assert!(mid > dec!(1) && mid < Decimal::MAX);
}

#[test]
fn test_large_quantities_aggregate_at_one_level() {
    let mut engine = Engine::with_capacity(100);
    let third = u64::MAX / 3;

    for _ in 0..3 {
        engine.submit_limit(Side::Sell, dec!(10), third).unwrap();
    }
    let depth = engine.depth(1);
    assert_eq!(depth.asks[0].quantity, third * 3);
    assert_eq!(depth.asks[0].order_count, 3);

    // A fourth would overflow the level aggregate; nothing changes
    let before = engine.state_hash();
    let err = engine.submit_limit(Side::Sell, dec!(10), third).unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::LevelQuantityOverflow));
    assert_eq!(engine.state_hash(), before);
    assert_eq!(engine.order_count(), 3);

    // The level drains normally
    let result = engine.submit_market(Side::Buy, u64::MAX).unwrap();
    assert_eq!(result.filled_quantity(), third * 3);
    assert!(engine.depth(1).asks.is_empty());
}

#[test]
fn test_quantity_one() {
    let mut engine = Engine::with_capacity(100);

    engine.submit_limit(Side::Sell, dec!(100), 1).unwrap();
    let result = engine.submit_limit(Side::Buy, dec!(100), 1).unwrap();

    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.trades[0].quantity, 1);
    assert_eq!(engine.order_count(), 0);
}

#[test]
fn test_many_price_levels() {
    let mut engine = Engine::with_capacity(10_000);

    for i in 0..5000 {
        engine.submit_limit(Side::Buy, cents(10_000 + i), 1).unwrap();
    }

    assert_eq!(engine.book().bid_levels(), 5000);
    assert_eq!(engine.best_bid(), Some(cents(14_999)));

    // Sweep the top 100 levels
    let result = engine.submit_limit(Side::Sell, cents(14_900), 100).unwrap();
    assert_eq!(result.trades.len(), 100);
    assert_eq!(result.trades[0].price, cents(14_999));
    assert_eq!(result.trades[99].price, cents(14_900));
    assert_eq!(engine.best_bid(), Some(cents(14_899)));
}

// ============================================================================
// Cancel Edge Cases
// ============================================================================

#[test]
fn test_double_cancel() {
    let mut engine = Engine::with_capacity(100);
    let placed = engine.submit_limit(Side::Buy, dec!(100), 100).unwrap();

    assert!(engine.cancel(placed.order_id));
    assert!(matches!(
        engine.try_cancel(placed.order_id),
        Err(ClobError::OrderNotFound(_))
    ));
}

#[test]
fn test_cancel_after_partial_fill() {
    let mut engine = Engine::with_capacity(100);
    let maker = engine.submit_limit(Side::Sell, dec!(100), 100).unwrap();
    engine.submit_limit(Side::Buy, dec!(100), 30).unwrap();

    let removed = engine.try_cancel(maker.order_id).unwrap();
    assert_eq!(removed.quantity, 100);
    assert_eq!(removed.remaining, 70);
    assert_eq!(engine.best_ask(), None);
}

#[test]
fn test_cancel_filled_order_fails() {
    let mut engine = Engine::with_capacity(100);
    let maker = engine.submit_limit(Side::Sell, dec!(100), 10).unwrap();
    engine.submit_market(Side::Buy, 10).unwrap();

    assert!(!engine.cancel(maker.order_id));
}

// ============================================================================
// Matching Edge Cases
// ============================================================================

#[test]
fn test_self_trade_allowed() {
    let mut engine = Engine::with_capacity(100);

    // Same originator on both sides is not filtered
    let events = engine.process_command(Command::Place(Order::limit(OrderId(1), Side::Sell, dec!(100), 100)));
    assert!(matches!(events[0], OutputEvent::Accepted(_)));
    let events = engine.process_command(Command::Place(Order::limit(OrderId(2), Side::Buy, dec!(100), 100)));
    assert!(events.iter().any(|e| e.as_trade().is_some()));
}

#[test]
fn test_partial_match_across_levels() {
    let mut engine = Engine::with_capacity(100);

    for i in 0..5 {
        engine.submit_limit(Side::Sell, cents(10_000 + i * 10), 20).unwrap();
    }

    let result = engine.submit_limit(Side::Buy, cents(10_020), 100).unwrap();
    assert_eq!(result.filled_quantity(), 60);
    assert_eq!(result.resting_quantity, 40);
    assert_eq!(result.status, OrderStatus::PartiallyFilled);
    assert_eq!(engine.best_bid(), Some(cents(10_020)));
    assert_eq!(engine.best_ask(), Some(cents(10_030)));
}

// ============================================================================
// Large Scale Fuzzing
// ============================================================================

#[test]
fn test_large_random_workload() {
    const SEED: u64 = 0xABCDEF123456;
    const OPS: usize = 50_000;

    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let mut engine = Engine::with_capacity(100_000);

    let mut resting_orders = Vec::new();
    let mut total_trades = 0u64;
    let mut total_cancels = 0u64;

    for _ in 0..OPS {
        let op = rng.gen_range(0..100);

        if op < 60 || resting_orders.is_empty() {
            let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
            let qty = rng.gen_range(1..500);
            let cmd = if op < 5 {
                NewOrder::market(side, qty)
            } else {
                NewOrder::limit(side, cents(rng.gen_range(9000..11000)), qty)
            };
            let events = engine.process_command(Command::Submit(cmd));

            for event in &events {
                match event {
                    OutputEvent::Trade(_) => total_trades += 1,
                    OutputEvent::Accepted(a) => resting_orders.push(a.order_id),
                    _ => {}
                }
            }
        } else {
            let idx = rng.gen_range(0..resting_orders.len());
            let order_id = resting_orders.swap_remove(idx);

            if engine.cancel(order_id) {
                total_cancels += 1;
            }
        }

        if let (Some(bid), Some(ask)) = (engine.best_bid(), engine.best_ask()) {
            assert!(bid < ask, "crossed book: bid {} >= ask {}", bid, ask);
        }
    }

    println!("Large workload test completed:");
    println!("  Operations: {}", OPS);
    println!("  Total trades: {}", total_trades);
    println!("  Total cancels: {}", total_cancels);
    println!("  Final book size: {}", engine.order_count());
}

// ============================================================================
// Serialized Concurrent Access
// ============================================================================

#[test]
fn test_threads_serialized_through_mutex() {
    const THREADS: u64 = 8;
    const ORDERS_PER_THREAD: u64 = 500;

    let engine = Arc::new(Mutex::new(Engine::with_capacity(10_000)));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let mut rng = ChaCha8Rng::seed_from_u64(t);
                let mut traded = 0u64;
                for _ in 0..ORDERS_PER_THREAD {
                    let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
                    let price = cents(rng.gen_range(9900..10100));
                    let mut guard = engine.lock().unwrap();
                    let result = guard.submit_limit(side, price, 10).unwrap();
                    traded += result.filled_quantity();
                }
                traded
            })
        })
        .collect();

    let traded: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

    let engine = engine.lock().unwrap();
    let depth = engine.depth(usize::MAX);
    let resting: u64 = depth
        .bids
        .iter()
        .chain(depth.asks.iter())
        .map(|l| l.quantity)
        .sum();

    // Every unit submitted either rests or was matched against another unit
    assert_eq!(resting + 2 * traded, THREADS * ORDERS_PER_THREAD * 10);
    if let (Some(bid), Some(ask)) = (engine.best_bid(), engine.best_ask()) {
        assert!(bid < ask);
    }
}

#[cfg(feature = "runtime")]
#[test]
fn test_single_writer_ring_buffer_loop() {
    let (mut cmd_tx, mut cmd_rx) = rtrb::RingBuffer::<Command>::new(1024);
    let (mut evt_tx, mut evt_rx) = rtrb::RingBuffer::<OutputEvent>::new(4096);

    let worker = thread::spawn(move || {
        let mut engine = Engine::with_capacity(1024);
        engine.run(&mut cmd_rx, &mut evt_tx);
        engine.order_count()
    });

    cmd_tx.push(Command::Submit(NewOrder::limit(Side::Sell, dec!(10), 100))).unwrap();
    cmd_tx.push(Command::Submit(NewOrder::limit(Side::Buy, dec!(10), 40))).unwrap();
    cmd_tx.push(Command::Cancel(OrderId(1))).unwrap();
    drop(cmd_tx);

    let resting = worker.join().unwrap();
    let mut events = Vec::new();
    while let Ok(event) = evt_rx.pop() {
        events.push(event);
    }

    assert_eq!(resting, 0);
    assert!(events.iter().any(|e| e.as_trade().map(|t| t.quantity) == Some(40)));
    assert!(events
        .iter()
        .any(|e| matches!(e, OutputEvent::Canceled(c) if c.canceled_qty == 60)));
}
