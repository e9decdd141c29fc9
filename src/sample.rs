//! Reference book used by the demo and by tests.
//!
//! Six asks from 100.50 up to 102.00 and six bids from 100.00 down to
//! 99.00, with two orders queued at each top-of-book price.

use rust_decimal::Decimal;

use crate::engine::Engine;
use crate::error::Result;
use crate::order::Side;

/// (quantity, price in cents) for the ask side, best first
pub const SAMPLE_ASKS: [(u64, i64); 6] = [
    (100, 100_50),
    (150, 100_50),
    (200, 101_00),
    (75, 101_25),
    (300, 101_50),
    (50, 102_00),
];

/// (quantity, price in cents) for the bid side, best first
pub const SAMPLE_BIDS: [(u64, i64); 6] = [
    (120, 100_00),
    (80, 100_00),
    (250, 99_75),
    (100, 99_50),
    (175, 99_25),
    (400, 99_00),
];

/// Submit the sample orders into `engine`: all asks first, then all bids.
///
/// The two sides never cross, so no trades are produced.
pub fn populate(engine: &mut Engine) -> Result<()> {
    for (side, orders) in [(Side::Sell, &SAMPLE_ASKS), (Side::Buy, &SAMPLE_BIDS)] {
        for &(quantity, cents) in orders.iter() {
            engine.submit_limit(side, Decimal::new(cents, 2), quantity)?;
        }
    }
    Ok(())
}

/// A fresh engine holding the sample book.
pub fn sample_engine() -> Result<Engine> {
    let mut engine = Engine::with_capacity(64);
    populate(&mut engine)?;
    Ok(engine)
}
