//! Replay - load an order flow from CSV and run it through an engine.
//!
//! Expected header: `action,order_id,side,order_type,price,quantity`
//!
//! ```text
//! action,order_id,side,order_type,price,quantity
//! submit,1,sell,limit,10.00,100
//! submit,,buy,market,,50
//! cancel,1,,,,
//! ```
//!
//! A submit row with an `order_id` keeps that identifier; without one the
//! engine assigns the next free identifier. `order_type` defaults to
//! `limit`.

use std::fs::File;
use std::io;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::command::{Command, NewOrder, OutputEvent};
use crate::engine::Engine;
use crate::error::{ClobError, Result};
use crate::order::{Order, OrderId, OrderType, Side};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Action {
    Submit,
    Cancel,
}

/// One CSV row before validation
#[derive(Debug, Deserialize)]
struct ReplayRow {
    action: Action,
    order_id: Option<u64>,
    side: Option<Side>,
    order_type: Option<OrderType>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    price: Option<Decimal>,
    quantity: Option<u64>,
}

impl ReplayRow {
    fn into_command(self, line: u64) -> Result<Command> {
        let missing = |field: &str| ClobError::Replay {
            line,
            message: format!("{:?} row is missing `{field}`", self.action),
        };

        match self.action {
            Action::Cancel => {
                let id = self.order_id.ok_or_else(|| missing("order_id"))?;
                Ok(Command::Cancel(OrderId(id)))
            }
            Action::Submit => {
                let side = self.side.ok_or_else(|| missing("side"))?;
                let quantity = self.quantity.ok_or_else(|| missing("quantity"))?;
                let order_type = self.order_type.unwrap_or(OrderType::Limit);

                Ok(match self.order_id {
                    Some(id) => Command::Place(Order::new(
                        OrderId(id),
                        side,
                        order_type,
                        self.price,
                        quantity,
                    )),
                    None => Command::Submit(NewOrder {
                        side,
                        order_type,
                        price: self.price,
                        quantity,
                    }),
                })
            }
        }
    }
}

/// Parse commands from any CSV source.
pub fn from_reader<R: io::Read>(source: R) -> Result<Vec<Command>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);
    let headers = reader.headers()?.clone();

    let mut commands = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let row: ReplayRow = record.deserialize(Some(&headers))?;
        commands.push(row.into_command(line)?);
    }

    debug!(commands = commands.len(), "replay parsed");
    Ok(commands)
}

/// Parse commands from a CSV file.
pub fn load_commands<P: AsRef<Path>>(path: P) -> Result<Vec<Command>> {
    let file = File::open(path)?;
    from_reader(io::BufReader::new(file))
}

/// Feed `commands` through `engine` in order, collecting every event.
pub fn replay<I>(engine: &mut Engine, commands: I) -> Vec<OutputEvent>
where
    I: IntoIterator<Item = Command>,
{
    commands
        .into_iter()
        .flat_map(|cmd| engine.process_command(cmd))
        .collect()
}
