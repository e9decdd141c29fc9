use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clob_engine::{
    replay, sample, BookDepth, ClobError, Engine, EngineConfig, OrderId, OutputEvent, Side,
    SubmitResult, Trade,
};
use rust_decimal::Decimal;

#[derive(Parser, Debug)]
#[command(name = "clob-demo", about = "Central limit order book demo")]
struct Cli {
    /// Levels per side shown when printing the book
    #[arg(long, global = true)]
    depth: Option<usize>,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Interactive session (default)
    Repl,
    /// Print the sample book, sweep it with a market buy, print it again
    Sample,
    /// Run an order flow from a CSV file
    Replay {
        file: PathBuf,
        /// Print events as JSON lines instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = EngineConfig::from_env()?;
    if let Some(depth) = cli.depth {
        config.depth_levels = depth;
    }

    match cli.command.unwrap_or(Mode::Repl) {
        Mode::Repl => run_repl(config),
        Mode::Sample => run_sample(config.depth_levels),
        Mode::Replay { file, json } => run_replay(config, file, json),
    }
}

// ============================================================================
// Output
// ============================================================================

fn print_book(depth: &BookDepth) {
    println!("\n{}", "=".repeat(40));
    println!("ORDER BOOK");
    println!("{}", "=".repeat(40));

    println!("ASKS (Sell Orders):");
    if depth.asks.is_empty() {
        println!("  (empty)");
    }
    for level in depth.asks.iter().rev() {
        println!("  {:>8} @ {}", level.quantity, level.price);
    }

    println!("{}", "-".repeat(40));

    println!("BIDS (Buy Orders):");
    if depth.bids.is_empty() {
        println!("  (empty)");
    }
    for level in &depth.bids {
        println!("  {:>8} @ {}", level.quantity, level.price);
    }

    if let (Some(bid), Some(ask)) = (depth.bids.first(), depth.asks.first()) {
        println!("\nSpread: {}", ask.price - bid.price);
    }
    println!("{}\n", "=".repeat(40));
}

fn print_full_book(depth: &BookDepth) {
    println!("\n{}", "=".repeat(50));
    println!("ORDER BOOK - FULL DEPTH");
    println!("{}", "=".repeat(50));

    println!("\nASKS (Sell Orders):");
    println!("{:>12} | {:>10} | {:>10}", "Price", "Quantity", "Cumulative");
    println!("{}", "-".repeat(38));
    // Cumulative from the best ask outward, printed worst first
    let mut cumulative = 0;
    let asks: Vec<_> = depth
        .asks
        .iter()
        .map(|level| {
            cumulative += level.quantity;
            (level, cumulative)
        })
        .collect();
    for (level, total) in asks.iter().rev() {
        println!("{:>12} | {:>10} | {:>10}", level.price, level.quantity, total);
    }

    println!("\n{}", "-".repeat(50));
    if let (Some(bid), Some(ask)) = (depth.bids.first(), depth.asks.first()) {
        let mid = bid.price + (ask.price - bid.price) / Decimal::TWO;
        println!("  Spread: {}  |  Mid: {}", ask.price - bid.price, mid);
    }
    println!("{}\n", "-".repeat(50));

    println!("BIDS (Buy Orders):");
    println!("{:>12} | {:>10} | {:>10}", "Price", "Quantity", "Cumulative");
    println!("{}", "-".repeat(38));
    let mut cumulative = 0;
    for level in &depth.bids {
        cumulative += level.quantity;
        println!("{:>12} | {:>10} | {:>10}", level.price, level.quantity, cumulative);
    }

    println!("\n{}", "=".repeat(50));
}

fn print_trades(trades: &[Trade]) {
    if trades.is_empty() {
        println!("\n(No trades executed)");
        return;
    }
    println!("\nTRADES EXECUTED:");
    for trade in trades {
        println!("  {} @ {}", trade.quantity, trade.price);
    }
}

fn print_submit(result: &SubmitResult) {
    println!(
        "Placed: {} ({:?}, {} filled, {} resting)",
        result.order_id,
        result.status,
        result.filled_quantity(),
        result.resting_quantity
    );
    print_trades(&result.trades);
}

// ============================================================================
// Modes
// ============================================================================

const HELP: &str = "
CLOB Demo - Commands:
  buy <qty> <price>   - Place a limit buy order
  sell <qty> <price>  - Place a limit sell order
  mbuy <qty>          - Place a market buy order
  msell <qty>         - Place a market sell order
  cancel <id>         - Cancel a resting order
  book                - Show order book
  reset               - Remove every resting order
  help                - Show this help
  quit                - Exit

Examples:
  buy 100 10.50       - Buy 100 units at $10.50
  sell 50 10.75       - Sell 50 units at $10.75
  mbuy 25             - Market buy 25 units
";

/// What a REPL line asks for.
#[derive(Debug, PartialEq)]
enum ReplCommand {
    Limit(Side, u64, Decimal),
    Market(Side, u64),
    Cancel(OrderId),
    Book,
    Reset,
    Help,
    Quit,
}

fn parse_line(line: &str) -> Result<Option<ReplCommand>, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(first) = parts.first() else {
        return Ok(None);
    };

    let qty = |text: &str| text.parse::<u64>().map_err(|e| format!("bad quantity {text:?}: {e}"));
    let price = |text: &str| text.parse::<Decimal>().map_err(|e| format!("bad price {text:?}: {e}"));

    let command = match (first.to_ascii_lowercase().as_str(), &parts[1..]) {
        ("quit" | "exit", []) => ReplCommand::Quit,
        ("help", []) => ReplCommand::Help,
        ("book", []) => ReplCommand::Book,
        ("reset", []) => ReplCommand::Reset,
        ("buy", [q, p]) => ReplCommand::Limit(Side::Buy, qty(*q)?, price(*p)?),
        ("sell", [q, p]) => ReplCommand::Limit(Side::Sell, qty(*q)?, price(*p)?),
        ("mbuy", [q]) => ReplCommand::Market(Side::Buy, qty(*q)?),
        ("msell", [q]) => ReplCommand::Market(Side::Sell, qty(*q)?),
        ("cancel", [id]) => {
            let id = id
                .trim_start_matches('#')
                .parse::<u64>()
                .map_err(|e| format!("bad order id {id:?}: {e}"))?;
            ReplCommand::Cancel(OrderId(id))
        }
        _ => return Err("Invalid command. Type 'help' for usage.".to_string()),
    };
    Ok(Some(command))
}

fn run_repl(config: EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let depth_levels = config.depth_levels;
    let mut engine = Engine::new(config);

    println!("\nCentral Limit Order Book Demo");
    println!("Type 'help' for commands\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!("\nGoodbye!");
            break;
        };
        let command = match parse_line(&line?) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        let submitted = match command {
            ReplCommand::Quit => {
                println!("Goodbye!");
                break;
            }
            ReplCommand::Help => {
                println!("{HELP}");
                continue;
            }
            ReplCommand::Book => {
                print_book(&engine.depth(depth_levels));
                continue;
            }
            ReplCommand::Reset => {
                engine.reset();
                println!("Book cleared");
                continue;
            }
            ReplCommand::Cancel(id) => {
                match engine.try_cancel(id) {
                    Ok(order) => println!("Cancelled {} ({} remaining)", id, order.remaining),
                    Err(err) => println!("Error: {err}"),
                }
                continue;
            }
            ReplCommand::Limit(side, qty, price) => engine.submit_limit(side, price, qty),
            ReplCommand::Market(side, qty) => engine.submit_market(side, qty),
        };

        match submitted {
            Ok(result) => {
                print_submit(&result);
                print_book(&engine.depth(depth_levels));
            }
            Err(err) => println!("Error: {err}"),
        }
    }

    Ok(())
}

fn run_sample(depth_levels: usize) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = sample::sample_engine()?;
    print_full_book(&engine.depth(depth_levels));

    println!("\nSample trades:");
    println!("{}", "-".repeat(30));
    println!("\n> Market BUY 300 units:");
    let result = engine.submit_market(Side::Buy, 300)?;
    for trade in &result.trades {
        println!("  Filled {} @ {}", trade.quantity, trade.price);
    }

    println!("\nBook after market buy:");
    print_full_book(&engine.depth(depth_levels));
    Ok(())
}

fn run_replay(config: EngineConfig, file: PathBuf, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let commands = replay::load_commands(&file)?;
    let depth_levels = config.depth_levels;
    let mut engine = Engine::new(config);

    let events = replay::replay(&mut engine, commands);
    for event in &events {
        if json {
            println!("{}", serde_json::to_string(event)?);
            continue;
        }
        match event {
            OutputEvent::Trade(trade) => println!("{trade}"),
            OutputEvent::Accepted(a) => {
                println!("{} resting {} {} @ {}", a.order_id, a.side, a.resting_qty, a.price)
            }
            OutputEvent::Filled(f) => println!("{} filled {}", f.order_id, f.quantity),
            OutputEvent::Discarded(d) => {
                println!("{} discarded {} unfilled", d.order_id, d.discarded_qty)
            }
            OutputEvent::Canceled(c) => println!("{} cancelled {}", c.order_id, c.canceled_qty),
            OutputEvent::Rejected(r) => println!("{} rejected: {}", r.order_id, r.reason),
        }
    }

    let depth = engine.depth(depth_levels);
    if json {
        println!("{}", serde_json::to_string(&depth)?);
    } else {
        print_book(&depth);
    }

    let rejected = events
        .iter()
        .filter(|e| matches!(e, OutputEvent::Rejected(_)))
        .count();
    if rejected > 0 {
        eprintln!("{rejected} command(s) rejected");
    }
    Ok(())
}
