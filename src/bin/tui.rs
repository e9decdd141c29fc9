use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use clob_engine::{BookDepth, DepthLevel, Engine, EngineConfig, Side};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};
use rust_decimal::Decimal;

const DISPLAY_LEVELS: usize = 15;
const BATCH_SIZE: u64 = 1000;

struct SharedStats {
    ops_count: AtomicU64,
    trade_count: AtomicU64,
    avg_latency_ns: AtomicU64,
    resting: AtomicU64,
    running: AtomicBool,
    /// Top levels of both sides, refreshed by the engine thread
    depth: RwLock<BookDepth>,
}

impl SharedStats {
    fn new() -> Self {
        Self {
            ops_count: AtomicU64::new(0),
            trade_count: AtomicU64::new(0),
            avg_latency_ns: AtomicU64::new(0),
            resting: AtomicU64::new(0),
            running: AtomicBool::new(true),
            depth: RwLock::new(BookDepth::default()),
        }
    }
}

fn render_level_bars(levels: &[DepthLevel]) -> String {
    let max_qty = levels.iter().map(|l| l.quantity).max().unwrap_or(1).max(1);

    levels
        .iter()
        .map(|level| {
            let bar_len = (level.quantity * 20 / max_qty) as usize;
            format!(
                "{:>9} {:<20} {:<6} ({})\n",
                level.price,
                "█".repeat(bar_len),
                level.quantity,
                level.order_count
            )
        })
        .collect()
}

/// Synthetic order flow: a random-walking mid price with limit orders
/// placed on both sides of it and an occasional market order.
fn run_engine(stats: Arc<SharedStats>, config: EngineConfig) {
    let mut engine = Engine::new(config);
    engine.warm_up();

    let mut rng = 12345u64; // Simple LCG for speed
    let mut loop_count = 0u64;

    // Mid price in cents, starting at 3,000.00
    let mut mid_cents = 300_000i64;
    let reset_threshold = engine.config().initial_capacity as usize * 9 / 10;

    while stats.running.load(Ordering::Relaxed) {
        let start_batch = Instant::now();

        for _ in 0..BATCH_SIZE {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);
            // High 32 bits: LCG low bits are poor
            let r = rng >> 32;

            if r % 100 == 0 {
                mid_cents = (mid_cents + (r % 11) as i64 - 5).max(1000);
            }

            let side = if (r >> 8) % 2 == 0 { Side::Buy } else { Side::Sell };
            let quantity = 1 + (rng % 100);

            let result = if r % 50 == 1 {
                engine.submit_market(side, quantity)
            } else {
                let offset = (100 + (r % 400) as i64) / 2;
                let noise = (r % 20) as i64 - 10;
                let cents = match side {
                    Side::Buy => mid_cents - offset + noise,
                    Side::Sell => mid_cents + offset + noise,
                };
                engine.submit_limit(side, Decimal::new(cents.max(1), 2), quantity)
            };

            if let Ok(result) = result {
                stats
                    .trade_count
                    .fetch_add(result.trades.len() as u64, Ordering::Relaxed);
            }
        }

        loop_count += 1;

        stats.ops_count.fetch_add(BATCH_SIZE, Ordering::Relaxed);
        let ns_per_op = start_batch.elapsed().as_nanos() as u64 / BATCH_SIZE;
        stats.avg_latency_ns.store(ns_per_op, Ordering::Relaxed);
        stats.resting.store(engine.order_count() as u64, Ordering::Relaxed);

        if loop_count % 50 == 0 {
            if let Ok(mut guard) = stats.depth.write() {
                *guard = engine.depth(DISPLAY_LEVELS);
            }
        }

        if engine.order_count() > reset_threshold {
            engine.reset();
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::from_env()?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let stats = Arc::new(SharedStats::new());
    let engine_stats = Arc::clone(&stats);
    let engine_thread = thread::spawn(move || run_engine(engine_stats, config));

    let mut last_ops = 0;
    let mut last_time = Instant::now();
    let mut throughput = 0.0;

    loop {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.code == KeyCode::Char('q') {
                    break;
                }
            }
        }

        let now = Instant::now();
        if now.duration_since(last_time).as_secs_f64() >= 1.0 {
            let current_ops = stats.ops_count.load(Ordering::Relaxed);
            throughput = (current_ops - last_ops) as f64;
            last_ops = current_ops;
            last_time = now;
        }

        let depth = stats
            .depth
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Min(10),
                    Constraint::Length(7),
                ])
                .split(f.size());

            let header = Block::default()
                .borders(Borders::ALL)
                .title("CLOB Engine Demo");
            let title = Paragraph::new("Synthetic order flow | Press 'q' to quit")
                .block(header)
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Cyan));
            f.render_widget(title, chunks[0]);

            let book_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(chunks[1]);

            let bids_widget = Paragraph::new(render_level_bars(&depth.bids)).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("BIDS")
                    .style(Style::default().fg(Color::Green)),
            );
            let asks_widget = Paragraph::new(render_level_bars(&depth.asks)).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("ASKS")
                    .style(Style::default().fg(Color::Red)),
            );
            f.render_widget(bids_widget, book_chunks[0]);
            f.render_widget(asks_widget, book_chunks[1]);

            let ops_fmt = if throughput > 1_000_000.0 {
                format!("{:.2} M", throughput / 1_000_000.0)
            } else {
                format!("{:.0} k", throughput / 1_000.0)
            };
            let spread = match (depth.bids.first(), depth.asks.first()) {
                (Some(bid), Some(ask)) => (ask.price - bid.price).to_string(),
                _ => "-".to_string(),
            };

            let stats_text = format!(
                "Throughput: {} ops/sec\nLatency (Avg Batch): {} ns\nTrades: {}\nResting Orders: {}\nSpread: {}",
                ops_fmt,
                stats.avg_latency_ns.load(Ordering::Relaxed),
                stats.trade_count.load(Ordering::Relaxed),
                stats.resting.load(Ordering::Relaxed),
                spread,
            );
            let stats_block = Paragraph::new(stats_text)
                .block(Block::default().borders(Borders::ALL).title("Engine Telemetry"))
                .style(Style::default().fg(Color::Yellow));
            f.render_widget(stats_block, chunks[2]);
        })?;
    }

    stats.running.store(false, Ordering::Relaxed);
    let _ = engine_thread.join();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    Ok(())
}
