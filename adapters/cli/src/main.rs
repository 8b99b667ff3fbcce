#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays Hexa rounds headlessly.

mod purchase_order;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hexa_core::RoundOutcome;
use hexa_session::{GameConfig, Session};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use purchase_order::PurchaseOrder;

const DEFAULT_LOG_FILTER: &str = "hexa_cli=info,hexa_session=info,hexa_world=info";

/// Runs autobattler rounds against the configured enemy roster.
#[derive(Debug, Parser)]
#[command(name = "hexa", version)]
struct Cli {
    /// TOML game configuration; the builtin configuration is used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of rounds to play.
    #[arg(long, default_value_t = 3)]
    rounds: u32,

    /// Ticks after which an unresolved combat is abandoned.
    #[arg(long, default_value_t = 10_000)]
    max_ticks: u32,

    /// Unit to buy before the first combat, as `<archetype>@<x>,<y>`.
    #[arg(long = "buy", value_name = "ORDER")]
    purchases: Vec<PurchaseOrder>,
}

/// Entry point for the Hexa command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = match &cli.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => GameConfig::builtin().context("builtin config is invalid")?,
    };
    let mut session = Session::new(config).context("failed to start session")?;

    for order in &cli.purchases {
        match session.purchase(order.archetype.clone(), order.at) {
            Ok(unit) => info!(unit = unit.get(), archetype = %order.archetype, "unit purchased"),
            Err(reason) => warn!(archetype = %order.archetype, %reason, "purchase failed"),
        }
    }
    println!("starting gold after purchases: {}", session.current_gold());

    for _ in 0..cli.rounds {
        let round = session.current_round();
        session.begin_combat();
        let Some(outcome) = fight(&mut session, cli.max_ticks) else {
            println!(
                "round {round}: unresolved after {} ticks, stopping",
                cli.max_ticks
            );
            return Ok(());
        };

        let survivors = session
            .final_units()
            .map(|units| units.living_counts())
            .unwrap_or_default();
        println!(
            "round {round}: {} | survivors player {} enemy {} | gold {}",
            describe(outcome),
            survivors.player,
            survivors.enemy,
            session.current_gold()
        );
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn fight(session: &mut Session, max_ticks: u32) -> Option<RoundOutcome> {
    (0..max_ticks).find_map(|_| session.tick())
}

fn describe(outcome: RoundOutcome) -> &'static str {
    match outcome {
        RoundOutcome::Won => "won",
        RoundOutcome::Lost => "lost",
    }
}
