#![deny(warnings)]

//! Headless driver: runs the simulation for a number of years and prints
//! the company's headline figures.

use anyhow::{Context, Result};
use sim_core::{Catalog, SimConfig};
use sim_runtime::{Command, Engine};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    years: Option<u32>,
    seed: Option<u64>,
    config: Option<String>,
    realtime: bool,
    load: Option<String>,
    save: Option<String>,
    db: Option<String>,
    json: bool,
    version: bool,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--years" => args.years = it.next().and_then(|s| s.parse().ok()),
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()),
            "--config" => args.config = it.next(),
            "--realtime" => args.realtime = true,
            "--load" => args.load = it.next(),
            "--save" => args.save = it.next(),
            "--db" => args.db = it.next(),
            "--json" => args.json = true,
            "--version" => args.version = true,
            _ => {}
        }
    }
    args
}

fn load_config(args: &Args) -> Result<SimConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
            SimConfig::from_yaml(&text).with_context(|| format!("parsing {path}"))?
        }
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        cfg.rng_seed = seed;
    }
    Ok(cfg)
}

/// Tick at the clock's own pace until `months` month closes have happened.
async fn run_realtime(engine: &mut Engine, months: u32) -> Result<()> {
    if engine.state().clock.paused {
        engine.apply(Command::TogglePause);
    }
    let mut closed = 0;
    while closed < months {
        tokio::time::sleep(engine.state().clock.tick_interval()).await;
        let report = engine.tick()?;
        if let Some(ledger) = report.month_closed {
            closed += 1;
            info!(
                date = %engine.state().clock.date.date(),
                revenue = %ledger.revenue,
                profit = %ledger.profit(),
                "month"
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    if args.version {
        println!(
            "{} {} ({} built {})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }
    info!(?args, "starting CLI");

    let cfg = load_config(&args)?;
    let catalog = Catalog::builtin()?;
    let mut engine = Engine::new_game(cfg, catalog)?;

    let db_url = args
        .db
        .clone()
        .unwrap_or_else(|| persistence::default_sqlite_url().to_string());
    let pool = if args.load.is_some() || args.save.is_some() {
        Some(persistence::init_db(&db_url).await?)
    } else {
        None
    };
    if let (Some(pool), Some(slot)) = (&pool, &args.load) {
        let doc = persistence::load_from_slot(pool, slot).await?;
        engine.load_from_data(&doc)?;
    }

    let months = args.years.unwrap_or(1) * 12;
    let snap = if args.realtime {
        run_realtime(&mut engine, months).await?;
        engine.snapshot()
    } else {
        engine.run_months(months)?
    };

    if let (Some(pool), Some(slot)) = (&pool, &args.save) {
        persistence::save_to_slot(pool, slot, engine.state()).await?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snap)?);
    } else {
        println!(
            "KPI | {} | money: ${} | valuation: ${} | last month: +${} / -${} | sold: {} | produced: {} | rank: {} {}",
            snap.date,
            snap.money,
            snap.valuation.total,
            snap.monthly_revenue,
            snap.monthly_expenses,
            snap.cars_sold,
            snap.cars_produced,
            snap.prestige.rank,
            snap.prestige.name
        );
    }
    Ok(())
}
