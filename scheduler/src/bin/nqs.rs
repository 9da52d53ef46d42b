//! NQS command-line entry point.
//!
//! Loads the campaign configuration, catalog, allocation log, optional done
//! ledger, and materialized ephemeris, runs the multi-pass balancer, and
//! writes the final schedule.
//!
//! # Usage
//!
//! ```bash
//! nqs --config campaign.toml
//! nqs --config campaign.toml --seed 7 --output tonight.dat
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log filter (default: info)

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nqs_rust::catalog::{load_allocations, load_catalog, seed_from_ledger};
use nqs_rust::config::CampaignConfig;
use nqs_rust::engine::{CampaignBalancer, NightScheduler};
use nqs_rust::ephemeris::CampaignEphemeris;
use nqs_rust::models::CompletionTable;
use nqs_rust::output;

#[derive(Parser)]
#[command(
    name = "nqs",
    about = "Night-queue scheduler for multi-night telescope campaigns",
    version
)]
struct Cli {
    /// Campaign configuration file
    #[arg(short, long, default_value = "campaign.toml")]
    config: PathBuf,

    /// Override the tie-break random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of rebalancing passes
    #[arg(long)]
    passes: Option<usize>,

    /// Override the schedule output path
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = CampaignConfig::from_file(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    let seed = cli.seed.unwrap_or(config.campaign.seed);
    let passes = cli.passes.unwrap_or(config.campaign.passes);
    let output_path = cli.output.unwrap_or_else(|| config.paths.output_file.clone());

    let requests = load_catalog(&config.paths.catalog_dir)
        .with_context(|| format!("loading catalog from {}", config.paths.catalog_dir.display()))?;
    info!(requests = requests.len(), "catalog loaded");

    let allocations = load_allocations(&config.paths.allocation_file).with_context(|| {
        format!(
            "loading allocations from {}",
            config.paths.allocation_file.display()
        )
    })?;
    info!(programs = allocations.len(), "allocations loaded");

    let mut table = CompletionTable::new(&requests, &allocations)
        .context("building the completion table")?;

    if let Some(done_file) = &config.paths.done_file {
        if done_file.exists() {
            seed_from_ledger(done_file, &mut table)
                .with_context(|| format!("seeding from ledger {}", done_file.display()))?;
            info!(ledger = %done_file.display(), "campaign baseline seeded from ledger");
        }
    }

    let ephemeris = CampaignEphemeris::from_file(&config.paths.ephemeris_file).with_context(|| {
        format!(
            "loading ephemeris from {}",
            config.paths.ephemeris_file.display()
        )
    })?;

    let balancer = CampaignBalancer::new(passes, NightScheduler::new(config.idle_step()));
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    info!(
        nights = config.campaign.dates.len(),
        passes, seed, "starting campaign scheduling"
    );
    let schedule = balancer
        .run(
            &requests,
            &mut table,
            &ephemeris,
            &config.campaign.dates,
            &mut rng,
        )
        .context("scheduling the campaign")?;

    output::write_schedule_file(&output_path, &schedule)
        .with_context(|| format!("writing schedule to {}", output_path.display()))?;
    output::log_summary(&table);
    info!(
        slots = schedule.len(),
        output = %output_path.display(),
        "schedule written"
    );

    Ok(())
}
