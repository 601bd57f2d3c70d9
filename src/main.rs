//! crashpoint binary
//!
//! `run` starts the round scheduler and the HTTP API, `verify` checks a
//! published seed reveal offline, `sample-config` writes a default TOML file.

use clap::{Parser, Subcommand, ValueEnum};
use crashpoint::{
    api::{server::shutdown_signal, ApiServer},
    config::{generate_sample_config, ConfigLoader, CrashConfig, BASE_UNITS_PER_COIN},
    games::{
        fairness::{verify_reveal, SeedGenerator},
        types::{Commitment, Seed, SeedReveal},
        Collaborators, InMemoryLedger, RoundScheduler,
    },
    EngineMetrics,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEMO_STARTING_COINS: u64 = 1_000;

#[derive(Parser, Debug)]
#[command(name = "crashpoint")]
#[command(about = "Provably-fair crash round engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run rounds back to back and serve the API
    Run {
        /// TOML configuration file
        #[arg(long)]
        config: Option<String>,

        /// Built-in preset used when no file is given
        #[arg(long, value_enum, default_value_t = Preset::Default)]
        preset: Preset,

        /// Stop after this many rounds
        #[arg(long)]
        max_rounds: Option<u64>,
    },
    /// Verify a seed reveal against its commitment and house key
    Verify {
        #[arg(long)]
        round_id: u64,
        #[arg(long)]
        seed: String,
        /// Previous round's revealed seed (zeros for the first round)
        #[arg(long, default_value = "0000000000000000000000000000000000000000000000000000000000000000")]
        previous_seed: String,
        #[arg(long)]
        commitment: String,
        #[arg(long)]
        signature: String,
        #[arg(long)]
        public_key: String,
        /// Configuration whose crash distribution applies
        #[arg(long)]
        config: Option<String>,
    },
    /// Write a default configuration file
    SampleConfig { path: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Preset {
    Default,
    Fast,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            preset,
            max_rounds,
        } => run(config, preset, max_rounds).await,
        Command::Verify {
            round_id,
            seed,
            previous_seed,
            commitment,
            signature,
            public_key,
            config,
        } => {
            let config = load_config(config, Preset::Default)?;
            let reveal = SeedReveal {
                round_id,
                seed: Seed::from_hex(&seed)?,
                previous_seed: Seed::from_hex(&previous_seed)?,
                signature,
            };
            let commitment = Commitment::from_hex(&commitment)?;
            let public_key = hex::decode(public_key.trim_start_matches("0x"))?;

            let crash_point = verify_reveal(&public_key, &commitment, &reveal, &config.fairness.distribution())?;
            println!("round {} verified: crash point {}", round_id, crash_point);
            Ok(())
        }
        Command::SampleConfig { path } => {
            generate_sample_config(&path)?;
            println!("Wrote default configuration to {}", path);
            Ok(())
        }
    }
}

fn load_config(path: Option<String>, preset: Preset) -> Result<CrashConfig, Box<dyn std::error::Error>> {
    let config = match (path, preset) {
        (Some(path), _) => ConfigLoader::new().with_path(path).load()?,
        (None, Preset::Default) => ConfigLoader::new().load()?,
        (None, Preset::Fast) => {
            let config = CrashConfig::fast_rounds();
            config.validate()?;
            config
        }
    };
    Ok(config)
}

async fn run(path: Option<String>, preset: Preset, max_rounds: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(path, preset)?;
    if max_rounds.is_some() {
        config.scheduler.max_rounds = max_rounds;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.monitoring.log_filter)),
        )
        .init();

    let seeds = SeedGenerator::from_config(&config.fairness)?;
    info!("House public key: {}", seeds.public_key_hex());

    // Demo accounts open on first use with a playable balance
    let ledger = Arc::new(
        InMemoryLedger::new(true).with_starting_balance(DEMO_STARTING_COINS * BASE_UNITS_PER_COIN),
    );
    let collaborators = Collaborators {
        accounts: ledger.clone(),
        transfers: ledger,
    };
    let metrics = EngineMetrics::new()?;

    let (engine, mut scheduler) = RoundScheduler::spawn(&config, seeds, collaborators, metrics);

    let scheduler_finished = if config.api.enabled {
        let server = ApiServer::new(&config, engine.clone());
        tokio::select! {
            result = server.run_until(shutdown_signal()) => {
                if let Err(e) = result {
                    error!("API server failed: {}", e);
                }
                false
            }
            _ = &mut scheduler => true,
        }
    } else {
        tokio::select! {
            _ = shutdown_signal() => false,
            _ = &mut scheduler => true,
        }
    };

    if scheduler_finished {
        info!("Scheduler finished");
    } else {
        engine.shutdown().await;
        let _ = scheduler.await;
    }
    Ok(())
}
