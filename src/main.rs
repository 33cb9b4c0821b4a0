//! Roulette table server and tooling

use clap::{Parser, Subcommand};
use futures::future::join_all;
use roulette::api::{init_tracing, ApiServer};
use roulette::config::{
    generate_sample_config, EntropyConfig, EntropyMode, RouletteConfig, SpinAuthority,
};
use roulette::games::{Address, FundsLedger, GameOutcome, CATALOG};
use roulette::{ConfigLoader, RouletteFactory};

#[derive(Parser, Debug)]
#[command(name = "roulette")]
#[command(about = "Single-table roulette engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// TOML configuration file
        #[arg(long)]
        config: Option<String>,

        /// Override api.port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Play one table end to end in memory and print the settlement
    Simulate {
        #[arg(long, default_value = "13")]
        bettors: usize,

        /// Stake per bettor
        #[arg(long, default_value = "2")]
        stake: u64,

        /// Starting balance per bettor
        #[arg(long, default_value = "5")]
        balance: u64,

        /// House liquidity added before betting
        #[arg(long, default_value = "100")]
        house: u64,

        /// Reproducible spin instead of a VRF draw
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, default_value = "QWER123")]
        table: String,
    },

    /// Write a default configuration file
    SampleConfig {
        #[arg(long, default_value = "roulette.toml")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, port } => {
            let loader = match config {
                Some(path) => ConfigLoader::new().with_path(path),
                None => ConfigLoader::new(),
            };
            let mut config = loader.load()?;
            if let Some(port) = port {
                config.api.port = port;
            }
            init_tracing(&config.monitoring.log_level);

            let runtime = RouletteFactory::build(config)?;
            ApiServer::new(runtime).run().await?;
        }
        Command::Simulate {
            bettors,
            stake,
            balance,
            house,
            seed,
            table,
        } => {
            init_tracing("warn");
            simulate(bettors, stake, balance, house, seed, &table).await?;
        }
        Command::SampleConfig { output } => {
            generate_sample_config(&output)?;
            println!("Wrote {}", output);
        }
    }

    Ok(())
}

async fn simulate(
    bettors: usize,
    stake: u64,
    balance: u64,
    house: u64,
    seed: Option<u64>,
    table_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = RouletteConfig::development();
    config.table.spin_authority = SpinAuthority::OwnerOnly;
    if let Some(seed) = seed {
        config.entropy = EntropyConfig {
            mode: EntropyMode::Seeded,
            seed: Some(seed),
        };
    }

    let runtime = RouletteFactory::build(config)?;
    let processor = runtime.processor.clone();
    let ledger = runtime.ledger.clone();

    let owner = Address::new("house");
    ledger.credit(&owner, house)?;
    processor.create(table_id, &owner)?;
    if house > 0 {
        processor.fund(table_id, &owner, house)?;
    }

    let players: Vec<(Address, &'static str)> = (0..bettors)
        .map(|i| (Address::new(format!("bettor-{:02}", i + 1)), CATALOG[i % CATALOG.len()].name))
        .collect();
    for (player, _) in &players {
        ledger.credit(player, balance)?;
    }

    // Every bettor submits at once
    let submissions = players.iter().cloned().map(|(player, position)| {
        let processor = processor.clone();
        let table_id = table_id.to_string();
        tokio::task::spawn_blocking(move || processor.bet(&table_id, &player, position, stake))
    });
    for (outcome, (player, position)) in join_all(submissions).await.into_iter().zip(&players) {
        if let Err(e) = outcome? {
            println!("{:<10} {:<6} rejected: {}", player, position, e);
        }
    }

    let spin = processor.spin(table_id, &owner)?;
    println!("\nTable {} spun {} ({} bets)\n", table_id, spin.result, processor.get_table(table_id)?.positions.len());
    println!("{:<10} {:<6} {:>6} {:>7} {:>8}", "bettor", "bet", "stake", "payout", "balance");

    let placed = processor.get_table(table_id)?.positions;
    for bet in placed {
        let settlement = processor.claim_prize(table_id, &bet.bettor)?;
        let marker = match settlement.outcome {
            GameOutcome::Win => "win",
            GameOutcome::Loss => "",
        };
        println!(
            "{:<10} {:<6} {:>6} {:>7} {:>8} {}",
            bet.bettor,
            bet.position,
            settlement.stake,
            settlement.payout,
            ledger.balance(&bet.bettor),
            marker
        );
    }

    let table = processor.get_table(table_id)?;
    println!(
        "\nPool left: {}  claimed: {}/{}",
        table.accumulated(),
        table.positions.iter().filter(|b| b.is_claimed).count(),
        table.positions.len()
    );
    Ok(())
}
