//! Tollgate CLI - Main entry point

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tollgate_oracle::RuleOracle;
use tollgate_stats::StatsLedger;
use tollgate_sim::{generate_exemplars, load_or_generate, SimConfig, Simulator};

#[derive(Parser)]
#[command(name = "tollgate")]
#[command(about = "Tollgate - adaptive transaction interception simulator", long_about = None)]
struct Cli {
    /// Output directory for statistics and exemplars
    #[arg(short, long, default_value = "./results")]
    out: PathBuf,

    /// JSON config file (defaults are used for anything it omits)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured seed
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation
    Run {
        /// Override the configured run length in minutes
        #[arg(long)]
        minutes: Option<u32>,
        /// Exemplar file (generated there when missing)
        #[arg(long)]
        exemplars: Option<PathBuf>,
    },

    /// Generate reference exemplars and exit
    Exemplars {
        /// Output file path
        #[arg(long, default_value = "exemplars.json")]
        output: PathBuf,
        /// Minutes to run the reference actors
        #[arg(long)]
        minutes: Option<u32>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SimConfig::from_file(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    match cli.command {
        Commands::Run { minutes, exemplars } => {
            if let Some(minutes) = minutes {
                config.schedule.max_minutes = minutes;
            }
            config.validate()?;

            std::fs::create_dir_all(&cli.out)?;
            let exemplar_path = exemplars.unwrap_or_else(|| cli.out.join("exemplars.json"));
            let exemplars = load_or_generate(&exemplar_path, &config)?;

            let oracle = Arc::new(RuleOracle::new(config.oracle.clone()));
            let sink = StatsLedger::new(cli.out.join("stats.jsonl"))?;
            let mut simulator = Simulator::new(config, oracle, Arc::new(exemplars), sink)?;
            let summary = simulator.run().await?;

            println!("Run {}", summary.run_id);
            println!("  Minutes:              {}", summary.minutes);
            println!(
                "  Launderers banned:    {} ({} remaining)",
                summary.banned_launderers, summary.remaining_launderers
            );
            println!("  Legitimate bans:      {}", summary.legitimate_bans);
            println!("  Overall precision:    {:.4}", summary.overall_precision);
            println!("  Overall recall:       {:.4}", summary.overall_recall);
            println!("  Legitimate volume:    {:.1}", summary.legitimate_volume);
            println!("  Launderer volume:     {:.1}", summary.launderer_volume);
            println!("  Volume ratio:         {:.4}", summary.volume_ratio);
            println!("Statistics written to {}", cli.out.join("stats.jsonl").display());
        }

        Commands::Exemplars { output, minutes } => {
            let minutes = minutes.unwrap_or(config.schedule.exemplar_minutes);
            let exemplars = generate_exemplars(&config.population, minutes, config.seed);
            exemplars.save(&output)?;
            println!(
                "Wrote {} exemplars ({} legitimate, {} illegal) to {}",
                exemplars.len(),
                exemplars.legitimate.len(),
                exemplars.illegal.len(),
                output.display()
            );
        }

        Commands::Config => {
            config.validate()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
