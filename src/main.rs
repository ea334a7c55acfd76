// =============================================================================
// Nuzlocke RL environment adapter — Game Boy RPG, hardcore ruleset
// =============================================================================
// Build & Run:
//   cargo build --release
//   cargo run --release -- inspect --ram dumps/pallet.bin
//   cargo run --release -- baseline --ram dumps/pallet.bin --steps 500
//   cargo run --release -- rules

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use nuzlocke_rl::bridge::{Action, RamBuffer};
use nuzlocke_rl::env::{EnvConfig, NuzlockeEnv};
use nuzlocke_rl::guardian::RuleConfig;
use nuzlocke_rl::reward::RewardConfig;
use nuzlocke_rl::savestate::latest_state;
use nuzlocke_rl::snapshot::{decode, species_label};
use nuzlocke_rl::telemetry::{NoopSink, TelemetrySink, WriterSink};

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser)]
#[command(name = "nuzlocke-rl", about = "Nuzlocke-rules RL environment adapter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a memory dump and print the trainer state
    Inspect(InspectArgs),
    /// Run a random-action baseline through the full step loop
    Baseline(BaselineArgs),
    /// Show which save state a resume would pick
    Resume(ResumeArgs),
    /// Print the effective rule configuration as JSON
    Rules(RulesArgs),
}

#[derive(Parser)]
struct InspectArgs {
    /// 64 KiB memory dump to decode
    #[arg(long)]
    ram: PathBuf,
}

#[derive(Parser)]
struct BaselineArgs {
    #[arg(long)]
    ram: PathBuf,
    #[arg(long, default_value = "500")]
    steps: u64,
    #[arg(long)]
    rules: Option<PathBuf>,
    /// Append JSONL status snapshots here
    #[arg(long)]
    telemetry: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Parser)]
struct ResumeArgs {
    #[arg(long, default_value = "states")]
    states: PathBuf,
}

#[derive(Parser)]
struct RulesArgs {
    #[arg(long)]
    config: Option<PathBuf>,
}

// =============================================================================
// Main
// =============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Inspect(args) => inspect(args),
        Commands::Baseline(args) => baseline(args),
        Commands::Resume(args) => resume(args),
        Commands::Rules(args) => rules(args),
    }
}

fn inspect(args: &InspectArgs) -> Result<()> {
    let bus = RamBuffer::from_file(&args.ram)?;
    let snap = decode(&bus);

    println!(
        "map {} @ ({},{})  badges {}  battle: {}",
        snap.map_id,
        snap.x,
        snap.y,
        snap.badge_count(),
        if snap.is_trainer_battle {
            "trainer"
        } else if snap.in_battle {
            "wild"
        } else {
            "no"
        }
    );
    if snap.party.is_empty() {
        println!("party: empty");
    }
    for (i, m) in snap.party.iter().enumerate() {
        println!(
            "  {i}: {:<10} {:<5} L{:<3} {}/{} HP",
            m.nickname,
            species_label(m.species_id),
            m.level,
            m.hp,
            m.max_hp
        );
    }
    Ok(())
}

fn baseline(args: &BaselineArgs) -> Result<()> {
    let bus = RamBuffer::from_file(&args.ram)?;
    let rules = match &args.rules {
        Some(path) => RuleConfig::load(path)?,
        None => RuleConfig::default(),
    };
    let sink: Box<dyn TelemetrySink> = match &args.telemetry {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Box::new(WriterSink::new(BufWriter::new(file)))
        }
        None => Box::new(NoopSink),
    };

    let mut env = NuzlockeEnv::new(
        bus,
        rules,
        RewardConfig::default(),
        EnvConfig::default(),
        sink,
    );
    env.reset()?;

    let mut rng = match args.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };

    let mut terminations = 0u64;
    for _ in 0..args.steps {
        let action = Action::from_index(rng.random_range(0..Action::COUNT));
        let result = env.step(action)?;
        if result.terminated {
            terminations += 1;
        }
    }

    println!(
        "steps {}  reward {:+.1}  cookies {}  bonks {}  wipes {terminations}",
        env.session().total_steps,
        env.total_reward,
        env.session().cookies,
        env.session().bonks,
    );
    for line in env.log_lines() {
        println!("  {line}");
    }
    Ok(())
}

fn resume(args: &ResumeArgs) -> Result<()> {
    match latest_state(&args.states)? {
        Some(path) => println!("{}", path.display()),
        None => println!("no prior state, fresh start"),
    }
    Ok(())
}

fn rules(args: &RulesArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => RuleConfig::load(path)?,
        None => RuleConfig::default(),
    };
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
