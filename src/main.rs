use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use terrarium_lib::model::config::AppConfig;
use terrarium_lib::model::metrics::init_logging;
use terrarium_lib::runner::Session;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Custom config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Number of ticks to run (overrides the config)
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Random seed (overrides the config)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn load_config(path: &str) -> Result<AppConfig> {
    if Path::new(path).exists() {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
        AppConfig::from_toml(&content).with_context(|| format!("Invalid config {path}"))
    } else {
        Ok(AppConfig::default())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(ticks) = args.ticks {
        config.run.ticks = ticks;
    }
    if args.seed.is_some() {
        config.run.seed = args.seed;
    }
    config.validate()?;
    init_logging(&config.logging.level);

    let ticks = config.run.ticks;
    let mut session = Session::new(config)?;
    session.run(ticks)?;
    let summary = session.summary();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Terrarium run finished");
        println!("  Topology:    {}", summary.topology);
        println!("  Seed:        {}", summary.seed);
        println!("  Ticks:       {}", summary.ticks);
        println!("  Patches:     {}", summary.patches);
        println!("  Turtles:     {}", summary.turtles);
        println!("  Links:       {}", summary.links);
        if let Some(total) = summary.deposit_total {
            println!("  Deposited:   {total:.3}");
        }
        println!("  Diffusions:  {}", summary.metrics.diffusions);
        println!("  Fingerprint: {}", summary.fingerprint);
    }
    session.world.metrics().log_summary();
    Ok(())
}
