mod report;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;

use pandemia_core::{
    EnvironmentConfig, RunConfig, ShoppingSchedule, Simulation, VirusConfig,
};
use report::render_console;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum ReportFormat {
    /// Colored summary and per-week table on stdout
    #[default]
    Console,
    /// Full run × day × 6 statistics array as JSON
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum ShoppingMode {
    /// Every house shops on every weekend day
    #[default]
    EveryOpenDay,
    /// Each house shops on its own weekly slot
    WeeklyOffset,
}

impl From<ShoppingMode> for ShoppingSchedule {
    fn from(mode: ShoppingMode) -> Self {
        match mode {
            ShoppingMode::EveryOpenDay => Self::EveryOpenDay,
            ShoppingMode::WeeklyOffset => Self::WeeklyOffset,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "pandemia", version)]
#[command(about = "Stochastic epidemic simulation over a synthetic population contact graph")]
struct Args {
    /// Number of individuals to synthesize
    #[arg(long, default_value_t = 1000)]
    population: usize,

    /// Independent Monte Carlo runs
    #[arg(long, default_value_t = 5)]
    runs: u32,

    /// Simulated days per run
    #[arg(long, default_value_t = 120)]
    days: u32,

    /// Master seed; fixes the graph and every run stream
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Household-walk keep threshold in [0,1)
    #[arg(long)]
    same_house_probability: Option<f64>,

    /// Probability of shopping at the nearest store
    #[arg(long)]
    store_preference: Option<f64>,

    /// Grid resolution per axis for transport blocks
    #[arg(long)]
    block_count: Option<u32>,

    /// Probability an adult works remotely
    #[arg(long)]
    remote_work_probability: Option<f64>,

    /// Fraction of the population infected at day zero
    #[arg(long)]
    inoculation: Option<f64>,

    /// Per-channel transmission rates
    #[arg(long)]
    house_rate: Option<f64>,
    #[arg(long)]
    workplace_rate: Option<f64>,
    #[arg(long)]
    transport_rate: Option<f64>,
    #[arg(long)]
    store_rate: Option<f64>,

    /// Which weekend day a house goes shopping
    #[arg(long, value_enum, default_value_t)]
    shopping: ShoppingMode,

    /// Output report format
    #[arg(long, value_enum, default_value_t)]
    report: ReportFormat,

    /// Optional path to write the report instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn environment(&self) -> EnvironmentConfig {
        let mut env = EnvironmentConfig {
            population: self.population,
            ..EnvironmentConfig::default()
        };
        if let Some(p) = self.same_house_probability {
            env.same_house_probability = p;
        }
        if let Some(p) = self.store_preference {
            env.store_preference = p;
        }
        if let Some(b) = self.block_count {
            env.block_count = b;
        }
        if let Some(p) = self.remote_work_probability {
            env.remote_work_probability = p;
        }
        env
    }

    fn virus(&self) -> VirusConfig {
        let mut virus = VirusConfig::default();
        if let Some(p) = self.inoculation {
            virus.inoculation_fraction = p;
        }
        if let Some(r) = self.house_rate {
            virus.house_rate = r;
        }
        if let Some(r) = self.workplace_rate {
            virus.workplace_rate = r;
        }
        if let Some(r) = self.transport_rate {
            virus.transport_rate = r;
        }
        if let Some(r) = self.store_rate {
            virus.store_rate = r;
        }
        virus
    }

    fn run(&self) -> RunConfig {
        RunConfig {
            runs: self.runs,
            days: self.days,
            seed: self.seed,
            shopping: self.shopping.into(),
            ..RunConfig::default()
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let simulation = Simulation::new(args.environment(), args.virus(), args.run())
        .context("invalid simulation configuration")?;
    let batch = simulation.execute().context("simulation batch failed")?;
    info!("batch complete: {} runs", batch.runs.len());

    let rendered = match args.report {
        ReportFormat::Console => render_console(&batch, args.population, args.seed),
        ReportFormat::Json => {
            serde_json::to_string_pretty(&batch).context("serializing statistics")?
        }
    };

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating report file {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            writer.write_all(rendered.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        None => {
            let mut out = stdout().lock();
            out.write_all(rendered.as_bytes())?;
            out.write_all(b"\n")?;
        }
    }
    Ok(())
}
