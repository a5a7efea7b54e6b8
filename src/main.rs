use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use outbreak::{
    disease::{Difficulty, DiseaseProfile},
    engine::{Engine, EngineSettings},
    pacing::DEFAULT_TICKS_PER_SECOND,
    scenario::{Scenario, ScenarioLoader},
    simulation::Simulation,
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Epidemic spread simulation runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a disease file from a difficulty preset
    NewDisease {
        #[arg(long)]
        name: String,
        #[arg(long, value_enum, default_value = "medium")]
        difficulty: Difficulty,
        /// Directory the disease file is written to
        #[arg(long, default_value = "SavedDiseases")]
        dir: PathBuf,
    },
    /// Run a scenario headless and print the outcome
    Run {
        #[command(flatten)]
        game: GameArgs,
        /// Directory for day snapshots
        #[arg(long, default_value = "snapshots")]
        snapshot_dir: PathBuf,
    },
    /// Run a scenario in real time and stream it to a browser
    Serve {
        #[command(flatten)]
        game: GameArgs,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long, default_value_t = DEFAULT_TICKS_PER_SECOND)]
        ticks_per_second: u32,
    },
}

#[derive(Debug, Args)]
struct GameArgs {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/earth.yaml")]
    scenario: PathBuf,
    /// Path to a disease JSON file
    #[arg(long)]
    disease: PathBuf,
    /// Outbreak origin region (uses the scenario default when omitted)
    #[arg(long)]
    origin: Option<String>,
    /// Override simulated day count
    #[arg(long)]
    days: Option<u64>,
}

struct Game {
    scenario: Scenario,
    engine: Engine,
    days: u64,
}

impl GameArgs {
    fn load(&self, snapshot_dir: PathBuf, snapshot_interval_days: Option<u64>) -> Result<Game> {
        let scenario = ScenarioLoader::new(".").load(&self.scenario)?;
        init_tracing(&scenario.logging.level);

        let disease = DiseaseProfile::load(&self.disease)?;
        let registry = scenario.build_registry()?;
        let simulation = Simulation::new(&registry, scenario.tick_scale());
        let settings = EngineSettings {
            scenario_name: scenario.name.clone(),
            seed: scenario.seed,
            tuning: scenario.spread,
            snapshot_interval_days: snapshot_interval_days
                .unwrap_or(scenario.snapshot_interval_days),
            snapshot_dir,
        };
        let mut engine = Engine::new(settings, simulation, disease);

        let origin = self
            .origin
            .clone()
            .or_else(|| scenario.origin.clone())
            .context("no outbreak origin given; pass --origin or set `origin` in the scenario")?;
        engine.start_outbreak(&origin)?;

        let days = scenario.days(self.days);
        Ok(Game {
            scenario,
            engine,
            days,
        })
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("outbreak={default_level}")));
    // a second init (tests, repeated loads) is harmless
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::NewDisease {
            name,
            difficulty,
            dir,
        } => {
            init_tracing("info");
            let profile = DiseaseProfile::from_preset(name, difficulty);
            let path = profile.save(&dir)?;
            println!("Disease file created: {}", path.display());
        }
        Command::Run { game, snapshot_dir } => {
            let Game {
                scenario,
                mut engine,
                days,
            } = game.load(snapshot_dir, None)?;
            engine.run_days(days)?;
            let totals = engine.totals();
            println!(
                "Scenario '{}' finished after {} days. Infected: {}, dead: {}, alive: {} of {}",
                scenario.name, days, totals.infected, totals.dead, totals.living, totals.population
            );
            if !engine.wiped_out().is_empty() {
                println!("Wiped out: {}", engine.wiped_out().join(", "));
            }
        }
        Command::Serve {
            game,
            host,
            port,
            ticks_per_second,
        } => {
            let Game {
                scenario,
                engine,
                days,
            } = game.load(PathBuf::from("snapshots"), Some(0))?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(web::run(WebServerConfig {
                engine,
                scenario_name: scenario.name,
                days,
                ticks_per_second,
                host,
                port,
            }))?;
        }
    }
    Ok(())
}
