use std::{
    error::Error,
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use clap::{Parser, Subcommand};
use server::{
    api::{self, AppState, DEFAULT_DURATION, DEFAULT_TIMESTEP},
    load_config,
};
use spacecraft::{MonteCarlo, Simulation, SimulationData, write_csv};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8000)]
        port: u16,
        /// RON file with a SimulationConfig
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run one simulation and print it as JSON
    Simulate {
        #[arg(long, default_value_t = DEFAULT_DURATION)]
        duration: f64,
        #[arg(long, default_value_t = DEFAULT_TIMESTEP)]
        timestep: f64,
        /// Seed for the random initial attitude
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write CSV to this file instead of printing JSON
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Run many seeded simulations and print a summary of each
    MonteCarlo {
        /// Number of runs, at most 100000
        #[arg(long, default_value_t = 10)]
        runs: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 60.0)]
        duration: f64,
        #[arg(long, default_value_t = 0.1)]
        timestep: f64,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Multiply two integers
    Multiply { number_1: i64, number_2: i64 },
    /// Print the health check message
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { host, port, config } => {
            let simulation = Simulation::new(load_config(config.as_deref())?)?;
            let app = api::router(AppState::new(simulation));
            let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
            info!(address = %listener.local_addr()?, "listening");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Commands::Simulate {
            duration,
            timestep,
            seed,
            config,
            csv,
        } => {
            let simulation = Simulation::new(load_config(config.as_deref())?)?;
            let samples = match seed {
                Some(seed) => {
                    simulation.run_from(&simulation.seeded_state(seed), duration, timestep)?
                }
                None => simulation.run(duration, timestep)?,
            };
            match csv {
                Some(path) => {
                    write_csv(&samples, BufWriter::new(File::create(&path)?))?;
                    info!(path = %path.display(), samples = samples.len(), "wrote csv");
                }
                None => print_json(&SimulationData::from(samples))?,
            }
        }
        Commands::MonteCarlo {
            runs,
            seed,
            duration,
            timestep,
            config,
        } => {
            let simulation = Simulation::new(load_config(config.as_deref())?)?;
            let summaries = MonteCarlo::new(runs, seed).run(&simulation, duration, timestep)?;
            print_json(&summaries)?;
        }
        Commands::Multiply { number_1, number_2 } => {
            print_json(&api::checked_product(number_1, number_2)?)?;
        }
        Commands::Health => print_json(&api::health())?,
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
