//! Command-line entry point
//!
//! Loads a JSON configuration (or the built-in dam-break defaults), applies
//! command-line overrides, runs to completion and prints the run summary as
//! JSON.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sph2d::TimeScheme;
use sph2d_runner::{NullSink, Runner, SimulationConfig};

#[derive(Parser)]
#[command(name = "sph2d-run")]
#[command(about = "Run a 2D SPH dam-break simulation", long_about = None)]
struct Cli {
    /// JSON configuration file; built-in dam-break defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Initial particle spacing (dx)
    #[arg(long)]
    spacing: Option<f64>,
    /// Simulated time to stop at (seconds)
    #[arg(long)]
    t_max: Option<f64>,
    /// Integrator: 0 = forward Euler, 1 = predictor-corrector
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    scheme: Option<u8>,
    /// Smoothing length over particle spacing
    #[arg(long)]
    h_factor: Option<f64>,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sph2d=info,sph2d_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };

    if let Some(spacing) = cli.spacing {
        config.particle_spacing = spacing;
    }
    if let Some(t_max) = cli.t_max {
        config.max_time = t_max;
    }
    if let Some(scheme) = cli.scheme.and_then(TimeScheme::from_selector) {
        config.scheme = scheme;
    }
    if let Some(h_factor) = cli.h_factor {
        config.h_factor = h_factor;
    }

    let mut runner = Runner::new(config)?;
    let summary = runner.run(&mut NullSink)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
