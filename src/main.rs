//! Command line entry point of the NDVI trend workflow.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;

use ndvitrend::{
    source::{GeoJsonBoundaries, ManifestArchive},
    Workflow, WorkflowConfig,
};

#[derive(Parser, Debug)]
#[command(name = "ndvitrend")]
#[command(about = "Growing season NDVI trends over administrative regions")]
struct Args {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the workflow and write the table, chart and map layers
    Run {
        /// Workflow configuration (yaml), defaults apply when omitted
        #[arg(short, long, env = "NDVITREND_CONFIG")]
        config: Option<PathBuf>,

        /// Administrative boundaries (GeoJSON), overrides `sources.boundaries`
        #[arg(long)]
        boundaries: Option<PathBuf>,

        /// Scene manifest (yaml), overrides `sources.scenes`
        #[arg(long)]
        scenes: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "out")]
        out: PathBuf,
    },
    /// Print the default configuration
    DefaultConfig,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match args.command {
        Command::Run {
            config,
            boundaries,
            scenes,
            out,
        } => run(config, boundaries, scenes, out),
        Command::DefaultConfig => {
            print!("{}", WorkflowConfig::default().to_yaml()?);
            Ok(())
        }
    }
}

fn run(
    config: Option<PathBuf>,
    boundaries: Option<PathBuf>,
    scenes: Option<PathBuf>,
    out: PathBuf,
) -> Result<()> {
    let config = match config {
        Some(path) => WorkflowConfig::from_yaml_path(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => WorkflowConfig::default(),
    };
    let boundaries_path = boundaries
        .or_else(|| config.sources.boundaries.clone())
        .context("no boundaries given, pass --boundaries or set sources.boundaries")?;
    let scenes_path = scenes
        .or_else(|| config.sources.scenes.clone())
        .context("no scene manifest given, pass --scenes or set sources.scenes")?;

    let boundaries = GeoJsonBoundaries::open(&boundaries_path)
        .with_context(|| format!("loading boundaries {}", boundaries_path.display()))?;
    let archive = ManifestArchive::open(&scenes_path, config.sources.backend)
        .with_context(|| format!("loading scene manifest {}", scenes_path.display()))?;

    let workflow = Workflow::new(config, &boundaries, &archive)?;
    let output = workflow.run()?;
    if !output.gaps.is_empty() {
        let years = output.gaps.iter().map(|gap| gap.year.to_string()).collect::<Vec<_>>();
        warn!("no usable data for {}", years.join(", "));
    }
    output.write(&out, workflow.config())?;
    info!("outputs written to {}", out.display());
    Ok(())
}
