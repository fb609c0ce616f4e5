//! Command implementations for the chlorophyll-a analysis CLI.
//!
//! Each subcommand runs a prefix of the pipeline (load, aggregate,
//! validate, index, plot) and writes its reports into the output directory.

use chrono::Local;
use clap::Subcommand;
use log::info;

pub mod config;
pub mod pipeline;
pub mod plots;
pub mod reports;

pub use config::{AnalysisArgs, AnalysisConfig};

#[derive(Subcommand)]
pub enum Command {
    /// Aggregate PixEx scenes; writes the scene log and the scene table
    Scenes {
        #[command(flatten)]
        args: AnalysisArgs,
    },

    /// Match scenes against in-situ measurements; writes the validation report
    Validate {
        #[command(flatten)]
        args: AnalysisArgs,
    },

    /// Yearly statistics and trophic indices of satellite and in-situ data
    Indices {
        #[command(flatten)]
        args: AnalysisArgs,
    },

    /// Render time series, validation and trophic index charts
    Plot {
        #[command(flatten)]
        args: AnalysisArgs,
    },

    /// Run the whole pipeline: reports and charts
    Run {
        #[command(flatten)]
        args: AnalysisArgs,
    },
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Scenes { args } => run_scenes(&args.resolve()?),
        Command::Validate { args } => run_validate(&args.resolve()?),
        Command::Indices { args } => run_indices(&args.resolve()?),
        Command::Plot { args } => run_plot(&args.resolve()?),
        Command::Run { args } => run_all(&args.resolve()?),
    }
}

pub fn run_scenes(config: &AnalysisConfig) -> anyhow::Result<()> {
    let scenes = pipeline::load_scenes(config)?;
    let created = Local::now().naive_local();
    reports::write_scene_log_file(config, &scenes, created)?;
    reports::write_scenes_csv(config, &scenes.series)?;
    Ok(())
}

pub fn run_validate(config: &AnalysisConfig) -> anyhow::Result<()> {
    if config.insitu.is_none() {
        anyhow::bail!("validation needs an in-situ table (use --insitu)");
    }
    let analysis = pipeline::analyse(config)?;
    if let Some(validation) = &analysis.validation {
        let created = Local::now().naive_local();
        reports::write_validation_json(config, validation, created)?;
    }
    Ok(())
}

pub fn run_indices(config: &AnalysisConfig) -> anyhow::Result<()> {
    let analysis = pipeline::analyse(config)?;
    reports::write_yearwise_csv(config, &analysis.satellite_years)?;
    if config.insitu.is_some() {
        reports::write_insitu_indices_csv(config, &analysis.insitu_years)?;
    }
    Ok(())
}

pub fn run_plot(config: &AnalysisConfig) -> anyhow::Result<()> {
    let analysis = pipeline::analyse(config)?;
    plots::render_charts(config, &analysis)?;
    Ok(())
}

pub fn run_all(config: &AnalysisConfig) -> anyhow::Result<()> {
    let analysis = pipeline::analyse(config)?;
    let created = Local::now().naive_local();
    reports::write_scene_log_file(config, &analysis.scenes, created)?;
    reports::write_scenes_csv(config, &analysis.scenes.series)?;
    reports::write_yearwise_csv(config, &analysis.satellite_years)?;
    if let Some(validation) = &analysis.validation {
        reports::write_validation_json(config, validation, created)?;
        reports::write_insitu_indices_csv(config, &analysis.insitu_years)?;
    }
    let charts = plots::render_charts(config, &analysis)?;
    info!(
        "analysis complete: {} scenes, {} charts in {}",
        analysis.scenes.series.len(),
        charts.len(),
        config.out_dir.display()
    );
    Ok(())
}
