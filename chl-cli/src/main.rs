//! chl-cli - Chlorophyll-a analysis of Sentinel-2 pixel extractions.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "chl-cli",
    version,
    about = "Chlorophyll-a time series, validation and trophic indices from PixEx extracts"
)]
struct Cli {
    #[command(subcommand)]
    command: chl_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    log::debug!("chl-cli {}", env!("CARGO_PKG_VERSION"));
    chl_cmd::run(cli.command)
}
