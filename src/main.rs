mod app;
mod cache;
mod commands;
mod config;
mod error;
mod event;
mod filters;
mod history;
mod loader;
mod logging;
mod segments;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "segview")]
#[command(about = "Cache-first viewer for your efforts on a Strava segment")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/segview/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Logs go to a file when one can be opened; flushed when the guard drops
  let _guard = logging::init(&config.logging);

  let mut app = app::App::new(config)?;
  app.run(args.command).await?;

  Ok(())
}
