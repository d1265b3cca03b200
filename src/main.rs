mod app;
mod cache;
mod commands;
mod config;
mod error;
mod forms;
mod logging;
mod net;
mod offline;
mod pages;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pageshelf")]
#[command(about = "Offline-first page catalogue backed by a spreadsheet export")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/pageshelf/config.yaml)
  #[arg(short, long)]
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
  let _guard = logging::init(config.log_file.as_deref())?;

  // Start the cache controller and run the command through it
  let app = app::App::new(config).await?;
  app.run(args.command).await?;

  Ok(())
}
