use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use log::info;
use snipvault::cli;
use snipvault::{App, Config};

/// Application entry point. Loads the config and the stored vault, runs one
/// command, then waits for pending writes before exiting.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = Config::load().map_err(|e| eyre!("Failed to load configuration: {e:#}"))?;
    info!("data directory: {}", config.data_dir.display());

    let mut app = App::open(&config).map_err(|e| eyre!("Failed to open snippet storage: {e:#}"))?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let outcome = cli::execute_cli(&mut app, &args);

    let saved = app.shutdown().await;
    cli::print_notices(app.take_notices());

    outcome.map_err(|e| eyre!("{e}"))?;
    saved.wrap_err("Failed to save snippets")?;
    Ok(())
}
