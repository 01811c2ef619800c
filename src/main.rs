//! Equihash Genesis Miner - Main Application
//!
//! Builds a genesis block header from the command line and searches for a
//! valid Equihash solution with an external solver.

use equihash_genesis::{
    config::Config,
    crypto::display_hash,
    explorer::BlockExplorer,
    genesis::{self, build_header},
    search::{SearchLoop, SearchOutcome},
    utils, Error, Result, APP_NAME, APP_VERSION,
};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load and validate configuration
    let config = Config::load().await?;

    utils::init_logging(config.effective_log_level().into(), config.log_format);

    if config.print_config {
        print_configuration(&config)?;
        return Ok(());
    }

    info!("Starting {} v{}", APP_NAME, APP_VERSION);
    info!(
        "Configuration: chain={}, solver={} ({}), rounds={}, threads={}",
        config.chain, config.solver, config.solver_kind, config.rounds, config.threads
    );

    let psz_timestamp = resolve_psz_timestamp(&config).await?;
    info!("pszTimestamp: {}", psz_timestamp);

    let header = build_header(&config.genesis_params(psz_timestamp)?);
    info!("Start nonce: {}", header.nonce);

    let cancellation = CancellationToken::new();
    let ctrl_c = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt, stopping solver");
            ctrl_c.cancel();
        }
    });

    let mut search = SearchLoop::new(header, config.chain_params());
    match search.run(&config.solver_settings(), cancellation).await {
        Ok(SearchOutcome::Accepted(accepted)) => {
            println!("Solution found!");
            println!("Header Hash: {}", display_hash(&accepted.block.block_hash()));
            println!("Nonce: {}", accepted.nonce);
            println!("{}", hex::encode(&accepted.solution));
            Ok(())
        }
        Ok(SearchOutcome::Exhausted) => {
            warn!("Solver stopped before valid solution found. Exiting.");
            Ok(())
        }
        Err(Error::Cancelled { .. }) => {
            warn!("Search cancelled. Exiting.");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// pszTimestamp from --psz-timestamp, or coin name plus hashed timestamp
async fn resolve_psz_timestamp(config: &Config) -> Result<String> {
    if let Some(psz_timestamp) = &config.psz_timestamp {
        return Ok(psz_timestamp.clone());
    }

    let timestamp = if genesis::coin_tokens(&config.timestamp).is_empty() {
        config.timestamp.clone()
    } else {
        let explorer = BlockExplorer::new(config.http_timeout_duration())?;
        genesis::substitute_tokens(&config.timestamp, &explorer).await?
    };

    Ok(genesis::psz_timestamp(&config.coin_name, &timestamp))
}

/// Print current configuration
fn print_configuration(config: &Config) -> Result<()> {
    let config_yaml = serde_yaml::to_string(config)?;
    println!("{}", config_yaml);
    Ok(())
}
