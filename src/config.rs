//! Configuration management for the genesis miner
//!
//! Supports configuration via command line arguments and configuration files
//! (YAML/JSON). Values given on the command line win over the file; the
//! file wins over built-in defaults.

use crate::genesis::{self, GenesisParams};
use crate::params::{ChainParams, Network};
use crate::search::SolverSettings;
use crate::solver::SolverKind;
use crate::types::Nonce;
use crate::utils;
use crate::{Error, Result};
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Log output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    Text,
    /// One JSON object per event
    Json,
}

/// Complete configuration for a genesis search
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(
    name = "equihash-genesis",
    version = env!("CARGO_PKG_VERSION"),
    about = "Find an Equihash solution for a genesis block header",
    long_about = "Builds a genesis block header and drives an external Equihash solver until it reports a solution that meets the header's target"
)]
pub struct Config {
    /// Print the parsed configuration and exit
    #[arg(long)]
    #[serde(skip)]
    pub print_config: bool,

    /// Configuration file path (YAML or JSON)
    #[arg(long, value_name = "FILE")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Chain parameters selecting the proof-of-work limit and solution size
    #[arg(short = 'c', long, alias = "chainparams", default_value = "mainnet")]
    #[serde(default = "default_chain")]
    pub chain: Network,

    /// Unix time to set in the block header (defaults to now)
    #[arg(short = 't', long, default_value_t = utils::current_unix_time())]
    #[serde(default = "utils::current_unix_time")]
    pub time: u32,

    /// Coin name prefixed to the BLAKE2s hash of the timestamp
    #[arg(short = 'C', long, default_value = genesis::DEFAULT_COIN_NAME)]
    #[serde(default = "default_coin_name")]
    pub coin_name: String,

    /// Timestamp text committed to by the coinbase; {BTC}, {ETH} and {ZEC}
    /// are replaced by that chain's latest block
    #[arg(short = 'z', long, default_value = genesis::DEFAULT_TIMESTAMP)]
    #[serde(default = "default_timestamp")]
    pub timestamp: String,

    /// Use this pszTimestamp verbatim, ignoring --coin-name and --timestamp
    #[arg(short = 'Z', long)]
    #[serde(default)]
    pub psz_timestamp: Option<String>,

    /// Nonce to start searching from, in hex; leading zeros may be omitted
    #[arg(short = 'n', long, default_value = "0")]
    #[serde(default = "default_nonce")]
    pub nonce: String,

    /// Public key in the coinbase output script (hex)
    #[arg(short = 'p', long, default_value = genesis::DEFAULT_PUBKEY)]
    #[serde(default = "default_pubkey")]
    pub pubkey: String,

    /// Compact target, decimal or 0x-prefixed hex
    #[arg(short = 'b', long, default_value = "0x1f07ffff")]
    #[serde(default = "default_bits")]
    pub bits: String,

    /// First coinbase script push instead of the bits (decimal or 0x hex)
    #[arg(short = 'E', long)]
    #[serde(default)]
    pub extra_nonce: Option<String>,

    /// Output value in zatoshi
    #[arg(long, default_value = "0")]
    #[serde(default)]
    pub value: i64,

    /// Solver binary and fixed arguments, split on whitespace
    #[arg(short = 's', long, default_value = "sa-solver")]
    #[serde(default = "default_solver")]
    pub solver: String,

    /// Output protocol spoken by the solver
    #[arg(short = 'k', long, value_enum, default_value = "silentarmy")]
    #[serde(default = "default_solver_kind")]
    pub solver_kind: SolverKind,

    /// Rounds the solver runs before giving up
    #[arg(short = 'r', long, default_value = "99999")]
    #[serde(default = "default_rounds")]
    pub rounds: u32,

    /// Solver threads
    #[arg(short = 'T', long, default_value_t = default_threads())]
    #[serde(default = "default_threads")]
    pub threads: u32,

    /// Log level
    #[arg(short = 'l', long, default_value = "info")]
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, default_value = "text")]
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Verbose mode, same as --log-level debug
    #[arg(short = 'v', long)]
    #[serde(default)]
    pub verbose: bool,

    /// Block explorer HTTP timeout in milliseconds
    #[arg(long, default_value = "30000")]
    #[serde(default = "default_http_timeout")]
    pub http_timeout: u64,
}

impl Config {
    /// Parse the command line, merge the configuration file and validate
    pub async fn load() -> Result<Self> {
        let matches = Self::command().get_matches();
        Self::load_from_matches(&matches).await
    }

    /// Same as [`Config::load`] for already parsed arguments
    pub async fn load_from_matches(matches: &ArgMatches) -> Result<Self> {
        let mut config =
            Self::from_arg_matches(matches).map_err(|e| Error::config(e.to_string()))?;

        if let Some(config_file) = config.config_file.clone() {
            let file_config = Self::load_from_file(&config_file).await?;
            config = config.merge_with_file(file_config, matches);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;

        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content).map_err(Error::from)
        } else {
            // Default to YAML
            serde_yaml::from_str(&content).map_err(Error::from)
        }
    }

    /// Take file values for everything not given on the command line
    fn merge_with_file(mut self, file: Self, matches: &ArgMatches) -> Self {
        let explicit = |id: &str| {
            matches!(
                matches.value_source(id),
                Some(ValueSource::CommandLine) | Some(ValueSource::EnvVariable)
            )
        };

        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(
                    if !explicit(stringify!($field)) {
                        self.$field = file.$field;
                    }
                )*
            };
        }

        merge!(
            chain,
            time,
            coin_name,
            timestamp,
            psz_timestamp,
            nonce,
            pubkey,
            bits,
            extra_nonce,
            value,
            solver,
            solver_kind,
            rounds,
            threads,
            log_level,
            log_format,
            verbose,
            http_timeout,
        );
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.solver_command().is_empty() {
            return Err(Error::config("Solver command must not be empty"));
        }
        if self.rounds == 0 {
            return Err(Error::config("Rounds must be greater than 0"));
        }
        if self.threads == 0 {
            return Err(Error::config("Thread count must be greater than 0"));
        }
        if self.pubkey_bytes()?.is_empty() {
            return Err(Error::config("Public key must not be empty"));
        }

        self.start_nonce()?;
        self.bits()?;
        self.extra_nonce()?;
        Ok(())
    }

    /// Network parameters for `--chain`
    pub fn chain_params(&self) -> ChainParams {
        ChainParams::for_network(self.chain)
    }

    pub fn bits(&self) -> Result<u32> {
        utils::parse_bits(&self.bits)
    }

    pub fn extra_nonce(&self) -> Result<Option<i64>> {
        self.extra_nonce
            .as_deref()
            .map(|s| {
                let value = utils::parse_smart_int(s)?;
                i64::try_from(value).map_err(|_| {
                    Error::config(format!(
                        "Extra nonce 0x{:x} does not fit a script number",
                        value
                    ))
                })
            })
            .transpose()
    }

    pub fn start_nonce(&self) -> Result<Nonce> {
        Nonce::from_hex_padded(&self.nonce)
            .map_err(|e| Error::config(format!("Invalid nonce '{}': {}", self.nonce, e)))
    }

    pub fn pubkey_bytes(&self) -> Result<Vec<u8>> {
        utils::decode_hex_field("pubkey", &self.pubkey)
    }

    /// Solver binary followed by its fixed arguments
    pub fn solver_command(&self) -> Vec<String> {
        utils::split_command(&self.solver)
    }

    pub fn solver_settings(&self) -> SolverSettings {
        SolverSettings {
            kind: self.solver_kind,
            command: self.solver_command(),
            rounds: self.rounds,
            threads: self.threads,
        }
    }

    /// Genesis parameters for an already resolved pszTimestamp
    pub fn genesis_params(&self, psz_timestamp: String) -> Result<GenesisParams> {
        Ok(GenesisParams {
            psz_timestamp,
            pubkey: self.pubkey_bytes()?,
            bits: self.bits()?,
            extra_nonce: self.extra_nonce()?,
            value: self.value,
            time: self.time,
            nonce: self.start_nonce()?,
        })
    }

    /// Log level after applying `--verbose`
    pub fn effective_log_level(&self) -> LogLevel {
        if self.verbose && self.log_level != LogLevel::Trace {
            LogLevel::Debug
        } else {
            self.log_level
        }
    }

    /// Get HTTP timeout duration
    pub fn http_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.http_timeout)
    }
}

// Default value functions for serde
fn default_chain() -> Network { Network::Mainnet }
fn default_coin_name() -> String { genesis::DEFAULT_COIN_NAME.to_string() }
fn default_timestamp() -> String { genesis::DEFAULT_TIMESTAMP.to_string() }
fn default_nonce() -> String { "0".to_string() }
fn default_pubkey() -> String { genesis::DEFAULT_PUBKEY.to_string() }
fn default_bits() -> String { format!("0x{:08x}", genesis::DEFAULT_BITS) }
fn default_solver() -> String { "sa-solver".to_string() }
fn default_solver_kind() -> SolverKind { SolverKind::SilentArmy }
fn default_rounds() -> u32 { 99999 }
fn default_threads() -> u32 { u32::try_from(num_cpus::get()).unwrap_or(1).max(1) }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_log_format() -> LogFormat { LogFormat::Text }
fn default_http_timeout() -> u64 { 30000 }
