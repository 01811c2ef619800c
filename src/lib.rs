//! Equihash Genesis Miner
//!
//! Finds a valid Equihash proof-of-work for a (genesis) block header by
//! driving an external solver binary:
//! - Byte-exact header and solution codecs
//! - Compact difficulty targets with per-network ceilings
//! - Two solver output protocols behind one process abstraction
//! - A search loop that always stops and reaps the solver

pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod explorer;
pub mod genesis;
pub mod header;
pub mod params;
pub mod pow;
pub mod search;
pub mod solver;
pub mod types;
pub mod utils;

pub use config::Config;
pub use error::{Error, Result};
pub use header::{BlockHeader, EquihashHeader};
pub use params::{ChainParams, EquihashParams, Network};
pub use search::{AcceptedSolution, SearchLoop, SearchOutcome, SearchState};
pub use solver::{SolutionBatch, SolverKind, SolverParameters, SolverProcess};
pub use types::*;

/// Application information
pub const APP_NAME: &str = "equihash-genesis";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
