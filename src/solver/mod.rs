//! External Equihash solver integration
//!
//! A solver is an external binary that receives a serialized header on its
//! command line and prints solutions on stdout. Each supported binary has its
//! own command line and output grammar; both are described by [`SolverKind`]
//! and parsed by the matching protocol state machine. [`SolverProcess`] owns
//! the running child and turns its output into [`SolutionBatch`]es.

use crate::types::Nonce;
use crate::Result;
use async_trait::async_trait;
use clap::ValueEnum;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

pub mod process;
pub mod silentarmy;
pub mod tromp;

pub use process::SolverProcess;
pub use silentarmy::SilentArmyParser;
pub use tromp::TrompParser;

/// Everything needed to launch one solver process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverParameters {
    /// Binary path followed by fixed arguments
    pub command: Vec<String>,
    /// Serialized Equihash header
    pub header: Vec<u8>,
    /// Rounds the solver runs before giving up
    pub rounds: u32,
    /// First nonce for solvers that take one
    pub start_nonce: Nonce,
    /// Solver worker threads
    pub threads: u32,
}

/// All solutions the solver reported for one nonce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionBatch {
    pub nonce: Nonce,
    /// Packed solutions in the order they were printed
    pub solutions: Vec<Vec<u8>>,
}

/// Supported solver binaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    /// Prints one hex solution per line and reports the nonce per batch
    #[value(name = "silentarmy")]
    SilentArmy,
    /// Prefixes solutions with `Solution` and never prints the nonce
    Tromp,
}

impl SolverKind {
    /// Full argument list: fixed command followed by the per-kind arguments
    pub fn command_line(&self, params: &SolverParameters) -> Vec<String> {
        let header = hex::encode(&params.header);
        let mut cmdline = params.command.clone();

        match self {
            SolverKind::SilentArmy => cmdline.extend([
                "--nonces".to_string(),
                params.rounds.to_string(),
                "-i".to_string(),
                header,
            ]),
            SolverKind::Tromp => cmdline.extend([
                "-s".to_string(),
                "-c".to_string(),
                "-n".to_string(),
                params.start_nonce.to_biguint().to_string(),
                "-r".to_string(),
                params.rounds.to_string(),
                "-t".to_string(),
                params.threads.to_string(),
                "-x".to_string(),
                header,
            ]),
        }

        cmdline
    }

    /// Fresh output state machine for one process
    pub fn protocol(&self, params: &SolverParameters, solution_size: usize) -> SolverProtocol {
        match self {
            SolverKind::SilentArmy => {
                SolverProtocol::SilentArmy(SilentArmyParser::new(solution_size))
            }
            SolverKind::Tromp => {
                SolverProtocol::Tromp(TrompParser::new(solution_size, params.start_nonce))
            }
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverKind::SilentArmy => write!(f, "silentarmy"),
            SolverKind::Tromp => write!(f, "tromp"),
        }
    }
}

/// What a single output line amounted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// More lines are needed
    Pending,
    /// A batch was completed by this line
    Batch(SolutionBatch),
    /// The solver ran all rounds without an acceptable solution
    Exhausted,
}

/// Per-kind output state machine, after the banner
#[derive(Debug, Clone)]
pub enum SolverProtocol {
    SilentArmy(SilentArmyParser),
    Tromp(TrompParser),
}

impl SolverProtocol {
    /// True for the last banner line
    pub fn is_banner_end(&self, line: &str) -> bool {
        match self {
            SolverProtocol::SilentArmy(_) => line.starts_with("Running"),
            SolverProtocol::Tromp(_) => line.starts_with("Using"),
        }
    }

    /// Feed one line of solution output
    pub fn parse_line(&mut self, line: &str) -> Result<LineOutcome> {
        match self {
            SolverProtocol::SilentArmy(parser) => parser.parse_line(line),
            SolverProtocol::Tromp(parser) => parser.parse_line(line),
        }
    }
}

/// Banner handling in front of a [`SolverProtocol`]
#[derive(Debug, Clone)]
pub struct OutputParser {
    protocol: SolverProtocol,
    banner: Vec<String>,
    in_banner: bool,
}

impl OutputParser {
    /// Start in the banner phase
    pub fn new(protocol: SolverProtocol) -> Self {
        Self {
            protocol,
            banner: Vec::new(),
            in_banner: true,
        }
    }

    /// Feed one line of raw output
    pub fn feed(&mut self, line: &str) -> Result<LineOutcome> {
        let line = line.trim_end();

        if self.in_banner {
            self.banner.push(line.to_string());
            if self.protocol.is_banner_end(line) {
                self.in_banner = false;
                debug!("Solver banner:\n{}", self.banner());
            }
            return Ok(LineOutcome::Pending);
        }

        self.protocol.parse_line(line)
    }

    /// Whether the banner is still being read
    pub fn in_banner(&self) -> bool {
        self.in_banner
    }

    /// Banner lines read so far
    pub fn banner(&self) -> String {
        self.banner.join("\n")
    }
}

/// Source of solution batches with a guaranteed shutdown
///
/// `next_batch` returns `Ok(None)` once the solver reports that all rounds
/// are exhausted. `stop` must be safe to call in any state.
#[async_trait]
pub trait BatchSource: Send {
    /// Wait for the next completed batch
    async fn next_batch(&mut self) -> Result<Option<SolutionBatch>>;

    /// Terminate the solver and release its resources
    async fn stop(&mut self) -> Result<()>;
}

/// Batches of `source` as a stream, ending on exhaustion or after an error
pub fn batches<S: BatchSource>(source: &mut S) -> impl Stream<Item = Result<SolutionBatch>> + '_ {
    futures::stream::try_unfold(source, |source| async move {
        let next = source.next_batch().await?;
        Ok::<_, crate::Error>(next.map(|batch| (batch, source)))
    })
}
