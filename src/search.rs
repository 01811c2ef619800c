//! Search loop
//!
//! Runs one solver session for a header: pulls solution batches, checks each
//! candidate against the header's target in the order the solver printed
//! them and stops at the first one that passes. The solver is stopped exactly
//! once on every way out of the loop.

use crate::header::{BlockHeader, EquihashHeader};
use crate::params::ChainParams;
use crate::pow::DifficultyTarget;
use crate::solver::{BatchSource, SolverKind, SolverParameters, SolverProcess};
use crate::types::Nonce;
use crate::utils::format_duration;
use crate::{Error, Result};
use std::fmt;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Where a search session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Starting,
    Running,
    Accepted,
    Exhausted,
    Failed,
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchState::Starting => "starting",
            SearchState::Running => "running",
            SearchState::Accepted => "accepted",
            SearchState::Exhausted => "exhausted",
            SearchState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// A solution that meets the header's target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedSolution {
    pub nonce: Nonce,
    pub solution: Vec<u8>,
    /// Complete header with nonce and solution filled in
    pub block: BlockHeader,
}

/// How a search session ended, short of an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Accepted(AcceptedSolution),
    /// The solver ran all of its rounds without an acceptable solution
    Exhausted,
}

/// Counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub batches: u64,
    pub candidates: u64,
    pub elapsed: Duration,
}

/// Solver settings for a session; the header and start nonce come from the
/// search itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverSettings {
    pub kind: SolverKind,
    pub command: Vec<String>,
    pub rounds: u32,
    pub threads: u32,
}

/// One search session over a fixed header
#[derive(Debug)]
pub struct SearchLoop {
    header: EquihashHeader,
    params: ChainParams,
    state: SearchState,
    stats: SearchStats,
}

impl SearchLoop {
    pub fn new(header: EquihashHeader, params: ChainParams) -> Self {
        Self {
            header,
            params,
            state: SearchState::Starting,
            stats: SearchStats::default(),
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    pub fn header(&self) -> &EquihashHeader {
        &self.header
    }

    /// Parameters for launching a solver on this session's header
    pub fn solver_parameters(&self, settings: &SolverSettings) -> SolverParameters {
        SolverParameters {
            command: settings.command.clone(),
            header: self.header.serialize(),
            rounds: settings.rounds,
            start_nonce: self.header.nonce,
            threads: settings.threads,
        }
    }

    /// Launch the solver and search until a solution is accepted, the solver
    /// is exhausted, or something fails
    ///
    /// The target is checked before the solver is started, so malformed
    /// `bits` never spawn a process.
    pub async fn run(
        &mut self,
        settings: &SolverSettings,
        cancellation: CancellationToken,
    ) -> Result<SearchOutcome> {
        let span = info_span!("search", solver = %settings.kind, rounds = settings.rounds);

        async {
            if let Err(e) = DifficultyTarget::from_compact(self.header.bits, &self.params) {
                self.transition(SearchState::Failed);
                return Err(e);
            }

            let parameters = self.solver_parameters(settings);
            let mut process =
                match SolverProcess::start(settings.kind, &parameters, self.params.solution_size()) {
                    Ok(process) => process,
                    Err(e) => {
                        warn!("Failed to start solver: {}", e);
                        self.transition(SearchState::Failed);
                        return Err(e);
                    }
                };

            self.run_with(&mut process, cancellation).await
        }
        .instrument(span)
        .await
    }

    /// Search using an already running batch source
    ///
    /// `source.stop()` is called exactly once before this returns.
    pub async fn run_with<S: BatchSource + ?Sized>(
        &mut self,
        source: &mut S,
        cancellation: CancellationToken,
    ) -> Result<SearchOutcome> {
        let started = Instant::now();
        self.stats = SearchStats::default();

        let result = match DifficultyTarget::from_compact(self.header.bits, &self.params) {
            Ok(target) => {
                self.transition(SearchState::Running);
                self.drive(source, &target, &cancellation).await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = source.stop().await {
            warn!("Failed to stop solver cleanly: {}", e);
        }
        self.stats.elapsed = started.elapsed();

        match &result {
            Ok(SearchOutcome::Accepted(accepted)) => {
                self.transition(SearchState::Accepted);
                info!(
                    "Solution accepted for nonce {} after {} batches ({} candidates, {})",
                    accepted.nonce,
                    self.stats.batches,
                    self.stats.candidates,
                    format_duration(self.stats.elapsed.as_secs())
                );
            }
            Ok(SearchOutcome::Exhausted) => {
                self.transition(SearchState::Exhausted);
                info!(
                    "Solver exhausted after {} batches ({} candidates, {}) without a valid solution",
                    self.stats.batches,
                    self.stats.candidates,
                    format_duration(self.stats.elapsed.as_secs())
                );
            }
            Err(e) => {
                self.transition(SearchState::Failed);
                warn!("Search failed ({}): {}", e.category(), e);
            }
        }

        result
    }

    async fn drive<S: BatchSource + ?Sized>(
        &mut self,
        source: &mut S,
        target: &DifficultyTarget,
        cancellation: &CancellationToken,
    ) -> Result<SearchOutcome> {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    info!("Search cancelled");
                    return Err(Error::cancelled("equihash search"));
                }
                next = source.next_batch() => next?,
            };

            let Some(batch) = next else {
                return Ok(SearchOutcome::Exhausted);
            };
            self.stats.batches += 1;

            for solution in batch.solutions {
                self.stats.candidates += 1;
                let candidate =
                    BlockHeader::from_equihash_header(&self.header, batch.nonce, solution, &self.params)?;

                if target.is_met_by(&candidate) {
                    return Ok(SearchOutcome::Accepted(AcceptedSolution {
                        nonce: batch.nonce,
                        solution: candidate.solution().to_vec(),
                        block: candidate,
                    }));
                }
            }
            debug!("No solution for nonce {} meets the target", batch.nonce);
        }
    }

    fn transition(&mut self, next: SearchState) {
        debug!("Search state {} -> {}", self.state, next);
        self.state = next;
    }
}
