//! End-to-end search tests against stub solver processes
//!
//! Each stub is a `sh -c` script printing a canned transcript. The solver
//! arguments appended by the search become unused positional parameters.

#![cfg(unix)]

use async_trait::async_trait;
use equihash_genesis::pow::DifficultyTarget;
use equihash_genesis::search::{SearchLoop, SearchOutcome, SearchState, SolverSettings};
use equihash_genesis::solver::{BatchSource, SolutionBatch, SolverKind, SolverProcess};
use equihash_genesis::{ChainParams, EquihashHeader, Error, Network, Nonce, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const BITS: u32 = 0x200f0f0f;

fn regtest() -> ChainParams {
    ChainParams::for_network(Network::Regtest)
}

fn header(nonce: Nonce) -> EquihashHeader {
    EquihashHeader::new([0x5a; 32], 1_477_641_360, BITS, nonce)
}

fn meets_target(nonce: Nonce) -> bool {
    let target = DifficultyTarget::from_compact(BITS, &regtest()).unwrap();
    target.verify_hash(&header(nonce).pow_hash()).is_ok()
}

/// First nonce from zero with the wanted outcome
fn find_nonce(meets: bool) -> Nonce {
    let mut nonce = Nonce::zero();
    while meets_target(nonce) != meets {
        nonce.increment().unwrap();
    }
    nonce
}

/// Nonce `n` that fails while `n + 1` meets the target
fn find_failing_predecessor() -> Nonce {
    let mut nonce = Nonce::zero();
    loop {
        let next = nonce.incremented().unwrap();
        if !meets_target(nonce) && meets_target(next) {
            return nonce;
        }
        nonce = next;
    }
}

fn stub(kind: SolverKind, lines: &[String], tail: &str) -> SolverSettings {
    let script = format!("printf '{}\\n'{}", lines.join("\\n"), tail);
    SolverSettings {
        kind,
        command: vec![
            "sh".to_string(),
            "-c".to_string(),
            script,
            "stub-solver".to_string(),
        ],
        rounds: 2,
        threads: 1,
    }
}

fn solution_hex(byte: u8) -> String {
    hex::encode([byte; 36])
}

/// Solver wrapper counting how often the search stops it
struct CountingSource {
    inner: SolverProcess,
    stops: usize,
}

#[async_trait]
impl BatchSource for CountingSource {
    async fn next_batch(&mut self) -> Result<Option<SolutionBatch>> {
        self.inner.next_batch().await
    }

    async fn stop(&mut self) -> Result<()> {
        self.stops += 1;
        self.inner.stop().await
    }
}

#[tokio::test]
async fn silentarmy_solution_is_accepted() {
    let bad = find_nonce(false);
    let good = find_nonce(true);
    let lines = vec![
        "silentarmy stub".to_string(),
        "Running 2 rounds".to_string(),
        solution_hex(0x01),
        format!("Nonce: {}: 1 solutions", bad.to_hex()),
        solution_hex(0x02),
        solution_hex(0x03),
        format!("Nonce: {}: 2 solutions", good.to_hex()),
        "Total 3 solutions".to_string(),
    ];
    let settings = stub(SolverKind::SilentArmy, &lines, "");

    let mut search = SearchLoop::new(header(Nonce::zero()), regtest());
    let parameters = search.solver_parameters(&settings);
    let process = SolverProcess::start(settings.kind, &parameters, 36).unwrap();
    let mut source = CountingSource {
        inner: process,
        stops: 0,
    };

    let outcome = search
        .run_with(&mut source, CancellationToken::new())
        .await
        .unwrap();

    let accepted = match outcome {
        SearchOutcome::Accepted(accepted) => accepted,
        other => panic!("expected acceptance, got {:?}", other),
    };
    assert_eq!(accepted.nonce, good);
    assert_eq!(accepted.solution, vec![0x02; 36]);
    assert_eq!(accepted.block.header().nonce, good);
    assert_eq!(source.stops, 1);
    assert_eq!(source.inner.id(), None);
    assert_eq!(search.state(), SearchState::Accepted);
}

#[tokio::test]
async fn silentarmy_total_without_solutions_is_exhausted() {
    let lines = vec!["Running".to_string(), "Total 5 solutions".to_string()];
    let settings = stub(SolverKind::SilentArmy, &lines, "");

    let mut search = SearchLoop::new(header(Nonce::zero()), regtest());
    let outcome = search.run(&settings, CancellationToken::new()).await.unwrap();

    assert_eq!(outcome, SearchOutcome::Exhausted);
    assert_eq!(search.state(), SearchState::Exhausted);
}

#[tokio::test]
async fn tromp_nonce_counter_advances_per_round() {
    let start = find_failing_predecessor();
    let expected = start.incremented().unwrap();
    let lines = vec![
        "tromp stub".to_string(),
        "Using 1 threads".to_string(),
        "Digit 0".to_string(),
        format!("Solution {}", solution_hex(0x0a)),
        "1 solutions".to_string(),
        "Digit 8".to_string(),
        format!("Solution {}", solution_hex(0x0b)),
        "1 solutions".to_string(),
        "2 total solutions".to_string(),
    ];
    let settings = stub(SolverKind::Tromp, &lines, "");

    let mut search = SearchLoop::new(header(start), regtest());
    let outcome = search.run(&settings, CancellationToken::new()).await.unwrap();

    match outcome {
        SearchOutcome::Accepted(accepted) => {
            assert_eq!(accepted.nonce, expected);
            assert_eq!(accepted.solution, vec![0x0b; 36]);
        }
        other => panic!("expected acceptance, got {:?}", other),
    }
    assert_eq!(search.stats().batches, 2);
}

#[tokio::test]
async fn unexpected_output_fails_the_search() {
    let lines = vec!["Running".to_string(), "not a solution".to_string()];
    let settings = stub(SolverKind::SilentArmy, &lines, "");

    let mut search = SearchLoop::new(header(Nonce::zero()), regtest());
    let result = search.run(&settings, CancellationToken::new()).await;

    assert!(matches!(result, Err(Error::ProtocolViolation { .. })));
    assert_eq!(search.state(), SearchState::Failed);
}

#[tokio::test]
async fn missing_solver_binary_fails_before_running() {
    let settings = SolverSettings {
        kind: SolverKind::SilentArmy,
        command: vec!["/nonexistent/sa-solver".to_string()],
        rounds: 1,
        threads: 1,
    };

    let mut search = SearchLoop::new(header(Nonce::zero()), regtest());
    let result = search.run(&settings, CancellationToken::new()).await;

    assert!(matches!(result, Err(Error::BinaryNotFound { .. })));
    assert_eq!(search.state(), SearchState::Failed);
}

#[tokio::test]
async fn still_running_solver_is_killed_after_acceptance() {
    let good = find_nonce(true);
    let lines = vec![
        "Running".to_string(),
        solution_hex(0x07),
        format!("Nonce: {}: 1 solutions", good.to_hex()),
    ];
    let settings = stub(SolverKind::SilentArmy, &lines, "; exec sleep 30");

    let mut search = SearchLoop::new(header(Nonce::zero()), regtest());
    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        search.run(&settings, CancellationToken::new()),
    )
    .await
    .expect("search should not wait for the solver to finish")
    .unwrap();

    assert!(matches!(outcome, SearchOutcome::Accepted(ref accepted) if accepted.nonce == good));
}

#[tokio::test]
async fn cancellation_stops_a_silent_solver() {
    let settings = stub(SolverKind::SilentArmy, &["Running".to_string()], "; exec sleep 30");
    let cancellation = CancellationToken::new();
    let trigger = cancellation.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let mut search = SearchLoop::new(header(Nonce::zero()), regtest());
    let result = tokio::time::timeout(Duration::from_secs(10), search.run(&settings, cancellation))
        .await
        .expect("cancelled search should return promptly");

    assert!(matches!(result, Err(Error::Cancelled { .. })));
    assert_eq!(search.state(), SearchState::Failed);
}

#[tokio::test]
async fn wrapper_script_solver_does_not_block_acceptance() {
    let good = find_nonce(true);
    let lines = vec![
        "Running".to_string(),
        solution_hex(0x09),
        format!("Nonce: {}: 1 solutions", good.to_hex()),
    ];
    // the sleep runs as a grandchild that survives killing the shell
    let settings = stub(SolverKind::SilentArmy, &lines, "; sleep 20; echo done");

    let mut search = SearchLoop::new(header(Nonce::zero()), regtest());
    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        search.run(&settings, CancellationToken::new()),
    )
    .await
    .expect("search should not wait for the wrapped solver")
    .unwrap();

    assert!(matches!(outcome, SearchOutcome::Accepted(ref accepted) if accepted.nonce == good));
    assert_eq!(search.state(), SearchState::Accepted);
}
