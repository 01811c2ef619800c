//! Solver child process
//!
//! Spawns the solver, reads its stdout line by line through the kind's
//! output parser and guarantees the child is killed, drained and reaped on
//! `stop`. Stderr is forwarded to the debug log.

use super::{batches, BatchSource, LineOutcome, OutputParser, SolutionBatch, SolverKind, SolverParameters};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

/// Longest stdout line accepted from a solver
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// How long `stop` waits for output pipes to close after the kill
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// A running solver and its output parser
pub struct SolverProcess {
    kind: SolverKind,
    program: String,
    child: Option<Child>,
    lines: Option<FramedRead<ChildStdout, LinesCodec>>,
    stderr_task: Option<JoinHandle<()>>,
    parser: OutputParser,
    finished: bool,
}

impl SolverProcess {
    /// Launch the solver described by `params`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(kind: SolverKind, params: &SolverParameters, solution_size: usize) -> Result<Self> {
        if params.command.is_empty() {
            return Err(Error::SpawnFailed {
                command: String::new(),
                message: "empty solver command".to_string(),
            });
        }

        let cmdline = kind.command_line(params);
        let (program, args) = cmdline.split_at(1);
        let program = &program[0];

        debug!("Executing solver command: {} {:?}", program, args);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::BinaryNotFound {
                    binary: program.clone(),
                },
                _ => Error::SpawnFailed {
                    command: cmdline.join(" "),
                    message: e.to_string(),
                },
            })?;

        let stdout = child.stdout.take().ok_or_else(|| Error::SpawnFailed {
            command: program.clone(),
            message: "stdout was not captured".to_string(),
        })?;

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "solver_stderr", "{}", line);
                }
            })
        });

        info!(
            "Started {} solver '{}' (pid {:?}, {} rounds)",
            kind,
            program,
            child.id(),
            params.rounds
        );

        Ok(Self {
            kind,
            program: program.clone(),
            child: Some(child),
            lines: Some(FramedRead::new(
                stdout,
                LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
            )),
            stderr_task,
            parser: OutputParser::new(kind.protocol(params, solution_size)),
            finished: false,
        })
    }

    /// Solver kind driving this process
    pub fn kind(&self) -> SolverKind {
        self.kind
    }

    /// OS process id, until the process is reaped
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(|child| child.id())
    }

    /// Banner lines read so far
    pub fn banner(&self) -> String {
        self.parser.banner()
    }

    /// Completed batches as a stream
    pub fn solutions(&mut self) -> impl Stream<Item = Result<SolutionBatch>> + '_ {
        batches(self)
    }

    /// Read lines until a batch completes or the solver reports exhaustion
    ///
    /// The banner is consumed on the first call. Output that ends before a
    /// terminator line is a protocol violation.
    pub async fn next_batch(&mut self) -> Result<Option<SolutionBatch>> {
        if self.finished {
            return Ok(None);
        }
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };

        loop {
            let line = match lines.next().await {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.finished = true;
                    return Err(line_error(e));
                }
                None => {
                    self.finished = true;
                    let phase = if self.parser.in_banner() {
                        "banner"
                    } else {
                        "solution output"
                    };
                    return Err(Error::protocol_violation(format!(
                        "solver exited during {}",
                        phase
                    )));
                }
            };

            match self.parser.feed(&line) {
                Ok(LineOutcome::Pending) => continue,
                Ok(LineOutcome::Batch(batch)) => {
                    debug!(
                        "Solver returned {} solutions for nonce {}",
                        batch.solutions.len(),
                        batch.nonce
                    );
                    return Ok(Some(batch));
                }
                Ok(LineOutcome::Exhausted) => {
                    debug!("Solver finished all rounds");
                    self.finished = true;
                    return Ok(None);
                }
                Err(e) => {
                    self.finished = true;
                    return Err(e);
                }
            }
        }
    }

    /// Kill the solver, drain its stdout and reap it
    ///
    /// Safe to call more than once; later calls do nothing.
    pub async fn stop(&mut self) -> Result<()> {
        self.finished = true;
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        if let Err(e) = child.start_kill() {
            // already exited on its own
            debug!("Solver kill skipped: {}", e);
        }

        // A grandchild of a wrapper script can keep the pipe open after the
        // kill; dropping the reader on timeout closes our end.
        let drained = match self.lines.take() {
            Some(lines) => match timeout(DRAIN_TIMEOUT, drain(lines)).await {
                Ok(drained) => drained,
                Err(_) => {
                    warn!(
                        "Solver output still open {:?} after kill, closing pipe",
                        DRAIN_TIMEOUT
                    );
                    0
                }
            },
            None => 0,
        };

        let status = child.wait().await;

        if let Some(mut task) = self.stderr_task.take() {
            match timeout(DRAIN_TIMEOUT, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Solver stderr reader failed: {}", e),
                Err(_) => task.abort(),
            }
        }

        let status = status?;
        debug!(
            "Solver '{}' stopped with {} ({} unread lines discarded)",
            self.program, status, drained
        );
        Ok(())
    }
}

/// Read and discard remaining output, returning the number of lines
async fn drain(mut lines: FramedRead<ChildStdout, LinesCodec>) -> usize {
    let mut drained = 0usize;
    while let Some(line) = lines.next().await {
        match line {
            Ok(_) => drained += 1,
            Err(LinesCodecError::MaxLineLengthExceeded) => continue,
            Err(LinesCodecError::Io(_)) => break,
        }
    }
    drained
}

impl std::fmt::Debug for SolverProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverProcess")
            .field("kind", &self.kind)
            .field("program", &self.program)
            .field("pid", &self.id())
            .field("finished", &self.finished)
            .finish()
    }
}

#[async_trait]
impl BatchSource for SolverProcess {
    async fn next_batch(&mut self) -> Result<Option<SolutionBatch>> {
        SolverProcess::next_batch(self).await
    }

    async fn stop(&mut self) -> Result<()> {
        SolverProcess::stop(self).await
    }
}

fn line_error(e: LinesCodecError) -> Error {
    match e {
        LinesCodecError::MaxLineLengthExceeded => Error::protocol_violation(format!(
            "line longer than {} bytes",
            MAX_LINE_LENGTH
        )),
        LinesCodecError::Io(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            Error::protocol_violation("output is not valid UTF-8")
        }
        LinesCodecError::Io(e) => Error::Io(e),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::types::Nonce;
    use assert_matches::assert_matches;
    use futures::TryStreamExt;
    use std::time::Duration;

    /// Solver stub running `script` under sh; appended solver arguments
    /// become unused positional parameters
    fn stub(script: &str) -> SolverParameters {
        SolverParameters {
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                script.to_string(),
                "stub-solver".to_string(),
            ],
            header: vec![0u8; 140],
            rounds: 1,
            start_nonce: Nonce::zero(),
            threads: 1,
        }
    }

    #[tokio::test]
    async fn test_exhaustion_after_banner() {
        let params = stub("printf 'stub solver\\nRunning 1 rounds\\nTotal 0 solutions\\n'");
        let mut process = SolverProcess::start(SolverKind::SilentArmy, &params, 36).unwrap();

        assert_eq!(process.next_batch().await.unwrap(), None);
        assert_eq!(process.next_batch().await.unwrap(), None);
        assert_eq!(process.banner(), "stub solver\nRunning 1 rounds");

        process.stop().await.unwrap();
        process.stop().await.unwrap();
        assert_eq!(process.id(), None);
    }

    #[tokio::test]
    async fn test_batches_stream() {
        let solution = "ab".repeat(36);
        let script = format!(
            "printf 'Using 1 threads\\nDigit 3\\nSolution {s}\\nSolution {s}\\n2 solutions\\n0 solutions\\n2 total solutions\\n'",
            s = solution
        );
        let params = stub(&script);
        let mut process = SolverProcess::start(SolverKind::Tromp, &params, 36).unwrap();

        let collected: Vec<SolutionBatch> = process.solutions().try_collect().await.unwrap();
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].nonce, Nonce::zero());
        assert_eq!(collected[0].solutions, vec![vec![0xab; 36]; 2]);
        assert_eq!(collected[1].nonce, Nonce::from_hex_padded("1").unwrap());
        assert!(collected[1].solutions.is_empty());

        process.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_early_exit_is_violation() {
        let params = stub("printf 'Running\\n'");
        let mut process = SolverProcess::start(SolverKind::SilentArmy, &params, 36).unwrap();

        assert_matches!(
            process.next_batch().await,
            Err(Error::ProtocolViolation { .. })
        );
        process.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let mut params = stub("");
        params.command = vec!["/nonexistent/equihash-solver".to_string()];

        assert_matches!(
            SolverProcess::start(SolverKind::SilentArmy, &params, 36),
            Err(Error::BinaryNotFound { binary }) if binary == "/nonexistent/equihash-solver"
        );
    }

    #[tokio::test]
    async fn test_empty_command() {
        let mut params = stub("");
        params.command.clear();

        assert_matches!(
            SolverProcess::start(SolverKind::SilentArmy, &params, 36),
            Err(Error::SpawnFailed { .. })
        );
    }

    #[tokio::test]
    async fn test_stop_kills_running_solver() {
        let params = stub("printf 'Running\\n'; exec sleep 30");
        let mut process = SolverProcess::start(SolverKind::SilentArmy, &params, 36).unwrap();
        assert!(process.id().is_some());

        tokio::time::timeout(Duration::from_secs(10), process.stop())
            .await
            .expect("stop should not hang")
            .unwrap();
        assert_eq!(process.id(), None);
        assert_eq!(process.next_batch().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stop_returns_while_grandchild_holds_output() {
        // no exec: the sleep outlives the killed shell and keeps both pipes open
        let params = stub("printf 'Running\\n'; sleep 20; echo done");
        let mut process = SolverProcess::start(SolverKind::SilentArmy, &params, 36).unwrap();

        tokio::time::timeout(Duration::from_secs(10), process.stop())
            .await
            .expect("stop should not wait for the grandchild")
            .unwrap();
        assert_eq!(process.id(), None);
    }
}
