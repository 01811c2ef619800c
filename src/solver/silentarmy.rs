//! Line-counted solver output
//!
//! After the banner, every line is either one hex-encoded solution, a
//! `Nonce <hex>: ...` line closing the current batch, or a `Total ...` line
//! reporting that all rounds are done.

use super::{LineOutcome, SolutionBatch};
use crate::types::Nonce;
use crate::{Error, Result};

/// Parser state for one solver process
#[derive(Debug, Clone)]
pub struct SilentArmyParser {
    solution_size: usize,
    pending: Vec<Vec<u8>>,
}

impl SilentArmyParser {
    pub fn new(solution_size: usize) -> Self {
        Self {
            solution_size,
            pending: Vec::new(),
        }
    }

    /// Solutions collected for the batch in progress
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn parse_line(&mut self, line: &str) -> Result<LineOutcome> {
        if line.starts_with("Nonce") {
            let nonce = parse_nonce(line)?;
            let solutions = std::mem::take(&mut self.pending);
            return Ok(LineOutcome::Batch(SolutionBatch { nonce, solutions }));
        }

        if line.starts_with("Total") {
            return Ok(LineOutcome::Exhausted);
        }

        let expected = self.solution_size * 2;
        if line.len() != expected {
            return Err(Error::protocol_violation(format!(
                "solution line has {} characters, expected {}",
                line.len(),
                expected
            )));
        }

        let solution = hex::decode(line)
            .map_err(|e| Error::protocol_violation(format!("solution is not hex: {}", e)))?;
        self.pending.push(solution);

        Ok(LineOutcome::Pending)
    }
}

/// Second whitespace-separated token, with its trailing colon stripped
fn parse_nonce(line: &str) -> Result<Nonce> {
    let token = line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| Error::protocol_violation(format!("nonce line without a nonce: {}", line)))?;

    let token = token.trim_end_matches(':');
    Nonce::from_hex(token)
        .map_err(|e| Error::protocol_violation(format!("bad nonce '{}': {}", token, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const NONCE: &str = "ab12000000000000000000000000000000000000000000000000000000000001";

    #[test]
    fn test_batch_of_mainnet_solutions() {
        let mut parser = SilentArmyParser::new(1344);
        let lines = ["00".repeat(1344), "11".repeat(1344), "ff".repeat(1344)];

        for line in &lines {
            assert_eq!(parser.parse_line(line).unwrap(), LineOutcome::Pending);
        }
        assert_eq!(parser.pending(), 3);

        let outcome = parser
            .parse_line(&format!("Nonce: {}: 3 solutions", NONCE))
            .unwrap();
        let batch = match outcome {
            LineOutcome::Batch(batch) => batch,
            other => panic!("expected batch, got {:?}", other),
        };

        assert_eq!(batch.nonce.to_hex(), NONCE);
        assert_eq!(batch.solutions.len(), 3);
        assert_eq!(batch.solutions[0], vec![0x00; 1344]);
        assert_eq!(batch.solutions[1], vec![0x11; 1344]);
        assert_eq!(batch.solutions[2], vec![0xff; 1344]);
        assert_eq!(parser.pending(), 0);
    }

    #[test]
    fn test_nonce_token_variants() {
        let mut parser = SilentArmyParser::new(36);
        let outcome = parser.parse_line(&format!("Nonce {} 0 sols", NONCE)).unwrap();
        assert_matches!(outcome, LineOutcome::Batch(batch) if batch.solutions.is_empty());
    }

    #[test]
    fn test_wrong_length_is_violation() {
        let mut parser = SilentArmyParser::new(1344);
        assert_matches!(
            parser.parse_line(&"00".repeat(1343)),
            Err(Error::ProtocolViolation { .. })
        );
        assert_matches!(
            parser.parse_line("unexpected"),
            Err(Error::ProtocolViolation { .. })
        );
    }

    #[test]
    fn test_non_hex_solution_is_violation() {
        let mut parser = SilentArmyParser::new(2);
        assert_matches!(parser.parse_line("zzzz"), Err(Error::ProtocolViolation { .. }));
    }

    #[test]
    fn test_bad_nonce_is_violation() {
        let mut parser = SilentArmyParser::new(36);
        assert_matches!(parser.parse_line("Nonce"), Err(Error::ProtocolViolation { .. }));
        assert_matches!(
            parser.parse_line("Nonce: abcd: 1 solutions"),
            Err(Error::ProtocolViolation { .. })
        );
    }

    #[test]
    fn test_total_is_exhaustion() {
        let mut parser = SilentArmyParser::new(36);
        assert_eq!(
            parser.parse_line("Total 5 solutions in 1.2 s").unwrap(),
            LineOutcome::Exhausted
        );
    }
}
