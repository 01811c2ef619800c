//! Digit-annotated solver output
//!
//! This solver reports progress as `Digit <n>` lines and never prints the
//! nonce it worked on. The parser keeps its own counter, starting at the
//! nonce passed on the command line and advancing once per finished round.

use super::{LineOutcome, SolutionBatch};
use crate::types::Nonce;
use crate::{Error, Result};

/// Parser state for one solver process
#[derive(Debug, Clone)]
pub struct TrompParser {
    solution_size: usize,
    nonce: Nonce,
    pending: Vec<Vec<u8>>,
}

impl TrompParser {
    pub fn new(solution_size: usize, start_nonce: Nonce) -> Self {
        Self {
            solution_size,
            nonce: start_nonce,
            pending: Vec::new(),
        }
    }

    /// Nonce the solver is currently working on
    pub fn nonce(&self) -> Nonce {
        self.nonce
    }

    pub fn parse_line(&mut self, line: &str) -> Result<LineOutcome> {
        if let Some(rest) = line.strip_prefix("Digit ") {
            if rest.starts_with(|c: char| c.is_ascii_digit()) {
                return Ok(LineOutcome::Pending);
            }
        }

        if line.starts_with("Solution") {
            let solution = self.parse_solution(line)?;
            self.pending.push(solution);
            return Ok(LineOutcome::Pending);
        }

        if let Some((_, rest)) = leading_count(line) {
            if rest.starts_with(" total solutions") {
                return Ok(LineOutcome::Exhausted);
            }
            if rest.starts_with(" solutions") {
                let nonce = self.nonce;
                self.nonce.increment()?;
                let solutions = std::mem::take(&mut self.pending);
                return Ok(LineOutcome::Batch(SolutionBatch { nonce, solutions }));
            }
        }

        Err(Error::protocol_violation(format!("unrecognized line: {}", line)))
    }

    fn parse_solution(&self, line: &str) -> Result<Vec<u8>> {
        let token = line.split_whitespace().nth(1).ok_or_else(|| {
            Error::protocol_violation(format!("solution line without a solution: {}", line))
        })?;

        let expected = self.solution_size * 2;
        if token.len() != expected {
            return Err(Error::protocol_violation(format!(
                "solution has {} characters, expected {}",
                token.len(),
                expected
            )));
        }

        hex::decode(token)
            .map_err(|e| Error::protocol_violation(format!("solution is not hex: {}", e)))
    }
}

/// Split a leading decimal count from the rest of the line
fn leading_count(line: &str) -> Option<(u64, &str)> {
    let end = line
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(line.len());
    if end == 0 {
        return None;
    }
    let count = line[..end].parse().ok()?;
    Some((count, &line[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_single_solution_round() {
        let start = Nonce::from_hex_padded("2a").unwrap();
        let mut parser = TrompParser::new(36, start);

        assert_eq!(parser.parse_line("Digit 1").unwrap(), LineOutcome::Pending);
        assert_eq!(
            parser
                .parse_line(&format!("Solution {}", "aa".repeat(36)))
                .unwrap(),
            LineOutcome::Pending
        );
        assert_eq!(parser.parse_line("Digit 5").unwrap(), LineOutcome::Pending);

        let outcome = parser.parse_line("1 solutions").unwrap();
        assert_eq!(
            outcome,
            LineOutcome::Batch(SolutionBatch {
                nonce: start,
                solutions: vec![vec![0xaa; 36]],
            })
        );
        assert_eq!(parser.nonce(), Nonce::from_hex_padded("2b").unwrap());
    }

    #[test]
    fn test_nonce_advances_per_round() {
        let mut parser = TrompParser::new(36, Nonce::from_hex_padded("ff").unwrap());

        let first = parser.parse_line("0 solutions").unwrap();
        assert_matches!(first, LineOutcome::Batch(batch) if batch.solutions.is_empty());

        let second = parser.parse_line("0 solutions").unwrap();
        assert_matches!(
            second,
            LineOutcome::Batch(batch) if batch.nonce == Nonce::from_hex_padded("100").unwrap()
        );
        assert_eq!(parser.nonce(), Nonce::from_hex_padded("101").unwrap());
    }

    #[test]
    fn test_total_is_exhaustion() {
        let mut parser = TrompParser::new(36, Nonce::zero());
        assert_eq!(
            parser.parse_line("3 total solutions").unwrap(),
            LineOutcome::Exhausted
        );
    }

    #[test]
    fn test_counter_overflow() {
        let mut parser = TrompParser::new(36, Nonce([0xff; 32]));
        assert_matches!(parser.parse_line("1 solutions"), Err(Error::NonceOverflow));
    }

    #[test]
    fn test_unrecognized_lines() {
        let mut parser = TrompParser::new(36, Nonce::zero());
        for line in [
            "",
            "Digit",
            "Digit1",
            "Digit ",
            "Digit x",
            "solutions",
            "12 apples",
            "Using 4 threads",
        ] {
            assert_matches!(
                parser.parse_line(line),
                Err(Error::ProtocolViolation { .. }),
                "line {:?}",
                line
            );
        }
        assert_matches!(
            parser.parse_line("Solution abcd"),
            Err(Error::ProtocolViolation { .. })
        );
        assert_matches!(parser.parse_line("Solution"), Err(Error::ProtocolViolation { .. }));
    }

    #[test]
    fn test_leading_count() {
        assert_eq!(leading_count("12 solutions"), Some((12, " solutions")));
        assert_eq!(leading_count("x"), None);
        assert_eq!(leading_count(""), None);
    }
}
