use crate::domain::money::Amount;
use crate::domain::order::PackageType;
use crate::error::{EngineError, Result};
use serde::Deserialize;
use std::io::BufRead;

/// One line of a replay script.
///
/// Orders and withdrawals are referred to by an `alias` chosen in the script,
/// because their real ids are generated by the engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    CreateOrder {
        alias: String,
        client: String,
        freelancer: String,
        service: String,
        package: PackageType,
        price: Amount,
        #[serde(default)]
        revisions_allowed: u32,
        #[serde(default)]
        requirements: String,
    },
    AttachFile {
        order: String,
        caller: String,
        file: String,
    },
    Accept {
        order: String,
        caller: String,
    },
    SubmitWork {
        order: String,
        caller: String,
    },
    RequestRevision {
        order: String,
        caller: String,
        message: String,
    },
    Approve {
        order: String,
        caller: String,
    },
    Cancel {
        order: String,
        caller: String,
        #[serde(default)]
        reason: Option<String>,
    },
    LinkReview {
        order: String,
        caller: String,
        review: String,
    },
    RequestWithdrawal {
        alias: String,
        freelancer: String,
        amount: Amount,
        bank_name: String,
        account_number: String,
        account_holder: String,
    },
    CancelWithdrawal {
        withdrawal: String,
        caller: String,
    },
    BeginProcessing {
        withdrawal: String,
    },
    CompleteWithdrawal {
        withdrawal: String,
    },
    RejectWithdrawal {
        withdrawal: String,
        reason: String,
    },
    /// Moves the simulated clock forward.
    Advance {
        secs: u64,
    },
    /// Runs one settlement sweep at the current simulated time.
    Sweep,
}

/// Reads commands from a JSON-lines source. Blank lines and lines starting
/// with `#` are skipped.
pub struct CommandReader<R: BufRead> {
    source: R,
}

impl<R: BufRead> CommandReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    /// Returns an iterator that lazily reads and parses commands, tagging
    /// parse failures with their line number.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.source
            .lines()
            .enumerate()
            .filter_map(|(index, line)| {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => return Some(Err(EngineError::from(e))),
                };
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    return None;
                }
                Some(serde_json::from_str(trimmed).map_err(|e| {
                    EngineError::ValidationError(format!("line {}: {e}", index + 1))
                }))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = r#"
# a comment
{"op":"create_order","alias":"o1","client":"c1","freelancer":"f1","service":"s1","package":"basic","price":"500000","revisions_allowed":2}
{"op":"advance","secs":60}
{"op":"sweep"}
"#;
        let reader = CommandReader::new(data.as_bytes());
        let results: Vec<Result<Command>> = reader.commands().collect();

        assert_eq!(results.len(), 3);
        match results[0].as_ref().unwrap() {
            Command::CreateOrder { alias, price, requirements, .. } => {
                assert_eq!(alias, "o1");
                assert_eq!(price.value(), dec!(500000));
                assert!(requirements.is_empty());
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(results[2].as_ref().unwrap(), &Command::Sweep);
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "{\"op\":\"accept\",\"order\":\"o1\",\"caller\":\"f1\"}\n{\"op\":\"teleport\"}\n";
        let results: Vec<Result<Command>> = CommandReader::new(data.as_bytes()).commands().collect();

        assert!(results[0].is_ok());
        match &results[1] {
            Err(EngineError::ValidationError(msg)) => assert!(msg.starts_with("line 2")),
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_reader_rejects_non_positive_amount() {
        let data = r#"{"op":"request_withdrawal","alias":"w","freelancer":"f","amount":"0","bank_name":"b","account_number":"1","account_holder":"h"}"#;
        let results: Vec<Result<Command>> = CommandReader::new(data.as_bytes()).commands().collect();
        assert!(results[0].is_err());
    }
}
