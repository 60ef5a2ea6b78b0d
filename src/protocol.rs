//! Command grammar and response rendering for TxVault
//!
//! Commands are single lines of whitespace-separated tokens, parsed with
//! nom combinators. Command names are case-insensitive.

use crate::error::{Result, TxVaultError};
use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while, take_while1},
    combinator::{all_consuming, map, value},
    sequence::{delimited, preceded, tuple},
    IResult,
};

/// Commands understood by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set { key: String, value: String },
    Get { key: String },
    Unset { key: String },
    NumEqualTo { value: String },
    Begin,
    Commit,
    Rollback,
    End,
}

impl Command {
    /// Command name and the number of arguments it takes
    const ARITY: [(&'static str, usize); 8] = [
        ("SET", 2),
        ("GET", 1),
        ("UNSET", 1),
        ("NUMEQUALTO", 1),
        ("BEGIN", 0),
        ("COMMIT", 0),
        ("ROLLBACK", 0),
        ("END", 0),
    ];
}

/// Output produced by a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Value(String),
    Null,
    Count(usize),
    NoTransaction,
    Error(String),
}

impl Response {
    /// Render the response as a single output line
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Response::Value(v) => format!("{}\n", v).into_bytes(),
            Response::Null => b"NULL\n".to_vec(),
            Response::Count(n) => format!("{}\n", n).into_bytes(),
            Response::NoTransaction => b"NO TRANSACTION\n".to_vec(),
            Response::Error(e) => format!("ERROR {}\n", e).into_bytes(),
        }
    }
}

/// Parse one command line
pub fn parse_command(input: &str) -> Result<Command> {
    match command_parser(input) {
        Ok((_, command)) => Ok(command),
        Err(_) => Err(describe_failure(input)),
    }
}

/// Work out why a line failed to parse
fn describe_failure(input: &str) -> TxVaultError {
    let mut tokens = input.split_whitespace();
    let name = match tokens.next() {
        Some(name) => name,
        None => return TxVaultError::Protocol("empty command".to_string()),
    };

    let given = tokens.count();
    match Command::ARITY
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
    {
        Some((known, expected)) => TxVaultError::Protocol(format!(
            "{} takes {} argument(s), got {}",
            known, expected, given
        )),
        None => TxVaultError::Protocol(format!("unknown command '{}'", name)),
    }
}

/// Whole-line parser; trailing tokens are an error
fn command_parser(input: &str) -> IResult<&str, Command> {
    all_consuming(delimited(
        padding,
        alt((
            set_command,
            get_command,
            unset_command,
            num_equal_to_command,
            bare_command,
        )),
        padding,
    ))(input)
}

/// One or more whitespace characters between tokens
fn separator(input: &str) -> IResult<&str, &str> {
    take_while1(char::is_whitespace)(input)
}

fn padding(input: &str) -> IResult<&str, &str> {
    take_while(char::is_whitespace)(input)
}

fn token(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace())(input)
}

/// Parse SET command: SET <key> <value>
fn set_command(input: &str) -> IResult<&str, Command> {
    map(
        tuple((tag_no_case("SET"), separator, token, separator, token)),
        |(_, _, key, _, value)| Command::Set {
            key: key.to_string(),
            value: value.to_string(),
        },
    )(input)
}

/// Parse GET command: GET <key>
fn get_command(input: &str) -> IResult<&str, Command> {
    map(preceded(tuple((tag_no_case("GET"), separator)), token), |key| {
        Command::Get {
            key: key.to_string(),
        }
    })(input)
}

/// Parse UNSET command: UNSET <key>
fn unset_command(input: &str) -> IResult<&str, Command> {
    map(preceded(tuple((tag_no_case("UNSET"), separator)), token), |key| {
        Command::Unset {
            key: key.to_string(),
        }
    })(input)
}

/// Parse NUMEQUALTO command: NUMEQUALTO <value>
fn num_equal_to_command(input: &str) -> IResult<&str, Command> {
    map(
        preceded(tuple((tag_no_case("NUMEQUALTO"), separator)), token),
        |value| Command::NumEqualTo {
            value: value.to_string(),
        },
    )(input)
}

/// Commands without arguments
fn bare_command(input: &str) -> IResult<&str, Command> {
    alt((
        value(Command::Begin, tag_no_case("BEGIN")),
        value(Command::Commit, tag_no_case("COMMIT")),
        value(Command::Rollback, tag_no_case("ROLLBACK")),
        value(Command::End, tag_no_case("END")),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_command() {
        let result = parse_command("SET mykey myvalue\r\n").unwrap();
        assert_eq!(
            result,
            Command::Set {
                key: "mykey".to_string(),
                value: "myvalue".to_string()
            }
        );
    }

    #[test]
    fn test_parse_key_commands() {
        assert_eq!(
            parse_command("GET a").unwrap(),
            Command::Get {
                key: "a".to_string()
            }
        );
        assert_eq!(
            parse_command("  UNSET\ta  ").unwrap(),
            Command::Unset {
                key: "a".to_string()
            }
        );
        assert_eq!(
            parse_command("NUMEQUALTO 10\n").unwrap(),
            Command::NumEqualTo {
                value: "10".to_string()
            }
        );
    }

    #[test]
    fn test_parse_bare_commands() {
        assert_eq!(parse_command("BEGIN").unwrap(), Command::Begin);
        assert_eq!(parse_command("COMMIT").unwrap(), Command::Commit);
        assert_eq!(parse_command("ROLLBACK").unwrap(), Command::Rollback);
        assert_eq!(parse_command("END\n").unwrap(), Command::End);
    }

    #[test]
    fn test_command_names_ignore_case() {
        assert_eq!(parse_command("begin").unwrap(), Command::Begin);
        assert_eq!(
            parse_command("Set Key Value").unwrap(),
            Command::Set {
                key: "Key".to_string(),
                value: "Value".to_string()
            }
        );
    }

    #[test]
    fn test_any_unicode_whitespace_separates_tokens() {
        assert_eq!(
            parse_command("SET a\x0cb").unwrap(),
            Command::Set {
                key: "a".to_string(),
                value: "b".to_string()
            }
        );
        assert_eq!(
            parse_command("GET\x0ba").unwrap(),
            Command::Get {
                key: "a".to_string()
            }
        );
        assert_eq!(
            parse_command("\u{a0}SET a\u{a0}b\u{3000}").unwrap(),
            Command::Set {
                key: "a".to_string(),
                value: "b".to_string()
            }
        );
        // Diagnostics count tokens the same way the grammar splits them
        match parse_command("SET a\x0cb\x0cc") {
            Err(TxVaultError::Protocol(msg)) => {
                assert_eq!(msg, "SET takes 2 argument(s), got 3")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_wrong_arity_is_rejected() {
        for line in ["SET a", "SET a b c", "GET", "BEGIN now", "numequalto"] {
            match parse_command(line) {
                Err(TxVaultError::Protocol(msg)) => assert!(msg.contains("argument"), "{}", msg),
                other => panic!("expected arity error for {:?}, got {:?}", line, other),
            }
        }
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        match parse_command("DELETE a") {
            Err(TxVaultError::Protocol(msg)) => assert_eq!(msg, "unknown command 'DELETE'"),
            other => panic!("unexpected {:?}", other),
        }
        // A known prefix glued to more text is not that command
        assert!(parse_command("BEGINNING").is_err());
        assert!(parse_command("").is_err());
    }

    #[test]
    fn test_response_serialization() {
        assert_eq!(Response::Value("10".to_string()).to_bytes(), b"10\n");
        assert_eq!(Response::Null.to_bytes(), b"NULL\n");
        assert_eq!(Response::Count(2).to_bytes(), b"2\n");
        assert_eq!(Response::NoTransaction.to_bytes(), b"NO TRANSACTION\n");
        assert_eq!(
            Response::Error("bad".to_string()).to_bytes(),
            b"ERROR bad\n"
        );
    }
}
