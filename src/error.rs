use std::fmt::{Display, Formatter};
use std::num::ParseIntError;

/// Errors raised while reading a problem or a schedule file. Line numbers
/// are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    MissingLine(&'static str),
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    InvalidNumber {
        line: usize,
        source: ParseIntError,
    },
    ZeroTravelTime {
        line: usize,
        street: String,
    },
    IntersectionOutOfBounds {
        line: usize,
        intersection: u32,
    },
    DuplicateStreet {
        line: usize,
        street: String,
    },
    UnknownStreet {
        line: usize,
        street: String,
    },
    EmptyPath {
        line: usize,
    },
    DisconnectedPath {
        line: usize,
        from: String,
        to: String,
    },
    UnexpectedLine {
        line: usize,
    },
    InvalidSchedule(String),
}

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            FormatError::MissingLine(what) => write!(f, "Missing {}", what),
            FormatError::FieldCount {
                line,
                expected,
                found,
            } => write!(
                f,
                "Line {}: expected {} fields, found {}",
                line, expected, found
            ),
            FormatError::InvalidNumber { line, source } => {
                write!(f, "Line {}: Invalid number: {}", line, source)
            }
            FormatError::ZeroTravelTime { line, street } => write!(
                f,
                "Line {}: street {} has zero travel time",
                line, street
            ),
            FormatError::IntersectionOutOfBounds { line, intersection } => {
                write!(
                    f,
                    "Line {}: intersection ID {} is out of bounds",
                    line, intersection
                )
            }
            FormatError::DuplicateStreet { line, street } => write!(
                f,
                "Line {}: street {} appears multiple times",
                line, street
            ),
            FormatError::UnknownStreet { line, street } => {
                write!(f, "Line {}: Unknown street: {}", line, street)
            }
            FormatError::EmptyPath { line } => {
                write!(f, "Line {}: car path has no streets", line)
            }
            FormatError::DisconnectedPath { line, from, to } => write!(
                f,
                "Line {}: street {} does not lead to street {}",
                line, from, to
            ),
            FormatError::UnexpectedLine { line } => {
                write!(f, "Line {}: unexpected content after last car", line)
            }
            FormatError::InvalidSchedule(reason) => {
                write!(f, "Invalid schedule: {}", reason)
            }
        }
    }
}

impl std::error::Error for FormatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FormatError::InvalidNumber { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub(crate) fn parse_number<T>(
    field: &str,
    line: usize,
) -> Result<T, FormatError>
where
    T: std::str::FromStr<Err = ParseIntError>,
{
    field
        .parse()
        .map_err(|source| FormatError::InvalidNumber { line, source })
}
