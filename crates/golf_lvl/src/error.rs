use golf_utils::EnumParseError;
use std::io;
use thiserror::Error;

/// Reasons why a level file can't be parsed or written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("bad magic: expected `GLVL`, found `{0}`")]
    BadMagic(String),
    #[error("unsupported level format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("unexpected end of data")]
    Truncated,
    #[error("invalid {type_name} tag {value}")]
    InvalidTag { type_name: &'static str, value: u64 },
    #[error("inconsistent length: {0}")]
    InconsistentLength(String),
    #[error("missing node `{0}`")]
    MissingNode(&'static str),
    #[error("invalid string: {0}")]
    BadString(String),
    #[error("{what} name `{name}` is longer than {max} bytes")]
    NameTooLong {
        what: &'static str,
        name: String,
        max: usize,
    },
    #[error("malformed level: {0}")]
    Malformed(String),
}

impl FormatError {
    /// Recovers a typed error out of an error returned by the node readers.
    ///
    /// The first recognizable error in the chain wins. Anything unrecognized is turned into
    /// [`FormatError::Malformed`] with the full context chain as its message.
    pub fn from_any(error: anyhow::Error) -> Self {
        for cause in error.chain() {
            if let Some(format) = cause.downcast_ref::<FormatError>() {
                return format.clone();
            }
            if let Some(tag) = cause.downcast_ref::<EnumParseError>() {
                return Self::InvalidTag {
                    type_name: tag.type_name,
                    value: tag.value,
                };
            }
            if let Some(io) = cause.downcast_ref::<io::Error>() {
                if io.kind() == io::ErrorKind::UnexpectedEof {
                    return Self::Truncated;
                }
            }
        }

        Self::Malformed(format!("{error:#}"))
    }
}

/// Errors returned by level loading and saving.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn typed_errors_survive_context() {
        let error = anyhow::Error::from(FormatError::MissingNode("HEAD"))
            .context("couldn't read entity");
        assert_eq!(FormatError::from_any(error), FormatError::MissingNode("HEAD"));

        let tag = EnumParseError {
            type_name: "EntityTag",
            value: 9,
        };
        assert_eq!(
            FormatError::from_any(tag.into()),
            FormatError::InvalidTag {
                type_name: "EntityTag",
                value: 9
            }
        );
    }

    #[test]
    fn eof_is_truncation() {
        let result: Result<(), io::Error> = Err(io::ErrorKind::UnexpectedEof.into());
        let error = result.context("reading node header").unwrap_err();
        assert_eq!(FormatError::from_any(error), FormatError::Truncated);
    }

    #[test]
    fn unknown_errors_are_malformed() {
        let error = anyhow::anyhow!("something odd");
        assert!(matches!(
            FormatError::from_any(error),
            FormatError::Malformed(message) if message == "something odd"
        ));
    }
}
