//! Error types raised while trimming a calendar file.

/// Errors raised by the trimming core.
///
/// Every variant is fatal for the file being processed. The batch layer
/// decides whether that aborts anything beyond the current file.
#[derive(Debug, thiserror::Error)]
pub enum TrimError {
    #[error("Malformed timestamp '{value}': {reason}")]
    MalformedTimestamp { value: String, reason: String },
    #[error("Unrecognized time zone '{0}'")]
    UnrecognizedTimeZone(String),
    #[error("Unhandled complex date: {0}")]
    UnsupportedDateEncoding(String),
    #[error("Event starting at line {line} has no END:VEVENT")]
    UnterminatedEvent { line: usize },
    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<TrimError>,
    },
}

impl TrimError {
    pub(crate) fn malformed(value: &str, reason: impl ToString) -> Self {
        TrimError::MalformedTimestamp {
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            TrimError::AtLine { .. } | TrimError::UnterminatedEvent { .. } => self,
            other => TrimError::AtLine {
                line,
                source: Box::new(other),
            },
        }
    }

    /// The underlying error, without any line-number wrapping.
    pub fn kind(&self) -> &TrimError {
        match self {
            TrimError::AtLine { source, .. } => source.kind(),
            other => other,
        }
    }
}
