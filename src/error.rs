use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failures raised while normalizing case rows. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no space, tab or comma delimiter found")]
    NoDelimiterFound,
    #[error("patient {number} conflicts with an earlier observation: {existing} vs {incoming}")]
    PatientConflict {
        number: i64,
        existing: String,
        incoming: String,
    },
    #[error("malformed {field} '{value}': {reason}")]
    MalformedField {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("{stage} failed at line {line}")]
    AtLine {
        stage: &'static str,
        line: usize,
        #[source]
        source: Box<PipelineError>,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    pub fn malformed(field: &'static str, value: &str, reason: impl Into<String>) -> Self {
        PipelineError::MalformedField {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Tags the error with the 1-based input line that produced it.
    pub fn at_line(self, stage: &'static str, line: usize) -> Self {
        PipelineError::AtLine {
            stage,
            line,
            source: Box::new(self),
        }
    }

    /// The underlying error, past any line tagging.
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::AtLine { source, .. } => source.root(),
            other => other,
        }
    }

    /// Offending input line, when the failure came from a row.
    pub fn line(&self) -> Option<usize> {
        match self {
            PipelineError::AtLine { line, .. } => Some(*line),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.root() {
            PipelineError::NoDelimiterFound => "NoDelimiterFound",
            PipelineError::PatientConflict { .. } => "PatientConflict",
            PipelineError::MalformedField { .. } => "MalformedField",
            PipelineError::Io(_) => "Io",
            PipelineError::Csv(_) => "Csv",
            PipelineError::AtLine { .. } => "AtLine",
        }
    }
}
