//! Pipeline stages and the legal moves between them.

use std::fmt;

/// Where a [`Pipeline`](super::Pipeline) is in its single forward pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Decoding,
    Extracting,
    Encoding,
    Done,
    /// Terminal failure with the error kind and message
    Failed { kind: &'static str, message: String },
}

impl PipelineState {
    /// Short stage name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Decoding => "decoding",
            Self::Extracting => "extracting",
            Self::Encoding => "encoding",
            Self::Done => "done",
            Self::Failed { .. } => "failed",
        }
    }

    /// `Done` and `Failed` only leave through a reset.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }

    /// Whether the pipeline may move from `self` to `next`.
    ///
    /// Stages only advance forward; any active stage may fail; only a
    /// terminal state may return to `Idle`.
    pub fn can_transition_to(&self, next: &PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Idle, Decoding)
            | (Decoding, Extracting)
            | (Extracting, Encoding)
            | (Encoding, Done) => true,
            (Decoding | Extracting | Encoding, Failed { .. }) => true,
            (Done | Failed { .. }, Idle) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { kind, message } => write!(f, "failed ({kind}): {message}"),
            other => f.write_str(other.name()),
        }
    }
}
