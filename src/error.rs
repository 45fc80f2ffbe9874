//! Error handling for staged-pipeline
//!
//! Stages never pass errors to each other: a failing per-value operation is a
//! programming error, and data-level failures travel as ordinary values. The
//! variants here cover the lifecycle API, queue disconnection and the
//! configuration layer.

use thiserror::Error;

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// `start()` called on a stage whose `run` was already scheduled
    #[error("Stage '{0}' has already been started")]
    AlreadyStarted(String),

    /// `wait()` called on a stage that was never started
    #[error("Stage '{0}' was never started")]
    NotStarted(String),

    /// The stage's `run` panicked before returning
    #[error("Stage '{name}' panicked: {message}")]
    StagePanicked { name: String, message: String },

    /// The OS refused to spawn the stage thread
    #[error("Failed to spawn thread for stage '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The output reader of a stage was already handed out
    #[error("Output of stage '{0}' has already been taken")]
    OutputTaken(String),

    /// A many-to-one stage was wired with no input queues
    #[error("Many-to-one stage '{0}' needs at least one input queue")]
    NoInputs(String),

    /// Every reader handle of the queue has been dropped
    #[error("Queue '{0}' has no remaining readers")]
    Disconnected(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Name of the stage this error refers to, if any
    pub fn stage_name(&self) -> Option<&str> {
        match self {
            PipelineError::AlreadyStarted(name)
            | PipelineError::NotStarted(name)
            | PipelineError::OutputTaken(name)
            | PipelineError::NoInputs(name) => Some(name),
            PipelineError::StagePanicked { name, .. } | PipelineError::Spawn { name, .. } => {
                Some(name)
            }
            PipelineError::WithContext { source, .. } => source.stage_name(),
            _ => None,
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
