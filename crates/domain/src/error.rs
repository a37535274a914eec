//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`ScriptHubError`] via `#[from]` or an explicit `From` impl.

/// Top-level error shared by every crate of the workspace.
#[derive(Debug, thiserror::Error)]
pub enum ScriptHubError {
    /// Bad input from the caller.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The referenced thing does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The operation does not fit the current runtime state.
    #[error("conflict")]
    Conflict(#[from] ConflictError),

    /// Persistence or other infrastructure failure.
    #[error("storage error")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}

/// Invariant violations and rejected user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("You have to provide a name.")]
    EmptyName,

    #[error("You have to select a script.")]
    EmptyScript,

    #[error("The script \"{0}\" does not exist.")]
    UnknownScript(String),

    #[error("Invalid script name \"{0}\".")]
    InvalidScriptName(String),

    #[error("The uploaded file is too large.")]
    ScriptTooLarge,

    #[error("Invalid condition type \"{0}\" given.")]
    UnknownConditionType(String),

    #[error("Invalid event type \"{0}\" given.")]
    UnknownEventKind(String),

    #[error("Malformed \"{type_name}\" condition: {reason}")]
    MalformedCondition {
        type_name: &'static str,
        reason: String,
    },

    #[error("Unable to find the given device.")]
    UnknownDevice,

    #[error("Unable to find the given channel.")]
    UnknownChannel,

    #[error("Unable to find the given parameter.")]
    UnknownParameter,
}

/// A lookup by identifier found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} does not exist")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Runtime state prevents the requested operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictError {
    #[error("There is no script running to abort.")]
    NotRunning,

    #[error(
        "There is another script running. Wait for it to complete or stop it to be able to execute another script."
    )]
    AlreadyRunning,
}
