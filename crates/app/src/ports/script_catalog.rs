//! Script catalog port — which scripts exist and how to launch them.

use std::future::Future;
use std::path::PathBuf;

use scripthub_domain::error::ScriptHubError;

/// Everything needed to start one script as a child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl ScriptCommand {
    /// A command with no arguments, running in `/`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: PathBuf::from("/"),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }
}

/// The set of scripts an operator can schedule or run.
pub trait ScriptCatalog {
    /// Names of every available script, sorted.
    fn list(&self) -> impl Future<Output = Result<Vec<String>, ScriptHubError>> + Send;

    fn contains(&self, name: &str) -> impl Future<Output = Result<bool, ScriptHubError>> + Send;

    /// Add or replace a script.
    fn install(
        &self,
        name: &str,
        content: Vec<u8>,
    ) -> impl Future<Output = Result<(), ScriptHubError>> + Send;

    /// Delete a script. Fails with `NotFound` when it does not exist.
    fn remove(&self, name: &str) -> impl Future<Output = Result<(), ScriptHubError>> + Send;

    /// Build the command that launches `name`.
    ///
    /// # Errors
    ///
    /// Returns a validation error when `name` is not a valid script name.
    fn command(&self, name: &str) -> Result<ScriptCommand, ScriptHubError>;
}
