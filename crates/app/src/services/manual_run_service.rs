//! Manual run console — start any script right now, one at a time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use scripthub_domain::error::{ConflictError, ScriptHubError, ValidationError};

use crate::ports::ScriptCatalog;
use crate::script_runner::ScriptRunner;

/// Owns the single ad hoc script execution.
pub struct ManualRunService<SC> {
    scripts: SC,
    current: Mutex<Option<Arc<ScriptRunner>>>,
}

impl<SC> ManualRunService<SC>
where
    SC: ScriptCatalog + Send + Sync,
{
    pub fn new(scripts: SC) -> Self {
        Self {
            scripts,
            current: Mutex::new(None),
        }
    }

    /// The latest manual run, finished or not.
    #[must_use]
    pub fn current(&self) -> Option<Arc<ScriptRunner>> {
        self.slot().clone()
    }

    /// Start `script` unless another manual run is still alive.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownScript`] for a script that is not in
    /// the catalog and [`ConflictError::AlreadyRunning`] while the previous
    /// manual run is alive.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, script: &str) -> Result<Arc<ScriptRunner>, ScriptHubError> {
        if !self.scripts.contains(script).await? {
            return Err(ValidationError::UnknownScript(script.to_string()).into());
        }
        let command = self.scripts.command(script)?;

        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|runner| runner.is_alive()) {
            return Err(ConflictError::AlreadyRunning.into());
        }
        let runner = ScriptRunner::spawn(script, command);
        *slot = Some(Arc::clone(&runner));
        tracing::info!("manual run started");
        Ok(runner)
    }

    /// Abort the current manual run.
    ///
    /// Returns whether the script is gone after the bounded wait.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError::NotRunning`] when nothing is running.
    #[tracing::instrument(skip(self))]
    pub async fn abort(&self) -> Result<bool, ScriptHubError> {
        let Some(runner) = self.current() else {
            return Err(ConflictError::NotRunning.into());
        };
        runner.abort().await
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<ScriptRunner>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::future::Future;
    use std::time::Duration;

    use crate::ports::ScriptCommand;

    struct ShellScripts;

    impl ScriptCatalog for ShellScripts {
        fn list(&self) -> impl Future<Output = Result<Vec<String>, ScriptHubError>> + Send {
            async { Ok(vec!["hello.sh".to_string(), "slow.sh".to_string()]) }
        }

        fn contains(
            &self,
            name: &str,
        ) -> impl Future<Output = Result<bool, ScriptHubError>> + Send {
            let found = matches!(name, "hello.sh" | "slow.sh");
            async move { Ok(found) }
        }

        fn install(
            &self,
            _name: &str,
            _content: Vec<u8>,
        ) -> impl Future<Output = Result<(), ScriptHubError>> + Send {
            async { Ok(()) }
        }

        fn remove(&self, _name: &str) -> impl Future<Output = Result<(), ScriptHubError>> + Send {
            async { Ok(()) }
        }

        fn command(&self, name: &str) -> Result<ScriptCommand, ScriptHubError> {
            let body = if name == "slow.sh" {
                "exec sleep 30"
            } else {
                "echo hello"
            };
            Ok(ScriptCommand::new("sh").arg("-c").arg(body))
        }
    }

    #[tokio::test]
    async fn should_have_no_current_run_initially() {
        let service = ManualRunService::new(ShellScripts);
        assert!(service.current().is_none());
    }

    #[tokio::test]
    async fn should_run_script_and_expose_it_as_current() {
        let service = ManualRunService::new(ShellScripts);
        let runner = service.run("hello.sh").await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while runner.is_alive() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        let current = service.current().unwrap();
        assert!(Arc::ptr_eq(&current, &runner));
        assert_eq!(current.output(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn should_reject_unknown_script() {
        let service = ManualRunService::new(ShellScripts);
        let err = service.run("nope.sh").await.unwrap_err();
        assert!(matches!(
            err,
            ScriptHubError::Validation(ValidationError::UnknownScript(_))
        ));
    }

    #[tokio::test]
    async fn should_reject_second_run_while_first_is_alive() {
        let service = ManualRunService::new(ShellScripts);
        service.run("slow.sh").await.unwrap();

        let err = service.run("hello.sh").await.unwrap_err();
        assert!(matches!(
            err,
            ScriptHubError::Conflict(ConflictError::AlreadyRunning)
        ));

        assert!(service.abort().await.unwrap());
    }

    #[tokio::test]
    async fn should_reject_abort_when_nothing_ever_ran() {
        let service = ManualRunService::new(ShellScripts);
        let err = service.abort().await.unwrap_err();
        assert!(matches!(
            err,
            ScriptHubError::Conflict(ConflictError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn should_allow_new_run_after_abort() {
        let service = ManualRunService::new(ShellScripts);
        service.run("slow.sh").await.unwrap();
        assert!(service.abort().await.unwrap());

        assert!(service.run("hello.sh").await.is_ok());
    }
}
