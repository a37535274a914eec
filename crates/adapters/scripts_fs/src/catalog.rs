//! [`ScriptCatalog`] over a script directory.
//!
//! Script names are plain file names inside the directory: no path
//! separators and no leading dot. Hidden files and subdirectories are never
//! listed.
//!
//! Scripts run with `/` as working directory, so the directory is made
//! absolute when the catalog is created.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use scripthub_app::ports::{ScriptCatalog, ScriptCommand};
use scripthub_domain::error::{NotFoundError, ScriptHubError, ValidationError};

use crate::error::ScriptCatalogError;

/// Interpreter command line used when none is configured.
pub const DEFAULT_INTERPRETER: [&str; 3] = ["/usr/bin/env", "python3", "-u"];

/// Largest script accepted by [`FsScriptCatalog::install`].
pub const MAX_SCRIPT_SIZE: usize = 1024 * 1024;

/// Script catalog reading and writing one directory.
#[derive(Debug, Clone)]
pub struct FsScriptCatalog {
    dir: PathBuf,
    interpreter: Vec<String>,
}

impl FsScriptCatalog {
    /// Catalog over `dir`, launching scripts with [`DEFAULT_INTERPRETER`].
    ///
    /// A relative `dir` is resolved against the current working directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let dir = std::path::absolute(&dir).unwrap_or_else(|err| {
            tracing::warn!(
                dir = %dir.display(),
                error = %err,
                "unable to make script directory absolute"
            );
            dir
        });
        Self {
            dir,
            interpreter: DEFAULT_INTERPRETER.map(String::from).to_vec(),
        }
    }

    /// Replace the interpreter command line. An empty one executes the
    /// script file directly.
    #[must_use]
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, name: &str) -> Result<PathBuf, ValidationError> {
        validate_name(name)?;
        Ok(self.dir.join(name))
    }

    fn io_error(&self, source: std::io::Error) -> ScriptCatalogError {
        ScriptCatalogError::Io {
            path: self.dir.clone(),
            source,
        }
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(ValidationError::InvalidScriptName(name.to_string()));
    }
    Ok(())
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|metadata| metadata.is_file())
}

impl ScriptCatalog for FsScriptCatalog {
    async fn list(&self) -> Result<Vec<String>, ScriptHubError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(dir = %self.dir.display(), "script directory does not exist yet");
                return Ok(Vec::new());
            }
            Err(err) => return Err(self.io_error(err).into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| self.io_error(err))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.starts_with('.') && is_file(&entry.path()).await {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn contains(&self, name: &str) -> Result<bool, ScriptHubError> {
        match self.path_of(name) {
            Ok(path) => Ok(is_file(&path).await),
            Err(_) => Ok(false),
        }
    }

    #[tracing::instrument(skip(self, content), fields(size = content.len()))]
    async fn install(&self, name: &str, content: Vec<u8>) -> Result<(), ScriptHubError> {
        let path = self.path_of(name)?;
        if content.len() > MAX_SCRIPT_SIZE {
            return Err(ValidationError::ScriptTooLarge.into());
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| self.io_error(err))?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|err| self.io_error(err))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .await
                .map_err(|err| self.io_error(err))?;
        }

        tracing::info!("script installed");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn remove(&self, name: &str) -> Result<(), ScriptHubError> {
        let path = self.path_of(name)?;
        if !is_file(&path).await {
            return Err(NotFoundError {
                entity: "Script",
                id: name.to_string(),
            }
            .into());
        }
        tokio::fs::remove_file(&path)
            .await
            .map_err(|err| self.io_error(err))?;
        tracing::info!("script removed");
        Ok(())
    }

    fn command(&self, name: &str) -> Result<ScriptCommand, ScriptHubError> {
        let path = self.path_of(name)?.to_string_lossy().into_owned();
        let command = match self.interpreter.split_first() {
            Some((program, args)) => args
                .iter()
                .fold(ScriptCommand::new(program.as_str()), |cmd, arg| {
                    cmd.arg(arg.as_str())
                })
                .arg(path),
            None => ScriptCommand::new(path),
        };
        Ok(command.cwd("/"))
    }
}
