use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("invalid command '{0}'")]
    InvalidCommand(String),

    #[error("could not spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}")]
    ExitStatus { command: String, status: ExitStatus },
}

/// Destino de los comandos disparados por el motor
pub trait CommandExecutor {
    fn execute(&mut self, command: &str) -> Result<(), ExecutorError>;
}

/// Ejecuta `<script_dir>/<comando>` sin shell intermedio, descartando su salida
/// y esperando a que termine. No reintenta.
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
    script_dir: PathBuf,
}

impl ScriptExecutor {
    pub fn new(script_dir: impl Into<PathBuf>) -> Self {
        Self {
            script_dir: script_dir.into(),
        }
    }

    pub fn script_dir(&self) -> &Path {
        &self.script_dir
    }

    /// Ruta del script; rechaza nombres que salgan del directorio
    pub fn resolve(&self, command: &str) -> Result<PathBuf, ExecutorError> {
        let invalid = command.is_empty()
            || command == "."
            || command == ".."
            || command.contains('/')
            || command.contains('\\')
            || command.contains('\0');
        if invalid {
            return Err(ExecutorError::InvalidCommand(command.to_string()));
        }
        Ok(self.script_dir.join(command))
    }
}

impl CommandExecutor for ScriptExecutor {
    fn execute(&mut self, command: &str) -> Result<(), ExecutorError> {
        let path = self.resolve(command)?;
        let status = Command::new(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|source| ExecutorError::Spawn {
                command: command.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(ExecutorError::ExitStatus {
                command: command.to_string(),
                status,
            });
        }
        Ok(())
    }
}

/// No ejecuta nada: sólo registra lo que se habría lanzado
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    pub executed: Vec<String>,
}

impl CommandExecutor for DryRunExecutor {
    fn execute(&mut self, command: &str) -> Result<(), ExecutorError> {
        self.executed.push(command.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rejects_path_escapes() {
        let exec = ScriptExecutor::new("/opt/gestures");
        assert_eq!(exec.resolve("media_play").unwrap(), PathBuf::from("/opt/gestures/media_play"));
        for bad in ["", ".", "..", "../rm", "a/b", "a\\b"] {
            assert!(matches!(exec.resolve(bad), Err(ExecutorError::InvalidCommand(_))), "{bad}");
        }
    }

    #[test]
    fn test_missing_script_reports_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut exec = ScriptExecutor::new(dir.path());
        let err = exec.execute("does_not_exist").unwrap_err();
        assert!(matches!(err, ExecutorError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_is_reported() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        for (name, code) in [("ok", 0), ("fails", 3)] {
            let path = dir.path().join(name);
            fs::write(&path, format!("#!/bin/sh\nexit {}\n", code)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let mut exec = ScriptExecutor::new(dir.path());
        assert!(exec.execute("ok").is_ok());
        assert!(matches!(
            exec.execute("fails"),
            Err(ExecutorError::ExitStatus { .. })
        ));
    }

    #[test]
    fn test_dry_run_records() {
        let mut exec = DryRunExecutor::default();
        exec.execute("media_play").unwrap();
        assert_eq!(exec.executed, vec!["media_play"]);
    }
}
