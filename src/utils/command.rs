/// Command execution helpers shared by the kind, docker and kubectl wrappers
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// Result from command execution with captured output
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    status: String,
}

impl CommandOutput {
    fn from_output(output: std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            status: output.status.to_string(),
        }
    }
}

/// Builder for executing external commands with common patterns
pub struct CommandBuilder {
    command: Command,
    program: String,
    args: Vec<String>,
    stdin: Option<String>,
}

impl CommandBuilder {
    /// Create a new command builder
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        let mut command = Command::new(program.as_ref());
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        Self {
            command,
            program: program.as_ref().to_string_lossy().into_owned(),
            args: Vec::new(),
            stdin: None,
        }
    }

    /// Add a single argument
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self.command.arg(arg);
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Set an environment variable
    pub fn env<K, V>(mut self, key: K, val: V) -> Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.command.env(key, val);
        self
    }

    /// Set KUBECONFIG environment variable
    pub fn kubeconfig(self, path: &Path) -> Self {
        self.env("KUBECONFIG", path)
    }

    /// Feed the given text to the process on stdin
    pub fn stdin<S: Into<String>>(mut self, input: S) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Execute and return raw output
    pub async fn output(mut self) -> Result<CommandOutput> {
        debug!("Running: {} {}", self.program, self.args.join(" "));

        let spawn_err = |source| Error::ToolSpawn {
            program: self.program.clone(),
            source,
        };

        let output = match self.stdin.take() {
            Some(input) => {
                self.command.stdin(Stdio::piped());
                let mut child = self.command.spawn().map_err(spawn_err)?;
                if let Some(mut pipe) = child.stdin.take() {
                    pipe.write_all(input.as_bytes()).await.map_err(spawn_err)?;
                }
                child.wait_with_output().await.map_err(spawn_err)?
            }
            None => self.command.output().await.map_err(spawn_err)?,
        };

        Ok(CommandOutput::from_output(output))
    }

    /// Execute and return stdout on success, error on failure
    pub async fn run(self) -> Result<String> {
        let program = self.program.clone();
        let args = self.args.clone();
        let output = self.output().await?;

        if output.success {
            Ok(output.stdout)
        } else {
            Err(Error::ToolInvocation {
                program,
                args,
                status: output.status,
                stderr: output.stderr,
            })
        }
    }

    /// Execute and ignore output (just check success)
    pub async fn run_silent(self) -> Result<()> {
        self.run().await.map(|_| ())
    }
}
