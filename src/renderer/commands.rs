use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, ReelError};

/// Abstract renderer command representation
#[derive(Debug, Clone, PartialEq)]
pub struct RendererCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl RendererCommand {
    /// Create a new renderer command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add a path argument
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add a `--name value` option
    pub fn option<S: Into<String>>(self, name: &str, value: S) -> Self {
        self.arg(format!("--{}", name)).arg(value)
    }

    /// Add a `--name <path>` option
    pub fn path_option<P: AsRef<Path>>(self, name: &str, path: P) -> Self {
        self.arg(format!("--{}", name)).path(path)
    }

    /// Add a bare `--name` flag
    pub fn flag(self, name: &str) -> Self {
        self.arg(format!("--{}", name))
    }

    /// Run the command and return its stdout.
    ///
    /// Launch failures and non-zero exits are reported through `to_error`.
    pub async fn execute<F>(&self, to_error: F) -> Result<String>
    where
        F: Fn(String) -> ReelError,
    {
        debug!("Executing renderer command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| to_error(format!("Failed to execute {}: {}", self.binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(to_error(format!(
                "{} failed ({}): {}",
                self.description,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Builder for commands that go through a package launcher (e.g., `npx remotion`)
#[derive(Debug, Clone)]
pub struct RendererCommandBuilder {
    binary_path: String,
    package: String,
}

impl RendererCommandBuilder {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, package: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            package: package.into(),
        }
    }

    /// Start a `<launcher> <package> <subcommand>` command
    pub fn subcommand<S: Into<String>>(&self, subcommand: &str, description: S) -> RendererCommand {
        let command = RendererCommand::new(&self.binary_path, description);
        let command = if self.package.is_empty() {
            command
        } else {
            command.arg(&self.package)
        };
        command.arg(subcommand)
    }

    /// Build version check command
    pub fn version_check(&self) -> RendererCommand {
        self.subcommand("versions", "Version check")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_arguments() {
        let cmd = RendererCommandBuilder::new("npx", "remotion")
            .subcommand("render", "Render")
            .path("/tmp/bundle")
            .option("codec", "h264")
            .path_option("public-dir", "/tmp/public")
            .flag("quiet");

        assert_eq!(cmd.binary_path, "npx");
        assert_eq!(
            cmd.args,
            vec!["remotion", "render", "/tmp/bundle", "--codec", "h264", "--public-dir", "/tmp/public", "--quiet"]
        );
    }

    #[test]
    fn test_builder_without_package() {
        let cmd = RendererCommandBuilder::new("remotion", "").version_check();
        assert_eq!(cmd.args, vec!["versions"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_captures_stdout() {
        let out = RendererCommand::new("sh", "Echo")
            .args(["-c", "echo Main Intro"])
            .execute(ReelError::Render)
            .await
            .unwrap();
        assert_eq!(out.trim(), "Main Intro");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_maps_failure() {
        let err = RendererCommand::new("sh", "Failing step")
            .args(["-c", "echo boom >&2; exit 3"])
            .execute(ReelError::Bundle)
            .await
            .unwrap_err();
        match err {
            ReelError::Bundle(message) => {
                assert!(message.starts_with("Failing step failed"));
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_missing_binary() {
        let err = RendererCommand::new("reelsmith-definitely-missing-binary", "Missing")
            .execute(ReelError::Render)
            .await
            .unwrap_err();
        assert!(matches!(err, ReelError::Render(ref m) if m.starts_with("Failed to execute")));
    }
}
