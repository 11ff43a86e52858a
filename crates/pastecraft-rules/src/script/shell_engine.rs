//! Shell-command transforms
//!
//! The rule's code is handed to `sh -c`. The matched text always arrives on
//! stdin. It is also exported as `PASTECRAFT_MATCH`, groups as
//! `PASTECRAFT_GROUP_<n>`, as long as each value fits under
//! [`ENV_VALUE_LIMIT`]. The byte offset is in `PASTECRAFT_OFFSET`. Stdout,
//! minus one trailing newline, is the replacement. A non-zero exit fails the match.

use async_trait::async_trait;
use pastecraft_core::{Error, Result};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{ScriptEngine, Transform};
use crate::context::MatchContext;

/// Largest value exported as an environment variable. Linux refuses single
/// environment strings above 128 KiB.
pub const ENV_VALUE_LIMIT: usize = 32 * 1024;

/// Script engine running rule code as shell commands
#[derive(Debug, Clone)]
pub struct ShellEngine {
    shell: PathBuf,
}

impl ShellEngine {
    /// Use `sh`
    pub fn new() -> Self {
        Self::with_shell("sh")
    }

    /// Use a specific shell binary; it is invoked as `<shell> -c <code>`
    pub fn with_shell(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine for ShellEngine {
    fn name(&self) -> &str {
        "shell"
    }

    fn compile(&self, code: &str) -> Result<Arc<dyn Transform>> {
        if code.trim().is_empty() {
            return Err(Error::script_compile("empty command"));
        }

        Ok(Arc::new(ShellTransform {
            shell: self.shell.clone(),
            code: code.into(),
        }))
    }
}

struct ShellTransform {
    shell: PathBuf,
    code: Arc<str>,
}

#[async_trait]
impl Transform for ShellTransform {
    async fn apply(&self, ctx: &MatchContext) -> Result<String> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(&*self.code)
            .env("PASTECRAFT_OFFSET", ctx.offset().to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        export_capped(&mut cmd, "PASTECRAFT_MATCH".to_string(), ctx.matched());
        for (index, group) in ctx.groups().iter().enumerate().skip(1) {
            if let Some(value) = group {
                export_capped(&mut cmd, format!("PASTECRAFT_GROUP_{}", index), value);
            }
        }

        let mut child = cmd.spawn().map_err(|e| {
            Error::script(format!("failed to start {}: {}", self.shell.display(), e))
        })?;

        // Feed stdin while output is drained, or a chatty command stalls on a
        // full stdout pipe.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // Commands that never read stdin close the pipe early.
                match stdin.write_all(ctx.matched().as_bytes()).await {
                    Err(e) if e.kind() != ErrorKind::BrokenPipe => {
                        return Err(Error::script(format!("failed to write stdin: {}", e)));
                    }
                    _ => {}
                }
            }
            Ok(())
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        fed?;
        let output =
            output.map_err(|e| Error::script(format!("failed to wait for command: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::script(format!(
                "command exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let mut stdout = String::from_utf8(output.stdout)
            .map_err(|_| Error::script("command output is not valid UTF-8"))?;
        if stdout.ends_with('\n') {
            stdout.pop();
            if stdout.ends_with('\r') {
                stdout.pop();
            }
        }

        debug!(bytes = stdout.len(), "Shell transform finished");
        Ok(stdout)
    }
}

/// Export `value` unless it is too large for the environment; stdin always
/// carries the full match.
fn export_capped(cmd: &mut Command, key: String, value: &str) {
    if value.len() > ENV_VALUE_LIMIT {
        debug!(
            key = %key,
            bytes = value.len(),
            "Value too large for environment, not exported"
        );
        return;
    }
    cmd.env(key, value);
}
