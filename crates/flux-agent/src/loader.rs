// ABOUTME: Agent file discovery, pre-flight validation, and loading.
// ABOUTME: Validation runs the bridge in validate mode and reports a structured verdict.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::debug;

use crate::bridge::{self, BridgeScript, MODE_SERVE, MODE_VALIDATE};
use crate::error::AgentError;
use crate::process::ProcessAgent;
use crate::runtime::{Launcher, RuntimeConfig};

pub const AGENT_FILE_NAME: &str = "agent.ts";
pub const FALLBACK_AGENT_FILE_NAME: &str = "agent.js";

/// Upper bound on a validate run; the first `npx tsx` can be slow.
const VALIDATE_TIMEOUT: Duration = Duration::from_secs(120);
const EXIT_GRACE: Duration = Duration::from_secs(5);

/// Locate the agent in `dir`, preferring `agent.ts` over `agent.js`.
pub fn find_agent_file(dir: &Path) -> Option<PathBuf> {
    [AGENT_FILE_NAME, FALLBACK_AGENT_FILE_NAME]
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Outcome of a pre-flight check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

/// Check that `path` imports cleanly and default-exports an object with `invoke`.
pub async fn validate_agent_file(path: &Path, runtime: &RuntimeConfig) -> Validation {
    if !path.is_file() {
        return Validation::failed(AgentError::NotFound(path.to_path_buf()).to_string());
    }
    let script = match BridgeScript::write() {
        Ok(script) => script,
        Err(e) => return Validation::failed(e.to_string()),
    };
    match Launcher::for_agent(runtime, path, script.path(), MODE_VALIDATE) {
        Ok(launcher) => validate_with(&launcher).await,
        Err(e) => Validation::failed(e.to_string()),
    }
}

/// Run a validate-mode bridge and read its single verdict line.
pub(crate) async fn validate_with(launcher: &Launcher) -> Validation {
    let mut cmd = launcher.command();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return Validation::failed(format!("Failed to load agent: {e}")),
    };
    let Some(stdout) = child.stdout.take() else {
        return Validation::failed("Failed to load agent: no stdout from runtime");
    };
    // Drained alongside stdout so a chatty agent can't fill the pipe and stall
    let stderr_task = child.stderr.take().map(|mut stderr| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        })
    });

    let mut lines = BufReader::new(stdout).lines();
    let verdict = tokio::time::timeout(VALIDATE_TIMEOUT, bridge::next_line(&mut lines)).await;

    if verdict.is_err() {
        let _ = child.kill().await;
    }
    let _ = tokio::time::timeout(EXIT_GRACE, child.wait()).await;

    // Runtime diagnostics only surface at debug level
    if let Some(task) = stderr_task {
        if let Ok(Ok(buf)) = tokio::time::timeout(EXIT_GRACE, task).await {
            let stderr = String::from_utf8_lossy(&buf);
            if !stderr.trim().is_empty() {
                debug!(stderr = %stderr.trim(), "Agent validation stderr");
            }
        }
    }

    match verdict {
        Err(_) => Validation::failed(format!(
            "Failed to load agent: timed out after {}s",
            VALIDATE_TIMEOUT.as_secs()
        )),
        Ok(Err(e)) => Validation::failed(format!("Failed to load agent: {e}")),
        Ok(Ok(None)) => {
            Validation::failed("Failed to load agent: runtime exited without a result")
        }
        Ok(Ok(Some(line))) => match line.valid {
            Some(true) => Validation::ok(),
            _ => Validation::failed(
                line.error
                    .unwrap_or_else(|| "Failed to load agent: unknown error".to_string()),
            ),
        },
    }
}

/// Prepare a [`ProcessAgent`] for `path`. The process itself starts on first use.
pub fn load_agent(path: &Path, runtime: &RuntimeConfig) -> Result<ProcessAgent, AgentError> {
    if !path.is_file() {
        return Err(AgentError::NotFound(path.to_path_buf()));
    }
    let script = Arc::new(BridgeScript::write()?);
    let launcher = Launcher::for_agent(runtime, path, script.path(), MODE_SERVE)?;
    Ok(ProcessAgent::with_launcher(launcher).keep_script(script))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn prefers_typescript_agent() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("agent.js"), "").unwrap();
        std::fs::write(dir.path().join("agent.ts"), "").unwrap();
        assert_eq!(find_agent_file(dir.path()), Some(dir.path().join("agent.ts")));
    }

    #[test]
    fn falls_back_to_javascript_agent() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("agent.js"), "").unwrap();
        assert_eq!(find_agent_file(dir.path()), Some(dir.path().join("agent.js")));
    }

    #[test]
    fn empty_directory_has_no_agent() {
        let dir = TempDir::new().unwrap();
        assert_eq!(find_agent_file(dir.path()), None);
    }

    #[tokio::test]
    async fn missing_file_fails_validation() {
        let dir = TempDir::new().unwrap();
        let result =
            validate_agent_file(&dir.path().join("agent.ts"), &RuntimeConfig::default()).await;
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("no agent file"));
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_agent(&dir.path().join("agent.js"), &RuntimeConfig::default()).unwrap_err();
        assert!(matches!(err, AgentError::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_runtime_reports_load_failure() {
        let launcher = Launcher::new("flux-no-such-runtime-binary", vec![]);
        let result = validate_with(&launcher).await;
        assert!(!result.valid);
        assert!(result.error.unwrap().starts_with("Failed to load agent: "));
    }

    #[cfg(unix)]
    fn sh(script: &str) -> Launcher {
        Launcher::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn valid_verdict_is_reported() {
        let result = validate_with(&sh(r#"echo 'loading'; echo '{"valid":true}'"#)).await;
        assert_eq!(result, Validation::ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn invalid_verdict_keeps_message() {
        let result = validate_with(&sh(
            r#"echo '{"valid":false,"error":"Agent must have an `invoke` method"}'"#,
        ))
        .await;
        assert_eq!(
            result,
            Validation::failed("Agent must have an `invoke` method")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn noisy_stderr_does_not_hide_verdict() {
        // Well past a pipe buffer's worth of stderr before the verdict
        let result = validate_with(&sh(
            r#"head -c 300000 /dev/zero | tr '\0' x >&2; echo '{"valid":true}'"#,
        ))
        .await;
        assert_eq!(result, Validation::ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn silent_exit_is_a_failure() {
        let result = validate_with(&sh("exit 3")).await;
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("without a result"));
    }
}
