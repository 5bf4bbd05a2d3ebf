// ABOUTME: ProcessAgent runs the agent inside a long-lived bridge subprocess.
// ABOUTME: Started lazily, restarted after it exits, one request in flight at a time.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::bridge::{self, BridgeLine, BridgeScript, InvokeRequest};
use crate::contract::{Agent, AgentInput};
use crate::error::AgentError;
use crate::runtime::Launcher;

const READY_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug)]
struct BridgeChild {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

impl BridgeChild {
    fn has_exited(&mut self) -> bool {
        !matches!(self.child.try_wait(), Ok(None))
    }

    async fn call(&mut self, id: u64, input: &AgentInput) -> Result<String, AgentError> {
        let request = InvokeRequest {
            id,
            message: &input.message,
            user_phone_number: &input.user_phone_number,
            image_base64: input.image_base64.as_deref(),
        };
        let mut line = serde_json::to_string(&request)
            .map_err(|e| AgentError::Protocol(format!("encode request: {e}")))?;
        line.push('\n');

        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| AgentError::Protocol(format!("write to agent: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| AgentError::Protocol(format!("flush to agent: {e}")))?;

        loop {
            let Some(reply) = bridge::next_line(&mut self.lines).await? else {
                return Err(AgentError::Protocol("agent process exited".to_string()));
            };
            if reply.id != Some(id) {
                debug!(expected = id, got = ?reply.id, "Skipping unrelated agent line");
                continue;
            }
            if let Some(error) = reply.error {
                return Err(AgentError::Invoke(error));
            }
            return Ok(reply.response.unwrap_or_default());
        }
    }
}

/// An [`Agent`] backed by a bridge subprocess.
#[derive(Debug)]
pub struct ProcessAgent {
    launcher: Launcher,
    _script: Option<Arc<BridgeScript>>,
    child: Mutex<Option<BridgeChild>>,
    next_id: AtomicU64,
}

impl ProcessAgent {
    pub fn with_launcher(launcher: Launcher) -> Self {
        Self {
            launcher,
            _script: None,
            child: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    /// Tie the bridge script's lifetime to this agent.
    pub(crate) fn keep_script(mut self, script: Arc<BridgeScript>) -> Self {
        self._script = Some(script);
        self
    }

    /// Start the bridge and wait for its ready line.
    async fn spawn(&self) -> Result<BridgeChild, AgentError> {
        let mut cmd = self.launcher.command();
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = cmd
            .spawn()
            .map_err(|e| AgentError::Load(format!("Failed to load agent: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AgentError::Load("Failed to load agent: no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Load("Failed to load agent: no stdout".to_string()))?;
        let mut lines = BufReader::new(stdout).lines();

        let handshake = tokio::time::timeout(READY_TIMEOUT, bridge::next_line(&mut lines))
            .await
            .map_err(|_| {
                AgentError::Load("Failed to load agent: timed out waiting for agent".to_string())
            })?
            .map_err(|e| AgentError::Load(format!("Failed to load agent: {e}")))?;

        match handshake {
            Some(BridgeLine {
                ready: Some(true), ..
            }) => {
                info!(program = %self.launcher.program, "Agent process ready");
                Ok(BridgeChild {
                    child,
                    stdin,
                    lines,
                })
            }
            Some(line) => Err(AgentError::Load(line.error.unwrap_or_else(|| {
                "Failed to load agent: unexpected handshake".to_string()
            }))),
            None => Err(AgentError::Load(
                "Failed to load agent: agent process exited before it was ready".to_string(),
            )),
        }
    }
}

#[async_trait]
impl Agent for ProcessAgent {
    async fn invoke(&self, input: AgentInput) -> Result<String, AgentError> {
        let mut guard = self.child.lock().await;

        if let Some(existing) = guard.as_mut() {
            if existing.has_exited() {
                warn!("Agent process exited, restarting");
                *guard = None;
            }
        }
        if guard.is_none() {
            *guard = Some(self.spawn().await?);
        }
        let bridge = guard
            .as_mut()
            .ok_or_else(|| AgentError::Protocol("agent process unavailable".to_string()))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let result = bridge.call(id, &input).await;
        if let Err(AgentError::Protocol(reason)) = &result {
            warn!(reason = %reason, "Dropping agent process");
            *guard = None;
        }
        result
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> ProcessAgent {
        ProcessAgent::with_launcher(Launcher::new(
            "sh",
            vec!["-c".to_string(), script.to_string()],
        ))
    }

    fn input(text: &str) -> AgentInput {
        AgentInput {
            message: text.to_string(),
            user_phone_number: "+15551234567".to_string(),
            image_base64: None,
        }
    }

    // Answers each request with its id; stdin lines are `{"id":N,...}`
    const ECHO_BRIDGE: &str = r#"
echo '{"ready":true}'
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed 's/.*"id":\([0-9]*\).*/\1/')
  echo "not json noise"
  printf '{"id":%s,"response":"pong %s"}\n' "$id" "$id"
done
"#;

    #[tokio::test]
    async fn answers_requests_in_order() {
        let agent = sh(ECHO_BRIDGE);
        assert_eq!(agent.invoke(input("a")).await.unwrap(), "pong 1");
        assert_eq!(agent.invoke(input("b")).await.unwrap(), "pong 2");
    }

    #[tokio::test]
    async fn handshake_error_is_load_error() {
        let agent = sh(r#"echo '{"ready":false,"error":"No default export found. Use `export default agent`"}'; exit 1"#);
        match agent.invoke(input("hi")).await {
            Err(AgentError::Load(msg)) => {
                assert_eq!(msg, "No default export found. Use `export default agent`")
            }
            other => panic!("expected load error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn silent_exit_is_load_error() {
        let agent = sh("exit 0");
        assert!(matches!(
            agent.invoke(input("hi")).await,
            Err(AgentError::Load(_))
        ));
    }

    #[tokio::test]
    async fn agent_error_is_invoke_error() {
        let agent = sh(
            r#"echo '{"ready":true}'; read -r line; echo '{"id":1,"error":"boom"}'; cat >/dev/null"#,
        );
        match agent.invoke(input("hi")).await {
            Err(AgentError::Invoke(msg)) => assert_eq!(msg, "boom"),
            other => panic!("expected invoke error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn restarts_after_exit() {
        // Serves exactly one request, then exits
        let agent = sh(r#"echo '{"ready":true}'; read -r line; echo '{"id":'"$(printf '%s' "$line" | sed 's/.*"id":\([0-9]*\).*/\1/')"',"response":"once"}'"#);
        assert_eq!(agent.invoke(input("a")).await.unwrap(), "once");
        // Either the exit was observed and the child restarted, or the write
        // raced the exit and the next call restarts.
        let second = match agent.invoke(input("b")).await {
            Ok(reply) => reply,
            Err(AgentError::Protocol(_)) => agent.invoke(input("c")).await.unwrap(),
            Err(other) => panic!("unexpected error {other:?}"),
        };
        assert_eq!(second, "once");
    }

    #[tokio::test]
    async fn missing_program_is_load_error() {
        let agent = ProcessAgent::with_launcher(Launcher::new("flux-no-such-runtime-binary", vec![]));
        assert!(matches!(
            agent.invoke(input("hi")).await,
            Err(AgentError::Load(_))
        ));
    }
}
