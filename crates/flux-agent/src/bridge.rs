// ABOUTME: The embedded Node bridge script and the JSON lines it exchanges.
// ABOUTME: The script is written to a private temp dir that lives as long as its owner.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::error::AgentError;

pub const BRIDGE_SCRIPT: &str = include_str!("../shim/bridge.mjs");

pub const MODE_SERVE: &str = "serve";
pub const MODE_VALIDATE: &str = "validate";

/// Bridge script materialized on disk.
#[derive(Debug)]
pub struct BridgeScript {
    _dir: TempDir,
    path: PathBuf,
}

impl BridgeScript {
    pub fn write() -> Result<Self, AgentError> {
        let dir = tempfile::Builder::new()
            .prefix("flux-bridge-")
            .tempdir()
            .map_err(|e| AgentError::Load(format!("Failed to load agent: temp dir: {e}")))?;
        let path = dir.path().join("bridge.mjs");
        std::fs::write(&path, BRIDGE_SCRIPT)
            .map_err(|e| AgentError::Load(format!("Failed to load agent: write bridge: {e}")))?;
        Ok(Self { _dir: dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One invocation sent to the bridge.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeRequest<'a> {
    pub id: u64,
    pub message: &'a str,
    pub user_phone_number: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<&'a str>,
}

/// Any line the bridge writes: a handshake, a verdict, or a reply.
#[derive(Debug, Default, Deserialize)]
pub struct BridgeLine {
    pub id: Option<u64>,
    pub response: Option<String>,
    pub error: Option<String>,
    pub ready: Option<bool>,
    pub valid: Option<bool>,
}

/// Next parseable line, skipping blanks and anything that is not a JSON object.
pub async fn next_line<R>(lines: &mut Lines<R>) -> Result<Option<BridgeLine>, AgentError>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let line = lines
            .next_line()
            .await
            .map_err(|e| AgentError::Protocol(format!("read from agent: {e}")))?;
        let Some(line) = line else {
            return Ok(None);
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<BridgeLine>(trimmed) {
            Ok(parsed) => return Ok(Some(parsed)),
            Err(_) => tracing::debug!(line = %trimmed, "Agent stdout"),
        }
    }
}
