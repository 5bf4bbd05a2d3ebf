// ABOUTME: Which interpreter runs an agent file and how the bridge command line is built.
// ABOUTME: TypeScript goes through `npx --yes tsx`, JavaScript through `node`; both overridable.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::AgentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    TypeScript,
    JavaScript,
}

impl AgentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "js" | "mjs" | "cjs" => Some(Self::JavaScript),
            _ => None,
        }
    }
}

/// Interpreter command lines, program first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub typescript: Vec<String>,
    pub javascript: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            typescript: vec!["npx".into(), "--yes".into(), "tsx".into()],
            javascript: vec!["node".into()],
        }
    }
}

impl RuntimeConfig {
    /// Apply whitespace-separated overrides such as `FLUX_TS_RUNTIME="bun"`.
    pub fn with_overrides(mut self, typescript: Option<&str>, javascript: Option<&str>) -> Self {
        if let Some(cmd) = typescript.map(split_command).filter(|c| !c.is_empty()) {
            self.typescript = cmd;
        }
        if let Some(cmd) = javascript.map(split_command).filter(|c| !c.is_empty()) {
            self.javascript = cmd;
        }
        self
    }

    pub fn command_for(&self, kind: AgentKind) -> &[String] {
        match kind {
            AgentKind::TypeScript => &self.typescript,
            AgentKind::JavaScript => &self.javascript,
        }
    }
}

fn split_command(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// A fully resolved command that starts a bridge process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launcher {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl Launcher {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    /// `<runtime...> <script> <mode> <agent>`, run from the agent's directory.
    pub fn for_agent(
        runtime: &RuntimeConfig,
        agent: &Path,
        script: &Path,
        mode: &str,
    ) -> Result<Self, AgentError> {
        let kind = AgentKind::from_path(agent).ok_or_else(|| {
            AgentError::Invalid(format!(
                "unsupported agent file type: {}",
                agent.display()
            ))
        })?;
        let (program, runtime_args) = runtime
            .command_for(kind)
            .split_first()
            .ok_or_else(|| AgentError::Invalid(format!("no runtime configured for {kind:?}")))?;

        let mut args = runtime_args.to_vec();
        args.push(script.display().to_string());
        args.push(mode.to_string());
        args.push(agent.display().to_string());

        Ok(Self {
            program: program.clone(),
            args,
            working_dir: agent.parent().map(Path::to_path_buf),
        })
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).kill_on_drop(true);
        if let Some(dir) = self.working_dir.as_ref().filter(|d| !d.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }
        cmd
    }
}
