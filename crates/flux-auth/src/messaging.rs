// ABOUTME: Opens the platform messaging app with the verification code pre-filled.
// ABOUTME: Best effort: callers fall back to printing manual instructions.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tokio::process::Command;

/// Characters left as-is in the message body, matching URI component encoding.
const BODY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// `sms:` URL addressed to `to` with `body` pre-filled.
pub fn compose_url(to: &str, body: &str) -> String {
    format!("sms:{to}&body={}", utf8_percent_encode(body, BODY))
}

fn opener(url: &str) -> Command {
    #[cfg(target_os = "macos")]
    {
        let mut cmd = Command::new("open");
        cmd.arg(url);
        cmd
    }
    #[cfg(target_os = "windows")]
    {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", "", url]);
        cmd
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(url);
        cmd
    }
}

/// Launch the messaging app. Errors when the opener is missing or exits non-zero.
pub async fn open_compose(to: &str, body: &str) -> std::io::Result<()> {
    let url = compose_url(to, body);
    let status = opener(&url)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!("opener exited with {status}")))
    }
}
