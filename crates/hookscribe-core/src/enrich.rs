//! Best-effort process, host and git metadata
//!
//! Every lookup here is allowed to fail; failures leave the field empty.

use crate::event::{DerivedMetadata, GitInfo};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

/// Hard limit per `git` invocation
pub const GIT_TIMEOUT: Duration = Duration::from_millis(500);

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Collect metadata for an event whose working directory is `cwd`
pub fn collect(cwd: Option<&Path>, with_git: bool, git_timeout: Duration) -> DerivedMetadata {
    let git = if with_git {
        cwd.and_then(|dir| git_info(dir, git_timeout))
    } else {
        None
    };

    DerivedMetadata {
        hostname: hostname(),
        pid: std::process::id(),
        ppid: parent_pid(),
        git,
    }
}

pub fn hostname() -> Option<String> {
    hostname::get().ok().and_then(|h| h.into_string().ok())
}

#[cfg(unix)]
fn parent_pid() -> Option<u32> {
    Some(std::os::unix::process::parent_id())
}

#[cfg(not(unix))]
fn parent_pid() -> Option<u32> {
    None
}

/// Branch, commit and origin URL of the repository containing `dir`
///
/// Returns `None` when `dir` is not inside a work tree or `git` is missing.
pub fn git_info(dir: &Path, timeout: Duration) -> Option<GitInfo> {
    if !dir.is_dir() {
        return None;
    }

    let branch = run_git(dir, &["rev-parse", "--abbrev-ref", "HEAD"], timeout);
    let commit = run_git(dir, &["rev-parse", "HEAD"], timeout);
    if branch.is_none() && commit.is_none() {
        return None;
    }
    let remote = run_git(dir, &["config", "--get", "remote.origin.url"], timeout);

    let info = GitInfo {
        branch,
        commit,
        remote,
    };
    (!info.is_empty()).then_some(info)
}

/// Run `git <args>` in `dir`, killing it once `timeout` elapses
fn run_git(dir: &Path, args: &[&str], timeout: Duration) -> Option<String> {
    let mut child = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_OPTIONAL_LOCKS", "0")
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| debug!(error = %e, "git unavailable"))
        .ok()?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => break,
            Ok(None) if Instant::now() >= deadline => {
                debug!(?args, "git timed out");
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(e) => {
                debug!(error = %e, "Failed waiting for git");
                return None;
            }
        }
    }

    let output = child.wait_with_output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
