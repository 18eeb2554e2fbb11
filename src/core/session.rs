//! Per-host command sessions.
//!
//! A [`Session`] runs commands through an [`SshClient`] and records a
//! host-tagged transcript of both streams. Every captured line carries the
//! `"[<label>] out: "` prefix and the transcript opens with a framing line
//! naming the command, so output fanned out across several hosts stays
//! attributable when echoed or stored together. The capture module strips
//! this tagging back off to recover clean command output.

use crate::error::{Error, RemoteCommandFailedDetails, Result};
use crate::host::Host;
use crate::ssh::{CommandOutput, SshClient};
use crate::utils::shell;

pub struct Session {
    client: SshClient,
    label: String,
}

/// One command run, with host-tagged transcripts of both streams.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: String,
    pub host: String,
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl Session {
    pub fn connect(host: &Host) -> Result<Self> {
        Ok(Self {
            client: SshClient::from_host(host)?,
            label: host.label(),
        })
    }

    /// A session that executes everything locally.
    pub fn local() -> Self {
        let host = Host::local();
        Self {
            client: SshClient {
                host: host.host.clone(),
                user: host.user.clone(),
                port: host.port,
                identity_file: None,
                is_local: true,
            },
            label: host.label(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn user(&self) -> &str {
        &self.client.user
    }

    /// Prefix each captured output line carries in transcripts.
    pub fn out_prefix(&self) -> String {
        format!("[{}] out: ", self.label)
    }

    /// Run a command. Never fails at this layer: the invocation's `success`
    /// flag is the caller's to check.
    pub fn run(&self, command: &str) -> Invocation {
        self.run_with(command, false)
    }

    /// Run a command with elevated privileges (`sudo sh -c '...'`).
    pub fn sudo(&self, command: &str) -> Invocation {
        self.run_with(command, true)
    }

    pub fn run_with(&self, command: &str, use_sudo: bool) -> Invocation {
        let verb = if use_sudo { "sudo" } else { "run" };
        log_status!("session", "[{}] {}: {}", self.label, verb, command);

        let effective = if use_sudo {
            format!("sudo sh -c {}", shell::escape_command_for_shell(command))
        } else {
            command.to_string()
        };

        let output = self.client.execute(&effective);
        self.into_invocation(command, verb, output)
    }

    /// Run a command with inherited stdio (e.g. `docker login` prompts).
    pub fn run_interactive(&self, command: &str) -> i32 {
        log_status!("session", "[{}] run: {}", self.label, command);
        self.client.execute_interactive(Some(command))
    }

    /// Upload a local file to the remote path (stdin-piped `cat >`).
    pub fn put(&self, local_path: &str, remote_path: &str) -> Invocation {
        log_status!("session", "[{}] put: {} -> {}", self.label, local_path, remote_path);
        let output = self.client.upload_file(local_path, remote_path);
        self.into_invocation(&format!("{} -> {}", local_path, remote_path), "put", output)
    }

    /// Check whether a path exists on the target.
    pub fn exists(&self, path: &str) -> bool {
        self.client
            .execute(&format!("[ -e {} ]", shell::quote_path(path)))
            .success
    }

    /// Check whether a path on the target is a directory.
    pub fn is_dir(&self, path: &str) -> bool {
        self.client
            .execute(&format!("[ -d {} ]", shell::quote_path(path)))
            .success
    }

    fn into_invocation(&self, command: &str, verb: &str, output: CommandOutput) -> Invocation {
        let framing = format!("[{}] {}: {}", self.label, verb, command);
        Invocation {
            command: command.to_string(),
            host: self.label.clone(),
            stdout: tag_stream(&framing, &self.out_prefix(), &output.stdout),
            stderr: tag_stream("", &self.out_prefix(), &output.stderr),
            success: output.success,
            exit_code: output.exit_code,
        }
    }
}

impl Invocation {
    /// Map a failed invocation to an error; identity on success.
    pub fn require_success(self) -> Result<Invocation> {
        if self.success {
            return Ok(self);
        }
        Err(Error::remote_command_failed(RemoteCommandFailedDetails {
            command: self.command.clone(),
            exit_code: self.exit_code,
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
            host: self.host.clone(),
        }))
    }
}

/// Tag every line of a raw stream with the host prefix, preceded by an
/// optional framing line (already fully formed, not re-tagged).
fn tag_stream(framing: &str, prefix: &str, raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    if !framing.is_empty() {
        lines.push(framing.to_string());
    }
    if !raw.is_empty() {
        let trimmed = raw.strip_suffix('\n').unwrap_or(raw);
        for line in trimmed.split('\n') {
            lines.push(format!("{}{}", prefix, line));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_stream_prefixes_each_line() {
        let tagged = tag_stream("[h] run: ls", "[h] out: ", "a\nb\n");
        assert_eq!(tagged, "[h] run: ls\n[h] out: a\n[h] out: b");
    }

    #[test]
    fn tag_stream_empty_output_keeps_framing_only() {
        let tagged = tag_stream("[h] run: true", "[h] out: ", "");
        assert_eq!(tagged, "[h] run: true");
    }

    #[test]
    fn local_session_runs_commands() {
        let session = Session::local();
        let inv = session.run("echo hello");
        assert!(inv.success);
        assert!(inv.stdout.contains("out: hello"));
    }

    #[test]
    fn local_session_reports_failure_without_error() {
        let session = Session::local();
        let inv = session.run("exit 7");
        assert!(!inv.success);
        assert_eq!(inv.exit_code, 7);
        assert!(inv.clone().require_success().is_err());
    }

    #[test]
    fn exists_and_is_dir_probe_paths() {
        let session = Session::local();
        assert!(session.exists("/tmp"));
        assert!(session.is_dir("/tmp"));
        assert!(!session.exists("/definitely/not/a/path"));
    }
}
