use clap::Args;
use dockhand::capture::{self, CaptureOptions};
use dockhand::session::Session;
use dockhand::shell;
use serde::Serialize;

use super::CmdResult;

#[derive(Args)]
pub struct ExecArgs {
    /// Target host(s) in user@host[:port] form (repeatable).
    /// Falls back to the hosts list in dockhand.yml.
    #[arg(long = "host", value_name = "USER@HOST[:PORT]")]
    pub hosts: Vec<String>,

    /// Run the command with sudo
    #[arg(long)]
    pub sudo: bool,

    /// Also capture stderr lines
    #[arg(long)]
    pub capture_stderr: bool,

    /// Command to execute.
    ///
    /// If you need shell operators (&&, |, redirects), pass a single quoted
    /// string:
    ///   dockhand exec --host deploy@web1 "cd /srv && ls | head"
    #[arg(num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRun {
    pub host: String,
    pub stdout: Option<Vec<String>>,
    pub stderr: Option<Vec<String>>,
    pub success: bool,
    pub exit_code: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecOutput {
    pub command: String,
    pub runs: Vec<HostRun>,
}

pub fn run(args: ExecArgs, _global: &super::GlobalArgs) -> CmdResult<ExecOutput> {
    let hosts = super::resolve_hosts(&args.hosts)?;

    let command = if args.command.len() == 1 {
        // A single string is treated as a raw shell command
        args.command[0].clone()
    } else {
        shell::quote_args(&args.command)
    };

    // Explicit fan-out: one independent invocation per host
    let mut runs = Vec::new();
    let mut exit_code = 0;
    for host in &hosts {
        let session = Session::connect(host)?;
        let captured = capture::run_and_get_output(
            &session,
            &command,
            CaptureOptions {
                use_sudo: args.sudo,
                capture_stdout: true,
                capture_stderr: args.capture_stderr,
            },
        );
        if !captured.success && exit_code == 0 {
            exit_code = if captured.exit_code > 0 {
                captured.exit_code
            } else {
                1
            };
        }
        runs.push(HostRun {
            host: session.label().to_string(),
            stdout: captured.stdout,
            stderr: captured.stderr,
            success: captured.success,
            exit_code: captured.exit_code,
        });
    }

    Ok((ExecOutput { command, runs }, exit_code))
}
