//! Clean output capture over tagged session transcripts.
//!
//! Session transcripts tag every line with a host prefix and open with a
//! framing line, so a caller that wants the command's actual output has to
//! peel that back off. A sentinel line is echoed before the real command;
//! everything up to and including it is session noise, everything after is
//! command output (minus the per-line host prefix).

use crate::session::Session;
use serde::Serialize;

/// Sentinel line injected ahead of the real command. Anything a session
/// emits before it is discarded.
const DELIMITER: &str = "START OF run_and_get_output delimiter";

/// Captured output of one command. Streams are present only when capture
/// was requested for them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CapturedOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<Vec<String>>,
    pub success: bool,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct CaptureOptions {
    pub use_sudo: bool,
    pub capture_stdout: bool,
    pub capture_stderr: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            use_sudo: false,
            capture_stdout: true,
            capture_stderr: true,
        }
    }
}

/// Run a command and return its stdout lines, clean of session tagging.
///
/// Command failures are not errors here; a failed command simply yields
/// whatever lines it printed (often none).
pub fn run_and_get_stdout(session: &Session, command: &str, use_sudo: bool) -> Vec<String> {
    run_and_get_output(
        session,
        command,
        CaptureOptions {
            use_sudo,
            capture_stdout: true,
            capture_stderr: false,
        },
    )
    .stdout
    .unwrap_or_default()
}

/// Run a command and capture the requested streams as clean line sequences.
pub fn run_and_get_output(
    session: &Session,
    command: &str,
    options: CaptureOptions,
) -> CapturedOutput {
    let prefix = session.out_prefix();
    let delimiter_line = format!("{}{}", prefix, DELIMITER);

    // The delimiter is echoed inside the same shell as the command, so it
    // lands in the captured stream before any real output.
    let guarded = format!("echo '{}' && {}", DELIMITER, command);
    let invocation = session.run_with(&guarded, options.use_sudo);

    let mut captured = CapturedOutput {
        stdout: None,
        stderr: None,
        success: invocation.success,
        exit_code: invocation.exit_code,
    };
    if options.capture_stdout {
        captured.stdout = Some(strip_session_tagging(
            &invocation.stdout,
            &prefix,
            &delimiter_line,
        ));
    }
    if options.capture_stderr {
        captured.stderr = Some(strip_session_tagging(
            &invocation.stderr,
            &prefix,
            &delimiter_line,
        ));
    }
    captured
}

/// Recover clean output lines from a tagged transcript.
///
/// Everything up to and including the delimiter line is discarded; the host
/// prefix is stripped from any remaining line that carries it (the session
/// may re-tag continuation lines). A transcript without the delimiter line
/// yields no output at all.
fn strip_session_tagging(transcript: &str, prefix: &str, delimiter_line: &str) -> Vec<String> {
    let lines: Vec<&str> = transcript.split('\n').collect();

    let mut kept: &[&str] = &[];
    for (idx, line) in lines.iter().enumerate() {
        if *line == delimiter_line {
            kept = &lines[idx + 1..];
            break;
        }
    }

    kept.iter()
        .map(|line| line.strip_prefix(prefix).unwrap_or(line).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "[deploy@alpha] out: ";

    fn delim_line() -> String {
        format!("{}{}", PREFIX, DELIMITER)
    }

    #[test]
    fn missing_delimiter_yields_empty() {
        let transcript = "[deploy@alpha] run: ls\n[deploy@alpha] out: README.md";
        assert!(strip_session_tagging(transcript, PREFIX, &delim_line()).is_empty());
    }

    #[test]
    fn keeps_exactly_lines_after_delimiter() {
        let transcript = format!(
            "[deploy@alpha] run: echo\nnoise before\n{}\n{}LICENSE\n{}README.md",
            delim_line(),
            PREFIX,
            PREFIX
        );
        assert_eq!(
            strip_session_tagging(&transcript, PREFIX, &delim_line()),
            vec!["LICENSE", "README.md"]
        );
    }

    #[test]
    fn untagged_lines_pass_through() {
        let transcript = format!("{}\nraw line\n{}tagged line", delim_line(), PREFIX);
        assert_eq!(
            strip_session_tagging(&transcript, PREFIX, &delim_line()),
            vec!["raw line", "tagged line"]
        );
    }

    #[test]
    fn delimiter_in_real_output_keeps_trailing_lines() {
        // Only the first delimiter line is consumed
        let transcript = format!("{}\n{}{}\n{}after", delim_line(), PREFIX, DELIMITER, PREFIX);
        assert_eq!(
            strip_session_tagging(&transcript, PREFIX, &delim_line()),
            vec![DELIMITER, "after"]
        );
    }

    #[test]
    fn local_run_and_get_stdout_end_to_end() {
        let session = Session::local();
        let lines = run_and_get_stdout(&session, "printf 'a\\nb\\n'", false);
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn local_capture_respects_flags() {
        let session = Session::local();
        let captured = run_and_get_output(
            &session,
            "echo visible",
            CaptureOptions {
                use_sudo: false,
                capture_stdout: true,
                capture_stderr: false,
            },
        );
        assert_eq!(captured.stdout.unwrap(), vec!["visible"]);
        assert!(captured.stderr.is_none());
    }

    #[test]
    fn stderr_without_delimiter_is_empty() {
        // The delimiter is echoed to stdout only, so the stderr stream has
        // no boundary marker and yields nothing.
        let session = Session::local();
        let captured = run_and_get_output(
            &session,
            "echo warned 1>&2",
            CaptureOptions::default(),
        );
        assert_eq!(captured.stdout.unwrap(), Vec::<String>::new());
        assert_eq!(captured.stderr.unwrap(), Vec::<String>::new());
    }

    #[test]
    fn failed_command_still_yields_lines() {
        let session = Session::local();
        let captured = run_and_get_output(
            &session,
            "echo partial && exit 4",
            CaptureOptions {
                use_sudo: false,
                capture_stdout: true,
                capture_stderr: false,
            },
        );
        assert!(!captured.success);
        assert_eq!(captured.exit_code, 4);
        assert_eq!(captured.stdout.unwrap(), vec!["partial"]);
    }
}
