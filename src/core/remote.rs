//! Small helpers over a session: home directory lookup, path probes,
//! idempotent uploads, and tempfile downloads.

use crate::capture;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::utils::shell;
use std::io::Write;

/// Join a path under a remote base directory.
pub fn join_remote(base: &str, rel: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, rel)
    } else {
        format!("{}/{}", base, rel)
    }
}

/// Home directory of the session user, or the literal `$HOME` when the
/// lookup produced nothing usable.
pub fn home_dir(session: &Session) -> String {
    let lines = capture::run_and_get_stdout(session, "echo $HOME", false);
    match lines.first().map(|l| l.trim()) {
        Some(first) if !first.is_empty() => first.to_string(),
        _ => "$HOME".to_string(),
    }
}

/// Check whether a program resolves on the target's PATH.
pub fn is_program_on_path(session: &Session, program: &str) -> bool {
    session
        .run(&format!(
            "command -v {} >/dev/null 2>&1",
            shell::quote_arg(program)
        ))
        .success
}

/// Copy a local file to the target only when it is not already there.
/// Returns true when a copy happened.
pub fn copy_file_if_absent(
    session: &Session,
    local_path: &str,
    remote_path: &str,
) -> Result<bool> {
    if !std::path::Path::new(local_path).exists() {
        return Err(Error::internal_io(
            format!("Local file '{}' not found", local_path),
            Some("copy to server".to_string()),
        ));
    }

    if session.exists(remote_path) {
        log_status!(
            "remote",
            "'{}' exists on '{}', skipping copy",
            remote_path,
            session.label()
        );
        return Ok(false);
    }

    log_status!(
        "remote",
        "Copying '{}' to '{}' on '{}'",
        local_path,
        remote_path,
        session.label()
    );
    session.put(local_path, remote_path).require_success()?;
    Ok(true)
}

/// Download a remote file into a named tempfile and return its path.
/// The caller owns (and deletes) the file.
pub fn download_to_tempfile(session: &Session, remote_path: &str) -> Result<std::path::PathBuf> {
    let invocation = session
        .run(&format!("cat {}", shell::quote_path(remote_path)))
        .require_success()?;

    // The transcript is tagged; recover the raw content
    let prefix = session.out_prefix();
    let content: Vec<String> = invocation
        .stdout
        .split('\n')
        .filter_map(|line| line.strip_prefix(prefix.as_str()))
        .map(|line| line.to_string())
        .collect();

    let mut file = tempfile::NamedTempFile::new()
        .map_err(|e| Error::internal_io(e.to_string(), Some("create tempfile".to_string())))?;
    file.write_all(content.join("\n").as_bytes())
        .map_err(|e| Error::internal_io(e.to_string(), Some("write tempfile".to_string())))?;

    let (_, path) = file
        .keep()
        .map_err(|e| Error::internal_io(e.to_string(), Some("persist tempfile".to_string())))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_remote_handles_trailing_slash() {
        assert_eq!(join_remote("/home/u", ".ssh"), "/home/u/.ssh");
        assert_eq!(join_remote("/home/u/", ".ssh"), "/home/u/.ssh");
    }

    #[test]
    fn home_dir_resolves_locally() {
        let session = Session::local();
        let home = home_dir(&session);
        assert!(!home.is_empty());
        assert_ne!(home, "$HOME");
    }

    #[test]
    fn is_program_on_path_finds_sh() {
        let session = Session::local();
        assert!(is_program_on_path(&session, "sh"));
        assert!(!is_program_on_path(&session, "definitely-not-a-binary"));
    }

    #[test]
    fn download_round_trips_content() {
        let session = Session::local();
        let mut src = tempfile::NamedTempFile::new().unwrap();
        src.write_all(b"line one\nline two\n").unwrap();

        let downloaded =
            download_to_tempfile(&session, &src.path().to_string_lossy()).unwrap();
        let content = std::fs::read_to_string(&downloaded).unwrap();
        assert_eq!(content, "line one\nline two");
        std::fs::remove_file(downloaded).unwrap();
    }

    #[test]
    fn copy_file_if_absent_skips_existing() {
        let session = Session::local();
        let mut src = tempfile::NamedTempFile::new().unwrap();
        src.write_all(b"key material").unwrap();

        let dest = tempfile::NamedTempFile::new().unwrap();
        // Destination already exists: no copy
        let copied = copy_file_if_absent(
            &session,
            &src.path().to_string_lossy(),
            &dest.path().to_string_lossy(),
        )
        .unwrap();
        assert!(!copied);

        // Missing destination: copy happens
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("copied");
        let copied = copy_file_if_absent(
            &session,
            &src.path().to_string_lossy(),
            &target.to_string_lossy(),
        )
        .unwrap();
        assert!(copied);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "key material");
    }
}
