use dockhand::error::RemoteCommandFailedDetails;
use dockhand::output::{map_cmd_result_to_json, CliResponse};
use dockhand::Error;

#[test]
fn remote_command_failed_serializes_stdout_stderr() {
    let err = Error::remote_command_failed(RemoteCommandFailedDetails {
        command: "ls -la".to_string(),
        exit_code: 127,
        stdout: "[deploy@alpha] out: some stdout".to_string(),
        stderr: "[deploy@alpha] out: some stderr".to_string(),
        host: "deploy@alpha.example.com".to_string(),
    });

    let json = CliResponse::<()>::from_error(&err).to_json().unwrap();

    assert!(json.contains("\"code\": \"remote.command_failed\""));
    assert!(json.contains("some stdout"));
    assert!(json.contains("some stderr"));
    assert!(json.contains("\"exitCode\": 127"));
}

#[test]
fn remote_command_failed_maps_to_exit_code_20() {
    let err = Error::remote_command_failed(RemoteCommandFailedDetails {
        command: "ls".to_string(),
        exit_code: 1,
        stdout: String::new(),
        stderr: String::new(),
        host: "deploy@alpha.example.com".to_string(),
    });

    let (_value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(err));

    assert_eq!(exit_code, 20);
}

#[test]
fn config_errors_map_to_exit_code_2() {
    let err = Error::config_missing_key("git_clone", Some("dockhand.yml".to_string()));
    let (_value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(err));
    assert_eq!(exit_code, 2);

    let err = Error::validation_invalid_argument(
        "gitCryptKeyPath",
        "git-crypt init requested without a key path",
        None,
    );
    let (_value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(err));
    assert_eq!(exit_code, 2);
}

#[test]
fn hints_are_included_in_the_envelope() {
    let err = Error::config_missing_file("dockhand.yml");
    let json = CliResponse::<()>::from_error(&err).to_json().unwrap();
    assert!(json.contains("\"hints\""));
    assert!(json.contains("dockhand.yml"));
}

#[test]
fn success_envelope_wraps_data() {
    let json = CliResponse::success(serde_json::json!({"ok": true}))
        .to_json()
        .unwrap();
    assert!(json.contains("\"success\": true"));
    assert!(json.contains("\"ok\": true"));
}
