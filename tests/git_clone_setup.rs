//! End-to-end provisioning against a local session: keys and the wrapper
//! script land under a throwaway home directory, and a second run copies
//! nothing.

use dockhand::config::GitCloneSettings;
use dockhand::git;
use dockhand::session::Session;
use std::fs;
use std::path::Path;

struct Fixture {
    _workdir: tempfile::TempDir,
    home: tempfile::TempDir,
    settings: GitCloneSettings,
}

fn fixture() -> Fixture {
    let workdir = tempfile::tempdir().expect("workdir");
    let home = tempfile::tempdir().expect("home");

    let keys_dir = workdir.path().join("keys");
    fs::create_dir(&keys_dir).unwrap();
    fs::write(keys_dir.join("id_rsa_deploy"), "PRIVATE KEY MATERIAL\n").unwrap();
    fs::write(keys_dir.join("id_rsa_deploy.pub"), "ssh-rsa AAAA deploy\n").unwrap();

    let template_dir = workdir.path().join("templates");
    fs::create_dir(&template_dir).unwrap();
    fs::write(
        template_dir.join("git_ssh_wrap.sh"),
        "#!/bin/sh\nexec ssh -i {{ssh_private_key_path}} \"$@\"\n",
    )
    .unwrap();

    let settings = GitCloneSettings {
        ssh_private_key: "id_rsa_deploy".to_string(),
        ssh_public_key: "id_rsa_deploy.pub".to_string(),
        ssh_keys_local_dir: keys_dir.to_string_lossy().to_string(),
        ssh_keys_remote_dir: ".ssh/deploy-keys".to_string(),
        git_ssh_script_name: "git_ssh_wrap.sh".to_string(),
        git_ssh_script_template_dir: template_dir.to_string_lossy().to_string(),
    };

    Fixture {
        _workdir: workdir,
        home,
        settings,
    }
}

#[test]
fn setup_installs_keys_and_wrapper_then_skips_on_rerun() {
    let fixture = fixture();
    let session = Session::local();
    let home = fixture.home.path().to_string_lossy().to_string();

    let first = git::setup_server_for_git_clone(&session, &fixture.settings, Some(&home))
        .expect("first setup");
    assert_eq!(first.copied.len(), 2);
    assert!(first.script_installed);

    // Key material arrived intact
    let private_key = fixture
        .home
        .path()
        .join(".ssh/deploy-keys/id_rsa_deploy");
    assert_eq!(
        fs::read_to_string(&private_key).unwrap().trim_end(),
        "PRIVATE KEY MATERIAL"
    );

    // Wrapper script is rendered with the remote key path, not the placeholder
    let script = fs::read_to_string(fixture.home.path().join("git_ssh_wrap.sh")).unwrap();
    assert!(script.contains(&private_key.to_string_lossy().to_string()));
    assert!(!script.contains("{{ssh_private_key_path}}"));

    // Second run finds everything in place and copies nothing
    let second = git::setup_server_for_git_clone(&session, &fixture.settings, Some(&home))
        .expect("second setup");
    assert!(second.copied.is_empty());
    assert!(!second.script_installed);
    assert_eq!(second.skipped.len(), 3);
}

#[test]
fn completion_check_reports_each_missing_path() {
    let fixture = fixture();
    let session = Session::local();
    let home = fixture.home.path().to_string_lossy().to_string();

    let before = git::is_git_clone_setup_complete(&session, &fixture.settings, Some(&home))
        .expect("check before setup");
    assert!(!before.complete);
    assert_eq!(before.missing.len(), 3);

    git::setup_server_for_git_clone(&session, &fixture.settings, Some(&home)).expect("setup");

    let after = git::is_git_clone_setup_complete(&session, &fixture.settings, Some(&home))
        .expect("check after setup");
    assert!(after.complete);
    assert!(after.missing.is_empty());

    // Removing just the private key is noticed
    fs::remove_file(fixture.home.path().join(".ssh/deploy-keys/id_rsa_deploy")).unwrap();
    let degraded = git::is_git_clone_setup_complete(&session, &fixture.settings, Some(&home))
        .expect("check after removal");
    assert!(!degraded.complete);
    assert_eq!(degraded.missing.len(), 1);
    assert!(Path::new(&degraded.missing[0]).ends_with("id_rsa_deploy"));
}
