use mmm_cli::lockfile::{LockFile, LockedMod};
use mmm_cli::manifest::ModEntry;
use mmm_cli::models::Platform;
use mmm_cli::test_utils::TestProject;
use predicates::prelude::*;
use serde_json::json;
use wiremock::MockServer;

use super::common::{mmm, mock_download, mock_modrinth_project, mock_modrinth_versions, modrinth_version, sha1_bytes};

const JAR: &[u8] = b"sodium jar bytes";

fn sodium_entry() -> ModEntry {
    ModEntry {
        platform: Platform::Modrinth,
        id: "AANobbMI".to_string(),
        allowed_release_types: None,
        name: "Sodium".to_string(),
        allow_version_fallback: None,
        version: None,
    }
}

fn configure(project: &TestProject) {
    let mut manifest = project.manifest();
    manifest.mods.push(sodium_entry());
    project.write_manifest(&manifest);
}

fn lock_sodium(project: &TestProject, server: &MockServer) {
    let lock = LockFile {
        mods: vec![LockedMod {
            platform: Platform::Modrinth,
            id: "AANobbMI".to_string(),
            name: "Sodium".to_string(),
            file_name: "sodium-0.5.3.jar".to_string(),
            released_on: "2024-01-01T00:00:00Z".to_string(),
            hash: sha1_bytes(JAR),
            download_url: format!("{}/files/sodium-0.5.3.jar", server.uri()),
        }],
    };
    lock.save(&project.location.lock_path()).unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_install_restores_missing_locked_file_once() {
    let server = MockServer::start().await;
    mock_download(&server, "sodium-0.5.3.jar", JAR, 1).await;
    let project = TestProject::new();
    configure(&project);
    lock_sodium(&project, &server);
    let lock_before = std::fs::read_to_string(project.location.lock_path()).unwrap();

    mmm(&project, &server)
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sodium was missing"));
    assert_eq!(std::fs::read(project.mods_dir().join("sodium-0.5.3.jar")).unwrap(), JAR);

    mmm(&project, &server)
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("all mods are installed"))
        .stdout(predicate::str::contains("was missing").not());

    assert_eq!(std::fs::read_to_string(project.location.lock_path()).unwrap(), lock_before);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_install_locks_configured_mod() {
    let server = MockServer::start().await;
    mock_modrinth_project(&server, "AANobbMI", "Sodium").await;
    mock_modrinth_versions(
        &server,
        "AANobbMI",
        "1.20.1",
        json!([modrinth_version(&server, "AANobbMI", "0.5.3", "sodium-0.5.3.jar", &sha1_bytes(JAR))]),
    )
    .await;
    mock_download(&server, "sodium-0.5.3.jar", JAR, 1).await;
    let project = TestProject::new();
    configure(&project);

    mmm(&project, &server).arg("install").assert().success();

    let lock = project.lock();
    let entry = lock.find_mod(Platform::Modrinth, "AANobbMI").unwrap();
    assert_eq!(entry.file_name, "sodium-0.5.3.jar");
    assert_eq!(entry.hash, sha1_bytes(JAR));
    assert!(project.mods_dir().join("sodium-0.5.3.jar").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_install_hash_mismatch_fails_without_keeping_file() {
    let server = MockServer::start().await;
    mock_download(&server, "sodium-0.5.3.jar", b"tampered bytes", 1).await;
    let project = TestProject::new();
    configure(&project);
    lock_sodium(&project, &server);

    mmm(&project, &server)
        .arg("install")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("1 mod(s) could not be installed"));

    assert!(!project.mods_dir().join("sodium-0.5.3.jar").exists());
    assert_eq!(project.lock().mods.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_install_without_config_fails() {
    let server = MockServer::start().await;
    let project = TestProject::empty();

    mmm(&project, &server)
        .arg("install")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config file not found"));

    assert!(!project.config_path().exists());
}
