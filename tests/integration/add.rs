use mmm_cli::models::Platform;
use mmm_cli::test_utils::TestProject;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common::{
    mmm, mock_download, mock_modrinth_project, mock_modrinth_versions, modrinth_version, modrinth_version_for, sha1_bytes,
};

const JAR: &[u8] = b"sodium jar bytes";

async fn sodium_registry(downloads: u64) -> MockServer {
    let server = MockServer::start().await;
    let sha1 = sha1_bytes(JAR);
    mock_modrinth_project(&server, "AANobbMI", "Sodium").await;
    mock_modrinth_versions(
        &server,
        "AANobbMI",
        "1.20.1",
        json!([modrinth_version(&server, "AANobbMI", "0.5.3", "sodium-0.5.3.jar", &sha1)]),
    )
    .await;
    mock_download(&server, "sodium-0.5.3.jar", JAR, downloads).await;
    server
}

#[tokio::test(flavor = "multi_thread")]
async fn test_add_installs_and_records() {
    let server = sodium_registry(1).await;
    let project = TestProject::new();

    mmm(&project, &server)
        .args(["add", "modrinth", "AANobbMI"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added"));

    let lock = project.lock();
    let entry = lock.find_mod(Platform::Modrinth, "AANobbMI").unwrap();
    assert_eq!(entry.name, "Sodium");
    assert_eq!(entry.file_name, "sodium-0.5.3.jar");
    assert_eq!(entry.hash, sha1_bytes(JAR));
    assert_eq!(entry.released_on, "2024-01-01T00:00:00Z");
    assert_eq!(std::fs::read(project.mods_dir().join("sodium-0.5.3.jar")).unwrap(), JAR);

    let manifest = project.manifest();
    assert_eq!(manifest.mods.len(), 1);
    assert_eq!(manifest.mods[0].name, "Sodium");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_add_twice_does_not_download_again() {
    let server = sodium_registry(1).await;
    let project = TestProject::new();

    mmm(&project, &server).args(["add", "modrinth", "AANobbMI"]).assert().success();
    let lock_before = std::fs::read_to_string(project.location.lock_path()).unwrap();

    mmm(&project, &server)
        .args(["add", "modrinth", "AANobbMI"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already installed"));

    assert_eq!(std::fs::read_to_string(project.location.lock_path()).unwrap(), lock_before);
    assert_eq!(project.lock().mods.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_add_pinned_version() {
    let server = MockServer::start().await;
    let old = b"old sodium";
    let new = b"new sodium";
    mock_modrinth_project(&server, "AANobbMI", "Sodium").await;
    mock_modrinth_versions(
        &server,
        "AANobbMI",
        "1.20.1",
        json!([
            modrinth_version(&server, "AANobbMI", "0.6.0", "sodium-0.6.0.jar", &sha1_bytes(new)),
            modrinth_version(&server, "AANobbMI", "0.5.3", "sodium-0.5.3.jar", &sha1_bytes(old)),
        ]),
    )
    .await;
    mock_download(&server, "sodium-0.5.3.jar", old, 1).await;
    mock_download(&server, "sodium-0.6.0.jar", new, 0).await;
    let project = TestProject::new();

    mmm(&project, &server).args(["add", "modrinth", "AANobbMI", "--version", "0.5.3"]).assert().success();

    assert_eq!(project.lock().mods[0].file_name, "sodium-0.5.3.jar");
    assert_eq!(project.manifest().mods[0].version.as_deref(), Some("0.5.3"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_add_quiet_without_config_fails() {
    let server = MockServer::start().await;
    let project = TestProject::empty();

    mmm(&project, &server)
        .args(["-q", "add", "modrinth", "AANobbMI"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config file not found"));

    assert!(!project.config_path().exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_add_initializes_config_for_latest_release() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mc/version_manifest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latest": {"release": "1.21.1", "snapshot": "24w40a"},
            "versions": []
        })))
        .mount(&server)
        .await;
    mock_modrinth_project(&server, "AANobbMI", "Sodium").await;
    mock_modrinth_versions(
        &server,
        "AANobbMI",
        "1.21.1",
        json!([modrinth_version_for(&server, "1.21.1", "AANobbMI", "0.6.0", "sodium-0.6.0.jar", &sha1_bytes(JAR))]),
    )
    .await;
    mock_download(&server, "sodium-0.6.0.jar", JAR, 1).await;
    let project = TestProject::empty();

    mmm(&project, &server).args(["add", "modrinth", "AANobbMI"]).assert().success();

    let manifest = project.manifest();
    assert_eq!(manifest.game_version, "1.21.1");
    assert_eq!(manifest.mods_folder, "mods");
    assert!(project.mods_dir().join("sodium-0.6.0.jar").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_add_unknown_platform_non_interactive() {
    let server = MockServer::start().await;
    let project = TestProject::new();

    mmm(&project, &server)
        .args(["add", "github", "sodium"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown platform: github"));

    assert!(project.manifest().mods.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_add_no_compatible_file_writes_nothing() {
    let server = MockServer::start().await;
    mock_modrinth_project(&server, "AANobbMI", "Sodium").await;
    mock_modrinth_versions(&server, "AANobbMI", "1.20.1", json!([])).await;
    let project = TestProject::new();

    mmm(&project, &server)
        .args(["add", "modrinth", "AANobbMI"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no compatible file found on modrinth for AANobbMI"));

    assert!(project.manifest().mods.is_empty());
    assert!(project.lock().mods.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_add_missing_project() {
    let server = MockServer::start().await;
    let project = TestProject::new();

    mmm(&project, &server)
        .args(["add", "modrinth", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mod not found on modrinth: does-not-exist"));
}
