use mmm_cli::models::Platform;
use mmm_cli::test_utils::TestProject;
use predicates::prelude::*;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common::{mmm, mock_hash_lookup, mock_modrinth_project, modrinth_version, sha1_bytes};

const JAR: &[u8] = b"lithium jar bytes";

/// Fail the test if CurseForge is ever asked for fingerprints.
async fn forbid_fingerprints(server: &MockServer) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

async fn lithium_registry() -> MockServer {
    let server = MockServer::start().await;
    let sha1 = sha1_bytes(JAR);
    mock_modrinth_project(&server, "gvQqBUqZ", "Lithium").await;
    mock_hash_lookup(
        &server,
        &sha1,
        ResponseTemplate::new(200).set_body_json(modrinth_version(
            &server,
            "gvQqBUqZ",
            "0.11.2",
            "lithium-fabric-0.11.2.jar",
            &sha1,
        )),
    )
    .await;
    forbid_fingerprints(&server).await;
    server
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scan_empty_mods_folder() {
    let server = MockServer::start().await;
    let project = TestProject::new();

    mmm(&project, &server)
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("are managed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scan_add_records_match() {
    let server = lithium_registry().await;
    let project = TestProject::new();
    project.add_mod_file("lithium.jar", JAR);

    mmm(&project, &server)
        .args(["scan", "--add"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Lithium"));

    let lock = project.lock();
    let entry = lock.find_mod(Platform::Modrinth, "gvQqBUqZ").unwrap();
    assert_eq!(entry.file_name, "lithium.jar");
    assert_eq!(entry.hash, sha1_bytes(JAR));
    assert!(entry.download_url.ends_with("/files/lithium-fabric-0.11.2.jar"));
    assert_eq!(project.manifest().mods[0].name, "Lithium");

    // recorded files are managed now
    mmm(&project, &server)
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("are managed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scan_without_add_only_reports() {
    let server = lithium_registry().await;
    let project = TestProject::new();
    project.add_mod_file("lithium.jar", JAR);

    mmm(&project, &server)
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("Lithium"));

    assert!(project.lock().mods.is_empty());
    assert!(project.manifest().mods.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scan_unsure_blocks_persistence() {
    let server = lithium_registry().await;
    let broken = b"registry hiccup";
    mock_hash_lookup(&server, &sha1_bytes(broken), ResponseTemplate::new(502)).await;
    let project = TestProject::new();
    project.add_mod_file("lithium.jar", JAR);
    project.add_mod_file("other.jar", broken);

    mmm(&project, &server)
        .args(["scan", "--add"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing recorded"));

    assert!(project.lock().mods.is_empty());
    assert!(project.manifest().mods.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scan_falls_back_to_curseforge() {
    let server = MockServer::start().await;
    let unknown = b"nobody knows this jar";
    // modrinth answers 404 for every hash, curseforge has no exact match
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"exactMatches": [], "exactFingerprints": []}
        })))
        .expect(1)
        .mount(&server)
        .await;
    let project = TestProject::new();
    project.add_mod_file("mystery.jar", unknown);
    project.add_mod_file("disabled.jar.disabled", unknown);

    mmm(&project, &server)
        .args(["scan", "--add"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mystery.jar is not known"))
        .stdout(predicate::str::contains("disabled.jar").not());

    assert!(project.lock().mods.is_empty());
}
