//! Shared helpers: a mock registry server and a preconfigured `mmm` command.

use assert_cmd::Command;
use mmm_cli::test_utils::TestProject;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub use mmm_cli::utils::fs::sha1_bytes;

/// `mmm --config <project config>` with every registry pointed at `server`.
pub fn mmm(project: &TestProject, server: &MockServer) -> Command {
    let mut cmd = Command::cargo_bin("mmm").unwrap();
    cmd.current_dir(project.path())
        .env_remove("RUST_LOG")
        .env_remove("MMM_CONFIG")
        .env_remove("MODRINTH_API_KEY")
        .env("MODRINTH_API_URL", server.uri())
        .env("CURSEFORGE_API_URL", server.uri())
        .env("CURSEFORGE_API_KEY", "test-key")
        .env("MMM_MINECRAFT_MANIFEST_URL", format!("{}/mc/version_manifest.json", server.uri()))
        .arg("--config")
        .arg(project.config_path());
    cmd
}

/// Modrinth 1.20.1 version JSON with a single primary file served from `server`.
pub fn modrinth_version(server: &MockServer, project_id: &str, version_number: &str, file_name: &str, sha1: &str) -> Value {
    modrinth_version_for(server, "1.20.1", project_id, version_number, file_name, sha1)
}

/// Like [`modrinth_version`], published for `game_version`.
pub fn modrinth_version_for(
    server: &MockServer,
    game_version: &str,
    project_id: &str,
    version_number: &str,
    file_name: &str,
    sha1: &str,
) -> Value {
    json!({
        "id": format!("{project_id}-{version_number}"),
        "project_id": project_id,
        "name": version_number,
        "version_number": version_number,
        "version_type": "release",
        "status": "listed",
        "date_published": "2024-01-01T00:00:00Z",
        "game_versions": [game_version],
        "loaders": ["fabric"],
        "files": [{
            "hashes": {"sha1": sha1},
            "url": format!("{}/files/{file_name}", server.uri()),
            "filename": file_name,
            "primary": true,
            "size": 1
        }]
    })
}

pub async fn mock_modrinth_project(server: &MockServer, project_id: &str, title: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/project/{project_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": project_id,
            "slug": project_id.to_lowercase(),
            "title": title
        })))
        .mount(server)
        .await;
}

pub async fn mock_modrinth_versions(server: &MockServer, project_id: &str, game_version: &str, versions: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/project/{project_id}/version")))
        .and(query_param("game_versions", format!("[\"{game_version}\"]")))
        .and(query_param("loaders", "[\"fabric\"]"))
        .respond_with(ResponseTemplate::new(200).set_body_json(versions))
        .mount(server)
        .await;
}

/// Serve `body` at `/files/<file_name>`, expecting exactly `calls` downloads.
pub async fn mock_download(server: &MockServer, file_name: &str, body: &[u8], calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{file_name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(calls)
        .mount(server)
        .await;
}

pub async fn mock_hash_lookup(server: &MockServer, sha1: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/version_file/{sha1}")))
        .and(query_param("algorithm", "sha1"))
        .respond_with(response)
        .mount(server)
        .await;
}
