use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;

fn docdrop_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("docdrop");
    path
}

fn setup_test_env(extra: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[server]
host = "127.0.0.1"

[store]
uri = "sqlite:{}/data/docdrop.sqlite"
connect_timeout_secs = 2

[ask]
placeholder_delay_ms = 10
{}
"#,
        root.display(),
        extra
    );

    let config_path = config_dir.join("docdrop.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

/// Builds a command with the deployment variables cleared, so the
/// developer's environment cannot leak into the test.
fn docdrop_command(config_path: &Path) -> Command {
    let mut cmd = Command::new(docdrop_binary());
    cmd.arg("--config")
        .arg(config_path.to_str().unwrap())
        .env_remove("PORT")
        .env_remove("MONGODB_URI")
        .env_remove("DOCDROP_HOSTING")
        .env_remove("ASK_API_URL")
        .env("RUST_LOG", "docdrop=warn");
    cmd
}

fn run_docdrop(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = docdrop_command(config_path)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docdrop binary: {}", e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_init_creates_sqlite_store() {
    let (tmp, config_path) = setup_test_env("");

    let (stdout, stderr, success) = run_docdrop(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("backend: sqlite"));
    assert!(tmp.path().join("data/docdrop.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env("");

    let (_, _, success1) = run_docdrop(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_docdrop(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_init_without_store_uri_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("docdrop.toml");
    fs::write(&config_path, "[server]\nport = 3000\n").unwrap();

    let (_, stderr, success) = run_docdrop(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("MONGODB_URI"), "stderr={}", stderr);
}

#[test]
fn test_env_overrides_store_uri() {
    let (tmp, config_path) = setup_test_env("");
    let uri = format!("sqlite:{}/env.sqlite", tmp.path().display());

    let output = docdrop_command(&config_path)
        .env("MONGODB_URI", &uri)
        .arg("init")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(tmp.path().join("env.sqlite").exists());
    assert!(!tmp.path().join("data/docdrop.sqlite").exists());
}

#[test]
fn test_ask_placeholder_echoes_question() {
    let (_tmp, config_path) = setup_test_env("");

    let (stdout, stderr, success) = run_docdrop(&config_path, &["ask", "pricing"]);
    assert!(success, "ask failed: stderr={}", stderr);
    assert!(stdout.contains("pricing"));
    assert!(stdout.contains("sample answer"));
}

#[test]
fn test_ask_blank_question_is_noop() {
    let (_tmp, config_path) = setup_test_env("");

    let (stdout, _, success) = run_docdrop(&config_path, &["ask", "   "]);
    assert!(success);
    assert!(stdout.trim().is_empty());
}

#[test]
fn test_ask_interactive_reads_lines() {
    use std::io::Write;

    let (_tmp, config_path) = setup_test_env("");
    let mut child = docdrop_command(&config_path)
        .arg("ask")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"\nrefunds\n")
        .unwrap();

    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("refunds"), "stdout={}", stdout);
}

#[test]
fn test_serve_refuses_embedded_hosting() {
    let (_tmp, config_path) = setup_test_env("");

    let output = docdrop_command(&config_path)
        .env("DOCDROP_HOSTING", "embedded")
        .arg("serve")
        .output()
        .unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("embedded"), "stderr={}", stderr);
}

struct ServerGuard(Child);

impl Drop for ServerGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_until_up(base: &str) {
    let client = reqwest::Client::new();
    for _ in 0..100 {
        if let Ok(resp) = client.get(format!("{}/", base)).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("server at {} did not come up", base);
}

fn multipart_body(boundary: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: text/plain\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[tokio::test]
async fn test_serve_accepts_uploads() {
    let (_tmp, config_path) = setup_test_env("");
    let port = free_port();
    let _server = ServerGuard(
        docdrop_command(&config_path)
            .env("PORT", port.to_string())
            .arg("serve")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap(),
    );

    let base = format!("http://127.0.0.1:{}", port);
    wait_until_up(&base).await;

    let client = reqwest::Client::new();
    let root: serde_json::Value = client
        .get(format!("{}/", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(root["message"].is_string());

    let boundary = "integration-boundary";
    let content = b"quarterly numbers";
    let resp = client
        .post(format!("{}/upload", base))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(multipart_body(boundary, "q3.txt", content))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["filename"], "q3.txt");
    assert_eq!(json["data"]["size"], content.len() as u64);

    let missing = client
        .post(format!("{}/api/upload", base))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 400);
}
