use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::time::Duration;

const BIN: &str = env!("CARGO_BIN_EXE_caddywrap");

fn write_caddyfile(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("Caddyfile");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path
}

fn caddywrap(args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to run caddywrap")
}

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[test]
fn test_validate_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_caddyfile(
        &dir,
        r#"
localhost:8080 {
    echo /hi {
        message "hello there"
        header X-A b
        allow 127.0.0.1/8
        verbose
    }
}
"#,
    );

    let out = caddywrap(&["validate", "--json", path.to_str().unwrap()]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let site = &json["sites"][0];
    assert_eq!(site["addresses"][0], "localhost:8080");
    let echo = &site["directives"]["echo"];
    assert_eq!(echo["path"], "/hi");
    assert_eq!(echo["message"], "hello there");
    assert_eq!(echo["headers"]["X-A"], "b");
    assert_eq!(echo["allow"][0], "127.0.0.0/8");
    assert_eq!(echo["verbose"], true);
}

#[test]
fn test_validate_reports_bad_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_caddyfile(&dir, "localhost {\n  echo {\n    status later\n  }\n}\n");

    let out = caddywrap(&["validate", path.to_str().unwrap()]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("line 3"), "{}", stderr);
    assert!(stderr.contains("status later"), "{}", stderr);
}

#[test]
fn test_validate_rejects_unknown_directive() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_caddyfile(&dir, "localhost {\n  echo\n  gzip\n}\n");

    let out = caddywrap(&["validate", path.to_str().unwrap()]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("unknown directive 'gzip'"), "{}", stderr);
}

#[test]
fn test_validate_missing_file() {
    let out = caddywrap(&["validate", "/nonexistent/Caddyfile"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Failed to read"));
}

#[test]
fn test_directives() {
    let out = caddywrap(&["directives"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("echo v"), "{}", stdout);
    assert!(stdout.contains("path (arg0): string"), "{}", stdout);
    assert!(stdout.contains("allow: CIDR network"), "{}", stdout);
}

struct Server(Child);

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

#[tokio::test]
async fn test_run_serves_echo() {
    let dir = tempfile::tempdir().unwrap();
    let port = free_port();
    let path = write_caddyfile(
        &dir,
        &format!(
            "127.0.0.1:{} {{\n  echo /hi {{\n    message {{$GREETER}}\n    status 202\n  }}\n}}\n",
            port
        ),
    );

    let mut server = Server(
        Command::new(BIN)
            .args(["run", path.to_str().unwrap()])
            .env("GREETER", "hi-from-env")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to start server"),
    );

    let url = format!("http://127.0.0.1:{}/hi", port);
    let client = reqwest::Client::new();
    let mut response = None;
    for _ in 0..50 {
        if let Ok(Some(status)) = server.0.try_wait() {
            let mut stderr = String::new();
            if let Some(mut pipe) = server.0.stderr.take() {
                pipe.read_to_string(&mut stderr).unwrap();
            }
            panic!("server exited with {}: {}", status, stderr);
        }
        if let Ok(resp) = client.get(&url).send().await {
            response = Some(resp);
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let resp = response.expect("server never answered");
    assert_eq!(resp.status().as_u16(), 202);
    assert_eq!(resp.text().await.unwrap(), "hi-from-env");

    let missing = client
        .get(format!("http://127.0.0.1:{}/nope", port))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}
