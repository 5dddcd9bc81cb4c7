//! Integration tests for the `ifta serve` HTTP API.
//!
//! Each test starts the server as a child process on a unique port with a
//! static routing fixture and an in-memory store, makes HTTP requests, and
//! verifies the responses.

use std::io::Read;
use std::net::TcpStream;
use std::path::Path;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use serde_json::Value;
use tempfile::TempDir;

/// Atomic port counter to avoid port conflicts between parallel tests.
/// Base port is derived from process ID so separate test binaries don't
/// collide on the same port range.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 20000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

/// Running `ifta serve` child; killed on drop.
struct Server {
    port: u16,
    child: Child,
    _dir: TempDir,
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Helper: start `ifta serve` with the Dallas -> OKC fixture and an OKC terminal.
fn start_server() -> Server {
    start_server_with(false)
}

/// Start `ifta serve`; with `json_store` the legs live under the temp dir.
fn start_server_with(json_store: bool) -> Server {
    let port = next_port();
    let dir = tempfile::tempdir().expect("tempdir");
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("tx_ok_route.json");
    let mut config = format!(
        "[routing]\nprovider = \"static\"\nfixture = \"{}\"\ntimeout_secs = 5\n\n\
         [terminal]\nlatitude = 35.4676\nlongitude = -97.5164\n",
        fixture.display()
    );
    if json_store {
        config.push_str(&format!(
            "\n[storage]\ndata_dir = \"{}\"\n",
            dir.path().join("data").display()
        ));
    }
    let config_path = dir.path().join("ifta.toml");
    std::fs::write(&config_path, config).expect("write config");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ifta"));
    cmd.current_dir(dir.path());
    cmd.arg("--config").arg(&config_path);
    cmd.arg("serve").arg("--port").arg(port.to_string());
    cmd.env_remove("IFTA_ROUTING_TIMEOUT_SECS");
    // Redirect stdout/stderr to avoid blocking
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());

    let child = cmd.spawn().expect("failed to start ifta serve");
    // Wait for server to be ready by polling the port
    for _ in 0..50 {
        if TcpStream::connect(format!("127.0.0.1:{}", port)).is_ok() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    Server {
        port,
        child,
        _dir: dir,
    }
}

/// Helper: make a simple HTTP GET request and return (status, body).
fn http_get(port: u16, path: &str) -> (u16, String) {
    let (status, _, body) = http_get_with_headers(port, path, &[]);
    (status, body)
}

/// Helper: make an HTTP GET request with custom headers and return (status, response_headers, body).
fn http_get_with_headers(
    port: u16,
    path: &str,
    extra_headers: &[(&str, &str)],
) -> (u16, String, String) {
    let mut stream = TcpStream::connect(format!("127.0.0.1:{}", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    let mut header_lines = String::new();
    for (name, value) in extra_headers {
        header_lines.push_str(&format!("{}: {}\r\n", name, value));
    }

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: localhost:{}\r\n{}Connection: close\r\n\r\n",
        path, port, header_lines
    );
    std::io::Write::write_all(&mut stream, request.as_bytes()).expect("failed to write");

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);

    parse_http_response_full(&response)
}

/// Helper: make a simple HTTP POST request and return (status, body).
fn http_post(port: u16, path: &str, body: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(format!("127.0.0.1:{}", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();

    let request = format!(
        "POST {} HTTP/1.1\r\nHost: localhost:{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        path, port, body.len(), body
    );
    std::io::Write::write_all(&mut stream, request.as_bytes()).expect("failed to write");

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);

    let (status, _, body) = parse_http_response_full(&response);
    (status, body)
}

/// Extract a header value from raw headers string.
fn extract_header<'a>(headers: &'a str, name: &str) -> Option<&'a str> {
    let name_lower = name.to_lowercase();
    for line in headers.lines() {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().to_lowercase() == name_lower {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Parse an HTTP response into (status_code, headers_string, body).
fn parse_http_response_full(response: &str) -> (u16, String, String) {
    let parts: Vec<&str> = response.splitn(2, "\r\n\r\n").collect();
    let headers = parts.first().unwrap_or(&"").to_string();
    let body = parts.get(1).unwrap_or(&"").to_string();

    let status_line = headers.lines().next().unwrap_or("");
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);

    let body = if headers.to_lowercase().contains("transfer-encoding: chunked") {
        decode_chunked(&body)
    } else {
        body
    };

    (status, headers, body)
}

/// Decode chunked transfer encoding.
fn decode_chunked(data: &str) -> String {
    let mut result = String::new();
    let mut remaining = data;

    while let Some(line_end) = remaining.find("\r\n") {
        let size = match usize::from_str_radix(remaining[..line_end].trim(), 16) {
            Ok(s) => s,
            Err(_) => break,
        };
        if size == 0 {
            break;
        }
        let chunk_start = line_end + 2;
        let chunk_end = chunk_start + size;
        if chunk_end > remaining.len() {
            result.push_str(&remaining[chunk_start..]);
            break;
        }
        result.push_str(&remaining[chunk_start..chunk_end]);
        remaining = remaining.get(chunk_end + 2..).unwrap_or("");
    }

    result
}

fn json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("not JSON ({}): {}", e, body))
}

fn decimal_str(value: &Value) -> f64 {
    value
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or_else(|| panic!("expected decimal string, got {}", value))
}

const LOADED_LEG: &str = r#"{
    "truck_identifier": "T-100",
    "kind": "LOADED",
    "origin": {"latitude": 32.7767, "longitude": -96.797},
    "destination": {"latitude": 35.4676, "longitude": -97.5164}
}"#;

/// Create a leg and drive it to `ROUTE_CALCULATED`; returns its id.
fn routed_leg(port: u16) -> String {
    let (status, body) = http_post(port, "/legs", LOADED_LEG);
    assert_eq!(status, 201, "create failed: {}", body);
    let id = json(&body)["id"].as_str().unwrap().to_string();

    let (status, body) = http_post(port, &format!("/legs/{}/route", id), "");
    assert_eq!(status, 200, "route failed: {}", body);
    id
}

/// Report window that certainly contains "now".
fn around_today() -> (String, String) {
    let today = time::OffsetDateTime::now_utc().date();
    (
        (today - time::Duration::days(1)).to_string(),
        (today + time::Duration::days(2)).to_string(),
    )
}

#[test]
fn health_returns_200_with_version() {
    let server = start_server();
    let (status, body) = http_get(server.port, "/health");
    assert_eq!(status, 200);
    let v = json(&body);
    assert_eq!(v["status"], "ok");
    assert_eq!(v["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn unknown_path_returns_json_404() {
    let server = start_server();
    let (status, body) = http_get(server.port, "/nope");
    assert_eq!(status, 404);
    assert_eq!(json(&body)["error"], "not found");
}

#[test]
fn full_lifecycle_over_http() {
    let server = start_server();
    let port = server.port;

    let (status, body) = http_post(port, "/legs", LOADED_LEG);
    assert_eq!(status, 201);
    let leg = json(&body);
    assert_eq!(leg["status"], "PENDING");
    let id = leg["id"].as_str().unwrap().to_string();

    let (status, body) = http_post(port, &format!("/legs/{}/route", id), "");
    assert_eq!(status, 200, "{}", body);
    let leg = json(&body);
    assert_eq!(leg["status"], "ROUTE_CALCULATED");
    assert_eq!(decimal_str(&leg["total_route_miles"]), 500.0);
    let rows = leg["route_miles_by_jurisdiction"].as_array().unwrap();
    assert_eq!(rows[0]["jurisdiction"], "TX");
    assert_eq!(decimal_str(&rows[0]["miles"]), 300.0);

    let (status, body) = http_post(
        port,
        &format!("/legs/{}/start", id),
        r#"{"starting_odometer": "100000"}"#,
    );
    assert_eq!(status, 200, "{}", body);
    assert_eq!(json(&body)["status"], "IN_PROGRESS");

    let (status, body) = http_post(
        port,
        &format!("/legs/{}/complete", id),
        r#"{"ending_odometer": "100510"}"#,
    );
    assert_eq!(status, 200, "{}", body);
    let leg = json(&body);
    assert_eq!(leg["status"], "COMPLETED");
    assert_eq!(leg["reconciliation"]["verdict"], "MATCH");

    let (status, body) = http_get(port, &format!("/legs/{}", id));
    assert_eq!(status, 200);
    assert_eq!(json(&body)["status"], "COMPLETED");

    let (from, to) = around_today();
    let (status, body) = http_get(port, &format!("/report?from={}&to={}", from, to));
    assert_eq!(status, 200, "{}", body);
    let report = json(&body);
    assert_eq!(decimal_str(&report["totals"]["route_miles"]), 500.0);
    assert_eq!(report["totals"]["jurisdiction_count"], 2);
    assert_eq!(report["legs"][0]["leg_id"], id.as_str());
    assert!(report["flagged_legs"].as_array().unwrap().is_empty());

    let (_, body) = http_get(port, "/reviews");
    assert_eq!(json(&body), serde_json::json!([]));
}

#[test]
fn completed_leg_rejects_further_transitions() {
    let server = start_server();
    let port = server.port;
    let id = routed_leg(port);

    assert_eq!(http_post(port, &format!("/legs/{}/start", id), "").0, 200);
    assert_eq!(http_post(port, &format!("/legs/{}/complete", id), "").0, 200);

    let (status, body) = http_post(port, &format!("/legs/{}/start", id), "");
    assert_eq!(status, 409);
    assert_eq!(json(&body)["code"], "STALE_STATE");

    let (status, _) = http_post(port, &format!("/legs/{}/route", id), "");
    assert_eq!(status, 409);
}

#[test]
fn start_before_route_is_conflict() {
    let server = start_server();
    let (status, body) = http_post(server.port, "/legs", LOADED_LEG);
    assert_eq!(status, 201);
    let id = json(&body)["id"].as_str().unwrap().to_string();

    let (status, body) = http_post(server.port, &format!("/legs/{}/start", id), "");
    assert_eq!(status, 409);
    assert_eq!(json(&body)["code"], "STALE_STATE");
}

#[test]
fn unknown_leg_returns_404() {
    let server = start_server();
    let (status, body) = http_get(server.port, "/legs/does-not-exist");
    assert_eq!(status, 404);
    assert_eq!(json(&body)["code"], "LEG_NOT_FOUND");
}

#[test]
fn invalid_leg_bodies_rejected() {
    let server = start_server();
    let (status, body) = http_post(server.port, "/legs", "not json");
    assert_eq!(status, 400);
    assert!(json(&body)["error"]
        .as_str()
        .unwrap()
        .contains("invalid request body"));

    let (status, body) = http_post(
        server.port,
        "/legs",
        r#"{"truck_identifier": "", "kind": "LOADED",
            "origin": {"latitude": 32.7767, "longitude": -96.797},
            "destination": {"latitude": 35.4676, "longitude": -97.5164}}"#,
    );
    assert_eq!(status, 400);
    assert_eq!(json(&body)["code"], "INVALID_REQUEST");
}

#[test]
fn explicit_deadhead_leg_is_refused() {
    let server = start_server();
    let (status, body) = http_post(
        server.port,
        "/legs",
        r#"{"truck_identifier": "T-100", "kind": "DEADHEAD_RETURN",
            "origin": {"latitude": 32.7767, "longitude": -96.797},
            "destination": {"latitude": 40.0, "longitude": -80.0}}"#,
    );
    assert_eq!(status, 400);
    assert_eq!(json(&body)["code"], "INVALID_REQUEST");
}

#[test]
fn odd_leg_id_on_disk_store_is_404() {
    let server = start_server_with(true);
    let (status, body) = http_get(server.port, "/legs/foo.bar");
    assert_eq!(status, 404, "{}", body);
    assert_eq!(json(&body)["code"], "LEG_NOT_FOUND");

    let (status, body) = http_post(
        server.port,
        "/reviews/foo.bar/resolve",
        r#"{"reviewer": "ops"}"#,
    );
    assert_eq!(status, 404, "{}", body);
    assert_eq!(json(&body)["code"], "REVIEW_NOT_FOUND");
}

#[test]
fn discrepancy_is_queued_and_resolved() {
    let server = start_server();
    let port = server.port;
    let id = routed_leg(port);

    http_post(
        port,
        &format!("/legs/{}/start", id),
        r#"{"starting_odometer": 100000}"#,
    );
    let (status, body) = http_post(
        port,
        &format!("/legs/{}/complete", id),
        r#"{"ending_odometer": 100050}"#,
    );
    assert_eq!(status, 200, "{}", body);
    let leg = json(&body);
    assert_eq!(leg["status"], "COMPLETED");
    assert_eq!(leg["reconciliation"]["verdict"], "DISCREPANCY");

    let (status, body) = http_get(port, "/reviews");
    assert_eq!(status, 200);
    let items = json(&body);
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["leg_id"], id.as_str());
    let review_id = items[0]["id"].as_str().unwrap().to_string();

    let (status, body) = http_post(
        port,
        &format!("/reviews/{}/resolve", review_id),
        r#"{"reviewer": "auditor", "note": "odometer swapped mid-trip"}"#,
    );
    assert_eq!(status, 200, "{}", body);
    assert_eq!(json(&body)["resolution"]["reviewer"], "auditor");

    let (status, body) = http_post(
        port,
        &format!("/reviews/{}/resolve", review_id),
        r#"{"reviewer": "auditor"}"#,
    );
    assert_eq!(status, 409);
    assert_eq!(json(&body)["code"], "REVIEW_ALREADY_RESOLVED");

    let (_, body) = http_get(port, "/reviews");
    assert_eq!(json(&body), serde_json::json!([]));
    let (_, body) = http_get(port, "/reviews?all=true");
    assert_eq!(json(&body).as_array().unwrap().len(), 1);

    // Resolution never touches the leg's mileage.
    let (_, body) = http_get(port, &format!("/legs/{}", id));
    assert_eq!(decimal_str(&json(&body)["total_route_miles"]), 500.0);
}

#[test]
fn deadhead_return_targets_terminal() {
    let server = start_server();
    let (status, body) = http_post(
        server.port,
        "/legs/deadhead-return",
        r#"{"truck_identifier": "T-100", "current_latitude": 29.7604,
            "current_longitude": -95.3698, "starting_odometer": "120000"}"#,
    );
    assert_eq!(status, 201, "{}", body);
    let leg = json(&body);
    assert_eq!(leg["kind"], "DEADHEAD_RETURN");
    assert_eq!(leg["status"], "PENDING");
    assert_eq!(leg["destination"]["latitude"], 35.4676);
    assert_eq!(leg["destination"]["longitude"], -97.5164);
    assert_eq!(leg["origin"]["latitude"], 29.7604);
}

#[test]
fn deadhead_return_rejects_bad_position() {
    let server = start_server();
    let (status, body) = http_post(
        server.port,
        "/legs/deadhead-return",
        r#"{"truck_identifier": "T-100", "current_latitude": 129.0, "current_longitude": -95.0}"#,
    );
    assert_eq!(status, 400);
    assert_eq!(json(&body)["code"], "INVALID_COORDINATE");
}

#[test]
fn report_requires_valid_dates() {
    let server = start_server();
    let (status, _) = http_get(server.port, "/report?from=2026-01-01");
    assert_eq!(status, 400);

    let (status, body) = http_get(server.port, "/report?from=2026-02-01&to=2026-01-01");
    assert_eq!(status, 400);
    assert_eq!(json(&body)["code"], "INVALID_SCOPE");

    let (status, body) = http_get(server.port, "/report?from=01/01/2026&to=2026-02-01");
    assert_eq!(status, 400);
    assert!(json(&body)["error"].as_str().unwrap().contains("YYYY-MM-DD"));
}

#[test]
fn cors_header_present() {
    let server = start_server();
    let (status, headers, _) =
        http_get_with_headers(server.port, "/health", &[("Origin", "http://example.com")]);
    assert_eq!(status, 200);
    assert_eq!(
        extract_header(&headers, "access-control-allow-origin"),
        Some("*")
    );
}
