//! Integration tests for the running server.
#![cfg(test)]

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use hyper::{Body, Client, Method, Response, StatusCode};
use hyper::body::to_bytes;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use zip::write::FileOptions;
use crate::config::Config;
use crate::http::{
    ActionError, ActionRegistry, ActionResult, ContentType, Request,
    ServerHandle, http_listener,
};

const USERNAME: &str = "admin";
const PASSWORD: &str = "swordfish";


//------------ Helpers -------------------------------------------------------

fn ui_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("index.html"), b"<html>capstan</html>"
    ).unwrap();
    fs::write(dir.path().join("style.css"), b"body {}").unwrap();
    fs::write(dir.path().join("logo.gif"), b"GIF89a").unwrap();
    dir
}

fn test_config(ui_dir: &Path) -> Config {
    Config {
        listen: "127.0.0.1:0".parse().unwrap(),
        username: USERNAME.into(),
        password: PASSWORD.into(),
        ui_dir: ui_dir.into(),
        .. Default::default()
    }
}

fn start(
    registry: ActionRegistry,
    config: &Config,
) -> (ServerHandle, JoinHandle<()>) {
    let (handle, server) = http_listener(registry, config).unwrap();
    (handle, tokio::spawn(server))
}

async fn request(
    handle: &ServerHandle,
    method: Method,
    path: &str,
    auth: Option<(&str, &str)>,
) -> Response<Body> {
    let uri = format!("http://{}{}", handle.local_addr(), path);
    let mut req = hyper::Request::builder()
        .method(method)
        .uri(uri)
        .header("Connection", "close");
    if let Some((username, password)) = auth {
        req = req.header(
            "Authorization",
            format!(
                "Basic {}",
                base64::encode(format!("{}:{}", username, password))
            ),
        );
    }
    Client::new()
        .request(req.body(Body::empty()).unwrap())
        .await.unwrap()
}

async fn get(
    handle: &ServerHandle,
    path: &str,
    auth: Option<(&str, &str)>,
) -> Response<Body> {
    request(handle, Method::GET, path, auth).await
}

async fn body_string(response: Response<Body>) -> String {
    String::from_utf8(
        to_bytes(response.into_body()).await.unwrap().to_vec()
    ).unwrap()
}

fn creds() -> Option<(&'static str, &'static str)> {
    Some((USERNAME, PASSWORD))
}


//------------ Authentication ------------------------------------------------

#[tokio::test]
async fn rejects_requests_without_valid_credentials() {
    let dir = ui_dir();
    let (handle, _server) = start(
        ActionRegistry::new(), &test_config(dir.path())
    );
    for path in ["/", "/api?action=gettoken", "/style.css", "/nope"] {
        let response = get(&handle, path, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let response = get(&handle, "/", Some((USERNAME, "wrong"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = get(&handle, "/", Some(("wrong", PASSWORD))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = request(
        &handle, Method::POST, "/api?action=gettoken", None
    ).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get(&handle, "/", None).await;
    assert_eq!(
        response.headers().get("Content-Type").unwrap(), "text/html"
    );
    assert_eq!(
        body_string(response).await, "<h1>401 - Unauthorized</h1>"
    );
    handle.stop();
}


//------------ The token action ----------------------------------------------

#[tokio::test]
async fn gettoken_returns_a_fresh_token() {
    let dir = ui_dir();
    let (handle, _server) = start(
        ActionRegistry::new(), &test_config(dir.path())
    );
    let response = get(&handle, "/api?action=gettoken", creds()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("Content-Type").unwrap(),
        "application/json"
    );
    let value: serde_json::Value = serde_json::from_str(
        &body_string(response).await
    ).unwrap();
    let token = value.as_str().unwrap();
    assert_eq!(token.len(), 40);
    assert!(token.chars().all(|ch| ch.is_ascii_alphanumeric()));

    // The trailing slash variant of the API path works as well.
    let response = get(&handle, "/api/?action=gettoken", creds()).await;
    assert_eq!(response.status(), StatusCode::OK);
    handle.stop();
}


//------------ Action dispatch -----------------------------------------------

#[tokio::test]
async fn dispatches_to_registered_actions() {
    let dir = ui_dir();
    let mut registry = ActionRegistry::new();
    registry.register("version", |_: &Request| {
        Ok(ActionResult::json(serde_json::json!({ "version": "0.3.0" })))
    }).unwrap();
    registry.register("pause", |request: &Request| {
        match request.query_param("hash") {
            Some(hash) => Ok(ActionResult::content(
                format!("paused {}", hash), ContentType::TEXT
            )),
            None => Err(ActionError::new("missing hash parameter")),
        }
    }).unwrap();
    let (handle, _server) = start(registry, &test_config(dir.path()));

    let response = get(&handle, "/api?action=version", creds()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("0.3.0"));

    let response = get(
        &handle, "/api?action=pause&hash=abc123", creds()
    ).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "paused abc123");

    // POST dispatches just like GET.
    let response = request(
        &handle, Method::POST, "/api?action=version", creds()
    ).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&handle, "/api?action=unknown", creds()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "404 - File not found");

    // Without an action parameter the API path is just a missing file.
    let response = get(&handle, "/api", creds()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = get(&handle, "/api?action=", creds()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    handle.stop();
}

#[tokio::test]
async fn failing_action_reports_the_message() {
    let dir = ui_dir();
    let mut registry = ActionRegistry::new();
    registry.register("fail", |_: &Request| {
        Err::<ActionResult, _>(ActionError::new("tracker exploded"))
    }).unwrap();
    let (handle, _server) = start(registry, &test_config(dir.path()));

    let response = get(&handle, "/api?action=fail", creds()).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers().get("Content-Type").unwrap(), "text/html"
    );
    let body = body_string(response).await;
    assert!(body.contains("tracker exploded"));
    assert!(body.contains("Internal Server Error"));
    handle.stop();
}


//------------ Static content ------------------------------------------------

#[tokio::test]
async fn serves_static_files() {
    let dir = ui_dir();
    let (handle, _server) = start(
        ActionRegistry::new(), &test_config(dir.path())
    );

    let response = get(&handle, "/", creds()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("Content-Type").unwrap(), "text/html"
    );
    assert_eq!(body_string(response).await, "<html>capstan</html>");

    let response = get(&handle, "/style.css", creds()).await;
    assert_eq!(
        response.headers().get("Content-Type").unwrap(), "text/css"
    );

    let response = get(&handle, "/logo.gif", creds()).await;
    assert_eq!(
        response.headers().get("Content-Type").unwrap(), "image/gif"
    );

    let response = get(&handle, "/missing.html", creds()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    handle.stop();
}

#[tokio::test]
async fn serves_from_a_staged_archive() {
    let dir = TempDir::new().unwrap();
    let file = fs::File::create(dir.path().join("webui.zip")).unwrap();
    let mut archive = zip::ZipWriter::new(file);
    archive.start_file("index.html", FileOptions::default()).unwrap();
    archive.write_all(b"<html>staged ui</html>").unwrap();
    archive.finish().unwrap();

    let (handle, _server) = start(
        ActionRegistry::new(), &test_config(dir.path())
    );
    let response = get(&handle, "/", creds()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "<html>staged ui</html>");
    handle.stop();
}


//------------ Concurrency ---------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_actions_do_not_interfere() {
    let dir = ui_dir();
    let mut registry = ActionRegistry::new();
    registry.register("slow", |_: &Request| {
        std::thread::sleep(Duration::from_millis(300));
        Ok(ActionResult::json("done".to_string()))
    }).unwrap();
    registry.register("boom", |_: &Request| {
        Err::<ActionResult, _>(ActionError::new("no such torrent"))
    }).unwrap();
    let (handle, _server) = start(registry, &test_config(dir.path()));

    let (slow, boom) = tokio::join!(
        get(&handle, "/api?action=slow", creds()),
        get(&handle, "/api?action=boom", creds()),
    );
    assert_eq!(slow.status(), StatusCode::OK);
    assert_eq!(boom.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_string(boom).await.contains("no such torrent"));

    // The loop keeps serving afterwards.
    let response = get(&handle, "/api?action=gettoken", creds()).await;
    assert_eq!(response.status(), StatusCode::OK);
    handle.stop();
}


//------------ Lifecycle -----------------------------------------------------

#[tokio::test]
async fn stop_terminates_a_pending_accept() {
    let dir = ui_dir();
    let config = test_config(dir.path());
    let (handle, server) = start(ActionRegistry::new(), &config);

    let response = get(&handle, "/", creds()).await;
    assert_eq!(response.status(), StatusCode::OK);

    // No request in flight, so the server sits in accept. Stopping must
    // end the future without an error and stopping twice is fine.
    handle.stop();
    handle.stop();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await.unwrap().unwrap();

    // A fresh instance starts and serves again.
    let (handle, server) = start(ActionRegistry::new(), &config);
    let response = get(&handle, "/", creds()).await;
    assert_eq!(response.status(), StatusCode::OK);
    handle.stop();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await.unwrap().unwrap();
}

#[tokio::test]
async fn metrics_count_requests() {
    let dir = ui_dir();
    let (handle, _server) = start(
        ActionRegistry::new(), &test_config(dir.path())
    );
    assert_eq!(handle.metrics().requests(), 0);
    get(&handle, "/", creds()).await;
    get(&handle, "/", None).await;
    assert_eq!(handle.metrics().requests(), 2);
    assert!(handle.metrics().conn_open() >= 1);
    assert!(handle.metrics().bytes_written() > 0);
    handle.stop();
}
