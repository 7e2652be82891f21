//! Download tests against a local stand-in for the subset endpoint.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use cmems::{CmemsError, DownloadConfig, SubsetDownloader, SubsetRequest};
use rtdata_common::CmemsConfig;
use storage::{Manifest, CMEMS_FILES};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serves canned `(status, body)` responses, one per connection, and keeps
/// each request head.
async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();

    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            seen.lock()
                .unwrap()
                .push(String::from_utf8_lossy(&head).into_owned());

            let header = format!(
                "HTTP/1.1 {} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            socket.write_all(header.as_bytes()).await.unwrap();
            socket.write_all(body.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        }
    });

    (format!("http://{}/subset", addr), requests)
}

fn downloader(endpoint: &str, output_dir: &Path, max_retries: u32) -> SubsetDownloader {
    let cmems = CmemsConfig {
        endpoint: endpoint.to_string(),
        username: "user".to_string(),
        password: "pass".to_string(),
        max_retries,
        request_timeout_secs: 5,
        ..CmemsConfig::default()
    };
    let mut config = DownloadConfig::from_cmems(&cmems, output_dir);
    config.initial_retry_delay = Duration::from_millis(10);
    SubsetDownloader::new(config).unwrap()
}

fn requests() -> Vec<SubsetRequest> {
    let today = NaiveDate::from_ymd_opt(2025, 3, 16).unwrap();
    SubsetRequest::around_position(&CmemsConfig::default(), 49.0, -16.5, today).unwrap()
}

#[tokio::test]
async fn test_download_writes_file_and_sends_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let (endpoint, seen) = serve(vec![(200, "CDF\x01model")]).await;
    let model = &requests()[1];

    let path = downloader(&endpoint, dir.path(), 0)
        .download(model)
        .await
        .unwrap();

    assert_eq!(path, dir.path().join("2025-03-13_2025-03-18_model_currents.nc"));
    assert_eq!(std::fs::read(&path).unwrap(), b"CDF\x01model");
    assert!(!dir
        .path()
        .join("2025-03-13_2025-03-18_model_currents.nc.partial")
        .exists());

    let head = seen.lock().unwrap()[0].clone();
    assert!(head.starts_with("GET /subset?dataset_id=cmems_mod_glo_phy-cur_anfc"));
    assert!(head.contains("variable=uo&variable=vo"));
    assert!(head.contains("maximum_depth=1100"));
    // base64("user:pass")
    assert!(head.contains("dXNlcjpwYXNz"));
}

#[tokio::test]
async fn test_download_all_registers_file_names() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("cmems_prod_config.json");
    let (endpoint, _) = serve(vec![(200, "obs"), (200, "model")]).await;

    let paths = downloader(&endpoint, dir.path(), 0)
        .download_all(&requests(), &manifest)
        .await
        .unwrap();

    assert_eq!(paths.len(), 2);
    let saved = Manifest::load(&manifest).unwrap();
    assert_eq!(
        saved.category(CMEMS_FILES),
        vec![
            "2025-03-13_2025-03-18_obs_currents.nc",
            "2025-03-13_2025-03-18_model_currents.nc"
        ]
    );
}

#[tokio::test]
async fn test_unavailable_service_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let (endpoint, seen) = serve(vec![(503, "maintenance"), (200, "obs")]).await;

    let path = downloader(&endpoint, dir.path(), 3)
        .download(&requests()[0])
        .await
        .unwrap();

    assert_eq!(std::fs::read(path).unwrap(), b"obs");
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_bad_credentials_fail_without_retry() {
    let dir = tempfile::tempdir().unwrap();
    let (endpoint, seen) = serve(vec![(401, "unauthorised"), (200, "obs")]).await;

    let result = downloader(&endpoint, dir.path(), 3)
        .download(&requests()[0])
        .await;

    assert!(matches!(result, Err(CmemsError::Http { status: 401, .. })));
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_existing_file_is_not_fetched_again() {
    let dir = tempfile::tempdir().unwrap();
    let existing = dir.path().join("2025-03-13_2025-03-18_obs_currents.nc");
    std::fs::write(&existing, b"already here").unwrap();
    let (endpoint, seen) = serve(vec![(200, "new")]).await;

    let path = downloader(&endpoint, dir.path(), 0)
        .download(&requests()[0])
        .await
        .unwrap();

    assert_eq!(path, existing);
    assert_eq!(std::fs::read(path).unwrap(), b"already here");
    assert!(seen.lock().unwrap().is_empty());
}
