// Downloader behavior: storage layout and the device-host fallback for
// unresolvable advertised hostnames.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use photobox_connector::download::Downloader;
use photobox_connector::error::ConnectorError;
use photobox_connector::log::MemorySink;
use photobox_connector::store::artifacts::ArtifactStore;

async fn start_server(body: &'static str) -> u16 {
    let app = Router::new().route("/meta.json", get(move || async move { body }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    port
}

#[tokio::test]
async fn downloads_into_session_directory() {
    let port = start_server("{\"a\": 1}").await;
    let tmp = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let downloader = Downloader::new(ArtifactStore::new(tmp.path()), "127.0.0.1", sink);

    let path = downloader
        .download(&format!("127.0.0.1:{port}/meta.json"), "s1", "meta.json")
        .await
        .unwrap();

    assert_eq!(path, tmp.path().join("s1").join("meta.json"));
    assert_eq!(std::fs::read_to_string(path).unwrap(), "{\"a\": 1}");
}

#[tokio::test]
async fn falls_back_to_device_host_when_advertised_host_is_unreachable() {
    let port = start_server("fallback content").await;
    let tmp = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let downloader = Downloader::new(ArtifactStore::new(tmp.path()), "127.0.0.1", sink.clone());

    // `.invalid` never resolves; the downloader must retry against the
    // device host, keeping the advertised port and path.
    let path = downloader
        .download(
            &format!("photobox.invalid:{port}/meta.json"),
            "s1",
            "meta.json",
        )
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(path).unwrap(), "fallback content");
    assert!(sink.contains("Trying to download from 127.0.0.1"));
}

#[tokio::test]
async fn unreachable_host_without_fallback_is_a_transport_error() {
    let tmp = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    // Device host is equally unreachable.
    let downloader = Downloader::new(
        ArtifactStore::new(tmp.path()),
        "also-unreachable.invalid",
        sink,
    );

    let err = downloader
        .download("photobox.invalid:19999/meta.json", "s1", "meta.json")
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::Transport(_)), "{err:?}");
}
