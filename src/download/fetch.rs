use std::path::PathBuf;

use reqwest::{Client, Url};
use tracing::{debug, warn};

use crate::error::{ConnectorError, Result};
use crate::log::SharedSink;
use crate::store::artifacts::ArtifactStore;

/// Fetches URL-referenced resources into the artifact store. The device
/// advertises URLs under its own (often unresolvable) dynamic hostname, so a
/// failed fetch is retried once with the session's device host substituted.
pub struct Downloader {
    client: Client,
    store: ArtifactStore,
    device_host: String,
    sink: SharedSink,
}

impl Downloader {
    pub fn new(store: ArtifactStore, device_host: impl Into<String>, sink: SharedSink) -> Self {
        Self {
            client: Client::new(),
            store,
            device_host: device_host.into(),
            sink,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Download `raw_url` (scheme-less, as pushed by the device) into
    /// `<artifact_root>/<session_id>/<filename>`.
    pub async fn download(
        &self,
        raw_url: &str,
        session_id: &str,
        filename: &str,
    ) -> Result<PathBuf> {
        let url = Url::parse(&format!("http://{raw_url}"))
            .map_err(|e| ConnectorError::Protocol(format!("{raw_url} is not a valid URL: {e}")))?;

        let bytes = match self.fetch(url.clone()).await {
            Ok(bytes) => bytes,
            Err(err) => {
                // Advertised host unreachable — substitute the device host.
                self.sink.log(&format!(
                    "Unknown host: {}",
                    url.host_str().unwrap_or("<none>")
                ));
                self.sink
                    .log(&format!("Trying to download from {}", self.device_host));
                let mut fallback = url;
                fallback
                    .set_host(Some(&self.device_host))
                    .map_err(|_| err)?;
                self.fetch(fallback).await?
            }
        };

        let path = self.store.write_artifact(session_id, filename, &bytes)?;
        self.sink.log(&format!("Downloaded {filename}"));
        debug!(session_id, filename, bytes = bytes.len(), "artifact stored");
        Ok(path)
    }

    async fn fetch(&self, url: Url) -> Result<bytes::Bytes> {
        let resp = self.client.get(url.clone()).send().await.map_err(|e| {
            warn!(%url, "fetch failed: {e}");
            ConnectorError::Transport(format!("could not download {url}: {e}"))
        })?;
        if !resp.status().is_success() {
            return Err(ConnectorError::Transport(format!(
                "could not download {url}: HTTP {}",
                resp.status().as_u16()
            )));
        }
        Ok(resp.bytes().await?)
    }
}
