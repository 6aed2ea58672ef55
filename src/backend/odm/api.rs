// Thin REST client for the OpenDroneMap node API.

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;

use crate::error::{ConnectorError, Result};

pub struct OdmApi {
    client: Client,
    base_url: String,
}

impl OdmApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a JSON document, e.g. `/info` or `/task/{uuid}/info`.
    pub async fn get_json(&self, path: &str) -> Result<Value> {
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        Self::decode(path, resp).await
    }

    /// POST multipart text fields, e.g. the task-init parameters or the bare
    /// commit request.
    pub async fn post_fields(&self, path: &str, fields: &[(&str, String)]) -> Result<Value> {
        let mut form = Form::new();
        for (name, value) in fields {
            form = form.text(name.to_string(), value.clone());
        }
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .multipart(form)
            .send()
            .await?;
        Self::decode(path, resp).await
    }

    /// POST one file under the backend's `images` multipart field.
    pub async fn upload_file(&self, path: &str, filename: &str, data: Vec<u8>) -> Result<Value> {
        let part = Part::bytes(data).file_name(filename.to_string());
        let form = Form::new().part("images", part);
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .multipart(form)
            .send()
            .await?;
        Self::decode(path, resp).await
    }

    async fn decode(path: &str, resp: reqwest::Response) -> Result<Value> {
        let status = resp.status();
        if !status.is_success() {
            return Err(ConnectorError::backend(path, status.as_u16()));
        }
        resp.json()
            .await
            .map_err(|e| ConnectorError::Protocol(format!("bad response from {path}: {e}")))
    }
}
