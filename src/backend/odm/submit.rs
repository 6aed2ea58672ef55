// Remote job submission — synthesizes calibration parameters, uploads photos
// and control files, and commits the task.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::config::CoordRemap;
use crate::error::{ConnectorError, Result};
use crate::log::SharedSink;
use crate::model::SessionModel;

use super::api::OdmApi;
use super::{exif, files};

/// Local submission states. `Committed` is terminal here; everything after
/// belongs to the backend and is tracked by the job monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Building,
    TaskInitialized,
    Uploading,
    Committed,
}

pub struct JobSubmitter<'a> {
    api: &'a OdmApi,
    remap: &'a CoordRemap,
    webhook_url: &'a str,
    sink: &'a SharedSink,
}

impl<'a> JobSubmitter<'a> {
    pub fn new(
        api: &'a OdmApi,
        remap: &'a CoordRemap,
        webhook_url: &'a str,
        sink: &'a SharedSink,
    ) -> Self {
        Self {
            api,
            remap,
            webhook_url,
            sink,
        }
    }

    /// Run the whole submission, returning the backend's task uuid. Any
    /// non-success HTTP status aborts; partial uploads are not rolled back.
    pub async fn run(&self, model: &SessionModel) -> Result<String> {
        let mut state = SubmitState::Building;
        debug!(?state, name = %model.folder_name(), "building task request");

        let uuid = self.init_task(model).await?;
        state = SubmitState::TaskInitialized;
        debug!(?state, %uuid, "task created");
        self.sink.log(&format!("Task ID: {uuid}"));

        state = SubmitState::Uploading;
        debug!(?state, %uuid, "uploading artifacts");
        self.upload_artifacts(model, &uuid).await?;

        self.api
            .post_fields(&format!("/task/new/commit/{uuid}"), &[])
            .await?;
        state = SubmitState::Committed;
        debug!(?state, %uuid, "submission complete");
        self.sink.log(&format!("Task {uuid} committed"));

        Ok(uuid)
    }

    async fn init_task(&self, model: &SessionModel) -> Result<String> {
        let options = json!([
            {
                "name": "cameras",
                "value": camera_blocks(model).to_string(),
            }
        ]);

        let response = self
            .api
            .post_fields(
                "/task/new/init",
                &[
                    ("name", model.folder_name()),
                    ("options", options.to_string()),
                    ("webhook", self.webhook_url.to_string()),
                ],
            )
            .await?;

        response["uuid"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ConnectorError::Protocol("task init response without uuid".to_string()))
    }

    /// Stage, upload and clean up. The staging directory is removed whether
    /// the uploads succeeded or not.
    async fn upload_artifacts(&self, model: &SessionModel, uuid: &str) -> Result<()> {
        let work_dir = work_dir_for(uuid);
        fs::create_dir_all(&work_dir).map_err(|e| ConnectorError::data("upload", e))?;

        let result = self.upload_all(model, uuid, &work_dir).await;
        let _ = fs::remove_dir_all(&work_dir);
        result
    }

    async fn upload_all(&self, model: &SessionModel, uuid: &str, work_dir: &Path) -> Result<()> {
        let upload_path = format!("/task/new/upload/{uuid}");

        for image in &model.images {
            let camera = model.camera_of(image);
            let source = exif::rewrite_or_original(image, camera, work_dir);
            let data = fs::read(&source).map_err(|e| ConnectorError::data(image.file_name(), e))?;
            // Always under the original filename, whatever copy was chosen.
            self.api
                .upload_file(&upload_path, &image.file_name(), data)
                .await?;
        }

        let unsurveyed = model
            .markers
            .iter()
            .filter(|m| m.coordinate.is_none() && !m.positions.is_empty())
            .count();
        if unsurveyed > 0 {
            self.sink
                .log(&format!("{unsurveyed} unsurveyed markers left out of GCP file"));
        }
        let gcp = files::gcp_file(model, self.remap);
        self.api
            .upload_file(&upload_path, "gcp_file.txt", gcp.into_bytes())
            .await?;

        let geo = files::geo_file(model, self.remap);
        self.api
            .upload_file(&upload_path, "geo.txt", geo.into_bytes())
            .await?;

        Ok(())
    }
}

/// One calibration block per distinct camera signature. The signature encodes
/// the nominal identity, pixel dimensions, projection model and the rounded
/// 35 mm-equivalent focal ratio; all parameter values are divided by the
/// sensor width to match the backend's dimensionless units.
fn camera_blocks(model: &SessionModel) -> Value {
    let mut blocks = Map::new();

    for image in &model.images {
        let camera = model.camera_of(image);
        let width = camera.width() as f64;
        let focal = camera.focal_length(image.lens_position);
        let (ppx, ppy) = camera.principal_point(image.lens_position);
        let k = camera.radial(image.lens_position);
        let p = camera.tangential(image.lens_position);

        let f35 = (focal * 36.0 / width).round();
        let f_ratio = (f35 / 36.0 * 100.0).round() / 100.0;
        let signature = format!(
            "raspberry pi {} {} {} brown {}",
            camera.name,
            camera.width(),
            camera.height(),
            f_ratio
        );

        blocks.entry(signature).or_insert_with(|| {
            json!({
                "projection_type": "brown",
                "width": camera.width(),
                "height": camera.height(),
                "focal_x": focal / width,
                "focal_y": focal / width,
                "c_x": ppx / width,
                "c_y": ppy / width,
                "k1": k[0],
                "k2": k[1],
                "k3": k[2],
                "p1": p[0],
                "p2": p[1],
            })
        });
    }

    Value::Object(blocks)
}

/// Where uploads for a task are staged; exposed for cleanup in tests.
pub fn work_dir_for(uuid: &str) -> PathBuf {
    std::env::temp_dir().join(format!("photobox-upload-{uuid}"))
}
