use std::path::PathBuf;

use super::CameraId;

/// One photo file, owned by exactly one camera. The camera reference is fixed
/// at construction; derived intrinsics are pure functions of the camera's
/// calibration and this image's lens position.
#[derive(Debug, Clone)]
pub struct Image {
    pub path: PathBuf,
    pub camera: CameraId,
    /// Focus-motor reading at capture time.
    pub lens_position: f64,
    /// Numeric id assigned by a backend after submission.
    pub backend_id: Option<i32>,
}

impl Image {
    pub fn new(path: impl Into<PathBuf>, camera: CameraId, lens_position: f64) -> Self {
        Self {
            path: path.into(),
            camera,
            lens_position,
            backend_id: None,
        }
    }

    /// Filename of the photo as uploaded to a backend.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
