// EXIF rewriting for uploaded photos. OpenSfM derives the sensor model from
// the 35 mm-equivalent focal length and the model tag, so both are injected
// into a side-by-side copy before upload.

use std::fs;
use std::path::{Path, PathBuf};

use little_exif::exif_tag::ExifTag;
use little_exif::metadata::Metadata;
use tracing::warn;

use crate::error::{ConnectorError, Result};
use crate::model::{Camera, Image};

/// 35 mm-equivalent focal length for an image: `round(focal_px / width * 36)`.
pub fn focal_35mm(camera: &Camera, lens_position: f64) -> u16 {
    (camera.focal_length(lens_position) / camera.width() as f64 * 36.0).round() as u16
}

/// Write a modified copy of the photo into `work_dir` with the derived
/// 35 mm focal length and the camera name injected. The copy keeps the
/// original filename so the backend sees consistent names.
pub fn rewrite(image: &Image, camera: &Camera, work_dir: &Path) -> Result<PathBuf> {
    let copy = work_dir.join(image.file_name());
    fs::copy(&image.path, &copy).map_err(|e| ConnectorError::data(image.file_name(), e))?;

    let mut metadata = Metadata::new_from_path(&copy)
        .map_err(|e| ConnectorError::data(image.file_name(), format!("read exif: {e:?}")))?;
    metadata.set_tag(ExifTag::FocalLengthIn35mmFormat(vec![focal_35mm(
        camera,
        image.lens_position,
    )]));
    metadata.set_tag(ExifTag::Model(camera.name.clone()));
    metadata
        .write_to_file(&copy)
        .map_err(|e| ConnectorError::data(image.file_name(), format!("write exif: {e:?}")))?;

    Ok(copy)
}

/// Like [`rewrite`], but falls back to the untouched original when the photo
/// carries no parsable EXIF block. The upload still happens; only the
/// injected hints are lost.
pub fn rewrite_or_original(image: &Image, camera: &Camera, work_dir: &Path) -> PathBuf {
    match rewrite(image, camera, work_dir) {
        Ok(copy) => copy,
        Err(e) => {
            warn!(image = %image.file_name(), "exif rewrite failed, uploading original: {e}");
            image.path.clone()
        }
    }
}
