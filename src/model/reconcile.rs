// Folder reconciliation — turns a session directory of loosely-correlated
// files into the camera/image/marker graph.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::{ConnectorError, Result};
use crate::log::SharedSink;

use super::{Camera, CameraPosition, Image, Marker, MarkerPosition, SessionModel};

#[derive(Debug, Deserialize)]
struct PoseEntry {
    x: f64,
    y: f64,
    z: f64,
    yaw: f64,
    pitch: f64,
    roll: f64,
}

#[derive(Debug, Deserialize)]
struct MetaEntry {
    #[serde(rename = "LensPosition")]
    lens_position: f64,
}

#[derive(Debug, Deserialize)]
struct DetectionEntry {
    id: i32,
    corner: i32,
    x: f64,
    y: f64,
    /// Basename of the image the detection was made in. Older rig firmware
    /// omits it; those detections fall back to the camera's first image.
    image: Option<String>,
}

/// Build the session model from a directory. Pure with respect to the
/// directory contents; any malformed artifact or dangling reference aborts
/// reconciliation and the partial model is discarded.
pub fn read_folder(dir: &Path, sink: &SharedSink) -> Result<SessionModel> {
    let positions = read_camera_positions(dir, sink)?;
    let lens_positions = read_lens_positions(dir)?;

    let mut model = SessionModel::new(dir);
    read_photos(dir, &positions, &lens_positions, &mut model, sink)?;
    read_marker_coordinates(dir, &mut model, sink)?;
    read_marker_positions(dir, &mut model, sink)?;

    sink.log(&format!(
        "{}: {} cameras, {} images, {} markers",
        model.folder_name(),
        model.cameras.len(),
        model.images.len(),
        model.markers.len()
    ));
    Ok(model)
}

fn read_json<T: serde::de::DeserializeOwned>(dir: &Path, filename: &str) -> Result<T> {
    let content =
        fs::read_to_string(dir.join(filename)).map_err(|e| ConnectorError::data(filename, e))?;
    serde_json::from_str(&content).map_err(|e| ConnectorError::data(filename, e))
}

/// `cameras.json`: hostname → surveyed pose. Optional — a session without
/// surveyed positions is still processable.
fn read_camera_positions(dir: &Path, sink: &SharedSink) -> Result<HashMap<String, CameraPosition>> {
    if !dir.join("cameras.json").is_file() {
        sink.log("No camera positions available");
        return Ok(HashMap::new());
    }
    sink.log("Adding camera positions");
    let entries: HashMap<String, PoseEntry> = read_json(dir, "cameras.json")?;
    Ok(entries
        .into_iter()
        .map(|(hostname, p)| {
            (
                hostname,
                CameraPosition {
                    x: p.x,
                    y: p.y,
                    z: p.z,
                    roll: p.roll,
                    pitch: p.pitch,
                    yaw: p.yaw,
                },
            )
        })
        .collect())
}

/// `meta.json`: image basename (no extension) → focus-motor reading.
fn read_lens_positions(dir: &Path) -> Result<HashMap<String, f64>> {
    let entries: HashMap<String, MetaEntry> = read_json(dir, "meta.json")?;
    Ok(entries
        .into_iter()
        .map(|(name, m)| (name, m.lens_position))
        .collect())
}

/// Strip a trailing `.jpg` case-insensitively; `meta.json` keys image
/// basenames without the extension.
fn basename_of(filename: &str) -> &str {
    let Some((idx, _)) = filename.char_indices().rev().nth(3) else {
        return filename;
    };
    if filename[idx..].eq_ignore_ascii_case(".jpg") {
        &filename[..idx]
    } else {
        filename
    }
}

/// Camera name of an image file: filename up to the last `_`, or — without an
/// underscore — up to the last `.`.
pub fn camera_name_of(filename: &str) -> &str {
    if let Some(idx) = filename.rfind('_') {
        &filename[..idx]
    } else if let Some(idx) = filename.rfind('.') {
        &filename[..idx]
    } else {
        filename
    }
}

fn read_photos(
    dir: &Path,
    positions: &HashMap<String, CameraPosition>,
    lens_positions: &HashMap<String, f64>,
    model: &mut SessionModel,
    sink: &SharedSink,
) -> Result<()> {
    sink.log("Adding photos");

    let mut photos: Vec<_> = fs::read_dir(dir)
        .map_err(|e| ConnectorError::data(dir.display().to_string(), e))?
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .map(|n| n.to_string_lossy().to_lowercase().ends_with(".jpg"))
                    .unwrap_or(false)
        })
        .collect();
    // Directory iteration order is filesystem-dependent; sort for determinism.
    photos.sort();

    for path in photos {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let basename = basename_of(&filename);
        let hostname = camera_name_of(&filename).to_string();

        let camera_id = match model.camera_by_name(&hostname) {
            Some(id) => id,
            None => {
                let mut camera = Camera::new(hostname.clone());
                camera.position = positions.get(&hostname).copied();
                model.cameras.push(camera);
                model.cameras.len() - 1
            }
        };

        // Per-image reading when present; the rig writes some firmware
        // versions keyed by hostname instead.
        let lens_position = lens_positions
            .get(basename)
            .or_else(|| lens_positions.get(&hostname))
            .copied()
            .unwrap_or(0.0);

        let image = Image::new(&path, camera_id, lens_position);
        model.images.push(image);
        let image_id = model.images.len() - 1;
        model.cameras[camera_id].images.push(image_id);
    }
    Ok(())
}

/// `marker.json`: marker id → edge id → [x, y, z]. One marker per (id, edge).
fn read_marker_coordinates(dir: &Path, model: &mut SessionModel, sink: &SharedSink) -> Result<()> {
    sink.log("Adding marker coordinates");
    let entries: HashMap<String, HashMap<String, [f64; 3]>> = read_json(dir, "marker.json")?;

    for (marker_key, edges) in entries {
        let marker_id: i32 = marker_key
            .parse()
            .map_err(|_| ConnectorError::data("marker.json", format!("bad id {marker_key}")))?;
        for (edge_key, coord) in edges {
            let edge_id: i32 = edge_key.parse().map_err(|_| {
                ConnectorError::data("marker.json", format!("bad edge id {edge_key}"))
            })?;
            model
                .markers
                .push(Marker::new(marker_id, edge_id, Some(coord)));
        }
    }
    Ok(())
}

/// `aruco.json`: hostname → list of corner detections. Each detection becomes
/// one MarkerPosition on its marker.
fn read_marker_positions(dir: &Path, model: &mut SessionModel, sink: &SharedSink) -> Result<()> {
    sink.log("Adding marker positions");
    let entries: HashMap<String, Vec<DetectionEntry>> = read_json(dir, "aruco.json")?;

    for (hostname, detections) in entries {
        let camera_id = model
            .camera_by_name(&hostname)
            .ok_or_else(|| ConnectorError::data("aruco.json", format!("camera {hostname} not found")))?;

        for det in detections {
            let image_id = resolve_image(model, camera_id, det.image.as_deref(), sink)?;

            let marker_idx = match model
                .markers
                .iter()
                .position(|m| m.marker_id == det.id && m.edge_id == det.corner)
            {
                Some(idx) => idx,
                None => {
                    // Detection without a surveyed coordinate: keep it as a
                    // placeholder so the observation is not lost.
                    sink.log(&format!("{}-{} not found", det.id, det.corner));
                    warn!(marker = det.id, edge = det.corner, "unsurveyed marker");
                    model.markers.push(Marker::new(det.id, det.corner, None));
                    model.markers.len() - 1
                }
            };

            model.markers[marker_idx].positions.push(MarkerPosition {
                image: image_id,
                x: det.x,
                y: det.y,
            });
        }
    }
    Ok(())
}

/// Pick the image a detection belongs to: the explicitly referenced one when
/// the record carries it, otherwise the camera's first image.
fn resolve_image(
    model: &SessionModel,
    camera_id: usize,
    image_ref: Option<&str>,
    sink: &SharedSink,
) -> Result<usize> {
    if let Some(basename) = image_ref {
        if let Some(id) = model.cameras[camera_id].images.iter().copied().find(|&i| {
            let name = model.images[i].file_name();
            basename_of(&name) == basename
        }) {
            return Ok(id);
        }
        sink.log(&format!("{basename} not found, using first image"));
    }
    model.cameras[camera_id]
        .images
        .first()
        .copied()
        .ok_or_else(|| {
            ConnectorError::data(
                "aruco.json",
                format!("camera {} has no images", model.cameras[camera_id].name),
            )
        })
}
