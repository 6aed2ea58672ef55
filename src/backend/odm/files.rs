// Generated text artifacts for the backend: ground-control-point file and
// camera geo-referencing file.

use crate::config::{CoordRemap, CRS_HEADER};
use crate::model::SessionModel;

/// Build `gcp_file.txt`: the CRS header, then one line per marker observation
/// `X' Y' Z' pixelX pixelY imageFilename label`, with the marker coordinate
/// remapped into the projected frame. Placeholder markers have no surveyed
/// coordinate and are left out; fabricating (0, 0, 0) for them would corrupt
/// the georeference.
pub fn gcp_file(model: &SessionModel, remap: &CoordRemap) -> String {
    let mut out = String::from(CRS_HEADER);
    out.push('\n');

    for marker in &model.markers {
        let Some([mx, my, mz]) = marker.coordinate else {
            continue;
        };
        let (x, y, z) = remap.apply(mx, my, mz);
        for pos in &marker.positions {
            let image = &model.images[pos.image];
            let camera = model.camera_of(image);
            out.push_str(&format!(
                "{} {} {} {} {} {} {}\n",
                x,
                y,
                z,
                pos.x,
                pos.y,
                image.file_name(),
                marker.label(&camera.name),
            ));
        }
    }
    out
}

/// Build `geo.txt`: the CRS header, then one line per image whose camera has
/// a surveyed position: `filename X' Y' Z' yaw pitch roll horizAcc vertAcc`.
/// Angles are scaled from radians by 180 and accuracies are fixed
/// placeholders, matching what the backend expects.
pub fn geo_file(model: &SessionModel, remap: &CoordRemap) -> String {
    let mut out = String::from(CRS_HEADER);
    out.push('\n');

    for image in &model.images {
        let camera = model.camera_of(image);
        let Some(pos) = camera.position else {
            continue;
        };
        let (x, y, z) = remap.apply(pos.x, pos.y, pos.z);
        out.push_str(&format!(
            "{} {} {} {} {} {} {} 1 1\n",
            image.file_name(),
            x,
            y,
            z,
            pos.yaw * 180.0,
            pos.pitch * 180.0,
            pos.roll * 180.0,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::model::{Camera, CameraPosition, Image, Marker, MarkerPosition};

    use super::*;

    fn model_with_one_observation() -> SessionModel {
        let mut model = SessionModel::new("/tmp/s1");
        let mut cam = Camera::new("rpi01");
        cam.images.push(0);
        model.cameras.push(cam);
        model.images.push(Image::new("/tmp/s1/rpi01_0001.jpg", 0, 0.0));

        let mut marker = Marker::new(3, 2, Some([1.0, 2.0, 0.5]));
        marker.positions.push(MarkerPosition {
            image: 0,
            x: 100.0,
            y: 200.0,
        });
        model.markers.push(marker);
        model
    }

    #[test]
    fn gcp_line_applies_affine_remap() {
        let model = model_with_one_observation();
        let text = gcp_file(&model, &CoordRemap::default());

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(CRS_HEADER));
        assert_eq!(
            lines.next(),
            Some("500100 5900200 50 100 200 rpi01_0001.jpg rpi01_3_2")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn gcp_skips_placeholder_markers() {
        let mut model = model_with_one_observation();
        let mut placeholder = Marker::new(9, 9, None);
        placeholder.positions.push(MarkerPosition {
            image: 0,
            x: 1.0,
            y: 1.0,
        });
        model.markers.push(placeholder);

        let text = gcp_file(&model, &CoordRemap::default());
        assert_eq!(text.lines().count(), 2, "header plus the surveyed marker");
    }

    #[test]
    fn geo_lists_only_positioned_cameras() {
        let mut model = model_with_one_observation();
        let text = geo_file(&model, &CoordRemap::default());
        assert_eq!(text.lines().count(), 1, "header only, no surveyed camera");

        model.cameras[0].position = Some(CameraPosition {
            x: 1.0,
            y: 2.0,
            z: 0.5,
            roll: 0.5,
            pitch: 0.25,
            yaw: 1.0,
        });
        let text = geo_file(&model, &CoordRemap::default());
        let line = text.lines().nth(1).unwrap();
        assert_eq!(line, "rpi01_0001.jpg 500100 5900200 50 180 45 90 1 1");
    }
}
