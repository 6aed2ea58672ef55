use super::ImageId;

/// One 2D pixel observation of a marker in one image. The image reference is
/// fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPosition {
    pub image: ImageId,
    pub x: f64,
    pub y: f64,
}

/// A ground-control point: one face/corner of an ArUco board, identified by
/// the (marker id, edge id) pair. The 3D coordinate comes from the survey
/// file; markers only ever seen in detections stay unsurveyed placeholders.
#[derive(Debug, Clone)]
pub struct Marker {
    pub marker_id: i32,
    pub edge_id: i32,
    /// Known local-frame coordinate, absent for placeholder markers.
    pub coordinate: Option<[f64; 3]>,
    pub positions: Vec<MarkerPosition>,
}

impl Marker {
    pub fn new(marker_id: i32, edge_id: i32, coordinate: Option<[f64; 3]>) -> Self {
        Self {
            marker_id,
            edge_id,
            coordinate,
            positions: Vec::new(),
        }
    }

    /// Label used in generated GCP files, e.g. `rpi01_3_2`.
    pub fn label(&self, camera_name: &str) -> String {
        format!("{camera_name}_{}_{}", self.marker_id, self.edge_id)
    }
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.marker_id, self.edge_id)
    }
}
