use super::ImageId;

/// Surveyed rigid pose of a camera in the local project frame. Angles are in
/// radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// An intrinsic parameter with a linear lens-position correction:
/// `value(lens) = base + factor * lens`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearParam {
    pub base: f64,
    pub factor: f64,
}

impl LinearParam {
    pub const fn fixed(base: f64) -> Self {
        Self { base, factor: 0.0 }
    }

    pub fn at(&self, lens_position: f64) -> f64 {
        self.base + self.factor * lens_position
    }
}

/// Intrinsic calibration of one camera module: pixel dimensions, focal length,
/// principal point, 4 radial + 2 tangential distortion coefficients. All
/// focal/principal/distortion terms carry a linear lens-position correction;
/// a variant without per-shot focus uses zero factors.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub width: u32,
    pub height: u32,
    pub focal: LinearParam,
    pub principal_x: LinearParam,
    pub principal_y: LinearParam,
    pub k: [LinearParam; 4],
    pub p: [LinearParam; 2],
}

impl Default for Calibration {
    /// Lab calibration of the rig's camera module (imx708, 4608x3456).
    fn default() -> Self {
        Self {
            width: 4608,
            height: 3456,
            focal: LinearParam {
                base: 3387.30,
                factor: 21.65,
            },
            principal_x: LinearParam {
                base: 9.43,
                factor: 0.28,
            },
            principal_y: LinearParam {
                base: 26.77,
                factor: -1.14,
            },
            k: [
                LinearParam {
                    base: -0.008054,
                    factor: 0.018608,
                },
                LinearParam {
                    base: 0.233690,
                    factor: -0.104750,
                },
                LinearParam {
                    base: -0.384440,
                    factor: 0.131100,
                },
                LinearParam::fixed(0.0),
            ],
            p: [LinearParam::fixed(0.0), LinearParam::fixed(0.0)],
        }
    }
}

/// One physical camera of the rig, named after the filename stem of its
/// images. Owns its images (by index into the session model).
#[derive(Debug, Clone)]
pub struct Camera {
    pub name: String,
    pub calibration: Calibration,
    pub position: Option<CameraPosition>,
    pub images: Vec<ImageId>,
    /// Numeric id assigned by a backend after submission.
    pub backend_id: Option<i32>,
}

impl Camera {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calibration: Calibration::default(),
            position: None,
            images: Vec::new(),
            backend_id: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.calibration.width
    }

    pub fn height(&self) -> u32 {
        self.calibration.height
    }

    /// Focal length in pixels at the given lens position.
    pub fn focal_length(&self, lens_position: f64) -> f64 {
        self.calibration.focal.at(lens_position)
    }

    /// Principal point offset (x, y) in pixels at the given lens position.
    pub fn principal_point(&self, lens_position: f64) -> (f64, f64) {
        (
            self.calibration.principal_x.at(lens_position),
            self.calibration.principal_y.at(lens_position),
        )
    }

    /// Radial distortion k1..k4 at the given lens position.
    pub fn radial(&self, lens_position: f64) -> [f64; 4] {
        self.calibration.k.map(|k| k.at(lens_position))
    }

    /// Tangential distortion p1, p2 at the given lens position.
    pub fn tangential(&self, lens_position: f64) -> [f64; 2] {
        self.calibration.p.map(|p| p.at(lens_position))
    }
}
