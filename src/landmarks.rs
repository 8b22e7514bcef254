//! Face landmark frames as handed over by the external landmark detector.
//!
//! A frame is an ordered list of normalized 2-D points indexed by the face
//! mesh id scheme. The depth coordinate is carried but never used.

use crate::constants::NUM_FACE_MESH_LANDMARKS;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single landmark point
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
    /// Depth, unused by the ratio computations
    pub z: f64,
}

impl Landmark {
    /// Create a point on the image plane
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Euclidean distance on the image plane
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

// Recordings store points as `[x, y]` or `[x, y, z]`.
impl Serialize for Landmark {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        [self.x, self.y, self.z].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Landmark {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let coords = Vec::<f64>::deserialize(deserializer)?;
        match coords.as_slice() {
            [x, y] => Ok(Self { x: *x, y: *y, z: 0.0 }),
            [x, y, z] => Ok(Self { x: *x, y: *y, z: *z }),
            other => Err(serde::de::Error::invalid_length(
                other.len(),
                &"a point with 2 or 3 coordinates",
            )),
        }
    }
}

/// All landmarks detected on one face in one video frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkFrame {
    points: Vec<Landmark>,
}

impl LandmarkFrame {
    /// Wrap a detector's point list
    #[must_use]
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    /// A full face mesh with every point at the origin
    #[must_use]
    pub fn zeroed() -> Self {
        Self::new(vec![Landmark::default(); NUM_FACE_MESH_LANDMARKS])
    }

    /// Point at `index`, or `None` when the detector returned a shorter list
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    /// Overwrite the point at `index`; out of range indices are ignored
    pub fn set(&mut self, index: usize, x: f64, y: f64) {
        if let Some(point) = self.points.get_mut(index) {
            *point = Landmark::new(x, y);
        }
    }

    /// Number of points in the frame
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the frame holds no points at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Fetch several points at once; `None` if any index is missing
    pub(crate) fn points<const N: usize>(&self, indices: [usize; N]) -> Option<[Landmark; N]> {
        let mut out = [Landmark::default(); N];
        for (slot, index) in out.iter_mut().zip(indices) {
            *slot = *self.get(index)?;
        }
        Some(out)
    }
}
