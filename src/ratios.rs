//! Scale-invariant expression ratios computed from one landmark frame.
//!
//! The mouth, eyebrow and smile ratios are normalized by the horizontal
//! distance between the outer eye corners so that thresholds carry over
//! between faces and camera distances. The eye aspect ratio uses the classic
//! six-point construction and is normalized by the eye's own width.
//!
//! Every function returns `None` when a required landmark is missing and
//! `Some(0.0)` when the normalizing distance is zero.

use crate::constants::{
    LEFT_EYEBROW_TOP, LEFT_EYE_CONTOUR, LEFT_EYE_CORNER, LEFT_EYE_TOP, LIP_BOTTOM, LIP_TOP,
    MOUTH_CORNER_LEFT, MOUTH_CORNER_RIGHT, RIGHT_EYEBROW_TOP, RIGHT_EYE_CONTOUR, RIGHT_EYE_CORNER,
    RIGHT_EYE_TOP,
};
use crate::landmarks::{Landmark, LandmarkFrame};

/// Horizontal distance between the outer eye corners
fn eye_corner_distance(left: &Landmark, right: &Landmark) -> f64 {
    (left.x - right.x).abs()
}

fn normalize(value: f64, reference: f64) -> f64 {
    if reference == 0.0 {
        0.0
    } else {
        value / reference
    }
}

/// Vertical lip opening over eye-corner distance
#[must_use]
pub fn mouth_open_ratio(frame: &LandmarkFrame) -> Option<f64> {
    let [top, bottom, left_eye, right_eye] =
        frame.points([LIP_TOP, LIP_BOTTOM, LEFT_EYE_CORNER, RIGHT_EYE_CORNER])?;
    Some(normalize((top.y - bottom.y).abs(), eye_corner_distance(&left_eye, &right_eye)))
}

/// Mean eyebrow-to-eyelid height of both sides over eye-corner distance
#[must_use]
pub fn eyebrows_raised_ratio(frame: &LandmarkFrame) -> Option<f64> {
    let [left_brow, left_lid, right_brow, right_lid, left_eye, right_eye] = frame.points([
        LEFT_EYEBROW_TOP,
        LEFT_EYE_TOP,
        RIGHT_EYEBROW_TOP,
        RIGHT_EYE_TOP,
        LEFT_EYE_CORNER,
        RIGHT_EYE_CORNER,
    ])?;
    let reference = eye_corner_distance(&left_eye, &right_eye);
    let left = normalize((left_brow.y - left_lid.y).abs(), reference);
    let right = normalize((right_brow.y - right_lid.y).abs(), reference);
    Some((left + right) / 2.0)
}

/// Mouth-corner span over eye-corner distance
#[must_use]
pub fn smile_ratio(frame: &LandmarkFrame) -> Option<f64> {
    let [mouth_left, mouth_right, left_eye, right_eye] = frame.points([
        MOUTH_CORNER_LEFT,
        MOUTH_CORNER_RIGHT,
        LEFT_EYE_CORNER,
        RIGHT_EYE_CORNER,
    ])?;
    Some(normalize(mouth_left.distance(&mouth_right), eye_corner_distance(&left_eye, &right_eye)))
}

/// Eye aspect ratio for a contour ordered outer corner, upper lid (2),
/// inner corner, lower lid (2)
#[must_use]
pub fn eye_aspect_ratio(frame: &LandmarkFrame, contour: [usize; 6]) -> Option<f64> {
    let [p1, p2, p3, p4, p5, p6] = frame.points(contour)?;
    let vertical = p2.distance(&p6) + p3.distance(&p5);
    Some(normalize(vertical, 2.0 * p1.distance(&p4)))
}

/// Eye aspect ratio of the subject's left eye
#[must_use]
pub fn left_eye_aspect_ratio(frame: &LandmarkFrame) -> Option<f64> {
    eye_aspect_ratio(frame, LEFT_EYE_CONTOUR)
}

/// Eye aspect ratio of the subject's right eye
#[must_use]
pub fn right_eye_aspect_ratio(frame: &LandmarkFrame) -> Option<f64> {
    eye_aspect_ratio(frame, RIGHT_EYE_CONTOUR)
}

/// All ratios of one frame; `None` marks a ratio that could not be computed
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExpressionRatios {
    /// Mouth opening
    pub mouth_open: Option<f64>,
    /// Eyebrow height
    pub eyebrows_raised: Option<f64>,
    /// Mouth width
    pub smile: Option<f64>,
    /// Left eye aspect ratio
    pub left_ear: Option<f64>,
    /// Right eye aspect ratio
    pub right_ear: Option<f64>,
}

impl ExpressionRatios {
    /// Compute every ratio; an absent face yields all-unavailable ratios
    #[must_use]
    pub fn compute(frame: Option<&LandmarkFrame>) -> Self {
        frame.map_or_else(Self::default, |frame| Self {
            mouth_open: mouth_open_ratio(frame),
            eyebrows_raised: eyebrows_raised_ratio(frame),
            smile: smile_ratio(frame),
            left_ear: left_eye_aspect_ratio(frame),
            right_ear: right_eye_aspect_ratio(frame),
        })
    }

    /// All five ratios, only when every one of them is available and finite
    #[must_use]
    pub fn complete(&self) -> Option<RatioSample> {
        let finite = |value: Option<f64>| value.filter(|v| v.is_finite());
        Some(RatioSample {
            mouth_open: finite(self.mouth_open)?,
            eyebrows_raised: finite(self.eyebrows_raised)?,
            smile: finite(self.smile)?,
            left_ear: finite(self.left_ear)?,
            right_ear: finite(self.right_ear)?,
        })
    }
}

/// A frame's ratios with every value present
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioSample {
    /// Mouth opening
    pub mouth_open: f64,
    /// Eyebrow height
    pub eyebrows_raised: f64,
    /// Mouth width
    pub smile: f64,
    /// Left eye aspect ratio
    pub left_ear: f64,
    /// Right eye aspect ratio
    pub right_ear: f64,
}
