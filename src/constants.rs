//! Constants used throughout the application

/// Number of points in a full face mesh (468 mesh points plus 10 iris points)
pub const NUM_FACE_MESH_LANDMARKS: usize = 478;

/// Nominal frame rate the calibration durations are expressed in
pub const NOMINAL_FPS: usize = 30;

/// Default interval between frame ticks in milliseconds
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 30;

/// Mouth landmarks
pub const LIP_TOP: usize = 13;
pub const LIP_BOTTOM: usize = 14;
pub const MOUTH_CORNER_LEFT: usize = 61;
pub const MOUTH_CORNER_RIGHT: usize = 291;

/// Outer eye corners, the scale reference for every normalized ratio
pub const LEFT_EYE_CORNER: usize = 33;
pub const RIGHT_EYE_CORNER: usize = 263;

/// Eyebrow and upper eyelid landmarks
pub const LEFT_EYEBROW_TOP: usize = 105;
pub const LEFT_EYE_TOP: usize = 159;
pub const RIGHT_EYEBROW_TOP: usize = 334;
pub const RIGHT_EYE_TOP: usize = 386;

/// Six-point eye contours for the eye aspect ratio, ordered
/// outer corner, upper lid (2), inner corner, lower lid (2)
pub const LEFT_EYE_CONTOUR: [usize; 6] = [33, 159, 158, 133, 153, 145];
pub const RIGHT_EYE_CONTOUR: [usize; 6] = [263, 386, 385, 362, 380, 374];

/// Calibration defaults
pub const DEFAULT_FRAMES_TO_COLLECT: usize = 60;
pub const DEFAULT_THRESHOLD_FACTOR: f64 = 0.6;
pub const DEFAULT_WINK_THRESHOLD_FACTOR: f64 = 0.5;

/// Neutral eye aspect ratios below this are treated as a failed measurement
pub const EAR_SANITY_FLOOR: f64 = 0.1;

/// Decimal places kept on derived thresholds
pub const THRESHOLD_DECIMALS: i32 = 4;

/// The open eye must exceed its own threshold by this factor for a wink
pub const WINK_OPEN_EYE_MARGIN: f64 = 1.1;

/// Default number of consecutive active frames before an action fires
pub const DEFAULT_HOLD_FRAMES: u32 = 5;

/// Default detection thresholds
pub const DEFAULT_MOUTH_OPEN_THRESHOLD: f64 = 0.35;
pub const DEFAULT_EYEBROWS_RAISED_THRESHOLD: f64 = 0.28;
pub const DEFAULT_SMILE_THRESHOLD: f64 = 0.35;
pub const DEFAULT_WINK_THRESHOLD: f64 = 0.2;

/// Delay between characters of a `write` action in milliseconds
pub const WRITE_INTERVAL_MS: u64 = 10;
