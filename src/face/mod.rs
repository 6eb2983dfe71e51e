//! Face biometrics
//!
//! Embedding-distance matching and the live-stream session that throttles
//! re-matching against incoming camera frames. Face localization and the
//! embedding network are external collaborators behind `FaceAnalyzer`.

pub mod capture;
pub mod matcher;
pub mod stream;
pub mod template;

pub use capture::{CaptureDevice, CaptureLease, Frame, FrameSource};
pub use matcher::{compare, distance, label_for, FaceLabel, Rgb, SessionMode, DEFAULT_TOLERANCE};
pub use stream::{
    AnnotatedFrame, Annotation, Detection, FaceAnalyzer, FaceBox, SessionConfig, SessionState,
    StopOutcome, StreamSession,
};
pub use template::{FaceTemplate, FACE_EMBEDDING_DIM};
