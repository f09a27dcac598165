//! Live frame feed

pub mod session;

pub use session::{
    CapturePreset, CaptureSession, CaptureSessionConfig, CaptureStats, PixelFormat, SessionError,
    SessionState,
};
