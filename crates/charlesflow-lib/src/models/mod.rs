// Data models for CharlesFlow
// Session, snapshot, throttle, lifecycle and configuration types

pub mod config;
pub mod lifecycle;
pub mod session;
pub mod snapshot;
pub mod throttle;

pub use config::{AppConfig, CaptureSettings, ConfigError, ControlConfig, PathsConfig};
pub use lifecycle::{LifecycleState, ShutdownReport, StepOutcome};
pub use session::{
    CaptureEvent, CaptureWindowState, CapturedSession, FilterCriteria, MatchLocation,
    TrafficEntry,
};
pub use snapshot::{ConfigSnapshot, RestoreOutcome, SnapshotOutcome};
pub use throttle::{InvalidPresetError, ThrottlePreset};
