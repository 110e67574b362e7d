// Services module
// Vault, control client, cache, capture, filter and lifecycle orchestration

pub mod cache;
pub mod capture;
pub mod control;
pub mod filter;
pub mod lifecycle;
pub mod vault;

pub use cache::{CacheError, SessionCache};
pub use capture::{CaptureError, Countdown, SessionCapture};
pub use control::{ControlClient, ControlError, QuitOutcome};
pub use filter::{InvalidPatternError, SessionFilter};
pub use lifecycle::LifecycleManager;
pub use vault::{ConfigVault, VaultError};
