// Lifecycle Manager
// Protects the Charles configuration for the lifetime of the process
//
// Idle -> Protected on start (snapshot), Protected -> ShuttingDown ->
// Terminated on shutdown. Reset runs the same teardown and returns to
// Protected. Teardown always runs quit, restore and purge in that order;
// a failed step is recorded and the next one still runs.
//
// Teardowns never overlap: shutdown waits for an in-flight reset and then
// runs its own, and nothing leaves Terminated.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;

use crate::models::{AppConfig, LifecycleState, ShutdownReport, SnapshotOutcome, StepOutcome};
use crate::services::cache::SessionCache;
use crate::services::control::ControlClient;
use crate::services::vault::{ConfigVault, VaultError};

pub struct LifecycleManager {
    vault: ConfigVault,
    client: Arc<ControlClient>,
    cache: SessionCache,
    quit_grace: Duration,
    state: Mutex<LifecycleState>,
    teardown_lock: AsyncMutex<()>,
}

impl LifecycleManager {
    pub fn new(
        vault: ConfigVault,
        client: Arc<ControlClient>,
        cache: SessionCache,
        quit_grace: Duration,
    ) -> Self {
        Self {
            vault,
            client,
            cache,
            quit_grace,
            state: Mutex::new(LifecycleState::Idle),
            teardown_lock: AsyncMutex::new(()),
        }
    }

    pub fn from_config(config: &AppConfig, client: Arc<ControlClient>) -> Self {
        Self::new(
            ConfigVault::from_paths(&config.paths),
            client,
            SessionCache::new(config.paths.cache_dir.clone()),
            config.control.quit_grace(),
        )
    }

    fn lock_state(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, next: LifecycleState) {
        let mut state = self.lock_state();
        log::debug!("[Lifecycle] {} -> {}", *state, next);
        *state = next;
    }

    pub fn state(&self) -> LifecycleState {
        *self.lock_state()
    }

    pub fn vault(&self) -> &ConfigVault {
        &self.vault
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Snapshot the live configuration and enter `Protected`
    ///
    /// A failed snapshot is logged and returned but never blocks startup.
    pub fn start(&self) -> Result<SnapshotOutcome, VaultError> {
        let outcome = self.vault.snapshot();
        if let Err(e) = self.cache.ensure() {
            log::warn!("[Lifecycle] Could not create capture cache: {}", e);
        }
        self.set_state(LifecycleState::Protected);
        log::info!("[Lifecycle] Environment protected");
        outcome
    }

    /// Final teardown. Waits for a reset in progress, then runs once;
    /// returns `None` if shutdown already ran.
    pub async fn shutdown(&self) -> Option<ShutdownReport> {
        if self.state() == LifecycleState::Terminated {
            log::debug!("[Lifecycle] Shutdown already complete");
            return None;
        }

        let _guard = self.teardown_lock.lock().await;
        if self.state() == LifecycleState::Terminated {
            log::debug!("[Lifecycle] Shutdown already complete");
            return None;
        }

        log::info!("[Lifecycle] Shutting down, restoring environment...");
        self.set_state(LifecycleState::ShuttingDown);
        let report = self.teardown().await;
        self.set_state(LifecycleState::Terminated);
        Some(report)
    }

    /// Teardown on request; ends back in `Protected` with an empty cache.
    /// Returns `None` once the manager has shut down.
    pub async fn reset(&self) -> Option<ShutdownReport> {
        let _guard = self.teardown_lock.lock().await;

        let previous = self.state();
        if previous == LifecycleState::Terminated {
            log::warn!("[Lifecycle] Reset refused, already shut down");
            return None;
        }
        if previous != LifecycleState::Protected {
            log::warn!("[Lifecycle] Reset requested while {}", previous);
        }

        log::info!("[Lifecycle] Resetting environment...");
        self.set_state(LifecycleState::ShuttingDown);
        let report = self.teardown().await;
        self.set_state(LifecycleState::Protected);
        Some(report)
    }

    async fn teardown(&self) -> ShutdownReport {
        let quit = self.client.quit().await;
        if !self.quit_grace.is_zero() {
            tokio::time::sleep(self.quit_grace).await;
        }
        let quit = StepOutcome::Ok(quit.describe());

        let restore = StepOutcome::from(self.vault.restore().map(|outcome| {
            if outcome.is_noop() {
                "no snapshot to restore".to_string()
            } else {
                format!(
                    "config restored: {}, profiles restored: {}",
                    outcome.config_restored, outcome.profiles_restored
                )
            }
        }));

        let purged = self.cache.purge();
        match &purged {
            Ok(()) => log::info!("[Lifecycle] Capture cache purged: {}", self.cache.dir().display()),
            Err(e) => log::error!("[Lifecycle] Purge failed: {}", e),
        }
        let purge = StepOutcome::from(purged.map(|()| "capture cache purged".to_string()));

        let report = ShutdownReport {
            quit,
            restore,
            purge,
        };
        if report.is_success() {
            log::info!("[Lifecycle] Teardown complete");
        } else {
            log::warn!("[Lifecycle] Teardown finished with errors: {:?}", report.failures());
        }
        report
    }
}
