use async_trait::async_trait;
use pie_accel::{RegisteredAccelerator, RegistrationStatus};
use pie_protocol::ActionOutcome;

use crate::Result;

// ---- Backend abstraction ----

/// Outbound requests to the desktop backend.
///
/// The engine never awaits these on its event loop; each call runs on its
/// own task and reports back through the loop.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Bind a global accelerator.
    async fn register_accelerator(&self, id: &str, accelerator: &str)
    -> Result<RegistrationStatus>;
    /// Accelerators the backend currently holds.
    async fn list_accelerators(&self) -> Result<Vec<RegisteredAccelerator>>;
    /// Name of the active profile, if any.
    async fn resolve_active_profile(&self) -> Result<Option<String>>;
    /// Start streaming action events.
    async fn subscribe_actions(&self) -> Result<()>;
    /// Recent action history, oldest first.
    async fn recent_actions(&self) -> Result<Vec<ActionOutcome>>;
}

/// Backend for running without one: every request succeeds and returns nothing.
pub struct NoopBackend;

#[async_trait]
impl Backend for NoopBackend {
    async fn register_accelerator(
        &self,
        _id: &str,
        _accelerator: &str,
    ) -> Result<RegistrationStatus> {
        Ok(RegistrationStatus {
            registered: true,
            conflicts: Vec::new(),
        })
    }

    async fn list_accelerators(&self) -> Result<Vec<RegisteredAccelerator>> {
        Ok(Vec::new())
    }

    async fn resolve_active_profile(&self) -> Result<Option<String>> {
        Ok(None)
    }

    async fn subscribe_actions(&self) -> Result<()> {
        Ok(())
    }

    async fn recent_actions(&self) -> Result<Vec<ActionOutcome>> {
        Ok(Vec::new())
    }
}
