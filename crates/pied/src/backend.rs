//! Backend that writes requests as JSON lines for the host process.

use async_trait::async_trait;
use pie_accel::{RegisteredAccelerator, RegistrationStatus};
use pie_engine::{Backend, Error as EngineError, Result as EngineResult};
use pie_protocol::{ActionOutcome, BackendRequest, ipc::codec};
use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

/// Emits each request on the output line stream.
///
/// Answers arrive later as inbound events (`hotkey-registration-status`,
/// `action-event`), so every call returns an optimistic default at once.
pub struct StdioBackend {
    /// Output line stream.
    out: UnboundedSender<String>,
}

impl StdioBackend {
    /// Create a backend writing to `out`.
    pub fn new(out: UnboundedSender<String>) -> Self {
        Self { out }
    }

    /// Encode and queue one request.
    fn emit(&self, req: &BackendRequest) -> EngineResult<()> {
        let line = codec::encode_line(req)?;
        trace!(%line, "backend_request");
        self.out
            .send(line)
            .map_err(|_| EngineError::Backend("output closed".to_string()))
    }
}

#[async_trait]
impl Backend for StdioBackend {
    async fn register_accelerator(
        &self,
        id: &str,
        accelerator: &str,
    ) -> EngineResult<RegistrationStatus> {
        self.emit(&BackendRequest::RegisterAccelerator {
            id: id.to_string(),
            accelerator: accelerator.to_string(),
        })?;
        Ok(RegistrationStatus {
            registered: true,
            conflicts: Vec::new(),
        })
    }

    async fn list_accelerators(&self) -> EngineResult<Vec<RegisteredAccelerator>> {
        self.emit(&BackendRequest::ListAccelerators)?;
        Ok(Vec::new())
    }

    async fn resolve_active_profile(&self) -> EngineResult<Option<String>> {
        self.emit(&BackendRequest::ResolveActiveProfile)?;
        Ok(None)
    }

    async fn subscribe_actions(&self) -> EngineResult<()> {
        self.emit(&BackendRequest::SubscribeActions)
    }

    async fn recent_actions(&self) -> EngineResult<Vec<ActionOutcome>> {
        self.emit(&BackendRequest::RecentActions)?;
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test]
    async fn requests_become_lines() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let backend = StdioBackend::new(tx);
        let st = backend
            .register_accelerator("pie", "ctrl+space")
            .await
            .expect("register");
        assert!(st.registered);
        backend.recent_actions().await.expect("history");
        assert_eq!(
            rx.recv().await.as_deref(),
            Some(r#"{"type":"register-accelerator","id":"pie","accelerator":"ctrl+space"}"#)
        );
        assert_eq!(
            rx.recv().await.as_deref(),
            Some(r#"{"type":"recent-actions"}"#)
        );
    }

    #[tokio::test]
    async fn closed_output_is_a_backend_error() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let backend = StdioBackend::new(tx);
        assert!(matches!(
            backend.subscribe_actions().await,
            Err(EngineError::Backend(_))
        ));
    }
}
