// Session Capture Service
// Records a timed window through the control API and caches the export
//
// Progress goes out as `CaptureEvent`s on an unbounded channel so the caller
// can forward it (e.g. as MCP notifications) without slowing the window down.
// A cancelled window returns `CaptureError::Cancelled` straight away: recording
// is neither stopped nor exported and nothing is written to the cache.

pub mod countdown;

use chrono::Local;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::models::{CaptureEvent, CapturedSession};
use crate::services::cache::{CacheError, SessionCache};
use crate::services::control::{ControlClient, ControlError};

pub use countdown::Countdown;

/// Message returned when read-latest finds an empty cache
pub const NO_CACHED_SESSION: &str = "no cached session found";

/// Capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no cached session found")]
    NoCachedSession,

    #[error("capture cancelled after {elapsed_seconds}s")]
    Cancelled { elapsed_seconds: u64 },

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Exported session is not valid JSON: {0}")]
    InvalidExport(#[from] serde_json::Error),
}

impl CaptureError {
    pub fn code(&self) -> &'static str {
        match self {
            CaptureError::NoCachedSession => "CAPTURE_NO_CACHED_SESSION",
            CaptureError::Cancelled { .. } => "CAPTURE_CANCELLED",
            CaptureError::Control(e) => e.code(),
            CaptureError::Cache(e) => e.code(),
            CaptureError::InvalidExport(_) => "CAPTURE_INVALID_EXPORT",
        }
    }

    /// Single-element error result: `[{"error": "<message>"}]`
    pub fn to_entries(&self) -> Vec<Value> {
        vec![json!({ "error": self.to_string() })]
    }
}

impl From<CaptureError> for String {
    fn from(err: CaptureError) -> Self {
        err.to_string()
    }
}

/// Drives capture windows and reads cached sessions
#[derive(Debug, Clone)]
pub struct SessionCapture {
    client: Arc<ControlClient>,
    cache: SessionCache,
    tick_seconds: u64,
}

impl SessionCapture {
    pub fn new(client: Arc<ControlClient>, cache: SessionCache, tick_seconds: u64) -> Self {
        Self {
            client,
            cache,
            tick_seconds,
        }
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Capture for `duration_seconds`, or read the latest cached session when zero
    pub async fn capture(
        &self,
        duration_seconds: u64,
        events: &UnboundedSender<CaptureEvent>,
        cancel: &CancellationToken,
    ) -> Result<CapturedSession, CaptureError> {
        if duration_seconds == 0 {
            return self.read_latest();
        }

        match self.record(duration_seconds, events, cancel).await {
            Ok(session) => Ok(session),
            Err(CaptureError::Cancelled { elapsed_seconds }) => {
                log::info!(
                    "[SessionCapture] Cancelled after {}s of {}s",
                    elapsed_seconds,
                    duration_seconds
                );
                let _ = events.send(CaptureEvent::Cancelled { elapsed_seconds });
                Err(CaptureError::Cancelled { elapsed_seconds })
            }
            Err(e) => {
                log::error!("[SessionCapture] Capture failed: {}", e);
                let _ = events.send(CaptureEvent::Failed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn record(
        &self,
        duration_seconds: u64,
        events: &UnboundedSender<CaptureEvent>,
        cancel: &CancellationToken,
    ) -> Result<CapturedSession, CaptureError> {
        self.client.clear_session().await?;
        log::info!("[SessionCapture] Recording for {}s", duration_seconds);
        let _ = events.send(CaptureEvent::Started {
            total_seconds: duration_seconds,
        });

        let window = Countdown::new(duration_seconds, self.tick_seconds)
            .run(events, cancel)
            .await;
        if window.cancelled {
            return Err(CaptureError::Cancelled {
                elapsed_seconds: window.elapsed_seconds,
            });
        }

        let _ = events.send(CaptureEvent::Exporting);
        self.client.stop_recording().await?;
        let raw = self.client.export_session_json().await?;

        // only parseable exports are cached
        let session = CapturedSession::from_json(&raw)?;
        let path = self.cache.store(&raw, Local::now())?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        log::info!(
            "[SessionCapture] Saved {} entries to {}",
            session.len(),
            path.display()
        );
        let _ = events.send(CaptureEvent::Saved {
            file_name,
            entries: session.len(),
        });
        Ok(session)
    }

    /// Most recently cached session
    pub fn read_latest(&self) -> Result<CapturedSession, CaptureError> {
        let path = self.cache.latest()?.ok_or(CaptureError::NoCachedSession)?;
        log::debug!("[SessionCapture] Reading cached session {}", path.display());
        Ok(self.cache.load(&path)?)
    }

    /// A cached session chosen by file name
    pub fn read_named(&self, file_name: &str) -> Result<CapturedSession, CaptureError> {
        let path = self.cache.resolve(file_name)?;
        Ok(self.cache.load(&path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilterCriteria;
    use crate::services::control::mock::{MockCharles, SAMPLE_EXPORT};
    use crate::services::filter::{SessionFilter, MATCH_LOCATION_FIELD};
    use std::fs;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn drain(rx: &mut mpsc::UnboundedReceiver<CaptureEvent>) -> Vec<CaptureEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    async fn setup() -> (TempDir, MockCharles, SessionCapture) {
        let tmp = TempDir::new().unwrap();
        let mock = MockCharles::start().await;
        let client = Arc::new(ControlClient::new(mock.control_config()).unwrap());
        let cache = SessionCache::new(tmp.path().join("package"));
        (tmp, mock, SessionCapture::new(client, cache, 10))
    }

    #[tokio::test]
    async fn test_read_latest_on_empty_cache() {
        let (_tmp, mock, capture) = setup().await;
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = capture
            .capture(0, &tx, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CaptureError::NoCachedSession));
        let entries = err.to_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["error"], NO_CACHED_SESSION);
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_read_latest_picks_last_file() {
        let (_tmp, _mock, capture) = setup().await;
        let dir = capture.cache().dir().to_path_buf();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("20240101000000.chlsj"), r#"[{"host":"old"}]"#).unwrap();
        fs::write(dir.join("20240301000000.chlsj"), r#"[{"host":"new"}]"#).unwrap();
        fs::write(dir.join("20240201000000.chlsj"), r#"[{"host":"mid"}]"#).unwrap();

        let (tx, _rx) = mpsc::unbounded_channel();
        let session = capture
            .capture(0, &tx, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(session.entries[0].host(), "new");
    }

    #[tokio::test]
    async fn test_capture_records_exports_and_caches() {
        let (_tmp, mock, capture) = setup().await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        let session = capture
            .capture(1, &tx, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(session.len(), 2);
        assert_eq!(
            mock.requests(),
            vec!["/session/clear", "/recording/stop", "/session/export-json"]
        );

        let cached = capture.cache().latest().unwrap().unwrap();
        assert_eq!(fs::read_to_string(cached).unwrap(), SAMPLE_EXPORT);

        let events = drain(&mut rx);
        assert_eq!(events[0], CaptureEvent::Started { total_seconds: 1 });
        assert_eq!(
            events[1],
            CaptureEvent::Tick {
                elapsed_seconds: 0,
                remaining_seconds: 1,
                total_seconds: 1
            }
        );
        assert_eq!(events[2], CaptureEvent::Exporting);
        assert!(matches!(events[3], CaptureEvent::Saved { entries: 2, .. }));
    }

    #[tokio::test]
    async fn test_fresh_capture_feeds_keyword_filter() {
        let (_tmp, _mock, capture) = setup().await;
        let (tx, _rx) = mpsc::unbounded_channel();

        let session = capture
            .capture(1, &tx, &CancellationToken::new())
            .await
            .unwrap();
        let criteria = FilterCriteria::default()
            .with_keyword_regex("TOKEN=abc")
            .keep_response(false);
        let results = SessionFilter::filter(&criteria, &session);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["host"], "auth.example.com");
        assert!(results[0].get("response").is_none());
        let location = &results[0][MATCH_LOCATION_FIELD];
        assert_eq!(location["lineNumber"], 8);
        assert_eq!(location["lineContent"], r#""text": "user=alice&token=abc123""#);
    }

    #[tokio::test]
    async fn test_export_failure_is_reported_not_raised() {
        let (_tmp, mock, capture) = setup().await;
        mock.fail("/session/export-json");
        let (tx, mut rx) = mpsc::unbounded_channel();

        let err = capture
            .capture(1, &tx, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CaptureError::Control(_)));
        assert_eq!(err.to_entries().len(), 1);
        assert!(drain(&mut rx).iter().any(CaptureEvent::is_error));
        assert!(capture.cache().list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_export_is_not_cached() {
        let (_tmp, mock, capture) = setup().await;
        mock.set_export_body("<html>not json</html>");
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = capture
            .capture(1, &tx, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "CAPTURE_INVALID_EXPORT");
        assert!(capture.cache().list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_capture_skips_export() {
        let (_tmp, mock, capture) = setup().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = capture.capture(30, &tx, &cancel).await.unwrap_err();

        assert!(matches!(err, CaptureError::Cancelled { elapsed_seconds: 0 }));
        assert_eq!(mock.requests(), vec!["/session/clear"]);
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, CaptureEvent::Cancelled { .. })));
        assert!(capture.cache().list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_charles_yields_error_result() {
        let tmp = TempDir::new().unwrap();
        let client = Arc::new(ControlClient::new(MockCharles::unreachable_config()).unwrap());
        let capture = SessionCapture::new(client, SessionCache::new(tmp.path().join("c")), 10);
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = capture
            .capture(5, &tx, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::Control(ref e) if e.is_transport()));
    }

    #[tokio::test]
    async fn test_read_named_session() {
        let (_tmp, _mock, capture) = setup().await;
        let dir = capture.cache().dir().to_path_buf();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("20240101000000.chlsj"), r#"[{"host":"first"}]"#).unwrap();
        fs::write(dir.join("20240102000000.chlsj"), r#"[{"host":"second"}]"#).unwrap();

        let session = capture.read_named("20240101000000.chlsj").unwrap();
        assert_eq!(session.entries[0].host(), "first");
        assert!(capture.read_named("missing.chlsj").is_err());
    }
}
