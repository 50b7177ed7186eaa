//! The credential store proper.

use crate::keys::StorageKeys;
use crate::traits::KeyValueStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Maximum automatic backup/restore attempts before the session is declared
/// expired.
pub const MAX_RESTORE_ATTEMPTS: u32 = 2;

/// Delay before a `RestoreRequested` emission, so storage handling never
/// re-enters the removal that triggered it.
pub const RESTORE_EMIT_DELAY: Duration = Duration::from_millis(150);

/// Delay before the `RedirectToLogin` signal after the session expires.
pub const REDIRECT_DELAY: Duration = Duration::from_millis(1500);

/// Capacity of the credential event channel.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// The persisted credential record.
///
/// `current_session` is the backend session serialized as opaque JSON;
/// `expires_at` is a freshness window in epoch milliseconds, independent of
/// the token's own expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub current_session: serde_json::Value,
    pub expires_at: i64,
}

impl CredentialRecord {
    /// Whether the freshness window has passed.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now().timestamp_millis()
    }
}

/// Events emitted by the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialEvent {
    /// The session was removed by explicit sign-out.
    SessionCleared,
    /// An automatic removal was intercepted; the carried backup has been
    /// re-written into the session slot.
    RestoreRequested(CredentialRecord),
    /// The bounded restore attempts are exhausted.
    SessionExpired,
    /// The host should navigate to the login entry point.
    RedirectToLogin,
}

/// Dual-medium credential store.
///
/// Every public operation is infallible: medium failures are logged and
/// degrade to "no persisted session".
pub struct CredentialStore {
    durable: Arc<dyn KeyValueStore>,
    scoped: Arc<dyn KeyValueStore>,
    events: broadcast::Sender<CredentialEvent>,
}

impl CredentialStore {
    /// Create a store over a durable and a process-scoped medium.
    pub fn new(durable: Arc<dyn KeyValueStore>, scoped: Arc<dyn KeyValueStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            durable,
            scoped,
            events,
        }
    }

    /// Subscribe to credential events.
    pub fn subscribe(&self) -> broadcast::Receiver<CredentialEvent> {
        self.events.subscribe()
    }

    /// Read the persisted record. Expired records read as absent.
    pub fn read(&self) -> Option<CredentialRecord> {
        let raw = self.get_either(StorageKeys::SESSION)?;
        let record: CredentialRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Persisted credential record is malformed, ignoring");
                return None;
            }
        };
        if record.is_expired() {
            debug!("Persisted credential record past freshness window, treating as absent");
            return None;
        }
        Some(record)
    }

    /// Write the record to both media.
    pub fn write(&self, record: &CredentialRecord) {
        let raw = match serde_json::to_string(record) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Could not serialize credential record");
                return;
            }
        };
        self.set_both(StorageKeys::SESSION, &raw);
    }

    /// Mark the next removal as intentional (set just before sign-out).
    pub fn mark_next_removal_intentional(&self) {
        self.set_both(StorageKeys::INTENTIONAL_SIGNOUT, "1");
    }

    /// Clear the intentional-removal marker.
    pub fn clear_intentional_marker(&self) {
        self.delete_both(StorageKeys::INTENTIONAL_SIGNOUT);
    }

    /// Remove the persisted session.
    ///
    /// Intentional removals (sign-out, or any removal while the one-shot
    /// marker is set) delete everything and emit `SessionCleared`
    /// synchronously. Automatic removals go through the bounded
    /// backup/restore cycle: below [`MAX_RESTORE_ATTEMPTS`] the current value
    /// is snapshotted, the attempt counter incremented, and the record
    /// re-hydrated shortly after with a `RestoreRequested` emission; at the
    /// cap the counter is cleared, `SessionExpired` is emitted, and a
    /// delayed `RedirectToLogin` follows.
    pub fn remove(&self, intentional: bool) {
        let intentional = intentional || self.intentional_marker_set();

        if intentional {
            self.delete_both(StorageKeys::SESSION);
            self.delete_both(StorageKeys::SESSION_BACKUP);
            self.delete_both(StorageKeys::RESTORE_ATTEMPTS);
            self.delete_both(StorageKeys::INTENTIONAL_SIGNOUT);
            let _ = self.events.send(CredentialEvent::SessionCleared);
            return;
        }

        let attempts = self.restore_attempts();

        if attempts < MAX_RESTORE_ATTEMPTS {
            // Snapshot whatever is still readable before the slot is lost.
            let snapshot = self
                .get_either(StorageKeys::SESSION)
                .or_else(|| self.get_either(StorageKeys::SESSION_BACKUP));

            if let Some(raw) = snapshot {
                if let Ok(record) = serde_json::from_str::<CredentialRecord>(&raw) {
                    self.set_both(StorageKeys::SESSION_BACKUP, &raw);
                    self.set_attempts(attempts + 1);
                    self.delete_both(StorageKeys::SESSION);
                    self.schedule_restore(record, raw);
                    return;
                }
                warn!("Backup snapshot is malformed, cannot restore");
            }
        }

        // Out of attempts, or nothing left to restore.
        self.delete_both(StorageKeys::SESSION);
        self.delete_both(StorageKeys::SESSION_BACKUP);
        self.delete_both(StorageKeys::RESTORE_ATTEMPTS);
        let _ = self.events.send(CredentialEvent::SessionExpired);
        self.schedule_redirect();
    }

    /// Current value of the bounded attempt counter.
    pub fn restore_attempts(&self) -> u32 {
        self.get_either(StorageKeys::RESTORE_ATTEMPTS)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0)
    }

    /// The backup slot, if populated.
    pub fn backup(&self) -> Option<CredentialRecord> {
        let raw = self.get_either(StorageKeys::SESSION_BACKUP)?;
        serde_json::from_str(&raw).ok()
    }

    // Internal helpers -------------------------------------------------

    fn schedule_restore(&self, record: CredentialRecord, raw: String) {
        let durable = self.durable.clone();
        let scoped = self.scoped.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(RESTORE_EMIT_DELAY).await;
            if let Err(e) = durable.set(StorageKeys::SESSION, &raw) {
                warn!(error = %e, "Durable re-hydrate failed");
            }
            if let Err(e) = scoped.set(StorageKeys::SESSION, &raw) {
                warn!(error = %e, "Scoped re-hydrate failed");
            }
            let _ = events.send(CredentialEvent::RestoreRequested(record));
        });
    }

    fn schedule_redirect(&self) {
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(REDIRECT_DELAY).await;
            let _ = events.send(CredentialEvent::RedirectToLogin);
        });
    }

    fn intentional_marker_set(&self) -> bool {
        self.get_either(StorageKeys::INTENTIONAL_SIGNOUT).is_some()
    }

    fn set_attempts(&self, attempts: u32) {
        self.set_both(StorageKeys::RESTORE_ATTEMPTS, &attempts.to_string());
    }

    fn get_either(&self, key: &str) -> Option<String> {
        match self.durable.get(key) {
            Ok(Some(value)) => return Some(value),
            Ok(None) => {}
            Err(e) => warn!(key, error = %e, "Durable read failed"),
        }
        match self.scoped.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Scoped read failed");
                None
            }
        }
    }

    fn set_both(&self, key: &str, value: &str) {
        if let Err(e) = self.durable.set(key, value) {
            warn!(key, error = %e, "Durable write failed");
        }
        if let Err(e) = self.scoped.set(key, value) {
            warn!(key, error = %e, "Scoped write failed");
        }
    }

    fn delete_both(&self, key: &str) {
        if let Err(e) = self.durable.delete(key) {
            warn!(key, error = %e, "Durable delete failed");
        }
        if let Err(e) = self.scoped.delete(key) {
            warn!(key, error = %e, "Scoped delete failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MemoryStore;
    use crate::{StorageError, StorageResult};

    fn store() -> CredentialStore {
        CredentialStore::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    fn record_expiring_in(ms: i64) -> CredentialRecord {
        CredentialRecord {
            current_session: serde_json::json!({ "access_token": "at", "refresh_token": "rt" }),
            expires_at: Utc::now().timestamp_millis() + ms,
        }
    }

    /// A medium that rejects every operation.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Medium("broken".to_string()))
        }
        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::Medium("broken".to_string()))
        }
        fn delete(&self, _key: &str) -> StorageResult<bool> {
            Err(StorageError::Medium("broken".to_string()))
        }
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let cs = store();
        let record = record_expiring_in(60_000);

        cs.write(&record);
        assert_eq!(cs.read(), Some(record));
    }

    #[tokio::test]
    async fn test_expired_record_reads_as_absent() {
        let cs = store();
        let record = record_expiring_in(-1);
        cs.write(&record);

        // The raw record is still present in the medium.
        assert!(cs
            .durable
            .get(StorageKeys::SESSION)
            .unwrap()
            .is_some());
        assert_eq!(cs.read(), None);
    }

    #[tokio::test]
    async fn test_read_falls_back_to_scoped_medium() {
        let durable = Arc::new(MemoryStore::new());
        let scoped = Arc::new(MemoryStore::new());
        let cs = CredentialStore::new(durable.clone(), scoped.clone());

        let record = record_expiring_in(60_000);
        cs.write(&record);
        durable.delete(StorageKeys::SESSION).unwrap();

        assert_eq!(cs.read(), Some(record));
    }

    #[tokio::test]
    async fn test_broken_durable_medium_degrades() {
        let cs = CredentialStore::new(Arc::new(BrokenStore), Arc::new(MemoryStore::new()));
        let record = record_expiring_in(60_000);

        // Write must not panic; the scoped copy carries the record.
        cs.write(&record);
        assert_eq!(cs.read(), Some(record));
    }

    #[tokio::test]
    async fn test_both_media_broken_reads_as_absent() {
        let cs = CredentialStore::new(Arc::new(BrokenStore), Arc::new(BrokenStore));
        cs.write(&record_expiring_in(60_000));
        assert_eq!(cs.read(), None);
    }

    #[tokio::test]
    async fn test_intentional_removal_clears_everything() {
        let cs = store();
        let mut events = cs.subscribe();
        cs.write(&record_expiring_in(60_000));
        cs.set_attempts(1);

        cs.remove(true);

        assert_eq!(cs.read(), None);
        assert_eq!(cs.restore_attempts(), 0);
        assert!(cs.backup().is_none());
        assert_eq!(events.recv().await.unwrap(), CredentialEvent::SessionCleared);
    }

    #[tokio::test]
    async fn test_marker_makes_removal_intentional() {
        let cs = store();
        let mut events = cs.subscribe();
        cs.write(&record_expiring_in(60_000));

        cs.mark_next_removal_intentional();
        cs.remove(false);

        assert_eq!(events.recv().await.unwrap(), CredentialEvent::SessionCleared);
        assert!(cs.backup().is_none());
    }

    #[tokio::test]
    async fn test_automatic_removal_backup_restore_cycle() {
        let cs = store();
        let mut events = cs.subscribe();
        let record = record_expiring_in(60_000);
        cs.write(&record);

        // First automatic removal: backup created, counter 1, restore emitted.
        cs.remove(false);
        assert_eq!(cs.restore_attempts(), 1);
        assert_eq!(cs.backup(), Some(record.clone()));
        assert_eq!(
            events.recv().await.unwrap(),
            CredentialEvent::RestoreRequested(record.clone())
        );
        // The session slot was re-hydrated.
        assert_eq!(cs.read(), Some(record.clone()));

        // Second automatic removal: counter 2, restore emitted again.
        cs.remove(false);
        assert_eq!(cs.restore_attempts(), 2);
        assert_eq!(
            events.recv().await.unwrap(),
            CredentialEvent::RestoreRequested(record.clone())
        );

        // Third automatic removal: at the cap, session expires.
        cs.remove(false);
        assert_eq!(cs.restore_attempts(), 0);
        assert_eq!(events.recv().await.unwrap(), CredentialEvent::SessionExpired);
        assert_eq!(cs.read(), None);
        assert_eq!(
            events.recv().await.unwrap(),
            CredentialEvent::RedirectToLogin
        );
    }

    #[tokio::test]
    async fn test_automatic_removal_with_nothing_to_restore() {
        let cs = store();
        let mut events = cs.subscribe();

        cs.remove(false);

        assert_eq!(events.recv().await.unwrap(), CredentialEvent::SessionExpired);
    }
}
