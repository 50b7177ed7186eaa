//! Storage key constants.

/// Storage keys used by the credential store.
pub struct StorageKeys;

impl StorageKeys {
    /// Serialized session record (JSON)
    pub const SESSION: &'static str = "opsboard_session";

    /// Temporary backup slot used during automatic-removal recovery
    pub const SESSION_BACKUP: &'static str = "opsboard_session_backup";

    /// Bounded restore attempt counter
    pub const RESTORE_ATTEMPTS: &'static str = "opsboard_session_restore_attempts";

    /// One-shot marker set just before an intentional sign-out removal
    pub const INTENTIONAL_SIGNOUT: &'static str = "opsboard_intentional_signout";
}
