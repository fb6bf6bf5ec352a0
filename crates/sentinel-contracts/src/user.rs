//! User credential records.
//!
//! The directory that stores these is an external collaborator; the core
//! only reads the fields below and writes back credential status changes.
//! Secrets never appear here in raw form: passwords and QR values are kept
//! as Argon2 PHC strings, NFC UIDs as SHA-256 hex.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A role code such as `R-ADM` or `R-EMP`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role(pub String);

impl Role {
    pub const ADMIN: &'static str = "R-ADM";
    pub const IDENTITY_MANAGER: &'static str = "R-IM";
    pub const AUDITOR: &'static str = "R-AUD";
    pub const MONITOR: &'static str = "R-MON";
    pub const ACCESS_CONTROL: &'static str = "R-AC";
    pub const SECURITY: &'static str = "R-SEC";
    pub const EXECUTIVE: &'static str = "R-CEO";
    pub const VISITOR: &'static str = "R-VIS";
    pub const EMPLOYEE: &'static str = "R-EMP";

    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Physical access level granted at NFC readers.
    pub fn access_level(&self) -> &'static str {
        match self.0.as_str() {
            Self::ADMIN | Self::IDENTITY_MANAGER => "admin",
            Self::SECURITY => "security",
            Self::AUDITOR => "auditor",
            Self::EXECUTIVE => "executive",
            Self::VISITOR => "visitor",
            _ => "standard",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::new(Self::EMPLOYEE)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of the account itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
    Revoked,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Revoked => "revoked",
        }
    }
}

/// Lifecycle of a physical credential (QR card or NFC card).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    #[default]
    Inactive,
    Active,
    Revoked,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Revoked => "revoked",
        }
    }
}

/// A user as seen by the authentication core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Stable identifier, e.g. `EMP-0001`.
    pub uid: String,
    pub name: String,
    /// Login handle.  Compared after trimming and lowercasing.
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,

    /// Argon2 PHC string of the password.
    pub password_hash: String,

    /// Argon2 PHC string of the QR secret, if a card was issued.
    pub qr_value_hash: Option<String>,
    pub qr_card_id: Option<String>,
    pub qr_status: CardStatus,
    pub qr_revoked_at: Option<DateTime<Utc>>,

    /// SHA-256 hex of the NFC card UID, if a card was issued.
    pub nfc_uid_hash: Option<String>,
    pub nfc_card_id: Option<String>,
    pub nfc_status: CardStatus,

    pub last_access: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// A fresh active account with a password and no cards.
    pub fn new(
        uid: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            email: email.into(),
            role,
            status: AccountStatus::Active,
            password_hash: password_hash.into(),
            qr_value_hash: None,
            qr_card_id: None,
            qr_status: CardStatus::Inactive,
            qr_revoked_at: None,
            nfc_uid_hash: None,
            nfc_card_id: None,
            nfc_status: CardStatus::Inactive,
            last_access: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// The stored QR hash, unless the card was revoked.
    pub fn usable_qr_hash(&self) -> Option<&str> {
        if self.qr_status == CardStatus::Revoked {
            return None;
        }
        self.qr_value_hash.as_deref()
    }
}

/// Normalize a login handle for lookups and lockout keys.
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().to_lowercase()
}
