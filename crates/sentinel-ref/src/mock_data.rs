//! Seeded directory for the reference runtime.
//!
//! All accounts are fictional.  Passwords are hashed with Argon2id on the way
//! in and QR values are issued through `CredentialAdmin`, so the seed itself
//! shows up in the audit log as `qr_assigned` / `nfc_card_assigned` events.

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    user::{Role, UserRecord},
};
use sentinel_core::{traits::UserDirectory, QrSource};

use crate::runtime::Runtime;

/// Raw credentials of one seeded account.  Only the demo ever sees these.
#[derive(Debug, Clone)]
pub struct SeededUser {
    pub uid: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub qr_value: String,
    pub nfc_uid: Option<String>,
}

/// The accounts created by [`seed`].
#[derive(Debug, Clone)]
pub struct SeedData {
    pub admin: SeededUser,
    pub employee: SeededUser,
    pub guard: SeededUser,
}

struct Account {
    uid: &'static str,
    name: &'static str,
    email: &'static str,
    password: &'static str,
    role: &'static str,
    nfc_uid: Option<&'static str>,
}

const ACCOUNTS: [Account; 3] = [
    Account {
        uid: "ADM-0001",
        name: "Alicia Robles",
        email: "admin@sentinel.local",
        password: "Admin#2024",
        role: Role::ADMIN,
        nfc_uid: None,
    },
    Account {
        uid: "EMP-0001",
        name: "Luis Herrera",
        email: "luis.herrera@sentinel.local",
        password: "Empleado#2024",
        role: Role::EMPLOYEE,
        nfc_uid: Some("04A1B2C3D4"),
    },
    Account {
        uid: "EMP-0002",
        name: "Marta Ibarra",
        email: "marta.ibarra@sentinel.local",
        password: "Guardia#2024",
        role: Role::SECURITY,
        nfc_uid: Some("04F5E6D7C8"),
    },
];

fn create(rt: &Runtime, account: &Account) -> SentinelResult<SeededUser> {
    let hash = rt.passwords.hash_password(account.password)?;
    rt.users.save(UserRecord::new(
        account.uid,
        account.name,
        account.email,
        Role::new(account.role),
        hash,
    ))?;

    let assignment = rt
        .admin
        .assign_qr(account.uid, QrSource::Generate, Some(&format!("QR-{}", account.uid)))?;
    let qr_value = assignment.issued_value.ok_or_else(|| SentinelError::Conflict {
        reason: format!("no QR value issued for '{}'", account.uid),
    })?;

    if let Some(nfc_uid) = account.nfc_uid {
        rt.admin.assign_nfc(account.uid, nfc_uid)?;
    }

    Ok(SeededUser {
        uid: account.uid.to_string(),
        email: account.email.to_string(),
        password: account.password.to_string(),
        role: Role::new(account.role),
        qr_value,
        nfc_uid: account.nfc_uid.map(str::to_string),
    })
}

/// Create the demo accounts in `rt` and return their raw credentials.
pub fn seed(rt: &Runtime) -> SentinelResult<SeedData> {
    let [admin, employee, guard] = &ACCOUNTS;
    Ok(SeedData {
        admin: create(rt, admin)?,
        employee: create(rt, employee)?,
        guard: create(rt, guard)?,
    })
}
