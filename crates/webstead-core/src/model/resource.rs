// ── Per-domain resource status ──
//
// A site's webroot and database are each either active with their value
// or deleted. Deletion is recorded per resource so it can be resumed.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Status of one removable resource (webroot or database) of a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource<T> {
    Active(T),
    Deleted,
}

impl<T> Resource<T> {
    pub fn active(&self) -> Option<&T> {
        match self {
            Self::Active(value) => Some(value),
            Self::Deleted => None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

/// The two independently deletable resource domains of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceDomain {
    Database,
    Files,
}

impl fmt::Display for ResourceDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database => f.write_str("database"),
            Self::Files => f.write_str("webroot"),
        }
    }
}

// ── Database credentials ─────────────────────────────────────────────

/// Credentials of the database provisioned for a site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseCredentials {
    pub name: String,
    pub user: String,
    #[serde(serialize_with = "expose", deserialize_with = "conceal")]
    pub password: SecretString,
    pub host: String,
}

impl PartialEq for DatabaseCredentials {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.user == other.user
            && self.host == other.host
            && self.password.expose_secret() == other.password.expose_secret()
    }
}

impl Eq for DatabaseCredentials {}

fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn conceal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}
