use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One of the two independent credential domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Realm {
    User,
    Admin,
}

impl Realm {
    pub const ALL: [Realm; 2] = [Realm::User, Realm::Admin];

    /// Storage slot holding this realm's principal. The casing differs between
    /// realms and must stay that way to read sessions written by older clients.
    pub fn storage_key(self) -> &'static str {
        match self {
            Realm::User => "user",
            Realm::Admin => "Admin",
        }
    }

    pub fn login_path(self) -> &'static str {
        match self {
            Realm::User => "/login",
            Realm::Admin => "/admin/login",
        }
    }

    pub fn signup_path(self) -> &'static str {
        match self {
            Realm::User => "/signup",
            Realm::Admin => "/admin/signup",
        }
    }

    pub fn home_path(self) -> &'static str {
        match self {
            Realm::User => "/",
            Realm::Admin => "/admin/dashboard",
        }
    }

    /// Realm owning a path: everything under `/admin` belongs to admins.
    pub fn for_path(path: &str) -> Realm {
        if path == "/admin" || path.starts_with("/admin/") {
            Realm::Admin
        } else {
            Realm::User
        }
    }
}

impl std::fmt::Display for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Realm::User => f.write_str("user"),
            Realm::Admin => f.write_str("admin"),
        }
    }
}

/// An authenticated identity record for a realm.
///
/// `payload` is the record exactly as the server returned it; the client only
/// relays it and reads the display name out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub realm: Realm,
    pub name: String,
    pub payload: Value,
}

impl Principal {
    pub fn from_payload(realm: Realm, payload: Value) -> Self {
        let name = payload
            .get("name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("User")
            .to_owned();
        Self {
            realm,
            name,
            payload,
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.payload.get("email").and_then(|v| v.as_str())
    }
}

/// A shortened link as served by the backend.
///
/// The target URL travels as `OriginalURL`. `createdBy` is usually the
/// populated owner record, from which only the email is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortLink {
    pub short_id: String,
    #[serde(rename = "OriginalURL", alias = "originalUrl")]
    pub original_url: String,
    #[serde(default)]
    pub visit_history: Vec<Value>,
    #[serde(default, deserialize_with = "owner_email")]
    pub created_by: Option<String>,
}

/// Accepts `{ "email": .. }`, a bare string, or anything else as no owner.
fn owner_email<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let owner = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(record)) => record
            .get("email")
            .and_then(Value::as_str)
            .map(str::to_owned),
        Some(Value::String(owner)) => Some(owner),
        _ => None,
    };
    Ok(owner.filter(|o| !o.is_empty()))
}

impl ShortLink {
    /// Click count derived from the visit history.
    pub fn click_count(&self) -> usize {
        self.visit_history.len()
    }
}

// ── Request bodies ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateLinkBody<'a> {
    pub url: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct OwnerQueryBody<'a> {
    pub query: &'a str,
}
