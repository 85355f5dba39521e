use crate::{
    api::ApiGateway,
    error::{ApiError, AuthError, SessionError},
    models::{Credentials, Principal, Realm, Registration},
    routes::Route,
    session::{SessionEvent, SessionStore},
};
use std::sync::Arc;

// ── Access Gate ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Admit,
    Redirect(&'static str),
}

/// Outcome of navigating to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(&'static str),
}

/// Guard run on every navigation. It only looks at the session store; it
/// never logs anyone in and never caches a decision.
///
/// Any non-empty stored value admits, even one that does not parse as a
/// principal. Validating the record is left to the backend, which rejects
/// the first call made with a bad session.
#[derive(Clone)]
pub struct AccessGate {
    sessions: SessionStore,
}

impl AccessGate {
    pub fn new(sessions: SessionStore) -> Self {
        Self { sessions }
    }

    pub fn evaluate(&self, realm: Realm) -> GateDecision {
        if self.sessions.get(realm).is_some() {
            GateDecision::Admit
        } else {
            GateDecision::Redirect(realm.login_path())
        }
    }

    /// Resolve `path` and apply the gate if the route is protected.
    pub fn navigate(&self, path: &str) -> Navigation {
        let route = Route::resolve(path);
        let decision = match route.protected_realm() {
            Some(realm) => self.evaluate(realm),
            None => GateDecision::Admit,
        };

        match decision {
            GateDecision::Admit => {
                tracing::debug!("Navigation to {} admitted", path);
                Navigation::Render(route)
            }
            GateDecision::Redirect(to) => {
                tracing::info!("Navigation to {} redirected to {}", path, to);
                Navigation::Redirect(to)
            }
        }
    }

    /// Where to go when `event` arrives while `current` is showing. Clearing
    /// the realm that owns the current page sends the user to its login page.
    pub fn on_session_event(&self, current: Route, event: SessionEvent) -> Option<Navigation> {
        match event {
            SessionEvent::Cleared(realm) if current.protected_realm() == Some(realm) => {
                Some(Navigation::Redirect(realm.login_path()))
            }
            _ => None,
        }
    }
}

// ── Authentication flows ───────────────────────────────────────────────────

/// Login, signup and logout for both realms. Successful calls persist the
/// server's principal record under the realm's slot.
#[derive(Clone)]
pub struct AuthFlow {
    gateway: Arc<dyn ApiGateway>,
    sessions: SessionStore,
}

impl AuthFlow {
    pub fn new(gateway: Arc<dyn ApiGateway>, sessions: SessionStore) -> Self {
        Self { gateway, sessions }
    }

    /// Returns the realm's home path on success.
    pub async fn login(
        &self,
        realm: Realm,
        credentials: &Credentials,
    ) -> Result<&'static str, AuthError> {
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(AuthError::Invalid("Both email and password are required."));
        }

        let result = match realm {
            Realm::User => self.gateway.login_user(credentials).await,
            Realm::Admin => self.gateway.login_admin(credentials).await,
        };
        self.establish(realm, result, "Login failed. Please check your credentials.")
    }

    /// Returns the realm's home path on success.
    pub async fn signup(
        &self,
        realm: Realm,
        registration: &Registration,
    ) -> Result<&'static str, AuthError> {
        if registration.name.trim().is_empty()
            || registration.email.trim().is_empty()
            || registration.password.is_empty()
        {
            return Err(AuthError::Invalid("All fields are required."));
        }

        let result = match realm {
            Realm::User => self.gateway.signup_user(registration).await,
            Realm::Admin => self.gateway.signup_admin(registration).await,
        };
        self.establish(realm, result, "Signup failed. Please try again later.")
    }

    fn establish(
        &self,
        realm: Realm,
        result: Result<serde_json::Value, ApiError>,
        fallback: &str,
    ) -> Result<&'static str, AuthError> {
        let payload = result.map_err(|e| {
            tracing::warn!("Authentication for {} realm failed: {}", realm, e);
            AuthError::Failed(e.user_message(fallback))
        })?;

        let principal = Principal::from_payload(realm, payload);
        self.sessions.set(realm, &principal)?;
        tracing::info!("{} signed in to {} realm", principal.name, realm);
        Ok(realm.home_path())
    }

    /// Drop the realm's session. The other realm is untouched. Returns the
    /// realm's login path.
    pub fn logout(&self, realm: Realm) -> Result<&'static str, SessionError> {
        self.sessions.clear(realm)?;
        Ok(realm.login_path())
    }

    /// Name shown for the signed-in principal of `realm`.
    pub fn display_name(&self, realm: Realm) -> Option<String> {
        self.sessions.principal(realm).map(|p| p.name)
    }
}
