use crate::models::Realm;

/// Every page the client can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login(Realm),
    Signup(Realm),
    /// The realm's link list: own links for users, the dashboard for admins.
    Home(Realm),
    NotFound,
}

impl Route {
    /// Map a path to its route. Query strings, fragments and trailing slashes
    /// are ignored.
    pub fn resolve(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            p => p,
        };

        match path {
            "/" => Route::Home(Realm::User),
            "/login" => Route::Login(Realm::User),
            "/signup" => Route::Signup(Realm::User),
            "/admin" | "/admin/dashboard" => Route::Home(Realm::Admin),
            "/admin/login" => Route::Login(Realm::Admin),
            "/admin/signup" => Route::Signup(Realm::Admin),
            _ => Route::NotFound,
        }
    }

    /// Realm whose session is required to render this route.
    pub fn protected_realm(self) -> Option<Realm> {
        match self {
            Route::Home(realm) => Some(realm),
            _ => None,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Login(realm) => realm.login_path(),
            Route::Signup(realm) => realm.signup_path(),
            Route::Home(realm) => realm.home_path(),
            Route::NotFound => "/404",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_route_table() {
        assert_eq!(Route::resolve("/"), Route::Home(Realm::User));
        assert_eq!(Route::resolve(""), Route::Home(Realm::User));
        assert_eq!(Route::resolve("/login"), Route::Login(Realm::User));
        assert_eq!(Route::resolve("/signup/"), Route::Signup(Realm::User));
        assert_eq!(Route::resolve("/admin"), Route::Home(Realm::Admin));
        assert_eq!(Route::resolve("/admin/dashboard?tab=1"), Route::Home(Realm::Admin));
        assert_eq!(Route::resolve("/admin/login"), Route::Login(Realm::Admin));
        assert_eq!(Route::resolve("/admin/signup#top"), Route::Signup(Realm::Admin));
        assert_eq!(Route::resolve("/nope"), Route::NotFound);
    }

    #[test]
    fn only_home_routes_are_protected() {
        assert_eq!(Route::Home(Realm::Admin).protected_realm(), Some(Realm::Admin));
        assert_eq!(Route::Login(Realm::Admin).protected_realm(), None);
        assert_eq!(Route::NotFound.protected_realm(), None);
    }

    #[test]
    fn paths_round_trip() {
        for realm in Realm::ALL {
            for route in [Route::Login(realm), Route::Signup(realm), Route::Home(realm)] {
                assert_eq!(Route::resolve(route.path()), route);
            }
        }
    }
}
