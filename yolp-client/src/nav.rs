//! Navigation routes.

use yolp_core::RestaurantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    SignIn,
    SignUp,
    Home,
    Restaurant(RestaurantId),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::SignIn => "/sign-in".to_string(),
            Route::SignUp => "/sign-up".to_string(),
            Route::Home => "/".to_string(),
            Route::Restaurant(id) => format!("/restaurant/{id}"),
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        match path.trim_end_matches('/') {
            "" => Some(Route::Home),
            "/sign-in" => Some(Route::SignIn),
            "/sign-up" => Some(Route::SignUp),
            other => other
                .strip_prefix("/restaurant/")
                .and_then(|id| id.parse().ok())
                .map(Route::Restaurant),
        }
    }

    /// Routes that require a signed-in user.
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Home | Route::Restaurant(_))
    }

    /// Routes only shown to signed-out users.
    pub fn is_public_only(&self) -> bool {
        matches!(self, Route::SignIn | Route::SignUp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_parse_back() {
        for route in [Route::SignIn, Route::SignUp, Route::Home, Route::Restaurant(12)] {
            assert_eq!(Route::from_path(&route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/restaurant/abc"), None);
        assert_eq!(Route::from_path("/elsewhere"), None);
    }

    #[test]
    fn test_every_route_is_protected_or_public_only() {
        for route in [Route::SignIn, Route::SignUp, Route::Home, Route::Restaurant(1)] {
            assert_ne!(route.is_protected(), route.is_public_only());
        }
    }
}
