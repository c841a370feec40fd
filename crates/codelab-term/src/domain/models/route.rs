use codelab_api_types::Role;
use strum_macros::Display;
use strum_macros::EnumIter;

/// Views the terminal can show. One route is active at a time; there is no
/// history stack beyond the single remembered origin of a login redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Route {
    Home,
    Editor,
    Records,
    Dashboard,
    Profile,
    Login,
    Register,
    NotFound,
}

/// Outcome of resolving a route against the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Allow,
    /// Show the login view and remember where the user was headed.
    Login { from: Route },
    /// Role mismatches are masked as a missing page, not a login prompt.
    NotFound,
}

impl Route {
    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "CodeLab",
            Route::Editor => "Editor",
            Route::Records => "My Submissions",
            Route::Dashboard => "Analytics",
            Route::Profile => "Profile",
            Route::Login => "Sign In",
            Route::Register => "Register",
            Route::NotFound => "Not Found",
        }
    }

    fn required_role(&self) -> Option<Role> {
        match self {
            Route::Dashboard => Some(Role::Admin),
            _ => None,
        }
    }

    fn requires_auth(&self) -> bool {
        return matches!(self, Route::Records | Route::Profile);
    }

    /// Resolve this route against the session. Role-gated routes never reveal
    /// their existence to the wrong role; auth-gated routes bounce to login
    /// and carry their origin so a successful login can return there.
    pub fn resolve(&self, authenticated: bool, role: Option<Role>) -> Gate {
        if let Some(required) = self.required_role() {
            if authenticated && role == Some(required) {
                return Gate::Allow;
            }
            return Gate::NotFound;
        }

        if self.requires_auth() && !authenticated {
            return Gate::Login { from: *self };
        }

        return Gate::Allow;
    }
}
