//! Navigation side channel.
//!
//! The core never renders anything. When it needs the user somewhere else
//! (the login screen after a dead credential, home after a login) it asks a
//! `Navigator`, and the front end decides what that means.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Combined login / registration surface
    LoginReg,
    Home,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::LoginReg => "/login-reg",
            Route::Home => "/",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Remembers the most recent navigation request until the front end takes it.
#[derive(Debug, Default)]
pub struct PendingRoute {
    route: Mutex<Option<Route>>,
}

impl PendingRoute {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the pending route, leaving nothing behind
    pub fn take(&self) -> Option<Route> {
        self.route.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub fn peek(&self) -> Option<Route> {
        *self.route.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Navigator for PendingRoute {
    fn navigate(&self, route: Route) {
        info!(route = %route, "Navigation requested");
        *self.route.lock().unwrap_or_else(PoisonError::into_inner) = Some(route);
    }
}

/// Records every navigation, in order. Test helper.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

#[cfg(test)]
impl RecordingNavigator {
    pub(crate) fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, route: Route) -> usize {
        self.routes().iter().filter(|r| **r == route).count()
    }
}

#[cfg(test)]
impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}
