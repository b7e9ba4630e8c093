//! Route-tracking navigator
//!
//! Keeps the host's current route so the refresher can tell whether the
//! sign-in surface is already showing.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use steward_core::Navigator;
use tracing::info;

#[derive(Debug)]
pub struct RouteNavigator {
    current: RwLock<String>,
    sign_in_route: String,
    redirects: AtomicUsize,
}

impl RouteNavigator {
    pub fn new(sign_in_route: impl Into<String>) -> Self {
        Self {
            current: RwLock::new("/".to_string()),
            sign_in_route: sign_in_route.into(),
            redirects: AtomicUsize::new(0),
        }
    }

    /// Record a host-side route change
    pub fn set_route(&self, route: impl Into<String>) {
        *self.current.write() = route.into();
    }

    pub fn current_route(&self) -> String {
        self.current.read().clone()
    }

    fn is_sign_in(&self, route: &str) -> bool {
        route.split(['?', '#']).next().unwrap_or_default() == self.sign_in_route
    }

    /// Redirects issued so far
    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for RouteNavigator {
    fn is_on_sign_in(&self) -> bool {
        self.is_sign_in(&self.current.read())
    }

    fn redirect_to_sign_in(&self) {
        let mut current = self.current.write();
        if self.is_sign_in(&current) {
            return;
        }
        *current = self.sign_in_route.clone();
        self.redirects.fetch_add(1, Ordering::SeqCst);
        info!(route = %self.sign_in_route, "redirected to sign-in");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_is_idempotent() {
        let navigator = RouteNavigator::new("/login");
        navigator.set_route("/tenants?page=2");
        assert!(!navigator.is_on_sign_in());

        navigator.redirect_to_sign_in();
        navigator.redirect_to_sign_in();

        assert!(navigator.is_on_sign_in());
        assert_eq!(navigator.current_route(), "/login");
        assert_eq!(navigator.redirects(), 1);
    }

    #[test]
    fn test_sign_in_with_query_counts_as_on_sign_in() {
        let navigator = RouteNavigator::new("/login");
        navigator.set_route("/login?redirect=%2Fusers");
        assert!(navigator.is_on_sign_in());
    }
}
