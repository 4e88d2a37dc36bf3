//! Role checks for transitions that declare required roles.

use std::collections::HashSet;

/// Answers whether the current caller holds a role.
pub trait AuthorizationChecker: Send + Sync {
    fn is_granted(&self, role: &str) -> bool;
}

/// Checker backed by a fixed set of granted roles.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthorizationChecker {
    granted: HashSet<String>,
}

impl StaticAuthorizationChecker {
    pub fn new<I>(granted: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            granted: granted.into_iter().map(Into::into).collect(),
        }
    }
}

impl AuthorizationChecker for StaticAuthorizationChecker {
    fn is_granted(&self, role: &str) -> bool {
        self.granted.contains(role)
    }
}

impl<F> AuthorizationChecker for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_granted(&self, role: &str) -> bool {
        self(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_checker_grants_listed_roles_only() {
        let checker = StaticAuthorizationChecker::new(["ROLE_EDITOR"]);
        assert!(checker.is_granted("ROLE_EDITOR"));
        assert!(!checker.is_granted("ROLE_ADMIN"));
    }

    #[test]
    fn closures_are_checkers() {
        let checker = |role: &str| role.starts_with("ROLE_");
        assert!(checker.is_granted("ROLE_ANY"));
        assert!(!checker.is_granted("guest"));
    }
}
