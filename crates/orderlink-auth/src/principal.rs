//! The request-scoped authenticated identity.

use std::collections::BTreeSet;

use serde::Serialize;

/// Identity resolved from a validated bearer token.
///
/// Built fresh for every request and dropped with it; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub subject: String,
    pub authorities: BTreeSet<String>,
}

impl Principal {
    pub fn new(subject: impl Into<String>, authorities: BTreeSet<String>) -> Self {
        Self {
            subject: subject.into(),
            authorities,
        }
    }

    /// Build from a comma-separated authority list. Blank entries are dropped.
    pub fn from_claims(subject: impl Into<String>, authorities: Option<&str>) -> Self {
        let authorities = authorities
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(subject, authorities)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }

    /// Returns `true` if `owner` names this principal.
    pub fn owns(&self, owner: &str) -> bool {
        self.subject == owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorities_parsed_from_claim() {
        let principal = Principal::from_claims("alice", Some("ROLE_USER, ROLE_ADMIN,,"));
        assert_eq!(principal.subject(), "alice");
        assert_eq!(principal.authorities.len(), 2);
        assert!(principal.has_authority("ROLE_ADMIN"));
        assert!(!principal.has_authority(""));
    }

    #[test]
    fn test_absent_authorities_is_empty() {
        let principal = Principal::from_claims("bob", None);
        assert!(principal.authorities.is_empty());
        assert!(principal.owns("bob"));
        assert!(!principal.owns("alice"));
    }
}
