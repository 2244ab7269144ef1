//! Authenticated and anonymous principals

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Reserved username of the anonymous identity
pub const ANONYMOUS_USERNAME: &str = "Anonymous";

/// A principal returned by the user repository or the authenticator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique key into the user repository
    pub username: String,

    /// Directly assigned role identifiers
    pub roles: HashSet<String>,

    /// Group identifiers the user belongs to
    pub groups: HashSet<String>,
}

impl Identity {
    /// Create an identity without roles or groups
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            roles: HashSet::new(),
            groups: HashSet::new(),
        }
    }

    /// The anonymous identity
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_USERNAME)
    }

    pub fn is_anonymous(&self) -> bool {
        self.username == ANONYMOUS_USERNAME
    }

    /// Builder-style role assignment
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Builder-style group assignment
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    /// Attach roles and groups loaded at login time.
    ///
    /// Empty collections leave the current assignment untouched.
    pub(crate) fn attach(&mut self, roles: HashSet<String>, groups: HashSet<String>) {
        if !roles.is_empty() {
            self.roles = roles;
        }
        if !groups.is_empty() {
            self.groups = groups;
        }
    }

    /// Check if the role is directly assigned (group roles are not considered)
    pub fn has_direct_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}
