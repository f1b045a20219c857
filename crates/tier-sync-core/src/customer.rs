//! Commerce-platform customer records as seen by the reconciler.

use serde::{Deserialize, Serialize};

use crate::ids::{CustomerId, GroupId};

/// Placeholder used when the purchaser's first name is unknown.
pub const PLACEHOLDER_FIRST_NAME: &str = "Member";

/// Placeholder used when the purchaser's last name is unknown.
pub const PLACEHOLDER_LAST_NAME: &str = "Customer";

/// A customer record owned by the commerce platform.
///
/// Never cached across requests; looked up or created per event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryCustomer {
    /// Platform-assigned id.
    pub id: CustomerId,
    /// Email address; compared case-insensitively.
    pub email: String,
    /// Current group, if the platform reported one.
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

impl DirectoryCustomer {
    /// Whether this record belongs to `email` (case-insensitive, trimmed).
    #[must_use]
    pub fn matches_email(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }
}

/// First/last name pair accepted by the platform, which rejects empty names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerName {
    /// Given name.
    pub first: String,
    /// Family name (everything after the first whitespace run).
    pub last: String,
}

impl CustomerName {
    /// Split a display name on its first whitespace boundary.
    ///
    /// Missing parts are filled with [`PLACEHOLDER_FIRST_NAME`] and
    /// [`PLACEHOLDER_LAST_NAME`].
    #[must_use]
    pub fn from_display_name(name: Option<&str>) -> Self {
        let name = name.map(str::trim).unwrap_or_default();
        let (first, last) = match name.split_once(char::is_whitespace) {
            Some((first, rest)) => (first, rest.trim()),
            None => (name, ""),
        };

        Self {
            first: non_empty_or(first, PLACEHOLDER_FIRST_NAME),
            last: non_empty_or(last, PLACEHOLDER_LAST_NAME),
        }
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Outcome of reconciling one event against the directory.
///
/// Used for logging and the acknowledgment only; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    /// The customer the event was applied to.
    pub customer_id: CustomerId,
    /// The group that was written, or `None` if the group was left alone.
    pub applied_group_id: Option<GroupId>,
    /// Whether the customer record was created by this event.
    pub created: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_first_whitespace() {
        let name = CustomerName::from_display_name(Some("Ada King Lovelace"));
        assert_eq!(name.first, "Ada");
        assert_eq!(name.last, "King Lovelace");
    }

    #[test]
    fn single_token_gets_placeholder_last_name() {
        let name = CustomerName::from_display_name(Some(" Cher "));
        assert_eq!(name.first, "Cher");
        assert_eq!(name.last, PLACEHOLDER_LAST_NAME);
    }

    #[test]
    fn missing_name_uses_both_placeholders() {
        for input in [None, Some(""), Some("   ")] {
            let name = CustomerName::from_display_name(input);
            assert_eq!(name.first, PLACEHOLDER_FIRST_NAME);
            assert_eq!(name.last, PLACEHOLDER_LAST_NAME);
        }
    }

    #[test]
    fn tabs_count_as_whitespace() {
        let name = CustomerName::from_display_name(Some("Grace\t  Hopper"));
        assert_eq!(name.first, "Grace");
        assert_eq!(name.last, "Hopper");
    }

    #[test]
    fn email_match_ignores_case() {
        let customer = DirectoryCustomer {
            id: CustomerId::new(1),
            email: "A@X.com".into(),
            group_id: None,
        };
        assert!(customer.matches_email("a@x.com"));
        assert!(!customer.matches_email("a@x.co"));
    }
}
