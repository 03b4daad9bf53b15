//! Invited guest model and lookup projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned guest identifier.
pub type GuestId = i64;

/// One row of the invited-guest list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub id: GuestId,
    pub created_at: DateTime<Utc>,
    /// Lookup handle, unique case-insensitively.
    pub user_name: String,
    /// Name printed on the invitation.
    pub display_name: String,
}

/// Case-insensitive form of a user name, folded over all of Unicode.
///
/// Stored next to `user_name` and applied to lookup patterns so that
/// `ÁLVARO` finds `álvaro`.
pub fn fold_user_name(user_name: &str) -> String {
    user_name.to_lowercase()
}

/// Result of a guest lookup: the guest record plus whether it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestLookup {
    #[serde(flatten)]
    pub guest: Guest,
    #[serde(rename = "isInvited")]
    pub is_invited: bool,
}

impl GuestLookup {
    /// Wraps a guest found in the store.
    pub fn invited(guest: Guest) -> Self {
        Self {
            guest,
            is_invited: true,
        }
    }

    /// Zeroed placeholder returned when no guest matches.
    pub fn not_invited() -> Self {
        Self {
            guest: Guest {
                id: 0,
                created_at: DateTime::UNIX_EPOCH,
                user_name: String::new(),
                display_name: String::new(),
            },
            is_invited: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{fold_user_name, GuestLookup};

    #[test]
    fn folding_covers_non_ascii_letters() {
        assert_eq!(fold_user_name("ÁLVARO"), "álvaro");
        assert_eq!(fold_user_name("Ωμέγα_%"), "ωμέγα_%");
    }

    #[test]
    fn placeholder_serializes_flat_with_invited_flag() {
        let value = serde_json::to_value(GuestLookup::not_invited()).unwrap();
        assert_eq!(value["id"], 0);
        assert_eq!(value["user_name"], "");
        assert_eq!(value["isInvited"], false);
    }
}
