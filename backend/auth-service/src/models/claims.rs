use super::identity::UserGroup;
use serde::{Deserialize, Serialize};

/// Identity attributes extracted from a validated bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub subject: String,
    pub email: String,
    pub username: Option<String>,
    pub groups: Vec<String>,
}

impl Claims {
    pub fn has_group(&self, group: UserGroup) -> bool {
        self.groups.iter().any(|g| g == group.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.has_group(UserGroup::Admin)
    }
}
