use serde::{Deserialize, Serialize};

pub type UserId = i64;

/// A back-office user who creates invoices and takes payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub full_name: Option<String>,
}

impl User {
    /// Label shown in user pickers: "Full Name (username)" or just the username.
    pub fn display_label(&self) -> String {
        match self.full_name.as_deref().map(str::trim) {
            Some(full_name) if !full_name.is_empty() => {
                format!("{} ({})", full_name, self.username)
            }
            _ => self.username.clone(),
        }
    }
}

/// Entry of the user directory used to pick report users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOption {
    pub id: UserId,
    pub display_label: String,
}

impl From<&User> for UserOption {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            display_label: user.display_label(),
        }
    }
}
