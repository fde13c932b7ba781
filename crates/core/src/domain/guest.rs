use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuestId(pub i64);

/// Identity a guest supplies when booking; the email is the natural key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestContact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl GuestContact {
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: impl Into<String>) -> Self {
        Self { name: name.into(), email: normalize_email(&email.into()), phone: phone.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub id: GuestId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub total_spent: Decimal,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::GuestContact;

    #[test]
    fn contact_email_is_trimmed_and_lowercased() {
        let contact = GuestContact::new("Ada", "  Ada@Example.COM ", "555");
        assert_eq!(contact.email, "ada@example.com");
        assert_eq!(contact.name, "Ada");
    }
}
