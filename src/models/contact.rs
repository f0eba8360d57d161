use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contact {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// Derived, never stored.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Wire shape of a contact: the stored record plus the derived `full_name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Contact> for ContactResponse {
    fn from(contact: Contact) -> Self {
        let full_name = contact.full_name();
        Self {
            id: contact.id,
            first_name: contact.first_name,
            last_name: contact.last_name,
            email: contact.email,
            phone: contact.phone,
            company: contact.company,
            address: contact.address,
            birth_date: contact.birth_date,
            notes: contact.notes,
            full_name,
            created_at: contact.created_at,
            updated_at: contact.updated_at,
        }
    }
}

/// Raw request body for both create and update. Every field is optional
/// at the wire level; the validation chain decides what is required.
/// Nullable fields are doubly optional so an explicit `null` (a clear)
/// stays distinguishable from an absent field (keep the stored value).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactDraft {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub company: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

/// Absent fields never reach this function, so anything it sees was
/// supplied: `null` becomes `Some(None)`, a value `Some(Some(..))`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A fully validated create payload.
#[derive(Debug, Clone)]
pub struct NewContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// A validated partial update. The outer `None` means the field was not
/// supplied and keeps its prior value; for nullable fields an inner
/// `None` clears the stored value.
#[derive(Debug, Clone, Default)]
pub struct ContactChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Option<String>>,
    pub company: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub birth_date: Option<Option<NaiveDate>>,
    pub notes: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(first: &str, last: &str) -> Contact {
        Contact {
            id: Uuid::new_v4(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: "x@example.com".to_string(),
            phone: None,
            company: None,
            address: None,
            birth_date: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn full_name_joins_and_trims() {
        assert_eq!(contact("Ahmad", "Lufi").full_name(), "Ahmad Lufi");
        assert_eq!(contact("Ahmad", "").full_name(), "Ahmad");
        assert_eq!(contact("", "Lufi").full_name(), "Lufi");
    }

    #[test]
    fn response_carries_full_name() {
        let response = ContactResponse::from(contact("Ahmad", "Lufi"));
        assert_eq!(response.full_name, "Ahmad Lufi");
    }

    #[test]
    fn draft_distinguishes_absent_null_and_value() {
        let draft: ContactDraft =
            serde_json::from_str(r#"{ "phone": null, "company": "Acme" }"#).unwrap();
        assert_eq!(draft.phone, Some(None));
        assert_eq!(draft.company, Some(Some("Acme".to_string())));
        assert_eq!(draft.address, None);
    }
}
