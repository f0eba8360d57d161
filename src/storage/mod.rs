pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{AccessToken, Contact, ContactChanges, NewContact, User},
};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 50;

/// Sortable contact columns. Unknown names fall back to `CreatedAt`, so a
/// caller-supplied string never reaches the SQL layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    FirstName,
    LastName,
    Email,
    Phone,
    Company,
    Address,
    BirthDate,
    Notes,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn parse(value: &str) -> Self {
        match value {
            "first_name" => Self::FirstName,
            "last_name" => Self::LastName,
            "email" => Self::Email,
            "phone" => Self::Phone,
            "company" => Self::Company,
            "address" => Self::Address,
            "birth_date" => Self::BirthDate,
            "notes" => Self::Notes,
            "updated_at" => Self::UpdatedAt,
            _ => Self::CreatedAt,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Company => "company",
            Self::Address => "address",
            Self::BirthDate => "birth_date",
            Self::Notes => "notes",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Self {
        match value {
            "asc" => Self::Asc,
            _ => Self::Desc,
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Per-request query composition: search OR-matches first/last name, email
/// and company; the company filter ANDs on top of it.
#[derive(Debug, Clone)]
pub struct ContactFilter {
    pub search: Option<String>,
    pub company: Option<String>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub page: u32,
    pub per_page: u32,
}

impl Default for ContactFilter {
    fn default() -> Self {
        Self {
            search: None,
            company: None,
            sort_by: SortField::CreatedAt,
            sort_order: SortOrder::Desc,
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContactPage {
    pub items: Vec<Contact>,
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl ContactPage {
    pub fn new(items: Vec<Contact>, total: u64, filter: &ContactFilter) -> Self {
        let last_page = (total.div_ceil(u64::from(filter.per_page)) as u32).max(1);
        Self {
            items,
            current_page: filter.page,
            last_page,
            per_page: filter.per_page,
            total,
        }
    }
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn list(&self, filter: &ContactFilter) -> AppResult<ContactPage>;

    async fn find(&self, id: Uuid) -> AppResult<Option<Contact>>;

    /// Uniqueness pre-check; `exclude` skips the record's own row on update.
    async fn email_in_use(&self, email: &str, exclude: Option<Uuid>) -> AppResult<bool>;

    async fn insert(&self, draft: NewContact) -> AppResult<Contact>;

    /// Applies only the supplied fields. `None` when the id does not exist.
    async fn update(&self, id: Uuid, changes: ContactChanges) -> AppResult<Option<Contact>>;

    /// Hard delete. Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn count(&self) -> AppResult<u64>;
    async fn insert(&self, name: &str, email: &str, password_hash: &str) -> AppResult<User>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert(&self, token: &str, user_id: Uuid) -> AppResult<()>;
    async fn find(&self, token: &str) -> AppResult<Option<AccessToken>>;
    /// Removing an absent token is not an error.
    async fn revoke(&self, token: &str) -> AppResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_field_falls_back_to_created_at() {
        assert_eq!(SortField::parse("email"), SortField::Email);
        assert_eq!(SortField::parse("id; DROP TABLE"), SortField::CreatedAt);
        assert_eq!(SortField::parse(""), SortField::CreatedAt);
    }

    #[test]
    fn sort_order_defaults_to_desc() {
        assert_eq!(SortOrder::parse("asc"), SortOrder::Asc);
        assert_eq!(SortOrder::parse("descending"), SortOrder::Desc);
    }

    #[test]
    fn last_page_is_ceiling_with_floor_of_one() {
        let filter = ContactFilter {
            per_page: 10,
            ..Default::default()
        };
        assert_eq!(ContactPage::new(vec![], 15, &filter).last_page, 2);
        assert_eq!(ContactPage::new(vec![], 20, &filter).last_page, 2);
        assert_eq!(ContactPage::new(vec![], 0, &filter).last_page, 1);
    }
}
