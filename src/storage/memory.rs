//! In-memory stores mirroring the Postgres backends, used by the test
//! suites. The uniqueness invariant and the query-composition semantics
//! (case-insensitive substring search, whitelisted sort, clamped
//! pagination) match the SQL implementations.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, FieldErrors},
    models::{AccessToken, Contact, ContactChanges, NewContact, User},
    services::validation,
};

use super::{ContactFilter, ContactPage, ContactRepository, SortField, SortOrder, TokenStore, UserStore};

#[derive(Default)]
pub struct InMemoryContactRepository {
    rows: Mutex<Vec<Contact>>,
}

fn matches_filter(contact: &Contact, filter: &ContactFilter) -> bool {
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        let hit = contact.first_name.to_lowercase().contains(&needle)
            || contact.last_name.to_lowercase().contains(&needle)
            || contact.email.to_lowercase().contains(&needle)
            || contact
                .company
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }

    if let Some(company) = filter.company.as_deref().filter(|s| !s.is_empty()) {
        let needle = company.to_lowercase();
        if !contact
            .company
            .as_deref()
            .is_some_and(|c| c.to_lowercase().contains(&needle))
        {
            return false;
        }
    }

    true
}

fn compare(a: &Contact, b: &Contact, field: SortField) -> Ordering {
    match field {
        SortField::FirstName => a.first_name.cmp(&b.first_name),
        SortField::LastName => a.last_name.cmp(&b.last_name),
        SortField::Email => a.email.cmp(&b.email),
        SortField::Phone => a.phone.cmp(&b.phone),
        SortField::Company => a.company.cmp(&b.company),
        SortField::Address => a.address.cmp(&b.address),
        SortField::BirthDate => a.birth_date.cmp(&b.birth_date),
        SortField::Notes => a.notes.cmp(&b.notes),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

#[async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn list(&self, filter: &ContactFilter) -> AppResult<ContactPage> {
        let rows = self.rows.lock().unwrap();
        let mut matched: Vec<Contact> = rows
            .iter()
            .filter(|c| matches_filter(c, filter))
            .cloned()
            .collect();
        drop(rows);

        matched.sort_by(|a, b| {
            let ordering = compare(a, b, filter.sort_by);
            match filter.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = matched.len() as u64;
        let start = (filter.page.saturating_sub(1) as usize) * filter.per_page as usize;
        let items: Vec<Contact> = matched
            .into_iter()
            .skip(start)
            .take(filter.per_page as usize)
            .collect();

        Ok(ContactPage::new(items, total, filter))
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Contact>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|c| c.id == id).cloned())
    }

    async fn email_in_use(&self, email: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .any(|c| c.email == email && Some(c.id) != exclude))
    }

    async fn insert(&self, draft: NewContact) -> AppResult<Contact> {
        let mut rows = self.rows.lock().unwrap();
        // Same behavior as the database unique index.
        if rows.iter().any(|c| c.email == draft.email) {
            return Err(AppError::Validation(FieldErrors::single(
                "email",
                validation::EMAIL_TAKEN,
            )));
        }

        let now = Utc::now();
        let contact = Contact {
            id: Uuid::new_v4(),
            first_name: draft.first_name,
            last_name: draft.last_name,
            email: draft.email,
            phone: draft.phone,
            company: draft.company,
            address: draft.address,
            birth_date: draft.birth_date,
            notes: draft.notes,
            created_at: now,
            updated_at: now,
        };
        rows.push(contact.clone());
        Ok(contact)
    }

    async fn update(&self, id: Uuid, changes: ContactChanges) -> AppResult<Option<Contact>> {
        let mut rows = self.rows.lock().unwrap();

        if let Some(email) = changes.email.as_deref() {
            if rows.iter().any(|c| c.email == email && c.id != id) {
                return Err(AppError::Validation(FieldErrors::single(
                    "email",
                    validation::EMAIL_TAKEN,
                )));
            }
        }

        let Some(contact) = rows.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };

        if let Some(value) = changes.first_name {
            contact.first_name = value;
        }
        if let Some(value) = changes.last_name {
            contact.last_name = value;
        }
        if let Some(value) = changes.email {
            contact.email = value;
        }
        // Inner `None` is an explicit clear.
        if let Some(value) = changes.phone {
            contact.phone = value;
        }
        if let Some(value) = changes.company {
            contact.company = value;
        }
        if let Some(value) = changes.address {
            contact.address = value;
        }
        if let Some(value) = changes.birth_date {
            contact.birth_date = value;
        }
        if let Some(value) = changes.notes {
            contact.notes = value;
        }
        contact.updated_at = Utc::now();

        Ok(Some(contact.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|c| c.id != id);
        Ok(rows.len() < before)
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    rows: Mutex<Vec<User>>,
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|u| u.id == id).cloned())
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.rows.lock().unwrap().len() as u64)
    }

    async fn insert(&self, name: &str, email: &str, password_hash: &str) -> AppResult<User> {
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        rows.push(user.clone());
        Ok(user)
    }
}

#[derive(Default)]
pub struct InMemoryTokenStore {
    rows: Mutex<HashMap<String, AccessToken>>,
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn insert(&self, token: &str, user_id: Uuid) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        rows.insert(
            token.to_string(),
            AccessToken {
                token: token.to_string(),
                user_id,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn find(&self, token: &str) -> AppResult<Option<AccessToken>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.get(token).cloned())
    }

    async fn revoke(&self, token: &str) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        rows.remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded(names: &[(&str, &str, &str, Option<&str>)]) -> InMemoryContactRepository {
        let repo = InMemoryContactRepository::default();
        for (first, last, email, company) in names {
            repo.insert(NewContact {
                first_name: first.to_string(),
                last_name: last.to_string(),
                email: email.to_string(),
                phone: None,
                company: company.map(str::to_string),
                address: None,
                birth_date: None,
                notes: None,
            })
            .await
            .unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn search_is_case_insensitive_across_fields() {
        let repo = seeded(&[
            ("Joko", "Silu", "joko@example.com", Some("Apple Inc")),
            ("Ula", "Gas", "ula@example.com", Some("Google LLC")),
            ("Ahmad", "Son", "ahmad@example.com", None),
        ])
        .await;

        let filter = ContactFilter {
            search: Some("joko".to_string()),
            ..Default::default()
        };
        let page = repo.list(&filter).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].first_name, "Joko");

        // Company is part of the free-text search too.
        let filter = ContactFilter {
            search: Some("APPLE".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.list(&filter).await.unwrap().total, 1);

        let filter = ContactFilter {
            search: Some("nomatch".to_string()),
            ..Default::default()
        };
        let page = repo.list(&filter).await.unwrap();
        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn company_filter_composes_with_search() {
        let repo = seeded(&[
            ("Joko", "Silu", "joko@example.com", Some("Apple Inc")),
            ("Joko", "Gas", "joko2@example.com", Some("Google LLC")),
        ])
        .await;

        let filter = ContactFilter {
            search: Some("Joko".to_string()),
            company: Some("apple".to_string()),
            ..Default::default()
        };
        let page = repo.list(&filter).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].company.as_deref(), Some("Apple Inc"));
    }

    #[tokio::test]
    async fn pagination_splits_pages_and_reports_meta() {
        let repo = InMemoryContactRepository::default();
        for i in 0..15 {
            repo.insert(NewContact {
                first_name: format!("First{i}"),
                last_name: format!("Last{i}"),
                email: format!("c{i}@example.com"),
                phone: None,
                company: None,
                address: None,
                birth_date: None,
                notes: None,
            })
            .await
            .unwrap();
        }

        let filter = ContactFilter {
            per_page: 10,
            ..Default::default()
        };
        let page = repo.list(&filter).await.unwrap();
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.total, 15);
        assert_eq!(page.last_page, 2);
        assert_eq!(page.current_page, 1);

        let filter = ContactFilter {
            per_page: 10,
            page: 2,
            ..Default::default()
        };
        assert_eq!(repo.list(&filter).await.unwrap().items.len(), 5);
    }

    #[tokio::test]
    async fn sorting_respects_field_and_direction() {
        let repo = seeded(&[
            ("Bram", "B", "b@example.com", None),
            ("Ahmad", "A", "a@example.com", None),
            ("Citra", "C", "c@example.com", None),
        ])
        .await;

        let filter = ContactFilter {
            sort_by: SortField::FirstName,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };
        let names: Vec<String> = repo
            .list(&filter)
            .await
            .unwrap()
            .items
            .into_iter()
            .map(|c| c.first_name)
            .collect();
        assert_eq!(names, vec!["Ahmad", "Bram", "Citra"]);

        let filter = ContactFilter {
            sort_by: SortField::Email,
            sort_order: SortOrder::Desc,
            ..Default::default()
        };
        assert_eq!(
            repo.list(&filter).await.unwrap().items[0].email,
            "c@example.com"
        );
    }
}
