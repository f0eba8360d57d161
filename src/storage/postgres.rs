//! Postgres-backed stores. Queries are composed at runtime; the email
//! uniqueness invariant is ultimately enforced by the unique index, and a
//! racing duplicate insert surfaces as a validation error, not a 500.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, FieldErrors},
    models::{AccessToken, Contact, ContactChanges, NewContact, User},
    services::validation,
};

use super::{ContactFilter, ContactPage, ContactRepository, TokenStore, UserStore};

pub struct PgContactRepository {
    db: PgPool,
}

impl PgContactRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ContactFilter) {
    let mut clause = " WHERE ";

    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        builder.push(clause);
        builder.push("(first_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR last_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR email ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR company ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
        clause = " AND ";
    }

    if let Some(company) = filter.company.as_deref().filter(|s| !s.is_empty()) {
        builder.push(clause);
        builder.push("company ILIKE ");
        builder.push_bind(format!("%{company}%"));
    }
}

fn map_unique_violation<T>(result: Result<T, sqlx::Error>) -> AppResult<T> {
    match result {
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Validation(
            FieldErrors::single("email", validation::EMAIL_TAKEN),
        )),
        other => other.map_err(AppError::from),
    }
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn list(&self, filter: &ContactFilter) -> AppResult<ContactPage> {
        let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM contacts");
        push_filters(&mut count_builder, filter);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db)
            .await?;

        let mut builder = QueryBuilder::new("SELECT * FROM contacts");
        push_filters(&mut builder, filter);
        // sort_by is a whitelisted column name, never raw caller input
        builder.push(" ORDER BY ");
        builder.push(filter.sort_by.column());
        builder.push(" ");
        builder.push(filter.sort_order.sql());
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(filter.per_page));
        builder.push(" OFFSET ");
        builder.push_bind(i64::from(filter.per_page) * (i64::from(filter.page) - 1));

        let items: Vec<Contact> = builder.build_query_as().fetch_all(&self.db).await?;

        Ok(ContactPage::new(items, total as u64, filter))
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Contact>> {
        let contact = sqlx::query_as("SELECT * FROM contacts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(contact)
    }

    async fn email_in_use(&self, email: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        let count: i64 = match exclude {
            Some(id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE email = $1 AND id <> $2")
                    .bind(email)
                    .bind(id)
                    .fetch_one(&self.db)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE email = $1")
                    .bind(email)
                    .fetch_one(&self.db)
                    .await?
            }
        };
        Ok(count > 0)
    }

    async fn insert(&self, draft: NewContact) -> AppResult<Contact> {
        let result = sqlx::query_as::<_, Contact>(
            r#"
            INSERT INTO contacts (id, first_name, last_name, email, phone, company, address, birth_date, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&draft.first_name)
        .bind(&draft.last_name)
        .bind(&draft.email)
        .bind(&draft.phone)
        .bind(&draft.company)
        .bind(&draft.address)
        .bind(draft.birth_date)
        .bind(&draft.notes)
        .fetch_one(&self.db)
        .await;

        map_unique_violation(result)
    }

    async fn update(&self, id: Uuid, changes: ContactChanges) -> AppResult<Option<Contact>> {
        // Only supplied fields enter the SET list; a supplied inner `None`
        // binds NULL and clears the column.
        let mut builder = QueryBuilder::new("UPDATE contacts SET updated_at = NOW()");
        if let Some(value) = changes.first_name {
            builder.push(", first_name = ").push_bind(value);
        }
        if let Some(value) = changes.last_name {
            builder.push(", last_name = ").push_bind(value);
        }
        if let Some(value) = changes.email {
            builder.push(", email = ").push_bind(value);
        }
        if let Some(value) = changes.phone {
            builder.push(", phone = ").push_bind(value);
        }
        if let Some(value) = changes.company {
            builder.push(", company = ").push_bind(value);
        }
        if let Some(value) = changes.address {
            builder.push(", address = ").push_bind(value);
        }
        if let Some(value) = changes.birth_date {
            builder.push(", birth_date = ").push_bind(value);
        }
        if let Some(value) = changes.notes {
            builder.push(", notes = ").push_bind(value);
        }
        builder.push(" WHERE id = ").push_bind(id);
        builder.push(" RETURNING *");

        let result = builder
            .build_query_as::<Contact>()
            .fetch_optional(&self.db)
            .await;

        map_unique_violation(result)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn count(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(count as u64)
    }

    async fn insert(&self, name: &str, email: &str, password_hash: &str) -> AppResult<User> {
        let user = sqlx::query_as(
            r#"
            INSERT INTO users (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }
}

pub struct PgTokenStore {
    db: PgPool,
}

impl PgTokenStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn insert(&self, token: &str, user_id: Uuid) -> AppResult<()> {
        sqlx::query("INSERT INTO access_tokens (token, user_id) VALUES ($1, $2)")
            .bind(token)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn find(&self, token: &str) -> AppResult<Option<AccessToken>> {
        let record = sqlx::query_as("SELECT * FROM access_tokens WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.db)
            .await?;
        Ok(record)
    }

    async fn revoke(&self, token: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM access_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
