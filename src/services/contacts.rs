use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, FieldErrors},
    models::{Contact, ContactDraft},
    storage::{ContactFilter, ContactPage, ContactRepository},
};

use super::validation;

pub struct ContactsService {
    contacts: Arc<dyn ContactRepository>,
}

impl ContactsService {
    pub fn new(contacts: Arc<dyn ContactRepository>) -> Self {
        Self { contacts }
    }

    /// Read-only: search/filter/sort/paginate composition happens in the
    /// repository, bounds enforcement at the API layer.
    pub async fn list(&self, filter: ContactFilter) -> AppResult<ContactPage> {
        self.contacts.list(&filter).await
    }

    pub async fn create(&self, draft: ContactDraft) -> AppResult<Contact> {
        let mut errors = FieldErrors::default();
        let valid = validation::validate_new_contact(&draft, &mut errors);

        // Uniqueness is evaluated even when other fields already failed,
        // so the client sees every violation at once.
        if let Some(email) = draft.email.as_deref().filter(|e| validation::is_valid_email(e)) {
            if self.contacts.email_in_use(email, None).await? {
                errors.add("email", validation::EMAIL_TAKEN);
            }
        }

        match valid {
            Some(contact) if errors.is_empty() => self.contacts.insert(contact).await,
            _ => Err(AppError::Validation(errors)),
        }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Contact> {
        self.contacts
            .find(id)
            .await?
            .ok_or(AppError::NotFound("Contact"))
    }

    pub async fn update(&self, id: Uuid, draft: ContactDraft) -> AppResult<Contact> {
        // Existence is settled before any validation runs.
        if self.contacts.find(id).await?.is_none() {
            return Err(AppError::NotFound("Contact"));
        }

        let mut errors = FieldErrors::default();
        let changes = validation::validate_contact_changes(&draft, &mut errors);

        // The record's own email must not trip the uniqueness check.
        if let Some(email) = draft.email.as_deref().filter(|e| validation::is_valid_email(e)) {
            if self.contacts.email_in_use(email, Some(id)).await? {
                errors.add("email", validation::EMAIL_TAKEN);
            }
        }

        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        self.contacts
            .update(id, changes)
            .await?
            .ok_or(AppError::NotFound("Contact"))
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if self.contacts.delete(id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Contact"))
        }
    }
}
