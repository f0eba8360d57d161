use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::response::{ApiResponse, PageMeta},
    error::{AppError, AppResult},
    models::{ContactDraft, ContactResponse},
    services::contacts::ContactsService,
    storage::{ContactFilter, SortField, SortOrder, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct ListContactsQuery {
    pub search: Option<String>,
    pub company: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListContactsQuery {
    /// The requested page size is never trusted beyond the hard ceiling.
    fn into_filter(self) -> ContactFilter {
        ContactFilter {
            search: self.search,
            company: self.company,
            sort_by: self.sort_by.as_deref().map_or(SortField::CreatedAt, SortField::parse),
            sort_order: self
                .sort_order
                .as_deref()
                .map_or(SortOrder::Desc, SortOrder::parse),
            page: self.page.unwrap_or(1).max(1),
            per_page: self.per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }
}

pub async fn list_contacts(
    State(state): State<AppState>,
    query: Option<Query<ListContactsQuery>>,
) -> AppResult<Json<ApiResponse<Vec<ContactResponse>>>> {
    // Unparseable query strings fall back to the defaults instead of a
    // bare 400 outside the envelope.
    let query = query.map(|Query(q)| q).unwrap_or_default();

    let service = ContactsService::new(state.contacts.clone());
    let page = service.list(query.into_filter()).await?;

    let meta = PageMeta::from(&page);
    let data: Vec<ContactResponse> = page.items.into_iter().map(ContactResponse::from).collect();

    Ok(Json(ApiResponse::ok_with_meta(
        "Contacts retrieved successfully",
        data,
        meta,
    )))
}

pub async fn create_contact(
    State(state): State<AppState>,
    body: Option<Json<ContactDraft>>,
) -> AppResult<(StatusCode, Json<ApiResponse<ContactResponse>>)> {
    // Missing or unreadable bodies validate as an empty draft, keeping
    // the failure inside the envelope.
    let draft = body.map(|Json(draft)| draft).unwrap_or_default();

    let service = ContactsService::new(state.contacts.clone());
    let contact = service.create(draft).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Contact created successfully",
            ContactResponse::from(contact),
        )),
    ))
}

pub async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<ContactResponse>>> {
    let service = ContactsService::new(state.contacts.clone());
    let contact = service.get(parse_contact_id(&id)?).await?;

    Ok(Json(ApiResponse::ok(
        "Contact retrieved successfully",
        ContactResponse::from(contact),
    )))
}

pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ContactDraft>>,
) -> AppResult<Json<ApiResponse<ContactResponse>>> {
    let draft = body.map(|Json(draft)| draft).unwrap_or_default();

    let service = ContactsService::new(state.contacts.clone());
    let contact = service.update(parse_contact_id(&id)?, draft).await?;

    Ok(Json(ApiResponse::ok(
        "Contact updated successfully",
        ContactResponse::from(contact),
    )))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    let service = ContactsService::new(state.contacts.clone());
    service.delete(parse_contact_id(&id)?).await?;

    Ok(Json(ApiResponse::message_only("Contact deleted successfully")))
}

/// Ids are opaque to callers; anything that is not one of ours is simply
/// a contact that does not exist.
fn parse_contact_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("Contact"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_defaults_match_the_contract() {
        let filter = ListContactsQuery::default().into_filter();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.per_page, DEFAULT_PAGE_SIZE);
        assert_eq!(filter.sort_by, SortField::CreatedAt);
        assert_eq!(filter.sort_order, SortOrder::Desc);
    }

    #[test]
    fn per_page_is_clamped_to_the_ceiling() {
        let filter = ListContactsQuery {
            per_page: Some(100),
            ..Default::default()
        }
        .into_filter();
        assert_eq!(filter.per_page, MAX_PAGE_SIZE);

        let filter = ListContactsQuery {
            per_page: Some(0),
            page: Some(0),
            ..Default::default()
        }
        .into_filter();
        assert_eq!(filter.per_page, 1);
        assert_eq!(filter.page, 1);
    }

    #[test]
    fn unknown_sort_inputs_fall_back_to_defaults() {
        let filter = ListContactsQuery {
            sort_by: Some("password_hash".to_string()),
            sort_order: Some("sideways".to_string()),
            ..Default::default()
        }
        .into_filter();
        assert_eq!(filter.sort_by, SortField::CreatedAt);
        assert_eq!(filter.sort_order, SortOrder::Desc);
    }

    #[test]
    fn malformed_ids_read_as_missing_contacts() {
        assert!(matches!(
            parse_contact_id("not-a-uuid"),
            Err(AppError::NotFound("Contact"))
        ));
        assert!(parse_contact_id("8b91d7a2-64c4-4d17-a04e-9e3a7d1f8b53").is_ok());
    }
}
