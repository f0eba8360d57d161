//! Client-side state containers. Each store owns a snapshot of remote
//! state behind a mutex and notifies registered subscribers after every
//! mutation, so a UI layer can re-render from `state()`.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use uuid::Uuid;

use super::gateway::{ContactFilters, ContactsGateway, GatewayError, GatewayResult};
use crate::{
    api::response::PageMeta,
    models::{AuthPayload, ContactDraft, ContactResponse, UserSummary},
};

/// How long a flash message stays visible before it is cleared.
const MESSAGE_TTL: Duration = Duration::from_secs(3);

type Subscriber = Box<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub user: Option<UserSummary>,
    pub token: Option<String>,
}

/// Session store. Holds the bearer token and the signed-in user summary;
/// authentication status is judged from local token presence without a
/// round trip.
pub struct AuthStore<G> {
    gateway: Arc<G>,
    state: Mutex<AuthState>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl<G: ContactsGateway> AuthStore<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            state: Mutex::new(AuthState::default()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.subscribers.lock().unwrap().push(Box::new(listener));
    }

    pub fn state(&self) -> AuthState {
        self.state.lock().unwrap().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.lock().unwrap().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.lock().unwrap().token.is_some()
    }

    pub async fn login(&self, email: &str, password: &str) -> GatewayResult<AuthPayload> {
        let payload = self.gateway.login(email, password).await?;
        self.with_state(|s| {
            s.token = Some(payload.token.clone());
            s.user = Some(payload.user.clone());
        });
        Ok(payload)
    }

    /// Drops the local session unconditionally. A failed revocation call
    /// still leaves the client signed out.
    pub async fn logout(&self) {
        if let Some(token) = self.token() {
            if let Err(e) = self.gateway.logout(&token).await {
                tracing::warn!("logout request failed: {}", e);
            }
        }
        self.with_state(|s| {
            s.token = None;
            s.user = None;
        });
    }

    pub async fn fetch_user(&self) -> GatewayResult<UserSummary> {
        let token = self.require_token()?;
        let user = self.gateway.fetch_user(&token).await?;
        self.with_state(|s| s.user = Some(user.clone()));
        Ok(user)
    }

    /// Rotates the stored token, replacing it with the newly issued one.
    pub async fn refresh(&self) -> GatewayResult<AuthPayload> {
        let token = self.require_token()?;
        let payload = self.gateway.refresh(&token).await?;
        self.with_state(|s| {
            s.token = Some(payload.token.clone());
            s.user = Some(payload.user.clone());
        });
        Ok(payload)
    }

    fn require_token(&self) -> GatewayResult<String> {
        self.token()
            .ok_or_else(|| GatewayError::Transport("no session token".to_string()))
    }

    fn with_state(&self, apply: impl FnOnce(&mut AuthState)) {
        apply(&mut self.state.lock().unwrap());
        self.notify();
    }

    fn notify(&self) {
        for listener in self.subscribers.lock().unwrap().iter() {
            listener();
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContactsState {
    pub contacts: Vec<ContactResponse>,
    pub current_contact: Option<ContactResponse>,
    pub loading: bool,
    pub success_message: String,
    pub error_message: String,
    pub pagination: PageMeta,
    pub filters: ContactFilters,
}

impl Default for ContactsState {
    fn default() -> Self {
        Self {
            contacts: Vec::new(),
            current_contact: None,
            loading: false,
            success_message: String::new(),
            error_message: String::new(),
            pagination: PageMeta::default(),
            filters: ContactFilters::default(),
        }
    }
}

enum Flash {
    Success,
    Error,
}

/// Contact collection store. Mutating actions apply the server's response
/// to the cached collection directly instead of re-fetching the page.
pub struct ContactsStore<G> {
    gateway: Arc<G>,
    state: Mutex<ContactsState>,
    subscribers: Mutex<Vec<Subscriber>>,
    message_epoch: AtomicU64,
}

impl<G: ContactsGateway + 'static> ContactsStore<G> {
    pub fn new(gateway: Arc<G>) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            state: Mutex::new(ContactsState::default()),
            subscribers: Mutex::new(Vec::new()),
            message_epoch: AtomicU64::new(0),
        })
    }

    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.subscribers.lock().unwrap().push(Box::new(listener));
    }

    pub fn state(&self) -> ContactsState {
        self.state.lock().unwrap().clone()
    }

    pub fn has_contacts(&self) -> bool {
        !self.state.lock().unwrap().contacts.is_empty()
    }

    pub fn total_pages(&self) -> u32 {
        self.state.lock().unwrap().pagination.last_page
    }

    pub async fn fetch_contacts(self: &Arc<Self>, token: &str) -> GatewayResult<Vec<ContactResponse>> {
        self.set_loading(true);
        let filters = self.state.lock().unwrap().filters.clone();
        let outcome = match self.gateway.list_contacts(token, &filters).await {
            Ok((items, meta)) => {
                self.with_state(|s| {
                    s.contacts = items.clone();
                    s.pagination = meta;
                });
                Ok(items)
            }
            Err(e) => {
                self.flash(Flash::Error, e.to_string());
                Err(e)
            }
        };
        self.set_loading(false);
        outcome
    }

    pub async fn fetch_contact(self: &Arc<Self>, token: &str, id: Uuid) -> GatewayResult<ContactResponse> {
        self.set_loading(true);
        let outcome = match self.gateway.fetch_contact(token, id).await {
            Ok(contact) => {
                self.with_state(|s| s.current_contact = Some(contact.clone()));
                Ok(contact)
            }
            Err(e) => {
                self.flash(Flash::Error, e.to_string());
                Err(e)
            }
        };
        self.set_loading(false);
        outcome
    }

    pub async fn create_contact(
        self: &Arc<Self>,
        token: &str,
        draft: &ContactDraft,
    ) -> GatewayResult<ContactResponse> {
        self.set_loading(true);
        let outcome = match self.gateway.create_contact(token, draft).await {
            Ok(contact) => {
                self.with_state(|s| {
                    s.contacts.insert(0, contact.clone());
                    s.pagination.total += 1;
                });
                self.flash(Flash::Success, "Contact created successfully!".to_string());
                Ok(contact)
            }
            Err(e) => {
                self.flash(Flash::Error, e.to_string());
                Err(e)
            }
        };
        self.set_loading(false);
        outcome
    }

    pub async fn update_contact(
        self: &Arc<Self>,
        token: &str,
        id: Uuid,
        draft: &ContactDraft,
    ) -> GatewayResult<ContactResponse> {
        self.set_loading(true);
        let outcome = match self.gateway.update_contact(token, id, draft).await {
            Ok(contact) => {
                self.with_state(|s| {
                    if let Some(slot) = s.contacts.iter_mut().find(|c| c.id == contact.id) {
                        *slot = contact.clone();
                    }
                    if s.current_contact.as_ref().is_some_and(|c| c.id == contact.id) {
                        s.current_contact = Some(contact.clone());
                    }
                });
                self.flash(Flash::Success, "Contact updated successfully!".to_string());
                Ok(contact)
            }
            Err(e) => {
                self.flash(Flash::Error, e.to_string());
                Err(e)
            }
        };
        self.set_loading(false);
        outcome
    }

    pub async fn delete_contact(self: &Arc<Self>, token: &str, id: Uuid) -> GatewayResult<()> {
        self.set_loading(true);
        let outcome = match self.gateway.delete_contact(token, id).await {
            Ok(()) => {
                self.with_state(|s| {
                    s.contacts.retain(|c| c.id != id);
                    if s.current_contact.as_ref().is_some_and(|c| c.id == id) {
                        s.current_contact = None;
                    }
                    s.pagination.total = s.pagination.total.saturating_sub(1);
                });
                self.flash(Flash::Success, "Contact deleted successfully!".to_string());
                Ok(())
            }
            Err(e) => {
                self.flash(Flash::Error, e.to_string());
                Err(e)
            }
        };
        self.set_loading(false);
        outcome
    }

    pub fn set_filters(&self, apply: impl FnOnce(&mut ContactFilters)) {
        self.with_state(|s| apply(&mut s.filters));
    }

    pub fn clear_filters(&self) {
        self.with_state(|s| s.filters = ContactFilters::default());
    }

    pub fn clear_current_contact(&self) {
        self.with_state(|s| s.current_contact = None);
    }

    pub fn clear_messages(&self) {
        self.with_state(|s| {
            s.success_message.clear();
            s.error_message.clear();
        });
    }

    fn set_loading(&self, loading: bool) {
        self.with_state(|s| s.loading = loading);
    }

    /// Shows a flash message and schedules its removal. A newer message
    /// bumps the epoch, so a stale timer never clears it early.
    fn flash(self: &Arc<Self>, kind: Flash, text: String) {
        let epoch = self.message_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.with_state(|s| match kind {
            Flash::Success => {
                s.success_message = text;
                s.error_message.clear();
            }
            Flash::Error => {
                s.error_message = text;
                s.success_message.clear();
            }
        });

        let store = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(MESSAGE_TTL).await;
            if store.message_epoch.load(Ordering::SeqCst) == epoch {
                store.with_state(|s| {
                    s.success_message.clear();
                    s.error_message.clear();
                });
            }
        });
    }

    fn with_state(&self, apply: impl FnOnce(&mut ContactsState)) {
        apply(&mut self.state.lock().unwrap());
        self.notify();
    }

    fn notify(&self) {
        for listener in self.subscribers.lock().unwrap().iter() {
            listener();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::client::gateway::{ApiFailure, GatewayError};
    use crate::models::AuthPayload;

    fn sample_contact(first: &str, last: &str) -> ContactResponse {
        ContactResponse {
            id: Uuid::new_v4(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            full_name: format!("{first} {last}"),
            email: format!("{}@example.com", first.to_lowercase()),
            phone: None,
            company: None,
            address: None,
            birth_date: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    struct MockGateway {
        fail: AtomicBool,
    }

    impl MockGateway {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fail: AtomicBool::new(false),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: AtomicBool::new(true),
            })
        }

        fn check(&self) -> GatewayResult<()> {
            if self.fail.load(Ordering::SeqCst) {
                Err(GatewayError::Api(ApiFailure {
                    message: "Validation failed".to_string(),
                    errors: None,
                    error: None,
                }))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl ContactsGateway for MockGateway {
        async fn login(&self, email: &str, _password: &str) -> GatewayResult<AuthPayload> {
            self.check()?;
            Ok(AuthPayload {
                user: UserSummary {
                    id: Uuid::new_v4(),
                    name: "Test User".to_string(),
                    email: email.to_string(),
                },
                token: "issued-token".to_string(),
            })
        }

        async fn logout(&self, _token: &str) -> GatewayResult<()> {
            self.check()
        }

        async fn fetch_user(&self, _token: &str) -> GatewayResult<UserSummary> {
            self.check()?;
            Ok(UserSummary {
                id: Uuid::new_v4(),
                name: "Test User".to_string(),
                email: "test@example.com".to_string(),
            })
        }

        async fn refresh(&self, _token: &str) -> GatewayResult<AuthPayload> {
            self.check()?;
            Ok(AuthPayload {
                user: UserSummary {
                    id: Uuid::new_v4(),
                    name: "Test User".to_string(),
                    email: "test@example.com".to_string(),
                },
                token: "rotated-token".to_string(),
            })
        }

        async fn list_contacts(
            &self,
            _token: &str,
            filters: &ContactFilters,
        ) -> GatewayResult<(Vec<ContactResponse>, PageMeta)> {
            self.check()?;
            let items = vec![sample_contact("Ada", "Lovelace"), sample_contact("Alan", "Turing")];
            Ok((
                items,
                PageMeta {
                    current_page: filters.page,
                    last_page: 1,
                    per_page: filters.per_page,
                    total: 2,
                },
            ))
        }

        async fn fetch_contact(&self, _token: &str, id: Uuid) -> GatewayResult<ContactResponse> {
            self.check()?;
            let mut contact = sample_contact("Grace", "Hopper");
            contact.id = id;
            Ok(contact)
        }

        async fn create_contact(
            &self,
            _token: &str,
            draft: &ContactDraft,
        ) -> GatewayResult<ContactResponse> {
            self.check()?;
            Ok(sample_contact(
                draft.first_name.as_deref().unwrap_or("New"),
                draft.last_name.as_deref().unwrap_or("Contact"),
            ))
        }

        async fn update_contact(
            &self,
            _token: &str,
            id: Uuid,
            draft: &ContactDraft,
        ) -> GatewayResult<ContactResponse> {
            self.check()?;
            let mut contact = sample_contact(
                draft.first_name.as_deref().unwrap_or("Edited"),
                draft.last_name.as_deref().unwrap_or("Contact"),
            );
            contact.id = id;
            Ok(contact)
        }

        async fn delete_contact(&self, _token: &str, _id: Uuid) -> GatewayResult<()> {
            self.check()
        }
    }

    #[tokio::test]
    async fn login_stores_session_and_logout_clears_it() {
        let store = AuthStore::new(MockGateway::new());

        store.login("test@example.com", "secret").await.unwrap();
        assert!(store.is_authenticated());
        assert_eq!(store.token().as_deref(), Some("issued-token"));

        store.logout().await;
        assert!(!store.is_authenticated());
        assert!(store.state().user.is_none());
    }

    #[tokio::test]
    async fn logout_clears_session_even_when_revocation_fails() {
        let gateway = MockGateway::new();
        let store = AuthStore::new(Arc::clone(&gateway));
        store.login("test@example.com", "secret").await.unwrap();

        gateway.fail.store(true, Ordering::SeqCst);
        store.logout().await;

        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn refresh_replaces_stored_token() {
        let store = AuthStore::new(MockGateway::new());
        store.login("test@example.com", "secret").await.unwrap();

        store.refresh().await.unwrap();
        assert_eq!(store.token().as_deref(), Some("rotated-token"));
    }

    #[tokio::test]
    async fn fetch_contacts_populates_collection_and_meta() {
        let store = ContactsStore::new(MockGateway::new());

        let items = store.fetch_contacts("t").await.unwrap();
        assert_eq!(items.len(), 2);

        let state = store.state();
        assert_eq!(state.contacts.len(), 2);
        assert_eq!(state.pagination.total, 2);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn create_prepends_locally_without_refetch() {
        let store = ContactsStore::new(MockGateway::new());
        store.fetch_contacts("t").await.unwrap();

        let draft = ContactDraft {
            first_name: Some("Edsger".to_string()),
            last_name: Some("Dijkstra".to_string()),
            ..ContactDraft::default()
        };
        let created = store.create_contact("t", &draft).await.unwrap();

        let state = store.state();
        assert_eq!(state.contacts.len(), 3);
        assert_eq!(state.contacts[0].id, created.id);
        assert_eq!(state.pagination.total, 3);
        assert_eq!(state.success_message, "Contact created successfully!");
    }

    #[tokio::test]
    async fn update_replaces_entry_and_current_contact() {
        let store = ContactsStore::new(MockGateway::new());
        store.fetch_contacts("t").await.unwrap();
        let id = store.state().contacts[0].id;
        store.fetch_contact("t", id).await.unwrap();

        let draft = ContactDraft {
            first_name: Some("Renamed".to_string()),
            ..ContactDraft::default()
        };
        store.update_contact("t", id, &draft).await.unwrap();

        let state = store.state();
        assert_eq!(state.contacts[0].first_name, "Renamed");
        assert_eq!(
            state.current_contact.as_ref().map(|c| c.first_name.as_str()),
            Some("Renamed")
        );
    }

    #[tokio::test]
    async fn delete_removes_entry_and_decrements_total() {
        let store = ContactsStore::new(MockGateway::new());
        store.fetch_contacts("t").await.unwrap();
        let id = store.state().contacts[0].id;
        store.fetch_contact("t", id).await.unwrap();

        store.delete_contact("t", id).await.unwrap();

        let state = store.state();
        assert_eq!(state.contacts.len(), 1);
        assert!(state.current_contact.is_none());
        assert_eq!(state.pagination.total, 1);
    }

    #[tokio::test]
    async fn failed_action_sets_error_and_clears_loading() {
        let store = ContactsStore::new(MockGateway::failing());

        let result = store.fetch_contacts("t").await;
        assert!(result.is_err());

        let state = store.state();
        assert!(!state.loading);
        assert_eq!(state.error_message, "Validation failed");
        assert!(state.contacts.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn flash_messages_expire_after_three_seconds() {
        let store = ContactsStore::new(MockGateway::new());
        store
            .create_contact("t", &ContactDraft::default())
            .await
            .unwrap();
        assert_eq!(store.state().success_message, "Contact created successfully!");

        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert!(store.state().success_message.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_message_outlives_stale_timer() {
        let store = ContactsStore::new(MockGateway::new());
        store
            .create_contact("t", &ContactDraft::default())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(2000)).await;
        let id = Uuid::new_v4();
        store.delete_contact("t", id).await.unwrap();

        // The first timer fires here; the newer message must survive it.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(store.state().success_message, "Contact deleted successfully!");

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert!(store.state().success_message.is_empty());
    }

    #[tokio::test]
    async fn subscribers_run_on_every_mutation() {
        let store = ContactsStore::new(MockGateway::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        store.subscribe(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.set_filters(|f| f.search = "ada".to_string());
        store.clear_messages();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
