mod contact;
mod user;

pub use contact::{Contact, ContactChanges, ContactDraft, ContactResponse, NewContact};
pub use user::{AccessToken, AuthPayload, User, UserPayload, UserSummary};
