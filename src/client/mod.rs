pub mod gateway;
pub mod store;

pub use gateway::{ContactFilters, ContactsGateway, GatewayError, GatewayResult, HttpGateway};
pub use store::{AuthStore, ContactsStore};
