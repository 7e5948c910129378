//! Collaborator contracts consumed by the cart core.
pub mod auth;
pub mod catalog;
pub mod payment;

pub use auth::{AuthError, AuthSession, AuthToken, Credentials, Registration, Session, User};
pub use catalog::{CatalogError, CatalogService};
pub use payment::{
    ClientSecret, PaymentAuthorizer, PaymentConfirmation, PaymentConfirmer, PaymentError, PaymentIntentStatus, PaymentMethod,
};
