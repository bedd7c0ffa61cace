// Service exports
pub mod auth;
pub mod google;
pub mod mailer;
pub mod memory;
pub mod postgres;
pub mod store;

pub use auth::{AuthError, AuthService, Claims, TokenKind, TokenPair};
pub use google::{GoogleAuthError, GoogleIdentity, GoogleVerifier};
pub use mailer::{MailClient, MailError};
pub use memory::InMemoryStore;
pub use postgres::{NewUser, PostgresClient};
pub use store::{AnswerStore, MatchRepository, StoreError, UserDirectory};
