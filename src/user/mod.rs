pub mod auth;
mod sqlite_user_store;
mod user_manager;
pub mod user_models;
mod user_store;

pub use auth::{AccessClaims, AccessTokenSigner, AuthToken, AuthTokenValue, JournHasher};
pub use sqlite_user_store::SqliteUserStore;
pub use user_manager::{
    Registration, RegisteredUser, TokenPair, UserError, UserManager, MAX_PHONE_NUMBER_LENGTH,
    MIN_PASSWORD_LENGTH,
};
pub use user_models::{
    Category, JournalEntry, JournalEntryUpdate, NewJournalEntry, NewUser, PasswordCredentials,
    User, UserDetailsUpdate, VerificationRecord,
};
pub use user_store::{
    FullUserStore, JournalStore, UserAuthTokenStore, UserStore, UserVerificationStore,
};
