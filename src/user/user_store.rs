use super::auth::{AuthToken, AuthTokenValue};
use super::user_models::{
    Category, JournalEntry, JournalEntryUpdate, NewJournalEntry, NewUser, PasswordCredentials,
    User, UserDetailsUpdate, VerificationRecord,
};
use anyhow::Result;
use chrono::{DateTime, Utc};

pub trait UserStore: Send + Sync {
    /// Creates the user row and its first verification code in one
    /// transaction and returns the new user id.
    fn create_user(&self, new_user: &NewUser) -> Result<usize>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: usize) -> Result<Option<User>>;

    /// Returns Ok(None) if no user has this email.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    fn get_password_credentials(&self, user_id: usize) -> Result<Option<PasswordCredentials>>;

    fn update_password_credentials(
        &self,
        user_id: usize,
        credentials: &PasswordCredentials,
    ) -> Result<()>;

    /// Applies the non-empty fields of `update`. Returns false if the user does not exist.
    fn update_user_details(&self, user_id: usize, update: &UserDetailsUpdate) -> Result<bool>;
}

pub trait UserVerificationStore: Send + Sync {
    fn get_verification_by_email(&self, email: &str) -> Result<Option<VerificationRecord>>;

    /// Looks the user up by the currently stored code. Superseded codes never match.
    fn get_verification_by_code(&self, code: &str) -> Result<Option<VerificationRecord>>;

    /// Overwrites the stored code and its issue time of a still inactive
    /// user. The last write wins. Returns false if the user is already active.
    fn set_verification_code(
        &self,
        user_id: usize,
        code: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Marks the user active if it is still inactive and `code` is still the
    /// stored one. Returns true only for the call that performed the change.
    fn activate_user(&self, user_id: usize, code: &str) -> Result<bool>;
}

pub trait UserAuthTokenStore: Send + Sync {
    fn add_auth_token(&self, token: &AuthToken) -> Result<()>;

    /// Returns Ok(None) if the token does not exist.
    fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Returns the deleted token, or Ok(None) if it did not exist.
    fn delete_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Deletes every token created before `cutoff` and returns how many went away.
    fn prune_auth_tokens_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// Journal entries and categories. Every call is scoped to `user_id`.
pub trait JournalStore: Send + Sync {
    fn create_category(&self, user_id: usize, name: &str) -> Result<usize>;

    fn get_category(&self, user_id: usize, category_id: usize) -> Result<Option<Category>>;

    fn get_categories(&self, user_id: usize) -> Result<Vec<Category>>;

    fn rename_category(&self, user_id: usize, category_id: usize, name: &str) -> Result<bool>;

    /// Entries of a deleted category stay, with no category.
    fn delete_category(&self, user_id: usize, category_id: usize) -> Result<bool>;

    fn create_entry(&self, user_id: usize, entry: &NewJournalEntry) -> Result<usize>;

    fn get_entry(&self, user_id: usize, entry_id: usize) -> Result<Option<JournalEntry>>;

    /// All entries, or only those of `category_id` when given, newest first.
    fn get_entries(&self, user_id: usize, category_id: Option<usize>) -> Result<Vec<JournalEntry>>;

    fn update_entry(
        &self,
        user_id: usize,
        entry_id: usize,
        update: &JournalEntryUpdate,
    ) -> Result<bool>;

    fn delete_entry(&self, user_id: usize, entry_id: usize) -> Result<bool>;
}

/// Combined trait for everything the server keeps in the user database
pub trait FullUserStore: UserStore + UserVerificationStore + UserAuthTokenStore + JournalStore {}

impl<T: UserStore + UserVerificationStore + UserAuthTokenStore + JournalStore> FullUserStore for T {}
