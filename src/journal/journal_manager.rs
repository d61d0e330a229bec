use crate::user::{Category, FullUserStore, JournalEntry, JournalEntryUpdate, NewJournalEntry};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub const MAX_CONTENT_LENGTH: usize = 1000;
pub const MAX_TITLE_LENGTH: usize = 200;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("{0}")]
    Invalid(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Duplicate(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub struct JournalManager {
    store: Arc<dyn FullUserStore>,
}

impl JournalManager {
    pub fn new(store: Arc<dyn FullUserStore>) -> Self {
        Self { store }
    }

    pub fn create_category(&self, user_id: usize, name: &str) -> Result<Category, JournalError> {
        let name = validate_category_name(name)?;
        let id = self
            .store
            .create_category(user_id, &name)
            .map_err(|err| map_duplicate_category(err, &name))?;
        debug!("User {} created category {}", user_id, id);
        Ok(Category { id, name })
    }

    pub fn list_categories(&self, user_id: usize) -> Result<Vec<Category>, JournalError> {
        Ok(self.store.get_categories(user_id)?)
    }

    pub fn rename_category(
        &self,
        user_id: usize,
        category_id: usize,
        name: &str,
    ) -> Result<Category, JournalError> {
        let name = validate_category_name(name)?;
        let renamed = self
            .store
            .rename_category(user_id, category_id, &name)
            .map_err(|err| map_duplicate_category(err, &name))?;
        if !renamed {
            return Err(JournalError::NotFound("Category"));
        }
        Ok(Category {
            id: category_id,
            name,
        })
    }

    /// Entries of the category are kept, without a category.
    pub fn delete_category(&self, user_id: usize, category_id: usize) -> Result<(), JournalError> {
        if !self.store.delete_category(user_id, category_id)? {
            return Err(JournalError::NotFound("Category"));
        }
        Ok(())
    }

    pub fn create_entry(
        &self,
        user_id: usize,
        entry: NewJournalEntry,
    ) -> Result<JournalEntry, JournalError> {
        let entry = NewJournalEntry {
            title: validate_title(&entry.title)?,
            content: validate_content(&entry.content)?,
            category_id: entry.category_id,
        };
        if let Some(category_id) = entry.category_id {
            self.ensure_category(user_id, category_id)?;
        }

        let id = self.store.create_entry(user_id, &entry)?;
        self.get_entry(user_id, id)
    }

    pub fn get_entry(&self, user_id: usize, entry_id: usize) -> Result<JournalEntry, JournalError> {
        self.store
            .get_entry(user_id, entry_id)?
            .ok_or(JournalError::NotFound("Journal entry"))
    }

    pub fn list_entries(&self, user_id: usize) -> Result<Vec<JournalEntry>, JournalError> {
        Ok(self.store.get_entries(user_id, None)?)
    }

    pub fn list_entries_in_category(
        &self,
        user_id: usize,
        category_id: usize,
    ) -> Result<Vec<JournalEntry>, JournalError> {
        self.ensure_category(user_id, category_id)?;
        Ok(self.store.get_entries(user_id, Some(category_id))?)
    }

    pub fn update_entry(
        &self,
        user_id: usize,
        entry_id: usize,
        update: JournalEntryUpdate,
    ) -> Result<JournalEntry, JournalError> {
        let update = JournalEntryUpdate {
            title: update.title.as_deref().map(validate_title).transpose()?,
            content: update.content.as_deref().map(validate_content).transpose()?,
            category_id: update.category_id,
        };
        if let Some(category_id) = update.category_id {
            self.ensure_category(user_id, category_id)?;
        }

        if !self.store.update_entry(user_id, entry_id, &update)? {
            return Err(JournalError::NotFound("Journal entry"));
        }
        self.get_entry(user_id, entry_id)
    }

    pub fn delete_entry(&self, user_id: usize, entry_id: usize) -> Result<(), JournalError> {
        if !self.store.delete_entry(user_id, entry_id)? {
            return Err(JournalError::NotFound("Journal entry"));
        }
        Ok(())
    }

    fn ensure_category(&self, user_id: usize, category_id: usize) -> Result<(), JournalError> {
        match self.store.get_category(user_id, category_id)? {
            Some(_) => Ok(()),
            None => Err(JournalError::NotFound("Category")),
        }
    }
}

fn validate_category_name(name: &str) -> Result<String, JournalError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(JournalError::Invalid(
            "The category name cannot be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn validate_title(title: &str) -> Result<String, JournalError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(JournalError::Invalid("The title cannot be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(JournalError::Invalid(format!(
            "The title cannot be longer than {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(title.to_string())
}

fn validate_content(content: &str) -> Result<String, JournalError> {
    if content.trim().is_empty() {
        return Err(JournalError::Invalid("The content cannot be empty".to_string()));
    }
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(JournalError::Invalid(format!(
            "The content cannot be longer than {} characters",
            MAX_CONTENT_LENGTH
        )));
    }
    Ok(content.to_string())
}

fn map_duplicate_category(err: anyhow::Error, name: &str) -> JournalError {
    if format!("{:#}", err).contains("UNIQUE constraint failed: category.") {
        JournalError::Duplicate(format!("The category '{}' already exists.", name))
    } else {
        JournalError::Store(err)
    }
}
