//! Persistence for users, notebooks and their revisions.
//!
//! Handlers only see [`NotebookStore`]; the server picks [`PgStore`] when a
//! database is configured and [`MemoryStore`] otherwise.

mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::notebook::{NewNotebook, NewNotebookRevision, Notebook, NotebookRevision};
use crate::models::user::{NewUser, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, AppError>;

/// Which notebooks a listing returns, newest revision first.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotebookFilter {
    pub owner_id: Option<Uuid>,
    pub limit: Option<i64>,
}

impl NotebookFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn owned_by(owner_id: Uuid) -> Self {
        Self {
            owner_id: Some(owner_id),
            limit: None,
        }
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A notebook joined with its owner.
#[derive(Debug, Clone)]
pub struct OwnedNotebook {
    pub notebook: Notebook,
    pub owner: User,
}

impl From<(Notebook, User)> for OwnedNotebook {
    fn from((notebook, owner): (Notebook, User)) -> Self {
        Self { notebook, owner }
    }
}

#[async_trait]
pub trait NotebookStore: Send + Sync {
    /// Fails with `Conflict` when the username or email is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Inserts a notebook and its first revision together; either both are
    /// stored or neither is. The revision's `notebook_id` is overwritten.
    /// Fails with `Conflict` when the owner does not exist.
    async fn create_notebook_with_revision(
        &self,
        notebook: NewNotebook,
        first_revision: NewNotebookRevision,
    ) -> StoreResult<(Notebook, NotebookRevision)>;

    async fn notebook(&self, id: Uuid) -> StoreResult<Option<Notebook>>;

    /// Appends a revision and makes its title and timestamp the notebook's.
    async fn create_revision(&self, revision: NewNotebookRevision)
    -> StoreResult<NotebookRevision>;

    async fn list_notebooks(&self, filter: NotebookFilter) -> StoreResult<Vec<OwnedNotebook>>;

    /// Revisions of one notebook, newest first.
    async fn list_revisions(&self, notebook_id: Uuid) -> StoreResult<Vec<NotebookRevision>>;

    async fn revision(
        &self,
        notebook_id: Uuid,
        revision_id: Uuid,
    ) -> StoreResult<Option<NotebookRevision>>;
}
