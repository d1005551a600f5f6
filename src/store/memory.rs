use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::notebook::{NewNotebook, NewNotebookRevision, Notebook, NotebookRevision};
use crate::models::user::{NewUser, User};

use super::{NotebookFilter, NotebookStore, OwnedNotebook, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    notebooks: Vec<Notebook>,
    revisions: Vec<NotebookRevision>,
}

impl Tables {
    fn insert_notebook(&mut self, notebook: NewNotebook) -> StoreResult<Notebook> {
        if !self.users.iter().any(|u| u.id == notebook.owner_id) {
            return Err(AppError::Conflict(
                "foreign key constraint violation".to_string(),
            ));
        }

        let now = Utc::now();
        let created = Notebook {
            id: Uuid::new_v4(),
            owner_id: notebook.owner_id,
            title: notebook.title,
            created_at: now,
            updated_at: now,
        };
        self.notebooks.push(created.clone());
        Ok(created)
    }

    fn insert_revision(&mut self, revision: NewNotebookRevision) -> StoreResult<NotebookRevision> {
        let Some(notebook) = self
            .notebooks
            .iter_mut()
            .find(|n| n.id == revision.notebook_id)
        else {
            return Err(AppError::Conflict(
                "foreign key constraint violation".to_string(),
            ));
        };

        let created = NotebookRevision {
            id: Uuid::new_v4(),
            notebook_id: revision.notebook_id,
            title: revision.title,
            content: revision.content,
            created_at: Utc::now(),
        };
        notebook.title = created.title.clone();
        notebook.updated_at = created.created_at;

        self.revisions.push(created.clone());
        Ok(created)
    }
}

/// Process-local store holding the same constraints as the SQL schema.
/// Used when no database is configured and by the test suite.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotebookStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(
                "duplicate value violates users_username_key".to_string(),
            ));
        }
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::Conflict(
                "duplicate value violates users_email_key".to_string(),
            ));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_notebook_with_revision(
        &self,
        notebook: NewNotebook,
        mut first_revision: NewNotebookRevision,
    ) -> StoreResult<(Notebook, NotebookRevision)> {
        let mut tables = self.tables.write().await;
        let mut created = tables.insert_notebook(notebook)?;
        first_revision.notebook_id = created.id;
        let revision = tables.insert_revision(first_revision)?;

        created.title = revision.title.clone();
        created.updated_at = revision.created_at;
        Ok((created, revision))
    }

    async fn notebook(&self, id: Uuid) -> StoreResult<Option<Notebook>> {
        let tables = self.tables.read().await;
        Ok(tables.notebooks.iter().find(|n| n.id == id).cloned())
    }

    async fn create_revision(
        &self,
        revision: NewNotebookRevision,
    ) -> StoreResult<NotebookRevision> {
        let mut tables = self.tables.write().await;
        tables.insert_revision(revision)
    }

    async fn list_notebooks(&self, filter: NotebookFilter) -> StoreResult<Vec<OwnedNotebook>> {
        let tables = self.tables.read().await;

        let mut rows: Vec<OwnedNotebook> = tables
            .notebooks
            .iter()
            .filter(|n| filter.owner_id.is_none_or(|owner| n.owner_id == owner))
            .filter_map(|n| {
                let owner = tables.users.iter().find(|u| u.id == n.owner_id)?;
                Some(OwnedNotebook {
                    notebook: n.clone(),
                    owner: owner.clone(),
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            b.notebook
                .updated_at
                .cmp(&a.notebook.updated_at)
                .then_with(|| a.notebook.id.cmp(&b.notebook.id))
        });
        if let Some(limit) = filter.limit {
            rows.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(rows)
    }

    async fn list_revisions(&self, notebook_id: Uuid) -> StoreResult<Vec<NotebookRevision>> {
        let tables = self.tables.read().await;
        let mut revisions: Vec<NotebookRevision> = tables
            .revisions
            .iter()
            .filter(|r| r.notebook_id == notebook_id)
            .cloned()
            .collect();
        // Later pushes win ties so equal timestamps still read newest first.
        revisions.reverse();
        revisions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(revisions)
    }

    async fn revision(
        &self,
        notebook_id: Uuid,
        revision_id: Uuid,
    ) -> StoreResult<Option<NotebookRevision>> {
        let tables = self.tables.read().await;
        Ok(tables
            .revisions
            .iter()
            .find(|r| r.id == revision_id && r.notebook_id == notebook_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
        }
    }

    #[tokio::test]
    async fn test_unique_username_and_email() {
        let store = MemoryStore::new();
        store
            .create_user(new_user("testuser", "user@foo.com"))
            .await
            .unwrap();

        let same_name = store
            .create_user(new_user("testuser", "other@foo.com"))
            .await;
        assert!(matches!(same_name, Err(AppError::Conflict(_))));

        let same_email = store
            .create_user(new_user("other", "user@foo.com"))
            .await;
        assert!(matches!(same_email, Err(AppError::Conflict(_))));
    }

    fn first_revision() -> NewNotebookRevision {
        NewNotebookRevision {
            notebook_id: Uuid::nil(),
            title: "First revision".to_string(),
            content: "*fake notebook content*".to_string(),
        }
    }

    async fn seed_notebook(store: &MemoryStore, owner_id: Uuid, title: &str) -> Notebook {
        let (notebook, _) = store
            .create_notebook_with_revision(
                NewNotebook {
                    owner_id,
                    title: title.to_string(),
                },
                first_revision(),
            )
            .await
            .unwrap();
        notebook
    }

    #[tokio::test]
    async fn test_notebook_created_with_first_revision() {
        let store = MemoryStore::new();
        let owner = store
            .create_user(new_user("testuser", "user@foo.com"))
            .await
            .unwrap();

        let (notebook, revision) = store
            .create_notebook_with_revision(
                NewNotebook {
                    owner_id: owner.id,
                    title: "Fake notebook".to_string(),
                },
                first_revision(),
            )
            .await
            .unwrap();
        assert_eq!(revision.notebook_id, notebook.id);
        assert_eq!(notebook.title, "First revision");
        assert_eq!(notebook.updated_at, revision.created_at);

        let stored = store.list_revisions(notebook.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, revision.id);
    }

    #[tokio::test]
    async fn test_failed_notebook_leaves_no_revision() {
        let store = MemoryStore::new();
        let result = store
            .create_notebook_with_revision(
                NewNotebook {
                    owner_id: Uuid::new_v4(),
                    title: "Orphan".to_string(),
                },
                first_revision(),
            )
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let tables = store.tables.read().await;
        assert!(tables.notebooks.is_empty());
        assert!(tables.revisions.is_empty());
    }

    #[tokio::test]
    async fn test_revision_updates_notebook_and_listing_order() {
        let store = MemoryStore::new();
        let owner = store
            .create_user(new_user("testuser", "user@foo.com"))
            .await
            .unwrap();
        let other = store
            .create_user(new_user("other", "other@foo.com"))
            .await
            .unwrap();

        let first = seed_notebook(&store, owner.id, "First").await;
        let second = seed_notebook(&store, other.id, "Second").await;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let revision = store
            .create_revision(NewNotebookRevision {
                notebook_id: first.id,
                title: "Renamed".to_string(),
                content: "*content*".to_string(),
            })
            .await
            .unwrap();

        let listing = store.list_notebooks(NotebookFilter::all()).await.unwrap();
        let ids: Vec<Uuid> = listing.iter().map(|row| row.notebook.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert_eq!(listing[0].notebook.title, "Renamed");
        assert_eq!(listing[0].notebook.updated_at, revision.created_at);
        assert_eq!(listing[0].owner.username, "testuser");

        let mine = store
            .list_notebooks(NotebookFilter::owned_by(other.id))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].notebook.id, second.id);

        let limited = store
            .list_notebooks(NotebookFilter::all().limit(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_revision_lookup_is_scoped_to_notebook() {
        let store = MemoryStore::new();
        let owner = store
            .create_user(new_user("testuser", "user@foo.com"))
            .await
            .unwrap();
        let notebook = seed_notebook(&store, owner.id, "Fake notebook").await;
        let revision = store
            .create_revision(NewNotebookRevision {
                notebook_id: notebook.id,
                title: "Second revision".to_string(),
                content: "# updated".to_string(),
            })
            .await
            .unwrap();

        let found = store.revision(notebook.id, revision.id).await.unwrap();
        assert_eq!(found.map(|r| r.content).as_deref(), Some("# updated"));

        let elsewhere = store.revision(Uuid::new_v4(), revision.id).await.unwrap();
        assert!(elsewhere.is_none());
    }
}
