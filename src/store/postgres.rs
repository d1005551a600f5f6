use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::db::PgPool;
use crate::errors::AppError;
use crate::models::notebook::{NewNotebook, NewNotebookRevision, Notebook, NotebookRevision};
use crate::models::user::{NewUser, User};
use crate::schema::{notebook_revisions, notebooks, users};

use super::{NotebookFilter, NotebookStore, OwnedNotebook, StoreResult};

/// PostgreSQL-backed store; constraint violations come back as `Conflict`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> StoreResult<PooledConnection<'_, AsyncPgConnection>> {
        self.pool
            .get()
            .await
            .map_err(|err| AppError::Pool(err.to_string()))
    }
}

#[async_trait]
impl NotebookStore for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut conn = self.conn().await?;
        diesel::insert_into(users::table)
            .values(&user)
            .get_result(&mut conn)
            .await
            .map_err(AppError::from_diesel)
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let mut conn = self.conn().await?;
        let user = users::table
            .find(id)
            .first::<User>(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let mut conn = self.conn().await?;
        let user = users::table
            .filter(users::username.eq(username))
            .first::<User>(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let mut conn = self.conn().await?;
        let user = users::table
            .filter(users::email.eq(email))
            .first::<User>(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn create_notebook_with_revision(
        &self,
        notebook: NewNotebook,
        mut first_revision: NewNotebookRevision,
    ) -> StoreResult<(Notebook, NotebookRevision)> {
        let mut conn = self.conn().await?;
        conn.transaction::<_, DieselError, _>(|conn| {
            async move {
                let mut created: Notebook = diesel::insert_into(notebooks::table)
                    .values(&notebook)
                    .get_result(conn)
                    .await?;

                first_revision.notebook_id = created.id;
                let revision = insert_revision(conn, &first_revision).await?;

                created.title = revision.title.clone();
                created.updated_at = revision.created_at;
                Ok((created, revision))
            }
            .scope_boxed()
        })
        .await
        .map_err(AppError::from_diesel)
    }

    async fn notebook(&self, id: Uuid) -> StoreResult<Option<Notebook>> {
        let mut conn = self.conn().await?;
        let notebook = notebooks::table
            .find(id)
            .first::<Notebook>(&mut conn)
            .await
            .optional()?;
        Ok(notebook)
    }

    async fn create_revision(
        &self,
        revision: NewNotebookRevision,
    ) -> StoreResult<NotebookRevision> {
        let mut conn = self.conn().await?;
        conn.transaction::<_, DieselError, _>(|conn| {
            async move { insert_revision(conn, &revision).await }.scope_boxed()
        })
        .await
        .map_err(AppError::from_diesel)
    }

    async fn list_notebooks(&self, filter: NotebookFilter) -> StoreResult<Vec<OwnedNotebook>> {
        let mut conn = self.conn().await?;

        let mut query = notebooks::table
            .inner_join(users::table)
            .order((notebooks::updated_at.desc(), notebooks::id))
            .into_boxed::<Pg>();
        if let Some(owner_id) = filter.owner_id {
            query = query.filter(notebooks::owner_id.eq(owner_id));
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        let rows: Vec<(Notebook, User)> = query.load(&mut conn).await?;
        Ok(rows.into_iter().map(OwnedNotebook::from).collect())
    }

    async fn list_revisions(&self, notebook_id: Uuid) -> StoreResult<Vec<NotebookRevision>> {
        let mut conn = self.conn().await?;
        let revisions = notebook_revisions::table
            .filter(notebook_revisions::notebook_id.eq(notebook_id))
            .order(notebook_revisions::created_at.desc())
            .load::<NotebookRevision>(&mut conn)
            .await?;
        Ok(revisions)
    }

    async fn revision(
        &self,
        notebook_id: Uuid,
        revision_id: Uuid,
    ) -> StoreResult<Option<NotebookRevision>> {
        let mut conn = self.conn().await?;
        let revision = notebook_revisions::table
            .filter(notebook_revisions::id.eq(revision_id))
            .filter(notebook_revisions::notebook_id.eq(notebook_id))
            .first::<NotebookRevision>(&mut conn)
            .await
            .optional()?;
        Ok(revision)
    }
}

/// Inserts a revision and makes its title and timestamp the notebook's.
/// Callers run this inside a transaction.
async fn insert_revision(
    conn: &mut AsyncPgConnection,
    revision: &NewNotebookRevision,
) -> Result<NotebookRevision, DieselError> {
    let saved: NotebookRevision = diesel::insert_into(notebook_revisions::table)
        .values(revision)
        .get_result(conn)
        .await?;

    diesel::update(notebooks::table.find(saved.notebook_id))
        .set((
            notebooks::title.eq(&saved.title),
            notebooks::updated_at.eq(saved.created_at),
        ))
        .execute(conn)
        .await?;

    Ok(saved)
}
