use axum::{Extension, Json, Router, extract::Path, http::StatusCode, routing::get};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::logging::LoggableUuid;
use crate::models::notebook::{NewNotebook, NewNotebookRevision, Notebook, NotebookRevision};
use crate::page::NotebookSummary;
use crate::routes::pages::INDEX_NOTEBOOK_LIMIT;
use crate::security::auth::AuthenticatedUser;
use crate::security::json::ValidatedJson;
use crate::state::AppState;
use crate::store::{NotebookFilter, OwnedNotebook};

pub fn router() -> Router {
    Router::new()
        .route("/api/notebooks", get(list_notebooks).post(create_notebook))
        .route(
            "/api/notebooks/:id/revisions",
            get(list_revisions).post(create_revision),
        )
        .route(
            "/api/notebooks/:id/revisions/:revision_id",
            get(get_revision),
        )
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RevisionPayload {
    title: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
pub struct RevisionSummary {
    id: Uuid,
    title: String,
    created: DateTime<Utc>,
}

impl From<NotebookRevision> for RevisionSummary {
    fn from(revision: NotebookRevision) -> Self {
        Self {
            id: revision.id,
            title: revision.title,
            created: revision.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionDetail {
    id: Uuid,
    notebook_id: Uuid,
    title: String,
    content: String,
    created: DateTime<Utc>,
}

impl From<NotebookRevision> for RevisionDetail {
    fn from(revision: NotebookRevision) -> Self {
        Self {
            id: revision.id,
            notebook_id: revision.notebook_id,
            title: revision.title,
            content: revision.content,
            created: revision.created_at,
        }
    }
}

async fn require_notebook(state: &AppState, id: Uuid) -> Result<Notebook, AppError> {
    state.store.notebook(id).await?.ok_or(AppError::NotFound)
}

fn new_revision(
    notebook_id: Uuid,
    payload: RevisionPayload,
) -> Result<NewNotebookRevision, AppError> {
    let mut revision = NewNotebookRevision {
        notebook_id,
        title: payload.title,
        content: payload.content,
    };
    revision.validate()?;
    Ok(revision)
}

pub async fn list_notebooks(
    Extension(state): Extension<AppState>,
) -> Result<Json<Vec<NotebookSummary>>, AppError> {
    let rows = state
        .store
        .list_notebooks(NotebookFilter::all().limit(INDEX_NOTEBOOK_LIMIT))
        .await?;
    Ok(Json(rows.iter().map(NotebookSummary::from).collect()))
}

/// Creates a notebook together with its first revision.
#[tracing::instrument(name = "create_notebook", skip_all, fields(user_id = %LoggableUuid(user.id)))]
pub async fn create_notebook(
    Extension(state): Extension<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<RevisionPayload>,
) -> Result<(StatusCode, Json<NotebookSummary>), AppError> {
    let mut new_notebook = NewNotebook {
        owner_id: user.id,
        title: payload.title.clone(),
    };
    new_notebook.validate()?;
    // The store assigns the real notebook id.
    let first_revision = new_revision(Uuid::new_v4(), payload)?;

    let (notebook, revision) = state
        .store
        .create_notebook_with_revision(new_notebook, first_revision)
        .await?;
    tracing::info!(
        notebook_id = %LoggableUuid(notebook.id),
        revision_id = %LoggableUuid(revision.id),
        "Notebook created"
    );

    let row = OwnedNotebook {
        notebook,
        owner: user,
    };
    Ok((StatusCode::CREATED, Json(NotebookSummary::from(&row))))
}

pub async fn list_revisions(
    Extension(state): Extension<AppState>,
    Path(notebook_id): Path<Uuid>,
) -> Result<Json<Vec<RevisionSummary>>, AppError> {
    require_notebook(&state, notebook_id).await?;
    let revisions = state.store.list_revisions(notebook_id).await?;
    Ok(Json(revisions.into_iter().map(RevisionSummary::from).collect()))
}

#[tracing::instrument(
    name = "create_revision",
    skip_all,
    fields(user_id = %LoggableUuid(user.id), notebook_id = %LoggableUuid(notebook_id))
)]
pub async fn create_revision(
    Extension(state): Extension<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(notebook_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<RevisionPayload>,
) -> Result<(StatusCode, Json<RevisionDetail>), AppError> {
    let notebook = require_notebook(&state, notebook_id).await?;
    if notebook.owner_id != user.id {
        return Err(AppError::Forbidden);
    }

    let revision = state
        .store
        .create_revision(new_revision(notebook.id, payload)?)
        .await?;
    tracing::debug!(revision_id = %LoggableUuid(revision.id), "Revision saved");

    Ok((StatusCode::CREATED, Json(RevisionDetail::from(revision))))
}

pub async fn get_revision(
    Extension(state): Extension<AppState>,
    Path((notebook_id, revision_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<RevisionDetail>, AppError> {
    let revision = state
        .store
        .revision(notebook_id, revision_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(RevisionDetail::from(revision)))
}
