use axum::{
    Extension, Router,
    extract::Path,
    response::{Html, IntoResponse, Response},
    routing::get,
};

use crate::errors::AppError;
use crate::logging::SanitizedUsername;
use crate::page::{
    IndexPageData, NotebookSummary, UserInfo, UserPageData, render_not_found, render_page,
};
use crate::security::auth::CurrentUser;
use crate::state::AppState;
use crate::store::NotebookFilter;

/// Upper bound on notebooks listed on the front page.
pub const INDEX_NOTEBOOK_LIMIT: i64 = 100;

pub fn router() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/user/:name", get(user_page))
}

#[tracing::instrument(name = "index_page", skip_all)]
pub async fn index(
    Extension(state): Extension<AppState>,
    CurrentUser(current): CurrentUser,
) -> Result<Html<String>, AppError> {
    let notebooks = state
        .store
        .list_notebooks(NotebookFilter::all().limit(INDEX_NOTEBOOK_LIMIT))
        .await?;

    tracing::debug!(
        authenticated = current.is_some(),
        notebooks = notebooks.len(),
        "Rendering index page"
    );

    let page_data = IndexPageData {
        user_info: UserInfo::from_session(current.as_ref()),
        notebook_list: notebooks.iter().map(NotebookSummary::from).collect(),
    };
    render_page("Notebooks", &page_data, &state.config)
}

#[tracing::instrument(name = "user_page", skip_all, fields(username = %SanitizedUsername::new(&name)))]
pub async fn user_page(
    Extension(state): Extension<AppState>,
    CurrentUser(current): CurrentUser,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let Some(this_user) = state.store.user_by_username(&name).await? else {
        tracing::debug!("No such user");
        return Ok(render_not_found(&format!("User {name}")));
    };

    let notebooks = state
        .store
        .list_notebooks(NotebookFilter::owned_by(this_user.id))
        .await?;

    tracing::debug!(
        authenticated = current.is_some(),
        notebooks = notebooks.len(),
        "Rendering user page"
    );

    let page_data = UserPageData {
        user_info: UserInfo::from_session(current.as_ref()),
        notebook_list: notebooks.iter().map(NotebookSummary::from).collect(),
        this_user: UserInfo::for_user(&this_user),
    };
    Ok(render_page(&this_user.username, &page_data, &state.config)?.into_response())
}
