//! Server-rendered page shell.
//!
//! Every page is the same HTML document: a mount point, the page data as an
//! inline JSON script (`<script id="pageData" type="application/json">`) and
//! the client bundle that hydrates from it.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::user::User;
use crate::store::OwnedNotebook;

pub const PAGE_DATA_ID: &str = "pageData";
const CLIENT_BUNDLE: &str = "server.home";

/// Name and avatar of a user. Serializes to `{}` for anonymous visitors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserInfo {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user: &User) -> Self {
        Self {
            name: Some(user.username.clone()),
            avatar: Some(user.avatar_url()),
        }
    }

    pub fn from_session(user: Option<&User>) -> Self {
        user.map(Self::for_user).unwrap_or_else(Self::anonymous)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookSummary {
    pub id: Uuid,
    pub title: String,
    pub owner: String,
    pub avatar: String,
    pub latest_revision: DateTime<Utc>,
}

impl From<&OwnedNotebook> for NotebookSummary {
    fn from(row: &OwnedNotebook) -> Self {
        Self {
            id: row.notebook.id,
            title: row.notebook.title.clone(),
            owner: row.owner.username.clone(),
            avatar: row.owner.avatar_url(),
            latest_revision: row.notebook.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexPageData {
    pub user_info: UserInfo,
    pub notebook_list: Vec<NotebookSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPageData {
    pub user_info: UserInfo,
    pub notebook_list: Vec<NotebookSummary>,
    pub this_user: UserInfo,
}

pub fn render_page<T: Serialize>(
    title: &str,
    page_data: &T,
    config: &Config,
) -> Result<Html<String>, AppError> {
    let json = serde_json::to_string(page_data)
        .map_err(|err| AppError::Internal(format!("failed to serialize page data: {err}")))?;

    Ok(Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
</head>
<body>
<div id="page"></div>
<script id="{PAGE_DATA_ID}" type="application/json">{data}</script>
<script src="{static_url}{CLIENT_BUNDLE}.{version}.js"></script>
</body>
</html>
"#,
        title = escape_html(title),
        data = escape_script_json(&json),
        static_url = escape_html(&config.static_url),
        version = escape_html(&config.app_version),
    )))
}

/// Plain HTML 404 for page routes; API routes keep the JSON error body.
pub fn render_not_found(title: &str) -> Response {
    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Not found</title>
</head>
<body>
<h1>Not found</h1>
<p>{title} does not exist.</p>
<p><a href="/">Back to all notebooks</a></p>
</body>
</html>
"#,
        title = escape_html(title),
    );
    (StatusCode::NOT_FOUND, Html(html)).into_response()
}

/// Makes serialized JSON safe to inline in a `<script>` element. The
/// replaced characters can only occur inside JSON strings, where the
/// unicode escapes decode back to the same text.
fn escape_script_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            other => out.push(other),
        }
    }
    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}
