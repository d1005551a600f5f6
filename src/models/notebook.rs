use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::models::user::User;
use crate::schema::{notebook_revisions, notebooks};

use super::{ModelValidationError, ValidationResult};

pub const TITLE_MAX_CHARS: usize = 120;
pub const CONTENT_MAX_BYTES: usize = 60 * 1024;

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = notebooks)]
#[diesel(belongs_to(User, foreign_key = owner_id))]
pub struct Notebook {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Time of the most recent revision.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = notebooks)]
pub struct NewNotebook {
    pub owner_id: Uuid,
    pub title: String,
}

impl NewNotebook {
    pub fn validate(&mut self) -> ValidationResult<()> {
        if self.owner_id.is_nil() {
            return Err(ModelValidationError::InvalidId);
        }

        self.title = self.title.trim().to_string();
        ensure_valid_title(&self.title)
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = notebook_revisions)]
#[diesel(belongs_to(Notebook))]
pub struct NotebookRevision {
    pub id: Uuid,
    pub notebook_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = notebook_revisions)]
pub struct NewNotebookRevision {
    pub notebook_id: Uuid,
    pub title: String,
    pub content: String,
}

impl NewNotebookRevision {
    pub fn validate(&mut self) -> ValidationResult<()> {
        if self.notebook_id.is_nil() {
            return Err(ModelValidationError::InvalidId);
        }

        self.title = self.title.trim().to_string();
        ensure_valid_title(&self.title)?;

        if self.content.len() > CONTENT_MAX_BYTES {
            return Err(ModelValidationError::ContentTooLarge(CONTENT_MAX_BYTES));
        }
        Ok(())
    }
}

fn ensure_valid_title(value: &str) -> ValidationResult<()> {
    let len = value.chars().count();
    if len == 0 || len > TITLE_MAX_CHARS {
        return Err(ModelValidationError::InvalidTitle);
    }

    if value.chars().any(char::is_control) {
        return Err(ModelValidationError::InvalidTitle);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notebook_title_trimmed() {
        let mut notebook = NewNotebook {
            owner_id: Uuid::new_v4(),
            title: "  Fake notebook  ".to_string(),
        };
        notebook.validate().unwrap();
        assert_eq!(notebook.title, "Fake notebook");
    }

    #[test]
    fn test_notebook_requires_owner() {
        let mut notebook = NewNotebook {
            owner_id: Uuid::nil(),
            title: "Fake notebook".to_string(),
        };
        assert_eq!(notebook.validate(), Err(ModelValidationError::InvalidId));
    }

    #[test]
    fn test_title_rules() {
        assert!(ensure_valid_title("First revision").is_ok());
        assert!(ensure_valid_title("").is_err());
        assert!(ensure_valid_title("tab\there").is_err());
        assert!(ensure_valid_title(&"t".repeat(TITLE_MAX_CHARS + 1)).is_err());
    }

    #[test]
    fn test_revision_content_may_be_empty_but_bounded() {
        let mut empty = NewNotebookRevision {
            notebook_id: Uuid::new_v4(),
            title: "First revision".to_string(),
            content: String::new(),
        };
        assert!(empty.validate().is_ok());

        let mut huge = NewNotebookRevision {
            content: "x".repeat(CONTENT_MAX_BYTES + 1),
            ..empty
        };
        assert_eq!(
            huge.validate(),
            Err(ModelValidationError::ContentTooLarge(CONTENT_MAX_BYTES))
        );
    }
}
