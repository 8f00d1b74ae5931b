use serde::{Deserialize, Serialize};

use super::news::AuthorShort;
use super::resource::Authored;

// ---------------------------------------------------------------------------
// Comment wire types
// ---------------------------------------------------------------------------

/// One comment as returned by `GET /comments/?news_id={id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    /// Immutable parent news id — carried along on every update.
    pub news_id: i64,
    pub text: String,
    pub author_id: i64,
    pub publication_date: String,
    #[serde(default)]
    pub author: Option<AuthorShort>,
}

impl Comment {
    pub fn author_label(&self) -> String {
        match &self.author {
            Some(author) => author.name.clone(),
            None => format!("#{}", self.author_id),
        }
    }
}

impl Authored for Comment {
    fn author_id(&self) -> i64 {
        self.author_id
    }
}

/// Request body for `POST /comments/` and `PUT /comments/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct CommentPayload {
    pub news_id: i64,
    pub text: String,
}
