use serde::{Deserialize, Serialize};

use super::resource::Authored;

// ---------------------------------------------------------------------------
// News wire types
// ---------------------------------------------------------------------------

/// Compact author record the service embeds in news and comment responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorShort {
    pub id: i64,
    pub name: String,
}

/// Structured body of a news item.  The service stores arbitrary JSON here;
/// the only field this client reads or writes is `text`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsContent {
    pub text: String,
}

/// One news item as returned by `GET /news/` and `GET /news/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct News {
    pub id: i64,
    pub title: String,
    pub content: NewsContent,
    #[serde(default)]
    pub cover: Option<String>,
    pub author_id: i64,
    pub publication_date: String,
    /// Present on current servers; older responses carry only `author_id`.
    #[serde(default)]
    pub author: Option<AuthorShort>,
}

impl News {
    /// Display name for the byline — author name when embedded,
    /// `#<id>` otherwise.
    pub fn author_label(&self) -> String {
        match &self.author {
            Some(author) => author.name.clone(),
            None => format!("#{}", self.author_id),
        }
    }
}

impl Authored for News {
    fn author_id(&self) -> i64 {
        self.author_id
    }
}

/// Request body for `POST /news/` and `PUT /news/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct NewsPayload {
    pub title: String,
    pub content: NewsContent,
    pub cover: Option<String>,
}
