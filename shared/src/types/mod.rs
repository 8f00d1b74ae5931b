pub mod api_error;
pub mod auth;
pub mod client_config;
pub mod comment;
pub mod news;
pub mod principal;
pub mod resource;
pub mod token;

pub use self::api_error::ApiError;
pub use self::auth::{ApiErrorBody, ErrorDetail, RegisterRequest, TokenResponse};
pub use self::client_config::{AppConfig, ConfigError, EditConfig, ServiceConfig, StorageConfig};
pub use self::comment::{Comment, CommentPayload};
pub use self::news::{AuthorShort, News, NewsContent, NewsPayload};
pub use self::principal::Principal;
pub use self::resource::Authored;
pub use self::token::{TokenClaims, TokenError};
