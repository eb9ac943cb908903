//! Database models.

pub mod category;
pub mod comment;
pub mod content;
pub mod gmail_token;
pub mod media;
pub mod portfolio;
pub mod user;

pub use category::{Category, CategoryInput, CategoryWithCount};
pub use comment::{Comment, CommentThread, CreateComment};
pub use content::{ContentInput, ContentItem, ContentKind, ContentState, NewContent};
pub use gmail_token::GmailToken;
pub use media::{MediaCategory, MediaFile};
pub use portfolio::{Project, TeamMember, Testimonial};
pub use user::{Role, User};
