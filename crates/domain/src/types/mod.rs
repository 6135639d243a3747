//! Domain types and models

pub mod post;
pub mod user;

pub use post::{validate_post_text, PostMetrics, RemotePost};
pub use user::{User, UserMetrics};
