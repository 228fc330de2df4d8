//! Data models for the client
//!
//! Each sub-module represents a feature area: posts and their attachments, the
//! ephemeral upload session, and users as seen through the identity provider.

mod attachment;
mod post;
mod upload;
mod user;

// Re-export all models for convenient imports
pub use attachment::*;
pub use post::*;
pub use upload::*;
pub use user::*;
