//! Data models for channels, frames, messages, notifications and streams.

pub mod channel;
pub mod event;
pub mod message;
pub mod notification;
pub mod relation;
pub mod stream;
pub mod user;

pub use channel::*;
pub use event::*;
pub use message::*;
pub use notification::*;
pub use relation::*;
pub use stream::*;
pub use user::*;
