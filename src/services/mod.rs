//! Sync services: channel connections, frame dispatch, optimistic mutations.

pub mod connection;
pub mod dispatcher;
pub mod optimistic;

pub use connection::{ChannelHandle, ConnectionManager};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use optimistic::{MutationOutcome, OptimisticCoordinator};
