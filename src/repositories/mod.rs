//! REST collaborator seam. The HTTP client itself lives outside this crate;
//! [`InMemoryApi`] stands in for it in tests and demos.

pub mod memory;
pub mod rest;

pub use memory::InMemoryApi;
pub use rest::RestApi;
