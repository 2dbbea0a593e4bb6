//! Shared helpers for integration tests

pub mod fixtures;
pub mod mock_transport;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use mock_transport::MockTransport;
