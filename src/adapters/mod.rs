//! Transport implementations.
//!
//! Production reqwest-based transport plus a scripted mock for tests.

mod mock;
mod reqwest_transport;

pub use mock::{MockScript, MockTransport};
pub use reqwest_transport::ReqwestTransport;
