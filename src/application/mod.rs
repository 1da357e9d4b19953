// Application layer - use cases and orchestration

pub mod error;
pub mod reporting;
pub mod request;
pub mod service;

pub use error::*;
pub use reporting::*;
pub use request::*;
pub use service::*;
