pub mod error;
pub mod sse;

pub use error::ApiError;
