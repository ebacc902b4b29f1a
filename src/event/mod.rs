//! API Gateway proxy events: the [`Request`] parsed from an incoming event and the
//! [`Response`] rendered back.

mod request;
mod response;

pub use request::{HeaderVec, Request, MAX_INLINE_HEADERS};
pub use response::{ErrorDetail, Response};
