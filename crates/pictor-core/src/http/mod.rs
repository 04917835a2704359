//! Request/response plumbing: the HTTP message types the pipeline works on,
//! routing, content negotiation and response formatting.
pub mod date;
pub mod formatter;
pub mod negotiation;
pub mod request;
pub mod response;
pub mod response_formatter;
pub mod router;

pub use negotiation::{AcceptHeader, ContentNegotiation};
pub use request::{Request, RequestedTransformation, SharedRequest};
pub use response::{Response, SharedResponse};
pub use response_formatter::ResponseFormatter;
pub use router::{Route, Router};

#[cfg(test)]
mod tests;
