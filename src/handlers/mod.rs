pub mod request;

pub use request::{error_response, handle_request, parse_request, ContentRequest, Operation};
