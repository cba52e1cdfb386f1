// Middleware modules
pub mod logging;

pub use logging::debug_requests_responses;
