//! HTTP API: router and handlers.

pub mod handlers;
pub mod report_handlers;
pub mod routes;

pub use routes::create_router;
