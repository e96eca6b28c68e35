pub mod admin;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod queue;
pub mod routes;

pub use error::ApiError;
pub use routes::create_router;
