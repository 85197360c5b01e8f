pub mod handlers;
pub mod internal;
pub mod middleware;
pub mod plugins;
pub mod routes;

pub use routes::create_router;
