pub mod app;
pub mod auth;
pub mod error;
pub mod http_routes;
pub mod responses;
pub mod state;
