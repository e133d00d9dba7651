// Presentation layer - JSON query surface over HTTP
pub mod app_state;
pub mod handlers;
