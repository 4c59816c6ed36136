pub mod websocket;

pub use websocket::register_routes;
