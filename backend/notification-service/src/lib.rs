pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod producers;
pub mod push;
pub mod service;
pub mod stock;
pub mod store;
pub mod websocket;
pub mod worker;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use push::PushChannel;
pub use service::NotificationService;
pub use websocket::{ConnectionRegistry, Envelope, EventPayload};
pub use worker::NotificationWorker;
