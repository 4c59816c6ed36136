//! WebSocket real-time delivery plane.
//!
//! 1. [`ConnectionRegistry`]: tracks live links per user, prunes dead ones
//! 2. [`Envelope`]/[`EventPayload`]: the timestamped wire messages
//! 3. [`WsSession`]: the actix actor bridging one connection to the registry

pub mod messages;
pub mod registry;
pub mod session;

pub use messages::{Envelope, EventPayload, NotificationData};
pub use registry::{ConnectionId, ConnectionRegistry, EnvelopeSender};
pub use session::WsSession;
