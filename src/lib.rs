//! SockJS server core.
//!
//! A session survives across the short-lived HTTP requests and websockets
//! that carry it. Applications plug in through `Hooks` and get a `Session`
//! handle to send messages and close; `routes` maps the SockJS URL layout onto
//! the session registry of each mounted application.

pub mod config;
pub mod error;
pub mod frame;
pub mod registry;
pub mod routes;
pub mod session;
pub mod state;
pub mod timer;
pub mod transport;

pub use config::{ServerConfig, SessionConfig};
pub use error::SockJsError;
pub use frame::{CloseStatus, Frame, Framing};
pub use registry::{Hooks, Registry};
pub use session::{Attachment, Session, SessionPhase};
pub use state::AppState;
pub use transport::{Transport, TransportKind};
