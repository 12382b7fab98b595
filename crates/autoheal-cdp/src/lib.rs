//! # autoheal CDP
//!
//! Chrome DevTools Protocol implementation of the autoheal
//! [`BrowserDriver`](autoheal_protocols::BrowserDriver).
//!
//! Connects to a browser that is already running with a remote debugging
//! port, e.g. `chrome --remote-debugging-port=9222`.

pub mod client;
pub mod driver;
pub mod error;
pub mod protocol;
pub mod scripts;
pub mod session;

pub use client::CdpClient;
pub use driver::CdpDriver;
pub use error::CdpError;
pub use session::PageSession;
