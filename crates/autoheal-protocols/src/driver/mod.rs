//! Browser Automation Driver interface.
//!
//! The engine never talks to a browser directly; it drives an implementation
//! of [`BrowserDriver`]. Production code uses the CDP driver, tests use an
//! in-memory model.

mod events;
mod traits;
mod types;

pub use events::{DialogKind, WindowEvent};
pub use traits::BrowserDriver;
pub use types::{
    FrameInfo, FramePath, LabelFacts, NodeHandle, NodeQuery, NodeRef, NodeScript, NodeSnapshot,
    ReadyState, Scope, ScopeRoot, WindowId, WindowInfo,
};

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
