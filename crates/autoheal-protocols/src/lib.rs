//! # autoheal Protocols
//!
//! Interface definitions shared by the autoheal crates. Contains only
//! traits and plain data types - no browser or engine logic.
//!
//! ## Core Traits
//!
//! - [`BrowserDriver`] - the browser automation capability the engine drives
//!
//! ## Shared Types
//!
//! - [`NodeSnapshot`] - a DOM node as reported by a driver
//! - [`Scope`] - where a query runs (window, frame path, document/overlay/shadow root)
//! - [`Instruction`] / [`StepRecord`] - one scripted step and its recorded outcome

pub mod driver;
pub mod error;
pub mod step;

pub use driver::{
    BrowserDriver, DialogKind, FrameInfo, FramePath, LabelFacts, NodeHandle, NodeQuery, NodeRef,
    NodeScript, NodeSnapshot, ReadyState, Scope, ScopeRoot, WindowEvent, WindowId, WindowInfo,
};
pub use error::DriverError;
pub use step::{Action, FailureKind, Instruction, StepRecord, StepStatus};
