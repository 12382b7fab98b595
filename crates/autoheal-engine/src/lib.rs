//! Self-healing element resolution and step execution.
//!
//! The engine turns human-readable instructions ("click Submit", "fill
//! Email") into browser actions by searching every context a page offers
//! (overlays, frames, shadow roots, popup windows) in a fixed priority order
//! and falling back through a chain of action techniques.

pub mod artifacts;
pub mod context;
pub mod controller;
pub mod error;
pub mod executor;
pub mod hierarchy;
pub mod inspector;
pub mod matcher;
pub mod mock_driver;
pub mod orchestrator;
pub mod readiness;
pub mod session;
pub mod sinks;
pub mod sources;

pub use artifacts::{ArtifactStore, Captured};
pub use context::{ContextEnumerator, ContextKind, SearchContext};
pub use controller::{RunSummary, StepController};
pub use error::EngineError;
pub use executor::{ActionExecutor, ActionOutcome, ElementAction, Technique};
pub use hierarchy::WindowTracker;
pub use inspector::{ElementInfo, list_current_elements};
pub use matcher::{Candidate, ElementMatcher, MatchRank};
pub use mock_driver::MockDriver;
pub use orchestrator::{Resolution, ResolutionOrchestrator, ResolveOutcome, SearchPhase};
pub use readiness::{ReadinessGate, ReadinessReport};
pub use session::{Deadline, RunControl, RunSession, RunStatus};
pub use sinks::{JsonFileSink, ResultSink, SharedResults};
pub use sources::{SourceFormat, load_instructions, parse_instructions};
