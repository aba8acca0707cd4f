//! Analysis orchestration.
//!
//! Agent selection, context assembly and the parallel execution engine.

pub mod context;
pub mod engine;
pub mod selector;

pub use context::ContextAssembler;
pub use engine::ExecutionEngine;
pub use selector::select;
