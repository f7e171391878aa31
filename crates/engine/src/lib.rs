//! The operator library, ruleset manager, and evaluation orchestrator
//! that together form the guardrail engine.

pub mod cancellation;
pub mod error;
pub mod operators;
pub mod rule_manager;
pub mod service;

pub use cancellation::CancellationFlag;
pub use error::EngineError;
pub use operators::{OperatorKind, OperatorLibrary};
pub use rule_manager::RuleManager;
pub use service::GuardrailService;
