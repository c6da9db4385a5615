//! Mobility handling for the LISP control plane: orchestrating a simulated
//! mobility event and detecting when all interested parties have converged on
//! the updated mapping.

pub mod convergence;
pub mod orchestrator;

pub use convergence::{ConvergenceTracker, ObserverId};
pub use orchestrator::{
    ExperimentOutcome, MobilityConfig, MobilityHandlerKind, MobilityOrchestrator, Request,
};
