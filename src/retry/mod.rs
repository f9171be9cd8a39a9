// ============================================================================
// Retry Module
// ============================================================================
//
// Optimistic-lock conflicts are expected under contention. This module decides
// which failures deserve another attempt (classifier), how long to wait
// between attempts (policy), and drives the attempts (orchestrator).
//
// ============================================================================

pub mod classifier;
pub mod orchestrator;
pub mod policy;
pub mod stats;

pub use classifier::{ConflictClass, ConflictClassifier, FatalReason, RetryReason};
pub use orchestrator::{AttemptVerdict, RetryOrchestrator, RetryState};
pub use policy::RetryPolicy;
pub use stats::{RetryStats, RetryStatsSnapshot};
