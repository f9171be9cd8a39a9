// ============================================================================
// Transaction Management Module
// ============================================================================
//
// A toggle attempt writes a membership row and a counter row. Both writes are
// staged in one transaction and become visible together on commit.
//
// ============================================================================

pub mod change;
pub mod state;

pub use change::Change;
pub use state::{Transaction, TransactionId, TransactionState};
