//! Federation Audit Registry
//!
//! Hash commitments over canonical JSON, two append-only registry
//! instances ("local" and "continental"), and the reconciler that
//! verifies one against the other.

pub mod commitment;
pub mod reconcile;
pub mod registry;

pub use commitment::{commit, CommitError};
pub use reconcile::{FederationReconciler, ReconciledRecord, ReconciliationSummary};
pub use registry::{
    FederationRecord, FederationRegistry, JournalRegistryStore, MemoryRegistryStore,
    RegistryError, RegistryStore,
};
