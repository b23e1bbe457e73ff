//! Retention policy evaluation and filesystem execution
//!
//! For each rule, candidates are selected from a single container (the source
//! for `MoveToArchive`, the archive for `DeleteFromArchive`) in two passes:
//!
//! - **Age**: entries whose mtime is at or before `now - N days`
//! - **Count**: everything but the N most recently modified entries
//!
//! Selected entries are relocated with [`mover`] or deleted with [`remover`].
//! Directory trees are walked with explicit work lists, never recursion.
//!
//! Errors on individual entries are recorded in the [`ExecutionReport`] and
//! skipped; one bad file never stops the rest of the pass.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use logkeeper::archive::{run_pass, ArchiveAction, ReferenceTime};
//!
//! let report = run_pass(&config.processor.rules, ArchiveAction::MoveToArchive, ReferenceTime::now());
//! println!("moved {} entries", report.moved.len());
//! ```

pub mod error;
pub mod executor;
pub mod mover;
pub mod remover;
pub mod selector;

pub use error::{ArchiveError, Result};
pub use executor::{
    ArchiveAction, ExecutionReport, FailureStage, PolicyExecutor, Relocation, SoftFailure, run_pass,
};
pub use mover::MAX_NAME_ATTEMPTS;
pub use selector::{Candidate, Clock, ReferenceTime};
