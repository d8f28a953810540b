//! HookReel Data Model
//!
//! Defines the core data contracts for ad assembly batches:
//! - **Segments:** Input media files tagged with a category
//! - **Combinations:** Ordered segment tuples, one per rendered ad
//! - **Jobs:** Batch settings, per-item outcomes, and the shared status record
//!
//! Category order is fixed (mini-hook, hook, body, call-to-action) and every
//! type here preserves it.

pub mod combination;
pub mod job;
pub mod segment;

pub use combination::*;
pub use job::*;
pub use segment::*;
