//! HookReel Assembly Engine
//!
//! Batch pipeline that joins interchangeable segments into every possible
//! ad and bundles the renders into one archive.
//!
//! # Pipeline Architecture
//!
//! ```text
//! uploads/<category>/ ── Segment Inventory (sort, cap, preconditions)
//!                                │
//!                        Combination Enumerator (mini-hook × hook × body × cta)
//!                                │  per combination
//!                        Transition Planner (durations → dissolve offsets)
//!                                │
//!                        Graph Builder (scale/pad → concat | xfade + acrossfade)
//!                                │
//!                        Transcode Invoker (ffmpeg, timeout, cancel)
//!                                │
//!                        Job Orchestrator (status record, failure isolation)
//!                                │
//!                                ▼
//!                        Archive Packager (output/all_ads.zip)
//! ```

pub mod archive;
pub mod cancel;
pub mod enumerate;
pub mod graph;
pub mod inventory;
pub mod invoker;
pub mod manager;
pub mod orchestrator;
pub mod status;
pub mod transition;

pub use archive::ArchivePackager;
pub use cancel::CancelFlag;
pub use enumerate::Combinations;
pub use graph::{FilterGraph, GraphBuilder, JoinMode};
pub use inventory::SegmentInventory;
pub use invoker::{FfmpegTranscoder, FfprobeProbe, TranscodeRequest, Transcoder};
pub use manager::JobManager;
pub use orchestrator::{render_batch, BatchRunner};
pub use status::StatusHandle;
pub use transition::{crossfade_offsets, DurationProbe, TransitionPlan, TransitionPlanner};
