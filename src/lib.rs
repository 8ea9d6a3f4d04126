//! Anchor Patcher: idempotent, anchor-driven patching of line-oriented source files
//!
//! A target file is loaded into a [`LineBuffer`], an ordered list of
//! [`PatchStep`]s runs against it, an optional cleanup pass removes stale
//! artifacts, and the result is written back once.
//!
//! # Architecture
//!
//! Every step has the same shape: locate an anchor line inside a window,
//! check a guard, apply one mutation. Each step is a no-op when its anchor
//! is absent or its guard says the change is already there, so a full run
//! can be repeated safely.
//!
//! # Safety
//!
//! - Mutations are validated before the buffer is touched
//! - Line-ending convention and trailing newline survive a round trip
//! - Atomic file writes (tempfile + fsync + rename)
//! - Files are only rewritten when their content changed
//!
//! # Example
//!
//! ```
//! use anchor_patcher::{Content, Guard, LineBuffer, Matcher, Mutation, PatchStep};
//!
//! let mut buffer = LineBuffer::parse("  const x = 1;\n  doWork(x);\n");
//! let step = PatchStep::new(
//!     "insert-y",
//!     Matcher::contains("const x = 1;"),
//!     Mutation::insert_after(Content::lines(["const y = 2;"])),
//! )
//! .guarded_by(Guard::marker("const y"));
//!
//! let report = anchor_patcher::run(&mut buffer, &[step.clone()]);
//! assert_eq!(report.applied(), 1);
//! assert_eq!(buffer.render(), "  const x = 1;\n  const y = 2;\n  doWork(x);\n");
//!
//! let again = anchor_patcher::run(&mut buffer, &[step]);
//! assert_eq!(again.already_applied(), 1);
//! ```

pub mod anchor;
pub mod buffer;
pub mod cleanup;
pub mod config;
pub mod engine;
pub mod guard;
pub mod mutation;
pub mod runner;
pub mod step;

// Re-exports
pub use anchor::{locate, near_miss, Location, Matcher, NearMiss, Window};
pub use buffer::{BufferError, LineBuffer, LineEnding};
pub use cleanup::{cleanup, CleanupOutcome, CleanupReport, StaleArtifact};
pub use config::{
    apply_patch_set, load_from_path, load_from_str, ApplicationError, ConfigError, PatchSet,
    ValidationError,
};
pub use engine::{apply_to_file, patch_buffer, ApplyOptions, EngineError, FileReport, PatchReport};
pub use guard::Guard;
pub use mutation::{Content, IndentSource, Mutation, MutationEffect};
pub use runner::{run, run_step, RunReport, StepError, StepOutcome, StepReport};
pub use step::PatchStep;
