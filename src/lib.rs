//! Couples an optimization/inference driver to an opaque external
//! simulator invoked as a child process.
//!
//! For each model evaluation this crate:
//! - materializes simulator input files by instantiating parameter-bearing
//!   template files (see [`tpl`]),
//! - launches one or more shell commands under a cancellation protocol
//!   (see [`runner`]),
//! - extracts named scalar observations from the simulator's output files
//!   by interpreting instruction files (see [`ins`]).
//!
//! The calling optimizer, logging/config/CLI framing, and the concrete
//! `Parameters`/`Observations` containers belong to the caller; this crate
//! only depends on the lookup/update contract in [`names`].

pub mod error;
pub mod format;
pub mod ins;
pub mod interface;
pub mod logging;
pub mod names;
pub mod runner;
pub mod tpl;

pub use error::ModelError;
pub use interface::ModelInterface;
pub use names::{canonicalize, ObservationSink, ParameterSource, ValueMap};
