//! Pipeline stages for one extraction.
//!
//! Each submodule implements exactly one step, so each can be tested
//! without the others and without a real Docling installation.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ interpreter ──▶ process ──▶ contract
//! (paths,     (probe +        (spawn,     (stdout JSON
//!  staging)    import check)   timeout)    → result)
//! ```
//!
//! 1. [`input`]      : check the PDF and script exist; stage upload buffers
//! 2. [`interpreter`]: find a Python that answers `--version` and can
//!    import the library
//! 3. [`process`]    : run the parser with a hard timeout, draining stdout
//!    and streaming stderr
//! 4. [`contract`]   : parse stdout into an [`crate::output::ExtractionResult`]

pub mod contract;
pub mod input;
pub mod interpreter;
pub mod process;
