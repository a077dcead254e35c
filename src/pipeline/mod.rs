//! Pipeline stages for deck analysis.
//!
//! Each submodule implements one step of the request cycle and is tested on
//! its own; [`crate::analyze`] composes them.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ prompts ──▶ llm ──▶ sanitize
//! (bytes)   (pdfium,    (template)  (model) (JSON record)
//!            pages)
//! ```
//!
//! 1. [`input`]: declared content type and in-memory document
//! 2. [`extract`]: ordered strategy chain, normalization and length bounds.
//!    [`pdfium`] is the whole-document strategy, [`pages`] the page-wise
//!    fallback
//! 3. [`llm`]: the single model call, the only stage with network I/O
//! 4. [`sanitize`]: strip fences and stray prose, parse, backfill

pub mod extract;
pub mod input;
pub mod llm;
pub mod pages;
pub mod pdfium;
pub mod sanitize;
