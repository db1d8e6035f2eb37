//! Pipeline stages for PDF question extraction.
//!
//! Each submodule implements exactly one transformation step, so each is
//! independently testable.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ (proxy + model) ──▶ parse
//! (URL/path)  (pdfium)  (base64)                       (JSON recovery)
//! ```
//!
//! 1. [`input`]  — load the user-supplied path or blob URL into memory
//! 2. [`render`] — rasterise pages; runs in `spawn_blocking` because pdfium
//!    is not async-safe
//! 3. [`encode`] — PNG-encode and base64-wrap each rendered page
//! 4. [`parse`]  — recover a question array from loosely formatted model
//!    output; used by the proxy on every reply
//!
//! The network step between encode and parse lives in [`crate::client`]
//! (client side) and [`crate::upstream`] (server side).

pub mod encode;
pub mod input;
pub mod parse;
pub mod render;
