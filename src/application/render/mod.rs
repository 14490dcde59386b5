//! Book rendering: heading anchors, contents page and the printable document.
//!
//! Everything here is pure. The same inputs always produce the same HTML, and
//! side effects (rasterizing, storing) stay with the caller.

mod document;
mod headings;
mod toc;
mod types;

pub use document::DocumentAssembler;
pub use headings::{anchor_id, index_headings};
pub use toc::render_toc;
pub use types::{AssembledBook, DocumentChrome, IndexedContent, RenderError};
