pub mod image;
pub mod listing;

// Re-exported for the CLI and for embedding front ends
pub use image::{assemble_file, assemble_text, image_range, segments, Assembled, Segment};
pub use listing::{build_listing, render_listing, render_symbols, ListingRow, SymbolReport};
