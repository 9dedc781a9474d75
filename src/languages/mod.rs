//! Language-specific parsers.
//!
//! Component modules are JavaScript or TypeScript, so one tree-sitter
//! grammar family covers every source the extractor reads.

pub mod typescript;
