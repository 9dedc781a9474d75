//! fbp-lens - go to definition and hover for flow-based programming graphs.
//!
//! Resolves the process under a cursor to its `<component>.node.js` module and
//! summarizes the module statically: props, input ports, output ports and the
//! comments documenting them.

pub mod component;
pub mod config;
pub mod document;
pub mod graph;
pub mod languages;
pub mod npm;
pub mod provider;
pub mod schema;
