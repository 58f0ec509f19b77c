pub mod analyzer;
pub mod ast;
pub mod call_graph;
pub mod config;
pub mod diagnostics;
pub mod exhaustiveness;
pub mod intrinsics;
pub mod purity;
pub mod types;
