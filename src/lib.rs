//! A directive-driven JavaScript bundler.
//!
//! A group starts from one file, follows `// #include` directives to collect
//! its sources, evaluates conditional and mock directives per generation mode,
//! and runs the result through builder stages that write a main bundle and,
//! when a stage asks for it, a compat bundle.

pub mod builders;
pub mod core;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::builders::directives::{DirectiveKind, DirectiveType};
pub use crate::builders::javascript::{BuildStreams, JavascriptBuilder};
pub use crate::core::error::{BundleError, BundleResult};
pub use crate::core::group::JavascriptGroup;
pub use crate::core::mode::GenerationMode;
pub use crate::core::tracker::GroupHash;
