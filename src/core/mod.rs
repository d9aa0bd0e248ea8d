// This file is the module declaration file for the `core` module.
// It declares the submodules that make up the bundling engine and exposes
// them to the rest of the crate.

// `config` module:
// Defines the `bundler.toml` data structures (`BundlerConfig`, `GroupConfig`),
// the `ConfigProvider` trait and the `ConfigManager` handling file I/O,
// validation and export.
pub mod config;

// `engine` module:
// The `BundleEngine` runs configured groups, restoring and persisting their
// baselines through a `StateStorage`.
pub mod engine;

// `error` module:
// Typed errors (`BundleError`) for file resolution, directive mismatches,
// malformed directives, missing resources and I/O.
pub mod error;

// `graph` module:
// Follows include directives from a start file to build the ordered,
// deduplicated `FileSet` of a group.
pub mod graph;

// `group` module:
// `JavascriptGroup`, the per-target orchestrator: parse, hash, generate,
// regenerate.
pub mod group;

// `mode` module:
// The `GenerationMode` enumeration and its output suffixes.
pub mod mode;

// `tracker` module:
// Timestamp-based staleness and the content `GroupHash`.
pub mod tracker;
