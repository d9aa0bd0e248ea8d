// This file is the module declaration file for the `builders` module.
// It declares and makes public all the sub-modules within the `src/builders`
// directory. These modules turn source text into bundles and support the
// engine with storage, validation and reporting.

// `directives` module:
// The closed set of directive kinds (`DirectiveKind`), the registry that
// maps marker labels to kinds, and the configurable marker syntax.
pub mod directives;

// `evaluator` module:
// Walks a group's files for one generation mode, applying each directive
// and inlining includes, to produce the merged text.
pub mod evaluator;

// `javascript` module:
// The `JavascriptBuilder` stage trait, the engine and framework builders,
// and the pipeline producing main and compat streams.
pub mod javascript;

// `reporter` module:
// The `StatusReporter` trait and `ConsoleReporter` printing group status and
// generation outcomes.
pub mod reporter;

// `resources` module:
// `ResourceLoader` implementations backing the builders' `get_source`.
pub mod resources;

// `storage` module:
// Persisted build state (`GroupState`) behind the `StateStorage` trait, with
// file and in-memory implementations.
pub mod storage;

// `validator` module:
// The `ConfigValidator` trait and `StandardValidator` checking group
// definitions before they are built.
pub mod validator;
