//! Schema GBNF Compiler
//!
//! Compiles structured record schemas into a GBNF grammar that constrains a
//! language model's output to JSON conforming to those schemas, and renders
//! matching human-readable documentation.
//!
//! ## Features
//!
//! - **Deterministic Grammars**: Rule order follows schema and field declaration order
//! - **Shared Rules**: Every schema and opaque class is expanded exactly once
//! - **Numeric Bounds**: Digit-count and precision limits become bounded sub-grammars
//! - **Tagged Dispatch**: Optional discriminated-union envelope over the root schemas
//! - **Documentation**: Text or Markdown descriptions of the same schemas
//!
//! ## Architecture
//!
//! ```text
//! definitions (.json / .toml)
//!   └── schema::loader ──► SchemaSet
//!                            ├── grammar ──► CompiledGrammar (rules + primitive library)
//!                            └── docs    ──► documentation text
//!                                              └── output::save (best-effort sinks)
//! ```

pub mod config;
pub mod docs;
pub mod error;
pub mod grammar;
pub mod output;
pub mod schema;

pub use config::GrammarConfig;
pub use docs::{generate_documentation, DocFormat, DocOptions};
pub use error::{GrammarError, Result, SinkWriteError};
pub use grammar::{
    compile, CompileOptions, CompiledGrammar, GrammarCompiler, OptionalFieldStyle, Rule,
    TaggedDispatch,
};
pub use output::{generate, save, save_configured, Artifacts, SaveReport};
pub use schema::loader::load_definitions;
pub use schema::{EnumType, Field, OpaqueClass, Primitive, Schema, SchemaSet, TypeDescriptor};
