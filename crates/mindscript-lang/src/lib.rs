//! The MindScript language runtime: a dynamically-typed, expression-
//! oriented scripting language where formal evaluation (deterministic
//! computation) and informal evaluation (consultation of an inductive
//! oracle) are interchangeable.
//!
//! The pipeline is conventional: [`syntax`] tokenizes, [`parser`] builds
//! the [`ast`], [`interp`] walks it against an environment, [`types`]
//! decides structural subtyping at every boundary, and [`oracle`] is the
//! capability an oracle application delegates to.

pub mod ast;
pub mod errors;
pub mod fmt;
pub mod interp;
pub mod oracle;
pub mod parser;
pub mod syntax;
pub mod types;

pub use errors::{ErrorKind, MsError};
pub use interp::{Interpreter, Value};
pub use oracle::{Backend, NoBackend, OracleQuery};
