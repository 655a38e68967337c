pub mod compile;
pub mod condition;
pub mod emit;
pub mod error;
pub mod lower;
pub mod parse;
pub mod runner;
pub mod validate;
pub mod wasm;

pub use compile::{compile, compile_json, validate, CompileOptions, CompileOutcome};
pub use error::{CompileError, Finding, Severity, Stage, ValidationReport};
