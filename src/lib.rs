//! rsexpr is an embeddable expression engine. It compiles a small
//! C-like expression language into a post-order (Reverse Polish)
//! instruction stream and evaluates that stream against a nested
//! variable environment, typically the fields of a JSON record. It was
//! built to serve as the `where` predicate of a log-querying front-end.
//!
//! The design goals:
//!   * Predicates over JSON records should only pay for the fields they
//!     actually touch (record fields deserialize lazily)
//!   * A compiled program is immutable and can be shared freely across
//!     threads and evaluations
//!   * Errors carry a machine-matchable kind plus structured data
//!
//! The basic example of how to use:
//! ```
//! use rsexpr::{compile, TokenMap};
//!
//! let program = compile("status == 200 && latency > 0.2", &TokenMap::new()).unwrap();
//!
//! let slow_ok = br#"{"status": 200, "latency": 0.35}"#;
//! assert!(program.evaluate_bool(slow_ok).unwrap());
//!
//! let fast = br#"{"status": 200, "latency": 0.01}"#;
//! assert!(!program.evaluate_bool(fast).unwrap());
//! ```
//!
//! Compile-time bindings pin names to values baked into the program;
//! anything else resolves against the per-evaluation environment:
//! ```
//! use rsexpr::{compile, Token, TokenMap};
//!
//! let mut bindings = TokenMap::new();
//! bindings.insert("threshold".to_owned(), Token::Float(0.5));
//!
//! let program = compile("latency > threshold", &bindings).unwrap();
//! assert!(program.evaluate_bool(br#"{"latency": 0.7}"#).unwrap());
//! ```

mod compiler;
mod interp;
mod program;
mod types;

pub use compiler::{compile, ExprCompiler};
pub use interp::{EvalData, OpImpl, OpRegistry, RefInfo};
pub use program::Program;
pub use types::{
    bind_json_object, ErrorKind, ExprError, ExprResult, FunctionToken, LazyJson, NativeFunction,
    RefToken, Token, TokenMap, TokenTag, VarPath,
};

// Re-exports so embedders can match the engine's serde versions.
pub use serde;
pub use serde_json;
