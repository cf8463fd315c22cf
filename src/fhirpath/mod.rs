//! FHIRPath-subset expression engine for calculated and score expressions.
//!
//! Covers the navigation and aggregation surface questionnaire calculators
//! actually use: path traversal from the response root, `descendants()`,
//! `where()`, `answer.value` choice resolution, aggregates, arithmetic, and
//! `iif`. Compiled ASTs are cached process-wide by raw expression text.

mod eval;
mod extensions;
mod parser;

pub use eval::{evaluate, EvalContext, FpValue};
pub use extensions::FhirPathExtensions;
pub use parser::{parse, BinaryOp, Expr, Literal};

use std::sync::{Arc, OnceLock};

use crate::error::Result;

static COMPILED: OnceLock<papaya::HashMap<String, Arc<Expr>>> = OnceLock::new();

/// Compile an expression, reusing the process-wide cache. The cache is
/// unbounded: the expression set per questionnaire is small and finite.
pub fn compile(text: &str) -> Result<Arc<Expr>> {
    let cache = COMPILED.get_or_init(papaya::HashMap::new);
    let map = cache.pin();
    if let Some(expr) = map.get(text) {
        return Ok(expr.clone());
    }
    let expr = Arc::new(parser::parse(text)?);
    map.insert(text.to_string(), expr.clone());
    Ok(expr)
}
