//! Crate root: wires together the compilation pipeline.
//!
//! - `tokenizer` splits the source into classified tokens with positions.
//! - `parser` builds the syntax tree and drives `sema`, which fills the
//!   symbol table and records diagnostics as each construct is recognised.
//! - `expr` and `ty` hold the precedence and typing rules that both the
//!   analyzer and the code generator rely on.
//! - `codegen` lowers the supported statement shapes to x86-64 AT&T assembly.
//! - `error` holds the fatal error type and the diagnostic list.

pub mod codegen;
pub mod error;
pub mod expr;
pub mod parser;
pub mod sema;
pub mod symbol;
pub mod tokenizer;
pub mod ty;

pub use error::{CompileError, CompileResult, Diagnostics};

use parser::ParsedProgram;
use tokenizer::TokenSequence;

/// Every artifact of one compilation.
#[derive(Debug)]
pub struct Compilation {
  pub tokens: TokenSequence,
  pub program: ParsedProgram,
  pub assembly: String,
}

/// Run all stages over `source`.
pub fn compile(source: &str) -> CompileResult<Compilation> {
  let tokens = tokenizer::tokenize(source);
  tracing::debug!(
    tokens = tokens.len(),
    rejected = tokens.rejected().len(),
    "tokenized"
  );

  let program = parser::parse_program(&tokens)?;
  tracing::debug!(
    nodes = program.root.walk().count(),
    symbols = program.symbols.len(),
    diagnostics = program.diagnostics.len(),
    "parsed"
  );

  let assembly = codegen::generate(&program.root, &program.symbols);
  Ok(Compilation {
    tokens,
    program,
    assembly,
  })
}

/// Compile a source string into AT&T assembly.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  compile(source).map(|compilation| compilation.assembly)
}
