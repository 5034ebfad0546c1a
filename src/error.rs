//! Error types shared across the compilation pipeline.
//!
//! Two severities exist. A [`CompileError`] is fatal: the parser stops at the
//! first unexpected token and nothing downstream runs. Semantic problems are
//! collected into [`Diagnostics`] instead, so analysis keeps going and the
//! caller sees every issue at once.

use std::fmt;
use std::path::PathBuf;

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CompileError {
  /// A token did not match what the grammar requires at this point.
  #[snafu(display("{row}:{col}: syntax error: expected {expected}, found '{found}'"))]
  Syntax {
    row: usize,
    col: usize,
    expected: String,
    found: String,
  },

  /// Input ended while the grammar still expected something.
  #[snafu(display("syntax error: expected {expected} at end of input"))]
  UnexpectedEof { expected: String },

  #[snafu(display("could not read source file {}: {source}", path.display()))]
  ReadSource {
    path: PathBuf,
    source: std::io::Error,
  },

  #[snafu(display("could not write {}: {source}", path.display()))]
  WriteArtifact {
    path: PathBuf,
    source: std::io::Error,
  },
}

impl CompileError {
  /// Build a syntax error anchored at a token position.
  pub fn expected_at(
    row: usize,
    col: usize,
    expected: impl Into<String>,
    found: impl Into<String>,
  ) -> Self {
    Self::Syntax {
      row,
      col,
      expected: expected.into(),
      found: found.into(),
    }
  }

  pub fn expected_eof(expected: impl Into<String>) -> Self {
    Self::UnexpectedEof {
      expected: expected.into(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Warning,
  Error,
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Warning => write!(f, "warning"),
      Self::Error => write!(f, "error"),
    }
  }
}

/// A non-fatal semantic finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
  pub severity: Severity,
  pub line: Option<usize>,
  pub message: String,
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.line {
      Some(line) => write!(f, "{} (line {line}): {}", self.severity, self.message),
      None => write!(f, "{}: {}", self.severity, self.message),
    }
  }
}

/// Ordered sink for semantic diagnostics.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
  entries: Vec<Diagnostic>,
}

impl Diagnostics {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn warning(&mut self, line: Option<usize>, message: impl Into<String>) {
    self.push(Severity::Warning, line, message.into());
  }

  pub fn error(&mut self, line: Option<usize>, message: impl Into<String>) {
    self.push(Severity::Error, line, message.into());
  }

  fn push(&mut self, severity: Severity, line: Option<usize>, message: String) {
    let diagnostic = Diagnostic {
      severity,
      line,
      message,
    };
    tracing::debug!(%diagnostic, "semantic diagnostic");
    self.entries.push(diagnostic);
  }

  pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
    self.entries.iter()
  }

  pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
    self.iter().filter(|d| d.severity == Severity::Error)
  }

  pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
    self.iter().filter(|d| d.severity == Severity::Warning)
  }

  pub fn has_errors(&self) -> bool {
    self.errors().next().is_some()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
