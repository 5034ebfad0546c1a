//! Scoped symbol table.
//!
//! Every symbol ever inserted lives in an arena and is addressed by
//! [`SymbolId`]. A separate visibility stack holds the symbols that lookups
//! can currently see, most recent last, which gives innermost-first
//! shadowing. Leaving a scope only hides its symbols: the arena keeps them so
//! the finished table can still be dumped and laid out by the code generator.

use std::fmt;
use std::io::{self, Write};

use snafu::Snafu;

use crate::ty::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
  Variable,
  Function,
  Type,
}

impl fmt::Display for SymbolKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(match self {
      Self::Variable => "Variável",
      Self::Function => "Função",
      Self::Type => "Tipo",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
  pub name: String,
  pub kind: SymbolKind,
  pub data_type: DataType,
  pub scope_level: usize,
  /// False for symbols synthesised by a use before any declaration.
  pub declared: bool,
  pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(usize);

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(display("'{name}' redeclared at scope level {level} (line {line})"))]
pub struct Redeclaration {
  pub name: String,
  pub level: usize,
  pub line: usize,
}

#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
  arena: Vec<Symbol>,
  visible: Vec<SymbolId>,
  level: usize,
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn level(&self) -> usize {
    self.level
  }

  pub fn enter_scope(&mut self) {
    self.level += 1;
    tracing::trace!(level = self.level, "enter scope");
  }

  /// Hide every symbol of the current level, then drop back one level.
  pub fn exit_scope(&mut self) {
    debug_assert!(self.level > 0, "exit_scope without matching enter_scope");
    let level = self.level;
    let arena = &self.arena;
    self
      .visible
      .retain(|id| arena[id.0].scope_level != level);
    self.level = level.saturating_sub(1);
    tracing::trace!(level = self.level, "exit scope");
  }

  /// Declare `name` at the current level.
  pub fn insert(
    &mut self,
    name: &str,
    kind: SymbolKind,
    data_type: DataType,
    line: usize,
  ) -> Result<SymbolId, Redeclaration> {
    self.insert_at(self.level, name, kind, data_type, line)
  }

  /// Declare `name` at level 0 whatever the current nesting.
  pub fn insert_global(
    &mut self,
    name: &str,
    kind: SymbolKind,
    data_type: DataType,
    line: usize,
  ) -> Result<SymbolId, Redeclaration> {
    self.insert_at(0, name, kind, data_type, line)
  }

  fn insert_at(
    &mut self,
    level: usize,
    name: &str,
    kind: SymbolKind,
    data_type: DataType,
    line: usize,
  ) -> Result<SymbolId, Redeclaration> {
    if self.find_at_level(name, level).is_some() {
      return Err(Redeclaration {
        name: name.to_string(),
        level,
        line,
      });
    }
    Ok(self.push(Symbol {
      name: name.to_string(),
      kind,
      data_type,
      scope_level: level,
      declared: true,
      line,
    }))
  }

  /// Record a name that was used before any declaration.
  pub fn insert_provisional(&mut self, name: &str, line: usize) -> SymbolId {
    self.push(Symbol {
      name: name.to_string(),
      kind: SymbolKind::Variable,
      data_type: DataType::Unknown,
      scope_level: self.level,
      declared: false,
      line,
    })
  }

  /// Turn a provisional symbol into a real declaration. The line of first
  /// occurrence is left untouched.
  pub fn confirm(&mut self, id: SymbolId, data_type: DataType) {
    let symbol = &mut self.arena[id.0];
    symbol.data_type = data_type;
    symbol.declared = true;
  }

  fn push(&mut self, symbol: Symbol) -> SymbolId {
    let id = SymbolId(self.arena.len());
    tracing::trace!(name = %symbol.name, level = symbol.scope_level, "insert symbol");
    self.arena.push(symbol);
    self.visible.push(id);
    id
  }

  /// Most recent visible symbol called `name`.
  pub fn find(&self, name: &str) -> Option<&Symbol> {
    self.find_id(name).map(|id| self.get(id))
  }

  pub fn find_id(&self, name: &str) -> Option<SymbolId> {
    self
      .visible
      .iter()
      .rev()
      .copied()
      .find(|id| self.arena[id.0].name == name)
  }

  fn find_at_level(&self, name: &str, level: usize) -> Option<SymbolId> {
    self.visible.iter().rev().copied().find(|id| {
      let symbol = &self.arena[id.0];
      symbol.name == name && symbol.scope_level == level
    })
  }

  pub fn get(&self, id: SymbolId) -> &Symbol {
    &self.arena[id.0]
  }

  /// Every symbol ever inserted, in insertion order.
  pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
    self.arena.iter()
  }

  /// Symbols that were used but never declared.
  pub fn check_undeclared(&self) -> impl Iterator<Item = &Symbol> {
    self.arena.iter().filter(|s| !s.declared)
  }

  /// Variables declared at `level`, in insertion order.
  pub fn variables_at_level(&self, level: usize) -> impl Iterator<Item = &Symbol> {
    self
      .arena
      .iter()
      .filter(move |s| s.kind == SymbolKind::Variable && s.scope_level == level)
  }

  pub fn len(&self) -> usize {
    self.arena.len()
  }

  pub fn is_empty(&self) -> bool {
    self.arena.is_empty()
  }
}

/// Render the symbol table dump.
pub fn write_symbol_table(table: &SymbolTable, out: &mut impl Write) -> io::Result<()> {
  writeln!(
    out,
    "{:<20} {:<20} {:<10} {:<10} {}",
    "Nome", "Tipo", "Tipo Dado", "Escopo", "Linha"
  )?;
  for symbol in table.iter() {
    writeln!(
      out,
      "{:<15} {:<10} {:<10} {:<10} {}",
      symbol.name, symbol.kind, symbol.data_type, symbol.scope_level, symbol.line
    )?;
  }
  Ok(())
}
