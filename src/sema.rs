//! Semantic checks driven by the parser.
//!
//! The [`Analyzer`] owns the symbol table and the diagnostic list while
//! parsing runs. None of its checks can fail the compilation: problems are
//! recorded and analysis moves on, using the poisoned [`DataType::Unknown`]
//! to keep one mistake from being reported again at every enclosing
//! operator.

use crate::error::Diagnostics;
use crate::expr::{self, OperatorRole, TieBreak};
use crate::parser::{NodeKind, SyntaxNode};
use crate::symbol::{SymbolKind, SymbolTable};
use crate::tokenizer::{Token, TokenCategory};
use crate::ty::{DataType, TypeIssue, Typing, assignment_result, binary_result, unary_result};

#[derive(Debug, Default)]
pub struct Analyzer {
  symbols: SymbolTable,
  diagnostics: Diagnostics,
}

impl Analyzer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn enter_scope(&mut self) {
    self.symbols.enter_scope();
  }

  pub fn exit_scope(&mut self) {
    self.symbols.exit_scope();
  }

  /// Report symbols that were never declared and hand over the results.
  pub fn finish(mut self) -> (SymbolTable, Diagnostics) {
    let undeclared: Vec<_> = self
      .symbols
      .check_undeclared()
      .map(|s| (s.name.clone(), s.line))
      .collect();
    for (name, line) in undeclared {
      self.diagnostics.error(Some(line), format!("'{name}' is never declared"));
    }
    (self.symbols, self.diagnostics)
  }

  pub fn declare_variable(&mut self, data_type: DataType, name: &Token) {
    let level = self.symbols.level();
    if let Some(id) = self.symbols.find_id(&name.text) {
      let existing = self.symbols.get(id);
      if !existing.declared && existing.scope_level == level {
        self.symbols.confirm(id, data_type);
        return;
      }
    }

    if let Err(err) = self
      .symbols
      .insert(&name.text, SymbolKind::Variable, data_type, name.row)
    {
      self.diagnostics.error(Some(name.row), err.to_string());
    }
  }

  pub fn declare_function(&mut self, return_type: DataType, name: &Token) {
    if let Err(err) = self
      .symbols
      .insert_global(&name.text, SymbolKind::Function, return_type, name.row)
    {
      self.diagnostics.error(Some(name.row), err.to_string());
    }
  }

  /// Make sure an assignment target resolves, synthesising a provisional
  /// symbol when it does not.
  pub fn resolve_assignment_target(&mut self, target: &Token) {
    match self.symbols.find(&target.text) {
      Some(symbol) if symbol.kind != SymbolKind::Variable => {
        self.diagnostics.error(
          Some(target.row),
          format!("cannot assign to '{}', it is not a variable", target.text),
        );
      }
      Some(_) => {}
      None => {
        self.symbols.insert_provisional(&target.text, target.row);
        self.diagnostics.warning(
          Some(target.row),
          format!("variable '{}' used before being declared", target.text),
        );
      }
    }
  }

  pub fn check_assignment(&mut self, target: &Token, value: &SyntaxNode) {
    let value_type = self.infer(value);
    let Some(symbol) = self.symbols.find(&target.text) else {
      return;
    };
    if symbol.kind != SymbolKind::Variable {
      return;
    }
    let target_type = symbol.data_type;
    self.report(assignment_result(target_type, value_type), target.row);
  }

  pub fn check_initializer(&mut self, data_type: DataType, init: &SyntaxNode, line: usize) {
    let value_type = self.infer(init);
    self.report(assignment_result(data_type, value_type), line);
  }

  /// Returned literals must suit a `char*` function, anything else a
  /// numeric one.
  pub fn check_return(&mut self, expected: DataType, value: &SyntaxNode, line: usize) {
    match value.children.as_slice() {
      [] => {
        if expected != DataType::Void {
          self.diagnostics.error(
            Some(line),
            format!("missing return value in function returning {expected}"),
          );
        }
      }
      [leaf] if is_string_literal(leaf) => {
        if expected != DataType::CharPtr {
          self.diagnostics.error(
            Some(line),
            format!("string returned from function of type {expected}"),
          );
        }
      }
      _ => {
        self.infer(value);
        if !expected.is_numeric() {
          self.diagnostics.error(
            Some(line),
            format!("numeric return in function of type {expected}"),
          );
        }
      }
    }
  }

  pub fn check_print_call(&mut self, callee: &Token, args: &[SyntaxNode]) {
    let format_ok = args
      .first()
      .is_some_and(|arg| matches!(arg.children.as_slice(), [leaf] if is_string_literal(leaf)));
    if !format_ok {
      self.diagnostics.error(
        Some(callee.row),
        format!("first argument of '{}' must be a string literal", callee.text),
      );
    }
    for arg in args {
      self.infer(arg);
    }
  }

  /// Type of an `EXPRESSION` node.
  pub fn infer(&mut self, expr: &SyntaxNode) -> DataType {
    self.infer_items(&expr.children)
  }

  fn infer_items(&mut self, items: &[SyntaxNode]) -> DataType {
    let first = match items {
      [] => return DataType::Unknown,
      [leaf] => return self.infer_leaf(leaf),
      [first, ..] => first,
    };

    if let Some(inner) = expr::strip_outer_parens(items) {
      return self.infer_items(inner);
    }

    if let Some(split) = expr::split_point(items, TieBreak::Leftmost) {
      let op = &items[split];
      let (left, right) = (&items[..split], &items[split + 1..]);
      if left.is_empty() || right.is_empty() {
        self.diagnostics.error(Some(op.line), format!("missing operand for '{}'", op.text()));
        return DataType::Unknown;
      }
      let left = self.infer_items(left);
      let right = self.infer_items(right);
      return self.report(binary_result(left, op.text(), right), op.line);
    }

    if let Some(callee) = expr::call_target(items) {
      return self.infer_call(callee);
    }

    if first.is_token(TokenCategory::Operator)
      && expr::operator_role(items, 0) == OperatorRole::Prefix
    {
      let operand = self.infer_items(&items[1..]);
      return self.report(unary_result(first.text(), operand), first.line);
    }

    let last = items.len() - 1;
    if items[last].is_token(TokenCategory::Operator)
      && expr::operator_role(items, last) == OperatorRole::Postfix
    {
      let operand = self.infer_items(&items[..last]);
      return self.report(unary_result(items[last].text(), operand), items[last].line);
    }

    self.infer_leaf(first)
  }

  fn infer_leaf(&mut self, leaf: &SyntaxNode) -> DataType {
    let NodeKind::Token(category) = leaf.kind else {
      return DataType::Unknown;
    };
    match category {
      TokenCategory::Number if leaf.text().contains('.') => DataType::Float,
      TokenCategory::Number => DataType::Int,
      TokenCategory::Literal => DataType::CharPtr,
      TokenCategory::Identifier => match self.symbols.find(leaf.text()) {
        Some(symbol) => symbol.data_type,
        None => {
          self.diagnostics.error(
            Some(leaf.line),
            format!("'{}' used but not declared", leaf.text()),
          );
          DataType::Unknown
        }
      },
      _ => DataType::Unknown,
    }
  }

  fn infer_call(&mut self, callee: &SyntaxNode) -> DataType {
    match self.symbols.find(callee.text()) {
      Some(symbol) if symbol.kind == SymbolKind::Function => symbol.data_type,
      Some(_) => {
        self.diagnostics.error(
          Some(callee.line),
          format!("'{}' is not a function", callee.text()),
        );
        DataType::Unknown
      }
      None => {
        self.diagnostics.error(
          Some(callee.line),
          format!("function '{}' not declared", callee.text()),
        );
        DataType::Unknown
      }
    }
  }

  /// Record any issue carried by `typing` and pass its type through.
  fn report(&mut self, typing: Typing, line: usize) -> DataType {
    if let Some(issue) = typing.issue {
      self.report_issue(&issue, line);
    }
    typing.ty
  }

  fn report_issue(&mut self, issue: &TypeIssue, line: usize) {
    if issue.is_warning() {
      self.diagnostics.warning(Some(line), issue.to_string());
    } else {
      self.diagnostics.error(Some(line), issue.to_string());
    }
  }
}

fn is_string_literal(node: &SyntaxNode) -> bool {
  node.is_token(TokenCategory::Literal) && node.text().starts_with('"')
}
