//! Helpers over flat expressions.
//!
//! The parser keeps an expression as the run of leaf tokens it was written
//! as. Precedence is only recovered when something needs it: the type
//! checker and the code generator both ask [`split_point`] for the operator
//! that binds loosest and recurse on either side of it.

use crate::parser::SyntaxNode;
use crate::tokenizer::TokenCategory;

/// Binding strength of an infix operator; lower binds looser.
pub fn precedence(op: &str) -> Option<i8> {
  match op {
    "*" | "/" => Some(3),
    "+" | "-" => Some(2),
    "==" | "!=" | "<" | ">" | "<=" | ">=" => Some(1),
    "&&" | "||" => Some(0),
    "=" => Some(-1),
    _ => None,
  }
}

/// Which of several equally loose operators becomes the split point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
  /// First one seen. Used by the type checker.
  Leftmost,
  /// Last one seen, which makes `a - b - c` group as `(a - b) - c`.
  Rightmost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorRole {
  Prefix,
  Infix,
  Postfix,
}

fn is_operator(node: &SyntaxNode) -> bool {
  node.is_token(TokenCategory::Operator)
}

/// Role of the operator at `index`, judged from its neighbours.
pub fn operator_role(items: &[SyntaxNode], index: usize) -> OperatorRole {
  let after_operand = index > 0 && ends_operand(items, index - 1);
  let next = items.get(index + 1);
  if matches!(items[index].text(), "++" | "--")
    && after_operand
    && next.is_none_or(|n| is_operator(n) || n.is_separator(")"))
  {
    return OperatorRole::Postfix;
  }

  if after_operand {
    OperatorRole::Infix
  } else {
    OperatorRole::Prefix
  }
}

/// Whether an operand finishes at `index`. A postfix `++`/`--` still
/// closes the operand it applies to.
fn ends_operand(items: &[SyntaxNode], index: usize) -> bool {
  let item = &items[index];
  if is_operator(item) {
    operator_role(items, index) == OperatorRole::Postfix
  } else {
    !item.is_separator("(") && !item.is_separator(",")
  }
}

/// Index of the `)` closing the `(` at `open`.
pub fn matching_paren(items: &[SyntaxNode], open: usize) -> Option<usize> {
  let mut depth = 0usize;
  for (i, item) in items.iter().enumerate().skip(open) {
    if item.is_separator("(") {
      depth += 1;
    } else if item.is_separator(")") {
      depth = depth.checked_sub(1)?;
      if depth == 0 {
        return Some(i);
      }
    }
  }
  None
}

/// Interior of `items` when a single matching pair of parentheses spans it.
pub fn strip_outer_parens(items: &[SyntaxNode]) -> Option<&[SyntaxNode]> {
  let first = items.first()?;
  if !first.is_separator("(") {
    return None;
  }
  let close = matching_paren(items, 0)?;
  (close == items.len() - 1).then(|| &items[1..close])
}

/// Loosest-binding infix operator outside any parentheses.
pub fn split_point(items: &[SyntaxNode], tie: TieBreak) -> Option<usize> {
  let mut depth = 0usize;
  let mut best: Option<(usize, i8)> = None;

  for (i, item) in items.iter().enumerate() {
    if item.is_separator("(") {
      depth += 1;
      continue;
    }
    if item.is_separator(")") {
      depth = depth.saturating_sub(1);
      continue;
    }
    if depth > 0 || !is_operator(item) || operator_role(items, i) != OperatorRole::Infix {
      continue;
    }
    let Some(prec) = precedence(item.text()) else {
      continue;
    };
    let better = match (best, tie) {
      (None, _) => true,
      (Some((_, current)), TieBreak::Leftmost) => prec < current,
      (Some((_, current)), TieBreak::Rightmost) => prec <= current,
    };
    if better {
      best = Some((i, prec));
    }
  }

  best.map(|(i, _)| i)
}

/// Callee of `name ( ... )` when the call spans all of `items`.
pub fn call_target(items: &[SyntaxNode]) -> Option<&SyntaxNode> {
  match items {
    [callee, open, ..]
      if callee.is_token(TokenCategory::Identifier) && open.is_separator("(") =>
    {
      (matching_paren(items, 1)? == items.len() - 1).then_some(callee)
    }
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::SyntaxNode;
  use crate::tokenizer::tokenize;

  fn leaves(source: &str) -> Vec<SyntaxNode> {
    tokenize(source)
      .tokens()
      .iter()
      .map(SyntaxNode::leaf)
      .collect()
  }

  #[test]
  fn lowest_precedence_operator_is_the_split() {
    let items = leaves("a + b * c");
    assert_eq!(split_point(&items, TieBreak::Leftmost), Some(1));
    let items = leaves("a * b + c");
    assert_eq!(split_point(&items, TieBreak::Leftmost), Some(3));
  }

  #[test]
  fn ties_pick_leftmost_or_rightmost() {
    let items = leaves("a - b - c");
    assert_eq!(split_point(&items, TieBreak::Leftmost), Some(1));
    assert_eq!(split_point(&items, TieBreak::Rightmost), Some(3));
  }

  #[test]
  fn parenthesised_operators_are_ignored() {
    let items = leaves("(a + b) * c");
    assert_eq!(split_point(&items, TieBreak::Leftmost), Some(5));
  }

  #[test]
  fn assignment_binds_loosest() {
    let items = leaves("x = a || b");
    assert_eq!(split_point(&items, TieBreak::Leftmost), Some(1));
  }

  #[test]
  fn prefix_and_postfix_operators_never_split() {
    let items = leaves("!a");
    assert_eq!(operator_role(&items, 0), OperatorRole::Prefix);
    assert_eq!(split_point(&items, TieBreak::Leftmost), None);

    let items = leaves("i ++");
    assert_eq!(operator_role(&items, 1), OperatorRole::Postfix);

    let items = leaves("a * - b");
    assert_eq!(operator_role(&items, 2), OperatorRole::Prefix);
    assert_eq!(split_point(&items, TieBreak::Leftmost), Some(1));
  }

  #[test]
  fn operator_after_postfix_is_infix() {
    let items = leaves("a ++ + s");
    assert_eq!(operator_role(&items, 1), OperatorRole::Postfix);
    assert_eq!(operator_role(&items, 2), OperatorRole::Infix);
    assert_eq!(split_point(&items, TieBreak::Leftmost), Some(2));

    let items = leaves("f -- * 2 && 1");
    assert_eq!(split_point(&items, TieBreak::Leftmost), Some(4));
    assert_eq!(split_point(&items[..4], TieBreak::Leftmost), Some(2));
  }

  #[test]
  fn increment_before_an_operand_is_prefix() {
    let items = leaves("a + ++ b");
    assert_eq!(operator_role(&items, 2), OperatorRole::Prefix);
    assert_eq!(split_point(&items, TieBreak::Leftmost), Some(1));
  }

  #[test]
  fn outer_parens_must_match_each_other() {
    let items = leaves("(a + b)");
    assert_eq!(strip_outer_parens(&items).map(<[_]>::len), Some(3));
    let items = leaves("(a) + (b)");
    assert!(strip_outer_parens(&items).is_none());
  }

  #[test]
  fn call_must_span_the_expression() {
    let items = leaves("f ( )");
    assert_eq!(call_target(&items).map(SyntaxNode::text), Some("f"));
    let items = leaves("f ( ) + 1");
    assert!(call_target(&items).is_none());
  }
}
