//! Code generation: lower the parsed program into AT&T x86-64 assembly.
//!
//! The emitter uses a simple stack machine: every expression leaves a single
//! value on the stack, which the enclosing statement pops. Locals live in
//! 4-byte slots of the frame and are addressed relative to `%rbp`.
//!
//! Only three statement shapes are lowered: a declaration initialised with
//! an integer literal, an assignment of an arithmetic expression, and a
//! `printf` of one integer value. Anything else is skipped without emitting
//! instructions.

use crate::expr::{self, TieBreak};
use crate::parser::{NodeKind, SyntaxNode};
use crate::symbol::SymbolTable;
use crate::tokenizer::TokenCategory;

/// Scope level of function locals.
const FUNCTION_SCOPE: usize = 1;

const SLOT_SIZE: i32 = 4;

/// Frame offsets of the function locals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
  slots: Vec<(String, i32)>,
  size: i32,
}

impl FrameLayout {
  /// One slot per level-1 variable, in declaration order, starting at -4.
  pub fn from_symbols(symbols: &SymbolTable) -> Self {
    let slots: Vec<_> = symbols
      .variables_at_level(FUNCTION_SCOPE)
      .zip(1..)
      .map(|(symbol, n)| (symbol.name.clone(), -SLOT_SIZE * n))
      .collect();
    let used = SLOT_SIZE * slots.len() as i32;
    Self {
      slots,
      size: (used + 15) & !15,
    }
  }

  pub fn offset_of(&self, name: &str) -> Option<i32> {
    self
      .slots
      .iter()
      .find(|(slot, _)| slot == name)
      .map(|&(_, offset)| offset)
  }

  /// Bytes reserved below `%rbp`, a multiple of 16.
  pub fn size(&self) -> i32 {
    self.size
  }
}

/// Emit assembly for every function of the program.
pub fn generate(root: &SyntaxNode, symbols: &SymbolTable) -> String {
  let frame = FrameLayout::from_symbols(symbols);
  tracing::debug!(slots = frame.slots.len(), size = frame.size, "frame layout");

  let mut asm = String::new();
  asm.push_str("    .text\n");
  for function in root
    .children
    .iter()
    .filter(|node| node.kind == NodeKind::Function)
  {
    emit_function(function, &frame, &mut asm);
  }
  asm
}

fn emit_function(function: &SyntaxNode, frame: &FrameLayout, asm: &mut String) {
  let Some(name) = function.children.get(1).map(SyntaxNode::text) else {
    return;
  };

  asm.push_str(&format!("    .globl {name}\n"));
  asm.push_str(&format!("{name}:\n"));
  asm.push_str("    pushq %rbp\n");
  asm.push_str("    movq %rsp, %rbp\n");
  if frame.size > 0 {
    asm.push_str(&format!("    subq ${}, %rsp\n", frame.size));
  }

  let body = function
    .children
    .iter()
    .find(|node| node.kind == NodeKind::Block);
  for stmt in body.into_iter().flat_map(|block| &block.children) {
    emit_stmt(stmt, frame, asm);
  }

  asm.push_str("    movl $0, %eax\n");
  asm.push_str("    leave\n");
  asm.push_str("    ret\n");
}

fn emit_stmt(stmt: &SyntaxNode, frame: &FrameLayout, asm: &mut String) {
  match stmt.kind {
    NodeKind::Declaration => emit_declaration(stmt, frame, asm),
    NodeKind::Assignment => emit_assignment(stmt, frame, asm),
    NodeKind::FunctionCall => emit_print(stmt, frame, asm),
    _ => tracing::trace!(kind = %stmt.kind, line = stmt.line, "no code for statement"),
  }
}

/// `int x = <integer literal>;`
fn emit_declaration(stmt: &SyntaxNode, frame: &FrameLayout, asm: &mut String) {
  let [_, name, init] = stmt.children.as_slice() else {
    return;
  };
  if let [value] = init.children.as_slice()
    && is_immediate(value)
    && let Some(offset) = frame.offset_of(name.text())
  {
    asm.push_str(&format!("    movl ${}, {offset}(%rbp)\n", value.text()));
  }
}

fn emit_assignment(stmt: &SyntaxNode, frame: &FrameLayout, asm: &mut String) {
  let [target, value] = stmt.children.as_slice() else {
    return;
  };
  let Some(offset) = frame.offset_of(target.text()) else {
    return;
  };
  let Some(tree) = fold(&value.children, frame) else {
    tracing::trace!(line = stmt.line, "assignment uses unsupported expression");
    return;
  };

  emit_expr(&tree, frame, asm);
  asm.push_str("    pop %rax\n");
  asm.push_str(&format!("    movl %eax, {offset}(%rbp)\n"));
}

/// `printf(<format>, <identifier or integer>);`
fn emit_print(stmt: &SyntaxNode, frame: &FrameLayout, asm: &mut String) {
  let [callee, args] = stmt.children.as_slice() else {
    return;
  };
  if callee.text() != "printf" {
    return;
  }
  let Some([value]) = args.children.get(1).map(|arg| arg.children.as_slice()) else {
    return;
  };

  let load = if value.is_token(TokenCategory::Identifier) {
    match frame.offset_of(value.text()) {
      Some(offset) => format!("    movl {offset}(%rbp), %esi\n"),
      None => return,
    }
  } else if is_immediate(value) {
    format!("    movl ${}, %esi\n", value.text())
  } else {
    return;
  };

  asm.push_str("    leaq format(%rip), %rdi\n");
  asm.push_str(&load);
  asm.push_str("    xorl %eax, %eax\n");
  asm.push_str("    call printf\n");
}

/// Integer literal that fits a 32-bit immediate.
fn is_immediate(node: &SyntaxNode) -> bool {
  node.is_token(TokenCategory::Number) && node.text().parse::<i32>().is_ok()
}

/// Reduce a flat expression to a tree of binary `OPERATOR` nodes over
/// integer literals and slotted identifiers. Returns `None` for anything the
/// stack machine cannot evaluate.
fn fold(items: &[SyntaxNode], frame: &FrameLayout) -> Option<SyntaxNode> {
  match items {
    [] => None,
    [leaf] if is_immediate(leaf) => Some(leaf.clone()),
    [leaf]
      if leaf.is_token(TokenCategory::Identifier) && frame.offset_of(leaf.text()).is_some() =>
    {
      Some(leaf.clone())
    }
    [_] => None,
    _ => {
      if let Some(inner) = expr::strip_outer_parens(items) {
        return fold(inner, frame);
      }
      let split = expr::split_point(items, TieBreak::Rightmost)?;
      let op = &items[split];
      if !matches!(op.text(), "+" | "-" | "*" | "/") {
        return None;
      }
      let lhs = fold(&items[..split], frame)?;
      let rhs = fold(&items[split + 1..], frame)?;
      Some(SyntaxNode::binary(op.text(), op.line, lhs, rhs))
    }
  }
}

/// Emit stack-based code for a folded expression node.
fn emit_expr(node: &SyntaxNode, frame: &FrameLayout, asm: &mut String) {
  let NodeKind::Token(category) = node.kind else {
    return;
  };
  match (category, node.children.as_slice()) {
    (TokenCategory::Number, []) => {
      asm.push_str(&format!("    movl ${}, %eax\n", node.text()));
      asm.push_str("    push %rax\n");
    }
    (TokenCategory::Identifier, []) => {
      let Some(offset) = frame.offset_of(node.text()) else {
        return;
      };
      asm.push_str(&format!("    movl {offset}(%rbp), %eax\n"));
      asm.push_str("    push %rax\n");
    }
    (TokenCategory::Operator, [lhs, rhs]) => {
      emit_expr(lhs, frame, asm);
      emit_expr(rhs, frame, asm);
      asm.push_str("    pop %rdi\n");
      asm.push_str("    pop %rax\n");
      match node.text() {
        "+" => asm.push_str("    addl %edi, %eax\n"),
        "-" => asm.push_str("    subl %edi, %eax\n"),
        "*" => asm.push_str("    imull %edi, %eax\n"),
        "/" => {
          asm.push_str("    cltd\n");
          asm.push_str("    idivl %edi\n");
        }
        _ => {}
      }
      asm.push_str("    push %rax\n");
    }
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::parse_program;
  use crate::tokenizer::tokenize;

  fn compile(source: &str) -> (String, FrameLayout) {
    let program = parse_program(&tokenize(source)).unwrap();
    let frame = FrameLayout::from_symbols(&program.symbols);
    (generate(&program.root, &program.symbols), frame)
  }

  fn body_lines(asm: &str) -> Vec<&str> {
    asm
      .lines()
      .map(str::trim)
      .skip_while(|line| !line.starts_with("movq %rsp"))
      .skip(1)
      .skip_while(|line| line.starts_with("subq"))
      .take_while(|line| *line != "movl $0, %eax")
      .collect()
  }

  #[test]
  fn frame_layout_follows_declaration_order() {
    let (_, frame) = compile("int main(){int x=5;int y=10;x=x+y;printf(\"%d\",x);}");
    assert_eq!(frame.offset_of("x"), Some(-4));
    assert_eq!(frame.offset_of("y"), Some(-8));
    assert_eq!(frame.size(), 16);
  }

  #[test]
  fn frame_size_rounds_to_sixteen() {
    let (_, frame) = compile("int main(){int a;int b;int c;int d;int e;}");
    assert_eq!(frame.size(), 32);
    let (asm, frame) = compile("int main(){}");
    assert_eq!(frame.size(), 0);
    assert!(!asm.contains("subq"));
  }

  #[test]
  fn emits_the_reference_program() {
    let (asm, _) = compile("int main(){int x=5;int y=10;x=x+y;printf(\"%d\",x);}");
    assert_eq!(
      asm,
      "    .text\n\
       \x20   .globl main\n\
       main:\n\
       \x20   pushq %rbp\n\
       \x20   movq %rsp, %rbp\n\
       \x20   subq $16, %rsp\n\
       \x20   movl $5, -4(%rbp)\n\
       \x20   movl $10, -8(%rbp)\n\
       \x20   movl -4(%rbp), %eax\n\
       \x20   push %rax\n\
       \x20   movl -8(%rbp), %eax\n\
       \x20   push %rax\n\
       \x20   pop %rdi\n\
       \x20   pop %rax\n\
       \x20   addl %edi, %eax\n\
       \x20   push %rax\n\
       \x20   pop %rax\n\
       \x20   movl %eax, -4(%rbp)\n\
       \x20   leaq format(%rip), %rdi\n\
       \x20   movl -4(%rbp), %esi\n\
       \x20   xorl %eax, %eax\n\
       \x20   call printf\n\
       \x20   movl $0, %eax\n\
       \x20   leave\n\
       \x20   ret\n"
    );
  }

  #[test]
  fn subtraction_chains_are_left_associative() {
    let (asm, _) = compile("int main(){int a; a = 10 - 4 - 3;}");
    let ops: Vec<_> = body_lines(&asm)
      .into_iter()
      .filter(|line| line.starts_with("movl $") || line.starts_with("subl"))
      .collect();
    assert_eq!(
      ops,
      vec!["movl $10, %eax", "movl $4, %eax", "subl %edi, %eax", "movl $3, %eax", "subl %edi, %eax"]
    );
  }

  #[test]
  fn division_sign_extends() {
    let (asm, _) = compile("int main(){int a; a = (a + 1) / 2;}");
    let body = body_lines(&asm);
    let cltd = body.iter().position(|l| *l == "cltd").unwrap();
    assert_eq!(body[cltd + 1], "idivl %edi");
  }

  #[test]
  fn unsupported_shapes_emit_nothing() {
    let source = "int main(){\
      int x = 1 + 2;\
      float f = 2.5;\
      int y;\
      y = x < 3;\
      y = \"s\";\
      if (x) { x = 1; }\
      while (x) x = 0;\
      return x;\
      printf(\"%d\", x + 1);\
      scanf(\"%d\", x);\
      x;\
    }";
    let (asm, _) = compile(source);
    assert!(body_lines(&asm).is_empty(), "unexpected code:\n{asm}");
  }

  #[test]
  fn print_accepts_an_immediate() {
    let (asm, _) = compile("int main(){ printf(\"%d\", -7); }");
    assert!(asm.contains("    movl $-7, %esi\n"));
    assert!(asm.contains("    call printf\n"));
  }

  #[test]
  fn nested_scope_variables_get_no_slot() {
    let mut symbols = SymbolTable::new();
    symbols.enter_scope();
    symbols.enter_scope();
    symbols
      .insert(
        "deep",
        crate::symbol::SymbolKind::Variable,
        crate::ty::DataType::Int,
        1,
      )
      .unwrap();
    let frame = FrameLayout::from_symbols(&symbols);
    assert_eq!(frame.offset_of("deep"), None);
    assert_eq!(frame.size(), 0);
  }

  #[test]
  fn unknown_top_level_nodes_are_ignored() {
    let mut root = SyntaxNode::new(NodeKind::Program, 1);
    root.push(SyntaxNode::with_value(NodeKind::Directive, "#x", 1));
    assert_eq!(generate(&root, &SymbolTable::new()), "    .text\n");
  }
}
