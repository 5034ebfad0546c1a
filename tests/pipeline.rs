use minicc::error::Severity;
use minicc::symbol::SymbolKind;
use minicc::tokenizer::TokenCategory;
use minicc::ty::DataType;
use minicc::{CompileError, compile, generate_assembly};

const REFERENCE: &str = "int main(){int x=5;int y=10;x=x+y;printf(\"%d\",x);}";

fn messages(source: &str) -> Vec<(Severity, String)> {
  compile(source)
    .unwrap()
    .program
    .diagnostics
    .iter()
    .map(|d| (d.severity, d.message.clone()))
    .collect()
}

#[test]
fn reference_program_compiles_cleanly() {
  let compilation = compile(REFERENCE).unwrap();
  assert!(compilation.program.diagnostics.is_empty());
  assert!(compilation.tokens.rejected().is_empty());

  let symbols = &compilation.program.symbols;
  let main = symbols.iter().find(|s| s.name == "main").unwrap();
  assert_eq!(main.kind, SymbolKind::Function);
  assert_eq!(main.scope_level, 0);
  for name in ["x", "y"] {
    let symbol = symbols.iter().find(|s| s.name == name).unwrap();
    assert_eq!(symbol.kind, SymbolKind::Variable);
    assert_eq!(symbol.data_type, DataType::Int);
    assert_eq!(symbol.scope_level, 1);
  }

  let asm = &compilation.assembly;
  assert!(asm.contains("    subq $16, %rsp\n"));
  assert!(asm.contains("    movl $5, -4(%rbp)\n"));
  assert!(asm.contains("    movl $10, -8(%rbp)\n"));
  assert!(asm.contains("    movl %eax, -4(%rbp)\n"));
  assert!(asm.ends_with("    call printf\n    movl $0, %eax\n    leave\n    ret\n"));
}

#[test]
fn missing_semicolon_is_fatal_at_the_next_token() {
  let source = "int main() {\n  int x = 5\n  printf(\"%d\", x);\n}\n";
  match compile(source).unwrap_err() {
    CompileError::Syntax {
      row,
      col,
      expected,
      found,
    } => {
      assert_eq!((row, col), (3, 3));
      assert_eq!(expected, "SEPARATOR ';'");
      assert_eq!(found, "printf");
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[test]
fn truncated_input_reports_end_of_input() {
  let err = generate_assembly("int main() { int x;").unwrap_err();
  assert!(matches!(err, CompileError::UnexpectedEof { .. }), "{err}");
}

#[test]
fn widening_assignment_is_silent() {
  assert!(messages("int main(){ int i = 1; float f; f = i; }").is_empty());
}

#[test]
fn narrowing_assignment_only_warns() {
  let diags = messages("int main(){ float f = 2.5; int i; i = f; }");
  assert_eq!(diags.len(), 1);
  assert_eq!(diags[0].0, Severity::Warning);
  assert!(diags[0].1.contains("implicit conversion"), "{}", diags[0].1);
}

#[test]
fn string_to_int_assignment_is_an_error() {
  let diags = messages("int main(){ int i; i = \"text\"; }");
  assert!(diags.iter().any(|(severity, _)| *severity == Severity::Error));
}

#[test]
fn variable_may_shadow_a_function() {
  let compilation = compile("int f(){ return 1; } int main(){ int f = 2; }").unwrap();
  assert!(compilation.program.diagnostics.is_empty());
  let levels: Vec<_> = compilation
    .program
    .symbols
    .iter()
    .filter(|s| s.name == "f")
    .map(|s| s.scope_level)
    .collect();
  assert_eq!(levels, vec![0, 1]);
}

#[test]
fn redeclaration_in_a_nested_block_is_reported() {
  let diags = messages("int main(){ int x; { int x; } }");
  assert_eq!(diags.len(), 1);
  assert_eq!(diags[0].0, Severity::Error);
  assert!(diags[0].1.contains("redeclared"));
}

#[test]
fn use_before_declaration_warns_then_confirms() {
  let compilation = compile("int main(){ x = 1; int x; }").unwrap();
  let diags: Vec<_> = compilation.program.diagnostics.iter().collect();
  assert_eq!(diags.len(), 1);
  assert_eq!(diags[0].severity, Severity::Warning);
  assert_eq!(diags[0].line, Some(1));

  let x: Vec<_> = compilation
    .program
    .symbols
    .iter()
    .filter(|s| s.name == "x")
    .collect();
  assert_eq!(x.len(), 1);
  assert!(x[0].declared);
  assert_eq!(x[0].data_type, DataType::Int);
}

#[test]
fn undeclared_assignment_target_is_reported_at_the_end() {
  let diags = messages("int main(){ ghost = 1; }");
  assert_eq!(diags.len(), 2);
  assert_eq!(diags[0].0, Severity::Warning);
  assert_eq!(diags[1].0, Severity::Error);
  assert!(diags[1].1.contains("never declared"));
}

#[test]
fn rejected_lexemes_never_reach_the_parser() {
  let compilation = compile("int main(){ int x = 1; @ x = 2; }").unwrap();
  let rejected: Vec<_> = compilation
    .tokens
    .rejected()
    .iter()
    .map(|t| t.text.as_str())
    .collect();
  assert_eq!(rejected, vec!["@"]);
  assert!(
    compilation
      .tokens
      .tokens()
      .iter()
      .all(|t| t.category != TokenCategory::Error)
  );
  assert!(compilation.program.diagnostics.is_empty());
}

#[test]
fn directives_are_kept_in_the_tree() {
  let compilation = compile("#include <stdio.h>\nint main(){}").unwrap();
  let root = &compilation.program.root;
  assert_eq!(root.children.len(), 2);
  assert_eq!(root.children[0].text(), "#include <stdio.h>");
}

#[test]
fn compilation_is_deterministic() {
  let source = "int main(){\n\tint a = 3;\n\tint b;\n\tb = a * 2 - 1;\n\tprintf(\"%d\", b);\n}\n";
  let first = compile(source).unwrap();
  let second = compile(source).unwrap();
  assert_eq!(first.tokens, second.tokens);
  assert_eq!(first.program.root, second.program.root);
  assert_eq!(first.assembly, second.assembly);
}
