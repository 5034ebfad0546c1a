//! Recursive-descent parser producing the syntax tree.
//!
//! Parsing and semantic analysis run interleaved: every declaration, use and
//! assignment is handed to the [`Analyzer`] as soon as it has been read, so
//! the symbol table always reflects the program up to the cursor. Syntax
//! errors are fatal and abort with the first unexpected token; semantic
//! findings only accumulate as diagnostics.
//!
//! Expressions are not reduced to a tree here. An `EXPRESSION` node holds the
//! leaf tokens exactly as written and precedence is resolved later (see
//! [`crate::expr`]).

use std::fmt;
use std::io::{self, Write};

use crate::error::{CompileError, CompileResult, Diagnostics};
use crate::sema::Analyzer;
use crate::symbol::SymbolTable;
use crate::tokenizer::{Token, TokenCategory, TokenSequence, describe_token};
use crate::ty::DataType;

/// Node categories of the syntax tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
  Program,
  Directive,
  Function,
  Block,
  Declaration,
  Assignment,
  FunctionCall,
  Arguments,
  If,
  While,
  For,
  Return,
  ExpressionStatement,
  Expression,
  /// A leaf copied from a token, or a folded binary `OPERATOR` node.
  Token(TokenCategory),
}

impl NodeKind {
  pub fn label(self) -> &'static str {
    match self {
      Self::Program => "PROGRAM",
      Self::Directive => "DIRECTIVE",
      Self::Function => "FUNCTION",
      Self::Block => "BLOCK",
      Self::Declaration => "DECLARATION",
      Self::Assignment => "ASSIGNMENT",
      Self::FunctionCall => "FUNCTION_CALL",
      Self::Arguments => "ARGUMENTS",
      Self::If => "IF",
      Self::While => "WHILE",
      Self::For => "FOR",
      Self::Return => "RETURN",
      Self::ExpressionStatement => "EXPRESSION_STATEMENT",
      Self::Expression => "EXPRESSION",
      Self::Token(category) => category.name(),
    }
  }
}

impl fmt::Display for NodeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.label())
  }
}

/// Owned syntax tree node. Children are dropped with their parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
  pub kind: NodeKind,
  pub value: Option<String>,
  pub line: usize,
  pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
  pub fn new(kind: NodeKind, line: usize) -> Self {
    Self {
      kind,
      value: None,
      line,
      children: Vec::new(),
    }
  }

  pub fn with_value(kind: NodeKind, value: impl Into<String>, line: usize) -> Self {
    Self {
      value: Some(value.into()),
      ..Self::new(kind, line)
    }
  }

  /// Leaf carrying a token's text and category.
  pub fn leaf(token: &Token) -> Self {
    Self::with_value(NodeKind::Token(token.category), &token.text, token.row)
  }

  /// Binary `OPERATOR` node with both operands as children.
  pub fn binary(op: &str, line: usize, lhs: SyntaxNode, rhs: SyntaxNode) -> Self {
    let mut node = Self::with_value(NodeKind::Token(TokenCategory::Operator), op, line);
    node.children = vec![lhs, rhs];
    node
  }

  pub fn push(&mut self, child: SyntaxNode) {
    self.children.push(child);
  }

  pub fn text(&self) -> &str {
    self.value.as_deref().unwrap_or_default()
  }

  pub fn is_token(&self, category: TokenCategory) -> bool {
    self.kind == NodeKind::Token(category)
  }

  pub fn is_separator(&self, text: &str) -> bool {
    self.is_token(TokenCategory::Separator) && self.text() == text
  }

  /// Depth-first, pre-order walk.
  pub fn walk(&self) -> impl Iterator<Item = &SyntaxNode> {
    let mut stack = vec![self];
    std::iter::from_fn(move || {
      let node = stack.pop()?;
      stack.extend(node.children.iter().rev());
      Some(node)
    })
  }
}

/// Render the tree: two spaces of indent per level, `LABEL: value` or `LABEL`.
pub fn write_ast(root: &SyntaxNode, out: &mut impl Write) -> io::Result<()> {
  write_node(root, 0, out)
}

fn write_node(node: &SyntaxNode, depth: usize, out: &mut impl Write) -> io::Result<()> {
  let indent = "  ".repeat(depth);
  match node.value.as_deref().filter(|v| !v.is_empty()) {
    Some(value) => writeln!(out, "{indent}{}: {value}", node.kind)?,
    None => writeln!(out, "{indent}{}", node.kind)?,
  }
  for child in &node.children {
    write_node(child, depth + 1, out)?;
  }
  Ok(())
}

/// Everything the front-end produces for the code generator.
#[derive(Debug)]
pub struct ParsedProgram {
  pub root: SyntaxNode,
  pub symbols: SymbolTable,
  pub diagnostics: Diagnostics,
}

/// Parse a whole program, running semantic checks along the way.
pub fn parse_program(tokens: &TokenSequence) -> CompileResult<ParsedProgram> {
  let mut parser = Parser {
    stream: TokenStream::new(tokens.tokens()),
    sema: Analyzer::new(),
    return_type: DataType::Void,
  };
  let root = parser.program()?;
  let (symbols, diagnostics) = parser.sema.finish();

  tracing::debug!(
    symbols = symbols.len(),
    diagnostics = diagnostics.len(),
    "parsed program"
  );
  Ok(ParsedProgram {
    root,
    symbols,
    diagnostics,
  })
}

struct Parser<'a> {
  stream: TokenStream<'a>,
  sema: Analyzer,
  /// Return type of the function whose body is being parsed.
  return_type: DataType,
}

impl<'a> Parser<'a> {
  fn program(&mut self) -> CompileResult<SyntaxNode> {
    let mut root = SyntaxNode::new(NodeKind::Program, 1);

    while let Some(token) = self.stream.peek()
      && token.category == TokenCategory::Directive
    {
      root.push(SyntaxNode::with_value(
        NodeKind::Directive,
        &token.text,
        token.row,
      ));
      self.stream.advance();
    }

    loop {
      root.push(self.function()?);
      if self.stream.is_eof() {
        break;
      }
    }
    Ok(root)
  }

  fn function(&mut self) -> CompileResult<SyntaxNode> {
    let (type_node, return_type) = self.type_name()?;
    let name = self.stream.expect(TokenCategory::Identifier, "IDENTIFIER")?;
    let mut node = SyntaxNode::new(NodeKind::Function, type_node.line);

    self.sema.declare_function(return_type, name);
    self.stream.skip(TokenCategory::Separator, "(")?;
    self.stream.skip(TokenCategory::Separator, ")")?;

    tracing::trace!(name = %name.text, %return_type, "parsing function");
    self.return_type = return_type;
    let body = self.scoped(Self::block)?;

    node.push(type_node);
    node.push(SyntaxNode::leaf(name));
    node.push(body);
    Ok(node)
  }

  /// Run `parse` one scope level deeper. The scope is left again even when
  /// `parse` fails, so entries and exits always pair up.
  fn scoped<T>(
    &mut self,
    parse: impl FnOnce(&mut Self) -> CompileResult<T>,
  ) -> CompileResult<T> {
    self.sema.enter_scope();
    let result = parse(self);
    self.sema.exit_scope();
    result
  }

  /// `TYPE`, or `char *`. Other pointer types are not part of the language,
  /// so their `*` is left for the caller to reject.
  fn type_name(&mut self) -> CompileResult<(SyntaxNode, DataType)> {
    let token = self.stream.expect(TokenCategory::Type, "TYPE")?;
    let mut name = token.text.clone();
    if name == "char" && self.stream.equal(TokenCategory::Operator, "*") {
      name.push('*');
    }
    let data_type = DataType::from_name(&name);
    let node = SyntaxNode::with_value(NodeKind::Token(TokenCategory::Type), name, token.row);
    Ok((node, data_type))
  }

  /// Nested blocks share the function's scope level.
  fn block(&mut self) -> CompileResult<SyntaxNode> {
    let open = self.stream.skip(TokenCategory::Separator, "{")?;
    let mut node = SyntaxNode::new(NodeKind::Block, open.row);

    loop {
      match self.stream.peek() {
        Some(token) if token.is_separator("}") => break,
        Some(_) => node.push(self.statement()?),
        None => return Err(self.stream.error("SEPARATOR '}'")),
      }
    }
    self.stream.skip(TokenCategory::Separator, "}")?;
    Ok(node)
  }

  fn statement(&mut self) -> CompileResult<SyntaxNode> {
    let Some(token) = self.stream.peek() else {
      return Err(self.stream.error("statement"));
    };

    match (token.category, token.text.as_str()) {
      (TokenCategory::Type, _) => self.declaration(),
      (TokenCategory::Keyword, "printf" | "scanf") => self.print_call(),
      (TokenCategory::Keyword, "if") => self.if_statement(),
      (TokenCategory::Keyword, "while") => self.while_statement(),
      (TokenCategory::Keyword, "for") => self.for_statement(),
      (TokenCategory::Keyword, "return") => self.return_statement(),
      (TokenCategory::Keyword, _) => Err(self.stream.error("statement")),
      (TokenCategory::Separator, "{") => self.block(),
      (TokenCategory::Identifier, _)
        if self
          .stream
          .peek_nth(1)
          .is_some_and(|next| next.is(TokenCategory::Operator, "=")) =>
      {
        self.assignment()
      }
      _ => self.expression_statement(),
    }
  }

  fn declaration(&mut self) -> CompileResult<SyntaxNode> {
    let (type_node, data_type) = self.type_name()?;
    let name = self.stream.expect(TokenCategory::Identifier, "IDENTIFIER")?;
    let mut node = SyntaxNode::new(NodeKind::Declaration, type_node.line);
    node.push(type_node);
    node.push(SyntaxNode::leaf(name));

    self.sema.declare_variable(data_type, name);

    if self.stream.equal(TokenCategory::Operator, "=") {
      let init = self.required_expression()?;
      self.sema.check_initializer(data_type, &init, name.row);
      node.push(init);
    }
    self.stream.skip(TokenCategory::Separator, ";")?;
    Ok(node)
  }

  fn assignment(&mut self) -> CompileResult<SyntaxNode> {
    let target = self.stream.expect(TokenCategory::Identifier, "IDENTIFIER")?;
    self.stream.skip(TokenCategory::Operator, "=")?;
    self.sema.resolve_assignment_target(target);

    let value = self.required_expression()?;
    self.sema.check_assignment(target, &value);
    self.stream.skip(TokenCategory::Separator, ";")?;

    let mut node = SyntaxNode::new(NodeKind::Assignment, target.row);
    node.push(SyntaxNode::leaf(target));
    node.push(value);
    Ok(node)
  }

  fn print_call(&mut self) -> CompileResult<SyntaxNode> {
    let callee = self.stream.expect(TokenCategory::Keyword, "KEYWORD")?;
    let open = self.stream.skip(TokenCategory::Separator, "(")?;

    let mut args = SyntaxNode::new(NodeKind::Arguments, open.row);
    loop {
      args.push(self.required_expression()?);
      if !self.stream.equal(TokenCategory::Separator, ",") {
        break;
      }
    }
    self.stream.skip(TokenCategory::Separator, ")")?;
    self.stream.skip(TokenCategory::Separator, ";")?;

    self.sema.check_print_call(callee, &args.children);
    let mut node = SyntaxNode::new(NodeKind::FunctionCall, callee.row);
    node.push(SyntaxNode::leaf(callee));
    node.push(args);
    Ok(node)
  }

  fn if_statement(&mut self) -> CompileResult<SyntaxNode> {
    let keyword = self.stream.skip(TokenCategory::Keyword, "if")?;
    let mut node = SyntaxNode::new(NodeKind::If, keyword.row);
    node.push(self.condition()?);
    node.push(self.statement()?);

    if self.stream.equal(TokenCategory::Keyword, "else") {
      node.push(self.statement()?);
    }
    Ok(node)
  }

  fn while_statement(&mut self) -> CompileResult<SyntaxNode> {
    let keyword = self.stream.skip(TokenCategory::Keyword, "while")?;
    let mut node = SyntaxNode::new(NodeKind::While, keyword.row);
    node.push(self.condition()?);
    node.push(self.statement()?);
    Ok(node)
  }

  /// `( expression )` with the expression type-checked.
  fn condition(&mut self) -> CompileResult<SyntaxNode> {
    self.stream.skip(TokenCategory::Separator, "(")?;
    let cond = self.required_expression()?;
    self.sema.infer(&cond);
    self.stream.skip(TokenCategory::Separator, ")")?;
    Ok(cond)
  }

  fn for_statement(&mut self) -> CompileResult<SyntaxNode> {
    let keyword = self.stream.skip(TokenCategory::Keyword, "for")?;
    let mut node = SyntaxNode::new(NodeKind::For, keyword.row);
    self.stream.skip(TokenCategory::Separator, "(")?;

    for terminator in [";", ";", ")"] {
      let clause = self.expression();
      self.sema.infer(&clause);
      node.push(clause);
      self.stream.skip(TokenCategory::Separator, terminator)?;
    }
    node.push(self.statement()?);
    Ok(node)
  }

  fn return_statement(&mut self) -> CompileResult<SyntaxNode> {
    let keyword = self.stream.skip(TokenCategory::Keyword, "return")?;
    let value = self.expression();
    self.sema.check_return(self.return_type, &value, keyword.row);
    self.stream.skip(TokenCategory::Separator, ";")?;

    let mut node = SyntaxNode::new(NodeKind::Return, keyword.row);
    node.push(value);
    Ok(node)
  }

  fn expression_statement(&mut self) -> CompileResult<SyntaxNode> {
    let expr = self.expression();
    self.sema.infer(&expr);
    self.stream.skip(TokenCategory::Separator, ";")?;

    let mut node = SyntaxNode::new(NodeKind::ExpressionStatement, expr.line);
    node.push(expr);
    Ok(node)
  }

  fn required_expression(&mut self) -> CompileResult<SyntaxNode> {
    let expr = self.expression();
    if expr.children.is_empty() {
      return Err(self.stream.error("expression"));
    }
    Ok(expr)
  }

  /// Collect leaf tokens up to a depth-0 `;` or `,`, an unmatched `)`, or a
  /// token that cannot appear inside an expression.
  fn expression(&mut self) -> SyntaxNode {
    let mut node = SyntaxNode::new(NodeKind::Expression, self.stream.line());
    let mut depth = 0usize;

    while let Some(token) = self.stream.peek() {
      match (token.category, token.text.as_str()) {
        (
          TokenCategory::Identifier
          | TokenCategory::Number
          | TokenCategory::Literal
          | TokenCategory::Operator,
          _,
        ) => {}
        (TokenCategory::Separator, "(") => depth += 1,
        (TokenCategory::Separator, ")") if depth > 0 => depth -= 1,
        (TokenCategory::Separator, ",") if depth > 0 => {}
        _ => break,
      }
      node.push(SyntaxNode::leaf(token));
      self.stream.advance();
    }
    node
  }
}

/// Lightweight cursor over the token slice.
struct TokenStream<'a> {
  tokens: &'a [Token],
  pos: usize,
}

impl<'a> TokenStream<'a> {
  fn new(tokens: &'a [Token]) -> Self {
    Self { tokens, pos: 0 }
  }

  fn peek(&self) -> Option<&'a Token> {
    self.tokens.get(self.pos)
  }

  fn peek_nth(&self, n: usize) -> Option<&'a Token> {
    self.tokens.get(self.pos + n)
  }

  fn advance(&mut self) -> Option<&'a Token> {
    let token = self.peek()?;
    self.pos += 1;
    Some(token)
  }

  /// Consume the current token if it matches.
  fn equal(&mut self, category: TokenCategory, text: &str) -> bool {
    if self.peek().is_some_and(|token| token.is(category, text)) {
      self.pos += 1;
      return true;
    }
    false
  }

  /// Consume a token that must match exactly.
  fn skip(&mut self, category: TokenCategory, text: &str) -> CompileResult<&'a Token> {
    match self.peek() {
      Some(token) if token.is(category, text) => {
        self.pos += 1;
        Ok(token)
      }
      _ => Err(self.error(&format!("{} '{text}'", category.name()))),
    }
  }

  /// Consume a token of the given category, whatever its text.
  fn expect(&mut self, category: TokenCategory, expected: &str) -> CompileResult<&'a Token> {
    match self.peek() {
      Some(token) if token.category == category => {
        self.pos += 1;
        Ok(token)
      }
      _ => Err(self.error(expected)),
    }
  }

  /// Fatal error at the current position.
  fn error(&self, expected: &str) -> CompileError {
    match self.peek() {
      Some(token) => {
        CompileError::expected_at(token.row, token.col, expected, describe_token(Some(token)))
      }
      None => CompileError::expected_eof(expected),
    }
  }

  /// Source line at the cursor, or of the last token once input is used up.
  fn line(&self) -> usize {
    self
      .peek()
      .or_else(|| self.tokens.last())
      .map_or(1, |token| token.row)
  }

  fn is_eof(&self) -> bool {
    self.pos >= self.tokens.len()
  }
}
