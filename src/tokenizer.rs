//! Lexical analysis: turns the raw input string into a sequence of tokens.
//!
//! Scanning is character by character with exact row/column bookkeeping. A
//! lexeme is first grown greedily according to the class of its first
//! character and only then classified, so malformed runs (`x$y`, `12ab`, an
//! unterminated string) become a single `ERROR` span. Those spans are kept
//! out of the token stream and retained separately in
//! [`TokenSequence::rejected`].

use std::fmt;
use std::io::{self, Write};

pub const KEYWORDS: &[&str] = &[
  "if", "else", "do", "while", "for", "return", "struct", "break", "continue", "switch", "case",
  "printf", "scanf", "default",
];

pub const TYPE_NAMES: &[&str] = &["int", "float", "char", "void"];

const SEPARATORS: &[char] = &[' ', '\t', '\n', '\r', ',', ';', '(', ')', '{', '}'];

const OPERATOR_STARTS: &[char] = &['=', '+', '-', '*', '/', '<', '>', '!', '&', '|'];

const SINGLE_OPERATORS: &[char] = &['=', '+', '-', '*', '/', '<', '>', '!'];

const DOUBLE_OPERATORS: &[&str] = &["++", "--", "==", "!=", "<=", ">=", "&&", "||"];

const TAB_WIDTH: usize = 4;

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenCategory {
  Keyword,
  Identifier,
  Number,
  Operator,
  Type,
  Literal,
  Directive,
  Separator,
  Error,
}

impl TokenCategory {
  pub fn name(self) -> &'static str {
    match self {
      Self::Keyword => "KEYWORD",
      Self::Identifier => "IDENTIFIER",
      Self::Number => "NUMBER",
      Self::Operator => "OPERATOR",
      Self::Type => "TYPE",
      Self::Literal => "LITERAL",
      Self::Directive => "DIRECTIVE",
      Self::Separator => "SEPARATOR",
      Self::Error => "ERROR",
    }
  }
}

impl fmt::Display for TokenCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    // `pad` so width specifiers in the token table apply.
    f.pad(self.name())
  }
}

/// One classified lexeme with its 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub index: usize,
  pub text: String,
  pub category: TokenCategory,
  pub row: usize,
  pub col: usize,
}

impl Token {
  pub fn is(&self, category: TokenCategory, text: &str) -> bool {
    self.category == category && self.text == text
  }

  pub fn is_separator(&self, text: &str) -> bool {
    self.is(TokenCategory::Separator, text)
  }
}

/// Tokens in source order plus the spans that failed classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSequence {
  tokens: Vec<Token>,
  rejected: Vec<Token>,
}

impl TokenSequence {
  pub fn tokens(&self) -> &[Token] {
    &self.tokens
  }

  /// `ERROR` spans dropped from the stream, in source order.
  pub fn rejected(&self) -> &[Token] {
    &self.rejected
  }

  pub fn len(&self) -> usize {
    self.tokens.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  pub fn into_tokens(self) -> Vec<Token> {
    self.tokens
  }
}

/// Class of the character that starts a lexeme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartClass {
  Identifier,
  Digit,
  Operator,
  Quote,
  Directive,
  Separator,
  Unknown,
}

fn start_class(c: char) -> StartClass {
  if c.is_ascii_alphabetic() || c == '_' {
    StartClass::Identifier
  } else if c.is_ascii_digit() {
    StartClass::Digit
  } else if OPERATOR_STARTS.contains(&c) {
    StartClass::Operator
  } else if c == '\'' || c == '"' {
    StartClass::Quote
  } else if c == '#' {
    StartClass::Directive
  } else if is_separator(c) {
    StartClass::Separator
  } else {
    StartClass::Unknown
  }
}

fn is_separator(c: char) -> bool {
  SEPARATORS.contains(&c)
}

fn ends_word(c: char) -> bool {
  is_separator(c) || OPERATOR_STARTS.contains(&c)
}

/// Character cursor that keeps row and column in step with consumption.
struct Scanner {
  chars: Vec<char>,
  pos: usize,
  row: usize,
  col: usize,
}

impl Scanner {
  fn new(source: &str) -> Self {
    Self {
      chars: source.chars().collect(),
      pos: 0,
      row: 1,
      col: 0,
    }
  }

  fn peek(&self) -> Option<char> {
    self.chars.get(self.pos).copied()
  }

  fn bump(&mut self) -> Option<char> {
    let c = self.peek()?;
    self.pos += 1;
    match c {
      '\n' => {
        self.row += 1;
        self.col = 0;
      }
      '\t' => self.col += TAB_WIDTH,
      _ => self.col += 1,
    }
    Some(c)
  }

  fn bump_while(&mut self, text: &mut String, keep: impl Fn(char) -> bool) {
    while let Some(c) = self.peek()
      && keep(c)
    {
      text.push(c);
      self.bump();
    }
  }
}

/// Lex the input into a [`TokenSequence`]. Never fails.
pub fn tokenize(source: &str) -> TokenSequence {
  let mut scanner = Scanner::new(source);
  let mut sequence = TokenSequence::default();

  while let Some(c) = scanner.peek() {
    if c.is_whitespace() {
      scanner.bump();
      continue;
    }

    let (row, col) = (scanner.row, scanner.col + 1);
    let class = start_class(c);
    let previous = sequence.tokens.last();
    let (text, category) = scan_lexeme(&mut scanner, class, previous);

    let token = Token {
      index: 0,
      text,
      category,
      row,
      col,
    };
    if category == TokenCategory::Error {
      tracing::debug!(text = %token.text, row, col, "dropping malformed lexeme");
      sequence.rejected.push(token);
    } else {
      let index = sequence.tokens.len() + 1;
      sequence.tokens.push(Token { index, ..token });
    }
  }

  tracing::debug!(
    tokens = sequence.tokens.len(),
    rejected = sequence.rejected.len(),
    "tokenized source"
  );
  sequence
}

fn scan_lexeme(
  scanner: &mut Scanner,
  class: StartClass,
  previous: Option<&Token>,
) -> (String, TokenCategory) {
  let mut text = String::new();
  let Some(first) = scanner.bump() else {
    return (text, TokenCategory::Error);
  };
  text.push(first);

  match class {
    StartClass::Separator => (text, TokenCategory::Separator),
    StartClass::Directive => {
      scanner.bump_while(&mut text, |c| c != '\n' && c != '\r');
      (text, TokenCategory::Directive)
    }
    StartClass::Quote => {
      let closed = scan_literal(scanner, first, &mut text);
      let category = if closed {
        TokenCategory::Literal
      } else {
        TokenCategory::Error
      };
      (text, category)
    }
    StartClass::Operator => {
      if let Some(next) = scanner.peek()
        && DOUBLE_OPERATORS.contains(&format!("{first}{next}").as_str())
      {
        text.push(next);
        scanner.bump();
      } else if first == '-'
        && scanner.peek().is_some_and(|c| c.is_ascii_digit())
        && !previous.is_some_and(is_operand)
      {
        scanner.bump_while(&mut text, |c| !ends_word(c));
      }
      let category = classify_operator(&text);
      (text, category)
    }
    StartClass::Identifier | StartClass::Digit | StartClass::Unknown => {
      scanner.bump_while(&mut text, |c| !ends_word(c));
      let category = match class {
        StartClass::Identifier => classify_word(&text),
        StartClass::Digit => classify_number(&text),
        _ => TokenCategory::Error,
      };
      (text, category)
    }
  }
}

/// Consume through the closing quote. A backslash escapes the character
/// after it, so `"a\"b"` is one literal. Returns false when input ends first.
fn scan_literal(scanner: &mut Scanner, quote: char, text: &mut String) -> bool {
  while let Some(c) = scanner.bump() {
    text.push(c);
    if c == '\\' {
      if let Some(escaped) = scanner.bump() {
        text.push(escaped);
      }
      continue;
    }
    if c == quote {
      return true;
    }
  }
  false
}

/// Tokens after which a `-` is a binary minus rather than a sign.
fn is_operand(token: &Token) -> bool {
  matches!(
    token.category,
    TokenCategory::Identifier | TokenCategory::Number | TokenCategory::Literal
  ) || token.is_separator(")")
}

fn classify_word(text: &str) -> TokenCategory {
  if KEYWORDS.contains(&text) {
    return TokenCategory::Keyword;
  }
  if TYPE_NAMES.contains(&text) {
    return TokenCategory::Type;
  }
  if text
    .chars()
    .skip(1)
    .all(|c| c.is_ascii_alphanumeric() || c == '_')
  {
    TokenCategory::Identifier
  } else {
    TokenCategory::Error
  }
}

fn classify_number(text: &str) -> TokenCategory {
  if is_number_body(text) {
    TokenCategory::Number
  } else {
    TokenCategory::Error
  }
}

/// Digits, optionally with one interior decimal point.
fn is_number_body(text: &str) -> bool {
  let mut parts = text.splitn(2, '.');
  let whole = parts.next().unwrap_or_default();
  let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
  match parts.next() {
    Some(fraction) => all_digits(whole) && all_digits(fraction),
    None => all_digits(whole),
  }
}

fn classify_operator(text: &str) -> TokenCategory {
  if DOUBLE_OPERATORS.contains(&text) {
    return TokenCategory::Operator;
  }
  let mut chars = text.chars();
  match (chars.next(), chars.next()) {
    (Some(c), None) if SINGLE_OPERATORS.contains(&c) => TokenCategory::Operator,
    (Some('-'), Some(d)) if d.is_ascii_digit() => classify_number(&text[1..]),
    _ => TokenCategory::Error,
  }
}

/// Render the token table, one line per emitted token.
pub fn write_token_table(sequence: &TokenSequence, out: &mut impl Write) -> io::Result<()> {
  for token in sequence.tokens() {
    writeln!(
      out,
      "{:>3} | {:<40} | {:<10} | Linha:{:>3} Col:{:>3}",
      token.index, token.text, token.category, token.row, token.col
    )?;
  }
  Ok(())
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: Option<&Token>) -> String {
  match token {
    Some(t) => t.text.clone(),
    None => "EOF".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn lexemes(source: &str) -> Vec<(String, TokenCategory)> {
    tokenize(source)
      .into_tokens()
      .into_iter()
      .map(|t| (t.text, t.category))
      .collect()
  }

  fn texts(source: &str) -> Vec<String> {
    lexemes(source).into_iter().map(|(text, _)| text).collect()
  }

  #[test]
  fn classifies_a_declaration() {
    use TokenCategory::*;
    assert_eq!(
      lexemes("int x = 5;"),
      vec![
        ("int".to_string(), Type),
        ("x".to_string(), Identifier),
        ("=".to_string(), Operator),
        ("5".to_string(), Number),
        (";".to_string(), Separator),
      ]
    );
  }

  #[test]
  fn splits_dense_source_at_operators_and_separators() {
    assert_eq!(
      texts("int main(){int x=5;x=x+y;printf(\"%d\",x);}"),
      vec![
        "int", "main", "(", ")", "{", "int", "x", "=", "5", ";", "x", "=", "x", "+", "y", ";",
        "printf", "(", "\"%d\"", ",", "x", ")", ";", "}"
      ]
    );
  }

  #[test]
  fn keywords_and_types_take_priority_over_identifiers() {
    use TokenCategory::*;
    let cats: Vec<_> = lexemes("while float printf whilex")
      .into_iter()
      .map(|(_, c)| c)
      .collect();
    assert_eq!(cats, vec![Keyword, Type, Keyword, Identifier]);
  }

  #[test]
  fn tracks_rows_and_columns_with_tabs() {
    let seq = tokenize("int a;\n\tb = 1;\n  c");
    let positions: Vec<_> = seq
      .tokens()
      .iter()
      .map(|t| (t.text.as_str(), t.row, t.col))
      .collect();
    assert_eq!(
      positions,
      vec![
        ("int", 1, 1),
        ("a", 1, 5),
        (";", 1, 6),
        ("b", 2, 5),
        ("=", 2, 7),
        ("1", 2, 9),
        (";", 2, 10),
        ("c", 3, 3),
      ]
    );
  }

  #[test]
  fn indices_are_contiguous_and_one_based() {
    let seq = tokenize("a $b c");
    let indices: Vec<_> = seq.tokens().iter().map(|t| t.index).collect();
    assert_eq!(indices, vec![1, 2]);
  }

  #[test]
  fn two_character_operators_use_maximal_munch() {
    assert_eq!(
      texts("a<=b==c&&d||!e++"),
      vec!["a", "<=", "b", "==", "c", "&&", "d", "||", "!", "e", "++"]
    );
  }

  #[test]
  fn negative_literal_only_after_non_operand() {
    use TokenCategory::*;
    assert_eq!(
      lexemes("x=-5"),
      vec![
        ("x".to_string(), Identifier),
        ("=".to_string(), Operator),
        ("-5".to_string(), Number),
      ]
    );
    assert_eq!(texts("x-5"), vec!["x", "-", "5"]);
    assert_eq!(texts("(-3)"), vec!["(", "-3", ")"]);
  }

  #[test]
  fn floating_literals_are_numbers() {
    assert_eq!(
      lexemes("3.25")[0],
      ("3.25".to_string(), TokenCategory::Number)
    );
  }

  #[test]
  fn malformed_spans_are_dropped_but_retained() {
    let seq = tokenize("int x$y = 12ab; 3.1.4 @ & ok");
    let kept: Vec<_> = seq.tokens().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(kept, vec!["int", "=", ";", "ok"]);

    let rejected: Vec<_> = seq.rejected().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(rejected, vec!["x$y", "12ab", "3.1.4", "@", "&"]);
    assert!(
      seq
        .rejected()
        .iter()
        .all(|t| t.category == TokenCategory::Error)
    );
  }

  #[test]
  fn literal_respects_escaped_quotes() {
    assert_eq!(
      lexemes(r#""a\"b" 'c'"#),
      vec![
        (r#""a\"b""#.to_string(), TokenCategory::Literal),
        ("'c'".to_string(), TokenCategory::Literal),
      ]
    );
  }

  #[test]
  fn unterminated_literal_is_rejected() {
    let seq = tokenize("x = \"open");
    assert_eq!(seq.len(), 2);
    assert_eq!(seq.rejected()[0].text, "\"open");
  }

  #[test]
  fn directive_runs_to_end_of_line() {
    let seq = tokenize("#include <stdio.h>\nint");
    assert_eq!(seq.tokens()[0].text, "#include <stdio.h>");
    assert_eq!(seq.tokens()[0].category, TokenCategory::Directive);
    assert_eq!((seq.tokens()[1].row, seq.tokens()[1].col), (2, 1));
  }

  #[test]
  fn whitespace_is_never_emitted() {
    assert!(tokenize(" \t\r\n  ").is_empty());
  }

  #[test]
  fn lexing_is_deterministic() {
    let source = "int main(){ float f = 2.5; f = f * -1; }";
    assert_eq!(tokenize(source), tokenize(source));
  }

  #[test]
  fn token_table_format() {
    let seq = tokenize("int x;");
    let mut out = Vec::new();
    write_token_table(&seq, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let first = text.lines().next().unwrap();
    assert_eq!(
      first,
      format!("  1 | {:<40} | {:<10} | Linha:  1 Col:  1", "int", "TYPE")
    );
    assert_eq!(text.lines().count(), 3);
  }
}
