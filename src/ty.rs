use std::fmt;

/// Data types known to the checker. `Unknown` is the poison value: once an
/// error has been reported for a sub-expression its type becomes `Unknown`
/// and enclosing operators stay quiet about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
  Int,
  Float,
  Char,
  CharPtr,
  Void,
  Unknown,
}

impl DataType {
  /// Parse a declared type name such as `int` or `char*`.
  pub fn from_name(name: &str) -> Self {
    match name {
      "int" => Self::Int,
      "float" => Self::Float,
      "char" => Self::Char,
      "char*" => Self::CharPtr,
      "void" => Self::Void,
      _ => Self::Unknown,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      Self::Int => "int",
      Self::Float => "float",
      Self::Char => "char",
      Self::CharPtr => "char*",
      Self::Void => "void",
      Self::Unknown => "unknown",
    }
  }

  pub fn is_numeric(self) -> bool {
    matches!(self, Self::Int | Self::Float)
  }

  pub fn is_unknown(self) -> bool {
    self == Self::Unknown
  }
}

impl fmt::Display for DataType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.name())
  }
}

/// Operator families that share a typing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorClass {
  Arithmetic,
  Comparison,
  Logical,
  Assignment,
}

impl OperatorClass {
  pub fn of(op: &str) -> Option<Self> {
    match op {
      "+" | "-" | "*" | "/" => Some(Self::Arithmetic),
      "==" | "!=" | "<" | ">" | "<=" | ">=" => Some(Self::Comparison),
      "&&" | "||" => Some(Self::Logical),
      "=" => Some(Self::Assignment),
      _ => None,
    }
  }
}

/// Problem found while typing an operator application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeIssue {
  InvalidOperands {
    op: String,
    left: DataType,
    right: DataType,
  },
  LogicalNeedsInt {
    op: String,
  },
  ImplicitNarrowing {
    target: DataType,
    value: DataType,
  },
  IncompatibleAssignment {
    target: DataType,
    value: DataType,
  },
  NotNeedsInt {
    operand: DataType,
  },
  UnaryNeedsNumber {
    op: String,
    operand: DataType,
  },
  UnsupportedOperator {
    op: String,
  },
}

impl TypeIssue {
  /// Narrowing is accepted with a warning; everything else is an error.
  pub fn is_warning(&self) -> bool {
    matches!(self, Self::ImplicitNarrowing { .. })
  }
}

impl fmt::Display for TypeIssue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::InvalidOperands { op, left, right } => {
        write!(f, "invalid operation '{op}' between {left} and {right}")
      }
      Self::LogicalNeedsInt { op } => write!(f, "logical operator '{op}' requires int operands"),
      Self::ImplicitNarrowing { target, value } => {
        write!(f, "implicit conversion from {value} to {target} in assignment")
      }
      Self::IncompatibleAssignment { target, value } => {
        write!(f, "incompatible types in assignment: {target} = {value}")
      }
      Self::NotNeedsInt { operand } => {
        write!(f, "operator '!' requires an int operand, got {operand}")
      }
      Self::UnaryNeedsNumber { op, operand } => {
        write!(f, "unary '{op}' requires a numeric operand, got {operand}")
      }
      Self::UnsupportedOperator { op } => write!(f, "unsupported operator '{op}'"),
    }
  }
}

/// Result type of an operator application plus any issue to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Typing {
  pub ty: DataType,
  pub issue: Option<TypeIssue>,
}

impl Typing {
  fn ok(ty: DataType) -> Self {
    Self { ty, issue: None }
  }

  fn poisoned(issue: TypeIssue) -> Self {
    Self {
      ty: DataType::Unknown,
      issue: Some(issue),
    }
  }
}

/// Type of `left op right`.
pub fn binary_result(left: DataType, op: &str, right: DataType) -> Typing {
  let Some(class) = OperatorClass::of(op) else {
    return Typing::poisoned(TypeIssue::UnsupportedOperator { op: op.to_string() });
  };

  // Comparisons yield int even over poisoned operands.
  if class == OperatorClass::Comparison {
    return Typing::ok(DataType::Int);
  }
  if left.is_unknown() || right.is_unknown() {
    return Typing::ok(DataType::Unknown);
  }

  match class {
    OperatorClass::Arithmetic => {
      if left == DataType::Float || right == DataType::Float {
        Typing::ok(DataType::Float)
      } else if left == DataType::Int && right == DataType::Int {
        Typing::ok(DataType::Int)
      } else {
        Typing::poisoned(TypeIssue::InvalidOperands {
          op: op.to_string(),
          left,
          right,
        })
      }
    }
    OperatorClass::Logical => {
      if left == DataType::Int && right == DataType::Int {
        Typing::ok(DataType::Int)
      } else {
        Typing::poisoned(TypeIssue::LogicalNeedsInt { op: op.to_string() })
      }
    }
    OperatorClass::Assignment => assignment_result(left, right),
    OperatorClass::Comparison => Typing::ok(DataType::Int),
  }
}

/// Type of storing a `value` into a `target`.
pub fn assignment_result(target: DataType, value: DataType) -> Typing {
  if target.is_unknown() || value.is_unknown() {
    return Typing::ok(DataType::Unknown);
  }
  match (target, value) {
    _ if target == value => Typing::ok(target),
    (DataType::Float, DataType::Int) => Typing::ok(target),
    (DataType::Int, DataType::Float) => Typing {
      ty: target,
      issue: Some(TypeIssue::ImplicitNarrowing { target, value }),
    },
    _ => Typing::poisoned(TypeIssue::IncompatibleAssignment { target, value }),
  }
}

/// Type of a prefix or postfix unary operator applied to `operand`.
pub fn unary_result(op: &str, operand: DataType) -> Typing {
  match op {
    "!" => {
      let issue = (!operand.is_unknown() && operand != DataType::Int)
        .then_some(TypeIssue::NotNeedsInt { operand });
      Typing {
        ty: DataType::Int,
        issue,
      }
    }
    "-" | "+" | "++" | "--" => {
      if operand.is_numeric() || operand.is_unknown() {
        Typing::ok(operand)
      } else {
        Typing::poisoned(TypeIssue::UnaryNeedsNumber {
          op: op.to_string(),
          operand,
        })
      }
    }
    _ => Typing::poisoned(TypeIssue::UnsupportedOperator { op: op.to_string() }),
  }
}
