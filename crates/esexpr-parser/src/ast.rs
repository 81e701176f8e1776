//! Expression AST.
//!
//! Node shapes follow the ESTree convention: every node carries a `type` tag
//! and a half-open `[start, end)` byte range into the parsed source. With
//! `serde`, a tree serializes to the same JSON an ESTree consumer expects.

use serde::Serialize;

/// A half-open byte range into the parsed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Whether `other` lies entirely within this span.
    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// A complete expression node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    #[serde(flatten)]
    pub kind: ExprKind,
    #[serde(flatten)]
    pub span: Span,
}

impl Expression {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The ESTree `type` tag of this node.
    pub fn node_type(&self) -> &'static str {
        self.kind.node_type()
    }

    /// Identifiers and member expressions are the only valid update targets.
    pub fn is_lvalue(&self) -> bool {
        matches!(self.kind, ExprKind::Identifier { .. } | ExprKind::Member { .. })
    }

    pub fn is_chain(&self) -> bool {
        matches!(self.kind, ExprKind::Chain { .. })
    }

    /// Direct children in source order. Array holes are skipped.
    pub fn children(&self) -> Vec<&Expression> {
        match &self.kind {
            ExprKind::Literal { .. } | ExprKind::Identifier { .. } | ExprKind::This => Vec::new(),
            ExprKind::Array { elements } => elements.iter().flatten().collect(),
            ExprKind::Sequence { expressions } => expressions.iter().collect(),
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => vec![test.as_ref(), consequent.as_ref(), alternate.as_ref()],
            ExprKind::New { callee, arguments } | ExprKind::Call { callee, arguments, .. } => {
                std::iter::once(callee.as_ref()).chain(arguments).collect()
            }
            ExprKind::Member {
                object, property, ..
            } => vec![object.as_ref(), property.as_ref()],
            ExprKind::Chain { expression } => vec![expression.as_ref()],
            ExprKind::Update { argument, .. } | ExprKind::Unary { argument, .. } => {
                vec![argument.as_ref()]
            }
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                vec![left.as_ref(), right.as_ref()]
            }
        }
    }
}

/// Expression variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ExprKind {
    /// Numeric, boolean or null literal: `42`, `1e3`, `true`, `null`
    Literal { raw: String, value: LiteralValue },

    /// Identifier: `count`, `$el`
    Identifier { name: String },

    /// `this`
    #[serde(rename = "ThisExpression")]
    This,

    /// Array literal: `[1, , 3]`. `None` marks a hole.
    #[serde(rename = "ArrayExpression")]
    Array { elements: Vec<Option<Expression>> },

    /// Comma sequence: `a, b, c` (always two or more expressions)
    #[serde(rename = "SequenceExpression")]
    Sequence { expressions: Vec<Expression> },

    /// Ternary: `ok ? yes : no`
    #[serde(rename = "ConditionalExpression")]
    Conditional {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },

    /// Constructor call: `new Foo(a)`, `new Foo`
    #[serde(rename = "NewExpression")]
    New {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },

    /// Function call: `save()`, `fn?.(x)`
    #[serde(rename = "CallExpression")]
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
        optional: bool,
    },

    /// Member access: `user.name`, `items[0]`, `a?.b`
    #[serde(rename = "MemberExpression")]
    Member {
        object: Box<Expression>,
        property: Box<Expression>,
        computed: bool,
        optional: bool,
    },

    /// Wraps a member/call run containing at least one optional link.
    #[serde(rename = "ChainExpression")]
    Chain { expression: Box<Expression> },

    /// `++x`, `x--`
    #[serde(rename = "UpdateExpression")]
    Update {
        operator: UpdateOperator,
        prefix: bool,
        argument: Box<Expression>,
    },

    /// `!x`, `-x`, `typeof x`
    #[serde(rename = "UnaryExpression")]
    Unary {
        operator: UnaryOperator,
        prefix: bool,
        argument: Box<Expression>,
    },

    /// `a + b`, `a instanceof B`
    #[serde(rename = "BinaryExpression")]
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// `a && b`, `a ?? b`
    #[serde(rename = "LogicalExpression")]
    Logical {
        operator: LogicalOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl ExprKind {
    pub fn node_type(&self) -> &'static str {
        match self {
            ExprKind::Literal { .. } => "Literal",
            ExprKind::Identifier { .. } => "Identifier",
            ExprKind::This => "ThisExpression",
            ExprKind::Array { .. } => "ArrayExpression",
            ExprKind::Sequence { .. } => "SequenceExpression",
            ExprKind::Conditional { .. } => "ConditionalExpression",
            ExprKind::New { .. } => "NewExpression",
            ExprKind::Call { .. } => "CallExpression",
            ExprKind::Member { .. } => "MemberExpression",
            ExprKind::Chain { .. } => "ChainExpression",
            ExprKind::Update { .. } => "UpdateExpression",
            ExprKind::Unary { .. } => "UnaryExpression",
            ExprKind::Binary { .. } => "BinaryExpression",
            ExprKind::Logical { .. } => "LogicalExpression",
        }
    }
}

/// The parsed value of a `Literal`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Number(f64),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpdateOperator {
    #[serde(rename = "++")]
    Increment,
    #[serde(rename = "--")]
    Decrement,
}

impl UpdateOperator {
    pub fn from_token(text: &str) -> Option<Self> {
        match text {
            "++" => Some(Self::Increment),
            "--" => Some(Self::Decrement),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Increment => "++",
            Self::Decrement => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOperator {
    #[serde(rename = "-")]
    Minus,
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "!")]
    Not,
    #[serde(rename = "~")]
    BitNot,
    #[serde(rename = "typeof")]
    Typeof,
    #[serde(rename = "void")]
    Void,
    #[serde(rename = "delete")]
    Delete,
}

impl UnaryOperator {
    pub fn from_token(text: &str) -> Option<Self> {
        match text {
            "-" => Some(Self::Minus),
            "+" => Some(Self::Plus),
            "!" => Some(Self::Not),
            "~" => Some(Self::BitNot),
            "typeof" => Some(Self::Typeof),
            "void" => Some(Self::Void),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minus => "-",
            Self::Plus => "+",
            Self::Not => "!",
            Self::BitNot => "~",
            Self::Typeof => "typeof",
            Self::Void => "void",
            Self::Delete => "delete",
        }
    }

    /// Keyword operators need a separating space before their operand.
    pub fn is_keyword(self) -> bool {
        matches!(self, Self::Typeof | Self::Void | Self::Delete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOperator {
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "===")]
    StrictEqual,
    #[serde(rename = "!==")]
    StrictNotEqual,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "<<")]
    LeftShift,
    #[serde(rename = ">>")]
    RightShift,
    #[serde(rename = ">>>")]
    UnsignedRightShift,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "**")]
    Exp,
    #[serde(rename = "|")]
    BitOr,
    #[serde(rename = "^")]
    BitXor,
    #[serde(rename = "&")]
    BitAnd,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "instanceof")]
    Instanceof,
}

impl BinaryOperator {
    pub fn from_token(text: &str) -> Option<Self> {
        match text {
            "==" => Some(Self::Equal),
            "!=" => Some(Self::NotEqual),
            "===" => Some(Self::StrictEqual),
            "!==" => Some(Self::StrictNotEqual),
            "<" => Some(Self::Less),
            "<=" => Some(Self::LessEqual),
            ">" => Some(Self::Greater),
            ">=" => Some(Self::GreaterEqual),
            "<<" => Some(Self::LeftShift),
            ">>" => Some(Self::RightShift),
            ">>>" => Some(Self::UnsignedRightShift),
            "+" => Some(Self::Add),
            "-" => Some(Self::Sub),
            "*" => Some(Self::Mul),
            "/" => Some(Self::Div),
            "%" => Some(Self::Mod),
            "**" => Some(Self::Exp),
            "|" => Some(Self::BitOr),
            "^" => Some(Self::BitXor),
            "&" => Some(Self::BitAnd),
            "in" => Some(Self::In),
            "instanceof" => Some(Self::Instanceof),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::StrictEqual => "===",
            Self::StrictNotEqual => "!==",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::LeftShift => "<<",
            Self::RightShift => ">>",
            Self::UnsignedRightShift => ">>>",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Exp => "**",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::BitAnd => "&",
            Self::In => "in",
            Self::Instanceof => "instanceof",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogicalOperator {
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
    #[serde(rename = "??")]
    NullishCoalescing,
}

impl LogicalOperator {
    pub fn from_token(text: &str) -> Option<Self> {
        match text {
            "&&" => Some(Self::And),
            "||" => Some(Self::Or),
            "??" => Some(Self::NullishCoalescing),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
            Self::NullishCoalescing => "??",
        }
    }
}
