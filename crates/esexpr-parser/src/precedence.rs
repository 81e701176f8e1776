//! Binding powers for binary and logical operators.
//!
//! Higher numbers bind tighter. The parser climbs from `prec::LOWEST`; a
//! left-associative operator parses its right operand one level above its own
//! precedence, a right-associative one (`**`) at the same level.

use crate::ast::{BinaryOperator, ExprKind, Expression, LogicalOperator, Span};

pub mod prec {
    pub const LOWEST: u8 = 1;
    pub const NULLISH: u8 = 1;
    pub const LOGICAL_OR: u8 = 2;
    pub const LOGICAL_AND: u8 = 3;
    pub const BITWISE_OR: u8 = 4;
    pub const BITWISE_XOR: u8 = 5;
    pub const BITWISE_AND: u8 = 6;
    pub const EQUALITY: u8 = 7;
    pub const RELATIONAL: u8 = 8;
    pub const SHIFT: u8 = 9;
    pub const ADDITIVE: u8 = 10;
    pub const MULTIPLICATIVE: u8 = 11;
    pub const EXPONENT: u8 = 12;
    /// Unary operands bind tighter than any infix operator.
    pub const UNARY: u8 = 13;
}

/// An operator that combines a left and a right operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOperator {
    Binary(BinaryOperator),
    Logical(LogicalOperator),
}

impl InfixOperator {
    pub fn from_token(text: &str) -> Option<Self> {
        LogicalOperator::from_token(text)
            .map(Self::Logical)
            .or_else(|| BinaryOperator::from_token(text).map(Self::Binary))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binary(op) => op.as_str(),
            Self::Logical(op) => op.as_str(),
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            Self::Logical(LogicalOperator::NullishCoalescing) => prec::NULLISH,
            Self::Logical(LogicalOperator::Or) => prec::LOGICAL_OR,
            Self::Logical(LogicalOperator::And) => prec::LOGICAL_AND,
            Self::Binary(op) => match op {
                BinaryOperator::BitOr => prec::BITWISE_OR,
                BinaryOperator::BitXor => prec::BITWISE_XOR,
                BinaryOperator::BitAnd => prec::BITWISE_AND,
                BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::StrictEqual
                | BinaryOperator::StrictNotEqual => prec::EQUALITY,
                BinaryOperator::Less
                | BinaryOperator::LessEqual
                | BinaryOperator::Greater
                | BinaryOperator::GreaterEqual
                | BinaryOperator::In
                | BinaryOperator::Instanceof => prec::RELATIONAL,
                BinaryOperator::LeftShift
                | BinaryOperator::RightShift
                | BinaryOperator::UnsignedRightShift => prec::SHIFT,
                BinaryOperator::Add | BinaryOperator::Sub => prec::ADDITIVE,
                BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Mod => {
                    prec::MULTIPLICATIVE
                }
                BinaryOperator::Exp => prec::EXPONENT,
            },
        }
    }

    pub fn is_right_associative(self) -> bool {
        self == Self::Binary(BinaryOperator::Exp)
    }

    /// Minimum precedence for the right-hand operand.
    pub fn right_precedence(self) -> u8 {
        if self.is_right_associative() {
            self.precedence()
        } else {
            self.precedence() + 1
        }
    }

    /// Whether `op=` is a compound assignment, which must not be read as `op`.
    pub fn has_assignment_form(self) -> bool {
        match self {
            Self::Logical(_) => true,
            Self::Binary(op) => !matches!(
                op,
                BinaryOperator::Equal
                    | BinaryOperator::NotEqual
                    | BinaryOperator::StrictEqual
                    | BinaryOperator::StrictNotEqual
                    | BinaryOperator::Less
                    | BinaryOperator::LessEqual
                    | BinaryOperator::Greater
                    | BinaryOperator::GreaterEqual
                    | BinaryOperator::In
                    | BinaryOperator::Instanceof
            ),
        }
    }

    /// Combine two operands into a `BinaryExpression` or `LogicalExpression`.
    pub fn build(self, left: Expression, right: Expression) -> Expression {
        let span = Span::new(left.span.start, right.span.end);
        let (left, right) = (Box::new(left), Box::new(right));
        let kind = match self {
            Self::Binary(operator) => ExprKind::Binary {
                operator,
                left,
                right,
            },
            Self::Logical(operator) => ExprKind::Logical {
                operator,
                left,
                right,
            },
        };
        Expression::new(kind, span)
    }
}
