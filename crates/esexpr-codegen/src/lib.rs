//! esexpr Code Generator
//!
//! Renders an [`Expression`] tree back to JavaScript source. Output uses one
//! canonical spacing and inserts only the parentheses needed for the text to
//! re-parse to the same tree.
//!
//! ```text
//! source → esexpr_parser::parse() → Expression → to_source() → source
//! ```

use esexpr_parser::ast::{
    BinaryOperator, ExprKind, Expression, LiteralValue, LogicalOperator, UnaryOperator,
};
use esexpr_parser::precedence::InfixOperator;
use esexpr_parser::SyntaxError;

/// Code generation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodegenError {
    /// The input of [`print`] did not parse.
    #[error(transparent)]
    Parse(#[from] SyntaxError),

    /// A hand-built tree that no source text could produce.
    #[error("Codegen error: {message}")]
    Malformed { message: String },
}

impl CodegenError {
    fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

// Binding levels for printing. Binary operators occupy `1 + precedence`.
const SEQUENCE: u8 = 0;
const CONDITIONAL: u8 = 1;
const UNARY: u8 = 15;
const POSTFIX: u8 = 16;
const CALL: u8 = 17;
const PRIMARY: u8 = 18;

/// Parse `source` and render it in canonical form.
pub fn print(source: &str) -> Result<String, CodegenError> {
    let expr = esexpr_parser::parse(source)?;
    to_source(&expr)
}

/// Render an expression tree as JavaScript source.
pub fn to_source(expr: &Expression) -> Result<String, CodegenError> {
    match &expr.kind {
        ExprKind::Literal { raw, value } => {
            if raw.is_empty() {
                literal_to_js(*value)
            } else {
                Ok(raw.clone())
            }
        }
        ExprKind::Identifier { name } => Ok(name.clone()),
        ExprKind::This => Ok("this".into()),
        ExprKind::Array { elements } => {
            let mut parts = Vec::with_capacity(elements.len());
            for element in elements {
                parts.push(match element {
                    Some(element) => operand(element, CONDITIONAL)?,
                    None => String::new(),
                });
            }
            // A trailing hole needs its own comma to survive re-parsing.
            if matches!(elements.last(), Some(None)) {
                parts.push(String::new());
            }
            Ok(format!("[{}]", parts.join(", ")))
        }
        ExprKind::Sequence { expressions } => {
            if expressions.len() < 2 {
                return Err(CodegenError::malformed(
                    "sequence needs at least two expressions",
                ));
            }
            Ok(operands(expressions, CONDITIONAL)?.join(", "))
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => Ok(format!(
            "{} ? {} : {}",
            operand(test, CONDITIONAL + 1)?,
            operand(consequent, CONDITIONAL)?,
            operand(alternate, CONDITIONAL)?,
        )),
        ExprKind::New { callee, arguments } => {
            let callee_js = if callee.is_chain() || has_call_in_spine(callee) {
                format!("({})", to_source(callee)?)
            } else {
                operand(callee, CALL)?
            };
            Ok(format!(
                "new {callee_js}({})",
                operands(arguments, CONDITIONAL)?.join(", ")
            ))
        }
        ExprKind::Call {
            callee,
            arguments,
            optional,
        } => Ok(format!(
            "{}{}({})",
            chain_link(callee)?,
            if *optional { "?." } else { "" },
            operands(arguments, CONDITIONAL)?.join(", ")
        )),
        ExprKind::Member {
            object,
            property,
            computed,
            optional,
        } => {
            let object_js = match &object.kind {
                ExprKind::Literal {
                    raw,
                    value: LiteralValue::Number(_),
                } if !*computed && raw.bytes().all(|b| b.is_ascii_digit()) => {
                    format!("({raw})")
                }
                _ => chain_link(object)?,
            };
            match (*computed, *optional) {
                (true, false) => Ok(format!("{object_js}[{}]", to_source(property)?)),
                (true, true) => Ok(format!("{object_js}?.[{}]", to_source(property)?)),
                (false, optional) => {
                    let ExprKind::Identifier { name } = &property.kind else {
                        return Err(CodegenError::malformed(
                            "non-computed property must be an identifier",
                        ));
                    };
                    let dot = if optional { "?." } else { "." };
                    Ok(format!("{object_js}{dot}{name}"))
                }
            }
        }
        ExprKind::Chain { expression } => {
            if expression.is_chain() {
                return Err(CodegenError::malformed("nested chain expression"));
            }
            to_source(expression)
        }
        ExprKind::Update {
            operator,
            prefix,
            argument,
        } => {
            if !argument.is_lvalue() {
                return Err(CodegenError::malformed(
                    "update target must be an identifier or member expression",
                ));
            }
            let argument_js = to_source(argument)?;
            if *prefix {
                Ok(format!("{}{argument_js}", operator.as_str()))
            } else {
                Ok(format!("{argument_js}{}", operator.as_str()))
            }
        }
        ExprKind::Unary {
            operator, argument, ..
        } => {
            let op_str = operator.as_str();
            let argument_js = operand(argument, UNARY)?;
            if operator.is_keyword() || merges_with(*operator, &argument_js) {
                Ok(format!("{op_str} {argument_js}"))
            } else {
                Ok(format!("{op_str}{argument_js}"))
            }
        }
        ExprKind::Binary {
            operator,
            left,
            right,
        } => infix_to_js(InfixOperator::Binary(*operator), left, right),
        ExprKind::Logical {
            operator,
            left,
            right,
        } => infix_to_js(InfixOperator::Logical(*operator), left, right),
    }
}

/// Format a number, removing `.0` for integers.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn literal_to_js(value: LiteralValue) -> Result<String, CodegenError> {
    match value {
        LiteralValue::Number(n) if !n.is_finite() || n.is_sign_negative() => Err(
            CodegenError::malformed(format!("number literal {n} has no source form")),
        ),
        LiteralValue::Number(n) => Ok(format_number(n)),
        LiteralValue::Boolean(b) => Ok(b.to_string()),
        LiteralValue::Null => Ok("null".into()),
    }
}

fn infix_to_js(
    operator: InfixOperator,
    left: &Expression,
    right: &Expression,
) -> Result<String, CodegenError> {
    let level = 1 + operator.precedence();
    let (left_min, right_min) = if operator.is_right_associative() {
        (level + 1, level)
    } else {
        (level, level + 1)
    };

    // `-a ** b` is a syntax error, so a unary base is always grouped.
    let left_js = if operator == InfixOperator::Binary(BinaryOperator::Exp)
        && matches!(left.kind, ExprKind::Unary { .. })
    {
        format!("({})", to_source(left)?)
    } else {
        infix_operand(operator, left, left_min)?
    };

    Ok(format!(
        "{left_js} {} {}",
        operator.as_str(),
        infix_operand(operator, right, right_min)?
    ))
}

/// Like [`operand`], but `??` next to `||`/`&&` is always grouped.
fn infix_operand(
    operator: InfixOperator,
    expr: &Expression,
    min: u8,
) -> Result<String, CodegenError> {
    let nullish = |op| op == LogicalOperator::NullishCoalescing;
    match (operator, &expr.kind) {
        (InfixOperator::Logical(outer), ExprKind::Logical { operator: inner, .. })
            if nullish(outer) != nullish(*inner) =>
        {
            Ok(format!("({})", to_source(expr)?))
        }
        _ => operand(expr, min),
    }
}

/// Render `expr`, parenthesized if it binds looser than `min`.
fn operand(expr: &Expression, min: u8) -> Result<String, CodegenError> {
    let js = to_source(expr)?;
    if level(expr) < min {
        Ok(format!("({js})"))
    } else {
        Ok(js)
    }
}

fn operands(exprs: &[Expression], min: u8) -> Result<Vec<String>, CodegenError> {
    exprs.iter().map(|e| operand(e, min)).collect()
}

/// The object or callee of a member/call link. A finished chain has to be
/// grouped or the link would join it.
fn chain_link(expr: &Expression) -> Result<String, CodegenError> {
    if expr.is_chain() {
        Ok(format!("({})", to_source(expr)?))
    } else {
        operand(expr, CALL)
    }
}

fn level(expr: &Expression) -> u8 {
    match &expr.kind {
        ExprKind::Sequence { .. } => SEQUENCE,
        ExprKind::Conditional { .. } => CONDITIONAL,
        ExprKind::Binary { operator, .. } => 1 + InfixOperator::Binary(*operator).precedence(),
        ExprKind::Logical { operator, .. } => 1 + InfixOperator::Logical(*operator).precedence(),
        ExprKind::Unary { .. } | ExprKind::Update { prefix: true, .. } => UNARY,
        ExprKind::Update { prefix: false, .. } => POSTFIX,
        ExprKind::New { .. }
        | ExprKind::Call { .. }
        | ExprKind::Member { .. }
        | ExprKind::Chain { .. } => CALL,
        ExprKind::Literal { .. }
        | ExprKind::Identifier { .. }
        | ExprKind::This
        | ExprKind::Array { .. } => PRIMARY,
    }
}

/// Whether a call sits on the object path of `expr`; `new f().x` would take
/// the call's arguments as its own.
fn has_call_in_spine(expr: &Expression) -> bool {
    match &expr.kind {
        ExprKind::Call { .. } => true,
        ExprKind::Member { object, .. } => has_call_in_spine(object),
        _ => false,
    }
}

/// `-` before `-x` or `--x` must not fuse into `--`.
fn merges_with(operator: UnaryOperator, argument_js: &str) -> bool {
    match operator {
        UnaryOperator::Minus => argument_js.starts_with('-'),
        UnaryOperator::Plus => argument_js.starts_with('+'),
        _ => false,
    }
}
