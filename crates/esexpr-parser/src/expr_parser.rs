//! Expression parser.
//!
//! Recursive descent directly over a [`Cursor`]; there is no separate token
//! stream. Every production returns `Ok(None)` when nothing at the current
//! position starts its form, so the caller can try the next alternative, and
//! `Err` to abort the whole parse.
//!
//! ```text
//! sequence    := expression ("," expression)*
//! expression  := binary ("?" expression ":" expression)?
//! binary      := unary (infix-operator binary)*
//! unary       := unary-operator unary | token
//! token       := primary (member | call)* update?
//! primary     := "(" sequence ")" | update-operator token | identifier
//!              | number | "[" elements "]"
//! ```

use std::sync::LazyLock;

use esexpr_cursor::{Cursor, Pattern, SyntaxError};
use regex::Regex;

use crate::ast::{
    BinaryOperator, ExprKind, Expression, LiteralValue, LogicalOperator, Span, UnaryOperator,
    UpdateOperator,
};
use crate::precedence::{prec, InfixOperator};
use crate::ParseOptions;

pub type ParseResult<T> = Result<T, SyntaxError>;

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("static pattern compiles")
}

static UPDATE_OPERATOR: LazyLock<Regex> = LazyLock::new(|| pattern(r"^(?:\+\+|--)"));
static MEMBER_OPERATOR: LazyLock<Regex> = LazyLock::new(|| pattern(r"^(?:\?\.\[|\?\.|\.|\[)"));
// `a?.5:b` is a conditional, not an optional member access.
static OPTIONAL_BEFORE_DIGIT: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\?\.[0-9]"));
static NUMBER_START: LazyLock<Regex> = LazyLock::new(|| pattern(r"^(?:[0-9]|\.[0-9])"));
static EXPONENT_MARKER: LazyLock<Regex> = LazyLock::new(|| pattern(r"^[eE]"));
static EXPONENT_SIGN: LazyLock<Regex> = LazyLock::new(|| pattern(r"^[+-]"));
static UNARY_OPERATOR: LazyLock<Regex> = LazyLock::new(|| pattern(r"^[!~+\-]"));
static INFIX_OPERATOR: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"^(?:>>>|===|!==|\*\*|<<|>>|<=|>=|==|!=|&&|\|\||\?\?|[<>+\-*/%&|^])")
});

/// A member/call run under construction.
///
/// Optional links only set `optional`; the single `ChainExpression` wrapper
/// is added by [`Chain::finish`] once the run can no longer grow, so a chain
/// is never wrapped around another chain from the same run.
struct Chain {
    node: Expression,
    optional: bool,
}

impl Chain {
    fn new(node: Expression) -> Self {
        Self {
            node,
            optional: false,
        }
    }

    fn finish(self) -> Expression {
        if !self.optional {
            return self.node;
        }
        let span = self.node.span;
        Expression::new(
            ExprKind::Chain {
                expression: Box::new(self.node),
            },
            span,
        )
    }
}

/// Precedence-climbing result: the tree plus the logical operator at its
/// root, unless that root came from a parenthesized group.
struct Climbed {
    expr: Expression,
    bare_logical: Option<LogicalOperator>,
}

/// `??` may not share an unparenthesized operand with `||` or `&&`.
fn mixes_nullish(operator: LogicalOperator, operand: Option<LogicalOperator>) -> bool {
    let nullish = |op| op == LogicalOperator::NullishCoalescing;
    operand.is_some_and(|other| nullish(operator) != nullish(other))
}

/// Recursive-descent expression parser.
///
/// Owns the only scan position for one parse; construct a new parser per
/// source.
pub struct ExprParser<'a> {
    cursor: Cursor<'a>,
    depth: usize,
    max_depth: usize,
}

impl<'a> ExprParser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::with_options(source, &ParseOptions::default())
    }

    pub fn with_options(source: &'a str, options: &ParseOptions) -> Self {
        Self {
            cursor: Cursor::new(source),
            depth: 0,
            max_depth: options.max_depth,
        }
    }

    /// Parse a complete expression from a source string.
    pub fn parse(source: &str) -> ParseResult<Expression> {
        Self::parse_with(source, &ParseOptions::default())
    }

    /// Parse a complete expression, enforcing `options`.
    pub fn parse_with(source: &str, options: &ParseOptions) -> ParseResult<Expression> {
        if let Some(max) = options.max_source_len {
            if source.len() > max {
                return Err(SyntaxError::at(
                    source,
                    max,
                    format!("source exceeds maximum length of {max} bytes"),
                ));
            }
        }

        tracing::debug!(len = source.len(), max_depth = options.max_depth, "parsing expression");
        let result = ExprParser::with_options(source, options).parse_program();
        match &result {
            Ok(expr) => tracing::debug!(node = expr.node_type(), "parsed expression"),
            Err(err) => tracing::debug!(offset = err.offset, message = %err.message, "parse failed"),
        }
        result
    }

    /// Parse the whole buffer as an ungrouped sequence.
    pub fn parse_program(&mut self) -> ParseResult<Expression> {
        let node = self.parse_expression_sequence(false)?;
        self.cursor.skip_whitespace(true);

        match (node, self.cursor.peek_char()) {
            (Some(node), None) => Ok(node),
            (None, None) => Err(self.cursor.fail("expected expression")),
            (_, Some(c)) => Err(self.cursor.fail(format!("unexpected character '{c}'"))),
        }
    }

    /// Run `production` one nesting level deeper. Every production that can
    /// re-enter the grammar goes through here.
    fn nested<T>(
        &mut self,
        production: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        if self.depth >= self.max_depth {
            return Err(self.cursor.fail("expression nested too deeply"));
        }
        self.depth += 1;
        let result = production(self);
        self.depth -= 1;
        result
    }

    // =========================================================================
    // Sequence, conditional, binary, unary
    // =========================================================================

    /// Comma-separated expressions. With `in_group` the sequence must be
    /// wrapped in parentheses and non-empty.
    fn parse_expression_sequence(&mut self, in_group: bool) -> ParseResult<Option<Expression>> {
        self.cursor.skip_whitespace(true);
        let start = self.cursor.position();

        if in_group {
            self.cursor.expect('(', "open paren")?;
        }

        let mut nodes = Vec::new();

        loop {
            match self.parse_expression()? {
                Some(node) => nodes.push(node),
                None if !nodes.is_empty() => {
                    return Err(self.cursor.fail("expected expression after comma"));
                }
                None => {}
            }

            self.cursor.skip_whitespace(true);
            let comma = self.cursor.position();
            if self.cursor.eat(',').is_some() {
                if nodes.is_empty() {
                    return Err(self.cursor.error_at(comma, "expected expression before comma"));
                }
                continue;
            }

            break;
        }

        if in_group {
            self.cursor.expect(')', "paren close")?;

            if nodes.is_empty() {
                return Err(self.cursor.error_at(start, "expected expression within paren"));
            }
        }

        if nodes.len() < 2 {
            return Ok(nodes.pop());
        }

        let span = if in_group {
            Span::new(start, self.cursor.position())
        } else {
            Span::new(nodes[0].span.start, nodes[nodes.len() - 1].span.end)
        };

        Ok(Some(Expression::new(
            ExprKind::Sequence { expressions: nodes },
            span,
        )))
    }

    /// One binary-precedence expression, optionally the test of a ternary.
    fn parse_expression(&mut self) -> ParseResult<Option<Expression>> {
        self.nested(Self::parse_conditional_expression)
    }

    fn parse_conditional_expression(&mut self) -> ParseResult<Option<Expression>> {
        let test = self.parse_binary_expression(prec::LOWEST)?;

        self.cursor.skip_whitespace(true);
        let question = self.cursor.position();
        if self.cursor.eat('?').is_none() {
            return Ok(test);
        }

        let test = test.ok_or_else(|| self.cursor.error_at(question, "expected test expression"))?;

        let consequent = self
            .parse_expression()?
            .ok_or_else(|| self.cursor.fail("expected consequent expression"))?;

        self.cursor.skip_whitespace(true);
        self.cursor.expect(':', "colon")?;

        let alternate = self
            .parse_expression()?
            .ok_or_else(|| self.cursor.fail("expected alternate expression"))?;

        let span = Span::new(test.span.start, alternate.span.end);
        Ok(Some(Expression::new(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        )))
    }

    /// Precedence climbing over binary and logical operators.
    fn parse_binary_expression(&mut self, min_precedence: u8) -> ParseResult<Option<Expression>> {
        Ok(self
            .parse_binary_operands(min_precedence)?
            .map(|climbed| climbed.expr))
    }

    fn parse_binary_operands(&mut self, min_precedence: u8) -> ParseResult<Option<Climbed>> {
        self.nested(|parser| parser.climb_binary_operators(min_precedence))
    }

    fn climb_binary_operators(&mut self, min_precedence: u8) -> ParseResult<Option<Climbed>> {
        self.cursor.skip_whitespace(true);
        let mut bare_unary = self.peek_unary_operator().is_some();

        let Some(mut left) = self.parse_unary_expression()? else {
            return Ok(None);
        };
        let mut bare_logical = None;

        loop {
            self.cursor.skip_whitespace(true);
            let Some((operator, text)) = self.peek_infix_operator() else {
                break;
            };
            if operator.precedence() < min_precedence {
                break;
            }
            if bare_unary && operator == InfixOperator::Binary(BinaryOperator::Exp) {
                return Err(self.cursor.error_at(
                    left.span.start,
                    "unary operator before exponentiation requires parentheses",
                ));
            }

            let operator_start = self.cursor.position();
            self.cursor.eat(text);

            let right = self
                .parse_binary_operands(operator.right_precedence())?
                .ok_or_else(|| self.cursor.fail("expected right hand expression"))?;

            if let InfixOperator::Logical(logical) = operator {
                if mixes_nullish(logical, bare_logical) || mixes_nullish(logical, right.bare_logical)
                {
                    return Err(self.cursor.error_at(
                        operator_start,
                        "cannot mix ?? with || or && without parentheses",
                    ));
                }
            }

            bare_logical = match operator {
                InfixOperator::Logical(logical) => Some(logical),
                InfixOperator::Binary(_) => None,
            };
            left = operator.build(left, right.expr);
            bare_unary = false;
        }

        Ok(Some(Climbed {
            expr: left,
            bare_logical,
        }))
    }

    fn parse_unary_expression(&mut self) -> ParseResult<Option<Expression>> {
        self.nested(Self::parse_prefix_operators)
    }

    fn parse_prefix_operators(&mut self) -> ParseResult<Option<Expression>> {
        self.cursor.skip_whitespace(true);
        let Some((operator, text)) = self.peek_unary_operator() else {
            return self.parse_token();
        };

        let start = self.cursor.position();
        self.cursor.eat(text);

        let argument = self
            .parse_unary_expression()?
            .ok_or_else(|| self.cursor.fail("expected unary operand"))?;

        let span = Span::new(start, argument.span.end);
        Ok(Some(Expression::new(
            ExprKind::Unary {
                operator,
                prefix: true,
                argument: Box::new(argument),
            },
            span,
        )))
    }

    // =========================================================================
    // Primary and postfix
    // =========================================================================

    /// One primary expression followed by its member/call run and an optional
    /// postfix update.
    fn parse_token(&mut self) -> ParseResult<Option<Expression>> {
        self.cursor.skip_whitespace(true);

        let Some(primary) = self.parse_primary()? else {
            return Ok(None);
        };

        let mut chain = Chain::new(primary);
        loop {
            let mark = self.cursor.clone();
            self.cursor.skip_whitespace(true);

            if let Some(operator) = self.eat_member_operator() {
                chain = self.parse_member_expression(chain, operator)?;
            } else if self.cursor.eat('(').is_some() {
                chain = self.parse_call_expression(chain, false)?;
            } else {
                self.cursor = mark;
                break;
            }
        }
        let node = chain.finish();

        // A line break before `++`/`--` ends the operand.
        self.cursor.skip_whitespace(false);
        match self.eat_update_operator() {
            Some(operator) => self.parse_postfix_update_expression(node, operator).map(Some),
            None => Ok(Some(node)),
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Option<Expression>> {
        self.nested(Self::parse_primary_expression)
    }

    fn parse_primary_expression(&mut self) -> ParseResult<Option<Expression>> {
        let start = self.cursor.position();

        if self.cursor.matches('(') {
            return self.parse_expression_sequence(true);
        }
        if let Some(operator) = self.eat_update_operator() {
            return self.parse_prefix_update_expression(operator, start).map(Some);
        }
        if let Some(name) = self.cursor.eat_identifier() {
            return self.parse_identifier(name, start, false).map(Some);
        }
        if self.cursor.matches(&*NUMBER_START) {
            return self.parse_number_literal().map(Some);
        }
        if self.cursor.eat('[').is_some() {
            return self.parse_array_expression(start).map(Some);
        }

        Ok(None)
    }

    /// Member accesses starting with an already consumed `operator`.
    ///
    /// `.` or `?.` directly followed by `(` hands over to call parsing.
    fn parse_member_expression(&mut self, chain: Chain, operator: &'a str) -> ParseResult<Chain> {
        tracing::trace!(offset = chain.node.span.start, operator, "member expression");

        let Chain {
            node: mut object,
            optional: mut in_chain,
        } = chain;
        let mut operator = operator;

        loop {
            let optional = operator.starts_with('?');
            let computed = operator.ends_with('[');
            in_chain |= optional;

            let (property, end) = if computed {
                let property = self
                    .parse_expression_sequence(false)?
                    .ok_or_else(|| self.cursor.fail("expected computed property"))?;
                self.cursor.skip_whitespace(true);
                self.cursor.expect(']', "computed close")?;
                (property, self.cursor.position())
            } else {
                self.cursor.skip_whitespace(true);
                if self.cursor.eat('(').is_some() {
                    let chain = Chain {
                        node: object,
                        optional: in_chain,
                    };
                    return self.parse_call_expression(chain, optional);
                }
                let property = self.parse_property_name()?;
                let end = property.span.end;
                (property, end)
            };

            let span = Span::new(object.span.start, end);
            object = Expression::new(
                ExprKind::Member {
                    object: Box::new(object),
                    property: Box::new(property),
                    computed,
                    optional,
                },
                span,
            );

            let mark = self.cursor.clone();
            self.cursor.skip_whitespace(true);
            match self.eat_member_operator() {
                Some(next) => operator = next,
                None => {
                    self.cursor = mark;
                    break;
                }
            }
        }

        Ok(Chain {
            node: object,
            optional: in_chain,
        })
    }

    /// Arguments after an already consumed `(`, then at most one directly
    /// following member access.
    fn parse_call_expression(&mut self, chain: Chain, optional: bool) -> ParseResult<Chain> {
        tracing::trace!(offset = chain.node.span.start, optional, "call expression");

        let Chain {
            node: callee,
            optional: in_chain,
        } = chain;

        let arguments = self.parse_arguments()?;
        let span = Span::new(callee.span.start, self.cursor.position());
        let call = Expression::new(
            ExprKind::Call {
                callee: Box::new(callee),
                arguments,
                optional,
            },
            span,
        );
        let chain = Chain {
            node: call,
            optional: in_chain || optional,
        };

        let mark = self.cursor.clone();
        self.cursor.skip_whitespace(true);
        match self.eat_member_operator() {
            Some(operator) => self.parse_member_expression(chain, operator),
            None => {
                self.cursor = mark;
                Ok(chain)
            }
        }
    }

    /// Comma-separated arguments up to and including `)`. A trailing comma is
    /// allowed; an empty slot anywhere else is not.
    fn parse_arguments(&mut self) -> ParseResult<Vec<Expression>> {
        let mut arguments = Vec::new();

        loop {
            let element = self.parse_expression()?;

            self.cursor.skip_whitespace(true);
            let comma = self.cursor.position();
            if self.cursor.eat(',').is_some() {
                match element {
                    Some(element) => arguments.push(element),
                    None => {
                        return Err(self.cursor.error_at(comma, "expected element before comma"));
                    }
                }
                continue;
            }

            arguments.extend(element);
            break;
        }

        self.cursor.expect(')', "call close")?;
        Ok(arguments)
    }

    /// `new` callee: a primary with member accesses, then an optional
    /// argument list. Postfix operators after that belong to the caller.
    fn parse_new_expression(&mut self, start: usize) -> ParseResult<Expression> {
        tracing::trace!(offset = start, "new expression");

        self.cursor.skip_whitespace(true);
        let callee = self
            .parse_primary()?
            .ok_or_else(|| self.cursor.fail("expected callee"))?;

        let mut chain = Chain::new(callee);
        let mut arguments = Vec::new();
        let mut end = None;

        loop {
            let mark = self.cursor.clone();
            self.cursor.skip_whitespace(true);

            if let Some(operator) = self.eat_member_operator() {
                chain = self.parse_member_expression(chain, operator)?;
            } else if self.cursor.eat('(').is_some() {
                arguments = self.parse_arguments()?;
                end = Some(self.cursor.position());
                break;
            } else {
                self.cursor = mark;
                break;
            }
        }

        if chain.optional || chain.node.is_chain() {
            return Err(self
                .cursor
                .error_at(start, "chain expression not allowed in new expression"));
        }

        let callee = chain.node;
        let span = Span::new(start, end.unwrap_or(callee.span.end));
        Ok(Expression::new(
            ExprKind::New {
                callee: Box::new(callee),
                arguments,
            },
            span,
        ))
    }

    fn parse_prefix_update_expression(
        &mut self,
        operator: UpdateOperator,
        start: usize,
    ) -> ParseResult<Expression> {
        let argument = self
            .parse_token()?
            .ok_or_else(|| self.cursor.fail("expected identifier or member expression"))?;

        if !argument.is_lvalue() {
            return Err(self
                .cursor
                .error_at(argument.span.start, "expected identifier or member expression"));
        }

        let span = Span::new(start, argument.span.end);
        Ok(Expression::new(
            ExprKind::Update {
                operator,
                prefix: true,
                argument: Box::new(argument),
            },
            span,
        ))
    }

    fn parse_postfix_update_expression(
        &self,
        argument: Expression,
        operator: UpdateOperator,
    ) -> ParseResult<Expression> {
        if !argument.is_lvalue() {
            return Err(self
                .cursor
                .error_at(argument.span.start, "expected identifier or member expression"));
        }

        let span = Span::new(argument.span.start, self.cursor.position());
        Ok(Expression::new(
            ExprKind::Update {
                operator,
                prefix: false,
                argument: Box::new(argument),
            },
            span,
        ))
    }

    /// Elements after an already consumed `[`. Absent elements are holes; a
    /// single trailing hole is dropped.
    fn parse_array_expression(&mut self, start: usize) -> ParseResult<Expression> {
        let mut elements = Vec::new();

        loop {
            elements.push(self.parse_expression()?);

            self.cursor.skip_whitespace(true);
            if self.cursor.eat(',').is_none() {
                break;
            }
        }

        if matches!(elements.last(), Some(None)) {
            elements.pop();
        }

        self.cursor.expect(']', "array close")?;

        Ok(Expression::new(
            ExprKind::Array { elements },
            Span::new(start, self.cursor.position()),
        ))
    }

    // =========================================================================
    // Leaves
    // =========================================================================

    fn parse_number_literal(&mut self) -> ParseResult<Expression> {
        let start = self.cursor.position();

        self.cursor.eat_while(|c| c.is_ascii_digit());
        if self.cursor.eat('.').is_some() {
            self.cursor.eat_while(|c| c.is_ascii_digit());
        }

        if self.cursor.eat(&*EXPONENT_MARKER).is_some() {
            self.cursor.eat(&*EXPONENT_SIGN);
            if self.cursor.eat_while(|c| c.is_ascii_digit()).is_none() {
                return Err(self.cursor.fail("expected exponent value"));
            }
        }

        let raw = &self.cursor.source()[start..self.cursor.position()];
        let value: f64 = raw
            .parse()
            .map_err(|_| self.cursor.error_at(start, format!("invalid number '{raw}'")))?;

        Ok(Expression::new(
            ExprKind::Literal {
                raw: raw.to_string(),
                value: LiteralValue::Number(value),
            },
            Span::new(start, self.cursor.position()),
        ))
    }

    /// An already consumed identifier name. Unless `ignore_keywords` is set,
    /// `new`, `this`, `true`, `false` and `null` get their own nodes.
    fn parse_identifier(
        &mut self,
        name: &'a str,
        start: usize,
        ignore_keywords: bool,
    ) -> ParseResult<Expression> {
        let span = Span::new(start, start + name.len());

        if !ignore_keywords {
            let literal = |value| ExprKind::Literal {
                raw: name.to_string(),
                value,
            };
            match name {
                "new" => return self.parse_new_expression(start),
                "this" => return Ok(Expression::new(ExprKind::This, span)),
                "true" => return Ok(Expression::new(literal(LiteralValue::Boolean(true)), span)),
                "false" => return Ok(Expression::new(literal(LiteralValue::Boolean(false)), span)),
                "null" => return Ok(Expression::new(literal(LiteralValue::Null), span)),
                _ => {}
            }
        }

        Ok(Expression::new(
            ExprKind::Identifier {
                name: name.to_string(),
            },
            span,
        ))
    }

    fn parse_property_name(&mut self) -> ParseResult<Expression> {
        let start = self.cursor.position();
        let name = self
            .cursor
            .eat_identifier()
            .ok_or_else(|| self.cursor.fail("expected identifier"))?;
        self.parse_identifier(name, start, true)
    }

    // =========================================================================
    // Operator lookahead
    // =========================================================================

    fn eat_update_operator(&mut self) -> Option<UpdateOperator> {
        self.cursor
            .eat(&*UPDATE_OPERATOR)
            .and_then(UpdateOperator::from_token)
    }

    fn eat_member_operator(&mut self) -> Option<&'a str> {
        if self.cursor.matches(&*OPTIONAL_BEFORE_DIGIT) {
            return None;
        }
        self.cursor.eat(&*MEMBER_OPERATOR)
    }

    fn peek_unary_operator(&self) -> Option<(UnaryOperator, &'a str)> {
        if self.cursor.matches(&*UPDATE_OPERATOR) {
            return None;
        }
        let rest = self.cursor.rest();
        let text = match self.cursor.peek_word() {
            Some(word) => word,
            None => &rest[..UNARY_OPERATOR.match_len(rest)?],
        };
        UnaryOperator::from_token(text).map(|operator| (operator, text))
    }

    fn peek_infix_operator(&self) -> Option<(InfixOperator, &'a str)> {
        let rest = self.cursor.rest();
        let text = match self.cursor.peek_word() {
            Some(word) => word,
            None => &rest[..INFIX_OPERATOR.match_len(rest)?],
        };
        let operator = InfixOperator::from_token(text)?;

        let next = rest[text.len()..].chars().next();
        let compound = next == Some('=') && operator.has_assignment_form();
        let doubled = matches!((text, next), ("+", Some('+')) | ("-", Some('-')));

        (!compound && !doubled).then_some((operator, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Expression {
        ExprParser::parse(source).unwrap_or_else(|e| panic!("{source:?}: {e}"))
    }

    fn parse_err(source: &str) -> SyntaxError {
        match ExprParser::parse(source) {
            Ok(expr) => panic!("{source:?} should fail, got {expr:?}"),
            Err(e) => e,
        }
    }

    /// Compact rendering of a tree's shape.
    fn shape(expr: &Expression) -> String {
        fn join(items: &[Expression]) -> String {
            items.iter().map(shape).collect::<Vec<_>>().join(" ")
        }
        fn flag(set: bool) -> &'static str {
            if set {
                "?"
            } else {
                ""
            }
        }

        match &expr.kind {
            ExprKind::Literal { raw, .. } => raw.clone(),
            ExprKind::Identifier { name } => name.clone(),
            ExprKind::This => "this".into(),
            ExprKind::Array { elements } => {
                let parts: Vec<String> = elements
                    .iter()
                    .map(|e| e.as_ref().map_or_else(|| "_".to_string(), shape))
                    .collect();
                format!("[{}]", parts.join(" "))
            }
            ExprKind::Sequence { expressions } => format!("(seq {})", join(expressions)),
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => format!(
                "(? {} {} {})",
                shape(test),
                shape(consequent),
                shape(alternate)
            ),
            ExprKind::New { callee, arguments } => {
                format!("(new {} [{}])", shape(callee), join(arguments))
            }
            ExprKind::Call {
                callee,
                arguments,
                optional,
            } => format!(
                "(call{} {} [{}])",
                flag(*optional),
                shape(callee),
                join(arguments)
            ),
            ExprKind::Member {
                object,
                property,
                computed,
                optional,
            } => format!(
                "({}{} {} {})",
                if *computed { "index" } else { "get" },
                flag(*optional),
                shape(object),
                shape(property)
            ),
            ExprKind::Chain { expression } => format!("(chain {})", shape(expression)),
            ExprKind::Update {
                operator,
                prefix: true,
                argument,
            } => format!("({} {})", operator.as_str(), shape(argument)),
            ExprKind::Update {
                operator,
                prefix: false,
                argument,
            } => format!("({} {})", shape(argument), operator.as_str()),
            ExprKind::Unary {
                operator, argument, ..
            } => format!("({} {})", operator.as_str(), shape(argument)),
            ExprKind::Binary {
                operator,
                left,
                right,
            } => format!("({} {} {})", operator.as_str(), shape(left), shape(right)),
            ExprKind::Logical {
                operator,
                left,
                right,
            } => format!("({} {} {})", operator.as_str(), shape(left), shape(right)),
        }
    }

    fn shape_of(source: &str) -> String {
        shape(&parse(source))
    }

    fn span_of(source: &str) -> (usize, usize) {
        let expr = parse(source);
        (expr.span.start, expr.span.end)
    }

    fn assert_nested(expr: &Expression) {
        assert!(expr.span.start <= expr.span.end, "inverted span on {expr:?}");
        for child in expr.children() {
            assert!(
                expr.span.contains(child.span),
                "{} {:?} does not contain {} {:?}",
                expr.node_type(),
                expr.span,
                child.node_type(),
                child.span
            );
            assert_nested(child);
        }
    }

    fn assert_no_nested_chain(expr: &Expression) {
        if let ExprKind::Chain { expression } = &expr.kind {
            assert!(!expression.is_chain(), "chain directly inside chain: {expr:?}");
        }
        for child in expr.children() {
            assert_no_nested_chain(child);
        }
    }

    // =========================================================================
    // Literals and identifiers
    // =========================================================================

    #[test]
    fn test_integer_literal() {
        let expr = parse("42");
        assert_eq!(
            expr.kind,
            ExprKind::Literal {
                raw: "42".into(),
                value: LiteralValue::Number(42.0),
            }
        );
        assert_eq!(expr.span, Span::new(0, 2));
    }

    #[test]
    fn test_number_forms_keep_raw_text() {
        for (source, value) in [
            ("3.25", 3.25),
            (".5", 0.5),
            ("1.", 1.0),
            ("1e3", 1000.0),
            ("1E-3", 0.001),
            ("2.5e+2", 250.0),
        ] {
            let expr = parse(source);
            assert_eq!(
                expr.kind,
                ExprKind::Literal {
                    raw: source.into(),
                    value: LiteralValue::Number(value),
                },
                "{source}"
            );
        }
    }

    #[test]
    fn test_number_raw_reparses_to_same_value() {
        for source in ["0", "007", "12.50", ".125", "6.02e23", "1e-7"] {
            let ExprKind::Literal { raw, value } = parse(source).kind else {
                panic!("{source} is not a literal");
            };
            let ExprKind::Literal { value: again, .. } = parse(&raw).kind else {
                panic!("{raw} is not a literal");
            };
            assert_eq!(value, again);
        }
    }

    #[test]
    fn test_missing_exponent_digits() {
        assert_eq!(parse_err("1e").message, "expected exponent value");
        assert_eq!(parse_err("1e+").message, "expected exponent value");
    }

    #[test]
    fn test_number_then_member() {
        assert_eq!(shape_of("1..toString"), "(get 1. toString)");
        assert_eq!(shape_of("1.5.x"), "(get 1.5 x)");
    }

    #[test]
    fn test_identifier() {
        let expr = parse("count");
        assert_eq!(
            expr.kind,
            ExprKind::Identifier {
                name: "count".into()
            }
        );
        assert_eq!(expr.span, Span::new(0, 5));
    }

    #[test]
    fn test_identifier_with_dollar_and_underscore() {
        assert_eq!(shape_of("$el._private"), "(get $el _private)");
    }

    #[test]
    fn test_keyword_leaves() {
        assert_eq!(parse("this").kind, ExprKind::This);
        assert_eq!(
            parse("true").kind,
            ExprKind::Literal {
                raw: "true".into(),
                value: LiteralValue::Boolean(true),
            }
        );
        assert_eq!(
            parse("false").kind,
            ExprKind::Literal {
                raw: "false".into(),
                value: LiteralValue::Boolean(false),
            }
        );
        assert_eq!(
            parse("null").kind,
            ExprKind::Literal {
                raw: "null".into(),
                value: LiteralValue::Null,
            }
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(parse("nullable").node_type(), "Identifier");
        assert_eq!(parse("newer").node_type(), "Identifier");
    }

    #[test]
    fn test_property_names_are_never_keywords() {
        assert_eq!(shape_of("a.new.this.null"), "(get (get (get a new) this) null)");
        let ExprKind::Member { property, .. } = parse("a.true").kind else {
            panic!("expected member");
        };
        assert_eq!(property.node_type(), "Identifier");
    }

    // =========================================================================
    // Arrays
    // =========================================================================

    #[test]
    fn test_array_literal() {
        let expr = parse("[1,2,3]");
        let ExprKind::Array { elements } = &expr.kind else {
            panic!("expected array, got {expr:?}");
        };
        let values: Vec<LiteralValue> = elements
            .iter()
            .map(|e| match &e.as_ref().unwrap().kind {
                ExprKind::Literal { value, .. } => *value,
                other => panic!("expected literal, got {other:?}"),
            })
            .collect();
        assert_eq!(
            values,
            vec![
                LiteralValue::Number(1.0),
                LiteralValue::Number(2.0),
                LiteralValue::Number(3.0),
            ]
        );
        assert_eq!(expr.span, Span::new(0, 7));
    }

    #[test]
    fn test_array_hole() {
        assert_eq!(shape_of("[1,,3]"), "[1 _ 3]");
    }

    #[test]
    fn test_array_trailing_comma_drops_one_hole() {
        assert_eq!(shape_of("[1,2,]"), "[1 2]");
        assert_eq!(shape_of("[1,2,,]"), "[1 2 _]");
        assert_eq!(shape_of("[,]"), "[_]");
        assert_eq!(shape_of("[]"), "[]");
    }

    #[test]
    fn test_nested_array() {
        assert_eq!(shape_of("[a, b + 1, [c]]"), "[a (+ b 1) [c]]");
    }

    #[test]
    fn test_unterminated_array() {
        assert_eq!(parse_err("[1, 2").message, "expected array close");
    }

    // =========================================================================
    // Members, calls and optional chains
    // =========================================================================

    #[test]
    fn test_member_access() {
        assert_eq!(shape_of("a.b[c]"), "(index (get a b) c)");
    }

    #[test]
    fn test_member_span_ends_at_property() {
        assert_eq!(span_of("a.b"), (0, 3));
        assert_eq!(span_of("a[b]"), (0, 4));
    }

    #[test]
    fn test_computed_sequence_property() {
        assert_eq!(shape_of("a[b, c]"), "(index a (seq b c))");
    }

    #[test]
    fn test_member_errors() {
        assert_eq!(parse_err("a.").message, "expected identifier");
        assert_eq!(parse_err("a.1").message, "expected identifier");
        assert_eq!(parse_err("a[]").message, "expected computed property");
        assert_eq!(parse_err("a[0").message, "expected computed close");
    }

    #[test]
    fn test_whitespace_around_member_operators() {
        assert_eq!(shape_of("a\n  .b\n  .c"), "(get (get a b) c)");
    }

    #[test]
    fn test_call() {
        assert_eq!(shape_of("f(a, b)"), "(call f [a b])");
        assert_eq!(shape_of("f()"), "(call f [])");
        assert_eq!(span_of("f(a, b)"), (0, 7));
    }

    #[test]
    fn test_call_trailing_comma() {
        assert_eq!(shape_of("f(a,)"), "(call f [a])");
    }

    #[test]
    fn test_call_missing_argument() {
        assert_eq!(parse_err("f(,a)").message, "expected element before comma");
        assert_eq!(parse_err("f(a,,b)").message, "expected element before comma");
    }

    #[test]
    fn test_unterminated_call() {
        assert_eq!(parse_err("f(a").message, "expected call close");
    }

    #[test]
    fn test_postfix_operators_stack() {
        assert_eq!(
            shape_of("a.b(c).d(e)"),
            "(call (get (call (get a b) [c]) d) [e])"
        );
        assert_eq!(shape_of("f(1)(2)[3]"), "(index (call (call f [1]) [2]) 3)");
    }

    #[test]
    fn test_optional_member_chain() {
        let expr = parse("a?.b.c");
        assert_eq!(shape(&expr), "(chain (get (get? a b) c))");
        assert_eq!(expr.span, Span::new(0, 6));
    }

    #[test]
    fn test_optional_member_then_call() {
        assert_eq!(shape_of("a?.b()"), "(chain (call (get? a b) []))");
    }

    #[test]
    fn test_optional_call() {
        assert_eq!(shape_of("a?.()"), "(chain (call? a []))");
        assert_eq!(shape_of("a.b?.(1).c"), "(chain (get (call? (get a b) [1]) c))");
    }

    #[test]
    fn test_optional_computed() {
        assert_eq!(shape_of("a?.[0]"), "(chain (index? a 0))");
    }

    #[test]
    fn test_multiple_optional_links_share_one_chain() {
        assert_eq!(shape_of("a?.b?.c"), "(chain (get? (get? a b) c))");
        assert_eq!(
            shape_of("a?.b(c)?.d"),
            "(chain (get? (call (get? a b) [c]) d))"
        );
    }

    #[test]
    fn test_optional_after_call() {
        assert_eq!(shape_of("f()?.x"), "(chain (get? (call f []) x))");
    }

    #[test]
    fn test_parenthesized_chain_is_its_own_run() {
        assert_eq!(shape_of("(a?.b).c"), "(get (chain (get? a b)) c)");
        assert_eq!(shape_of("(a?.b)()"), "(call (chain (get? a b)) [])");
    }

    #[test]
    fn test_optional_before_digit_is_conditional() {
        assert_eq!(shape_of("a?.5:1"), "(? a .5 1)");
    }

    #[test]
    fn test_chains_never_nest() {
        for source in ["a?.b.c?.d()", "x?.[y?.z]?.(w)", "f(a?.b)?.c", "[a?.b][0]?.c"] {
            let expr = parse(source);
            assert_no_nested_chain(&expr);
            assert_nested(&expr);
        }
    }

    // =========================================================================
    // new
    // =========================================================================

    #[test]
    fn test_new_with_arguments() {
        let expr = parse("new a.b(1,2)");
        assert_eq!(shape(&expr), "(new (get a b) [1 2])");
        assert_eq!(expr.span, Span::new(0, 12));
    }

    #[test]
    fn test_new_without_arguments() {
        let expr = parse("new Foo");
        assert_eq!(shape(&expr), "(new Foo [])");
        assert_eq!(expr.span, Span::new(0, 7));
    }

    #[test]
    fn test_new_then_member() {
        assert_eq!(shape_of("new Foo().bar"), "(get (new Foo []) bar)");
        assert_eq!(shape_of("new a.b().c"), "(get (new (get a b) []) c)");
        assert_eq!(shape_of("new Foo(1)(2)"), "(call (new Foo [1]) [2])");
    }

    #[test]
    fn test_nested_new() {
        assert_eq!(shape_of("new new X()()"), "(new (new X []) [])");
    }

    #[test]
    fn test_new_rejects_optional_chain() {
        for source in ["new a?.b()", "new a?.b", "new (a?.b)()"] {
            assert_eq!(
                parse_err(source).message,
                "chain expression not allowed in new expression",
                "{source}"
            );
        }
    }

    #[test]
    fn test_new_without_callee() {
        assert_eq!(parse_err("new").message, "expected callee");
    }

    // =========================================================================
    // Update expressions
    // =========================================================================

    #[test]
    fn test_postfix_update() {
        let expr = parse("x++");
        assert_eq!(shape(&expr), "(x ++)");
        assert_eq!(expr.span, Span::new(0, 3));
        assert_eq!(shape_of("a.b--"), "((get a b) --)");
    }

    #[test]
    fn test_prefix_update() {
        let expr = parse("++x");
        assert_eq!(shape(&expr), "(++ x)");
        assert_eq!(expr.span, Span::new(0, 3));
        assert_eq!(shape_of("--a[0]"), "(-- (index a 0))");
    }

    #[test]
    fn test_update_requires_lvalue() {
        for source in ["1++", "++1", "a()++", "++this", "a?.b++", "++x++"] {
            assert_eq!(
                parse_err(source).message,
                "expected identifier or member expression",
                "{source}"
            );
        }
    }

    #[test]
    fn test_postfix_update_same_line_only() {
        let err = parse_err("a\n++b");
        assert_eq!(err.message, "unexpected character '+'");
        assert_eq!((err.line, err.column), (2, 1));
    }

    #[test]
    fn test_postfix_then_binary() {
        assert_eq!(shape_of("a+++b"), "(+ (a ++) b)");
    }

    // =========================================================================
    // Sequences and groups
    // =========================================================================

    #[test]
    fn test_top_level_sequence() {
        let expr = parse("a, b, c");
        assert_eq!(shape(&expr), "(seq a b c)");
        assert_eq!(expr.span, Span::new(0, 7));
    }

    #[test]
    fn test_grouped_sequence() {
        let expr = parse("(a,b,c)");
        assert_eq!(shape(&expr), "(seq a b c)");
        assert_eq!(expr.span, Span::new(0, 7));
    }

    #[test]
    fn test_single_group_is_unwrapped() {
        let expr = parse("(a)");
        assert_eq!(
            expr.kind,
            ExprKind::Identifier { name: "a".into() }
        );
        assert_eq!(expr.span, Span::new(1, 2));
    }

    #[test]
    fn test_group_errors() {
        assert_eq!(parse_err("()").message, "expected expression within paren");
        assert_eq!(parse_err("(a").message, "expected paren close");
        assert_eq!(parse_err("(a,)").message, "expected expression after comma");
        assert_eq!(parse_err("(,a)").message, "expected expression before comma");
    }

    #[test]
    fn test_comma_errors() {
        let err = parse_err(",a");
        assert_eq!(err.message, "expected expression before comma");
        assert_eq!(err.offset, 0);
        assert_eq!(parse_err("a,").message, "expected expression after comma");
        assert_eq!(parse_err("a,,b").message, "expected expression after comma");
    }

    // =========================================================================
    // Conditional
    // =========================================================================

    #[test]
    fn test_conditional() {
        let expr = parse("a ? b : c");
        assert_eq!(shape(&expr), "(? a b c)");
        assert_eq!(expr.span, Span::new(0, 9));
    }

    #[test]
    fn test_nested_conditionals() {
        assert_eq!(shape_of("a ? b ? c : d : e"), "(? a (? b c d) e)");
        assert_eq!(shape_of("a ? b : c ? d : e"), "(? a b (? c d e))");
    }

    #[test]
    fn test_conditional_binds_looser_than_logical() {
        assert_eq!(shape_of("a || b ? c : d"), "(? (|| a b) c d)");
        assert_eq!(shape_of("a ? b : c, d"), "(seq (? a b c) d)");
    }

    #[test]
    fn test_conditional_errors() {
        assert_eq!(parse_err("? a : b").message, "expected test expression");
        assert_eq!(parse_err("a ? : b").message, "expected consequent expression");
        assert_eq!(parse_err("a ? b :").message, "expected alternate expression");
        assert_eq!(parse_err("a ? b c").message, "expected colon");
    }

    // =========================================================================
    // Unary, binary and logical operators
    // =========================================================================

    #[test]
    fn test_unary_operators() {
        assert_eq!(shape_of("!a"), "(! a)");
        assert_eq!(shape_of("- -a"), "(- (- a))");
        assert_eq!(shape_of("~+a"), "(~ (+ a))");
        assert_eq!(shape_of("typeof a.b"), "(typeof (get a b))");
        assert_eq!(shape_of("void 0"), "(void 0)");
        assert_eq!(shape_of("delete a[0]"), "(delete (index a 0))");
    }

    #[test]
    fn test_unary_span() {
        let expr = parse("typeof x");
        assert_eq!(expr.span, Span::new(0, 8));
        let ExprKind::Unary { prefix, .. } = expr.kind else {
            panic!("expected unary");
        };
        assert!(prefix);
    }

    #[test]
    fn test_missing_unary_operand() {
        assert_eq!(parse_err("!").message, "expected unary operand");
        assert_eq!(parse_err("typeof").message, "expected unary operand");
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(shape_of("1 + 2 * 3"), "(+ 1 (* 2 3))");
        assert_eq!(shape_of("(1 + 2) * 3"), "(* (+ 1 2) 3)");
        assert_eq!(shape_of("a - b - c"), "(- (- a b) c)");
        assert_eq!(shape_of("-a * b"), "(* (- a) b)");
        assert_eq!(shape_of("a % b / c"), "(/ (% a b) c)");
    }

    #[test]
    fn test_exponent_is_right_associative() {
        assert_eq!(shape_of("2 ** 3 ** 2"), "(** 2 (** 3 2))");
        assert_eq!(shape_of("a * b ** c"), "(* a (** b c))");
    }

    #[test]
    fn test_unary_before_exponent() {
        assert_eq!(
            parse_err("-a ** 2").message,
            "unary operator before exponentiation requires parentheses"
        );
        assert_eq!(
            parse_err("a ** -b ** c").message,
            "unary operator before exponentiation requires parentheses"
        );
        assert_eq!(shape_of("(-a) ** 2"), "(** (- a) 2)");
        assert_eq!(shape_of("a ** -b"), "(** a (- b))");
        assert_eq!(shape_of("++a ** 2"), "(** (++ a) 2)");
    }

    #[test]
    fn test_comparison_and_equality() {
        assert_eq!(shape_of("a === b !== c"), "(!== (=== a b) c)");
        assert_eq!(shape_of("a < b == c"), "(== (< a b) c)");
        assert_eq!(shape_of("a <= b >= c"), "(>= (<= a b) c)");
    }

    #[test]
    fn test_bitwise_and_shift() {
        assert_eq!(shape_of("a | b ^ c & d"), "(| a (^ b (& c d)))");
        assert_eq!(shape_of("a << 1 >>> 2"), "(>>> (<< a 1) 2)");
        assert_eq!(shape_of("a >> b + c"), "(>> a (+ b c))");
    }

    #[test]
    fn test_keyword_operators() {
        assert_eq!(shape_of("a instanceof B"), "(instanceof a B)");
        assert_eq!(shape_of("key in o"), "(in key o)");
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(shape_of("a && b || c"), "(|| (&& a b) c)");
        assert_eq!(shape_of("a || b && c"), "(|| a (&& b c))");
        assert_eq!(shape_of("a ?? b"), "(?? a b)");
        assert_eq!(parse("a ?? b").node_type(), "LogicalExpression");
        assert_eq!(parse("a | b").node_type(), "BinaryExpression");
    }

    #[test]
    fn test_nullish_cannot_mix_with_logical() {
        for source in ["a ?? b || c", "a || b ?? c", "a && b ?? c", "a ?? b && c"] {
            assert_eq!(
                parse_err(source).message,
                "cannot mix ?? with || or && without parentheses",
                "{source}"
            );
        }
        assert_eq!(parse_err("a || b ?? c").offset, 7);
    }

    #[test]
    fn test_nullish_with_parens() {
        assert_eq!(shape_of("(a || b) ?? c"), "(?? (|| a b) c)");
        assert_eq!(shape_of("a ?? (b && c)"), "(?? a (&& b c))");
        assert_eq!(shape_of("a ?? b ?? c"), "(?? (?? a b) c)");
        assert_eq!(shape_of("a ?? b | c"), "(?? a (| b c))");
        assert_eq!(shape_of("a ?? b ? c : d"), "(? (?? a b) c d)");
    }

    #[test]
    fn test_missing_right_hand_side() {
        assert_eq!(parse_err("a +").message, "expected right hand expression");
        assert_eq!(parse_err("a && )").message, "expected right hand expression");
    }

    #[test]
    fn test_compound_assignment_is_not_binary() {
        let err = parse_err("a += 1");
        assert_eq!(err.message, "unexpected character '+'");
        assert_eq!(err.offset, 2);
        assert!(ExprParser::parse("a ??= b").is_err());
    }

    #[test]
    fn test_error_location_is_reported() {
        let err = parse_err("a +\n  )");
        assert_eq!(err.message, "expected right hand expression");
        assert_eq!((err.line, err.column), (2, 3));
        assert_eq!(
            err.to_string(),
            "Syntax error at line 2, column 3: expected right hand expression"
        );
    }

    // =========================================================================
    // Entry point
    // =========================================================================

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_err("").message, "expected expression");
        assert_eq!(parse_err("   \n ").message, "expected expression");
    }

    #[test]
    fn test_trailing_input() {
        let err = parse_err("a)");
        assert_eq!(err.message, "unexpected character ')'");
        assert_eq!(err.offset, 1);
        assert_eq!(parse_err("a b").message, "unexpected character 'b'");
    }

    #[test]
    fn test_surrounding_whitespace() {
        let expr = parse("  a + b  ");
        assert_eq!(expr.span, Span::new(2, 7));
    }

    #[test]
    fn test_max_source_len() {
        let options = ParseOptions::default().with_max_source_len(3);
        let err = ExprParser::parse_with("a + b", &options).unwrap_err();
        assert_eq!(err.message, "source exceeds maximum length of 3 bytes");
        assert!(ExprParser::parse_with("a+b", &options).is_ok());
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let inputs = [
            "[".repeat(10_000),
            format!("{}a{}", "[".repeat(1_000), "]".repeat(1_000)),
            format!("{}a{}", "(".repeat(10_000), ")".repeat(10_000)),
            format!("{}a", "!".repeat(10_000)),
            format!("{}a", "++".repeat(10_000)),
            format!("{}X", "new ".repeat(10_000)),
            vec!["a"; 10_000].join(" ** "),
            format!("{}c", "a ? b : ".repeat(10_000)),
            format!("a{}", "[b".repeat(10_000)),
        ];
        for source in &inputs {
            assert_eq!(
                parse_err(source).message,
                "expression nested too deeply",
                "{}...",
                &source[..20]
            );
        }
    }

    #[test]
    fn test_moderate_nesting_is_accepted() {
        let source = format!("{}a{}", "[".repeat(40), "]".repeat(40));
        let mut expr = &parse(&source);
        for _ in 0..40 {
            let ExprKind::Array { elements } = &expr.kind else {
                panic!("expected array, got {expr:?}");
            };
            expr = elements[0].as_ref().unwrap();
        }
        assert_eq!(expr.node_type(), "Identifier");
    }

    #[test]
    fn test_max_depth_option() {
        let options = ParseOptions::default().with_max_depth(8);
        assert!(ExprParser::parse_with("[a]", &options).is_ok());
        let err = ExprParser::parse_with("[[a]]", &options).unwrap_err();
        assert_eq!(err.message, "expression nested too deeply");
    }

    #[test]
    fn test_spans_are_nested() {
        for source in [
            "a.b[c](d)",
            "new a.b(1, [2, , 3])",
            "x ? y++ : --z.w",
            "(a, b).c?.(d)",
            "-a * (b + c) ** 2 >= d && !e",
            "f(a)[b]?.c",
        ] {
            let expr = parse(source);
            assert_eq!(expr.span.start, 0, "{source}");
            assert_eq!(expr.span.end, source.len(), "{source}");
            assert_nested(&expr);
        }
    }

    #[test]
    fn test_estree_json() {
        let json = serde_json::to_value(parse("a?.b")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "ChainExpression",
                "start": 0,
                "end": 4,
                "expression": {
                    "type": "MemberExpression",
                    "start": 0,
                    "end": 4,
                    "computed": false,
                    "optional": true,
                    "object": {"type": "Identifier", "name": "a", "start": 0, "end": 1},
                    "property": {"type": "Identifier", "name": "b", "start": 3, "end": 4},
                },
            })
        );
    }
}
