use crate::error::ParseError;
use crate::ir::ast::{
    self, Action, ActionBlock, BinaryOperator, Category, ConditionBlock, Expr, ExprKind, Literal,
    PolicyItem, RuleItem, Statement, UnaryOperator, Verdict,
};
use crate::span::Span;
use super::lexer::{Token, TokenType};

/// How deep expressions may nest (parentheses, `not` chains, call arguments).
pub const DEFAULT_MAX_DEPTH: usize = 128;

pub fn parse_tokens(tokens: Vec<Token>) -> Result<ast::Program, ParseError> {
    parse_tokens_with_depth(tokens, DEFAULT_MAX_DEPTH)
}

pub fn parse_tokens_with_depth(
    tokens: Vec<Token>,
    max_depth: usize,
) -> Result<ast::Program, ParseError> {
    // Nothing may follow the sentinel
    if let Some(eof) = tokens.iter().position(|t| t.kind == TokenType::Eof) {
        if let Some(extra) = tokens.get(eof + 1) {
            return Err(error_at(extra, "unexpected token after end of file"));
        }
    }
    let mut parser = Parser::new(tokens, max_depth);
    parser.parse_program()
}

type ParseResult<T> = Result<T, ParseError>;

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    fn new(mut tokens: Vec<Token>, max_depth: usize) -> Self {
        // Hand-built token vectors may lack the sentinel
        if tokens.last().map(|t| t.kind) != Some(TokenType::Eof) {
            let span = tokens
                .last()
                .map(|t| Span::new(t.span.line, t.span.column, t.span.end, t.span.end))
                .unwrap_or_default();
            tokens.push(Token::new(TokenType::Eof, "", span));
        }
        Self { tokens, position: 0, depth: 0, max_depth }
    }

    // program := (policy | rule | import)* EOF
    fn parse_program(&mut self) -> ParseResult<ast::Program> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            let statement = match self.current().kind {
                TokenType::Policy => Statement::Policy(self.parse_policy()?),
                TokenType::Rule => Statement::Rule(self.parse_rule_decl()?),
                TokenType::Import => Statement::Import(self.parse_import()?),
                _ => return Err(self.error("expected 'policy', 'rule' or 'import'")),
            };
            statements.push(statement);
        }

        let end = self.current().span.end;
        Ok(ast::Program { statements, span: Span::new(1, 1, 0, end) })
    }

    fn parse_policy(&mut self) -> ParseResult<ast::PolicyDecl> {
        let start = self.expect(TokenType::Policy, "expected 'policy'")?.span;
        let name = self.expect(TokenType::Ident, "expected policy name after 'policy'")?.text;
        self.expect(TokenType::Colon, "expected ':' after policy name")?;
        let category = self.parse_category()?;
        self.expect(TokenType::LBrace, "expected '{' to open policy body")?;

        let mut body = Vec::new();
        loop {
            let item = match self.current().kind {
                TokenType::RBrace | TokenType::Eof => break,
                TokenType::Rule => {
                    // rule <name> : ... declares, rule <name> alone refers
                    if self.peek(1).kind == TokenType::Ident
                        && self.peek(2).kind == TokenType::Colon
                    {
                        PolicyItem::Rule(self.parse_rule_decl()?)
                    } else {
                        PolicyItem::RuleRef(self.parse_rule_ref()?)
                    }
                }
                TokenType::When => PolicyItem::Condition(self.parse_condition_block()?),
                TokenType::Priority => PolicyItem::Priority(self.parse_priority()?),
                kind if kind.is_action() => PolicyItem::Action(self.parse_action_block()?),
                _ => {
                    return Err(self.error(
                        "expected 'rule', 'when', 'priority' or an action in policy body",
                    ));
                }
            };
            body.push(item);
        }

        let end = self
            .expect(TokenType::RBrace, &format!("expected '}}' to close policy '{name}'"))?
            .span;
        Ok(ast::PolicyDecl { name, category, body, span: start.to(end) })
    }

    fn parse_rule_decl(&mut self) -> ParseResult<ast::RuleDecl> {
        let start = self.expect(TokenType::Rule, "expected 'rule'")?.span;
        let name = self.expect(TokenType::Ident, "expected rule name after 'rule'")?.text;
        self.expect(TokenType::Colon, "expected ':' and a category after rule name")?;
        let category = self.parse_category()?;
        self.expect(TokenType::LBrace, "expected '{' to open rule body")?;

        let mut body = Vec::new();
        loop {
            let item = match self.current().kind {
                TokenType::RBrace | TokenType::Eof => break,
                TokenType::When => RuleItem::Condition(self.parse_condition_block()?),
                TokenType::Priority => RuleItem::Priority(self.parse_priority()?),
                kind if kind.is_action() => RuleItem::Action(self.parse_action_block()?),
                _ => {
                    return Err(self.error("expected 'when', 'priority' or an action in rule body"));
                }
            };
            body.push(item);
        }

        let end = self
            .expect(TokenType::RBrace, &format!("expected '}}' to close rule '{name}'"))?
            .span;
        Ok(ast::RuleDecl { name, category, body, span: start.to(end) })
    }

    fn parse_rule_ref(&mut self) -> ParseResult<ast::RuleRef> {
        let start = self.expect(TokenType::Rule, "expected 'rule'")?.span;
        let name = self.expect(TokenType::Ident, "expected rule name after 'rule'")?;
        Ok(ast::RuleRef { name: name.text, span: start.to(name.span) })
    }

    fn parse_category(&mut self) -> ParseResult<Category> {
        let category = match self.current().kind {
            TokenType::Safety => Category::Safety,
            TokenType::Privacy => Category::Privacy,
            TokenType::Operational => Category::Operational,
            TokenType::Routing => Category::Routing,
            TokenType::Custom => Category::Custom,
            _ => {
                let names: Vec<_> = Category::ALL.iter().map(|c| c.name()).collect();
                let message = format!("expected category (one of {})", names.join(", "));
                return Err(self.error(&message));
            }
        };
        self.advance();
        Ok(category)
    }

    // when <expr> then <action>
    fn parse_condition_block(&mut self) -> ParseResult<ConditionBlock> {
        let start = self.expect(TokenType::When, "expected 'when'")?.span;
        let condition = self.parse_expression()?;
        self.expect(TokenType::Then, "expected 'then' after condition")?;
        let action = self.parse_action_block()?;
        let span = start.to(action.span);
        Ok(ConditionBlock { condition, action, span })
    }

    fn parse_action_block(&mut self) -> ParseResult<ActionBlock> {
        let verdict = match self.current().kind {
            TokenType::Deny => Verdict::Deny,
            TokenType::Allow => Verdict::Allow,
            TokenType::Escalate => Verdict::Escalate,
            TokenType::Route => return self.parse_route(),
            _ => {
                let names: Vec<_> = Action::ALL.iter().map(|a| a.name()).collect();
                let message = format!("expected action (one of {})", names.join(", "));
                return Err(self.error(&message));
            }
        };
        let start = self.advance().span;

        if self.check(TokenType::To) {
            return Err(self.error("a 'to' target is only allowed after 'route'"));
        }
        Ok(ActionBlock { verdict, span: start })
    }

    // route to <target>
    fn parse_route(&mut self) -> ParseResult<ActionBlock> {
        let start = self.expect(TokenType::Route, "expected 'route'")?.span;
        self.expect(TokenType::To, "expected 'to' after 'route'")?;
        let target = self.expect(TokenType::Ident, "expected route target after 'to'")?;
        let span = start.to(target.span);
        let target = ast::RouteTarget { target: target.text, span: target.span };
        Ok(ActionBlock { verdict: Verdict::Route(target), span })
    }

    fn parse_priority(&mut self) -> ParseResult<ast::Priority> {
        let start = self.expect(TokenType::Priority, "expected 'priority'")?.span;
        let number = self.expect(TokenType::Number, "expected a number after 'priority'")?;
        if number.text.contains('.') {
            return Err(error_at(&number, "priority must be an integer"));
        }
        let value = number
            .text
            .parse::<i64>()
            .map_err(|_| error_at(&number, "priority is out of range"))?;
        Ok(ast::Priority { value, span: start.to(number.span) })
    }

    fn parse_import(&mut self) -> ParseResult<ast::Import> {
        let start = self.expect(TokenType::Import, "expected 'import'")?.span;
        let path = self.expect(TokenType::String, "expected a quoted path after 'import'")?;
        Ok(ast::Import { path: path.text, span: start.to(path.span) })
    }

    // Expressions, loosest binding first:
    // or -> and -> not -> comparison -> value

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.descend()?;
        let expr = self.parse_or();
        self.depth -= 1;
        expr
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        while self.match_kinds(&[TokenType::Or]).is_some() {
            let right = self.parse_and()?;
            left = binary(BinaryOperator::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_not()?;
        while self.match_kinds(&[TokenType::And]).is_some() {
            let right = self.parse_not()?;
            left = binary(BinaryOperator::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> ParseResult<Expr> {
        let Some(not) = self.match_kinds(&[TokenType::Not]) else {
            return self.parse_comparison();
        };
        self.descend()?;
        let operand = self.parse_not();
        self.depth -= 1;
        let operand = operand?;
        let span = not.span.to(operand.span);
        Ok(Expr::new(
            ExprKind::UnaryOp { op: UnaryOperator::Not, operand: Box::new(operand) },
            span,
        ))
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let left = self.parse_value()?;
        let Some(op) = comparison_operator(self.current().kind) else {
            return Ok(left);
        };
        self.advance();
        let right = self.parse_value()?;

        if self.current().kind.is_comparison() {
            return Err(self.error(
                "comparison operators cannot be chained; combine comparisons with 'and'",
            ));
        }
        Ok(binary(op, left, right))
    }

    fn parse_value(&mut self) -> ParseResult<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenType::Number => {
                self.advance();
                let literal = if token.text.contains('.') {
                    let value = token
                        .text
                        .parse::<f64>()
                        .map_err(|_| error_at(&token, "invalid number literal"))?;
                    if !value.is_finite() {
                        return Err(error_at(&token, "float literal is out of range"));
                    }
                    Literal::Float(value)
                } else {
                    token
                        .text
                        .parse::<i64>()
                        .map(Literal::Int)
                        .map_err(|_| error_at(&token, "integer literal is out of range"))?
                };
                Ok(Expr::new(ExprKind::Literal(literal), token.span))
            }
            TokenType::String => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Str(token.text)), token.span))
            }
            TokenType::True | TokenType::False => {
                self.advance();
                let value = token.kind == TokenType::True;
                Ok(Expr::new(ExprKind::Literal(Literal::Bool(value)), token.span))
            }
            TokenType::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenType::RParen, "expected ')' to close parenthesized expression")?;
                Ok(expr)
            }
            TokenType::Ident => self.parse_identifier_chain(),
            _ => Err(self.error("expected expression")),
        }
    }

    // ident ( '(' args ')' )? ( '.' name ( '(' args ')' )? )*
    fn parse_identifier_chain(&mut self) -> ParseResult<Expr> {
        let name = self.expect(TokenType::Ident, "expected identifier")?;
        let mut expr = Expr::new(ExprKind::Ident(name.text), name.span);
        expr = self.parse_call_suffix(expr)?;

        while self.match_kinds(&[TokenType::Dot]).is_some() {
            let attr = self.current().clone();
            if attr.kind != TokenType::Ident && !attr.kind.is_keyword() {
                return Err(self.error("expected attribute name after '.'"));
            }
            self.advance();
            let span = expr.span.to(attr.span);
            let object = Box::new(expr);
            expr = Expr::new(ExprKind::AttrAccess { object, attr: attr.text }, span);
            expr = self.parse_call_suffix(expr)?;
        }

        Ok(expr)
    }

    fn parse_call_suffix(&mut self, callee: Expr) -> ParseResult<Expr> {
        if self.match_kinds(&[TokenType::LParen]).is_none() {
            return Ok(callee);
        }

        let mut args = Vec::new();
        if !self.check(TokenType::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if self.match_kinds(&[TokenType::Comma]).is_none() {
                    break;
                }
            }
        }
        let close = self.expect(TokenType::RParen, "expected ')' to close argument list")?;
        let span = callee.span.to(close.span);
        Ok(Expr::new(ExprKind::FuncCall { callee: Box::new(callee), args }, span))
    }

    // Cursor helpers

    fn current(&self) -> &Token {
        self.peek(0)
    }

    fn peek(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.position + offset).min(last)]
    }

    fn advance(&mut self) -> &Token {
        let index = self.position;
        if !self.is_at_end() {
            self.position += 1;
        }
        &self.tokens[index]
    }

    fn check(&self, kind: TokenType) -> bool {
        self.current().kind == kind
    }

    fn match_kinds(&mut self, kinds: &[TokenType]) -> Option<Token> {
        if kinds.contains(&self.current().kind) {
            Some(self.advance().clone())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenType, message: &str) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance().clone())
        } else {
            Err(self.error(message))
        }
    }

    fn descend(&mut self) -> ParseResult<()> {
        if self.depth >= self.max_depth {
            return Err(self.error("expression is nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    fn error(&self, message: &str) -> ParseError {
        error_at(self.current(), message)
    }

    fn is_at_end(&self) -> bool {
        self.tokens[self.position].kind == TokenType::Eof
    }
}

fn error_at(token: &Token, message: &str) -> ParseError {
    ParseError {
        message: message.to_string(),
        found: token.kind,
        text: token.text.clone(),
        line: token.span.line,
        column: token.span.column,
    }
}

fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
    let span = left.span.to(right.span);
    Expr::new(
        ExprKind::BinaryOp { op, left: Box::new(left), right: Box::new(right) },
        span,
    )
}

fn comparison_operator(kind: TokenType) -> Option<BinaryOperator> {
    let op = match kind {
        TokenType::Eq => BinaryOperator::Eq,
        TokenType::Ne => BinaryOperator::Ne,
        TokenType::Lt => BinaryOperator::Lt,
        TokenType::Gt => BinaryOperator::Gt,
        TokenType::Le => BinaryOperator::Le,
        TokenType::Ge => BinaryOperator::Ge,
        _ => return None,
    };
    Some(op)
}
