use std::rc::Rc;

use crate::ast::{
    BinaryOp, Expr, ExprKind, Lambda, OracleDef, Param, Prim, TypeExpr, TypeExprKind, TypeField,
    UnaryOp,
};
use crate::errors::{ErrorKind, MsError};
use crate::syntax::{lex, Span, Tok, Token};

/// Parse a complete source text into its top-level expression sequence.
pub fn parse(source: &str) -> Result<Vec<Expr>, MsError> {
    Parser::new(source, false)?.parse_program()
}

/// Like [`parse`], but running out of tokens mid-expression yields an
/// error with `is_incomplete()` set so a REPL can keep reading lines.
pub fn parse_interactive(source: &str) -> Result<Vec<Expr>, MsError> {
    Parser::new(source, true)?.parse_program()
}

struct Parser {
    tokens: Vec<Tok>,
    pos: usize,
    end: usize,
    interactive: bool,
}

impl Parser {
    fn new(source: &str, interactive: bool) -> Result<Self, MsError> {
        let tokens = lex(source)?;
        Ok(Self {
            tokens,
            pos: 0,
            end: source.len(),
            interactive,
        })
    }

    fn eof_span(&self) -> Span {
        Span::point(self.end)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&Token> {
        self.peek().map(|t| &t.kind)
    }

    fn peek_span(&self) -> Span {
        self.peek().map(|t| t.span).unwrap_or_else(|| self.eof_span())
    }

    fn advance(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &Token) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn eat(&mut self, kind: &Token) -> Option<Span> {
        if self.check(kind) {
            self.advance().map(|t| t.span)
        } else {
            None
        }
    }

    /// A `(` or `[` that abuts the previous token, i.e. a call or index.
    fn eat_glued(&mut self, kind: &Token) -> Option<Span> {
        match self.peek() {
            Some(tok) if tok.kind == *kind && tok.glued => self.advance().map(|t| t.span),
            _ => None,
        }
    }

    fn error(&self, message: impl Into<String>, span: Span) -> MsError {
        MsError::new(ErrorKind::Parse, message, Some(span))
    }

    fn error_here(&self, message: impl Into<String>) -> MsError {
        if self.interactive && self.is_at_end() {
            MsError::incomplete_input(self.eof_span())
        } else {
            self.error(message, self.peek_span())
        }
    }

    fn expect(&mut self, kind: &Token, message: &str) -> Result<Span, MsError> {
        match self.eat(kind) {
            Some(span) => Ok(span),
            None => Err(self.error_here(message)),
        }
    }

    // ── program and control ──────────────────────────────────────────

    fn parse_program(&mut self) -> Result<Vec<Expr>, MsError> {
        let mut program = Vec::new();
        while !self.is_at_end() {
            program.push(self.parse_control()?);
        }
        Ok(program)
    }

    fn parse_control(&mut self) -> Result<Expr, MsError> {
        for (token, word) in [
            (Token::Return, "return"),
            (Token::Break, "break"),
            (Token::Continue, "continue"),
        ] {
            if let Some(start) = self.eat(&token) {
                if self.eat_glued(&Token::LParen).is_none() {
                    return Err(self.error_here(format!("expected '(' after '{word}'")));
                }
                let expr = self.parse_expression()?;
                let end = self.expect(&Token::RParen, "expected closing ')' after expression")?;
                let span = start.merge(end);
                let inner = Box::new(expr);
                let kind = match token {
                    Token::Return => ExprKind::Return(inner),
                    Token::Break => ExprKind::Break(inner),
                    _ => ExprKind::Continue(inner),
                };
                return Ok(Expr::new(kind, span));
            }
        }
        self.parse_expression()
    }

    // ── expressions ──────────────────────────────────────────────────

    fn parse_expression(&mut self) -> Result<Expr, MsError> {
        if let Some(Token::Hash(_)) = self.peek_kind() {
            let tok = self.advance().unwrap();
            let note = match tok.kind {
                Token::Hash(text) => text,
                _ => unreachable!(),
            };
            let expr = self.parse_expression()?;
            let span = tok.span.merge(expr.span);
            return Ok(Expr::new(
                ExprKind::Annotate {
                    note,
                    expr: Box::new(expr),
                },
                span,
            ));
        }
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, MsError> {
        let target = self.parse_disjunction()?;
        if let Some(op_span) = self.eat(&Token::Assign) {
            self.check_target(&target, op_span)?;
            let expr = self.parse_expression()?;
            let span = target.span.merge(expr.span);
            return Ok(Expr::new(
                ExprKind::Assign {
                    target: Box::new(target),
                    expr: Box::new(expr),
                },
                span,
            ));
        }
        Ok(target)
    }

    /// Valid left-hand sides of `=`: identifiers, `let` declarations,
    /// member and index places, and array/object destructuring patterns
    /// whose leaves are themselves valid targets.
    fn check_target(&self, target: &Expr, at: Span) -> Result<(), MsError> {
        let ok = match &target.kind {
            ExprKind::Ident(_) | ExprKind::Declare(_) => true,
            ExprKind::Member { .. } | ExprKind::Index { .. } => true,
            ExprKind::Annotate { expr, .. } => {
                self.check_target(expr, at)?;
                true
            }
            ExprKind::Array(items) => {
                for item in items {
                    self.check_target(item, at)?;
                }
                true
            }
            ExprKind::Object(items) => {
                for (_, item) in items {
                    self.check_target(item, at)?;
                }
                true
            }
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(self.error("invalid assignment target", at))
        }
    }

    fn parse_disjunction(&mut self) -> Result<Expr, MsError> {
        let mut left = self.parse_conjunction()?;
        while self.eat(&Token::Or).is_some() {
            let right = self.parse_conjunction()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_conjunction(&mut self) -> Result<Expr, MsError> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::And).is_some() {
            let right = self.parse_equality()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, MsError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = if self.eat(&Token::EqEq).is_some() {
                BinaryOp::Eq
            } else if self.eat(&Token::BangEq).is_some() {
                BinaryOp::Ne
            } else {
                break;
            };
            let right = self.parse_comparison()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, MsError> {
        let mut left = self.parse_term()?;
        loop {
            let op = if self.eat(&Token::Lt).is_some() {
                BinaryOp::Lt
            } else if self.eat(&Token::Le).is_some() {
                BinaryOp::Le
            } else if self.eat(&Token::Gt).is_some() {
                BinaryOp::Gt
            } else if self.eat(&Token::Ge).is_some() {
                BinaryOp::Ge
            } else {
                break;
            };
            let right = self.parse_term()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, MsError> {
        let mut left = self.parse_factor()?;
        loop {
            let op = if self.eat(&Token::Plus).is_some() {
                BinaryOp::Add
            } else if self.eat(&Token::Minus).is_some() {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.parse_factor()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, MsError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.eat(&Token::Star).is_some() {
                BinaryOp::Mul
            } else if self.eat(&Token::Slash).is_some() {
                BinaryOp::Div
            } else if self.eat(&Token::Percent).is_some() {
                BinaryOp::Rem
            } else {
                break;
            };
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, MsError> {
        let op = if let Some(span) = self.eat(&Token::Minus) {
            Some((UnaryOp::Neg, span))
        } else if let Some(span) = self.eat(&Token::Not) {
            Some((UnaryOp::Not, span))
        } else {
            None
        };
        if let Some((op, start)) = op {
            let expr = self.parse_postfix()?;
            let span = start.merge(expr.span);
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    expr: Box::new(expr),
                },
                span,
            ));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, MsError> {
        let mut expr = self.parse_primary()?;
        loop {
            if let Some(open) = self.eat_glued(&Token::LParen) {
                let mut args = Vec::new();
                if !self.check(&Token::RParen) {
                    args.push(self.parse_expression()?);
                    while self.eat(&Token::Comma).is_some() {
                        args.push(self.parse_expression()?);
                    }
                }
                let close = self.expect(&Token::RParen, "expected closing ')'")?;
                if args.is_empty() {
                    // every function is unary; a bare call passes null
                    args.push(Expr::new(ExprKind::Null, open.merge(close)));
                }
                let span = expr.span.merge(close);
                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    span,
                );
            } else if self.eat_glued(&Token::LBracket).is_some() {
                let index = self.parse_expression()?;
                let close = self.expect(&Token::RBracket, "expected closing ']'")?;
                let span = expr.span.merge(close);
                expr = Expr::new(
                    ExprKind::Index {
                        expr: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            } else if self.eat(&Token::Dot).is_some() {
                let (name, name_span) = self.parse_property_name()?;
                let span = expr.span.merge(name_span);
                expr = Expr::new(
                    ExprKind::Member {
                        expr: Box::new(expr),
                        name,
                    },
                    span,
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_property_name(&mut self) -> Result<(String, Span), MsError> {
        match self.peek_kind().cloned() {
            Some(Token::Ident(name)) => {
                let span = self.advance().unwrap().span;
                Ok((name, span))
            }
            Some(Token::Str(name)) => {
                let span = self.advance().unwrap().span;
                Ok((name, span))
            }
            _ => Err(self.error_here("expected a property name")),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, MsError> {
        let (kind, span) = match self.peek() {
            Some(tok) => (tok.kind.clone(), tok.span),
            None => return Err(self.error_here("expected an expression")),
        };
        match kind {
            Token::Int(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::Int(n), span))
            }
            Token::Num(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::Num(n), span))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::new(ExprKind::Str(s), span))
            }
            Token::True => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(true), span))
            }
            Token::False => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(false), span))
            }
            Token::Null => {
                self.advance();
                Ok(Expr::new(ExprKind::Null, span))
            }
            Token::Ident(name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Ident(name), span))
            }
            Token::TyName(_) | Token::EnumKw => {
                Err(self.error("type atom without a 'type' constructor", span))
            }
            Token::LBracket => self.parse_array(),
            Token::LBrace => self.parse_object(),
            Token::TypeCons => {
                let start = self.advance().unwrap().span;
                let ty = self.parse_type_expr()?;
                let span = start.merge(ty.span);
                Ok(Expr::new(ExprKind::TypeLit(ty), span))
            }
            Token::Do => self.parse_block(),
            Token::If => self.parse_conditional(),
            Token::For => self.parse_for(),
            Token::Fun | Token::Oracle => self.parse_function(),
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&Token::RParen, "expected ')' after expression")?;
                Ok(expr)
            }
            Token::Let => {
                let start = self.advance().unwrap().span;
                match self.peek_kind().cloned() {
                    Some(Token::Ident(name)) => {
                        let end = self.advance().unwrap().span;
                        Ok(Expr::new(ExprKind::Declare(name), start.merge(end)))
                    }
                    _ => Err(self.error_here("expected an identifier after 'let'")),
                }
            }
            Token::Return | Token::Break | Token::Continue => {
                Err(self.error("control flow is not allowed inside an expression", span))
            }
            _ => Err(self.error_here("expected an expression")),
        }
    }

    fn parse_array(&mut self) -> Result<Expr, MsError> {
        let start = self.expect(&Token::LBracket, "expected '['")?;
        if let Some(end) = self.eat(&Token::RBracket) {
            return Ok(Expr::new(ExprKind::Array(Vec::new()), start.merge(end)));
        }
        let mut items = vec![self.parse_expression()?];
        while self.eat(&Token::Comma).is_some() {
            items.push(self.parse_expression()?);
        }
        let end = self.expect(&Token::RBracket, "expected closing ']' after array items")?;
        Ok(Expr::new(ExprKind::Array(items), start.merge(end)))
    }

    fn parse_object(&mut self) -> Result<Expr, MsError> {
        let start = self.expect(&Token::LBrace, "expected '{'")?;
        if let Some(end) = self.eat(&Token::RBrace) {
            return Ok(Expr::new(ExprKind::Object(Vec::new()), start.merge(end)));
        }
        let mut items = vec![self.parse_item()?];
        while self.eat(&Token::Comma).is_some() {
            items.push(self.parse_item()?);
        }
        let end = self.expect(&Token::RBrace, "expected closing '}' after object members")?;
        Ok(Expr::new(ExprKind::Object(items), start.merge(end)))
    }

    fn parse_item(&mut self) -> Result<(String, Expr), MsError> {
        let note = self.eat_annotation();
        let (key, _) = self.parse_key()?;
        self.expect(&Token::Colon, "expected ':' after member key")?;
        let mut expr = self.parse_expression()?;
        if let Some(note) = note {
            let span = expr.span;
            expr = Expr::new(
                ExprKind::Annotate {
                    note,
                    expr: Box::new(expr),
                },
                span,
            );
        }
        Ok((key, expr))
    }

    fn parse_key(&mut self) -> Result<(String, Span), MsError> {
        match self.peek_kind().cloned() {
            Some(Token::Ident(name)) | Some(Token::Str(name)) => {
                let span = self.advance().unwrap().span;
                Ok((name, span))
            }
            _ => Err(self.error_here("expected a member key")),
        }
    }

    fn eat_annotation(&mut self) -> Option<String> {
        if let Some(Token::Hash(_)) = self.peek_kind() {
            match self.advance().unwrap().kind {
                Token::Hash(text) => Some(text),
                _ => unreachable!(),
            }
        } else {
            None
        }
    }

    // ── blocks, conditionals, loops ──────────────────────────────────

    fn parse_chunk_until(&mut self, ends: &[Token]) -> Result<Vec<Expr>, MsError> {
        let mut exprs = Vec::new();
        loop {
            match self.peek_kind() {
                Some(kind) if ends.contains(kind) => break,
                Some(_) => exprs.push(self.parse_control()?),
                None => return Err(self.error_here("expected 'end'")),
            }
        }
        Ok(exprs)
    }

    fn parse_block(&mut self) -> Result<Expr, MsError> {
        let start = self.expect(&Token::Do, "expected 'do'")?;
        let exprs = self.parse_chunk_until(&[Token::End])?;
        let end = self.expect(&Token::End, "expected 'end'")?;
        Ok(Expr::new(ExprKind::Block(exprs), start.merge(end)))
    }

    fn parse_conditional(&mut self) -> Result<Expr, MsError> {
        let start = self.expect(&Token::If, "expected 'if'")?;
        let mut arms = Vec::new();
        let cond = self.parse_expression()?;
        let body = self.parse_branch_chunk()?;
        arms.push((cond, body));
        while self.eat(&Token::Elif).is_some() {
            let cond = self.parse_expression()?;
            let body = self.parse_branch_chunk()?;
            arms.push((cond, body));
        }
        let default = if self.eat(&Token::Else).is_some() {
            let exprs = self.parse_chunk_until(&[Token::End])?;
            let span = self.peek_span();
            Some(Box::new(Expr::new(ExprKind::Block(exprs), span)))
        } else {
            None
        };
        let end = self.expect(&Token::End, "expected closing 'end' after conditional")?;
        Ok(Expr::new(ExprKind::If { arms, default }, start.merge(end)))
    }

    fn parse_branch_chunk(&mut self) -> Result<Expr, MsError> {
        let start = self.expect(&Token::Do, "expected 'do' after condition")?;
        let exprs = self.parse_chunk_until(&[Token::End, Token::Elif, Token::Else])?;
        let span = start.merge(self.peek_span());
        Ok(Expr::new(ExprKind::Block(exprs), span))
    }

    fn parse_for(&mut self) -> Result<Expr, MsError> {
        let start = self.expect(&Token::For, "expected 'for'")?;
        let target = self.parse_expression()?;
        self.check_target(&target, target.span)?;
        self.expect(&Token::In, "expected 'in'")?;
        let iterator = self.parse_expression()?;
        let body = self.parse_block()?;
        let span = start.merge(body.span);
        Ok(Expr::new(
            ExprKind::For {
                target: Box::new(target),
                iterator: Box::new(iterator),
                body: Box::new(body),
            },
            span,
        ))
    }

    // ── functions and oracles ────────────────────────────────────────

    fn parse_function(&mut self) -> Result<Expr, MsError> {
        let is_oracle = matches!(self.peek_kind(), Some(Token::Oracle));
        let start = self.advance().unwrap().span;
        let word = if is_oracle { "oracle" } else { "fun" };
        if self.eat_glued(&Token::LParen).is_none() {
            return Err(self.error_here(format!("expected '(' after '{word}'")));
        }
        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            params.push(self.parse_parameter()?);
            while self.eat(&Token::Comma).is_some() {
                params.push(self.parse_parameter()?);
            }
        }
        let close =
            self.expect(&Token::RParen, "expected closing ')' after parameters")?;
        if params.is_empty() {
            // every function is unary at runtime
            params.push(Param {
                name: "_".to_string(),
                ty: TypeExpr::prim(Prim::Null, close),
                span: close,
            });
        }

        let ret_ty = if self.eat(&Token::Arrow).is_some() {
            self.parse_type_expr()?
        } else {
            TypeExpr::prim(Prim::Any, close)
        };

        if is_oracle {
            let examples = if self.eat(&Token::From).is_some() {
                Some(self.parse_expression()?)
            } else {
                None
            };
            let end = examples.as_ref().map(|e| e.span).unwrap_or(ret_ty.span);
            let span = start.merge(end);
            let def = OracleDef {
                params,
                ret_ty,
                examples,
                span,
            };
            return Ok(Expr::new(ExprKind::Oracle(Rc::new(def)), span));
        }

        let body = self.parse_block()?;
        let span = start.merge(body.span);

        // Curry: lower an n-ary literal into nested unary lambdas. The
        // enclosing layers' declared result types are the arrow suffixes,
        // so every application boundary gets checked.
        let mut ret_ty = ret_ty;
        let mut expr = body;
        for param in params.into_iter().rev() {
            let lambda = Lambda {
                param: param.name,
                param_ty: param.ty.clone(),
                ret_ty: ret_ty.clone(),
                body: expr,
                span,
            };
            expr = Expr::new(ExprKind::Lambda(Rc::new(lambda)), span);
            ret_ty = TypeExpr::new(
                TypeExprKind::Arrow(Box::new(param.ty), Box::new(ret_ty)),
                span,
            );
        }
        Ok(expr)
    }

    fn parse_parameter(&mut self) -> Result<Param, MsError> {
        let note = self.eat_annotation();
        let (name, span) = match self.peek_kind().cloned() {
            Some(Token::Ident(name)) => {
                let span = self.advance().unwrap().span;
                (name, span)
            }
            _ => return Err(self.error_here("expected a parameter name")),
        };
        let mut ty = if self.eat(&Token::Colon).is_some() {
            self.parse_type_expr()?
        } else {
            TypeExpr::prim(Prim::Any, span)
        };
        if note.is_some() {
            ty.note = note;
        }
        Ok(Param { name, ty, span })
    }

    // ── type expressions ─────────────────────────────────────────────

    fn parse_type_expr(&mut self) -> Result<TypeExpr, MsError> {
        let note = self.eat_annotation();
        let mut ty = self.parse_type_binary()?;
        if note.is_some() {
            ty.note = note;
        }
        Ok(ty)
    }

    fn parse_type_binary(&mut self) -> Result<TypeExpr, MsError> {
        let left = self.parse_type_unary()?;
        if self.eat(&Token::Arrow).is_some() {
            let right = self.parse_type_expr()?;
            let span = left.span.merge(right.span);
            return Ok(TypeExpr::new(
                TypeExprKind::Arrow(Box::new(left), Box::new(right)),
                span,
            ));
        }
        Ok(left)
    }

    fn parse_type_unary(&mut self) -> Result<TypeExpr, MsError> {
        let ty = self.parse_type_prim()?;
        if let Some(end) = self.eat(&Token::Question) {
            // Any is already nullable
            if matches!(ty.kind, TypeExprKind::Prim(Prim::Any)) {
                return Ok(ty);
            }
            let span = ty.span.merge(end);
            return Ok(TypeExpr::new(TypeExprKind::Option(Box::new(ty)), span));
        }
        Ok(ty)
    }

    fn parse_type_prim(&mut self) -> Result<TypeExpr, MsError> {
        let (kind, span) = match self.peek() {
            Some(tok) => (tok.kind.clone(), tok.span),
            None => return Err(self.error_here("expected a type expression")),
        };
        match kind {
            Token::TyName(name) => {
                let prim = Prim::from_name(&name).expect("lexer produces known type atoms");
                self.advance();
                Ok(TypeExpr::prim(prim, span))
            }
            Token::Ident(name) => {
                self.advance();
                Ok(TypeExpr::new(TypeExprKind::Name(name), span))
            }
            Token::EnumKw => self.parse_type_enum(),
            Token::LBracket => {
                self.advance();
                let inner = self.parse_type_expr()?;
                let end =
                    self.expect(&Token::RBracket, "expected closing ']' after type expression")?;
                Ok(TypeExpr::new(
                    TypeExprKind::Array(Box::new(inner)),
                    span.merge(end),
                ))
            }
            Token::LBrace => self.parse_type_object(),
            Token::LParen => {
                self.advance();
                let inner = self.parse_type_expr()?;
                self.expect(&Token::RParen, "expected ')' after type expression")?;
                Ok(inner)
            }
            _ => Err(self.error_here("expected a type expression")),
        }
    }

    fn parse_type_enum(&mut self) -> Result<TypeExpr, MsError> {
        let start = self.expect(&Token::EnumKw, "expected 'Enum'")?;
        if self.eat(&Token::LParen).is_none() {
            return Err(self.error_here("expected '(' after 'Enum'"));
        }
        let base = self.parse_type_expr()?;
        self.expect(&Token::Comma, "expected ',' after the Enum base type")?;
        let values = self.parse_expression()?;
        let end = self.expect(&Token::RParen, "expected closing ')'")?;
        Ok(TypeExpr::new(
            TypeExprKind::Enum {
                base: Box::new(base),
                values: Box::new(values),
            },
            start.merge(end),
        ))
    }

    fn parse_type_object(&mut self) -> Result<TypeExpr, MsError> {
        let start = self.expect(&Token::LBrace, "expected '{'")?;
        if let Some(end) = self.eat(&Token::RBrace) {
            return Ok(TypeExpr::new(
                TypeExprKind::Object(Vec::new()),
                start.merge(end),
            ));
        }
        let mut fields = vec![self.parse_type_field()?];
        while self.eat(&Token::Comma).is_some() {
            fields.push(self.parse_type_field()?);
        }
        let end = self.expect(&Token::RBrace, "expected closing '}' after type members")?;
        Ok(TypeExpr::new(
            TypeExprKind::Object(fields),
            start.merge(end),
        ))
    }

    fn parse_type_field(&mut self) -> Result<TypeField, MsError> {
        let note = self.eat_annotation();
        let (name, _) = self.parse_key()?;
        let required = self.eat(&Token::Bang).is_some();
        self.expect(&Token::Colon, "expected ':' after member key")?;
        let mut ty = self.parse_type_expr()?;
        if note.is_some() {
            ty.note = note;
        }
        Ok(TypeField { name, required, ty })
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}
