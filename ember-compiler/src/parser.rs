//! Token stream to AST (spec §4.G). Expressions are parsed by precedence
//! climbing — a recursive-descent restatement of the shunting-yard operator
//! table (same precedence levels, same associativity, same output) that
//! reads more naturally in Rust than an explicit two-stack machine.
//! Statements are plain recursive descent.

use crate::ast::{BinOp, Expr, FuncLit, Stmt, UnOp};
use crate::token::{unescape, Lexer, Token, TokenKind};
use ember_core::error::Error;
use ember_core::span::Span;
use ember_runtime::types::int::IntVal;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, Error> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Parser { tokens, pos: 0 })
    }

    /// Parse a whole program: a block of statements, per spec §4.G "A
    /// program is a block of statements."
    pub fn parse_program(&mut self) -> Result<Stmt, Error> {
        let start = self.cur_span();
        let mut stmts = Vec::new();
        self.skip_terms();
        while !self.at_eof() {
            stmts.push(self.parse_stmt()?);
            self.skip_terms();
        }
        let span = start.merge(self.cur_span());
        Ok(Stmt::Block(stmts, span))
    }

    /// Parse a single standalone expression (embed-API convenience: `-e`
    /// scripts are a bare expression per spec §6 CLI surface).
    pub fn parse_expression(&mut self) -> Result<Expr, Error> {
        let expr = self.parse_expr()?;
        self.skip_terms();
        if !self.at_eof() {
            return Err(self.err_here("trailing input after expression"));
        }
        Ok(expr)
    }

    // ---- token cursor helpers ----

    fn cur(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn cur_span(&self) -> Span {
        self.cur().span
    }

    fn kind(&self) -> &TokenKind {
        &self.cur().kind
    }

    fn at_eof(&self) -> bool {
        matches!(self.kind(), TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.kind()) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: TokenKind) -> Result<Token, Error> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.err_here(&format!("expected {kind:?}, found {:?}", self.kind())))
        }
    }

    fn eat_if(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn err_here(&self, message: &str) -> Error {
        Error::syntax(message.to_string()).with_span(self.cur_span())
    }

    fn ident(&mut self) -> Result<String, Error> {
        match self.kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.err_here(&format!("expected identifier, found {other:?}"))),
        }
    }

    /// Newlines and semicolons are freely-skippable statement separators
    /// (spec §4.G: "Newlines, comments, and semicolons are statement
    /// terminators and are freely skipped between statements").
    fn skip_terms(&mut self) {
        while matches!(self.kind(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn is_stmt_end(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof | TokenKind::RBrace
        )
    }

    // ---- statements ----

    fn parse_stmt(&mut self) -> Result<Stmt, Error> {
        match self.kind() {
            TokenKind::KwRet => self.parse_ret(),
            TokenKind::KwIf => self.parse_if(),
            TokenKind::KwWhile => self.parse_while(),
            TokenKind::KwTry => self.parse_try(),
            TokenKind::KwFor => self.parse_for(),
            TokenKind::KwFunc => self.parse_func().map(Stmt::Func),
            TokenKind::KwType => self.parse_type(),
            TokenKind::LBrace => self.parse_block(),
            _ => {
                let expr = self.parse_expr()?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_ret(&mut self) -> Result<Stmt, Error> {
        let start = self.cur_span();
        self.advance();
        let expr = if self.is_stmt_end() {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let span = start.merge(self.cur_span());
        Ok(Stmt::Ret(expr, span))
    }

    /// Consumes the mandatory `then` or `,` separator between an `if`/`elif`
    /// condition and its body (spec §4.G: `if expr (then|,) stmt`).
    fn eat_then_or_comma(&mut self) -> Result<(), Error> {
        if self.eat_if(&TokenKind::KwThen) || self.eat_if(&TokenKind::Comma) {
            Ok(())
        } else {
            Err(self.err_here("expected 'then' or ',' after condition"))
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, Error> {
        let start = self.cur_span();
        self.advance();
        let mut branches = Vec::new();
        let cond = self.parse_expr()?;
        self.eat_then_or_comma()?;
        let body = self.parse_stmt()?;
        branches.push((cond, body));

        loop {
            self.skip_soft_terms_before_continuation();
            if !self.eat_if(&TokenKind::KwElif) {
                break;
            }
            let cond = self.parse_expr()?;
            self.eat_then_or_comma()?;
            let body = self.parse_stmt()?;
            branches.push((cond, body));
        }

        self.skip_soft_terms_before_continuation();
        let else_branch = if self.eat_if(&TokenKind::KwElse) {
            self.eat_if(&TokenKind::Comma);
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };

        let span = start.merge(self.cur_span());
        Ok(Stmt::If {
            branches,
            else_branch,
            span,
        })
    }

    /// Look past newlines/semicolons to see whether an `elif`/`else`/`catch`
    /// continuation follows, without consuming them if it doesn't — these
    /// separators are optional whitespace between clauses, not meaningful
    /// statement boundaries here.
    fn skip_soft_terms_before_continuation(&mut self) {
        let save = self.pos;
        self.skip_terms();
        if !matches!(
            self.kind(),
            TokenKind::KwElif | TokenKind::KwElse | TokenKind::KwCatch
        ) {
            self.pos = save;
        }
    }

    fn parse_while(&mut self) -> Result<Stmt, Error> {
        let start = self.cur_span();
        self.advance();
        let cond = self.parse_expr()?;
        if !(self.eat_if(&TokenKind::KwDo) || self.eat_if(&TokenKind::Comma)) {
            return Err(self.err_here("expected 'do' or ',' after while condition"));
        }
        let body = Box::new(self.parse_stmt()?);
        let span = start.merge(self.cur_span());
        Ok(Stmt::While { cond, body, span })
    }

    fn parse_try(&mut self) -> Result<Stmt, Error> {
        let start = self.cur_span();
        self.advance();
        let body = Box::new(self.parse_stmt()?);

        self.skip_soft_terms_before_continuation();
        self.eat_if(&TokenKind::Comma);
        self.skip_soft_terms_before_continuation();

        let (catch_name, handler) = if self.eat_if(&TokenKind::KwCatch) {
            let name = if let TokenKind::Ident(_) = self.kind() {
                Some(self.ident()?)
            } else {
                None
            };
            (name, Some(Box::new(self.parse_stmt()?)))
        } else {
            (None, None)
        };

        let span = start.merge(self.cur_span());
        Ok(Stmt::Try {
            body,
            catch_name,
            handler,
            span,
        })
    }

    /// `for name (, name)? in expr stmt` (SPEC_FULL supplement 4).
    fn parse_for(&mut self) -> Result<Stmt, Error> {
        let start = self.cur_span();
        self.advance();
        let mut vars = vec![self.ident()?];
        if self.eat_if(&TokenKind::Comma) {
            vars.push(self.ident()?);
        }
        self.eat(TokenKind::KwIn)?;
        let iter = self.parse_expr()?;
        let body = Box::new(self.parse_stmt()?);
        let span = start.merge(self.cur_span());
        Ok(Stmt::For {
            vars,
            iter,
            body,
            span,
        })
    }

    fn parse_func(&mut self) -> Result<FuncLit, Error> {
        let start = self.cur_span();
        self.advance();
        let name = self.ident()?;
        self.eat(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            params.push(self.ident()?);
            while self.eat_if(&TokenKind::Comma) {
                if self.check(&TokenKind::RParen) {
                    break;
                }
                params.push(self.ident()?);
            }
        }
        self.eat(TokenKind::RParen)?;
        let body = Box::new(self.parse_stmt()?);
        let span = start.merge(self.cur_span());
        Ok(FuncLit {
            name,
            params,
            body,
            span,
        })
    }

    fn parse_type(&mut self) -> Result<Stmt, Error> {
        let start = self.cur_span();
        self.advance();
        let name = self.ident()?;
        self.eat(TokenKind::LBrace)?;
        self.skip_terms();
        let mut methods = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if !self.check(&TokenKind::KwFunc) {
                return Err(self.err_here("type body may only contain member functions"));
            }
            methods.push(self.parse_func()?);
            self.skip_terms();
        }
        self.eat(TokenKind::RBrace)?;
        let span = start.merge(self.cur_span());
        Ok(Stmt::Type {
            name,
            methods,
            span,
        })
    }

    fn parse_block(&mut self) -> Result<Stmt, Error> {
        let start = self.cur_span();
        self.eat(TokenKind::LBrace)?;
        self.skip_terms();
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            stmts.push(self.parse_stmt()?);
            self.skip_terms();
        }
        self.eat(TokenKind::RBrace)?;
        let span = start.merge(self.cur_span());
        Ok(Stmt::Block(stmts, span))
    }

    // ---- expressions (precedence climbing) ----

    fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, Error> {
        let lhs = self.parse_or()?;
        if self.check(&TokenKind::Eq) {
            self.advance();
            let rhs = self.parse_assignment()?;
            let span = lhs.span().merge(rhs.span());
            return Ok(Expr::Assign(Box::new(lhs), Box::new(rhs), span));
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_and()?;
        while self.check(&TokenKind::PipePipe) {
            self.advance();
            let rhs = self.parse_and()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs), span);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_comparison()?;
        while self.check(&TokenKind::AmpAmp) {
            self.advance();
            let rhs = self.parse_comparison()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::And(Box::new(lhs), Box::new(rhs), span);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.kind() {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::Ne => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs), span);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs), span);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_power()?;
        loop {
            let op = match self.kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_power()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs), span);
        }
        Ok(lhs)
    }

    /// Right-associative: `a**b**c` parses as `a**(b**c)` (spec §8).
    fn parse_power(&mut self) -> Result<Expr, Error> {
        let lhs = self.parse_unary()?;
        if self.check(&TokenKind::StarStar) {
            self.advance();
            let rhs = self.parse_power()?;
            let span = lhs.span().merge(rhs.span());
            return Ok(Expr::Binary(BinOp::Pow, Box::new(lhs), Box::new(rhs), span));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        let start = self.cur_span();
        if self.eat_if(&TokenKind::Minus) {
            let operand = self.parse_unary()?;
            let span = start.merge(operand.span());
            return Ok(Expr::Unary(UnOp::Neg, Box::new(operand), span));
        }
        if self.eat_if(&TokenKind::Tilde) {
            let operand = self.parse_unary()?;
            let span = start.merge(operand.span());
            return Ok(Expr::Unary(UnOp::Sqig, Box::new(operand), span));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.kind() {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.ident()?;
                    let span = expr.span().merge(self.prev_span());
                    expr = Expr::Attr(Box::new(expr), name, span);
                }
                TokenKind::LParen => {
                    let args = self.parse_paren_args()?;
                    let span = expr.span().merge(self.prev_span());
                    expr = Expr::Call(Box::new(expr), args, span);
                }
                TokenKind::LBracket => {
                    let keys = self.parse_bracket_args()?;
                    let span = expr.span().merge(self.prev_span());
                    expr = Expr::Subscript(Box::new(expr), keys, span);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn prev_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    fn parse_paren_args(&mut self) -> Result<Vec<Expr>, Error> {
        self.eat(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            args.push(self.parse_expr()?);
            while self.eat_if(&TokenKind::Comma) {
                if self.check(&TokenKind::RParen) {
                    break;
                }
                args.push(self.parse_expr()?);
            }
        }
        self.eat(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_bracket_args(&mut self) -> Result<Vec<Expr>, Error> {
        self.eat(TokenKind::LBracket)?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RBracket) {
            args.push(self.parse_expr()?);
            while self.eat_if(&TokenKind::Comma) {
                if self.check(&TokenKind::RBracket) {
                    break;
                }
                args.push(self.parse_expr()?);
            }
        }
        self.eat(TokenKind::RBracket)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let start = self.cur_span();
        match self.kind().clone() {
            TokenKind::Int(digits) => {
                self.advance();
                let big: num_bigint::BigInt = digits
                    .parse()
                    .map_err(|_| Error::syntax("malformed integer literal").with_span(start))?;
                Ok(Expr::Int(IntVal::from_big(big), start))
            }
            TokenKind::Float(digits) => {
                self.advance();
                let v: f64 = digits
                    .parse()
                    .map_err(|_| Error::syntax("malformed float literal").with_span(start))?;
                Ok(Expr::Float(v, start))
            }
            TokenKind::Str(raw) => {
                self.advance();
                let s = unescape(&raw, start)?;
                Ok(Expr::Str(s, start))
            }
            TokenKind::KwTrue => {
                self.advance();
                Ok(Expr::Bool(true, start))
            }
            TokenKind::KwFalse => {
                self.advance();
                Ok(Expr::Bool(false, start))
            }
            TokenKind::KwNone => {
                self.advance();
                Ok(Expr::None(start))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Var(name, start))
            }
            TokenKind::LBracket => {
                let items = self.parse_bracket_args()?;
                let span = start.merge(self.prev_span());
                Ok(Expr::List(items, span))
            }
            TokenKind::LParen => self.parse_paren_or_tuple(start),
            TokenKind::LBrace => self.parse_dict_literal(start),
            other => Err(Error::syntax(format!("unexpected token {other:?}")).with_span(start)),
        }
    }

    /// `{ key: value, ... }` / `{}` (supplemented dict literal, see
    /// `Expr::Dict`).
    fn parse_dict_literal(&mut self, start: Span) -> Result<Expr, Error> {
        self.eat(TokenKind::LBrace)?;
        let mut entries = Vec::new();
        if !self.check(&TokenKind::RBrace) {
            entries.push(self.parse_dict_entry()?);
            while self.eat_if(&TokenKind::Comma) {
                if self.check(&TokenKind::RBrace) {
                    break;
                }
                entries.push(self.parse_dict_entry()?);
            }
        }
        self.eat(TokenKind::RBrace)?;
        let span = start.merge(self.prev_span());
        Ok(Expr::Dict(entries, span))
    }

    fn parse_dict_entry(&mut self) -> Result<(Expr, Expr), Error> {
        let key = self.parse_expr()?;
        self.eat(TokenKind::Colon)?;
        let value = self.parse_expr()?;
        Ok((key, value))
    }

    /// Disambiguates `(x)` (grouped expression) from `(x,)` (one-tuple) and
    /// `(,)` (empty tuple); `()` is a `SyntaxError` (spec §4.G, §8).
    fn parse_paren_or_tuple(&mut self, start: Span) -> Result<Expr, Error> {
        self.eat(TokenKind::LParen)?;

        if self.check(&TokenKind::RParen) {
            return Err(Error::syntax("empty parenthetical group '()' is not valid")
                .with_span(start.merge(self.cur_span())));
        }

        if self.check(&TokenKind::Comma) {
            self.advance();
            self.eat(TokenKind::RParen)?;
            let span = start.merge(self.prev_span());
            return Ok(Expr::Tuple(Vec::new(), span));
        }

        let first = self.parse_expr()?;

        if self.eat_if(&TokenKind::Comma) {
            let mut elems = vec![first];
            while !self.check(&TokenKind::RParen) {
                elems.push(self.parse_expr()?);
                if !self.eat_if(&TokenKind::Comma) {
                    break;
                }
            }
            self.eat(TokenKind::RParen)?;
            let span = start.merge(self.prev_span());
            return Ok(Expr::Tuple(elems, span));
        }

        self.eat(TokenKind::RParen)?;
        Ok(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_expr_str(src: &str) -> Expr {
        Parser::new(src).unwrap().parse_expression().unwrap()
    }

    #[test]
    fn left_associative_subtraction() {
        let e = parse_expr_str("a-b-c");
        match e {
            Expr::Binary(BinOp::Sub, lhs, _, _) => {
                assert!(matches!(*lhs, Expr::Binary(BinOp::Sub, _, _, _)));
            }
            _ => panic!("expected nested Sub"),
        }
    }

    #[test]
    fn right_associative_power() {
        let e = parse_expr_str("a**b**c");
        match e {
            Expr::Binary(BinOp::Pow, _, rhs, _) => {
                assert!(matches!(*rhs, Expr::Binary(BinOp::Pow, _, _, _)));
            }
            _ => panic!("expected nested Pow on the right"),
        }
    }

    #[test]
    fn precedence_respects_mul_over_add() {
        let e = parse_expr_str("1 + 2 * 3");
        match e {
            Expr::Binary(BinOp::Add, lhs, rhs, _) => {
                assert!(matches!(*lhs, Expr::Int(_, _)));
                assert!(matches!(*rhs, Expr::Binary(BinOp::Mul, _, _, _)));
            }
            _ => panic!("expected Add at the top"),
        }
    }

    #[test]
    fn grouped_single_expr_is_not_a_tuple() {
        let e = parse_expr_str("(x)");
        assert!(matches!(e, Expr::Var(_, _)));
    }

    #[test]
    fn trailing_comma_makes_one_tuple() {
        let e = parse_expr_str("(x,)");
        match e {
            Expr::Tuple(items, _) => assert_eq!(items.len(), 1),
            _ => panic!("expected one-tuple"),
        }
    }

    #[test]
    fn comma_paren_is_empty_tuple() {
        let e = parse_expr_str("(,)");
        match e {
            Expr::Tuple(items, _) => assert!(items.is_empty()),
            _ => panic!("expected empty tuple"),
        }
    }

    #[test]
    fn empty_parens_is_syntax_error() {
        let mut p = Parser::new("()").unwrap();
        assert!(p.parse_expression().is_err());
    }

    #[test]
    fn call_and_attribute_chain() {
        let e = parse_expr_str("p.get()");
        match e {
            Expr::Call(callee, args, _) => {
                assert!(args.is_empty());
                assert!(matches!(*callee, Expr::Attr(_, ref name, _) if name == "get"));
            }
            _ => panic!("expected a call over an attribute access"),
        }
    }

    #[test]
    fn subscript_assignment() {
        let e = parse_expr_str("d[\"a\"] = 1");
        assert!(matches!(e, Expr::Assign(_, _, _)));
    }

    #[test]
    fn empty_dict_literal_parses() {
        let e = parse_expr_str("{}");
        match e {
            Expr::Dict(entries, _) => assert!(entries.is_empty()),
            _ => panic!("expected an empty dict literal"),
        }
    }

    #[test]
    fn dict_literal_with_entries_parses() {
        let e = parse_expr_str("{\"a\": 1, \"b\": 2}");
        match e {
            Expr::Dict(entries, _) => assert_eq!(entries.len(), 2),
            _ => panic!("expected a dict literal with two entries"),
        }
    }

    #[test]
    fn program_parses_if_else_scenario() {
        let mut p = Parser::new("x = 5; if x > 0, ret \"pos\" else ret \"neg\"").unwrap();
        let block = p.parse_program().unwrap();
        match block {
            Stmt::Block(stmts, _) => assert_eq!(stmts.len(), 2),
            _ => panic!("expected a block"),
        }
    }

    #[test]
    fn program_parses_for_loop_scenario() {
        let mut p = Parser::new("for k, v in d { s = s + v }").unwrap();
        let block = p.parse_program().unwrap();
        match block {
            Stmt::Block(stmts, _) => match &stmts[0] {
                Stmt::For { vars, .. } => assert_eq!(vars, &vec!["k".to_string(), "v".to_string()]),
                _ => panic!("expected a For statement"),
            },
            _ => panic!("expected a block"),
        }
    }

    #[test]
    fn program_parses_type_literal_scenario() {
        let mut p = Parser::new(
            "type Pt { func init(self, x) { self.x = x } func get(self) { ret self.x } }",
        )
        .unwrap();
        let block = p.parse_program().unwrap();
        match block {
            Stmt::Block(stmts, _) => match &stmts[0] {
                Stmt::Type { name, methods, .. } => {
                    assert_eq!(name, "Pt");
                    assert_eq!(methods.len(), 2);
                }
                _ => panic!("expected a Type statement"),
            },
            _ => panic!("expected a block"),
        }
    }
}
