//! Recursive-descent SQL parser.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! select_stmt := 'SELECT' select_list 'FROM' table_ref {join}
//!                [where] [group] [order] [limit]
//! select_list := select_item (',' select_item)*      -- '*' = empty list
//! join        := ['INNER'] 'JOIN' table_ref 'ON' expr
//! expr        := or_expr
//! or_expr     := and_expr ('OR' and_expr)*
//! and_expr    := cmp_expr ('AND' cmp_expr)*
//! cmp_expr    := add_expr [CMP add_expr]             -- non-associative
//! add_expr    := mul_expr (('+'|'-') mul_expr)*
//! mul_expr    := factor (('*'|'/') factor)*
//! factor      := '(' expr ')' | primary
//! primary     := NUMBER | STRING | qualified_ident '(' [expr_list] ')'
//!              | qualified_ident | '*'
//! ```
//!
//! `COUNT(*)` parses as a call whose argument is a column reference named
//! `*`. Errors are fatal at the statement level.

use crate::error::{EngineError, Result};

use super::ast::{BinOp, Expr, Join, OrderByItem, SelectItem, SelectStmt, TableRef};
use super::token::{tokenize, Token};

/// Parse one SELECT statement.
pub fn parse_select(sql: &str) -> Result<SelectStmt> {
    let mut parser = Parser::new(tokenize(sql)?);
    let stmt = parser.select_stmt()?;
    parser.expect(Token::End)?;
    Ok(stmt)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: Token) -> bool {
        if *self.current() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<Token> {
        if *self.current() == token {
            Ok(self.advance())
        } else {
            Err(EngineError::Parse(format!(
                "expected {}, got {}",
                token,
                self.current()
            )))
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.current().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(EngineError::Parse(format!(
                "expected identifier, got {}",
                other
            ))),
        }
    }

    fn select_stmt(&mut self) -> Result<SelectStmt> {
        self.expect(Token::Select)?;
        let select_list = self.select_list()?;
        self.expect(Token::From)?;
        let from = self.table_ref()?;

        let mut joins = Vec::new();
        while matches!(self.current(), Token::Inner | Token::Join) {
            self.eat(Token::Inner);
            self.expect(Token::Join)?;
            let table = self.table_ref()?;
            self.expect(Token::On)?;
            let on = self.expr()?;
            joins.push(Join { table, on });
        }

        let where_clause = if self.eat(Token::Where) {
            Some(self.expr()?)
        } else {
            None
        };

        let mut group_by = Vec::new();
        let mut having = None;
        if self.eat(Token::Group) {
            self.expect(Token::By)?;
            group_by = self.expr_list()?;
            if self.eat(Token::Having) {
                having = Some(self.expr()?);
            }
        }

        let mut order_by = Vec::new();
        if self.eat(Token::Order) {
            self.expect(Token::By)?;
            order_by = self.order_list()?;
        }

        let limit = if self.eat(Token::Limit) {
            Some(self.number_u64()?)
        } else {
            None
        };

        Ok(SelectStmt {
            select_list,
            from,
            joins,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
        })
    }

    /// `*` contributes nothing: `SELECT *` is an empty select list.
    fn select_list(&mut self) -> Result<Vec<SelectItem>> {
        let mut list = Vec::new();
        loop {
            if self.eat(Token::Star) {
                // no item
            } else {
                let expr = self.expr()?;
                let alias = if self.eat(Token::As) {
                    Some(self.expect_ident()?)
                } else {
                    None
                };
                list.push(SelectItem { expr, alias });
            }
            if !self.eat(Token::Comma) {
                break;
            }
        }
        Ok(list)
    }

    fn table_ref(&mut self) -> Result<TableRef> {
        let name = self.expect_ident()?;
        let alias = match self.current().clone() {
            Token::Ident(alias) => {
                self.advance();
                Some(alias)
            }
            _ => None,
        };
        Ok(TableRef { name, alias })
    }

    fn expr(&mut self) -> Result<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut left = self.and_expr()?;
        while self.eat(Token::Or) {
            let right = self.and_expr()?;
            left = Expr::binary(BinOp::Or, left, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut left = self.cmp_expr()?;
        while self.eat(Token::And) {
            let right = self.cmp_expr()?;
            left = Expr::binary(BinOp::And, left, right);
        }
        Ok(left)
    }

    fn cmp_expr(&mut self) -> Result<Expr> {
        let left = self.add_expr()?;
        let op = match self.current() {
            Token::Eq => BinOp::Eq,
            Token::Ne => BinOp::Ne,
            Token::Lt => BinOp::Lt,
            Token::Le => BinOp::Le,
            Token::Gt => BinOp::Gt,
            Token::Ge => BinOp::Ge,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.add_expr()?;
        Ok(Expr::binary(op, left, right))
    }

    fn add_expr(&mut self) -> Result<Expr> {
        let mut left = self.mul_expr()?;
        loop {
            let op = match self.current() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.mul_expr()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn mul_expr(&mut self) -> Result<Expr> {
        let mut left = self.factor()?;
        loop {
            let op = match self.current() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.factor()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Expr> {
        if self.eat(Token::LParen) {
            let expr = self.expr()?;
            self.expect(Token::RParen)?;
            return Ok(expr);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.current().clone() {
            Token::Number(text) => {
                self.advance();
                let value: i64 = text.parse().map_err(|_| {
                    EngineError::Parse(format!("integer literal out of range: {}", text))
                })?;
                Ok(Expr::Int(value))
            }
            Token::StrLit(text) => {
                self.advance();
                Ok(Expr::Str(text))
            }
            // Bare '*' inside an expression is the COUNT(*) argument.
            Token::Star => {
                self.advance();
                Ok(Expr::Column("*".into()))
            }
            Token::Ident(name) => {
                self.advance();
                self.name_or_call(name)
            }
            // Aggregate keywords double as function names.
            Token::Sum => {
                self.advance();
                self.name_or_call("SUM".into())
            }
            Token::Count => {
                self.advance();
                self.name_or_call("COUNT".into())
            }
            Token::Avg => {
                self.advance();
                self.name_or_call("AVG".into())
            }
            other => Err(EngineError::Parse(format!(
                "unexpected {} in expression",
                other
            ))),
        }
    }

    /// A (possibly dot-qualified) name followed optionally by a call
    /// argument list.
    fn name_or_call(&mut self, mut name: String) -> Result<Expr> {
        if self.eat(Token::Dot) {
            let column = self.expect_ident()?;
            name.push('.');
            name.push_str(&column);
        }
        if self.eat(Token::LParen) {
            let mut args = Vec::new();
            if !self.eat(Token::RParen) {
                args = self.expr_list()?;
                self.expect(Token::RParen)?;
            }
            return Ok(Expr::Call { name, args });
        }
        Ok(Expr::Column(name))
    }

    fn expr_list(&mut self) -> Result<Vec<Expr>> {
        let mut list = vec![self.expr()?];
        while self.eat(Token::Comma) {
            list.push(self.expr()?);
        }
        Ok(list)
    }

    fn order_list(&mut self) -> Result<Vec<OrderByItem>> {
        let mut list = Vec::new();
        loop {
            let expr = self.expr()?;
            let asc = if self.eat(Token::Asc) {
                true
            } else if self.eat(Token::Desc) {
                false
            } else {
                true
            };
            list.push(OrderByItem { expr, asc });
            if !self.eat(Token::Comma) {
                break;
            }
        }
        Ok(list)
    }

    fn number_u64(&mut self) -> Result<u64> {
        match self.current().clone() {
            Token::Number(text) => {
                self.advance();
                text.parse().map_err(|_| {
                    EngineError::Parse(format!("limit out of range: {}", text))
                })
            }
            other => Err(EngineError::Parse(format!("expected number, got {}", other))),
        }
    }
}
