//! Recursive-descent parser producing the AST.

use crate::ast::{ColumnDef, Condition, JoinClause, SelectList, SelectStmt, Statement};
use crate::lexer::{tokenize, Token};
use minidb_common::types::{CompareOp, DataType, Value};
use minidb_common::{DbError, Result};

/// Parses one SQL statement, optionally terminated by `;`.
pub fn parse_statement(sql: &str) -> Result<Statement> {
    let tokens = tokenize(sql)?;
    let mut parser = Parser::new(tokens);
    let statement = parser.parse_statement()?;
    parser.expect_end()?;
    Ok(statement)
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
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn unexpected(&self) -> DbError {
        DbError::UnexpectedToken(self.current().to_string())
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.current(), Token::Keyword(k) if k == keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn eat_symbol(&mut self, symbol: char) -> bool {
        if matches!(self.current(), Token::Symbol(c) if *c == symbol) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: char) -> Result<()> {
        if self.eat_symbol(symbol) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.current() {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn expect_end(&mut self) -> Result<()> {
        self.eat_symbol(';');
        if *self.current() == Token::Eof {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        if self.eat_keyword("CREATE") {
            return self.parse_create();
        }
        if self.eat_keyword("INSERT") {
            return self.parse_insert();
        }
        if self.eat_keyword("SELECT") {
            return self.parse_select();
        }
        if self.eat_keyword("BEGIN") {
            return Ok(Statement::Begin);
        }
        if self.eat_keyword("COMMIT") {
            return Ok(Statement::Commit);
        }
        if self.eat_keyword("ABORT") {
            return Ok(Statement::Abort);
        }
        Err(self.unexpected())
    }

    fn parse_create(&mut self) -> Result<Statement> {
        if self.eat_keyword("TABLE") {
            let name = self.expect_ident()?;
            self.expect_symbol('(')?;

            let mut columns = vec![self.parse_column_def()?];
            while self.eat_symbol(',') {
                columns.push(self.parse_column_def()?);
            }
            self.expect_symbol(')')?;

            return Ok(Statement::CreateTable { name, columns });
        }

        if self.eat_keyword("INDEX") {
            let index_name = self.expect_ident()?;
            self.expect_keyword("ON")?;
            let table = self.expect_ident()?;
            self.expect_symbol('(')?;
            let column = self.expect_ident()?;
            self.expect_symbol(')')?;

            return Ok(Statement::CreateIndex {
                index_name,
                table,
                column,
            });
        }

        Err(self.unexpected())
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.expect_ident()?;
        let data_type = self.parse_data_type()?;

        // Nullable unless NOT NULL; a bare NULL is accepted and redundant.
        let nullable = if self.eat_keyword("NOT") {
            self.expect_keyword("NULL")?;
            false
        } else {
            self.eat_keyword("NULL");
            true
        };

        Ok(ColumnDef {
            name,
            data_type,
            nullable,
        })
    }

    fn parse_data_type(&mut self) -> Result<DataType> {
        if self.eat_keyword("INT") || self.eat_keyword("INTEGER") {
            return Ok(DataType::Integer);
        }
        if self.eat_keyword("TEXT") {
            return Ok(DataType::Text);
        }
        if self.eat_keyword("BOOL") || self.eat_keyword("BOOLEAN") {
            return Ok(DataType::Boolean);
        }
        Err(self.unexpected())
    }

    fn parse_insert(&mut self) -> Result<Statement> {
        self.expect_keyword("INTO")?;
        let table = self.expect_ident()?;
        self.expect_keyword("VALUES")?;
        self.expect_symbol('(')?;

        let mut values = vec![self.parse_literal()?];
        while self.eat_symbol(',') {
            values.push(self.parse_literal()?);
        }
        self.expect_symbol(')')?;

        Ok(Statement::Insert { table, values })
    }

    fn parse_select(&mut self) -> Result<Statement> {
        let columns = self.parse_select_list()?;
        self.expect_keyword("FROM")?;
        let table = self.expect_ident()?;

        let join = if self.eat_keyword("JOIN") {
            let join_table = self.expect_ident()?;
            self.expect_keyword("ON")?;
            let left_column = self.parse_column_ref()?;
            match self.current() {
                Token::Operator(op) if op == "=" => self.advance(),
                _ => return Err(self.unexpected()),
            }
            let right_column = self.parse_column_ref()?;

            Some(JoinClause {
                table: join_table,
                left_column,
                right_column,
            })
        } else {
            None
        };

        let where_clause = if self.eat_keyword("WHERE") {
            Some(self.parse_condition()?)
        } else {
            None
        };

        Ok(Statement::Select(SelectStmt {
            columns,
            table,
            join,
            where_clause,
        }))
    }

    fn parse_select_list(&mut self) -> Result<SelectList> {
        if self.eat_symbol('*') {
            return Ok(SelectList::Star);
        }

        let mut columns = vec![self.expect_ident()?];
        while self.eat_symbol(',') {
            columns.push(self.expect_ident()?);
        }
        Ok(SelectList::Columns(columns))
    }

    /// Parses `column` or `table.column`, returning the column name.
    fn parse_column_ref(&mut self) -> Result<String> {
        let first = self.expect_ident()?;
        if self.eat_symbol('.') {
            return self.expect_ident();
        }
        Ok(first)
    }

    // Condition precedence: OR < AND < NOT < primary.

    fn parse_condition(&mut self) -> Result<Condition> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Condition> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("OR") {
            let right = self.parse_and()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Condition> {
        let mut left = self.parse_not()?;
        while self.eat_keyword("AND") {
            let right = self.parse_not()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Condition> {
        if self.eat_keyword("NOT") {
            let inner = self.parse_not()?;
            return Ok(Condition::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Condition> {
        if self.eat_symbol('(') {
            let inner = self.parse_condition()?;
            self.expect_symbol(')')?;
            return Ok(inner);
        }

        let column = self.expect_ident()?;
        let op = self.parse_compare_op()?;
        let value = self.parse_literal()?;
        Ok(Condition::Simple { column, op, value })
    }

    fn parse_compare_op(&mut self) -> Result<CompareOp> {
        let op = match self.current() {
            Token::Operator(op) => match op.as_str() {
                "=" => CompareOp::Eq,
                "!=" | "<>" => CompareOp::NotEq,
                "<" => CompareOp::Lt,
                "<=" => CompareOp::LtEq,
                ">" => CompareOp::Gt,
                ">=" => CompareOp::GtEq,
                _ => return Err(self.unexpected()),
            },
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(op)
    }

    fn parse_literal(&mut self) -> Result<Value> {
        if self.eat_keyword("NULL") {
            return Ok(Value::Null);
        }
        if self.eat_keyword("TRUE") {
            return Ok(Value::Boolean(true));
        }
        if self.eat_keyword("FALSE") {
            return Ok(Value::Boolean(false));
        }

        if matches!(self.current(), Token::Operator(op) if op == "-") {
            self.advance();
            match self.current() {
                Token::Number(n) => {
                    let n = -*n;
                    self.advance();
                    return Ok(Value::Integer(n));
                }
                _ => return Err(self.unexpected()),
            }
        }

        match self.current() {
            Token::Number(n) => {
                let n = *n;
                self.advance();
                Ok(Value::Integer(n))
            }
            Token::Str(s) => {
                let s = s.clone();
                self.advance();
                Ok(Value::Text(s))
            }
            _ => Err(self.unexpected()),
        }
    }
}
