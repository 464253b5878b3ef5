//! SQL lexer.

use minidb_common::{DbError, Result};

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Reserved word, uppercased.
    Keyword(String),
    /// Identifier, case preserved.
    Ident(String),
    /// Integer literal.
    Number(i64),
    /// Single-quoted string literal, quotes stripped.
    Str(String),
    /// Comparison operator or minus sign.
    Operator(String),
    /// Punctuation: `( ) , . ; *`.
    Symbol(char),
    /// End of input.
    Eof,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Keyword(k) => write!(f, "{}", k),
            Token::Ident(i) => write!(f, "{}", i),
            Token::Number(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "'{}'", s),
            Token::Operator(op) => write!(f, "{}", op),
            Token::Symbol(c) => write!(f, "{}", c),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

fn is_keyword(word: &str) -> bool {
    matches!(
        word,
        "CREATE"
            | "TABLE"
            | "INDEX"
            | "ON"
            | "INSERT"
            | "INTO"
            | "VALUES"
            | "SELECT"
            | "FROM"
            | "JOIN"
            | "WHERE"
            | "AND"
            | "OR"
            | "NOT"
            | "NULL"
            | "TRUE"
            | "FALSE"
            | "INT"
            | "INTEGER"
            | "TEXT"
            | "BOOL"
            | "BOOLEAN"
            | "BEGIN"
            | "COMMIT"
            | "ABORT"
    )
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();
        let Some(ch) = self.peek_char() else {
            return Ok(Token::Eof);
        };

        if ch.is_ascii_alphabetic() || ch == '_' {
            return Ok(self.lex_word());
        }
        if ch.is_ascii_digit() {
            return self.lex_number();
        }
        if ch == '\'' {
            return self.lex_string();
        }

        // Two-character operators first
        let rest = &self.input[self.pos..];
        for op in ["!=", "<>", "<=", ">="] {
            if rest.starts_with(op) {
                self.pos += 2;
                return Ok(Token::Operator(op.to_string()));
            }
        }

        self.pos += ch.len_utf8();
        match ch {
            '=' | '<' | '>' | '-' => Ok(Token::Operator(ch.to_string())),
            '(' | ')' | ',' | '.' | ';' | '*' => Ok(Token::Symbol(ch)),
            _ => Err(DbError::UnexpectedToken(format!(
                "character '{}'",
                ch
            ))),
        }
    }

    fn lex_word(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }

        let word = &self.input[start..self.pos];
        let upper = word.to_ascii_uppercase();
        if is_keyword(&upper) {
            Token::Keyword(upper)
        } else {
            Token::Ident(word.to_string())
        }
    }

    fn lex_number(&mut self) -> Result<Token> {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else {
                break;
            }
        }

        let text = &self.input[start..self.pos];
        text.parse::<i64>()
            .map(Token::Number)
            .map_err(|_| DbError::UnexpectedToken(format!("number '{}'", text)))
    }

    fn lex_string(&mut self) -> Result<Token> {
        self.pos += 1; // opening quote
        let mut value = String::new();

        while let Some(c) = self.peek_char() {
            if c == '\'' {
                // A doubled quote is an escaped quote
                if self.input[self.pos + 1..].starts_with('\'') {
                    value.push('\'');
                    self.pos += 2;
                } else {
                    self.pos += 1;
                    return Ok(Token::Str(value));
                }
            } else {
                value.push(c);
                self.pos += c.len_utf8();
            }
        }

        Err(DbError::UnexpectedToken(
            "unterminated string literal".to_string(),
        ))
    }
}

/// Tokenizes `input`, ending with a single `Eof` token.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();

    loop {
        let token = lexer.next_token()?;
        let done = token == Token::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_keywords_case_insensitive() {
        let tokens = tokenize("select From WHERE").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Keyword("SELECT".to_string()),
                Token::Keyword("FROM".to_string()),
                Token::Keyword("WHERE".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_identifiers_preserve_case() {
        let tokens = tokenize("Users user_id _tmp").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("Users".to_string()),
                Token::Ident("user_id".to_string()),
                Token::Ident("_tmp".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_numbers() {
        let tokens = tokenize("0 42 9000000000").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Number(0),
                Token::Number(42),
                Token::Number(9_000_000_000),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_string_literal() {
        let tokens = tokenize("'Alice'").unwrap();
        assert_eq!(tokens[0], Token::Str("Alice".to_string()));
    }

    #[test]
    fn test_tokenize_string_with_doubled_quote() {
        let tokens = tokenize("'O''Brien'").unwrap();
        assert_eq!(tokens[0], Token::Str("O'Brien".to_string()));
    }

    #[test]
    fn test_tokenize_empty_string_literal() {
        let tokens = tokenize("''").unwrap();
        assert_eq!(tokens[0], Token::Str(String::new()));
    }

    #[test]
    fn test_tokenize_unterminated_string() {
        assert!(matches!(
            tokenize("'oops"),
            Err(DbError::UnexpectedToken(_))
        ));
    }

    #[test]
    fn test_tokenize_operators() {
        let tokens = tokenize("= != <> < <= > >= -").unwrap();
        let ops: Vec<String> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Operator(op) => Some(op.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(ops, vec!["=", "!=", "<>", "<", "<=", ">", ">=", "-"]);
    }

    #[test]
    fn test_tokenize_symbols() {
        let tokens = tokenize("( ) , . ; *").unwrap();
        let symbols: Vec<char> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Symbol(c) => Some(*c),
                _ => None,
            })
            .collect();
        assert_eq!(symbols, vec!['(', ')', ',', '.', ';', '*']);
    }

    #[test]
    fn test_tokenize_statement() {
        let tokens = tokenize("SELECT * FROM users WHERE id = 1").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Keyword("SELECT".to_string()),
                Token::Symbol('*'),
                Token::Keyword("FROM".to_string()),
                Token::Ident("users".to_string()),
                Token::Keyword("WHERE".to_string()),
                Token::Ident("id".to_string()),
                Token::Operator("=".to_string()),
                Token::Number(1),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_no_spaces() {
        let tokens = tokenize("id>=10").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("id".to_string()),
                Token::Operator(">=".to_string()),
                Token::Number(10),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_rejects_unknown_character() {
        assert!(matches!(tokenize("a @ b"), Err(DbError::UnexpectedToken(_))));
    }

    #[test]
    fn test_tokenize_empty_input() {
        assert_eq!(tokenize("   ").unwrap(), vec![Token::Eof]);
    }
}
