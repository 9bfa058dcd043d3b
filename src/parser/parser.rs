//! Parser (component E) — recursive descent with explicit precedence,
//! producing the AST from `ast::types`. Grammar per spec §4.E:
//!
//! ```text
//! script      = { statement }
//! statement   = if_stmt | for_stmt | return_stmt | block | shell_stmt | assign_or_expr
//! block       = '{' { statement } '}'
//! if_stmt     = 'if' '(' comparison ')' statement [ 'else' statement ]
//! for_stmt    = 'for' '(' assignment ';' comparison ';' assignment ')' statement
//! return_stmt = 'return' comparison
//! assignment  = IDENT [ '[' comparison ']' ] '=' comparison
//! comparison  = expression { ('<'|'<='|'>'|'>='|'=='|'!=') expression }
//! expression  = term       { ('+'|'-') term }
//! term        = factor     { ('*'|'/') factor }
//! factor      = NUMBER | STRING | '(' expression ')' | primary
//! primary     = IDENT [ '(' [ comparison ] ')' ]
//!                     { '[' comparison ']'   (* chained indexing *)
//!                     | '.' IDENT            (* property access *) }
//! ```

use crate::ast::types::*;

use super::lexer::{Keyword, Lexer, NumberValue, Token, TokenKind, MAX_LEXEME_LEN};
use super::types::ParseError;

pub struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self { source, lexer, current }
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    pub fn at_eof(&self) -> bool {
        self.current.is_eof()
    }

    fn syntax_error(&self) -> ParseError {
        ParseError::syntax(self.current.line, self.current.column)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.current.kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.syntax_error())
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match &self.current.kind {
            TokenKind::Identifier => {
                let name = self.current.lexeme.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.syntax_error()),
        }
    }

    /// Parses the whole script: `script = { statement }`, each wrapped by
    /// the mandatory/optional semicolon rule.
    pub fn parse_program(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        while !self.at_eof() {
            stmts.push(self.parse_statement_with_semi()?);
        }
        Ok(stmts)
    }

    fn semicolon_mandatory(stmt: &Stmt) -> bool {
        matches!(stmt, Stmt::Assignment(_) | Stmt::Return(_))
    }

    /// Parses one statement, then enforces spec §4.E's semicolon rule:
    /// mandatory after Assignment/Return, optional (but consumed if
    /// present) after everything else.
    fn parse_statement_with_semi(&mut self) -> Result<Stmt, ParseError> {
        let stmt = self.parse_statement()?;
        if matches!(self.current.kind, TokenKind::Semicolon) {
            self.advance();
        } else if Self::semicolon_mandatory(&stmt) {
            return Err(self.syntax_error());
        }
        Ok(stmt)
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.current.kind {
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::LBrace => self.parse_block(),
            TokenKind::String | TokenKind::Path => self.parse_shell_statement(),
            TokenKind::Identifier => self.parse_identifier_statement(),
            _ => Err(self.syntax_error()),
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.advance(); // 'if'
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_comparison()?;
        self.expect(TokenKind::RParen)?;
        let then_branch = Box::new(self.parse_statement_with_semi()?);
        let else_branch = if matches!(self.current.kind, TokenKind::Keyword(Keyword::Else)) {
            self.advance();
            Some(Box::new(self.parse_statement_with_semi()?))
        } else {
            None
        };
        Ok(Stmt::If(IfStmt {
            condition,
            then_branch,
            else_branch,
        }))
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        self.advance(); // 'for'
        self.expect(TokenKind::LParen)?;
        let init = self.parse_assignment()?;
        self.expect(TokenKind::Semicolon)?;
        let condition = self.parse_comparison()?;
        self.expect(TokenKind::Semicolon)?;
        let increment = self.parse_assignment()?;
        self.expect(TokenKind::RParen)?;
        let body = Box::new(self.parse_statement_with_semi()?);
        Ok(Stmt::For(ForStmt {
            init,
            condition,
            increment,
            body,
        }))
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        self.advance(); // 'return'
        let expr = self.parse_comparison()?;
        Ok(Stmt::Return(expr))
    }

    fn parse_block(&mut self) -> Result<Stmt, ParseError> {
        let (line, column) = (self.current.line, self.current.column);
        self.advance(); // '{'
        let mut stmts = Vec::new();
        loop {
            if matches!(self.current.kind, TokenKind::RBrace) {
                break;
            }
            if self.at_eof() {
                return Err(ParseError::unmatched_brace(line, column));
            }
            stmts.push(self.parse_statement_with_semi()?);
        }
        self.advance(); // '}'
        Ok(Stmt::Block(stmts))
    }

    fn parse_assignment(&mut self) -> Result<Assignment, ParseError> {
        let name = self.expect_identifier()?;
        let index = if matches!(self.current.kind, TokenKind::LBracket) {
            self.advance();
            let idx = self.parse_comparison()?;
            self.expect(TokenKind::RBracket)?;
            Some(idx)
        } else {
            None
        };
        self.expect(TokenKind::Assign)?;
        let value = self.parse_comparison()?;
        Ok(Assignment { name, index, value })
    }

    /// Statement-level dispatch for a leading Identifier token (spec
    /// §4.E): peek one token ahead, then rewind. `=`/`[` means
    /// assignment, `(` means an expression/function-call; otherwise the
    /// shell-command branch is taken, because the `(` case above already
    /// excludes the only condition under which an Identifier statement is
    /// NOT shell-command eligible (spec §9: "Identifier is a shell
    /// command when the next character, skipping spaces/tabs, is not
    /// `(`" — that case was just ruled out).
    fn parse_identifier_statement(&mut self) -> Result<Stmt, ParseError> {
        let rewind_pos = self.lexer.pos();
        let ident_token = self.current.clone();
        self.advance();
        let next_kind = self.current.kind.clone();

        self.lexer.set_pos(rewind_pos);
        self.current = ident_token;

        match next_kind {
            TokenKind::Assign | TokenKind::LBracket => Ok(Stmt::Assignment(self.parse_assignment()?)),
            TokenKind::LParen => Ok(Stmt::Expression(self.parse_comparison()?)),
            _ => self.parse_shell_statement(),
        }
    }

    fn parse_shell_statement(&mut self) -> Result<Stmt, ParseError> {
        let (name, command_line) = self.capture_shell_command()?;
        Ok(Stmt::Expression(Expr::ShellCommand { name, command_line }))
    }

    /// Captures the verbatim command line from the start of the current
    /// token up to the next unquoted `;`, `\n`, or `\r`, trims trailing
    /// spaces/tabs, and extracts the first whitespace/quote-delimited
    /// word as the command name. Repositions the lexer to resume right
    /// after the captured span. Grounded on
    /// `ScriptParseShellCommandExpression` (`Script-Parser-Statements.c`).
    fn capture_shell_command(&mut self) -> Result<(String, String), ParseError> {
        let start = self.current.position;
        let bytes = self.source.as_bytes();
        let mut i = start;
        let mut quote: Option<u8> = None;
        while i < bytes.len() {
            let b = bytes[i];
            if let Some(q) = quote {
                if b == q {
                    quote = None;
                }
                i += 1;
                continue;
            }
            match b {
                b'"' | b'\'' => {
                    quote = Some(b);
                    i += 1;
                }
                b';' | b'\n' | b'\r' => break,
                _ => i += 1,
            }
        }
        let mut end = i;
        while end > start && matches!(bytes[end - 1], b' ' | b'\t') {
            end -= 1;
        }
        if end <= start {
            return Err(self.syntax_error());
        }
        let command_line = self.source[start..end].to_string();
        let name = extract_command_name(&command_line);
        if name.is_empty() {
            return Err(self.syntax_error());
        }
        self.lexer.set_pos(i);
        self.advance();
        Ok((name, command_line))
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_expression()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Lt => CmpOp::Lt,
                TokenKind::Le => CmpOp::Le,
                TokenKind::Gt => CmpOp::Gt,
                TokenKind::Ge => CmpOp::Ge,
                TokenKind::EqEq => CmpOp::Eq,
                TokenKind::Ne => CmpOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.parse_expression()?;
            left = Expr::Comparison {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// `factor = NUMBER | STRING | '(' expression ')' | primary`. Note
    /// the parenthesized case recurses into `expression`, not
    /// `comparison` — comparisons are not re-enterable one level inside
    /// parens, matching `ScriptParseFactorAST` exactly (see SPEC_FULL.md).
    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        match self.current.kind.clone() {
            TokenKind::Number => {
                let value = match self.current.number_value {
                    Some(NumberValue::Integer(i)) => i as f32,
                    Some(NumberValue::Float(f)) => f,
                    None => 0.0,
                };
                self.advance();
                Ok(Expr::Number(value))
            }
            TokenKind::String => {
                let s = self.current.lexeme.clone();
                self.advance();
                Ok(Expr::Str(s))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Identifier => self.parse_primary(),
            _ => Err(self.syntax_error()),
        }
    }

    /// `primary = IDENT [ '(' [comparison] ')' ] { '[' comparison ']' | '.' IDENT }`.
    /// The first `[index]` applied directly to a bare identifier produces
    /// `IndexIdent` (spec §4.E: "uses the Identifier node itself");
    /// everything else — a further index, or any index on a call/property
    /// result — wraps the current expression as a `base_expression`.
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let name = self.expect_identifier()?;
        let mut expr = if matches!(self.current.kind, TokenKind::LParen) {
            self.advance();
            let arg = if matches!(self.current.kind, TokenKind::RParen) {
                None
            } else {
                Some(Box::new(self.parse_comparison()?))
            };
            self.expect(TokenKind::RParen)?;
            Expr::Call { name, arg }
        } else {
            Expr::Identifier(name)
        };

        loop {
            match self.current.kind {
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_comparison()?;
                    self.expect(TokenKind::RBracket)?;
                    expr = match expr {
                        Expr::Identifier(name) => Expr::IndexIdent {
                            name,
                            index: Box::new(index),
                        },
                        other => Expr::Index {
                            base: Box::new(other),
                            index: Box::new(index),
                        },
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_identifier()?;
                    expr = Expr::Property {
                        base: Box::new(expr),
                        name,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
}

fn extract_command_name(line: &str) -> String {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
        i += 1;
    }
    if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
        let quote = bytes[i];
        i += 1;
        let start = i;
        while i < bytes.len() && bytes[i] != quote {
            i += 1;
        }
        return truncate_name(&line[start..i]);
    }
    let start = i;
    while i < bytes.len() && !matches!(bytes[i], b' ' | b'\t' | b'"' | b'\'') {
        i += 1;
    }
    truncate_name(&line[start..i])
}

fn truncate_name(s: &str) -> String {
    if s.len() > MAX_LEXEME_LEN - 1 {
        s.chars().take(MAX_LEXEME_LEN - 1).collect()
    } else {
        s.to_string()
    }
}

/// Parses a complete script source string into a sequence of top-level
/// statements (the root Block's contents).
pub fn parse(source: &str) -> Result<Vec<Stmt>, ParseError> {
    Parser::new(source).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Vec<Stmt> {
        parse(src).unwrap_or_else(|e| panic!("parse failed for {src:?}: {e}"))
    }

    #[test]
    fn simple_assignment() {
        let stmts = parse_ok("a = 1 + 2;");
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0], Stmt::Assignment(_)));
    }

    #[test]
    fn precedence_mul_over_add() {
        let stmts = parse_ok("a = 2 + 3 * 4;");
        match &stmts[0] {
            Stmt::Assignment(a) => assert!(matches!(a.value, Expr::Binary { op: BinOp::Add, .. })),
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn parens_override_precedence() {
        let stmts = parse_ok("b = (2 + 3) * 4;");
        match &stmts[0] {
            Stmt::Assignment(a) => assert!(matches!(a.value, Expr::Binary { op: BinOp::Mul, .. })),
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn for_loop_parses() {
        let stmts = parse_ok("sum = 0; for (i = 0; i < 10; i = i + 1) { sum = sum + i; }");
        assert_eq!(stmts.len(), 2);
        assert!(matches!(stmts[1], Stmt::For(_)));
    }

    #[test]
    fn array_index_assignment() {
        let stmts = parse_ok("arr[0] = 10;");
        match &stmts[0] {
            Stmt::Assignment(a) => assert!(a.index.is_some()),
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn chained_property_and_index_access() {
        let stmts = parse_ok("value = hosts[1].value;");
        match &stmts[0] {
            Stmt::Assignment(a) => assert!(matches!(a.value, Expr::Property { .. })),
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn missing_semicolon_after_assignment_is_syntax_error() {
        assert!(parse("a = 1").is_err());
    }

    #[test]
    fn semicolon_optional_after_if() {
        assert!(parse("if (1) a = 2;").is_ok());
    }

    #[test]
    fn unmatched_brace_is_reported() {
        let err = parse("{ a = 1;").unwrap_err();
        assert_eq!(err.code, crate::interpreter::errors::ErrorCode::UnmatchedBrace);
    }

    #[test]
    fn shell_command_statement() {
        let stmts = parse_ok("/bin/echo hi;");
        match &stmts[0] {
            Stmt::Expression(Expr::ShellCommand { name, command_line }) => {
                assert_eq!(name, "/bin/echo");
                assert_eq!(command_line, "/bin/echo hi");
            }
            other => panic!("expected shell command, got {other:?}"),
        }
    }

    #[test]
    fn function_call_not_treated_as_shell_command() {
        let stmts = parse_ok("foo(1);");
        assert!(matches!(stmts[0], Stmt::Expression(Expr::Call { .. })));
    }
}
