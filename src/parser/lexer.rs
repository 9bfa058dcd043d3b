//! Lexer (component D) — byte stream to token stream, including path and
//! shell recognition.
//!
//! ASCII-only (spec Non-goals: no Unicode lexing). Lexemes are truncated
//! at [`MAX_LEXEME_LEN`] bytes, matching the source's fixed 128-byte token
//! buffer.

pub const MAX_LEXEME_LEN: usize = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    Else,
    For,
    Return,
}

fn keyword_for(word: &str) -> Option<Keyword> {
    match word {
        "if" => Some(Keyword::If),
        "else" => Some(Keyword::Else),
        "for" => Some(Keyword::For),
        "return" => Some(Keyword::Return),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberValue {
    Integer(i32),
    Float(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Eof,
    Number,
    Identifier,
    Keyword(Keyword),
    String,
    Path,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Semicolon,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    Ne,
    Plus,
    Minus,
    Star,
    Slash,
    Assign,
    Dot,
    Other(char),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub number_value: Option<NumberValue>,
    pub position: usize,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

/// Recomputes 1-based line/column for `position` by scanning from the
/// start of `input`, matching the source's `ScriptCalculateLineColumn`.
pub fn calculate_line_column(input: &str, position: usize) -> (usize, usize) {
    let mut line = 1usize;
    let mut column = 1usize;
    for &b in input.as_bytes().iter().take(position) {
        if b == b'\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn truncate(s: String) -> String {
        if s.len() > MAX_LEXEME_LEN {
            s.char_indices()
                .take_while(|(i, _)| *i < MAX_LEXEME_LEN)
                .map(|(_, c)| c)
                .collect()
        } else {
            s
        }
    }

    fn make_token(&self, kind: TokenKind, start: usize, lexeme: String, number_value: Option<NumberValue>) -> Token {
        let (line, column) = calculate_line_column(self.input, start);
        Token {
            kind,
            lexeme: Self::truncate(lexeme),
            number_value,
            position: start,
            line,
            column,
        }
    }

    /// `/` is classified as a Path token only when (a) the next char is
    /// not whitespace, end-of-input, or another `/`, AND (b) the previous
    /// non-whitespace char (looking back across spaces/tabs/CR) is
    /// start-of-input, `\n`, `;`, `{`, or `}`. Otherwise `/` is division.
    fn slash_starts_path(&self) -> bool {
        match self.peek_at(1) {
            None => return false,
            Some(b) if is_whitespace(b) || b == b'/' => return false,
            _ => {}
        }
        let mut i = self.pos;
        loop {
            if i == 0 {
                return true;
            }
            let prev = self.bytes[i - 1];
            match prev {
                b' ' | b'\t' | b'\r' => {
                    i -= 1;
                    continue;
                }
                b'\n' | b';' | b'{' | b'}' => return true,
                _ => return false,
            }
        }
    }

    fn lex_path(&mut self, start: usize) -> Token {
        let begin = self.pos;
        while let Some(b) = self.peek() {
            if is_whitespace(b) || b == b';' {
                break;
            }
            self.pos += 1;
        }
        let lexeme = self.input[begin..self.pos].to_string();
        self.make_token(TokenKind::Path, start, lexeme, None)
    }

    fn lex_number(&mut self, start: usize) -> Token {
        let begin = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() || b == b'.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let lexeme = self.input[begin..self.pos].to_string();
        let value = if lexeme.contains('.') {
            NumberValue::Float(lexeme.parse::<f32>().unwrap_or(0.0))
        } else {
            NumberValue::Integer(lexeme.parse::<i32>().unwrap_or(0))
        };
        self.make_token(TokenKind::Number, start, lexeme, Some(value))
    }

    fn lex_identifier(&mut self, start: usize) -> Token {
        let begin = self.pos;
        while let Some(b) = self.peek() {
            if is_ident_continue(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let lexeme = self.input[begin..self.pos].to_string();
        let kind = match keyword_for(&lexeme) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Identifier,
        };
        self.make_token(kind, start, lexeme, None)
    }

    /// Recognised escapes: `\n \r \t \\ \' \"`. Unrecognised escapes
    /// preserve both the backslash and the next char. An unterminated
    /// string ends at end-of-input with whatever was accumulated.
    fn lex_string(&mut self, start: usize) -> Token {
        let quote = self.advance().unwrap();
        let mut out = String::new();
        loop {
            match self.peek() {
                None => break,
                Some(b) if b == quote => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        None => break,
                        Some(b'n') => {
                            out.push('\n');
                            self.pos += 1;
                        }
                        Some(b'r') => {
                            out.push('\r');
                            self.pos += 1;
                        }
                        Some(b't') => {
                            out.push('\t');
                            self.pos += 1;
                        }
                        Some(b'\\') => {
                            out.push('\\');
                            self.pos += 1;
                        }
                        Some(b'\'') => {
                            out.push('\'');
                            self.pos += 1;
                        }
                        Some(b'"') => {
                            out.push('"');
                            self.pos += 1;
                        }
                        Some(other) => {
                            out.push('\\');
                            out.push(other as char);
                            self.pos += 1;
                        }
                    }
                }
                Some(b) => {
                    out.push(b as char);
                    self.pos += 1;
                }
            }
        }
        self.make_token(TokenKind::String, start, out, None)
    }

    /// Byte offset the next call to [`Lexer::next_token`] will resume
    /// scanning from. Used by the parser to rewind after a lookahead peek
    /// and to resynchronize after capturing a verbatim shell-command line.
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn next_token(&mut self) -> Token {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let start = self.pos;
        let Some(b) = self.peek() else {
            return self.make_token(TokenKind::Eof, start, String::new(), None);
        };
        if b == 0 {
            return self.make_token(TokenKind::Eof, start, String::new(), None);
        }
        if b.is_ascii_digit() {
            return self.lex_number(start);
        }
        if is_ident_start(b) {
            return self.lex_identifier(start);
        }
        if b == b'"' || b == b'\'' {
            return self.lex_string(start);
        }
        if b == b'/' {
            if self.slash_starts_path() {
                return self.lex_path(start);
            }
            self.pos += 1;
            return self.make_token(TokenKind::Slash, start, "/".to_string(), None);
        }
        self.pos += 1;
        match b {
            b'(' => self.make_token(TokenKind::LParen, start, "(".to_string(), None),
            b')' => self.make_token(TokenKind::RParen, start, ")".to_string(), None),
            b'[' => self.make_token(TokenKind::LBracket, start, "[".to_string(), None),
            b']' => self.make_token(TokenKind::RBracket, start, "]".to_string(), None),
            b'{' => self.make_token(TokenKind::LBrace, start, "{".to_string(), None),
            b'}' => self.make_token(TokenKind::RBrace, start, "}".to_string(), None),
            b';' => self.make_token(TokenKind::Semicolon, start, ";".to_string(), None),
            b'<' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    self.make_token(TokenKind::Le, start, "<=".to_string(), None)
                } else {
                    self.make_token(TokenKind::Lt, start, "<".to_string(), None)
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    self.make_token(TokenKind::Ge, start, ">=".to_string(), None)
                } else {
                    self.make_token(TokenKind::Gt, start, ">".to_string(), None)
                }
            }
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    self.make_token(TokenKind::Ne, start, "!=".to_string(), None)
                } else {
                    self.make_token(TokenKind::Other('!'), start, "!".to_string(), None)
                }
            }
            b'=' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    self.make_token(TokenKind::EqEq, start, "==".to_string(), None)
                } else {
                    self.make_token(TokenKind::Assign, start, "=".to_string(), None)
                }
            }
            b'+' => self.make_token(TokenKind::Plus, start, "+".to_string(), None),
            b'-' => self.make_token(TokenKind::Minus, start, "-".to_string(), None),
            b'*' => self.make_token(TokenKind::Star, start, "*".to_string(), None),
            b'.' => self.make_token(TokenKind::Dot, start, ".".to_string(), None),
            other => self.make_token(TokenKind::Other(other as char), start, (other as char).to_string(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lex = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let t = lex.next_token();
            let is_eof = t.is_eof();
            out.push(t.kind);
            if is_eof {
                break;
            }
        }
        out
    }

    #[test]
    fn number_with_dot_is_float_not_truncated() {
        let mut lex = Lexer::new("12.5");
        let t = lex.next_token();
        assert_eq!(t.number_value, Some(NumberValue::Float(12.5)));
    }

    #[test]
    fn number_without_dot_is_integer() {
        let mut lex = Lexer::new("42");
        let t = lex.next_token();
        assert_eq!(t.number_value, Some(NumberValue::Integer(42)));
    }

    #[test]
    fn keyword_recognition() {
        assert_eq!(kinds("if"), vec![TokenKind::Keyword(Keyword::If), TokenKind::Eof]);
        assert_eq!(kinds("forest"), vec![TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn slash_at_start_of_input_is_path() {
        let mut lex = Lexer::new("/bin/sh");
        let t = lex.next_token();
        assert_eq!(t.kind, TokenKind::Path);
        assert_eq!(t.lexeme, "/bin/sh");
    }

    #[test]
    fn slash_after_identifier_is_division() {
        let mut lex = Lexer::new("a / b");
        lex.next_token(); // a
        let t = lex.next_token();
        assert_eq!(t.kind, TokenKind::Slash);
    }

    #[test]
    fn slash_after_semicolon_is_path() {
        let mut lex = Lexer::new("x;/bin/sh");
        lex.next_token(); // x
        lex.next_token(); // ;
        let t = lex.next_token();
        assert_eq!(t.kind, TokenKind::Path);
    }

    #[test]
    fn double_slash_is_not_a_path() {
        let mut lex = Lexer::new("//comment");
        let t = lex.next_token();
        assert_eq!(t.kind, TokenKind::Slash);
    }

    #[test]
    fn string_recognizes_escapes_and_preserves_unknown() {
        let mut lex = Lexer::new(r#""a\nb\qc""#);
        let t = lex.next_token();
        assert_eq!(t.kind, TokenKind::String);
        assert_eq!(t.lexeme, "a\nb\\qc");
    }

    #[test]
    fn unterminated_string_ends_at_eof() {
        let mut lex = Lexer::new("\"abc");
        let t = lex.next_token();
        assert_eq!(t.kind, TokenKind::String);
        assert_eq!(t.lexeme, "abc");
    }

    #[test]
    fn lone_equals_is_assign_operator() {
        let mut lex = Lexer::new("=");
        assert_eq!(lex.next_token().kind, TokenKind::Assign);
        let mut lex2 = Lexer::new("==");
        assert_eq!(lex2.next_token().kind, TokenKind::EqEq);
    }
}
