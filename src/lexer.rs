use crate::error::TranspileError;
use crate::token::{Token, TokenType};

const TAB_WIDTH: usize = 8;

/// The kernelize Lexer
/// Converts host-language source into a stream of tokens, turning leading
/// whitespace into `Indent`/`Dedent` tokens and logical line ends into `Newline`.
pub struct Lexer {
    source: Vec<char>,
    current: usize,
    line: usize,
    column: usize,
    indent_stack: Vec<usize>,
    paren_depth: usize,
    at_line_start: bool,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            current: 0,
            line: 1,
            column: 1,
            indent_stack: vec![0],
            paren_depth: 0,
            at_line_start: true,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, TranspileError> {
        let mut tokens = Vec::new();

        loop {
            if self.at_line_start && self.paren_depth == 0 {
                self.read_indentation(&mut tokens)?;
            }
            self.skip_whitespace();
            if self.is_at_end() {
                break;
            }

            if let Some(token) = self.next_token()? {
                tokens.push(token);
            }
        }

        // Close the last logical line and any open blocks
        if !matches!(
            tokens.last().map(|t| &t.token_type),
            None | Some(TokenType::Newline) | Some(TokenType::Dedent)
        ) {
            tokens.push(Token::new(TokenType::Newline, self.line, self.column));
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            tokens.push(Token::new(TokenType::Dedent, self.line, self.column));
        }

        tokens.push(Token::new(TokenType::Eof, self.line, self.column));
        Ok(tokens)
    }

    /// Measures the indentation of the next non-blank line and emits the
    /// matching `Indent`/`Dedent` tokens. Blank and comment-only lines are skipped.
    fn read_indentation(&mut self, tokens: &mut Vec<Token>) -> Result<(), TranspileError> {
        let width = loop {
            let mut width = 0;
            while !self.is_at_end() {
                match self.peek() {
                    ' ' => {
                        self.advance();
                        width += 1;
                    }
                    '\t' => {
                        self.advance();
                        width = (width / TAB_WIDTH + 1) * TAB_WIDTH;
                    }
                    '\x0c' | '\r' => {
                        self.advance();
                    }
                    _ => break,
                }
            }

            if self.is_at_end() {
                return Ok(());
            }
            match self.peek() {
                '\n' => {
                    self.advance();
                }
                '#' => self.skip_comment(),
                _ => break width,
            }
        };

        self.at_line_start = false;
        let top = self.current_indent();

        if width > top {
            self.indent_stack.push(width);
            tokens.push(Token::new(TokenType::Indent, self.line, self.column));
        } else if width < top {
            while width < self.current_indent() {
                self.indent_stack.pop();
                tokens.push(Token::new(TokenType::Dedent, self.line, self.column));
            }
            if width != self.current_indent() {
                return Err(TranspileError::parse_error(
                    "Unindent does not match any outer indentation level",
                    self.line,
                    self.column,
                ));
            }
        }

        Ok(())
    }

    fn next_token(&mut self) -> Result<Option<Token>, TranspileError> {
        let start_line = self.line;
        let start_column = self.column;

        let ch = self.advance();

        let token_type = match ch {
            '\n' => {
                if self.paren_depth > 0 {
                    // Implicit line joining inside brackets
                    return Ok(None);
                }
                self.at_line_start = true;
                TokenType::Newline
            }
            '#' => {
                self.skip_comment();
                return Ok(None);
            }
            '\\' => {
                if self.peek() == '\r' {
                    self.advance();
                }
                if self.peek() == '\n' {
                    self.advance();
                    return Ok(None);
                }
                return Err(TranspileError::parse_error(
                    "Unexpected character after line continuation",
                    start_line,
                    start_column,
                ));
            }
            '+' => self.operator(TokenType::Plus),
            '-' => {
                if self.peek() == '>' {
                    self.advance();
                    TokenType::Arrow
                } else {
                    self.operator(TokenType::Minus)
                }
            }
            '*' => {
                if self.peek() == '*' {
                    self.advance();
                    self.operator(TokenType::DoubleStar)
                } else {
                    self.operator(TokenType::Star)
                }
            }
            '/' => {
                if self.peek() == '/' {
                    self.advance();
                    self.operator(TokenType::DoubleSlash)
                } else {
                    self.operator(TokenType::Slash)
                }
            }
            '%' => self.operator(TokenType::Percent),
            '@' => self.operator(TokenType::At),
            '^' => self.operator(TokenType::Caret),
            '&' => self.operator(TokenType::Amp),
            '|' => self.operator(TokenType::Pipe),
            '~' => TokenType::Tilde,
            '<' => match self.peek() {
                '<' => {
                    self.advance();
                    self.operator(TokenType::LShift)
                }
                '=' => {
                    self.advance();
                    TokenType::LtEq
                }
                _ => TokenType::Lt,
            },
            '>' => match self.peek() {
                '>' => {
                    self.advance();
                    self.operator(TokenType::RShift)
                }
                '=' => {
                    self.advance();
                    TokenType::GtEq
                }
                _ => TokenType::Gt,
            },
            '=' => {
                if self.peek() == '=' {
                    self.advance();
                    TokenType::Equal
                } else {
                    TokenType::Assign
                }
            }
            '!' => {
                if self.peek() == '=' {
                    self.advance();
                    TokenType::NotEq
                } else {
                    return Err(TranspileError::unexpected_char(ch, start_line, start_column));
                }
            }
            '(' => {
                self.paren_depth += 1;
                TokenType::LParen
            }
            ')' => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                TokenType::RParen
            }
            '[' => {
                self.paren_depth += 1;
                TokenType::LBracket
            }
            ']' => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                TokenType::RBracket
            }
            ',' => TokenType::Comma,
            ':' => TokenType::Colon,
            '.' if self.peek().is_ascii_digit() => self.read_number(ch, start_line, start_column)?,
            '.' => TokenType::Dot,
            '"' | '\'' => TokenType::Str(self.read_string(ch, false, start_line, start_column)?),
            _ if ch.is_alphabetic() || ch == '_' => {
                let identifier = self.read_identifier(ch);
                if is_string_prefix(&identifier) && matches!(self.peek(), '"' | '\'') {
                    let quote = self.advance();
                    let raw = identifier.contains(['r', 'R']);
                    TokenType::Str(self.read_string(quote, raw, start_line, start_column)?)
                } else {
                    self.keyword_or_identifier(identifier)
                }
            }
            _ if ch.is_ascii_digit() => self.read_number(ch, start_line, start_column)?,
            _ => {
                return Err(TranspileError::unexpected_char(ch, start_line, start_column));
            }
        };

        Ok(Some(Token::new(token_type, start_line, start_column)))
    }

    /// Upgrades a binary operator to its augmented form when followed by `=`
    fn operator(&mut self, op: TokenType) -> TokenType {
        if self.peek() == '=' {
            self.advance();
            TokenType::AugAssign(Box::new(op))
        } else {
            op
        }
    }

    fn read_identifier(&mut self, first: char) -> String {
        let mut identifier = String::from(first);

        while !self.is_at_end() {
            let ch = self.peek();
            if ch.is_alphanumeric() || ch == '_' {
                identifier.push(self.advance());
            } else {
                break;
            }
        }

        identifier
    }

    fn read_number(&mut self, first: char, line: usize, column: usize) -> Result<TokenType, TranspileError> {
        let invalid = |message: &str| TranspileError::parse_error(message, line, column);

        if first == '0' && matches!(self.peek(), 'x' | 'X' | 'o' | 'O' | 'b' | 'B') {
            let radix = match self.advance().to_ascii_lowercase() {
                'x' => 16,
                'o' => 8,
                _ => 2,
            };
            let mut digits = String::new();
            while !self.is_at_end() && (self.peek().is_digit(radix) || self.peek() == '_') {
                let ch = self.advance();
                if ch != '_' {
                    digits.push(ch);
                }
            }
            if digits.is_empty() || self.peek().is_alphanumeric() {
                return Err(invalid("Invalid number format"));
            }
            return u64::from_str_radix(&digits, radix)
                .map(TokenType::Integer)
                .map_err(|_| invalid("Integer literal out of range"));
        }

        let mut number = String::from(first);
        let mut is_float = first == '.';

        self.read_digits(&mut number);

        if !is_float && self.peek() == '.' {
            is_float = true;
            number.push(self.advance());
            self.read_digits(&mut number);
        }

        // Exponent part, only when digits actually follow
        if matches!(self.peek(), 'e' | 'E') {
            let sign = matches!(self.peek_at(1), '+' | '-');
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_ascii_digit() {
                is_float = true;
                number.push(self.advance());
                if sign {
                    number.push(self.advance());
                }
                self.read_digits(&mut number);
            }
        }

        if self.peek().is_alphanumeric() || self.peek() == '_' {
            return Err(invalid("Invalid number format"));
        }

        if is_float {
            let value = number
                .parse::<f64>()
                .map_err(|_| invalid("Invalid number format"))?;
            if !value.is_finite() {
                return Err(invalid("Float literal out of range"));
            }
            Ok(TokenType::Float(value))
        } else {
            number
                .parse::<u64>()
                .map(TokenType::Integer)
                .map_err(|_| invalid("Integer literal out of range"))
        }
    }

    /// Reads decimal digits, dropping `_` separators
    fn read_digits(&mut self, number: &mut String) {
        while !self.is_at_end() && (self.peek().is_ascii_digit() || self.peek() == '_') {
            let ch = self.advance();
            if ch != '_' {
                number.push(ch);
            }
        }
    }

    /// Reads a string body; the opening quote has already been consumed.
    fn read_string(&mut self, quote: char, raw: bool, line: usize, column: usize) -> Result<String, TranspileError> {
        let triple = self.peek() == quote && self.peek_at(1) == quote;
        if triple {
            self.advance();
            self.advance();
        }

        let mut value = String::new();
        loop {
            if self.is_at_end() {
                return Err(TranspileError::parse_error("Unterminated string", line, column));
            }
            let ch = self.advance();
            match ch {
                '\n' if !triple => {
                    return Err(TranspileError::parse_error("Unterminated string", line, column));
                }
                _ if ch == quote => {
                    if !triple {
                        break;
                    }
                    if self.peek() == quote && self.peek_at(1) == quote {
                        self.advance();
                        self.advance();
                        break;
                    }
                    value.push(ch);
                }
                '\\' if !self.is_at_end() => {
                    let escaped = self.advance();
                    if raw {
                        value.push('\\');
                        value.push(escaped);
                        continue;
                    }
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '0' => value.push('\0'),
                        '\\' | '\'' | '"' => value.push(escaped),
                        '\n' => {}
                        other => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                }
                _ => value.push(ch),
            }
        }

        Ok(value)
    }

    fn keyword_or_identifier(&self, word: String) -> TokenType {
        match word.as_str() {
            "def" => TokenType::Def,
            "return" => TokenType::Return,
            "pass" => TokenType::Pass,
            "if" => TokenType::If,
            "elif" => TokenType::Elif,
            "else" => TokenType::Else,
            "while" => TokenType::While,
            "for" => TokenType::For,
            "in" => TokenType::In,
            "and" => TokenType::And,
            "or" => TokenType::Or,
            "not" => TokenType::Not,
            "True" => TokenType::True,
            "False" => TokenType::False,
            "None" => TokenType::None,
            _ => TokenType::Identifier(word),
        }
    }

    fn skip_comment(&mut self) {
        while !self.is_at_end() && self.peek() != '\n' {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() {
            let ch = self.peek();
            if ch == ' ' || ch == '\t' || ch == '\r' || ch == '\x0c' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn current_indent(&self) -> usize {
        self.indent_stack.last().copied().unwrap_or(0)
    }

    fn advance(&mut self) -> char {
        let ch = self.source[self.current];
        self.current += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> char {
        self.source.get(self.current + offset).copied().unwrap_or('\0')
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

fn is_string_prefix(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "f" | "rb" | "br" | "fr" | "rf"
    )
}
