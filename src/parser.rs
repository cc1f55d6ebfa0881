use crate::ast::*;
use crate::error::TranspileError;
use crate::token::{Token, TokenType};

/// Parser for the host-language subset
/// Converts a stream of tokens into a `Module` of function definitions
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, current: 0 }
    }

    /// Parse a complete source file
    pub fn parse(&mut self) -> Result<Module, TranspileError> {
        let mut module = Module::new();

        while !self.is_at_end() {
            match self.peek().token_type {
                TokenType::Newline => self.advance(),
                TokenType::Def => module.functions.push(self.parse_function()?),
                _ => {
                    return Err(self.error(format!(
                        "Expected 'def' at top level, but found {}",
                        self.peek().token_type
                    )));
                }
            }
        }

        Ok(module)
    }

    /// Parse a function definition
    fn parse_function(&mut self) -> Result<FunctionSpec, TranspileError> {
        self.consume(TokenType::Def, "Expected 'def'")?;
        let name = self.parse_identifier("Expected function name")?;
        self.consume(TokenType::LParen, "Expected '('")?;

        let mut params: Vec<Parameter> = Vec::new();
        while !matches!(self.peek().token_type, TokenType::RParen) {
            let position = self.peek();
            let param_name = self.parse_identifier("Expected parameter name")?;
            if params.iter().any(|p| p.name == param_name) {
                return Err(TranspileError::parse_error(
                    format!("Duplicate parameter '{}'", param_name),
                    position.line,
                    position.column,
                ));
            }

            let annotation = if matches!(self.peek().token_type, TokenType::Colon) {
                self.advance();
                Some(self.parse_expression()?)
            } else {
                None
            };
            params.push(Parameter {
                name: param_name,
                annotation,
            });

            if !matches!(self.peek().token_type, TokenType::Comma) {
                break;
            }
            self.advance();
        }
        self.consume(TokenType::RParen, "Expected ')'")?;

        // Return annotations carry no meaning for a kernel
        if matches!(self.peek().token_type, TokenType::Arrow) {
            self.advance();
            self.parse_expression()?;
        }
        self.consume(TokenType::Colon, "Expected ':' after function signature")?;

        let body = self.parse_suite()?;

        Ok(FunctionSpec { name, params, body })
    }

    /// Parse an indented block, or a single statement on the header line
    fn parse_suite(&mut self) -> Result<Vec<Statement>, TranspileError> {
        if !matches!(self.peek().token_type, TokenType::Newline) {
            return Ok(vec![self.parse_simple_statement()?]);
        }
        self.advance();
        self.consume(TokenType::Indent, "Expected an indented block")?;

        let mut statements = Vec::new();
        while !matches!(self.peek().token_type, TokenType::Dedent) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        self.consume(TokenType::Dedent, "Expected end of indented block")?;
        Ok(statements)
    }

    /// Parse a single statement
    fn parse_statement(&mut self) -> Result<Statement, TranspileError> {
        match self.peek().token_type {
            TokenType::If => self.parse_if_statement(),
            TokenType::While => self.parse_while_statement(),
            TokenType::For => self.parse_for_statement(),
            _ => self.parse_simple_statement(),
        }
    }

    /// Parse a statement that fits on one logical line
    fn parse_simple_statement(&mut self) -> Result<Statement, TranspileError> {
        let statement = match self.peek().token_type {
            TokenType::Return => {
                self.advance();
                if matches!(self.peek().token_type, TokenType::Newline) {
                    Statement::Return(None)
                } else {
                    Statement::Return(Some(self.parse_expression()?))
                }
            }
            TokenType::Pass => {
                self.advance();
                Statement::Pass
            }
            _ => {
                let start = self.peek();
                let expr = self.parse_expression()?;

                match self.peek().token_type {
                    TokenType::Assign => {
                        self.advance();
                        Self::check_target(&expr, &start)?;
                        let value = self.parse_expression()?;
                        if matches!(self.peek().token_type, TokenType::Assign) {
                            return Err(self.error("Chained assignment is not supported"));
                        }
                        Statement::Assign { target: expr, value }
                    }
                    TokenType::AugAssign(ref token) => {
                        let op = binary_operator(token)
                            .ok_or_else(|| self.error("Unknown augmented assignment"))?;
                        self.advance();
                        Self::check_target(&expr, &start)?;
                        let value = self.parse_expression()?;
                        Statement::AugAssign { target: expr, op, value }
                    }
                    _ => Statement::Expr(expr),
                }
            }
        };

        if matches!(self.peek().token_type, TokenType::Comma) {
            return Err(self.error("Tuple expressions are not supported"));
        }
        self.consume(TokenType::Newline, "Expected end of line")?;
        Ok(statement)
    }

    /// Parse if/elif/else; `elif` becomes a nested `If` in the else branch
    fn parse_if_statement(&mut self) -> Result<Statement, TranspileError> {
        self.advance(); // 'if' or 'elif'
        let condition = self.parse_expression()?;
        self.consume(TokenType::Colon, "Expected ':' after if condition")?;
        let body = self.parse_suite()?;

        let orelse = match self.peek().token_type {
            TokenType::Elif => vec![self.parse_if_statement()?],
            TokenType::Else => {
                self.advance();
                self.consume(TokenType::Colon, "Expected ':' after else")?;
                self.parse_suite()?
            }
            _ => Vec::new(),
        };

        Ok(Statement::If { condition, body, orelse })
    }

    /// Parse a while loop: while <cond>: body
    fn parse_while_statement(&mut self) -> Result<Statement, TranspileError> {
        self.consume(TokenType::While, "Expected 'while'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenType::Colon, "Expected ':' after while condition")?;
        let body = self.parse_suite()?;
        Ok(Statement::While { condition, body })
    }

    /// Parse a for loop: for <target> in <iter>: body
    fn parse_for_statement(&mut self) -> Result<Statement, TranspileError> {
        self.consume(TokenType::For, "Expected 'for'")?;
        let target = self.parse_expression()?;
        self.consume(TokenType::In, "Expected 'in' after for target")?;
        let iter = self.parse_expression()?;
        self.consume(TokenType::Colon, "Expected ':' after for header")?;
        let body = self.parse_suite()?;
        Ok(Statement::For { target, iter, body })
    }

    fn check_target(target: &Expression, start: &Token) -> Result<(), TranspileError> {
        if target.is_assignable() {
            return Ok(());
        }
        Err(TranspileError::parse_error(
            format!("Cannot assign to {}", target.kind()),
            start.line,
            start.column,
        ))
    }

    /// Parse an expression with operator precedence
    fn parse_expression(&mut self) -> Result<Expression, TranspileError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expression, TranspileError> {
        self.parse_binary_level(Self::parse_and, |t| match t {
            TokenType::Or => Some(BinaryOperator::Or),
            _ => None,
        })
    }

    fn parse_and(&mut self) -> Result<Expression, TranspileError> {
        self.parse_binary_level(Self::parse_not, |t| match t {
            TokenType::And => Some(BinaryOperator::And),
            _ => None,
        })
    }

    fn parse_not(&mut self) -> Result<Expression, TranspileError> {
        if matches!(self.peek().token_type, TokenType::Not) {
            self.advance();
            let expr = self.parse_not()?;
            return Ok(Expression::UnaryOp {
                op: UnaryOperator::Not,
                expr: Box::new(expr),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression, TranspileError> {
        self.parse_binary_level(Self::parse_bit_or, |t| match t {
            TokenType::Equal => Some(BinaryOperator::Equal),
            TokenType::NotEq => Some(BinaryOperator::NotEqual),
            TokenType::Lt => Some(BinaryOperator::Less),
            TokenType::Gt => Some(BinaryOperator::Greater),
            TokenType::LtEq => Some(BinaryOperator::LessEq),
            TokenType::GtEq => Some(BinaryOperator::GreaterEq),
            _ => None,
        })
    }

    fn parse_bit_or(&mut self) -> Result<Expression, TranspileError> {
        self.parse_binary_level(Self::parse_bit_xor, |t| match t {
            TokenType::Pipe => Some(BinaryOperator::BitOr),
            _ => None,
        })
    }

    fn parse_bit_xor(&mut self) -> Result<Expression, TranspileError> {
        self.parse_binary_level(Self::parse_bit_and, |t| match t {
            TokenType::Caret => Some(BinaryOperator::BitXor),
            _ => None,
        })
    }

    fn parse_bit_and(&mut self) -> Result<Expression, TranspileError> {
        self.parse_binary_level(Self::parse_shift, |t| match t {
            TokenType::Amp => Some(BinaryOperator::BitAnd),
            _ => None,
        })
    }

    fn parse_shift(&mut self) -> Result<Expression, TranspileError> {
        self.parse_binary_level(Self::parse_term, |t| match t {
            TokenType::LShift => Some(BinaryOperator::LShift),
            TokenType::RShift => Some(BinaryOperator::RShift),
            _ => None,
        })
    }

    fn parse_term(&mut self) -> Result<Expression, TranspileError> {
        self.parse_binary_level(Self::parse_factor, |t| match t {
            TokenType::Plus => Some(BinaryOperator::Add),
            TokenType::Minus => Some(BinaryOperator::Sub),
            _ => None,
        })
    }

    fn parse_factor(&mut self) -> Result<Expression, TranspileError> {
        self.parse_binary_level(Self::parse_unary, |t| match t {
            TokenType::Star => Some(BinaryOperator::Mul),
            TokenType::Slash => Some(BinaryOperator::Div),
            TokenType::DoubleSlash => Some(BinaryOperator::FloorDiv),
            TokenType::Percent => Some(BinaryOperator::Mod),
            TokenType::At => Some(BinaryOperator::MatMul),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Expression, TranspileError> {
        let op = match self.peek().token_type {
            TokenType::Minus => UnaryOperator::Neg,
            TokenType::Plus => UnaryOperator::Pos,
            TokenType::Tilde => UnaryOperator::Invert,
            _ => return self.parse_power(),
        };
        self.advance();
        let expr = self.parse_unary()?;
        Ok(Expression::UnaryOp {
            op,
            expr: Box::new(expr),
        })
    }

    /// `**` binds tighter than unary minus on its left and is right-associative
    fn parse_power(&mut self) -> Result<Expression, TranspileError> {
        let base = self.parse_postfix()?;
        if matches!(self.peek().token_type, TokenType::DoubleStar) {
            self.advance();
            let exponent = self.parse_unary()?;
            return Ok(Expression::binary(base, BinaryOperator::Pow, exponent));
        }
        Ok(base)
    }

    fn parse_binary_level(
        &mut self,
        operand: fn(&mut Self) -> Result<Expression, TranspileError>,
        operator: fn(&TokenType) -> Option<BinaryOperator>,
    ) -> Result<Expression, TranspileError> {
        let mut expr = operand(self)?;

        while let Some(op) = operator(&self.peek().token_type) {
            self.advance();
            let right = operand(self)?;
            expr = Expression::binary(expr, op, right);
        }

        Ok(expr)
    }

    fn parse_postfix(&mut self) -> Result<Expression, TranspileError> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek().token_type {
                TokenType::LBracket => {
                    self.advance(); // consume '['
                    let index = self.parse_expression()?;
                    if matches!(self.peek().token_type, TokenType::Colon | TokenType::Comma) {
                        return Err(self.error("Slices and multi-dimensional subscripts are not supported"));
                    }
                    self.consume(TokenType::RBracket, "Expected ']' after index expression")?;
                    expr = Expression::subscript(expr, index);
                }
                TokenType::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    while !matches!(self.peek().token_type, TokenType::RParen) {
                        args.push(self.parse_expression()?);
                        if !matches!(self.peek().token_type, TokenType::Comma) {
                            break;
                        }
                        self.advance();
                    }
                    self.consume(TokenType::RParen, "Expected ')'")?;
                    expr = Expression::Call {
                        func: Box::new(expr),
                        args,
                    };
                }
                TokenType::Dot => {
                    self.advance();
                    let attr = self.parse_identifier("Expected attribute name after '.'")?;
                    expr = Expression::Attribute {
                        value: Box::new(expr),
                        attr,
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression, TranspileError> {
        match self.peek().token_type {
            TokenType::Integer(n) => {
                self.advance();
                Ok(Expression::Number(Literal::Int(n)))
            }
            TokenType::Float(n) => {
                self.advance();
                Ok(Expression::Number(Literal::Float(n)))
            }
            TokenType::Str(_) => {
                // Adjacent string literals concatenate
                let mut value = String::new();
                while let TokenType::Str(ref s) = self.peek().token_type {
                    value.push_str(s);
                    self.advance();
                }
                Ok(Expression::Str(value))
            }
            TokenType::Identifier(ref name) => {
                let name = name.clone();
                self.advance();
                Ok(Expression::Name(name))
            }
            TokenType::True => {
                self.advance();
                Ok(Expression::Bool(true))
            }
            TokenType::False => {
                self.advance();
                Ok(Expression::Bool(false))
            }
            TokenType::None => {
                self.advance();
                Ok(Expression::NoneLiteral)
            }
            TokenType::LParen => {
                self.advance();
                if matches!(self.peek().token_type, TokenType::RParen) {
                    return Err(self.error("Tuple expressions are not supported"));
                }
                let expr = self.parse_expression()?;
                if matches!(self.peek().token_type, TokenType::Comma) {
                    return Err(self.error("Tuple expressions are not supported"));
                }
                self.consume(TokenType::RParen, "Expected ')'")?;
                Ok(expr)
            }
            _ => Err(self.error(format!("Unexpected token: {}", self.peek().token_type))),
        }
    }

    // Helper methods

    fn parse_identifier(&mut self, message: &str) -> Result<String, TranspileError> {
        match self.peek().token_type {
            TokenType::Identifier(ref name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(message)),
        }
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<(), TranspileError> {
        if std::mem::discriminant(&self.peek().token_type) == std::mem::discriminant(&token_type) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn error(&self, message: impl Into<String>) -> TranspileError {
        let token = self.peek();
        TranspileError::parse_error(message, token.line, token.column)
    }

    fn peek(&self) -> Token {
        self.tokens.get(self.current)
            .cloned()
            .unwrap_or_else(|| Token::new(TokenType::Eof, 0, 0))
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::Eof)
    }
}

/// Maps an operator token (also the payload of an augmented assignment) to its AST operator
fn binary_operator(token: &TokenType) -> Option<BinaryOperator> {
    match token {
        TokenType::Plus => Some(BinaryOperator::Add),
        TokenType::Minus => Some(BinaryOperator::Sub),
        TokenType::Star => Some(BinaryOperator::Mul),
        TokenType::Slash => Some(BinaryOperator::Div),
        TokenType::DoubleSlash => Some(BinaryOperator::FloorDiv),
        TokenType::Percent => Some(BinaryOperator::Mod),
        TokenType::DoubleStar => Some(BinaryOperator::Pow),
        TokenType::At => Some(BinaryOperator::MatMul),
        TokenType::Caret => Some(BinaryOperator::BitXor),
        TokenType::Amp => Some(BinaryOperator::BitAnd),
        TokenType::Pipe => Some(BinaryOperator::BitOr),
        TokenType::LShift => Some(BinaryOperator::LShift),
        TokenType::RShift => Some(BinaryOperator::RShift),
        _ => None,
    }
}
