use std::collections::HashMap;

use crate::ast::{Expr, Function, Item, Prototype};
use crate::lexer::{Lexer, Token};

/// Syntactic failures. Lexical failures do not exist (every character
/// scans to some token), and nothing here panics on bad input: a failed
/// sub-parse propagates up to the enclosing top-level construct, where
/// the driver decides recovery.
#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum ParserError {
    #[error("unknown token when expecting an expression (found {0})")]
    ExpectedExpression(Token),
    #[error("expected ')' (found {0})")]
    ExpectedCloseParen(Token),
    #[error("expected ')' or ',' in argument list (found {0})")]
    ExpectedArgumentSeparator(Token),
    #[error("expected function name in prototype (found {0})")]
    ExpectedFunctionName(Token),
    #[error("expected '(' in prototype (found {0})")]
    ExpectedProtoOpenParen(Token),
    #[error("expected ')' in prototype (found {0})")]
    ExpectedProtoCloseParen(Token),
}

pub type ParseResult<T> = Result<T, ParserError>;

/// One parse session: the scanner, a single token of lookahead, and the
/// operator precedence table. Sessions are independent - nothing is
/// process-wide, so separate inputs can be parsed without
/// cross-contamination.
pub struct Parser<I: Iterator<Item = char>> {
    lexer: Lexer<I>,
    current: Token,
    op_precedence: HashMap<char, i32>,
}

impl<'a> Parser<std::str::Chars<'a>> {
    pub fn from_source(source: &'a str) -> Self {
        Parser::new(Lexer::new(source.chars()))
    }
}

impl<I: Iterator<Item = char>> Parser<I> {
    pub fn new(mut lexer: Lexer<I>) -> Self {
        let current = lexer.next_token();
        let mut op_precedence = HashMap::new();
        op_precedence.insert('<', 10);
        op_precedence.insert('+', 20);
        op_precedence.insert('-', 20);
        op_precedence.insert('*', 40);
        Parser {
            lexer,
            current,
            op_precedence,
        }
    }

    /// Declare `op` as an infix operator with the given binding strength
    /// (higher binds tighter). A non-positive precedence undeclares it.
    /// Hosts extend the baseline table through this before parsing.
    pub fn define_operator(&mut self, op: char, precedence: i32) {
        self.op_precedence.insert(op, precedence);
    }

    /// The lookahead token: already fetched, not yet consumed.
    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Discard the current token. Drivers call this after a failed
    /// [`Parser::parse_item`] to skip past the offending token and resume.
    pub fn synchronize(&mut self) {
        self.advance();
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    // Binding strength of the pending token, -1 if it is not a declared
    // infix operator. Table entries <= 0 count as undeclared.
    fn current_precedence(&self) -> i32 {
        match self.current {
            Token::Char(op) => match self.op_precedence.get(&op) {
                Some(&prec) if prec > 0 => prec,
                _ => -1,
            },
            _ => -1,
        }
    }

    /// Parse the next top-level construct, skipping `;` delimiters.
    /// `Ok(None)` means the input is exhausted.
    pub fn parse_item(&mut self) -> ParseResult<Option<Item>> {
        while self.current == Token::Char(';') {
            self.advance();
        }
        match self.current {
            Token::Eof => Ok(None),
            Token::Def => self
                .parse_definition()
                .map(|func| Some(Item::Function(func))),
            Token::Extern => self.parse_extern().map(|proto| Some(Item::Extern(proto))),
            _ => self
                .parse_top_level_expr()
                .map(|func| Some(Item::Function(func))),
        }
    }

    /// definition ::= "def" prototype expression
    pub fn parse_definition(&mut self) -> ParseResult<Function> {
        self.advance(); // eat 'def'
        let proto = self.parse_prototype()?;
        let body = self.parse_expression()?;
        Ok(Function { proto, body })
    }

    /// extern ::= "extern" prototype
    pub fn parse_extern(&mut self) -> ParseResult<Prototype> {
        self.advance(); // eat 'extern'
        self.parse_prototype()
    }

    /// A bare expression at the top level becomes the body of a function
    /// under an anonymous (empty-name, zero-parameter) prototype, so every
    /// top-level construct normalizes to the same shape.
    pub fn parse_top_level_expr(&mut self) -> ParseResult<Function> {
        let body = self.parse_expression()?;
        let proto = Prototype {
            name: String::new(),
            params: Vec::new(),
        };
        Ok(Function { proto, body })
    }

    /// prototype ::= identifier "(" identifier* ")"
    fn parse_prototype(&mut self) -> ParseResult<Prototype> {
        let name = match &self.current {
            Token::Ident(name) => name.clone(),
            _ => return Err(ParserError::ExpectedFunctionName(self.current.clone())),
        };
        self.advance(); // eat the function name

        if self.current != Token::Char('(') {
            return Err(ParserError::ExpectedProtoOpenParen(self.current.clone()));
        }
        self.advance(); // eat '('

        // parameter names are plain identifiers; duplicates are not our
        // problem to reject
        let mut params = Vec::new();
        while let Token::Ident(param) = &self.current {
            params.push(param.clone());
            self.advance();
        }

        if self.current != Token::Char(')') {
            return Err(ParserError::ExpectedProtoCloseParen(self.current.clone()));
        }
        self.advance(); // eat ')'

        Ok(Prototype { name, params })
    }

    /// expression ::= primary (binop primary)*, precedence-resolved
    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        let lhs = self.parse_primary()?;
        self.parse_bin_op_rhs(0, lhs)
    }

    /// primary ::= number | identifier-ref | call | "(" expression ")"
    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match &self.current {
            Token::Number(_) => self.parse_number_expr(),
            Token::Ident(_) => self.parse_identifier_expr(),
            Token::Char('(') => self.parse_paren_expr(),
            _ => Err(ParserError::ExpectedExpression(self.current.clone())),
        }
    }

    // Precedence climbing. Consumes `(binop primary)` pairs as long as the
    // pending operator binds at least as tightly as `min_prec`, folding
    // them into `lhs` left to right; when the operator after a candidate
    // rhs binds strictly tighter, that rhs is first extended recursively
    // at `prec + 1`. Equal-precedence operators therefore associate left.
    // Recursion depth tracks the number of precedence levels climbed, not
    // input length.
    fn parse_bin_op_rhs(&mut self, min_prec: i32, mut lhs: Expr) -> ParseResult<Expr> {
        loop {
            let prec = self.current_precedence();
            if prec < min_prec {
                return Ok(lhs);
            }

            let op = match self.current {
                Token::Char(op) => op,
                _ => unreachable!("positive precedence implies an operator token"),
            };
            self.advance(); // eat the operator

            let mut rhs = self.parse_primary()?;

            if prec < self.current_precedence() {
                rhs = self.parse_bin_op_rhs(prec + 1, rhs)?;
            }

            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_number_expr(&mut self) -> ParseResult<Expr> {
        let val = match self.current {
            Token::Number(val) => val,
            _ => unreachable!("caller checked for a number token"),
        };
        self.advance(); // eat the number
        Ok(Expr::Number(val))
    }

    // identifierexpr ::= identifier | identifier "(" (expression ",")* ")"
    fn parse_identifier_expr(&mut self) -> ParseResult<Expr> {
        let name = match &self.current {
            Token::Ident(name) => name.clone(),
            _ => unreachable!("caller checked for an identifier token"),
        };
        self.advance(); // eat the identifier

        if self.current != Token::Char('(') {
            return Ok(Expr::Variable(name));
        }
        self.advance(); // eat '('

        let mut args = Vec::new();
        if self.current != Token::Char(')') {
            loop {
                args.push(self.parse_expression()?);
                if self.current == Token::Char(')') {
                    break;
                }
                if self.current != Token::Char(',') {
                    return Err(ParserError::ExpectedArgumentSeparator(self.current.clone()));
                }
                self.advance(); // eat ','
            }
        }
        self.advance(); // eat ')'

        Ok(Expr::Call { callee: name, args })
    }

    // parenexpr ::= "(" expression ")" - grouping only, no tree node.
    // Recursion depth here equals the nesting depth of the input.
    fn parse_paren_expr(&mut self) -> ParseResult<Expr> {
        self.advance(); // eat '('
        let inner = self.parse_expression()?;
        if self.current != Token::Char(')') {
            return Err(ParserError::ExpectedCloseParen(self.current.clone()));
        }
        self.advance(); // eat ')'
        Ok(inner)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse_expr(input: &str) -> Expr {
        Parser::from_source(input).parse_expression().unwrap()
    }

    fn num(val: f64) -> Expr {
        Expr::Number(val)
    }

    fn var(name: &str) -> Expr {
        Expr::Variable(name.to_string())
    }

    fn bin(op: char, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    #[test]
    fn multiplication_binds_tighter() {
        assert_eq!(
            parse_expr("1 + 2 * 3"),
            bin('+', num(1.0), bin('*', num(2.0), num(3.0)))
        );
    }

    #[test]
    fn equal_precedence_associates_left() {
        assert_eq!(
            parse_expr("1 - 2 - 3"),
            bin('-', bin('-', num(1.0), num(2.0)), num(3.0))
        );
    }

    #[test]
    fn parentheses_group_without_a_node() {
        assert_eq!(
            parse_expr("(1 + 2) * 3"),
            bin('*', bin('+', num(1.0), num(2.0)), num(3.0))
        );
    }

    #[test]
    fn comparison_binds_loosest() {
        assert_eq!(
            parse_expr("x < y + 1"),
            bin('<', var("x"), bin('+', var("y"), num(1.0)))
        );
    }

    #[test]
    fn calls() {
        assert_eq!(
            parse_expr("foo(1, 2)"),
            Expr::Call {
                callee: "foo".to_string(),
                args: vec![num(1.0), num(2.0)],
            }
        );
        assert_eq!(
            parse_expr("foo()"),
            Expr::Call {
                callee: "foo".to_string(),
                args: vec![],
            }
        );
    }

    #[test]
    fn call_arguments_are_full_expressions() {
        assert_eq!(
            parse_expr("foo(bar(x), 1 + 2)"),
            Expr::Call {
                callee: "foo".to_string(),
                args: vec![
                    Expr::Call {
                        callee: "bar".to_string(),
                        args: vec![var("x")],
                    },
                    bin('+', num(1.0), num(2.0)),
                ],
            }
        );
    }

    #[test]
    fn bare_identifier_is_a_variable_ref() {
        assert_eq!(parse_expr("x"), var("x"));
    }

    #[test]
    fn undeclared_operator_ends_the_expression() {
        let mut parser = Parser::from_source("1 / 2");
        assert_eq!(parser.parse_expression(), Ok(num(1.0)));
        assert_eq!(parser.current(), &Token::Char('/'));
    }

    #[test]
    fn host_defined_operator() {
        let mut parser = Parser::from_source("a | b < c");
        parser.define_operator('|', 5);
        assert_eq!(
            parser.parse_expression(),
            Ok(bin('|', var("a"), bin('<', var("b"), var("c"))))
        );
    }

    #[test]
    fn definition_item() {
        let item = Parser::from_source("def add(x y) x + y")
            .parse_item()
            .unwrap();
        assert_eq!(
            item,
            Some(Item::Function(Function {
                proto: Prototype {
                    name: "add".to_string(),
                    params: vec!["x".to_string(), "y".to_string()],
                },
                body: bin('+', var("x"), var("y")),
            }))
        );
    }

    #[test]
    fn extern_item() {
        let item = Parser::from_source("extern sin(x)").parse_item().unwrap();
        assert_eq!(
            item,
            Some(Item::Extern(Prototype {
                name: "sin".to_string(),
                params: vec!["x".to_string()],
            }))
        );
    }

    #[test]
    fn top_level_expression_gets_anonymous_wrapper() {
        let item = Parser::from_source("4 + 5").parse_item().unwrap();
        match item {
            Some(Item::Function(func)) => {
                assert!(func.proto.is_anonymous());
                assert!(func.proto.params.is_empty());
                assert_eq!(func.body, bin('+', num(4.0), num(5.0)));
            }
            other => panic!("expected an anonymous function, got {:?}", other),
        }
    }

    #[test]
    fn truncated_prototype_fails_with_proto_message() {
        let err = Parser::from_source("def foo(").parse_item().unwrap_err();
        assert_eq!(err, ParserError::ExpectedProtoCloseParen(Token::Eof));
        assert!(err.to_string().contains("expected ')' in prototype"));
    }

    #[test]
    fn missing_close_paren() {
        let err = Parser::from_source("(1 + 2").parse_expression().unwrap_err();
        assert_eq!(err, ParserError::ExpectedCloseParen(Token::Eof));
    }

    #[test]
    fn bad_argument_separator() {
        let err = Parser::from_source("foo(1 2)")
            .parse_expression()
            .unwrap_err();
        assert_eq!(
            err,
            ParserError::ExpectedArgumentSeparator(Token::Number(2.0))
        );
    }

    #[test]
    fn operator_in_primary_position() {
        let err = Parser::from_source("* 3").parse_expression().unwrap_err();
        assert_eq!(err, ParserError::ExpectedExpression(Token::Char('*')));
    }

    #[test]
    fn semicolons_separate_items() {
        let mut parser = Parser::from_source("def one() 1; extern two(); 3");
        let mut items = Vec::new();
        while let Some(item) = parser.parse_item().unwrap() {
            items.push(item);
        }
        assert_eq!(items.len(), 3);
        assert_eq!(parser.parse_item(), Ok(None));
    }

    #[test]
    fn deeply_nested_parens() {
        let depth = 256;
        let input = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse_expr(&input), num(1.0));
    }
}
