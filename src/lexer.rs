use std::fmt;
use std::iter::Peekable;

/// A classified unit of lexical input. Every input character lexes to
/// something; characters outside the known categories come back as
/// [`Token::Char`] carrying the raw code point.
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Eof,
    Def,
    Extern,
    Ident(String),
    Number(f64),
    Char(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Eof => write!(f, "end of input"),
            Token::Def => write!(f, "'def'"),
            Token::Extern => write!(f, "'extern'"),
            Token::Ident(name) => write!(f, "identifier '{}'", name),
            Token::Number(val) => write!(f, "number {}", val),
            Token::Char(c) => write!(f, "'{}'", c),
        }
    }
}

/// Streaming scanner over a character source.
///
/// Characters are pulled on demand; the only state carried between
/// [`Lexer::next_token`] calls is the cursor and one peeked character of
/// lookahead. The source can be anything yielding `char`s - a string's
/// `chars()`, a file reader adapter, a terminal.
pub struct Lexer<I: Iterator<Item = char>> {
    chars: Peekable<I>,
}

impl<I: Iterator<Item = char>> Lexer<I> {
    pub fn new(source: I) -> Self {
        Lexer {
            chars: source.peekable(),
        }
    }

    /// Scan and return the next token, advancing the cursor past it.
    /// Scanning never fails; see [`Token`].
    pub fn next_token(&mut self) -> Token {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.chars.next();
        }

        let c = match self.chars.peek() {
            Some(&c) => c,
            None => return Token::Eof,
        };

        if c.is_alphabetic() {
            return self.scan_identifier();
        }
        if c.is_ascii_digit() || c == '.' {
            return self.scan_number();
        }
        if c == '#' {
            // comment runs to end of line
            while let Some(c) = self.chars.next() {
                if c == '\n' || c == '\r' {
                    break;
                }
            }
            return self.next_token();
        }

        self.chars.next();
        Token::Char(c)
    }

    /// Drain the source into a token list ending with [`Token::Eof`].
    pub fn tokens(mut self) -> Vec<Token> {
        let mut toks = Vec::new();
        loop {
            let tok = self.next_token();
            let done = tok == Token::Eof;
            toks.push(tok);
            if done {
                return toks;
            }
        }
    }

    // identifier: [alphabetic][alphanumeric]*
    fn scan_identifier(&mut self) -> Token {
        let mut ident = String::new();
        while let Some(&c) = self.chars.peek() {
            if !c.is_alphanumeric() {
                break;
            }
            ident.push(c);
            self.chars.next();
        }
        match ident.as_str() {
            "def" => Token::Def,
            "extern" => Token::Extern,
            _ => Token::Ident(ident),
        }
    }

    // number: [0-9.]+ - deliberately lenient, see `lenient_f64`
    fn scan_number(&mut self) -> Token {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if !c.is_ascii_digit() && c != '.' {
                break;
            }
            text.push(c);
            self.chars.next();
        }
        Token::Number(lenient_f64(&text))
    }
}

/// strtod-style conversion for the scanner's greedy digits-and-dots rule:
/// the longest leading prefix that parses as an `f64` wins (`"1.2.3"` is
/// 1.2), and text with no parseable prefix (a lone `"."`) is 0.0.
fn lenient_f64(text: &str) -> f64 {
    // text is ASCII digits and dots, so byte slicing is char-safe
    for end in (1..=text.len()).rev() {
        if let Ok(val) = text[..end].parse() {
            return val;
        }
    }
    0.0
}
