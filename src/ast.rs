use std::fmt;

/// An expression tree. Interior variants own their children exclusively;
/// the tree is built bottom-up by the parser and never mutated after.
#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Binary {
        op: char,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: String,
        args: Vec<Expr>,
    },
}

/// A function signature: name plus parameter names, independent of any
/// body. The empty name is reserved for the wrapper synthesized around
/// top-level expressions.
#[derive(Debug, PartialEq, Clone)]
pub struct Prototype {
    pub name: String,
    pub params: Vec<String>,
}

impl Prototype {
    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Function {
    pub proto: Prototype,
    pub body: Expr,
}

/// Uniform result shape for the three top-level constructs: `def`
/// definitions and bare expressions both normalize to [`Function`]
/// (the latter under an anonymous prototype), externs stay a bare
/// [`Prototype`].
#[derive(Debug, PartialEq, Clone)]
pub enum Item {
    Extern(Prototype),
    Function(Function),
}

// The printed form is re-parseable; binary nodes come out fully
// parenthesized so no precedence table is needed to read them back.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(val) => write!(f, "{}", val),
            Expr::Variable(name) => f.write_str(name),
            Expr::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
            Expr::Call { callee, args } => {
                write!(f, "{}(", callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(param)?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.proto.is_anonymous() {
            write!(f, "{}", self.body)
        } else {
            write!(f, "def {} {}", self.proto, self.body)
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Extern(proto) => write!(f, "extern {}", proto),
            Item::Function(func) => write!(f, "{}", func),
        }
    }
}
