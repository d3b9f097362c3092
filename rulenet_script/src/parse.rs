use ::{
    itertools::Itertools,
    lazy_static::lazy_static,
    pest::{
        iterators::{Pair, Pairs},
        pratt_parser::{Assoc, Op, PrattParser},
        Parser,
    },
    pest_derive::Parser,
    std::fmt,
};

use crate::ScriptError;

#[derive(Parser)]
#[grammar = "script.pest"]
struct ScriptParser;

lazy_static! {
    static ref PRATT: PrattParser<Rule> = PrattParser::new()
        .op(Op::infix(Rule::or, Assoc::Left))
        .op(Op::infix(Rule::and, Assoc::Left))
        .op(Op::prefix(Rule::not))
        .op(Op::infix(Rule::eq, Assoc::Left)
            | Op::infix(Rule::ne, Assoc::Left)
            | Op::infix(Rule::le, Assoc::Left)
            | Op::infix(Rule::ge, Assoc::Left)
            | Op::infix(Rule::lt, Assoc::Left)
            | Op::infix(Rule::gt, Assoc::Left))
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left)
            | Op::infix(Rule::div, Assoc::Left)
            | Op::infix(Rule::rem, Assoc::Left))
        .op(Op::prefix(Rule::neg))
        .op(Op::infix(Rule::pow, Assoc::Right));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = match self {
            BinOp::Or => "or",
            BinOp::And => "and",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Pow => "**",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Str(String),
    Bool(bool),
    Var(String),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Num(n) => write!(f, "{}", n),
            Expr::Str(s) => write!(f, "{:?}", s),
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Unary(UnOp::Neg, e) => write!(f, "(-{})", e),
            Expr::Unary(UnOp::Not, e) => write!(f, "(not {})", e),
            Expr::Binary(op, l, r) => write!(f, "({} {} {})", l, op, r),
            Expr::Call(name, args) => write!(f, "{}({})", name, args.iter().format(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign(String, Expr),
    Expr(Expr),
}

/// A parsed script: a sequence of statements separated by `;`.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

impl Program {
    pub fn parse(src: &str) -> Result<Self, ScriptError> {
        let mut pairs = ScriptParser::parse(Rule::program, src)
            .map_err(|err| ScriptError::Syntax(err.to_string()))?;

        let mut stmts = Vec::new();
        if let Some(program) = pairs.next() {
            for statement in program.into_inner() {
                if statement.as_rule() == Rule::statement {
                    stmts.push(build_statement(statement)?);
                }
            }
        }

        Ok(Self { stmts })
    }

    /// If this program is a single bare expression, return it. Such programs are
    /// evaluated for their value rather than executed for their bindings.
    pub fn as_expression(&self) -> Option<&Expr> {
        match self.stmts.as_slice() {
            [Stmt::Expr(expr)] => Some(expr),
            _ => None,
        }
    }
}

fn build_statement(pair: Pair<Rule>) -> Result<Stmt, ScriptError> {
    let inner = first_inner(pair)?;
    match inner.as_rule() {
        Rule::assignment => {
            let mut parts = inner.into_inner();
            match (parts.next(), parts.next()) {
                (Some(name), Some(expr)) => Ok(Stmt::Assign(
                    name.as_str().to_string(),
                    build_expr(expr.into_inner())?,
                )),
                _ => Err(ScriptError::Syntax("malformed assignment".into())),
            }
        }
        Rule::expr => Ok(Stmt::Expr(build_expr(inner.into_inner())?)),
        other => Err(ScriptError::Syntax(format!(
            "unexpected {:?} in statement position",
            other
        ))),
    }
}

fn build_expr(pairs: Pairs<Rule>) -> Result<Expr, ScriptError> {
    PRATT
        .map_primary(build_primary)
        .map_prefix(|op, rhs| {
            let op = match op.as_rule() {
                Rule::neg => UnOp::Neg,
                _ => UnOp::Not,
            };
            Ok(Expr::Unary(op, Box::new(rhs?)))
        })
        .map_infix(|lhs, op, rhs| {
            let op = match op.as_rule() {
                Rule::or => BinOp::Or,
                Rule::and => BinOp::And,
                Rule::eq => BinOp::Eq,
                Rule::ne => BinOp::Ne,
                Rule::lt => BinOp::Lt,
                Rule::le => BinOp::Le,
                Rule::gt => BinOp::Gt,
                Rule::ge => BinOp::Ge,
                Rule::add => BinOp::Add,
                Rule::sub => BinOp::Sub,
                Rule::mul => BinOp::Mul,
                Rule::div => BinOp::Div,
                Rule::rem => BinOp::Rem,
                Rule::pow => BinOp::Pow,
                other => {
                    return Err(ScriptError::Syntax(format!(
                        "unexpected operator {:?}",
                        other
                    )))
                }
            };
            Ok(Expr::Binary(op, Box::new(lhs?), Box::new(rhs?)))
        })
        .parse(pairs)
}

fn build_primary(pair: Pair<Rule>) -> Result<Expr, ScriptError> {
    match pair.as_rule() {
        Rule::number => pair
            .as_str()
            .parse()
            .map(Expr::Num)
            .map_err(|_| ScriptError::Syntax(format!("bad number `{}`", pair.as_str()))),
        Rule::string => {
            let inner = first_inner(pair)?;
            Ok(Expr::Str(inner.as_str().to_string()))
        }
        Rule::boolean => Ok(Expr::Bool(matches!(pair.as_str(), "true" | "True"))),
        Rule::ident => Ok(Expr::Var(pair.as_str().to_string())),
        Rule::call => {
            let mut parts = pair.into_inner();
            let name = match parts.next() {
                Some(name) => name.as_str().to_string(),
                None => return Err(ScriptError::Syntax("call without a name".into())),
            };
            let args = parts
                .map(|arg| build_expr(arg.into_inner()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::Call(name, args))
        }
        Rule::expr => build_expr(pair.into_inner()),
        other => Err(ScriptError::Syntax(format!(
            "unexpected {:?} in expression",
            other
        ))),
    }
}

fn first_inner(pair: Pair<Rule>) -> Result<Pair<Rule>, ScriptError> {
    let rule = pair.as_rule();
    pair.into_inner()
        .next()
        .ok_or_else(|| ScriptError::Syntax(format!("empty {:?}", rule)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(src: &str) -> String {
        let program = Program::parse(src).unwrap();
        program.as_expression().unwrap().to_string()
    }

    #[test]
    fn precedence() {
        assert_eq!(expr("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(expr("(1 + 2) * 3"), "((1 + 2) * 3)");
        assert_eq!(expr("2 ** 3 ** 2"), "(2 ** (3 ** 2))");
        assert_eq!(expr("-x ** 2"), "(-(x ** 2))");
        assert_eq!(expr("a < b and not c or d"), "(((a < b) and (not c)) or d)");
    }

    #[test]
    fn statements() {
        let program = Program::parse("x = 1; y = x + 2;").unwrap();
        assert_eq!(program.stmts.len(), 2);
        assert!(program.as_expression().is_none());
        assert!(matches!(&program.stmts[0], Stmt::Assign(name, Expr::Num(_)) if name == "x"));
    }

    #[test]
    fn equality_is_not_assignment() {
        let program = Program::parse("x == 1").unwrap();
        assert_eq!(
            program.as_expression(),
            Some(&Expr::Binary(
                BinOp::Eq,
                Box::new(Expr::Var("x".into())),
                Box::new(Expr::Num(1.))
            ))
        );
    }

    #[test]
    fn calls_and_strings() {
        assert_eq!(expr("max(1, 'a', \"b\")"), "max(1, \"a\", \"b\")");
        assert_eq!(expr("tell()"), "tell()");
    }

    #[test]
    fn keywords_are_not_identifiers() {
        assert_eq!(expr("order or notary"), "(order or notary)");
        assert!(Program::parse("and = 1").is_err());
        assert!(Program::parse("1 +").is_err());
    }
}
