//! A small, restricted expression language used by rulenet's `python` and `exec`
//! extra conditions. It has numbers, strings and booleans, arithmetic and comparison
//! operators, assignments, and calls into native functions registered in a [`Globals`]
//! table. There are no loops, no attribute access and no way to reach the host beyond
//! the functions the embedder chooses to expose.
//!
//! ```
//! # use rulenet_script::{Env, Globals, Program, Value};
//! let globals = Globals::with_builtins();
//! let mut env = Env::new(&globals);
//! env.set("v_N", Value::from_binding("2"));
//!
//! let program = Program::parse("v_M = v_N + 1; test = v_M > 2").unwrap();
//! env.exec(&program).unwrap();
//!
//! assert_eq!(env.local("v_M"), Some(&Value::Num(3.)));
//! ```

pub mod eval;
pub mod parse;
pub mod value;

pub use crate::{
    eval::{Env, Global, Globals, NativeFn},
    parse::{BinOp, Expr, Program, Stmt, UnOp},
    value::Value,
};

use ::failure::Fail;

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Fail)]
pub enum ScriptError {
    #[fail(display = "syntax error: {}", _0)]
    Syntax(String),

    #[fail(display = "unbound name `{}`", _0)]
    Unbound(String),

    #[fail(display = "`{}` is not callable", _0)]
    NotCallable(String),

    #[fail(display = "`{}` expects {} argument(s), got {}", _0, _1, _2)]
    Arity(String, usize, usize),

    #[fail(display = "type error: {}", _0)]
    Type(String),

    #[fail(display = "division by zero")]
    DivisionByZero,

    #[fail(display = "{}", _0)]
    Custom(String),
}
