use ::{
    itertools::Itertools,
    std::{
        collections::{BTreeMap, HashMap},
        fmt,
        rc::Rc,
    },
};

use crate::{
    parse::{BinOp, Expr, Program, Stmt, UnOp},
    ScriptError, Value,
};

pub type NativeFn = Rc<dyn Fn(&[Value]) -> Result<Value, ScriptError>>;

#[derive(Clone)]
pub enum Global {
    Value(Value),
    Function(NativeFn),
}

impl fmt::Debug for Global {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Global::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Global::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// The namespace shared by every script a knowledge base runs: named constants and
/// native functions. Scripts cannot modify it.
#[derive(Debug, Clone, Default)]
pub struct Globals {
    entries: HashMap<String, Global>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    /// A namespace with the standard helper functions installed.
    pub fn with_builtins() -> Self {
        let mut globals = Self::new();

        globals.insert_fn("abs", |args| Ok(Value::Num(num_arg("abs", args, 1)?.abs())));
        globals.insert_fn("floor", |args| {
            Ok(Value::Num(num_arg("floor", args, 1)?.floor()))
        });
        globals.insert_fn("ceil", |args| Ok(Value::Num(num_arg("ceil", args, 1)?.ceil())));
        globals.insert_fn("round", |args| {
            Ok(Value::Num(num_arg("round", args, 1)?.round()))
        });
        globals.insert_fn("min", |args| fold_nums("min", args, f64::min));
        globals.insert_fn("max", |args| fold_nums("max", args, f64::max));
        globals.insert_fn("str", |args| match args {
            [value] => Ok(Value::Str(value.to_string())),
            _ => Err(ScriptError::Arity("str".into(), 1, args.len())),
        });
        globals.insert_fn("num", |args| match args {
            [Value::Num(n)] => Ok(Value::Num(*n)),
            [Value::Str(s)] => s
                .trim()
                .parse()
                .map(Value::Num)
                .map_err(|_| ScriptError::Type(format!("cannot convert `{}` to a number", s))),
            [Value::Bool(b)] => Ok(Value::Num(if *b { 1. } else { 0. })),
            _ => Err(ScriptError::Arity("num".into(), 1, args.len())),
        });
        globals.insert_fn("len", |args| match args {
            [Value::Str(s)] => Ok(Value::Num(s.chars().count() as f64)),
            [other] => Err(ScriptError::Type(format!(
                "`len` expects a string, got {}",
                other.type_name()
            ))),
            _ => Err(ScriptError::Arity("len".into(), 1, args.len())),
        });

        globals
    }

    pub fn insert_value(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(name.into(), Global::Value(value.into()));
    }

    pub fn insert_fn<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[Value]) -> Result<Value, ScriptError> + 'static,
    {
        self.entries
            .insert(name.into(), Global::Function(Rc::new(function)));
    }

    pub fn get(&self, name: &str) -> Option<&Global> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

fn num_arg(name: &str, args: &[Value], arity: usize) -> Result<f64, ScriptError> {
    if args.len() != arity {
        return Err(ScriptError::Arity(name.into(), arity, args.len()));
    }

    args[0].as_num().ok_or_else(|| {
        ScriptError::Type(format!(
            "`{}` expects a number, got {}",
            name,
            args[0].type_name()
        ))
    })
}

fn fold_nums(name: &str, args: &[Value], f: fn(f64, f64) -> f64) -> Result<Value, ScriptError> {
    let mut nums = args.iter().map(|arg| {
        arg.as_num().ok_or_else(|| {
            ScriptError::Type(format!("`{}` expects numbers, got {}", name, arg.type_name()))
        })
    });

    let first = match nums.next() {
        Some(first) => first?,
        None => return Err(ScriptError::Arity(name.into(), 1, 0)),
    };

    nums.fold_results(first, f).map(Value::Num)
}

/// Evaluation state for one script run: the shared globals, the script's locals
/// (which start out as the rule's bindings) and any sentences queued with `tell`.
#[derive(Debug)]
pub struct Env<'g> {
    globals: &'g Globals,
    locals: BTreeMap<String, Value>,
    told: Vec<String>,
}

impl<'g> Env<'g> {
    pub fn new(globals: &'g Globals) -> Self {
        Self {
            globals,
            locals: BTreeMap::new(),
            told: Vec::new(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.locals.insert(name.into(), value);
    }

    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }

    pub fn locals(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.locals.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Sentences passed to `tell(...)` during evaluation, in call order.
    pub fn take_told(&mut self) -> Vec<String> {
        std::mem::replace(&mut self.told, Vec::new())
    }

    /// Run every statement in order. Returns the value of the last statement if it
    /// was a bare expression.
    pub fn exec(&mut self, program: &Program) -> Result<Option<Value>, ScriptError> {
        let mut last = None;
        for stmt in &program.stmts {
            last = match stmt {
                Stmt::Assign(name, expr) => {
                    let value = self.eval(expr)?;
                    self.locals.insert(name.clone(), value);
                    None
                }
                Stmt::Expr(expr) => Some(self.eval(expr)?),
            };
        }
        Ok(last)
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, ScriptError> {
        match expr {
            Expr::Num(n) => Ok(Value::Num(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Var(name) => self.lookup(name),
            Expr::Unary(UnOp::Not, e) => Ok(Value::Bool(!self.eval(e)?.is_truthy())),
            Expr::Unary(UnOp::Neg, e) => match self.eval(e)? {
                Value::Num(n) => Ok(Value::Num(-n)),
                other => Err(ScriptError::Type(format!(
                    "cannot negate a {}",
                    other.type_name()
                ))),
            },
            Expr::Binary(BinOp::And, l, r) => {
                let l = self.eval(l)?;
                if l.is_truthy() {
                    self.eval(r)
                } else {
                    Ok(l)
                }
            }
            Expr::Binary(BinOp::Or, l, r) => {
                let l = self.eval(l)?;
                if l.is_truthy() {
                    Ok(l)
                } else {
                    self.eval(r)
                }
            }
            Expr::Binary(op, l, r) => {
                let l = self.eval(l)?;
                let r = self.eval(r)?;
                binary(*op, l, r)
            }
            Expr::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(name, &args)
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, ScriptError> {
        if let Some(value) = self.locals.get(name) {
            return Ok(value.clone());
        }

        match self.globals.get(name) {
            Some(Global::Value(value)) => Ok(value.clone()),
            Some(Global::Function(_)) => Err(ScriptError::Type(format!(
                "`{}` is a function, not a value",
                name
            ))),
            None => Err(ScriptError::Unbound(name.to_string())),
        }
    }

    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, ScriptError> {
        match self.globals.get(name) {
            Some(Global::Function(f)) => f(args),
            Some(Global::Value(_)) => Err(ScriptError::NotCallable(name.to_string())),
            None if name == "tell" => {
                let sentence = args.iter().join(" ");
                if sentence.trim().is_empty() {
                    return Err(ScriptError::Arity("tell".into(), 1, 0));
                }
                self.told.push(sentence);
                Ok(Value::Bool(true))
            }
            None => Err(ScriptError::Unbound(name.to_string())),
        }
    }
}

fn binary(op: BinOp, l: Value, r: Value) -> Result<Value, ScriptError> {
    use self::Value::*;

    let mismatch = |l: &Value, r: &Value| {
        ScriptError::Type(format!(
            "unsupported operands for `{}`: {} and {}",
            op,
            l.type_name(),
            r.type_name()
        ))
    };

    match (op, &l, &r) {
        (BinOp::Eq, _, _) => Ok(Bool(l == r)),
        (BinOp::Ne, _, _) => Ok(Bool(l != r)),

        (BinOp::Add, Str(a), Str(b)) => Ok(Str(format!("{}{}", a, b))),
        (BinOp::Add, Num(a), Num(b)) => Ok(Num(a + b)),
        (BinOp::Sub, Num(a), Num(b)) => Ok(Num(a - b)),
        (BinOp::Mul, Num(a), Num(b)) => Ok(Num(a * b)),
        (BinOp::Pow, Num(a), Num(b)) => Ok(Num(a.powf(*b))),
        (BinOp::Div, Num(_), Num(b)) | (BinOp::Rem, Num(_), Num(b)) if *b == 0. => {
            Err(ScriptError::DivisionByZero)
        }
        (BinOp::Div, Num(a), Num(b)) => Ok(Num(a / b)),
        // The result takes the sign of the divisor.
        (BinOp::Rem, Num(a), Num(b)) => Ok(Num(a - b * (a / b).floor())),

        (BinOp::Lt, Num(a), Num(b)) => Ok(Bool(a < b)),
        (BinOp::Le, Num(a), Num(b)) => Ok(Bool(a <= b)),
        (BinOp::Gt, Num(a), Num(b)) => Ok(Bool(a > b)),
        (BinOp::Ge, Num(a), Num(b)) => Ok(Bool(a >= b)),
        (BinOp::Lt, Str(a), Str(b)) => Ok(Bool(a < b)),
        (BinOp::Le, Str(a), Str(b)) => Ok(Bool(a <= b)),
        (BinOp::Gt, Str(a), Str(b)) => Ok(Bool(a > b)),
        (BinOp::Ge, Str(a), Str(b)) => Ok(Bool(a >= b)),

        _ => Err(mismatch(&l, &r)),
    }
}
