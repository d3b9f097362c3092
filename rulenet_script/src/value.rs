use ::{derive_more::From, std::fmt};

/// A runtime value. Bound variables come in as text and are converted with
/// [`Value::from_binding`]; values harvested back out are rendered with `Display`.
#[derive(Debug, Clone, PartialEq, From)]
pub enum Value {
    Num(f64),
    Str(String),
    Bool(bool),
}

impl Value {
    /// Text that parses as a floating point number becomes a number, anything
    /// else is kept as a string.
    pub fn from_binding(text: &str) -> Self {
        match text.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Num(n),
            _ => Value::Str(text.to_string()),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Num(n) => *n != 0.,
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }
}

impl<'a> From<&'a str> for Value {
    fn from(s: &'a str) -> Self {
        Value::Str(s.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            // Integral values print without a fractional part so that they read
            // back into facts the way a user would have written them.
            Value::Num(n) if n.is_finite() && n.fract() == 0. && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Value::Num(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_become_numbers_when_they_can() {
        assert_eq!(Value::from_binding("2"), Value::Num(2.));
        assert_eq!(Value::from_binding("2.5"), Value::Num(2.5));
        assert_eq!(Value::from_binding("pizza"), Value::Str("pizza".into()));
        assert_eq!(Value::from_binding("inf"), Value::Str("inf".into()));
    }

    #[test]
    fn integral_numbers_render_without_fraction() {
        assert_eq!(Value::Num(3.).to_string(), "3");
        assert_eq!(Value::Num(-4.).to_string(), "-4");
        assert_eq!(Value::Num(0.5).to_string(), "0.5");
        assert_eq!(Value::Bool(false).to_string(), "False");
    }
}
