use crate::syntax::Fact;

use ::{
    im::OrdMap,
    itertools::Itertools,
    std::{collections::BTreeMap, fmt},
};

/// Maps the canonical variable names of a normalized pattern back to the names the
/// user wrote.
pub type VarMap = OrdMap<String, String>;

/// A set of variable bindings. Updates return a new `Matching` and leave the old one
/// untouched; a variable is never bound to two different values.
#[derive(Debug, Clone, Default)]
pub struct Matching {
    bindings: OrdMap<String, String>,
    origin: Option<Fact>,
}

// The origin is bookkeeping and does not take part in comparisons.
impl PartialEq for Matching {
    fn eq(&self, other: &Self) -> bool {
        self.bindings == other.bindings
    }
}

impl Eq for Matching {}

impl fmt::Display for Matching {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.bindings
                .iter()
                .format_with(", ", |(k, v), f| f(&format_args!("{}: {}", k, v)))
        )
    }
}

impl Matching {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The fact this matching was produced from, if any.
    pub fn origin(&self) -> Option<&Fact> {
        self.origin.as_ref()
    }

    pub fn with_origin(mut self, origin: Fact) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Bind `name` to `value`. Rebinding to an equal value is a no-op; rebinding to a
    /// different one fails.
    pub fn bind(&self, name: &str, value: &str) -> Option<Self> {
        match self.bindings.get(name) {
            Some(bound) if bound == value => Some(self.clone()),
            Some(_) => None,
            None => Some(Self {
                bindings: self.bindings.update(name.to_string(), value.to_string()),
                origin: self.origin.clone(),
            }),
        }
    }

    /// The union of two compatible matchings. The origin of `self` is kept.
    pub fn merge(&self, other: &Matching) -> Option<Self> {
        other
            .bindings
            .iter()
            .try_fold(self.clone(), |acc, (name, value)| acc.bind(name, value))
    }

    /// Rename canonical variables back to user names. Names missing from `varmap` are
    /// kept as they are.
    pub fn get_real_matching(&self, varmap: &VarMap) -> Self {
        Self {
            bindings: self
                .bindings
                .iter()
                .map(|(name, value)| {
                    let real = varmap.get(name).unwrap_or(name);
                    (real.clone(), value.clone())
                })
                .collect(),
            origin: self.origin.clone(),
        }
    }

    pub fn to_dict(&self) -> BTreeMap<String, String> {
        self.bindings
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl<K, V> std::iter::FromIterator<(K, V)> for Matching
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            bindings: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            origin: None,
        }
    }
}
