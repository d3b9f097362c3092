use crate::{error::KbError, grammar::Grammar, matching::Matching, syntax::Fact};

use ::{
    im::Vector,
    itertools::Itertools,
    std::fmt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtraKind {
    /// Passes if the pattern is known.
    Logic,
    /// Passes if the pattern is not known.
    Unknown,
    /// A script whose value, or whose `test` variable, decides the condition. New
    /// variables it assigns become bindings.
    Python,
    /// A script run for its effects.
    Exec,
    /// Retracts the fact the pattern names.
    Rm,
}

impl ExtraKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "logic" => Some(ExtraKind::Logic),
            "unknown" => Some(ExtraKind::Unknown),
            "python" => Some(ExtraKind::Python),
            "exec" => Some(ExtraKind::Exec),
            "rm" => Some(ExtraKind::Rm),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ExtraKind::Logic => "logic",
            ExtraKind::Unknown => "unknown",
            ExtraKind::Python => "python",
            ExtraKind::Exec => "exec",
            ExtraKind::Rm => "rm",
        }
    }

    /// Kinds whose text is a fact pattern rather than a script.
    pub fn takes_pattern(self) -> bool {
        match self {
            ExtraKind::Logic | ExtraKind::Unknown | ExtraKind::Rm => true,
            ExtraKind::Python | ExtraKind::Exec => false,
        }
    }
}

impl fmt::Display for ExtraKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtraCon {
    pub kind: ExtraKind,
    pub text: String,
}

impl ExtraCon {
    pub fn new(kind: ExtraKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

impl fmt::Display for ExtraCon {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{{{}}}", self.kind, self.text)
    }
}

/// A production. Conditions are matched against facts one at a time; each match
/// produces a specialized copy of the rule with that condition removed and its bindings
/// carried in `extra_matching`.
#[derive(Debug, Clone)]
pub struct Rule {
    pub conditions: Vector<Fact>,
    pub extra_conditions: Vector<ExtraCon>,
    pub consequences: Vector<Fact>,
    pub extra_consequences: Vector<ExtraCon>,
    pub extra_matching: Matching,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let conditions = self
            .conditions
            .iter()
            .map(ToString::to_string)
            .chain(self.extra_conditions.iter().map(ToString::to_string));
        let consequences = self
            .consequences
            .iter()
            .map(ToString::to_string)
            .chain(self.extra_consequences.iter().map(ToString::to_string));

        write!(
            f,
            "{} -> {}",
            conditions.format(", "),
            consequences.format(", ")
        )
    }
}

impl Rule {
    pub fn new(
        conditions: Vector<Fact>,
        extra_conditions: Vector<ExtraCon>,
        consequences: Vector<Fact>,
        extra_consequences: Vector<ExtraCon>,
    ) -> Self {
        Self {
            conditions,
            extra_conditions,
            consequences,
            extra_consequences,
            extra_matching: Matching::new(),
        }
    }

    /// Identifies the rule together with the bindings it has accumulated.
    pub fn key(&self) -> String {
        format!("{} {}", self, self.extra_matching)
    }

    /// Remove `condition` (the first condition equal to it, if any), substitute
    /// `matching` into what remains and fold it into `extra_matching`. `None` if
    /// `matching` disagrees with the bindings already carried.
    pub fn specialize(
        &self,
        condition: Option<&Fact>,
        matching: &Matching,
        grammar: &Grammar,
    ) -> Result<Option<Rule>, KbError> {
        let extra_matching = match self.extra_matching.merge(matching) {
            Some(merged) => merged,
            None => return Ok(None),
        };

        let mut conditions = self.conditions.clone();
        if let Some(condition) = condition {
            if let Some(index) = conditions.index_of(condition) {
                conditions.remove(index);
            }
        }

        Ok(Some(Rule {
            conditions: substitute_all(&conditions, matching, grammar)?,
            extra_conditions: self.extra_conditions.clone(),
            consequences: substitute_all(&self.consequences, matching, grammar)?,
            extra_consequences: self.extra_consequences.clone(),
            extra_matching,
        }))
    }
}

fn substitute_all(
    facts: &Vector<Fact>,
    matching: &Matching,
    grammar: &Grammar,
) -> Result<Vector<Fact>, KbError> {
    facts
        .iter()
        .map(|fact| fact.substitute(matching, grammar))
        .collect()
}
