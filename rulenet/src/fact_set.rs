use crate::{matching::Matching, syntax::Fact};

use ::{indexmap::IndexSet, std::fmt::Debug};

/// The flat store of known facts.
pub trait FactSet: Debug {
    /// Every way `pattern` matches a stored fact. A ground pattern yields a single
    /// empty matching when the fact is known.
    fn ask_fact(&self, pattern: &Fact) -> Vec<Matching>;

    fn add_fact(&mut self, fact: Fact);

    /// Returns whether the fact was present.
    fn rm_fact(&mut self, fact: &Fact) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &Fact> + '_>;
}

/// Facts kept in insertion order and scanned linearly for patterns.
#[derive(Debug, Default, Clone)]
pub struct MemoryFactSet {
    facts: IndexSet<Fact>,
}

impl MemoryFactSet {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FactSet for MemoryFactSet {
    fn ask_fact(&self, pattern: &Fact) -> Vec<Matching> {
        if !pattern.has_vars() {
            return match self.facts.get(pattern) {
                Some(fact) => vec![Matching::new().with_origin(fact.clone())],
                None => Vec::new(),
            };
        }

        self.facts
            .iter()
            .filter_map(|fact| pattern.match_against(fact))
            .collect()
    }

    fn add_fact(&mut self, fact: Fact) {
        self.facts.insert(fact);
    }

    fn rm_fact(&mut self, fact: &Fact) -> bool {
        self.facts.shift_remove(fact)
    }

    fn len(&self) -> usize {
        self.facts.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &Fact> + '_> {
        Box::new(self.facts.iter())
    }
}
