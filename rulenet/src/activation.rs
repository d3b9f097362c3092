use crate::{matching::Matching, rule::Rule, syntax::Fact};

use ::std::{collections::VecDeque, fmt, rc::Rc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActivationId(usize);

impl fmt::Display for ActivationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum ActivationData {
    /// Assert a fact.
    Fact { fact: Fact, query_rules: bool },

    /// Advance a rule by one matched condition. A `condition` of `None` means the rule
    /// was just told and nothing has been matched yet.
    Rule {
        rule: Rc<Rule>,
        matching: Matching,
        condition: Option<Fact>,
        query_rules: bool,
    },
}

impl ActivationData {
    pub fn query_rules(&self) -> bool {
        match self {
            ActivationData::Fact { query_rules, .. } | ActivationData::Rule { query_rules, .. } => {
                *query_rules
            }
        }
    }
}

/// One unit of pending work, and the activation whose processing produced it.
#[derive(Debug, Clone)]
pub struct Activation {
    pub id: ActivationId,
    pub precedent: Option<ActivationId>,
    pub data: ActivationData,
}

/// FIFO queue of pending activations.
#[derive(Debug, Default)]
pub struct Agenda {
    queue: VecDeque<Activation>,
    counter: usize,
    current: Option<ActivationId>,
}

impl Agenda {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: ActivationData) -> ActivationId {
        let id = ActivationId(self.counter);
        self.counter += 1;
        self.queue.push_back(Activation {
            id,
            precedent: self.current,
            data,
        });
        id
    }

    /// Take the oldest activation. It becomes the precedent of everything pushed until
    /// the next call.
    pub fn pop(&mut self) -> Option<Activation> {
        let activation = self.queue.pop_front();
        self.current = activation.as_ref().map(|act| act.id);
        activation
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.current = None;
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total number of activations ever pushed.
    pub fn counter(&self) -> usize {
        self.counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedents_follow_processing() {
        let mut agenda = Agenda::new();
        let rule = Rc::new(Rule::new(
            Default::default(),
            Default::default(),
            Default::default(),
            Default::default(),
        ));
        let data = ActivationData::Rule {
            rule,
            matching: Matching::new(),
            condition: None,
            query_rules: true,
        };

        let first = agenda.push(data.clone());
        assert_eq!(agenda.pop().map(|a| a.precedent), Some(None));

        agenda.push(data.clone());
        agenda.push(data);
        let second = agenda.pop().unwrap();
        assert_eq!(second.precedent, Some(first));
        assert!(second.data.query_rules());
        assert_eq!(agenda.len(), 1);

        agenda.clear();
        assert!(agenda.is_empty());
        assert_eq!(agenda.counter(), 3);
    }
}
