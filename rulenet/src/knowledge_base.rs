use crate::{
    activation::{ActivationData, Agenda},
    config::Config,
    error::KbError,
    fact_set::{FactSet, MemoryFactSet},
    grammar::{Grammar, Sentence},
    handlers::{self, Outcome},
    matching::Matching,
    rule::{ExtraCon, Rule},
    rule_set::{CondSet, ConsSet},
    syntax::Fact,
};

use ::{
    im::Vector,
    itertools::Itertools,
    rulenet_script::Globals,
    std::{
        collections::{BTreeMap, HashSet},
        rc::Rc,
    },
    tracing::{debug, trace, warn},
};

/// The result of [`KnowledgeBase::query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    No,
    /// The query is known and binds no variables.
    Yes,
    Bindings(Vec<BTreeMap<String, String>>),
}

impl Answer {
    pub fn is_yes(&self) -> bool {
        match self {
            Answer::No => false,
            Answer::Yes | Answer::Bindings(_) => true,
        }
    }
}

/// A forward-chaining knowledge base.
///
/// Told facts are stored and matched against the conditions of every registered rule;
/// told rules are registered and matched against every stored fact. Either way, a rule
/// whose conditions are all matched fires and its consequences are told in turn, until
/// nothing new can be derived.
///
/// ```
/// # use rulenet::KnowledgeBase;
/// let mut kb = KnowledgeBase::new(r#"
///     fact  = { term ~ (" " ~ term)* }
///     term  = { v_var | word }
///     v_var = @{ "v_" ~ ASCII_ALPHANUMERIC+ }
///     word  = @{ ASCII_ALPHANUMERIC+ }
/// "#)?;
///
/// kb.tell("bob likes pizza")?;
/// kb.tell("v_X likes v_Y -> v_X enjoys v_Y")?;
///
/// assert!(kb.query("bob enjoys pizza")?.is_yes());
/// # Ok::<(), rulenet::KbError>(())
/// ```
#[derive(Debug)]
pub struct KnowledgeBase<F: FactSet = MemoryFactSet> {
    grammar: Grammar,
    config: Config,
    globals: Globals,
    facts: F,
    cond_set: CondSet,
    cons_set: ConsSet,
    agenda: Agenda,
    seen_rules: HashSet<String>,
    processing: bool,
    querying_rules: bool,
}

impl KnowledgeBase<MemoryFactSet> {
    pub fn new(grammar: &str) -> Result<Self, KbError> {
        Self::with_config(grammar, Config::default())
    }

    pub fn with_config(grammar: &str, config: Config) -> Result<Self, KbError> {
        let grammar = Grammar::new(grammar, &config)?;
        Ok(Self::from_parts(
            grammar,
            config,
            Globals::with_builtins(),
            MemoryFactSet::new(),
        ))
    }
}

impl<F: FactSet> KnowledgeBase<F> {
    pub fn from_parts(grammar: Grammar, config: Config, globals: Globals, facts: F) -> Self {
        Self {
            grammar,
            config,
            globals,
            facts,
            cond_set: CondSet::new(),
            cons_set: ConsSet::new(),
            agenda: Agenda::new(),
            seen_rules: HashSet::new(),
            processing: false,
            querying_rules: false,
        }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn facts(&self) -> &F {
        &self.facts
    }

    pub fn facts_mut(&mut self) -> &mut F {
        &mut self.facts
    }

    pub fn cond_set(&self) -> &CondSet {
        &self.cond_set
    }

    pub fn cons_set(&self) -> &ConsSet {
        &self.cons_set
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn globals_mut(&mut self) -> &mut Globals {
        &mut self.globals
    }

    /// Whether facts asserted by the activation being processed may seed rules.
    pub fn querying_rules(&self) -> bool {
        self.querying_rules
    }

    /// Parse `text` into sentences and assert them. When called while the knowledge
    /// base is already processing (from a script), the sentences are only queued.
    pub fn tell(&mut self, text: &str) -> Result<(), KbError> {
        for sentence in self.grammar.parse_sentences(text)? {
            let data = match sentence {
                Sentence::Fact(fact) => ActivationData::Fact {
                    fact,
                    query_rules: false,
                },
                Sentence::Rule(rule) => ActivationData::Rule {
                    rule: Rc::new(rule),
                    matching: Matching::new(),
                    condition: None,
                    query_rules: true,
                },
            };
            self.agenda.push(data);
        }

        self.process()
    }

    /// Drain the agenda.
    pub fn process(&mut self) -> Result<(), KbError> {
        if self.processing {
            return Ok(());
        }

        self.processing = true;
        self.seen_rules.clear();
        let result = self.drain();
        self.processing = false;

        if let Err(ref err) = result {
            warn!(error = %err, pending = self.agenda.len(), "processing aborted");
            self.agenda.clear();
        }

        result
    }

    fn drain(&mut self) -> Result<(), KbError> {
        while let Some(activation) = self.agenda.pop() {
            trace!(
                id = %activation.id,
                precedent = ?activation.precedent,
                "processing activation"
            );

            self.querying_rules = activation.data.query_rules();
            match activation.data {
                ActivationData::Fact { fact, query_rules } => self.process_fact(fact, query_rules),
                ActivationData::Rule {
                    rule,
                    matching,
                    condition,
                    query_rules,
                } => self.process_rule(rule, matching, condition, query_rules)?,
            }
        }

        Ok(())
    }

    fn process_fact(&mut self, fact: Fact, query_rules: bool) {
        if !self.facts.ask_fact(&fact).is_empty() {
            trace!(fact = %fact, "already known");
            return;
        }

        debug!(fact = %fact, "adding fact");
        self.facts.add_fact(fact.clone());

        let matching = Matching::new().with_origin(fact.clone());
        self.cond_set.propagate(
            fact.leaf_paths(),
            &matching,
            &mut self.agenda,
            query_rules,
        );
    }

    fn process_rule(
        &mut self,
        rule: Rc<Rule>,
        matching: Matching,
        condition: Option<Fact>,
        query_rules: bool,
    ) -> Result<(), KbError> {
        if query_rules {
            let key = format!(
                "{}|{}|{}",
                rule.key(),
                matching,
                condition.as_ref().map(ToString::to_string).unwrap_or_default()
            );
            if !self.seen_rules.insert(key) {
                trace!(rule = %rule, matching = %matching, "already seen");
                return Ok(());
            }
        }

        let remaining = rule.conditions.len();
        let complete = match condition {
            Some(_) => remaining <= 1,
            None => remaining == 0,
        };

        if complete {
            self.fire(&rule, &matching, query_rules)
        } else {
            self.specialize(&rule, condition.as_ref(), &matching, query_rules)
        }
    }

    fn specialize(
        &mut self,
        rule: &Rule,
        condition: Option<&Fact>,
        matching: &Matching,
        query_rules: bool,
    ) -> Result<(), KbError> {
        let specialized = match rule.specialize(condition, matching, &self.grammar)? {
            Some(specialized) => Rc::new(specialized),
            None => return Ok(()),
        };

        let fresh = self.cond_set.add_rule(&specialized);
        self.cons_set.add_rule(&specialized);
        if fresh {
            debug!(rule = %specialized, bindings = %specialized.extra_matching, "registered rule");
        }

        // A newly registered rule has to catch up with the facts already known; from
        // then on, propagation brings it every new one.
        if query_rules || fresh {
            for condition in specialized.conditions.iter() {
                for answer in self.facts.ask_fact(condition) {
                    self.agenda.push(ActivationData::Rule {
                        rule: specialized.clone(),
                        matching: answer,
                        condition: Some(condition.clone()),
                        query_rules,
                    });
                }
            }
        }

        Ok(())
    }

    fn fire(&mut self, rule: &Rule, matching: &Matching, query_rules: bool) -> Result<(), KbError> {
        let merged = match matching.merge(&rule.extra_matching) {
            Some(merged) => merged,
            None => return Ok(()),
        };

        let mut matchings = vec![merged];
        for extra in rule.extra_conditions.iter() {
            matchings = self.fan_out(extra, matchings, false)?;
            if matchings.is_empty() {
                trace!(rule = %rule, failed = %extra, "rule blocked");
                return Ok(());
            }
        }

        debug!(rule = %rule, instances = matchings.len(), "firing");
        for extra in rule.extra_consequences.iter() {
            matchings = self.fan_out(extra, matchings, true)?;
        }

        for matching in &matchings {
            for consequence in rule.consequences.iter() {
                let fact = consequence.substitute(matching, &self.grammar)?;
                self.agenda.push(ActivationData::Fact { fact, query_rules });
            }
        }

        Ok(())
    }

    /// Evaluate `extra` for each matching. Consequences never drop a matching, though
    /// they may still extend it.
    fn fan_out(
        &mut self,
        extra: &ExtraCon,
        matchings: Vec<Matching>,
        keep_failed: bool,
    ) -> Result<Vec<Matching>, KbError> {
        let mut next = Vec::with_capacity(matchings.len());
        for matching in matchings {
            match handlers::evaluate(self, extra, &matching)? {
                Outcome::Pass => next.push(matching),
                Outcome::Fail if keep_failed => next.push(matching),
                Outcome::Fail => {}
                Outcome::Expand(expanded) => next.extend(expanded),
            }
        }
        Ok(next)
    }

    /// Report an error raised by a script. Strict knowledge bases return it; otherwise
    /// it is logged and the agenda carries on.
    pub(crate) fn script_failure(
        &self,
        error: impl Into<KbError>,
        script: &str,
    ) -> Result<(), KbError> {
        let error = error.into();
        if self.config.strict_scripts {
            return Err(error);
        }

        warn!(error = %error, script, "script failed");
        Ok(())
    }

    pub fn ask(&self, pattern: &Fact) -> Vec<Matching> {
        self.facts.ask_fact(pattern)
    }

    pub fn ask_str(&self, text: &str) -> Result<Vec<Matching>, KbError> {
        let pattern = self.grammar.parse_fact(text)?;
        Ok(self.ask(&pattern))
    }

    pub fn query(&self, text: &str) -> Result<Answer, KbError> {
        let answers = self.ask_str(text)?;
        Ok(match answers.as_slice() {
            [] => Answer::No,
            [only] if only.is_empty() => Answer::Yes,
            _ => Answer::Bindings(answers.iter().map(Matching::to_dict).collect()),
        })
    }

    /// For every registered rule with a consequence matching `text`, the conditions
    /// that are not yet known. Known conditions contribute their bindings: each
    /// combination of them yields one report.
    pub fn goal(&mut self, text: &str) -> Result<Vec<Vec<Fact>>, KbError> {
        let fact = self.grammar.parse_fact(text)?;
        let mut scratch = Agenda::new();
        self.cons_set.propagate(
            fact.leaf_paths(),
            &Matching::new().with_origin(fact.clone()),
            &mut scratch,
            false,
        );
        let hits = self.cons_set.side_mut().take_backtracks();

        let mut reports = Vec::new();
        let mut seen = HashSet::new();
        for hit in hits {
            let base = match hit.matching.merge(&hit.rule.extra_matching) {
                Some(base) => base,
                None => continue,
            };

            let mut known = Vec::new();
            let mut missing = Vector::new();
            for condition in hit.rule.conditions.iter() {
                let answers = self.ask(&condition.substitute(&base, &self.grammar)?);
                if answers.is_empty() {
                    missing.push_back(condition.clone());
                } else {
                    known.push(answers);
                }
            }

            if missing.is_empty() {
                continue;
            }

            let combinations = known.iter().fold(vec![base], |combos, answers| {
                combos
                    .iter()
                    .flat_map(|combo| answers.iter().filter_map(move |answer| combo.merge(answer)))
                    .collect()
            });

            for combination in combinations {
                let report = missing
                    .iter()
                    .map(|condition| condition.substitute(&combination, &self.grammar))
                    .collect::<Result<Vec<_>, _>>()?;
                if seen.insert(report.iter().join("; ")) {
                    reports.push(report);
                }
            }
        }

        debug!(goal = %fact, reports = reports.len(), "goal");
        Ok(reports)
    }
}
