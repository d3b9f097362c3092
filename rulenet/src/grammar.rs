//! Runtime grammars.
//!
//! A user supplies PEG text in pest syntax which must define the fact rule (by default
//! `fact`). A *base grammar function* produces the rules for everything around facts:
//! sentences separated by `;` or newlines, rules written `cond, cond -> cons, cons`,
//! and extra conditions written `kind{text}`. The two are concatenated, compiled with
//! `pest_meta` and run on `pest_vm`.

use crate::{
    config::Config,
    error::{KbError, ParseError},
    rule::{ExtraCon, ExtraKind, Rule},
    syntax::{Fact, Path, Segment, LITERAL},
};

use ::{
    im::Vector,
    itertools::Itertools,
    pest::iterators::Pair,
    pest_vm::Vm,
    regex::Regex,
    std::{fmt, rc::Rc},
    tracing::trace,
};

pub type BaseGrammarFn = fn(&str) -> String;

const SENTENCES: &str = "__sentences";
const SENTENCE: &str = "__sentence";
const SINGLE: &str = "__single";
const RULE: &str = "__rule";
const CONDS: &str = "__conds";
const CONSES: &str = "__conses";
const EXTRA: &str = "__extra";

/// The default base grammar, with facts produced by `fact_rule`.
pub fn base_grammar(fact_rule: &str) -> String {
    format!(
        r#"
__sentences  = {{ SOI ~ __blank ~ (__sentence ~ (__sep ~ __sentence)*)? ~ __blank ~ EOI }}
__sentence   = {{ __rule | {fact} }}
__single     = {{ SOI ~ __s ~ {fact} ~ __s ~ EOI }}
__rule       = {{ __conds ~ __arrow ~ __conses }}
__conds      = {{ __premise ~ (__and ~ __premise)* }}
__conses     = {{ __premise ~ (__and ~ __premise)* }}
__premise    = _{{ __extra | {fact} }}
__extra      = ${{ __extra_kind ~ "{{" ~ __extra_text ~ "}}" }}
__extra_kind = @{{ "logic" | "unknown" | "python" | "exec" | "rm" }}
__extra_text = @{{ (!"}}" ~ ANY)* }}
__arrow      = _{{ __s ~ "->" ~ __s }}
__and        = _{{ __s ~ "," ~ __s }}
__sep        = _{{ (__s ~ (";" | NEWLINE))+ ~ __s }}
__blank      = _{{ (" " | "\t" | ";" | NEWLINE)* }}
__s          = _{{ (" " | "\t")* }}
"#,
        fact = fact_rule
    )
}

/// A top-level sentence: either a fact to assert or a rule to register.
#[derive(Debug, Clone)]
pub enum Sentence {
    Fact(Fact),
    Rule(Rule),
}

pub struct Grammar {
    vm: Vm,
    fact_rule: String,
    var_pattern: Regex,
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("fact_rule", &self.fact_rule)
            .field("var_pattern", &self.var_pattern.as_str())
            .finish()
    }
}

impl Grammar {
    pub fn new(text: &str, config: &Config) -> Result<Self, KbError> {
        Self::with_base(text, config, base_grammar)
    }

    pub fn with_base(text: &str, config: &Config, base: BaseGrammarFn) -> Result<Self, KbError> {
        let var_pattern = Regex::new(&config.var_range_expr)?;
        let source = format!("{}\n{}", text, base(&config.fact_rule));

        let (_, rules) = pest_meta::parse_and_optimize(&source).map_err(|errors| {
            KbError::Grammar(errors.iter().map(ToString::to_string).join("\n"))
        })?;

        if !rules.iter().any(|rule| rule.name == config.fact_rule) {
            return Err(KbError::Grammar(format!(
                "the grammar does not define the fact rule `{}`",
                config.fact_rule
            )));
        }

        Ok(Self {
            vm: Vm::new(rules),
            fact_rule: config.fact_rule.clone(),
            var_pattern,
        })
    }

    pub fn fact_rule(&self) -> &str {
        &self.fact_rule
    }

    pub fn is_var_category(&self, category: &str) -> bool {
        self.var_pattern.is_match(category)
    }

    /// Parse any number of sentences.
    pub fn parse_sentences(&self, text: &str) -> Result<Vec<Sentence>, KbError> {
        let mut pairs = self.vm.parse(SENTENCES, text).map_err(|err| ParseError {
            src: text.to_string(),
            message: err.to_string(),
        })?;

        let mut sentences = Vec::new();
        let root = match pairs.next() {
            Some(root) => root,
            None => return Ok(sentences),
        };

        for sentence in root.into_inner().filter(|p| p.as_rule() == SENTENCE) {
            for inner in sentence.into_inner() {
                if inner.as_rule() == RULE {
                    sentences.push(Sentence::Rule(self.build_rule(inner)?));
                } else if inner.as_rule() == self.fact_rule {
                    sentences.push(Sentence::Fact(self.build_fact(inner)));
                }
            }
        }

        trace!(count = sentences.len(), "parsed sentences");
        Ok(sentences)
    }

    /// Parse exactly one fact, surrounding blanks allowed.
    pub fn parse_fact(&self, text: &str) -> Result<Fact, KbError> {
        let pairs = self.vm.parse(SINGLE, text).map_err(|err| ParseError {
            src: text.to_string(),
            message: err.to_string(),
        })?;

        pairs
            .flatten()
            .find(|pair| pair.as_rule() == self.fact_rule)
            .map(|pair| self.build_fact(pair))
            .ok_or_else(|| {
                ParseError {
                    src: text.to_string(),
                    message: format!("no `{}` found", self.fact_rule),
                }
                .into()
            })
    }

    fn build_fact(&self, pair: Pair<&str>) -> Fact {
        let text = pair.as_str();
        let mut paths = Vec::new();
        let root = self.segment(&pair, 0, pair.as_span().start());
        self.collect_paths(pair, root, &mut Vec::new(), &mut paths);
        Fact::new(text, paths)
    }

    fn segment(&self, pair: &Pair<&str>, index: usize, parent_start: usize) -> Segment {
        let span = pair.as_span();
        let var = self.is_var_category(pair.as_rule());
        Segment {
            text: pair.as_str().into(),
            category: pair.as_rule().into(),
            index,
            start: span.start() - parent_start,
            end: span.end() - parent_start,
            leaf: var || pair.clone().into_inner().next().is_none(),
            var,
            sole: false,
        }
    }

    fn collect_paths(
        &self,
        pair: Pair<&str>,
        segment: Segment,
        prefix: &mut Vec<Segment>,
        paths: &mut Vec<Path>,
    ) {
        let leaf = segment.leaf;
        prefix.push(segment);

        if leaf {
            paths.push(Path::new(prefix.iter().cloned()));
        } else {
            let start = pair.as_span().start();
            let text = pair.as_str();
            let children = pair.into_inner().collect::<Vec<_>>();
            let sole = match children.as_slice() {
                [only] => only.as_str().len() == text.len(),
                _ => false,
            };

            let mut index = 0;
            let mut cursor = 0;
            for child in children {
                let span = child.as_span();
                if let Some(gap) = literal(text, cursor, span.start() - start, index) {
                    push_leaf(gap, prefix, paths);
                    index += 1;
                }

                let mut segment = self.segment(&child, index, start);
                segment.sole = sole;
                cursor = segment.end;
                index += 1;
                self.collect_paths(child, segment, prefix, paths);
            }

            if let Some(gap) = literal(text, cursor, text.len(), index) {
                push_leaf(gap, prefix, paths);
            }
        }

        prefix.pop();
    }

    fn build_rule(&self, pair: Pair<&str>) -> Result<Rule, KbError> {
        let mut conditions = Vector::new();
        let mut extra_conditions = Vector::new();
        let mut consequences = Vector::new();
        let mut extra_consequences = Vector::new();

        for side in pair.into_inner() {
            let (facts, extras) = match side.as_rule() {
                CONDS => (&mut conditions, &mut extra_conditions),
                CONSES => (&mut consequences, &mut extra_consequences),
                _ => continue,
            };

            for premise in side.into_inner() {
                if premise.as_rule() == EXTRA {
                    extras.push_back(self.build_extra(premise)?);
                } else if premise.as_rule() == self.fact_rule {
                    facts.push_back(self.build_fact(premise));
                }
            }
        }

        Ok(Rule::new(
            conditions,
            extra_conditions,
            consequences,
            extra_consequences,
        ))
    }

    fn build_extra(&self, pair: Pair<&str>) -> Result<ExtraCon, KbError> {
        let src = pair.as_str().to_string();
        let mut inner = pair.into_inner();
        let (kind, text) = match (inner.next(), inner.next()) {
            (Some(kind), text) => (kind.as_str(), text.map(|t| t.as_str()).unwrap_or("")),
            _ => {
                return Err(ParseError {
                    src,
                    message: "malformed extra condition".into(),
                }
                .into())
            }
        };

        let kind = ExtraKind::from_name(kind).ok_or_else(|| ParseError {
            src: src.clone(),
            message: format!("unknown extra condition kind `{}`", kind),
        })?;

        // Patterns are checked up front so that a typo fails the `tell` that
        // introduced it rather than silently never matching.
        if kind.takes_pattern() {
            self.parse_fact(text)?;
        }

        Ok(ExtraCon::new(kind, text))
    }
}

/// A leaf for the literal text in `text[from..to]`. Blank gaps make none.
fn literal(text: &str, from: usize, to: usize, index: usize) -> Option<Segment> {
    let gap = text.get(from..to)?;
    let trimmed = gap.trim();
    if trimmed.is_empty() {
        return None;
    }

    let start = from + (gap.len() - gap.trim_start().len());
    Some(Segment {
        text: trimmed.into(),
        category: LITERAL.into(),
        index,
        start,
        end: start + trimmed.len(),
        leaf: true,
        var: false,
        sole: false,
    })
}

fn push_leaf(segment: Segment, prefix: &mut Vec<Segment>, paths: &mut Vec<Path>) {
    prefix.push(segment);
    paths.push(Path::new(prefix.iter().cloned()));
    prefix.pop();
}
