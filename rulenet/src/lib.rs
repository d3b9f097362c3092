//! rulenet is a forward-chaining knowledge base over a user-defined syntax.
//!
//! Sentences are parsed with a grammar supplied at runtime as pest PEG text. A sentence
//! is either a *fact*, or a *rule* of the form `cond, cond -> cons, cons`. Grammar nodes
//! whose rule name matches the variable pattern (by default `^v_`) are variables, and a
//! variable matches whatever text fills its place in a fact.
//!
//! Rule conditions and consequences are indexed in a discrimination tree shared by all
//! rules. Telling a fact propagates it through the tree; telling a rule queries the
//! known facts. Matches specialize rules one condition at a time until a rule is fully
//! matched and fires.
//!
//! Besides facts, rules may carry *extra conditions* written `kind{text}`:
//!
//! - `logic{pattern}` holds if the pattern is known,
//! - `unknown{pattern}` holds if it is not (negation as failure),
//! - `python{script}` runs a script in the small expression language of
//!   [`rulenet_script`], and may bind new variables,
//! - `exec{script}` runs a script for its effects only,
//! - `rm{pattern}`, as a consequence, retracts a fact.
//!
//! Retraction does not cascade: facts derived from a retracted fact stay known.

pub mod activation;
pub mod config;
pub mod error;
pub mod fact_set;
pub mod grammar;
pub mod handlers;
pub mod knowledge_base;
pub mod matching;
pub mod rule;
pub mod rule_set;
pub mod syntax;

pub use crate::{
    config::Config,
    error::{KbError, ParseError},
    fact_set::{FactSet, MemoryFactSet},
    grammar::{base_grammar, BaseGrammarFn, Grammar, Sentence},
    knowledge_base::{Answer, KnowledgeBase},
    matching::{Matching, VarMap},
    rule::{ExtraCon, ExtraKind, Rule},
    syntax::{Fact, Path, Segment},
};

pub use rulenet_script as script;

pub mod prelude {
    pub use crate::{
        config::Config,
        error::KbError,
        fact_set::{FactSet, MemoryFactSet},
        knowledge_base::{Answer, KnowledgeBase},
        matching::Matching,
        syntax::Fact,
    };

    pub use rulenet_script::{Globals, Value};
}
