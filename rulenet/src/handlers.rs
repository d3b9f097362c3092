//! Evaluation of extra conditions and extra consequences.

use crate::{
    error::KbError,
    fact_set::FactSet,
    knowledge_base::KnowledgeBase,
    matching::Matching,
    rule::{ExtraCon, ExtraKind},
    syntax::Fact,
};

use ::{
    rulenet_script::{Env, Program, ScriptError, Value},
    tracing::trace,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Pass,
    Fail,
    /// Continue with each of these matchings instead of the one evaluated.
    Expand(Vec<Matching>),
}

pub fn evaluate<F: FactSet>(
    kb: &mut KnowledgeBase<F>,
    extra: &ExtraCon,
    matching: &Matching,
) -> Result<Outcome, KbError> {
    let outcome = match extra.kind {
        ExtraKind::Logic => {
            let pattern = pattern(kb, &extra.text, matching)?;
            pass_if(!kb.ask(&pattern).is_empty())
        }
        ExtraKind::Unknown => {
            let pattern = pattern(kb, &extra.text, matching)?;
            pass_if(kb.ask(&pattern).is_empty())
        }
        ExtraKind::Python => python(kb, &extra.text, matching)?,
        ExtraKind::Exec => exec(kb, &extra.text, matching)?,
        ExtraKind::Rm => {
            let fact = pattern(kb, &extra.text, matching)?;
            let removed = kb.facts_mut().rm_fact(&fact);
            trace!(fact = %fact, removed, "retracted");
            Outcome::Pass
        }
    };

    trace!(extra = %extra, matching = %matching, outcome = ?outcome, "evaluated");
    Ok(outcome)
}

fn pass_if(pass: bool) -> Outcome {
    if pass {
        Outcome::Pass
    } else {
        Outcome::Fail
    }
}

fn pattern<F: FactSet>(
    kb: &KnowledgeBase<F>,
    text: &str,
    matching: &Matching,
) -> Result<Fact, KbError> {
    let grammar = kb.grammar();
    grammar.parse_fact(text)?.substitute(matching, grammar)
}

fn python<F: FactSet>(
    kb: &mut KnowledgeBase<F>,
    text: &str,
    matching: &Matching,
) -> Result<Outcome, KbError> {
    let result = run_script(kb, text, matching, |env, program| {
        if let Some(expr) = program.as_expression() {
            return Ok(pass_if(env.eval(expr)?.is_truthy()));
        }

        env.exec(program)?;
        if let Some(test) = env.local("test") {
            if !test.is_truthy() {
                return Ok(Outcome::Fail);
            }
        }

        let mut expanded = matching.clone();
        for (name, value) in env.locals() {
            if name == "test" || matching.contains(name) {
                continue;
            }
            expanded = match expanded.bind(name, &value.to_string()) {
                Some(expanded) => expanded,
                None => return Ok(Outcome::Fail),
            };
        }

        if expanded.len() == matching.len() {
            Ok(Outcome::Pass)
        } else {
            Ok(Outcome::Expand(vec![expanded]))
        }
    })?;

    Ok(result.unwrap_or(Outcome::Fail))
}

fn exec<F: FactSet>(
    kb: &mut KnowledgeBase<F>,
    text: &str,
    matching: &Matching,
) -> Result<Outcome, KbError> {
    run_script(kb, text, matching, |env, program| {
        env.exec(program)?;
        Ok(())
    })?;
    Ok(Outcome::Pass)
}

/// Run `body` with the bindings of `matching` as locals, then tell whatever the script
/// queued. Script errors, and sentences told by the script that fail to parse, are
/// reported through the knowledge base. Unless scripts are strict, a failed script
/// comes back as `Ok(None)`.
fn run_script<F, T, B>(
    kb: &mut KnowledgeBase<F>,
    text: &str,
    matching: &Matching,
    body: B,
) -> Result<Option<T>, KbError>
where
    F: FactSet,
    B: FnOnce(&mut Env, &Program) -> Result<T, ScriptError>,
{
    let program = match Program::parse(text) {
        Ok(program) => program,
        Err(err) => {
            kb.script_failure(err, text)?;
            return Ok(None);
        }
    };

    let (result, told) = {
        let mut env = Env::new(kb.globals());
        for (name, value) in matching.iter() {
            env.set(name, Value::from_binding(value));
        }
        let result = body(&mut env, &program);
        (result, env.take_told())
    };

    for sentence in told {
        if let Err(err) = kb.tell(&sentence) {
            kb.script_failure(err, text)?;
        }
    }

    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            kb.script_failure(err, text)?;
            Ok(None)
        }
    }
}
