use ::{
    failure::Error,
    rulenet::{prelude::*, script::ScriptError},
};

const GRAMMAR: &str = r#"
fact  = { term ~ (" " ~ term)* }
term  = { v_var | word }
v_var = @{ "v_" ~ (ASCII_ALPHANUMERIC | "_")+ }
word  = @{ (ASCII_ALPHANUMERIC | ".")+ }
"#;

#[test]
fn logic_requires_a_known_fact() -> Result<(), Error> {
    let mut kb = KnowledgeBase::new(GRAMMAR)?;
    kb.tell("v_X is bird, logic{v_X is small} -> v_X is cute")?;
    kb.tell("tweety is small; tweety is bird; big is bird")?;

    assert!(kb.query("tweety is cute")?.is_yes());
    assert!(!kb.query("big is cute")?.is_yes());
    Ok(())
}

#[test]
fn negation_as_failure() -> Result<(), Error> {
    let mut kb = KnowledgeBase::new(GRAMMAR)?;
    kb.tell("v_X is bird, unknown{v_X is penguin} -> v_X flies")?;

    kb.tell("tweety is bird")?;
    assert!(kb.query("tweety flies")?.is_yes());

    kb.tell("pingu is penguin; pingu is bird")?;
    assert!(!kb.query("pingu flies")?.is_yes());

    // Learning the exception later does not withdraw the conclusion.
    kb.tell("tweety is penguin")?;
    assert!(kb.query("tweety flies")?.is_yes());
    Ok(())
}

#[test]
fn negation_is_checked_again_when_a_fact_returns() -> Result<(), Error> {
    let mut kb = KnowledgeBase::new(GRAMMAR)?;
    kb.tell("v_X is bird, unknown{v_X is penguin} -> v_X flies")?;
    kb.tell("v_X lands -> rm{v_X is bird}, rm{v_X flies}")?;

    kb.tell("tweety is bird")?;
    assert!(kb.query("tweety flies")?.is_yes());

    kb.tell("tweety lands")?;
    assert_eq!(kb.query("tweety is bird")?, Answer::No);
    assert_eq!(kb.query("tweety flies")?, Answer::No);

    kb.tell("tweety is penguin")?;
    kb.tell("tweety is bird")?;
    assert!(kb.query("tweety is bird")?.is_yes());
    assert_eq!(kb.query("tweety flies")?, Answer::No);
    Ok(())
}

#[test]
fn retraction_does_not_cascade() -> Result<(), Error> {
    let mut kb = KnowledgeBase::new(GRAMMAR)?;
    kb.tell("v_X is alive -> v_X breathes")?;
    kb.tell("v_X is dead -> rm{v_X is alive}")?;

    kb.tell("bob is alive")?;
    assert!(kb.query("bob breathes")?.is_yes());

    kb.tell("bob is dead")?;
    assert_eq!(kb.query("bob is alive")?, Answer::No);
    assert_eq!(kb.query("bob breathes")?, Answer::Yes);
    Ok(())
}

#[test]
fn python_binds_new_variables() -> Result<(), Error> {
    let mut kb = KnowledgeBase::new(GRAMMAR)?;
    kb.tell("v_X has v_N, python{v_M = v_N + 1} -> v_X next v_M")?;
    kb.tell("bob has 2; alice has 2.5")?;

    assert!(kb.query("bob next 3")?.is_yes());
    assert!(kb.query("alice next 3.5")?.is_yes());
    Ok(())
}

#[test]
fn python_filters() -> Result<(), Error> {
    let mut kb = KnowledgeBase::new(GRAMMAR)?;
    kb.tell("v_X age v_N, python{v_N >= 18} -> v_X adult")?;
    kb.tell("v_X age v_N, python{test = v_N < 18; v_Y = 18 - v_N} -> v_X waits v_Y")?;
    kb.tell("ann age 20; bob age 15")?;

    assert!(kb.query("ann adult")?.is_yes());
    assert!(!kb.query("bob adult")?.is_yes());
    assert!(kb.query("bob waits 3")?.is_yes());
    assert!(!kb.query("ann waits v_Y")?.is_yes());
    Ok(())
}

#[test]
fn python_sees_globals() -> Result<(), Error> {
    let mut kb = KnowledgeBase::new(GRAMMAR)?;
    kb.globals_mut().insert_value("limit", 100.);
    kb.tell("v_X costs v_N, python{v_N > limit} -> v_X expensive")?;
    kb.tell("car costs 5000; pen costs 2")?;

    assert!(kb.query("car expensive")?.is_yes());
    assert!(!kb.query("pen expensive")?.is_yes());
    Ok(())
}

#[test]
fn exec_can_tell() -> Result<(), Error> {
    let mut kb = KnowledgeBase::new(GRAMMAR)?;
    kb.tell("v_X arrives -> exec{tell(v_X + ' welcomed')}")?;
    kb.tell("v_X welcomed -> v_X happy")?;
    kb.tell("bob arrives")?;

    assert!(kb.query("bob welcomed")?.is_yes());
    assert!(kb.query("bob happy")?.is_yes());
    Ok(())
}

#[test]
fn bad_sentences_from_scripts_do_not_stop_the_agenda() -> Result<(), Error> {
    let mut kb = KnowledgeBase::new(GRAMMAR)?;
    kb.tell("v_X arrives -> exec{tell('!!!')}, v_X seen")?;
    kb.tell("bob arrives; ann arrives")?;

    assert!(kb.query("bob seen")?.is_yes());
    assert!(kb.query("ann seen")?.is_yes());

    let config = Config {
        strict_scripts: true,
        ..Config::default()
    };
    let mut strict = KnowledgeBase::with_config(GRAMMAR, config)?;
    strict.tell("v_X arrives -> exec{tell('!!!')}, v_X seen")?;
    match strict.tell("bob arrives") {
        Err(KbError::Parse(err)) => assert_eq!(err.src, "!!!"),
        other => panic!("expected a parse error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn script_errors_are_failures_by_default() -> Result<(), Error> {
    let mut kb = KnowledgeBase::new(GRAMMAR)?;
    kb.tell("v_X has v_N, python{v_N / 0 > 1} -> v_X broken")?;
    kb.tell("v_X has v_N, exec{nope(v_N)} -> v_X checked")?;
    kb.tell("bob has 2")?;

    assert!(!kb.query("bob broken")?.is_yes());
    assert!(kb.query("bob checked")?.is_yes());
    Ok(())
}

#[test]
fn strict_scripts_fail_loudly() -> Result<(), Error> {
    let config = Config {
        strict_scripts: true,
        ..Config::default()
    };
    let mut kb = KnowledgeBase::with_config(GRAMMAR, config)?;
    kb.tell("v_X has v_N, python{v_N / 0 > 1} -> v_X broken")?;

    match kb.tell("bob has 2") {
        Err(KbError::Script(ScriptError::DivisionByZero)) => {}
        other => panic!("expected a division by zero, got {:?}", other),
    }
    assert!(!kb.query("bob broken")?.is_yes());
    Ok(())
}
