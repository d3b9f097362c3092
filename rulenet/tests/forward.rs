use ::{
    failure::Error,
    rulenet::{prelude::*, FactSet},
};

const GRAMMAR: &str = r#"
fact  = { term ~ (" " ~ term)* }
term  = { v_var | word }
v_var = @{ "v_" ~ (ASCII_ALPHANUMERIC | "_")+ }
word  = @{ ASCII_ALPHANUMERIC+ }
"#;

const VERBS: &str = r#"
fact  = { term ~ (" likes " | " hates ") ~ term }
term  = { v_var | word }
v_var = @{ "v_" ~ (ASCII_ALPHANUMERIC | "_")+ }
word  = @{ ASCII_ALPHANUMERIC+ }
"#;

const BARE: &str = r#"
fact  = { (v_var | word) ~ (" " ~ (v_var | word))* }
v_var = @{ "v_" ~ (ASCII_ALPHANUMERIC | "_")+ }
word  = @{ ASCII_ALPHANUMERIC+ }
"#;

fn sorted_facts(kb: &KnowledgeBase) -> Vec<String> {
    let mut facts = kb.facts().iter().map(ToString::to_string).collect::<Vec<_>>();
    facts.sort();
    facts
}

#[test]
fn fact_then_rule() -> Result<(), Error> {
    let mut kb = KnowledgeBase::new(GRAMMAR)?;
    kb.tell("bob likes pizza")?;
    kb.tell("v_X likes v_Y -> v_X enjoys v_Y")?;

    assert_eq!(kb.ask_str("bob enjoys pizza")?, vec![Matching::new()]);
    assert_eq!(kb.query("bob enjoys pizza")?, Answer::Yes);
    Ok(())
}

#[test]
fn rule_then_fact() -> Result<(), Error> {
    let mut kb = KnowledgeBase::new(GRAMMAR)?;
    kb.tell("v_X likes v_Y -> v_X enjoys v_Y")?;
    kb.tell("bob likes pizza")?;

    assert_eq!(kb.query("bob enjoys pizza")?, Answer::Yes);
    assert_eq!(kb.query("pizza enjoys bob")?, Answer::No);
    Ok(())
}

#[test]
fn telling_twice_changes_nothing() -> Result<(), Error> {
    let mut kb = KnowledgeBase::new(GRAMMAR)?;
    kb.tell("v_X likes v_Y -> v_X enjoys v_Y")?;
    kb.tell("bob likes pizza")?;

    let facts = sorted_facts(&kb);
    let nodes = kb.cond_set().len();
    let rules = kb.cond_set().rule_count();

    kb.tell("bob likes pizza")?;
    assert_eq!(sorted_facts(&kb), facts);
    assert_eq!(kb.cond_set().len(), nodes);
    assert_eq!(kb.cond_set().rule_count(), rules);
    assert_eq!(kb.ask_str("bob likes pizza")?.len(), 1);
    Ok(())
}

#[test]
fn rules_share_conditions() -> Result<(), Error> {
    let mut kb = KnowledgeBase::new(GRAMMAR)?;
    kb.tell("v_X likes v_Y -> v_X enjoys v_Y")?;
    let nodes = kb.cond_set().len();
    kb.tell("v_A likes v_B -> v_B popular")?;
    assert_eq!(kb.cond_set().len(), nodes);

    kb.tell("bob likes pizza")?;
    assert!(kb.query("bob enjoys pizza")?.is_yes());
    assert!(kb.query("pizza popular")?.is_yes());
    Ok(())
}

#[test]
fn repeated_variables_must_agree() -> Result<(), Error> {
    let mut kb = KnowledgeBase::new(GRAMMAR)?;
    kb.tell("v_X likes v_X -> v_X vain")?;
    kb.tell("bob likes bob; alice likes bob")?;

    assert_eq!(kb.query("bob vain")?, Answer::Yes);
    assert_eq!(kb.query("alice vain")?, Answer::No);
    Ok(())
}

#[test]
fn fixpoint_does_not_depend_on_order() -> Result<(), Error> {
    let rule = "v_X parent v_Y, v_Y parent v_Z -> v_X grandparent v_Z";
    let facts = ["ann parent bea", "bea parent cid", "cid parent dan"];

    let mut rule_first = KnowledgeBase::new(GRAMMAR)?;
    rule_first.tell(rule)?;
    for fact in &facts {
        rule_first.tell(fact)?;
    }

    let mut facts_first = KnowledgeBase::new(GRAMMAR)?;
    for fact in facts.iter().rev() {
        facts_first.tell(fact)?;
    }
    facts_first.tell(rule)?;

    let mut batched = KnowledgeBase::new(GRAMMAR)?;
    batched.tell(rule)?;
    batched.tell(&facts.join("; "))?;

    assert_eq!(rule_first.query("ann grandparent cid")?, Answer::Yes);
    assert_eq!(rule_first.query("bea grandparent dan")?, Answer::Yes);
    assert_eq!(rule_first.query("ann grandparent dan")?, Answer::No);
    assert_eq!(sorted_facts(&rule_first), sorted_facts(&facts_first));
    assert_eq!(sorted_facts(&rule_first), sorted_facts(&batched));
    Ok(())
}

#[test]
fn chains_of_rules() -> Result<(), Error> {
    let mut kb = KnowledgeBase::new(GRAMMAR)?;
    kb.tell(
        "v_X is man -> v_X is mortal
         v_X is mortal -> v_X will die",
    )?;
    kb.tell("socrates is man")?;

    assert!(kb.query("socrates will die")?.is_yes());
    assert_eq!(
        kb.query("v_Who is mortal")?,
        Answer::Bindings(vec![vec![("v_Who".to_string(), "socrates".to_string())]
            .into_iter()
            .collect()])
    );
    Ok(())
}

#[test]
fn parse_errors_abort_the_tell() {
    let mut kb = KnowledgeBase::new(GRAMMAR).unwrap();
    assert!(matches!(
        kb.tell("bob likes pizza ->"),
        Err(KbError::Parse(_))
    ));
    assert!(kb.facts().is_empty());
}

#[test]
fn literal_words_distinguish_facts() -> Result<(), Error> {
    let mut kb = KnowledgeBase::new(VERBS)?;
    kb.tell("bob likes pizza")?;
    assert_eq!(kb.query("bob hates pizza")?, Answer::No);

    kb.tell("bob hates pizza")?;
    assert_eq!(sorted_facts(&kb), vec!["bob hates pizza", "bob likes pizza"]);

    kb.tell("v_X hates v_Y -> v_Y hates v_X")?;
    assert_eq!(kb.query("pizza hates bob")?, Answer::Yes);
    assert_eq!(kb.query("pizza likes bob")?, Answer::No);
    assert_eq!(kb.ask_str("v_X likes pizza")?.len(), 1);
    Ok(())
}

#[test]
fn variables_outside_a_production_bind_one_position() -> Result<(), Error> {
    let mut kb = KnowledgeBase::new(BARE)?;
    kb.tell("bob likes pizza")?;

    match kb.query("v_X likes pizza")? {
        Answer::Bindings(answers) => {
            assert_eq!(answers.len(), 1);
            assert_eq!(answers[0].get("v_X").map(String::as_str), Some("bob"));
        }
        other => panic!("expected bindings, got {:?}", other),
    }

    kb.tell("v_X likes v_Y -> v_X enjoys v_Y")?;
    assert_eq!(kb.query("bob enjoys pizza")?, Answer::Yes);
    Ok(())
}
