use super::*;
use crate::config::Config;
use ::failure::Error;

const NESTED: &str = r#"
fact  = { term ~ (" " ~ term)* }
term  = { v_var | group | word }
group = { "(" ~ fact ~ ")" }
v_var = @{ "v_" ~ (ASCII_ALPHANUMERIC | "_")+ }
word  = @{ ASCII_ALPHANUMERIC+ }
"#;

const BARE: &str = r#"
fact  = { (v_var | word) ~ (" " ~ (v_var | word))* }
v_var = @{ "v_" ~ (ASCII_ALPHANUMERIC | "_")+ }
word  = @{ ASCII_ALPHANUMERIC+ }
"#;

fn grammar() -> Grammar {
    Grammar::new(NESTED, &Config::default()).unwrap()
}

#[test]
fn facts_compare_by_structure() -> Result<(), Error> {
    let grammar = grammar();
    let a = grammar.parse_fact("bob likes pizza")?;
    let b = grammar.parse_fact("  bob likes pizza ")?;
    let c = grammar.parse_fact("alice likes pizza")?;

    assert_eq!(a, b);
    assert_ne!(a, c);

    let mut set = std::collections::HashSet::new();
    set.insert(a);
    assert!(set.contains(&b));
    Ok(())
}

#[test]
fn variables_bind_their_slot() -> Result<(), Error> {
    let grammar = grammar();
    let pattern = grammar.parse_fact("v_X likes pizza")?;
    let fact = grammar.parse_fact("(big bob) likes pizza")?;

    let var = &pattern.leaf_paths()[0];
    assert!(var.is_var());
    assert_eq!(var.slot_span(), Some((0, 3)));

    let subpath = fact.leaf_paths()[0].get_subpath(var).unwrap();
    assert_eq!(subpath.value(), "(big bob)");
    assert_eq!(subpath.span(), (0, 9));
    assert_eq!(subpath.paths_after(fact.leaf_paths()).len(), 2);

    let matching = pattern.match_against(&fact).unwrap();
    assert_eq!(matching.get("v_X"), Some("(big bob)"));
    assert_eq!(matching.origin(), Some(&fact));
    Ok(())
}

#[test]
fn variables_with_siblings_bind_their_position() -> Result<(), Error> {
    let grammar = Grammar::new(BARE, &Config::default())?;
    let pattern = grammar.parse_fact("v_X likes v_Y")?;
    let fact = grammar.parse_fact("bob likes pizza")?;

    assert_eq!(pattern.leaf_paths()[0].slot_span(), Some((0, 3)));
    let matching = pattern.match_against(&fact).unwrap();
    assert_eq!(matching.get("v_X"), Some("bob"));
    assert_eq!(matching.get("v_Y"), Some("pizza"));
    assert_eq!(pattern.substitute(&matching, &grammar)?, fact);

    // Alone, the variable fills the whole fact.
    let lone = grammar.parse_fact("v_X")?.match_against(&fact).unwrap();
    assert_eq!(lone.get("v_X"), Some("bob likes pizza"));
    Ok(())
}

#[test]
fn literal_text_is_part_of_the_fact() -> Result<(), Error> {
    let grammar = grammar();
    let fact = grammar.parse_fact("(big bob) likes pizza")?;
    let literals = fact
        .leaf_paths()
        .iter()
        .filter(|path| path.segments().last().map(|seg| &*seg.category) == Some(LITERAL))
        .map(Path::value)
        .collect::<Vec<_>>();

    assert_eq!(literals, vec!["(", ")"]);
    assert_ne!(fact, grammar.parse_fact("big bob likes pizza")?);
    Ok(())
}

#[test]
fn repeated_variables_must_agree() -> Result<(), Error> {
    let grammar = grammar();
    let pattern = grammar.parse_fact("v_X likes v_X")?;

    assert!(pattern
        .match_against(&grammar.parse_fact("bob likes bob")?)
        .is_some());
    assert!(pattern
        .match_against(&grammar.parse_fact("bob likes pizza")?)
        .is_none());
    assert!(grammar
        .parse_fact("v_X likes")?
        .match_against(&grammar.parse_fact("bob likes pizza")?)
        .is_none());
    Ok(())
}

#[test]
fn substitution_reparses() -> Result<(), Error> {
    let grammar = grammar();
    let pattern = grammar.parse_fact("v_X likes v_Y")?;
    let matching: Matching = vec![("v_X", "(big bob)"), ("v_Y", "pizza")]
        .into_iter()
        .collect();

    let fact = pattern.substitute(&matching, &grammar)?;
    assert_eq!(fact.text(), "(big bob) likes pizza");
    assert_eq!(fact, grammar.parse_fact("(big bob) likes pizza")?);
    assert!(!fact.has_vars());

    let partial: Matching = vec![("v_Y", "pizza")].into_iter().collect();
    let fact = pattern.substitute(&partial, &grammar)?;
    assert_eq!(fact.text(), "v_X likes pizza");
    assert_eq!(fact.vars(), vec!["v_X"]);
    Ok(())
}

#[test]
fn normalization_is_positional() -> Result<(), Error> {
    let grammar = grammar();
    let (varmap, paths) = grammar.parse_fact("v_A gives v_B to v_A")?.normalize();
    let (_, renamed) = grammar.parse_fact("v_Q gives v_R to v_Q")?.normalize();

    assert_eq!(paths, renamed);
    assert_eq!(
        paths.iter().filter(|p| p.is_var()).map(Path::value).collect::<Vec<_>>(),
        vec!["v_0", "v_1", "v_0"]
    );
    assert_eq!(varmap.get("v_0").map(String::as_str), Some("v_A"));
    assert_eq!(varmap.get("v_1").map(String::as_str), Some("v_B"));
    Ok(())
}
