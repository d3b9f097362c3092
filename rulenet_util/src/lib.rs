use ::{
    derive_more::From,
    failure::Fail,
    rulenet::{prelude::*, KbError},
    std::{fs, path::Path},
};

#[derive(Debug, Fail, From)]
pub enum ErrorKind {
    #[fail(display = "IO error: `{}`", _0)]
    Io(#[cause] std::io::Error),

    #[fail(display = "knowledge base error: `{}`", _0)]
    Kb(#[cause] KbError),

    #[fail(display = "error reading configuration: `{}`", _0)]
    Toml(#[cause] toml::de::Error),
}

pub fn load_config<P>(path: Option<&P>) -> Result<Config, ErrorKind>
where
    P: AsRef<Path> + ?Sized,
{
    match path {
        Some(path) => Ok(toml::from_str(&fs::read_to_string(path.as_ref())?)?),
        None => Ok(Config::default()),
    }
}

/// Build a knowledge base from a grammar file and tell it the contents of each input
/// file in order.
pub fn load_knowledge_base<P, Q>(
    grammar: &P,
    config: Config,
    inputs: &[Q],
) -> Result<KnowledgeBase, ErrorKind>
where
    P: AsRef<Path> + ?Sized,
    Q: AsRef<Path>,
{
    let grammar = fs::read_to_string(grammar.as_ref())?;
    let mut kb = KnowledgeBase::with_config(&grammar, config)?;

    for input in inputs {
        let text = fs::read_to_string(input.as_ref())?;
        kb.tell(&text)?;
        tracing::info!(
            file = %input.as_ref().display(),
            facts = kb.facts().len(),
            "loaded"
        );
    }

    Ok(kb)
}
