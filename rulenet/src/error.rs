use ::{
    derive_more::From,
    failure::Fail,
    rulenet_script::ScriptError,
};

#[derive(Debug, Clone, PartialEq, Eq, Fail)]
#[fail(display = "could not parse `{}`: {}", src, message)]
pub struct ParseError {
    pub src: String,
    pub message: String,
}

#[derive(Debug, Fail, From)]
pub enum KbError {
    #[fail(display = "{}", _0)]
    Parse(#[fail(cause)] ParseError),

    #[from(ignore)]
    #[fail(display = "invalid grammar: {}", _0)]
    Grammar(String),

    #[fail(display = "invalid variable pattern: {}", _0)]
    VarPattern(#[fail(cause)] regex::Error),

    #[fail(display = "script error: {}", _0)]
    Script(#[fail(cause)] ScriptError),
}
