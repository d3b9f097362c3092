use ::serde::Deserialize;

/// Knobs for a [`KnowledgeBase`](crate::KnowledgeBase). Every field has a default, so a
/// configuration file only needs to name what it changes:
///
/// ```
/// # use rulenet::Config;
/// let config: Config = toml::from_str("strict_scripts = true").unwrap();
/// assert_eq!(config.fact_rule, "fact");
/// assert!(config.strict_scripts);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the grammar rule that produces a single fact.
    pub fact_rule: String,

    /// Regular expression matched against grammar rule names. A parse node whose rule
    /// matches is a variable occurrence.
    pub var_range_expr: String,

    /// Return script errors from `tell` instead of treating the failing condition
    /// as false.
    pub strict_scripts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fact_rule: "fact".into(),
            var_range_expr: "^v_".into(),
            strict_scripts: false,
        }
    }
}
