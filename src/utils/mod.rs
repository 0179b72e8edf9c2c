use once_cell::sync::Lazy;
use regex::Regex;

/// Default prefix of the per-source bookkeeping tables
pub const DEFAULT_TABLE_PREFIX: &str = "migrations";

/// Default driver/dialect identifier
pub const DEFAULT_DIALECT: &str = "postgres";

/// Scope passed to source enumerators for the source root
pub const ROOT_SCOPE: &str = "";

/// Anything that fits inside a double-quoted SQL identifier
static QUOTABLE_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[^"\x00-\x1f]+$"#).expect("identifier pattern is valid"));

/// Check that a table name can be written as a quoted identifier
pub fn is_quotable_identifier(s: &str) -> bool {
    QUOTABLE_IDENTIFIER.is_match(s)
}

/// Build the version-tracking namespace for a source: `<prefix>_<name>`.
///
/// An empty name yields `<prefix>_`.
pub fn namespace_for(prefix: &str, name: &str) -> String {
    format!("{}_{}", prefix, name)
}
