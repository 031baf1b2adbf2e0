use serde::{Deserialize, Serialize};

/// Default bound on expression nesting.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Execution knobs shared by every call on one executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Context {
    /// Expose binding names with `.` replaced by `_`, since a dotted name
    /// can never be written as an identifier in a script.
    pub groovify_names: bool,
    /// Deepest expression nesting a script may use. Brackets, unary
    /// operators, chained binary operators and `.`/`[]` steps each count
    /// as one level. Deeper scripts fail to parse.
    pub max_depth: usize,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            groovify_names: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let ctx: Context = serde_json::from_str("{}").unwrap();
        assert_eq!(ctx, Context::default());
        let ctx: Context = serde_json::from_str(r#"{"groovify_names": false}"#).unwrap();
        assert!(!ctx.groovify_names);
        assert_eq!(ctx.max_depth, DEFAULT_MAX_DEPTH);
        let ctx: Context = serde_json::from_str(r#"{"max_depth": 8}"#).unwrap();
        assert_eq!(ctx.max_depth, 8);
        assert!(ctx.groovify_names);
    }
}
