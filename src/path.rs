//! Diagnostic paths.
//!
//! Paths start empty at the root and grow as traversal descends:
//! `envVars.FOO`, `labels[2]`, `routes[0].host`.

/// Append a field name or map key segment.
pub fn field(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

/// Append an array index segment.
pub fn index(base: &str, i: usize) -> String {
    format!("{}[{}]", base, i)
}
