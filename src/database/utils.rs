use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?").expect("placeholder pattern is valid"));

/// Collapse whitespace and rewrite `?` placeholders into Postgres `$n` form.
pub fn sql(query: &str) -> String {
    let cleaned = query.split_whitespace().collect::<Vec<&str>>().join(" ");
    let mut param_index = 0;
    PLACEHOLDER
        .replace_all(&cleaned, |_: &Captures| {
            param_index += 1;
            format!("${}", param_index)
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn numbers_placeholders_in_order() {
        assert_eq!(
            sql(r#"
                SELECT id FROM t
                WHERE a = ? AND (?::uuid IS NULL OR b = ?)
            "#),
            "SELECT id FROM t WHERE a = $1 AND ($2::uuid IS NULL OR b = $3)"
        );
    }

    #[test]
    fn leaves_queries_without_placeholders_alone() {
        assert_eq!(sql("SELECT 1"), "SELECT 1");
    }
}
