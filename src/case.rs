//! Identifier transforms: name transforms for table/column names, and URL slugs for display names.

use std::sync::Arc;

/// Optional transform applied uniformly to every derived table and column name.
pub type NameTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Convert a single identifier from CamelCase to snake_case.
/// e.g. "BlogPost" -> "blog_post", "CategoryId" -> "category_id"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Name transform producing snake_case, for databases created by ORMs with that convention.
pub fn snake_case_transform() -> NameTransform {
    Arc::new(to_snake_case)
}

/// URL-safe ASCII slug: lowercase, runs of non-alphanumerics collapsed to `-`.
pub fn slugify(name: &str) -> String {
    slug::slugify(name)
}

/// Apply the optional transform to an identifier.
pub fn transform_name(transform: Option<&NameTransform>, name: &str) -> String {
    match transform {
        Some(f) => f(name),
        None => name.to_string(),
    }
}

/// Whether `s` can be interpolated into SQL as an identifier: ASCII letters, digits and `_`, not starting with a digit.
pub fn is_sql_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("BlogPost", "blog_post")]
    #[case("CategoryId", "category_id")]
    #[case("Id", "id")]
    #[case("already_snake", "already_snake")]
    #[case("Some_Thing", "some_thing")]
    fn snake_case(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(to_snake_case(input), expected);
    }

    #[rstest]
    #[case("Blog post", "blog-post")]
    #[case("BlogPost", "blogpost")]
    #[case("  Fancy -- Name!! ", "fancy-name")]
    fn slugs(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[test]
    fn transform_is_optional() {
        let snake = snake_case_transform();
        assert_eq!(transform_name(Some(&snake), "BlogPost"), "blog_post");
        assert_eq!(transform_name(None, "BlogPost"), "BlogPost");
    }

    #[rstest]
    #[case("blog_post", true)]
    #[case("_x1", true)]
    #[case("1abc", false)]
    #[case("a b", false)]
    #[case("a?", false)]
    #[case("", false)]
    fn identifiers(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(is_sql_identifier(input), ok);
    }
}
