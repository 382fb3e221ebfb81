//! Slug generation for composition URLs

/// Lowercase a title and collapse every non-alphanumeric run to a single `-`
///
/// # Examples
///
/// ```
/// use ragtime_common::slug::slugify;
///
/// assert_eq!(slugify("Maple Leaf Rag"), "maple-leaf-rag");
/// assert_eq!(slugify("The Entertainer!!"), "the-entertainer");
/// assert_eq!(slugify("  Solace — A Mexican Serenade  "), "solace-a-mexican-serenade");
/// ```
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Build a composition slug from a unique prefix and its title
///
/// The prefix (a guid fragment) keeps slugs unique even when two
/// compositions share a title; the database's unique index remains the
/// final arbiter.
///
/// # Examples
///
/// ```
/// use ragtime_common::slug::generate_slug;
///
/// assert_eq!(generate_slug("1a2b3c4d", "Maple Leaf Rag"), "1a2b3c4d-maple-leaf-rag");
/// // A title with no usable characters still yields a valid slug
/// assert_eq!(generate_slug("1a2b3c4d", "!!!"), "1a2b3c4d");
/// ```
pub fn generate_slug(prefix: &str, title: &str) -> String {
    let body = slugify(title);
    if body.is_empty() {
        prefix.to_string()
    } else {
        format!("{}-{}", prefix, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Maple Leaf Rag"), "maple-leaf-rag");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
        assert_eq!(slugify("MiXeD CaSe"), "mixed-case");
    }

    #[test]
    fn test_slugify_collapses_runs() {
        assert_eq!(slugify("a  --  b"), "a-b");
        assert_eq!(slugify("rock & roll"), "rock-roll");
    }

    #[test]
    fn test_slugify_trims_edges() {
        assert_eq!(slugify("  trimmed  "), "trimmed");
        assert_eq!(slugify("!leading and trailing!"), "leading-and-trailing");
    }

    #[test]
    fn test_slugify_non_ascii_dropped() {
        assert_eq!(slugify("études"), "tudes");
        assert_eq!(slugify("歌"), "");
    }

    #[test]
    fn test_generate_slug_empty_title_body() {
        assert_eq!(generate_slug("deadbeef", ""), "deadbeef");
        assert_eq!(generate_slug("deadbeef", "???"), "deadbeef");
    }
}
