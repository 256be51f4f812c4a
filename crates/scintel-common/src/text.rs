//! Text helpers shared by connectors and risk rules.

/// Truncate to at most `max` characters, never splitting a character.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((end, _)) => s[..end].to_string(),
        None => s.to_string(),
    }
}

/// URL-safe identifier derived from a display name.
///
/// # Examples
///
/// ```
/// use scintel_common::text::slugify;
///
/// assert_eq!(slugify("SWM (Mativ)"), "swm-mativ");
/// assert_eq!(slugify("Tae Young Filters"), "tae-young-filters");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Case-insensitive whole-word search for `needle` in `haystack`.
///
/// Short identifiers such as `"ITC"` must not match inside longer words, so
/// the match has to be bounded by non-alphanumeric characters or the ends
/// of the text.
///
/// # Examples
///
/// ```
/// use scintel_common::text::mentions;
///
/// assert!(mentions("Infineon AURIX firmware", "infineon"));
/// assert!(!mentions("Switchboard controller", "itc"));
/// ```
pub fn mentions(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    let haystack = haystack.to_lowercase();
    haystack.match_indices(&needle).any(|(idx, _)| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_truncate_on_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello");
        assert_eq!(truncate_chars("ÉÉÉ", 2), "ÉÉ");
    }

    #[test]
    fn should_collapse_separators_when_slugifying() {
        assert_eq!(slugify("Huizhou BYD Electronic"), "huizhou-byd-electronic");
        assert_eq!(slugify("  Stora   Enso  "), "stora-enso");
        assert_eq!(slugify("Philip Morris Int."), "philip-morris-int");
    }

    #[test]
    fn should_require_word_boundaries_for_mentions() {
        assert!(mentions("Texas Instruments TI-RTOS", "Texas Instruments"));
        assert!(mentions("ITC Ltd.", "itc"));
        assert!(!mentions("Fujitsu Server", "fuji"));
        assert!(mentions("FUJI film", "Fuji"));
        assert!(!mentions("anything", "  "));
    }
}
