//! Canonical label path encoding.
//!
//! A facet label is a path of UTF-8 components joined with the unit
//! separator `\u{1F}`. Components containing the separator or the escape
//! character `\u{1E}` are escaped by prefixing `\u{1E}`. These are the
//! library's wire-level label rules; dictionaries are sorted over the
//! encoded form.

/// Joins path components in the encoded label.
pub const DELIM_CHAR: char = '\u{1f}';

/// Escapes occurrences of [`DELIM_CHAR`] and itself inside components.
const ESCAPE_CHAR: char = '\u{1e}';

/// Encode `dim` plus `path` components into a single label string.
pub fn path_to_string(dim: &str, path: &[&str]) -> String {
    let mut out = String::with_capacity(dim.len() + path.iter().map(|p| p.len() + 1).sum::<usize>());
    for (i, component) in std::iter::once(dim).chain(path.iter().copied()).enumerate() {
        if i > 0 {
            out.push(DELIM_CHAR);
        }
        for c in component.chars() {
            if c == DELIM_CHAR || c == ESCAPE_CHAR {
                out.push(ESCAPE_CHAR);
            }
            out.push(c);
        }
    }
    out
}

/// Decode a label string back into its path components.
pub fn string_to_path(s: &str) -> Vec<String> {
    if s.is_empty() {
        return Vec::new();
    }
    let mut components = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE_CHAR {
            if let Some(escaped) = chars.next() {
                current.push(escaped);
            }
        } else if c == DELIM_CHAR {
            components.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    components.push(current);
    components
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_simple() {
        let s = path_to_string("color", &["red", "dark"]);
        assert_eq!(string_to_path(&s), vec!["color", "red", "dark"]);
    }

    #[test]
    fn test_dim_only() {
        let s = path_to_string("color", &[]);
        assert_eq!(s, "color");
        assert_eq!(string_to_path(&s), vec!["color"]);
    }

    #[test]
    fn test_components_with_separator_chars() {
        let tricky = format!("a{}b{}c", DELIM_CHAR, '\u{1e}');
        let s = path_to_string("dim", &[&tricky, "plain"]);
        assert_eq!(string_to_path(&s), vec!["dim".to_string(), tricky, "plain".to_string()]);
    }

    #[test]
    fn test_encoded_order_matches_component_order() {
        // Prefixes sort before their extensions, so ancestors precede
        // descendants in a sorted dictionary
        let a = path_to_string("a", &[]);
        let ab = path_to_string("a", &["b"]);
        let abc = path_to_string("a", &["b", "c"]);
        let ad = path_to_string("a", &["d"]);
        let mut labels = vec![ad.clone(), abc.clone(), a.clone(), ab.clone()];
        labels.sort();
        assert_eq!(labels, vec![a, ab, abc, ad]);
    }

    #[test]
    fn test_empty_string() {
        assert!(string_to_path("").is_empty());
    }
}
