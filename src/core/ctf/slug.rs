// Slug derivation for CTF role and channel names.
//
// "Pascal CTF 2026" -> "pascal-ctf-2026". The same slug names the role and
// the forum channel, so it has to be deterministic and stable.

/// Turn a display name into a lowercase, hyphen-separated identifier.
///
/// Anything that is not an ASCII letter, digit, whitespace, `_` or `-` is
/// dropped. Runs of whitespace, underscores and hyphens collapse into a single
/// `-`, and separators are never left at either end.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;

    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '_' || c == '-' {
            pending_separator = true;
        }
        // Everything else is stripped without acting as a separator.
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_name() {
        assert_eq!(slugify("Pascal CTF 2026"), "pascal-ctf-2026");
    }

    #[test]
    fn test_collapses_mixed_separators() {
        assert_eq!(slugify("  A__B--C  "), "a-b-c");
        assert_eq!(slugify("foo \t _- bar"), "foo-bar");
    }

    #[test]
    fn test_strips_special_characters() {
        assert_eq!(slugify("Hack.The.Box!"), "hackthebox");
        assert_eq!(slugify("DEF CON: Quals (2026)"), "def-con-quals-2026");
        assert_eq!(slugify("café ctf"), "caf-ctf");
    }

    #[test]
    fn test_no_leading_or_trailing_separator() {
        assert_eq!(slugify("--ctf--"), "ctf");
        assert_eq!(slugify("!!! ctf ???"), "ctf");
    }

    #[test]
    fn test_empty_when_nothing_survives() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!! ???"), "");
    }

    #[test]
    fn test_idempotent() {
        let names = [
            "Pascal CTF 2026",
            "  A__B--C  ",
            "DEF CON: Quals (2026)",
            "x_y z-w",
            "Ünïcode Chällenge",
        ];
        for name in names {
            let once = slugify(name);
            assert_eq!(slugify(&once), once, "slugify not idempotent for {name:?}");
        }
    }
}
