/// Characters replaced by the separator, besides ASCII whitespace. Matches the
/// accents and punctuation that show up in field-guide scientific names.
const REPLACED: &str = "áéíóúñäëïöü/(),.'";

/// Derive a filesystem-safe cache key from a scientific name.
///
/// Lowercases the input, maps whitespace and the characters above to `_`,
/// collapses runs of separators and trims them from both ends. Idempotent:
/// `slugify(slugify(x)) == slugify(x)`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_sep = false;
    for ch in text.to_lowercase().chars() {
        if ch.is_whitespace() || REPLACED.contains(ch) {
            pending_sep = !slug.is_empty();
        } else {
            if pending_sep {
                slug.push('_');
                pending_sep = false;
            }
            slug.push(ch);
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_binomial() {
        assert_eq!(slugify("Turdus merula"), "turdus_merula");
    }

    #[test]
    fn accents_and_punctuation() {
        assert_eq!(slugify("Águila (real), común"), "guila_real_com_n");
        assert_eq!(slugify("Prunus sp./hybrid"), "prunus_sp_hybrid");
    }

    #[test]
    fn collapses_and_trims_separators() {
        assert_eq!(slugify("  Pica   pica  "), "pica_pica");
        assert_eq!(slugify("(unknown)"), "unknown");
        assert!(!slugify("a, (b) . c").contains("__"));
    }

    #[test]
    fn idempotent() {
        for input in [
            "Turdus merula",
            "Águila (real), común",
            "  spaced   out  ",
            "",
            "---",
            "Quercus робур",
        ] {
            let once = slugify(input);
            assert_eq!(slugify(&once), once);
            assert!(!once.starts_with('_'));
            assert!(!once.ends_with('_'));
        }
    }

    #[test]
    fn empty_and_separator_only() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify(" ,. "), "");
    }
}
