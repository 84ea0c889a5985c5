//! Identifier derivation for generated objects

/// Reduce free text to a lowercase `[a-z0-9_]` identifier.
///
/// Common Latin accents fold to their base letter; every other character
/// outside the identifier alphabet becomes `_`, and runs of `_` collapse.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.trim().chars().flat_map(char::to_lowercase) {
        let folded = match c {
            'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            c if c.is_ascii_alphanumeric() => c,
            _ => '_',
        };
        if folded == '_' && out.ends_with('_') {
            continue;
        }
        out.push(folded);
    }
    out.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Gestión de formación", "gestion_de_formacion")]
    #[case("web-01.example.com", "web_01_example_com")]
    #[case("  Base de datos  ", "base_de_datos")]
    #[case("API -- Gateway", "api_gateway")]
    #[case("___", "")]
    fn slugify_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }
}
