/// Configured provider names that agent frameworks know under another name.
///
/// No value may appear as a key, so mapping twice is the same as mapping once.
pub const PROVIDER_ALIASES: &[(&str, &str)] = &[("gemini", "google_genai")];

/// Map a configured provider name to the framework's integration name.
///
/// Lookup is case-insensitive; names without an alias come back lower-cased.
pub fn map_provider_name(name: &str) -> String {
    let lower = name.to_lowercase();
    PROVIDER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, target)| (*target).to_string())
        .unwrap_or(lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_alias() {
        assert_eq!(map_provider_name("gemini"), "google_genai");
        assert_eq!(map_provider_name("Gemini"), "google_genai");
    }

    #[test]
    fn test_unmapped_name_passes_through_lowercased() {
        assert_eq!(map_provider_name("anything-else"), "anything-else");
        assert_eq!(map_provider_name("OpenAI"), "openai");
    }

    #[test]
    fn test_alias_table_has_no_chains() {
        for (_, target) in PROVIDER_ALIASES {
            assert!(PROVIDER_ALIASES.iter().all(|(alias, _)| alias != target));
            assert_eq!(map_provider_name(target), *target);
        }
    }
}
