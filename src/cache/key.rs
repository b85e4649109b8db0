//! Cache key derivation
//!
//! Turns a free-text city name into a stable key that is safe to use as a
//! single file name: a readable slug of the normalized name followed by the
//! SHA-256 digest of that name.

use sha2::{Digest, Sha256};
use std::fmt;

/// Maximum UTF-8 length in bytes of the readable part of a key
///
/// Slug, separator, digest and `.json` stay well below the 255-byte file
/// name limit of common filesystems.
const MAX_SLUG_BYTES: usize = 48;

/// Filesystem-safe identifier for a city's cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Returns the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalizes a city name for keying (surrounding whitespace and case are ignored)
pub fn normalize_city(city: &str) -> String {
    city.trim().to_lowercase()
}

/// Derives the cache key for a city name
///
/// Two inputs that differ only in case or surrounding whitespace map to the
/// same key. The digest is computed over the full normalized name, so the
/// slug can be truncated and sanitized without losing uniqueness.
pub fn derive_key(city: &str) -> CacheKey {
    let normalized = normalize_city(city);
    let digest = hex::encode(Sha256::digest(normalized.as_bytes()));

    let mut slug = String::with_capacity(MAX_SLUG_BYTES);
    for c in normalized.chars() {
        let c = if c.is_alphanumeric() || c == '-' || c == '_' {
            c
        } else {
            '_'
        };
        if slug.len() + c.len_utf8() > MAX_SLUG_BYTES {
            break;
        }
        slug.push(c);
    }

    CacheKey(format!("{}_{}", slug, digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_city_yields_same_key() {
        assert_eq!(derive_key("Paris"), derive_key("Paris"));
    }

    #[test]
    fn test_case_and_surrounding_whitespace_are_ignored() {
        let expected = derive_key("paris");
        assert_eq!(derive_key("  PARIS "), expected);
        assert_eq!(derive_key("\tParis\n"), expected);
    }

    #[test]
    fn test_different_cities_yield_different_keys() {
        assert_ne!(derive_key("Paris"), derive_key("London"));
        // Internal whitespace is significant
        assert_ne!(derive_key("new york"), derive_key("newyork"));
    }

    #[test]
    fn test_key_is_readable_and_hashed() {
        let key = derive_key("New York");
        assert!(key.as_str().starts_with("new_york_"));
        let digest = key.as_str().rsplit('_').next().unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_is_a_single_path_component() {
        let key = derive_key("../etc/passwd");
        assert!(!key.as_str().contains('/'));
        assert!(!key.as_str().contains('.'));

        let key = derive_key(r"C:\cities\x");
        assert!(!key.as_str().contains('\\'));
        assert!(!key.as_str().contains(':'));
    }

    #[test]
    fn test_sanitized_slugs_do_not_collide() {
        // Both slugs sanitize to "a_b" but the digests differ
        assert_ne!(derive_key("a/b"), derive_key("a.b"));
    }

    #[test]
    fn test_empty_city_is_a_valid_distinct_key() {
        let empty = derive_key("");
        assert!(empty.as_str().starts_with('_'));
        assert_eq!(derive_key("   "), empty);
        assert_ne!(derive_key("x"), empty);
    }

    #[test]
    fn test_long_names_are_truncated() {
        let long = "a".repeat(500);
        let key = derive_key(&long);
        assert_eq!(key.as_str().len(), MAX_SLUG_BYTES + 1 + 64);
        assert_ne!(derive_key(&"a".repeat(501)), key);
    }

    #[test]
    fn test_unicode_names_keep_their_letters() {
        let key = derive_key("São Paulo");
        assert!(key.as_str().starts_with("são_paulo_"));
    }

    #[test]
    fn test_wide_characters_keep_file_name_within_limit() {
        // Four bytes per char in UTF-8
        let key = derive_key(&"\u{20000}".repeat(60));
        let file_name = format!("{}.json", key);
        assert!(file_name.len() <= 255, "{} bytes", file_name.len());

        let slug = &key.as_str()[..key.as_str().len() - 65];
        assert_eq!(slug.chars().count(), MAX_SLUG_BYTES / 4);
    }

    #[test]
    fn test_slug_is_cut_on_a_char_boundary() {
        // 47 ASCII bytes leave no room for a two-byte letter
        let key = derive_key(&format!("{}é", "a".repeat(47)));
        assert!(key.as_str().starts_with(&format!("{}_", "a".repeat(47))));
        assert_eq!(key.as_str().len(), 47 + 1 + 64);
    }
}
