//! SQL `LIKE` matching.
//!
//! `%` matches any run of characters and `_` matches exactly one. Patterns are
//! translated to anchored regexes once and cached. Search strings come from
//! callers, so the cache is cleared whenever it reaches [`MAX_CACHED_PATTERNS`].

use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use regex::Regex;

/// Upper bound on the number of compiled patterns kept at once.
pub const MAX_CACHED_PATTERNS: usize = 1024;

/// Thread-safe cache of translated LIKE patterns.
struct RegexCache {
    cache: RwLock<HashMap<(String, bool), Regex>>,
}

impl RegexCache {
    fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn get_or_compile(&self, pattern: &str, ignore_case: bool) -> Result<Regex, regex::Error> {
        let key = (pattern.to_string(), ignore_case);

        // Fast path: check if already cached
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(regex) = cache.get(&key) {
                return Ok(regex.clone());
            }
        }

        // Slow path: compile and cache
        let regex = Regex::new(&like_to_regex(pattern, ignore_case))?;
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cache.len() >= MAX_CACHED_PATTERNS {
            tracing::debug!(entries = cache.len(), "LIKE pattern cache full, clearing");
            cache.clear();
        }
        cache.insert(key, regex.clone());
        Ok(regex)
    }

    fn len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::new)
}

/// Translate a LIKE pattern into an anchored regex source.
fn like_to_regex(pattern: &str, ignore_case: bool) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str(if ignore_case { "(?is)^" } else { "(?s)^" });
    let mut literal = [0u8; 4];
    for ch in pattern.chars() {
        match ch {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut literal))),
        }
    }
    out.push('$');
    out
}

/// Check whether `value` matches the LIKE `pattern`.
///
/// Returns `false` if the pattern cannot be compiled (logs a warning).
pub fn like_matches(value: &str, pattern: &str, ignore_case: bool) -> bool {
    match regex_cache().get_or_compile(pattern, ignore_case) {
        Ok(regex) => regex.is_match(value),
        Err(e) => {
            tracing::warn!(
                pattern = pattern,
                error = %e,
                "Invalid LIKE pattern, treating as no match"
            );
            false
        }
    }
}
