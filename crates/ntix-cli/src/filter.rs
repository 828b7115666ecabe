//! Wildcard filtering of listed names.

use anyhow::Context;
use regex::Regex;

/// Case-insensitive `*`/`?` pattern compiled to an anchored regex.
#[derive(Debug, Clone)]
pub struct NameFilter {
    regex: Regex,
}

impl NameFilter {
    pub fn new(pattern: &str) -> anyhow::Result<Self> {
        let mut regex_pattern = String::with_capacity(pattern.len() * 2 + 4);
        regex_pattern.push_str("(?i)^");

        let mut buf = [0u8; 4];
        for c in pattern.chars() {
            match c {
                '*' => regex_pattern.push_str(".*"),
                '?' => regex_pattern.push('.'),
                _ => regex_pattern.push_str(&regex::escape(c.encode_utf8(&mut buf))),
            }
        }

        regex_pattern.push('$');

        let regex = Regex::new(&regex_pattern)
            .with_context(|| format!("invalid filter pattern {:?}", pattern))?;
        Ok(NameFilter { regex })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}
