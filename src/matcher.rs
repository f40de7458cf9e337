// src/matcher.rs
//! Keyword matcher: which configured keywords occur in an entry's text.

use regex::Regex;

#[derive(Debug, Clone)]
enum Rule {
    /// Case-insensitive substring; holds the lowercased needle.
    Substring(String),
    /// Case-insensitive whole-word match.
    WholeWord(Regex),
}

#[derive(Debug, Clone)]
struct CompiledKeyword {
    keyword: String,
    rule: Rule,
}

/// Pure matcher over an ordered keyword list.
///
/// Keywords listed in `whole_word` (compared case-insensitively) only match on
/// word boundaries, so a short keyword such as `SAP` does not fire inside
/// `SAPPHIRE`. Everything else matches as a case-insensitive substring.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keywords: Vec<CompiledKeyword>,
}

impl KeywordMatcher {
    pub fn new<S: AsRef<str>>(keywords: &[S], whole_word: &[S]) -> Self {
        let keywords = keywords
            .iter()
            .map(|k| k.as_ref().trim())
            .filter(|k| !k.is_empty())
            .map(|k| {
                let needs_boundary = whole_word
                    .iter()
                    .any(|w| w.as_ref().trim().eq_ignore_ascii_case(k));
                let rule = if needs_boundary {
                    // not `\b`: keywords like `C++` start or end on a non-word char
                    let pattern = format!(r"(?i)(?:^|\W){}(?:\W|$)", regex::escape(k));
                    // escaped input always compiles; fall back to substring if not
                    match Regex::new(&pattern) {
                        Ok(re) => Rule::WholeWord(re),
                        Err(_) => Rule::Substring(k.to_lowercase()),
                    }
                } else {
                    Rule::Substring(k.to_lowercase())
                };
                CompiledKeyword {
                    keyword: k.to_string(),
                    rule,
                }
            })
            .collect();
        Self { keywords }
    }

    /// Keywords present in `text`, in configured order.
    pub fn matches(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.keywords
            .iter()
            .filter(|k| match &k.rule {
                Rule::Substring(needle) => lowered.contains(needle.as_str()),
                Rule::WholeWord(re) => re.is_match(text),
            })
            .map(|k| k.keyword.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}
