use once_cell::sync::Lazy;
use regex::Regex;

// An @ or # glued to a word character is not a marker, so email addresses
// and mid-word symbols never produce mentions or tags.
static MENTION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_])@([A-Za-z0-9][A-Za-z0-9_-]{2,49})")
        .expect("compile mention regex")
});

static HASHTAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_])#([A-Za-z0-9_]{1,100})").expect("compile hashtag regex")
});

/// `@username` tokens from a post body, lower-cased and deduplicated in
/// first-seen order. Resolution against real accounts happens at insert.
pub fn extract_mentions(body: &str) -> Vec<String> {
    collect_unique(&MENTION_REGEX, body)
}

/// `#tag` tokens from a post body, lower-cased and deduplicated.
pub fn extract_hashtags(body: &str) -> Vec<String> {
    collect_unique(&HASHTAG_REGEX, body)
}

fn collect_unique(regex: &Regex, body: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for captures in regex.captures_iter(body) {
        if let Some(token) = captures.get(1) {
            let token = token.as_str().to_lowercase();
            if seen.insert(token.clone()) {
                out.push(token);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mentions_are_extracted_and_lowercased() {
        let body = "hey @Wren and @finch, seen @wren today?";
        assert_eq!(extract_mentions(body), vec!["wren", "finch"]);
    }

    #[test]
    fn email_addresses_are_not_mentions() {
        assert!(extract_mentions("mail me at wren@example.com").is_empty());
    }

    #[test]
    fn mention_at_start_of_body_counts() {
        assert_eq!(extract_mentions("@wren hi"), vec!["wren"]);
    }

    #[test]
    fn short_handles_are_ignored() {
        assert!(extract_mentions("hi @ab").is_empty());
    }

    #[test]
    fn hashtags_are_extracted_and_lowercased() {
        let body = "shipping it #RustLang #rustlang #opensource!";
        assert_eq!(extract_hashtags(body), vec!["rustlang", "opensource"]);
    }

    #[test]
    fn punctuation_delimits_tags_and_mentions() {
        assert_eq!(extract_hashtags("(#wip)"), vec!["wip"]);
        assert_eq!(extract_mentions("(@wren)"), vec!["wren"]);
    }

    #[test]
    fn plain_text_yields_nothing() {
        assert!(extract_mentions("nothing here").is_empty());
        assert!(extract_hashtags("nothing here").is_empty());
    }
}
