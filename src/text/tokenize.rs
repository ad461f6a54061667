//! Tokenizer
//!
//! Maps free text to the unique in-vocabulary, non-stopword terms it
//! contains.

use hashbrown::HashSet;

use super::stopwords::Stopwords;

/// Tokenize with a fallible membership test.
///
/// Every character outside `[A-Za-z]` separates tokens. Tokens keep their
/// first-seen order and appear once.
pub fn try_tokenize<F, E>(text: &str, stopwords: &Stopwords, mut contains: F) -> Result<Vec<String>, E>
where
    F: FnMut(&str) -> Result<bool, E>,
{
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();

    for token in text.split(|c: char| !c.is_ascii_alphabetic()) {
        if token.is_empty() || stopwords.contains(token) || seen.contains(token) {
            continue;
        }
        if contains(token)? {
            tokens.push(token.to_string());
        }
        seen.insert(token);
    }
    Ok(tokens)
}

/// Tokenize against an in-memory membership test
pub fn tokenize<F>(text: &str, stopwords: &Stopwords, mut contains: F) -> Vec<String>
where
    F: FnMut(&str) -> bool,
{
    match try_tokenize::<_, std::convert::Infallible>(text, stopwords, |t| Ok(contains(t))) {
        Ok(tokens) => tokens,
        Err(never) => match never {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(t: &str) -> bool {
        matches!(t, "cat" | "dog" | "sat" | "The" | "market")
    }

    #[test]
    fn test_tokenize_filters_and_dedups() {
        let stops = Stopwords::english();
        let tokens = tokenize("The cat sat; the dog, the cat!", &stops, vocab);
        assert_eq!(tokens, vec!["cat", "sat", "dog"]);
    }

    #[test]
    fn test_non_letters_split() {
        let stops = Stopwords::from_words(Vec::<String>::new());
        let tokens = tokenize("cat42dog--market's", &stops, vocab);
        assert_eq!(tokens, vec!["cat", "dog", "market"]);
    }

    #[test]
    fn test_try_tokenize_propagates_errors() {
        let stops = Stopwords::english();
        let result: Result<Vec<String>, &str> = try_tokenize("cat dog", &stops, |_| Err("down"));
        assert_eq!(result, Err("down"));
    }
}
