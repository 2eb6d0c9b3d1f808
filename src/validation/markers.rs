/*!
 * Marker detection for provider responses.
 *
 * Models sometimes answer with a meta reply instead of a translation: they
 * echo the instruction, or state that the text needs no translation or is
 * already in the target language. These replies are recognised by phrase
 * markers rather than by their length.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// URL scheme at the start of a fragment
static URL_SCHEME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*https?").expect("Invalid URL scheme regex")
});

/// Phrase-based detector for meta replies
#[derive(Debug, Clone, Default)]
pub struct MarkerDetector {
    /// Instruction text whose presence in a response means the prompt leaked
    prompt_markers: Vec<String>,
    /// Phrases meaning "no translation needed"
    no_translation_phrases: Vec<String>,
    /// Phrases meaning "already in the target language"
    already_target_phrases: Vec<String>,
}

impl MarkerDetector {
    /// Create a detector from phrase lists
    pub fn new(
        prompt_markers: Vec<String>,
        no_translation_phrases: Vec<String>,
        already_target_phrases: Vec<String>,
    ) -> Self {
        Self {
            prompt_markers: non_empty(prompt_markers),
            no_translation_phrases: non_empty(no_translation_phrases),
            already_target_phrases: non_empty(already_target_phrases),
        }
    }

    /// Response repeats the instruction
    pub fn leaks_prompt(&self, candidate: &str) -> bool {
        contains_any(candidate, &self.prompt_markers)
    }

    /// Response claims no translation is needed
    pub fn says_no_translation(&self, candidate: &str) -> bool {
        contains_any(candidate, &self.no_translation_phrases)
    }

    /// Response claims the source is already in the target language
    pub fn says_already_target(&self, candidate: &str) -> bool {
        contains_any(candidate, &self.already_target_phrases)
    }
}

/// Fragment begins with an `http`/`https` scheme token
pub fn starts_with_url(text: &str) -> bool {
    URL_SCHEME_REGEX.is_match(text)
}

fn contains_any(text: &str, phrases: &[String]) -> bool {
    phrases.iter().any(|phrase| text.contains(phrase.as_str()))
}

fn non_empty(phrases: Vec<String>) -> Vec<String> {
    phrases
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}
