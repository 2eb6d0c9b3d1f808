/*!
 * Prompt templates for fragment and batch translation.
 *
 * A prompt is always `instruction + "\n" + source`, with an optional suffix
 * for long sources. Chinese targets use the Chinese instructions; any other
 * target gets English instructions naming the language.
 */

use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigError;

/// What a translation call is asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationMode {
    /// Plain single-fragment translation
    Translation,
    /// Numbered lines that must keep their indices
    BatchTranslation,
    /// Rewrite already translated text, removing commentary
    Polish,
    /// Translation followed by a polish pass on the result
    RemoveAnnotation,
}

impl fmt::Display for TranslationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TranslationMode::Translation => "translation",
            TranslationMode::BatchTranslation => "batch-translation",
            TranslationMode::Polish => "polish",
            TranslationMode::RemoveAnnotation => "remove_annotation",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for TranslationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "translation" => Ok(TranslationMode::Translation),
            "batch-translation" | "batch_translation" | "title_translation" => {
                Ok(TranslationMode::BatchTranslation)
            }
            "polish" => Ok(TranslationMode::Polish),
            "remove_annotation" | "remove-annotation" => Ok(TranslationMode::RemoveAnnotation),
            other => Err(ConfigError::InvalidValue {
                field: "mode".to_string(),
                reason: format!("unknown translation mode '{}'", other),
            }),
        }
    }
}

/// Instruction template with a `{target_language}` placeholder
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub const TRANSLATE_ZH: &'static str = "将下面的外文文本翻译为中文：";
    pub const BATCH_ZH: &'static str =
        "将下面每一行外文文本翻译为中文，保留每行开头的编号，每行输出一行译文：";
    pub const POLISH_ZH: &'static str = "润色下面的中文文本，删除其中的注释、说明和原文：";
    pub const LONG_TEXT_ZH: &'static str = "（请完整翻译以上全部内容，只用中文回答。）";

    pub const TRANSLATE: &'static str = "Translate the following text into {target_language}:";
    pub const BATCH: &'static str = "Translate each of the following lines into {target_language}. Keep the number at the start of every line and answer with exactly one line per input line:";
    pub const POLISH: &'static str = "Polish the following {target_language} text and remove any notes, explanations or source text:";
    pub const LONG_TEXT: &'static str =
        "(Translate all of the text above completely and answer only in {target_language}.)";

    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Render the template for a target language name
    pub fn render(&self, target_language: &str) -> String {
        self.template.replace("{target_language}", target_language)
    }
}

/// Rendered instructions for one target language
#[derive(Debug, Clone)]
pub struct PromptSet {
    translation: String,
    /// Built-in single-fragment instruction, kept when a custom one replaces it
    default_translation: String,
    batch: String,
    polish: String,
    long_text_suffix: String,
    long_text_threshold: usize,
}

impl PromptSet {
    /// Build the instruction set.
    ///
    /// `custom` replaces the single-fragment instruction when non-empty.
    pub fn new(target_language: &str, custom: Option<&str>, long_text_threshold: usize) -> Self {
        let custom = custom.map(str::trim).filter(|c| !c.is_empty());

        let mut set = if is_chinese(target_language) {
            Self {
                translation: PromptTemplate::TRANSLATE_ZH.to_string(),
                default_translation: PromptTemplate::TRANSLATE_ZH.to_string(),
                batch: PromptTemplate::BATCH_ZH.to_string(),
                polish: PromptTemplate::POLISH_ZH.to_string(),
                long_text_suffix: PromptTemplate::LONG_TEXT_ZH.to_string(),
                long_text_threshold,
            }
        } else {
            let name = language_name(target_language);
            let translation = PromptTemplate::new(PromptTemplate::TRANSLATE).render(&name);
            Self {
                default_translation: translation.clone(),
                translation,
                batch: PromptTemplate::new(PromptTemplate::BATCH).render(&name),
                polish: PromptTemplate::new(PromptTemplate::POLISH).render(&name),
                long_text_suffix: PromptTemplate::new(PromptTemplate::LONG_TEXT).render(&name),
                long_text_threshold,
            }
        };

        if let Some(custom) = custom {
            set.translation = custom.to_string();
        }
        set
    }

    /// Instruction line for a mode
    pub fn instruction(&self, mode: TranslationMode) -> &str {
        match mode {
            TranslationMode::Translation | TranslationMode::RemoveAnnotation => &self.translation,
            TranslationMode::BatchTranslation => &self.batch,
            TranslationMode::Polish => &self.polish,
        }
    }

    /// Full prompt for a source text
    pub fn build(&self, mode: TranslationMode, source: &str) -> String {
        let mut prompt = format!("{}\n{}", self.instruction(mode), source);
        if source.chars().count() > self.long_text_threshold {
            prompt.push_str("\n\n");
            prompt.push_str(&self.long_text_suffix);
        }
        prompt
    }

    /// Instruction lines whose echo in a response counts as a prompt leak
    pub fn leak_markers(&self) -> Vec<String> {
        let mut markers = vec![
            self.translation.clone(),
            self.batch.clone(),
            self.polish.clone(),
        ];
        if self.default_translation != self.translation {
            markers.push(self.default_translation.clone());
        }
        markers
    }
}

fn is_chinese(code: &str) -> bool {
    matches!(code.trim().to_lowercase().as_str(), "zh" | "zho" | "chi")
        || code.to_lowercase().starts_with("zh-")
}

/// English name of an ISO 639 code, falling back to the code itself
fn language_name(code: &str) -> String {
    let code = code.trim().to_lowercase();
    isolang::Language::from_639_1(&code)
        .or_else(|| isolang::Language::from_639_3(&code))
        .map(|lang| lang.to_name().to_string())
        .unwrap_or(code)
}
