//! Keyword relevance gate.
//!
//! Matching is case-insensitive substring search over `title + description`.
//! The haystack has punctuation folded to spaces and is padded with a space on
//! each side, so vocabulary entries written with surrounding spaces (`" ai "`)
//! only match whole words while bare entries (`"openai"`) match anywhere.

use crate::types::Article;
use std::collections::HashSet;

/// Default vocabulary: models, techniques, companies, hardware.
pub fn default_keywords() -> Vec<String> {
    [
        // General terms
        " ai ", " ai-", "artificial intelligence", "machine learning", "deep learning",
        "neural", "generative", " genai ", "agentic", " agi ", "superintelligence",
        // Models and products
        " llm", "large language model", "language model", "foundation model", "chatgpt",
        " gpt", "claude", "gemini", " llama", "mistral", "deepseek", "qwen", " grok",
        "copilot", "midjourney", "stable diffusion", " sora", "diffusion model",
        // Techniques
        "transformer", "fine tun", "fine-tun", " rag ", "retrieval augmented", "reinforcement learning",
        "multimodal", "inference", "reasoning model", "embedding", "ai agent", "ai model",
        "ai safety", "ai alignment", "ai regulation", "ai act", "open weights", "open source model",
        // Companies and labs
        "openai", "anthropic", "deepmind", "hugging face", "huggingface", "xai ", "perplexity",
        "cohere", "stability ai", "character ai", "ai startup",
        // Hardware
        "nvidia", " gpu", " tpu", "h100", "b200", "blackwell", "ai chip", "ai accelerator",
    ]
    .iter()
    .map(|k| k.to_string())
    .collect()
}

pub struct RelevanceFilter {
    keywords: Vec<String>,
    trusted_sources: HashSet<String>,
}

impl RelevanceFilter {
    pub fn new(keywords: &[String], trusted_sources: impl IntoIterator<Item = String>) -> Self {
        Self {
            // Folded like the haystack; surrounding spaces are kept
            keywords: keywords
                .iter()
                .map(|k| fold(k))
                .filter(|k| !k.trim().is_empty())
                .collect(),
            trusted_sources: trusted_sources.into_iter().collect(),
        }
    }

    pub fn is_trusted(&self, source: &str) -> bool {
        self.trusted_sources.contains(source)
    }

    pub fn is_relevant(&self, article: &Article) -> bool {
        if self.is_trusted(&article.source) {
            return true;
        }
        let haystack = haystack(&format!("{} {}", article.title, article.description));
        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }

    /// Keeps relevant articles in their original order.
    pub fn filter(&self, articles: Vec<Article>) -> Vec<Article> {
        articles.into_iter().filter(|a| self.is_relevant(a)).collect()
    }
}

/// Lowercase, with every char other than alphanumerics and `-` turned into a space.
fn fold(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { ' ' })
        .collect()
}

fn haystack(text: &str) -> String {
    format!(" {} ", fold(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, description: &str, source: &str) -> Article {
        Article::new(title, "https://example.com/x", source)
            .unwrap()
            .with_description(description)
    }

    fn filter() -> RelevanceFilter {
        RelevanceFilter::new(&default_keywords(), vec!["TLDR AI".to_string()])
    }

    #[test]
    fn matches_keywords_case_insensitively() {
        let f = filter();
        assert!(f.is_relevant(&article("NVIDIA unveils new chip", "", "The Verge")));
        assert!(f.is_relevant(&article("Weekly roundup", "OpenAI and Anthropic updates", "TechCrunch")));
        assert!(f.is_relevant(&article("AI: what comes next", "", "Ars Technica")));
    }

    #[test]
    fn short_terms_need_word_boundaries() {
        let f = filter();
        assert!(!f.is_relevant(&article("Mayor said rain will return", "Paid parking again", "Google News")));
    }

    #[test]
    fn trusted_sources_bypass_the_vocabulary() {
        let f = filter();
        let a = article("Sponsor message", "Nothing technical", "TLDR AI");
        assert!(f.is_relevant(&a));
        assert!(!f.is_relevant(&Article { source: "The Verge".into(), ..a }));
    }

    #[test]
    fn punctuated_keywords_match_like_the_text() {
        let f = RelevanceFilter::new(&["GPT-4.5".to_string(), "a.i.".to_string(), "!!".to_string()], Vec::new());
        assert!(f.is_relevant(&article("OpenAI ships GPT-4.5 to everyone", "", "Wire")));
        assert!(f.is_relevant(&article("How A.I. is changing newsrooms", "", "Wire")));
        assert!(!f.is_relevant(&article("Markets rally!!", "", "Wire")));
    }

    #[test]
    fn filter_preserves_order() {
        let f = filter();
        let kept = f.filter(vec![
            article("GPU prices fall", "", "X"),
            article("Football results", "", "X"),
            article("Claude gets memory", "", "X"),
        ]);
        let titles: Vec<_> = kept.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["GPU prices fall", "Claude gets memory"]);
    }
}
