/// Text hygiene for feed records
pub mod text {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<[^>]*>").expect("valid tag regex"));
    static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

    /// Decode entities, drop tags, collapse whitespace.
    pub fn clean_html(html: &str) -> String {
        // Decode first so escaped markup (`&lt;p&gt;`) is stripped as well
        let decoded = html_escape::decode_html_entities(html);
        let stripped = TAGS.replace_all(&decoded, " ");
        WHITESPACE.replace_all(&stripped, " ").trim().to_string()
    }

    /// Cut to at most `max_chars` characters, never splitting a code point.
    pub fn truncate_chars(text: &str, max_chars: usize) -> String {
        match text.char_indices().nth(max_chars) {
            Some((idx, _)) => text[..idx].to_string(),
            None => text.to_string(),
        }
    }
}

/// URL helpers
pub mod url {
    use url::Url;

    /// Host of a link without a leading `www.`, used as a last-resort source name.
    pub fn source_name_from_link(link: &str) -> Option<String> {
        let parsed = Url::parse(link).ok()?;
        let host = parsed.host_str()?;
        Some(host.strip_prefix("www.").unwrap_or(host).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_html_strips_tags_and_entities() {
        let raw = "<p>OpenAI&nbsp;ships <b>GPT-5</b></p>\n\n&lt;br&gt;today &amp; more";
        assert_eq!(text::clean_html(raw), "OpenAI ships GPT-5 today & more");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(text::truncate_chars("模型发布了", 2), "模型");
        assert_eq!(text::truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn source_name_drops_www() {
        assert_eq!(
            url::source_name_from_link("https://www.theverge.com/ai/1").as_deref(),
            Some("theverge.com")
        );
        assert_eq!(url::source_name_from_link("not a url"), None);
    }
}
