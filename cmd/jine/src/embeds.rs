use domains::{EmbedDescriptor, EmbedExtractor};
use once_cell::sync::Lazy;
use regex::Regex;

static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bhttps?://[^\s<>]+").expect("url pattern is valid"));

/// Tags every http(s) URL in a message body by what it points to.
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlEmbedExtractor;

impl EmbedExtractor for UrlEmbedExtractor {
    fn extract(&self, body: &str) -> Vec<EmbedDescriptor> {
        URL_PATTERN
            .find_iter(body)
            .map(|m| {
                let url = m.as_str().trim_end_matches(['.', ',', '!', '?', ')']);
                EmbedDescriptor {
                    link_type: link_type(url).to_string(),
                    url: url.to_string(),
                }
            })
            .collect()
    }
}

fn link_type(url: &str) -> &'static str {
    let lower = url.to_ascii_lowercase();
    if lower.contains("youtube.com/") || lower.contains("youtu.be/") {
        "youtube"
    } else if [".png", ".jpg", ".jpeg", ".gif", ".webp"]
        .iter()
        .any(|ext| lower.ends_with(ext))
    {
        "image"
    } else {
        "web"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_urls_by_target() {
        let embeds = UrlEmbedExtractor.extract(
            "watch https://youtu.be/abc, see https://cdn.example/cat.GIF and https://example.com.",
        );
        let tags: Vec<_> = embeds.iter().map(|e| (e.link_type.as_str(), e.url.as_str())).collect();
        assert_eq!(
            tags,
            vec![
                ("youtube", "https://youtu.be/abc"),
                ("image", "https://cdn.example/cat.GIF"),
                ("web", "https://example.com"),
            ]
        );
    }

    #[test]
    fn plain_text_has_no_embeds() {
        assert!(UrlEmbedExtractor.extract("just saying hi").is_empty());
    }
}
