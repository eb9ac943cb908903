//! Plain-text helpers for HTML bodies.

/// Reading speed used for read-time estimates.
pub const WORDS_PER_MINUTE: usize = 200;

/// Elements whose boundaries separate words.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Put a space before every block-level open or close tag.
fn space_blocks(html: &str) -> String {
    let mut out = String::with_capacity(html.len() + html.len() / 16);
    let mut rest = html;
    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        let tag = &rest[pos + 1..];
        let name = tag.strip_prefix('/').unwrap_or(tag);
        let end = name
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(name.len());
        if BLOCK_TAGS.contains(&name[..end].to_ascii_lowercase().as_str()) {
            out.push(' ');
        }
        out.push('<');
        rest = tag;
    }
    out.push_str(rest);
    out
}

/// Remove all HTML tags, keeping text content.
///
/// Block boundaries become whitespace so adjacent paragraphs do not merge.
pub fn strip_tags(html: &str) -> String {
    ammonia::Builder::empty()
        .clean(&space_blocks(html))
        .to_string()
}

/// Count whitespace-separated words in the tag-stripped body.
pub fn word_count(html: &str) -> usize {
    strip_tags(html).split_whitespace().count()
}

/// Minutes to read `words` words, rounded up. Zero words is zero minutes.
pub fn minutes_for_words(words: usize) -> i32 {
    i32::try_from(words.div_ceil(WORDS_PER_MINUTE)).unwrap_or(i32::MAX)
}

/// Estimated read time of an HTML body in minutes.
pub fn read_time(html: &str) -> i32 {
    minutes_for_words(word_count(html))
}

/// First `max_words` words of the stripped body, with an ellipsis when cut.
pub fn excerpt(html: &str, max_words: usize) -> String {
    let text = strip_tags(html);
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return words.join(" ");
    }
    format!("{}...", words[..max_words].join(" "))
}
