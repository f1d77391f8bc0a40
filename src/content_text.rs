/// Elements dropped together with everything inside them.
const SKIPPED_ELEMENTS: [&str; 3] = ["video", "script", "style"];
const BLOCK_ELEMENTS: [&str; 12] = [
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Plain-text rendering of a chapter's generated HTML, for the terminal.
///
/// Embedded `<video>` elements are removed, opening block elements start a new line, list items gain a
/// bullet and the common entities are decoded. Runs of blank lines collapse to one.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find('<') {
        out.push_str(&decode_entities(&rest[..start]));
        let Some(end) = rest[start..].find('>') else {
            out.push_str(&decode_entities(&rest[start..]));
            rest = "";
            break;
        };
        let tag = &rest[start + 1..start + end];
        rest = &rest[start + end + 1..];

        let name = tag_name(tag);
        if !tag.starts_with('/') && SKIPPED_ELEMENTS.contains(&name.as_str()) {
            rest = skip_element(rest, &name);
            continue;
        }
        if !tag.starts_with('/') && BLOCK_ELEMENTS.contains(&name.as_str()) {
            out.push('\n');
            if name == "li" {
                out.push_str("• ");
            }
        }
    }
    out.push_str(&decode_entities(rest));
    collapse_blank_lines(&out)
}

/// Reading time shown next to a topic: one minute per ten characters of content.
pub fn estimated_minutes(content: &str) -> usize {
    content.len() / 10
}

/// Video id from a `watch?v=` or `youtu.be/` link.
pub fn youtube_video_id(url: &str) -> Option<&str> {
    let tail = match url.split_once("v=") {
        Some((_, tail)) => tail,
        None => url.split_once("youtu.be/")?.1,
    };
    let id = tail.split(['&', '?', '#']).next()?;
    non_empty_trimmed(id)
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .split(|ch: char| ch.is_whitespace() || ch == '/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn skip_element<'a>(rest: &'a str, name: &str) -> &'a str {
    let closing = format!("</{}", name);
    match rest.to_ascii_lowercase().find(&closing) {
        Some(index) => match rest[index..].find('>') {
            Some(end) => &rest[index + end + 1..],
            None => "",
        },
        None => rest,
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn collapse_blank_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() && lines.last().is_none_or(|last| last.trim().is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|last| last.trim().is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

fn non_empty_trimmed(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_video_elements_and_keeps_paragraphs() {
        let html = "<h2>Moves</h2><video controls><source src=\"a.mp4\"></video><p>Values have a single owner.</p>";
        assert_eq!(html_to_text(html), "Moves\nValues have a single owner.");
    }

    #[test]
    fn list_items_get_bullets_and_entities_are_decoded() {
        let html = "<ul><li>Vec&lt;T&gt;</li><li>Fish &amp; chips</li></ul>";
        assert_eq!(html_to_text(html), "• Vec<T>\n• Fish & chips");
    }

    #[test]
    fn uppercase_video_tags_are_removed_too() {
        let html = "<p>Intro</p><VIDEO src=\"x\">fallback</VIDEO><p>Outro</p>";
        assert_eq!(html_to_text(html), "Intro\nOutro");
    }

    #[test]
    fn video_id_comes_from_watch_or_short_links() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=VFIOSWy93H0&t=30"),
            Some("VFIOSWy93H0")
        );
        assert_eq!(youtube_video_id("https://youtu.be/abc123"), Some("abc123"));
        assert_eq!(youtube_video_id("https://example.com/video"), None);
    }

    #[test]
    fn reading_time_scales_with_content_length() {
        assert_eq!(estimated_minutes(&"x".repeat(95)), 9);
        assert_eq!(estimated_minutes(""), 0);
    }
}
