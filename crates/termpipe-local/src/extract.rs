use html_scraper::{Html, Selector};
use termpipe_core::{Error, Result, ScrapedPage};

/// Extracted bodies shorter than this are not usable content.
pub const MIN_BODY_CHARS: usize = 100;
/// Heading cap per page.
pub const MAX_HEADINGS: usize = 30;
/// Body cap for competitor pages. The primary article is never capped.
pub const MAX_COMPETITOR_BODY_CHARS: usize = 8_000;

/// Structural elements whose text is boilerplate, never content.
const BOILERPLATE_TAGS: &[&str] = &["script", "style", "nav", "footer", "header", "aside", "noscript"];

fn norm_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Minimal, best-effort stripper for `<tag ...> ... </tag>` blocks.
///
/// Conservative: only removes when it finds a close tag, ASCII-case-insensitive
/// on tag names. Run before parsing so nav/footer text never pollutes the body.
fn strip_tag_blocks(html: &str, tag: &str) -> String {
    let tag_lc = tag.to_ascii_lowercase();
    let open_pat = format!("<{}", tag_lc);
    let close_pat = format!("</{}>", tag_lc);

    let mut out = String::new();
    let mut i = 0usize;
    let lower = html.to_ascii_lowercase();
    while let Some(rel_start) = lower[i..].find(&open_pat) {
        let start = i + rel_start;
        let after_open = start + open_pat.len();
        if let Some(rel_end) = lower[after_open..].find(&close_pat) {
            let end = after_open + rel_end + close_pat.len();
            out.push_str(&html[i..start]);
            i = end;
        } else {
            break;
        }
    }
    out.push_str(&html[i..]);
    out
}

fn strip_boilerplate(html: &str) -> String {
    let mut out = html.to_string();
    for tag in BOILERPLATE_TAGS {
        out = strip_tag_blocks(&out, tag);
    }
    out
}

fn first_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let el = doc.select(&sel).next()?;
    let t = norm_ws(&el.text().collect::<Vec<_>>().join(" "));
    (!t.is_empty()).then_some(t)
}

fn class_lc(el: &html_scraper::ElementRef) -> String {
    el.value()
        .attr("class")
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Text of the first "main content" container: `<main>`, then `<article>`,
/// then any `<div>` whose class mentions content/main/body, else the whole
/// document.
fn main_text(doc: &Html) -> String {
    for selector in ["main", "article"] {
        if let Some(t) = first_text(doc, selector) {
            return t;
        }
    }
    if let Ok(sel) = Selector::parse("div") {
        for el in doc.select(&sel) {
            let c = class_lc(&el);
            if c.contains("content") || c.contains("main") || c.contains("body") {
                let t = norm_ws(&el.text().collect::<Vec<_>>().join(" "));
                if !t.is_empty() {
                    return t;
                }
            }
        }
    }
    norm_ws(&doc.root_element().text().collect::<Vec<_>>().join(" "))
}

fn extract(html: &str, url: &str, max_body_chars: Option<usize>) -> ScrapedPage {
    let bytes = html.len();
    let stripped = strip_boilerplate(html);
    let doc = Html::parse_document(&stripped);

    let title = first_text(&doc, "title")
        .or_else(|| first_text(&doc, "h1"))
        .unwrap_or_default();

    // Grouped by level (all h1s, then h2s, ...), not document order.
    let mut headings = Vec::new();
    for tag in ["h1", "h2", "h3", "h4"] {
        let Ok(sel) = Selector::parse(tag) else { continue };
        for el in doc.select(&sel) {
            if headings.len() >= MAX_HEADINGS {
                break;
            }
            let t = norm_ws(&el.text().collect::<Vec<_>>().join(" "));
            if t.chars().count() > 3 {
                headings.push(t);
            }
        }
    }

    let mut body = main_text(&doc);
    if let Some(max) = max_body_chars {
        body = truncate_chars(&body, max);
    }

    ScrapedPage {
        url: url.to_string(),
        title,
        headings,
        body,
        bytes,
    }
}

/// Lenient extraction for competitor pages: a missing title is an empty
/// string and the body is capped.
pub fn extract_page(html: &str, url: &str) -> ScrapedPage {
    extract(html, url, Some(MAX_COMPETITOR_BODY_CHARS))
}

/// Strict extraction for the primary article: the title and a plausible body
/// are required, and the body is never capped.
pub fn extract_article(html: &str, url: &str) -> Result<ScrapedPage> {
    let page = extract(html, url, None);
    if page.title.is_empty() {
        return Err(Error::NoTitle(url.to_string()));
    }
    if page.body.chars().count() < MIN_BODY_CHARS {
        return Err(Error::NoContent(url.to_string()));
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn long_paragraph() -> String {
        "Understanding validation rules for every field in a long form. ".repeat(5)
    }

    #[test]
    fn title_comes_from_title_tag_then_h1() {
        let html = "<html><head><title>Real Title</title></head><body><h1>Heading</h1></body></html>";
        assert_eq!(extract_page(html, "u").title, "Real Title");

        let html = "<html><body><h1>Only Heading</h1></body></html>";
        assert_eq!(extract_page(html, "u").title, "Only Heading");
    }

    #[test]
    fn headings_are_grouped_by_level_filtered_and_bounded() {
        let mut body = String::from("<h2>Second Level</h2><h1>First Level</h1><h3>ab</h3>");
        for i in 0..40 {
            body.push_str(&format!("<h4>Deep heading {i}</h4>"));
        }
        let html = format!("<html><body>{body}</body></html>");
        let page = extract_page(&html, "u");

        assert_eq!(page.headings[0], "First Level");
        assert_eq!(page.headings[1], "Second Level");
        // "ab" is too short to be a heading.
        assert!(!page.headings.iter().any(|h| h == "ab"));
        assert_eq!(page.headings.len(), MAX_HEADINGS);
    }

    #[test]
    fn body_prefers_main_container_over_page_chrome() {
        let html = format!(
            "<html><body>\
             <nav><a href=\"/x\">Pricing</a> <a href=\"/y\">Login</a></nav>\
             <main><p>{}</p></main>\
             <footer>Copyright footer text</footer>\
             </body></html>",
            long_paragraph()
        );
        let page = extract_page(&html, "u");
        assert!(page.body.contains("validation rules"));
        assert!(!page.body.contains("Pricing"));
        assert!(!page.body.contains("Copyright"));
    }

    #[test]
    fn body_falls_back_to_content_classed_div_then_whole_document() {
        let html = format!(
            "<html><body><div class=\"page-Content wrapper\"><p>{}</p></div></body></html>",
            long_paragraph()
        );
        assert!(extract_page(&html, "u").body.contains("validation rules"));

        let html = format!("<html><body><p>{}</p></body></html>", long_paragraph());
        assert!(extract_page(&html, "u").body.contains("validation rules"));
    }

    #[test]
    fn script_and_style_text_never_reaches_the_body() {
        let html = format!(
            "<html><body><script>var secretMarker = 1;</script>\
             <style>.x {{ color: red }}</style><p>{}</p></body></html>",
            long_paragraph()
        );
        let page = extract_page(&html, "u");
        assert!(!page.body.contains("secretMarker"));
        assert!(!page.body.contains("color"));
    }

    #[test]
    fn competitor_body_is_capped_article_body_is_not() {
        let filler = "word ".repeat(3_000);
        let html = format!("<html><head><title>t</title></head><body><main>{filler}</main></body></html>");
        assert_eq!(
            extract_page(&html, "u").body.chars().count(),
            MAX_COMPETITOR_BODY_CHARS
        );
        assert!(extract_article(&html, "u").unwrap().body.chars().count() > MAX_COMPETITOR_BODY_CHARS);
    }

    #[test]
    fn article_extraction_is_strict() {
        let html = format!("<html><body><p>{}</p></body></html>", long_paragraph());
        assert!(matches!(
            extract_article(&html, "u").unwrap_err(),
            Error::NoTitle(_)
        ));

        let html = "<html><head><title>t</title></head><body><p>tiny</p></body></html>";
        assert!(matches!(
            extract_article(html, "u").unwrap_err(),
            Error::NoContent(_)
        ));
    }

    #[test]
    fn whitespace_is_collapsed() {
        let html = format!(
            "<html><head><title>  Spaced   Title </title></head><body><main>a\n\n  b\t c {}</main></body></html>",
            long_paragraph()
        );
        let page = extract_page(&html, "u");
        assert_eq!(page.title, "Spaced Title");
        assert!(page.body.starts_with("a b c"));
    }

    proptest! {
        #[test]
        fn truncate_chars_is_bounded_and_never_panics(s in ".*", max in 0usize..200) {
            let out = truncate_chars(&s, max);
            prop_assert!(out.chars().count() <= max);
            prop_assert!(s.starts_with(&out));
        }

        #[test]
        fn strip_tag_blocks_output_is_substring_material(s in "[a-zA-Z<>/ ]{0,80}") {
            // Must not panic on arbitrary angle-bracket soup.
            let _ = strip_tag_blocks(&s, "script");
        }
    }
}
