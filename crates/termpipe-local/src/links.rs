use std::collections::BTreeSet;

/// Cap on URLs contributed by the homepage anchor scan.
pub const MAX_SCANNED_LINKS: usize = 10;

/// Generic paths worth probing on any competitor site. Not capability
/// specific; capability-specific URLs come from the oracle guess.
pub const COMMON_DOC_PATHS: &[&str] = &[
    "/help",
    "/help/",
    "/support",
    "/support/",
    "/docs",
    "/docs/",
    "/documentation",
    "/blog",
    "/blog/",
    "/features",
    "/features/",
    "/product",
    "/products",
    "/resources",
    "/resources/",
    "/learn",
    "/guides",
    "/faq",
    "/knowledge-base",
    "/articles",
];

/// Words that mark an anchor as pointing at help/documentation content,
/// matched against both the href and the visible anchor text.
const DOC_LINK_HINTS: &[&str] = &[
    "help",
    "support",
    "docs",
    "documentation",
    "knowledge",
    "faq",
    "guide",
    "learn",
    "resources",
    "how-to",
    "blog",
    "features",
    "product",
];

fn base_host(u: &str) -> Option<String> {
    url::Url::parse(u)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}

/// Discover documentation-ish URLs for one competitor: the generic path list
/// first, then up to [`MAX_SCANNED_LINKS`] anchors from its homepage whose
/// href or text carries a doc hint. Relative hrefs are resolved against the
/// homepage domain; only the same domain and `help.`/`support.` subdomains
/// are kept. First-seen order, exact-string dedup.
pub fn discover_doc_links(homepage_html: &str, base_url: &str) -> Vec<String> {
    let base = base_url.trim_end_matches('/');
    let mut seen = BTreeSet::<String>::new();
    let mut out: Vec<String> = Vec::new();

    for path in COMMON_DOC_PATHS {
        let u = format!("{base}{path}");
        if seen.insert(u.clone()) {
            out.push(u);
        }
    }

    let Some(host) = base_host(base_url) else {
        return out;
    };
    if homepage_html.is_empty() {
        return out;
    }

    let doc = html_scraper::Html::parse_document(homepage_html);
    let sel = match html_scraper::Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return out,
    };

    let mut scanned = 0usize;
    for el in doc.select(&sel) {
        if scanned >= MAX_SCANNED_LINKS {
            break;
        }
        let href = match el.value().attr("href") {
            Some(h) => h.trim(),
            None => continue,
        };
        if href.is_empty() {
            continue;
        }
        let text = el
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_ascii_lowercase();
        let href_lc = href.to_ascii_lowercase();
        let hinted = DOC_LINK_HINTS
            .iter()
            .any(|kw| href_lc.contains(kw) || text.contains(kw));
        if !hinted {
            continue;
        }

        let full = if href.starts_with('/') {
            format!("https://{host}{href}")
        } else if href.starts_with("http") {
            href.to_string()
        } else {
            continue;
        };

        let link_host = base_host(&full).unwrap_or_default();
        let same_site = full.contains(&host)
            || link_host.starts_with("help.")
            || link_host.starts_with("support.");
        if !same_site {
            continue;
        }

        if seen.insert(full.clone()) {
            out.push(full);
            scanned += 1;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_paths_come_first_in_order() {
        let urls = discover_doc_links("", "https://www.example.com/");
        assert_eq!(urls.len(), COMMON_DOC_PATHS.len());
        assert_eq!(urls[0], "https://www.example.com/help");
        assert_eq!(urls[4], "https://www.example.com/docs");
    }

    #[test]
    fn anchors_with_doc_hints_are_appended_after_paths() {
        let html = r#"
        <html><body>
          <a href="/pricing">Pricing</a>
          <a href="/knowledge-center">Knowledge base</a>
          <a href="https://help.example.com/start">Getting started</a>
          <a href="https://other-site.com/docs">External docs</a>
        </body></html>
        "#;
        let urls = discover_doc_links(html, "https://example.com");
        assert!(urls.contains(&"https://example.com/knowledge-center".to_string()));
        assert!(urls.contains(&"https://help.example.com/start".to_string()));
        assert!(!urls.iter().any(|u| u.contains("other-site.com")));
        assert!(!urls.iter().any(|u| u.contains("pricing")));
        // Path candidates keep priority over scanned anchors.
        assert_eq!(urls[0], "https://example.com/help");
    }

    #[test]
    fn relative_hrefs_resolve_against_the_base_host() {
        let html = r#"<html><body><a href="/docs/widgets">Docs</a></body></html>"#;
        let urls = discover_doc_links(html, "https://www.example.com/");
        assert!(urls.contains(&"https://www.example.com/docs/widgets".to_string()));
    }

    #[test]
    fn scanned_anchors_are_deduped_and_capped() {
        let mut anchors = String::new();
        for i in 0..30 {
            anchors.push_str(&format!(r#"<a href="/docs/page-{i}">Docs {i}</a>"#));
            anchors.push_str(r#"<a href="/docs/page-0">Docs again</a>"#);
        }
        let html = format!("<html><body>{anchors}</body></html>");
        let urls = discover_doc_links(&html, "https://example.com");
        assert_eq!(urls.len(), COMMON_DOC_PATHS.len() + MAX_SCANNED_LINKS);
        let unique: BTreeSet<_> = urls.iter().collect();
        assert_eq!(unique.len(), urls.len());
    }

    #[test]
    fn help_subdomain_is_allowed_other_hosts_are_not() {
        let html = r#"
        <html><body>
          <a href="https://support.example.com/faq">FAQ</a>
          <a href="https://cdn.elsewhere.net/guide">Guide</a>
        </body></html>
        "#;
        let urls = discover_doc_links(html, "https://example.com");
        assert!(urls.contains(&"https://support.example.com/faq".to_string()));
        assert!(!urls.iter().any(|u| u.contains("elsewhere.net")));
    }
}
