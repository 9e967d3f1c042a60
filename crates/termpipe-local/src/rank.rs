use std::collections::BTreeSet;
use termpipe_core::Keyword;

/// Bound on the ranked suggestion list.
pub const MAX_SUGGESTED_KEYWORDS: usize = 5;

/// Merge the article and competitor pools into the ranked suggestion list:
/// article keywords first, entries without a volume dropped, stable sort by
/// descending volume (ties keep pool order), case-insensitive first-seen
/// dedup, capped at [`MAX_SUGGESTED_KEYWORDS`].
pub fn suggest_keywords(article: &[Keyword], competitor: &[Keyword]) -> Vec<Keyword> {
    let mut pool: Vec<Keyword> = article
        .iter()
        .chain(competitor.iter())
        .filter(|k| k.search_volume.is_some())
        .cloned()
        .collect();
    pool.sort_by(|a, b| b.search_volume.cmp(&a.search_volume));

    let mut seen = BTreeSet::<String>::new();
    let mut out = Vec::new();
    for kw in pool {
        if out.len() >= MAX_SUGGESTED_KEYWORDS {
            break;
        }
        let key = kw.text.trim().to_lowercase();
        if !key.is_empty() && seen.insert(key) {
            out.push(kw);
        }
    }
    out
}
