use termpipe_core::{Competitor, Error, Result};

/// Statically configured competitor sets, keyed by product category.
///
/// Only name + base URL: every capability-specific URL is discovered at run
/// time (oracle guess + homepage scan).
const PRODUCT_COMPETITORS: &[(&str, &[(&str, &str)])] = &[
    (
        "Assets",
        &[
            ("Bynder", "https://www.bynder.com/"),
            ("Brandfolder", "https://brandfolder.com/"),
            ("Canto", "https://www.canto.com/"),
            ("Widen", "https://www.widen.com/"),
        ],
    ),
    (
        "Forms",
        &[
            ("Typeform", "https://www.typeform.com/"),
            ("Jotform", "https://www.jotform.com/"),
            ("Formstack", "https://www.formstack.com/"),
            ("Wufoo", "https://www.wufoo.com/"),
        ],
    ),
    (
        "Sites",
        &[
            ("Wix", "https://www.wix.com/"),
            ("Squarespace", "https://www.squarespace.com/"),
            ("Webflow", "https://webflow.com/"),
            ("WordPress", "https://wordpress.com/"),
        ],
    ),
];

pub fn products() -> Vec<&'static str> {
    PRODUCT_COMPETITORS.iter().map(|(p, _)| *p).collect()
}

pub fn competitors_for(product: &str) -> Result<Vec<Competitor>> {
    PRODUCT_COMPETITORS
        .iter()
        .find(|(p, _)| *p == product)
        .map(|(_, comps)| {
            comps
                .iter()
                .map(|(name, url)| Competitor {
                    name: name.to_string(),
                    base_url: url.to_string(),
                })
                .collect()
        })
        .ok_or_else(|| Error::UnknownProduct(product.to_string()))
}

/// Research-tool URL for manual keyword follow-up.
pub fn lookup_url(keyword: &str) -> String {
    format!(
        "https://www.semrush.com/analytics/keywordmagic/?q={}&db=us",
        keyword.replace(' ', "+")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_products_resolve_in_configured_order() {
        let comps = competitors_for("Forms").unwrap();
        assert_eq!(comps.len(), 4);
        assert_eq!(comps[0].name, "Typeform");
        assert_eq!(comps[0].base_url, "https://www.typeform.com/");
    }

    #[test]
    fn unknown_product_is_an_error() {
        assert!(matches!(
            competitors_for("Spreadsheets"),
            Err(Error::UnknownProduct(_))
        ));
    }

    #[test]
    fn lookup_url_escapes_spaces() {
        assert_eq!(
            lookup_url("form builder"),
            "https://www.semrush.com/analytics/keywordmagic/?q=form+builder&db=us"
        );
    }
}
