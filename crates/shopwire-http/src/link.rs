//! `Link` header pagination.
//!
//! Cursor-paginated REST listings advertise neighbouring pages as
//! `<https://shop/admin/api/2024-01/products.json?limit=250&page_info=abc>; rel="next"`.

use url::Url;

/// Continuation tokens found in a `Link` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    /// `page_info` of the `rel="next"` link.
    pub next: Option<String>,
    /// `page_info` of the `rel="previous"` link.
    pub previous: Option<String>,
}

impl PageLinks {
    /// Parse a `Link` header value. Links without a `page_info` are ignored.
    #[must_use]
    pub fn parse(header: &str) -> Self {
        let mut links = Self::default();
        for entry in header.split('<').skip(1) {
            let Some((target, params)) = entry.split_once('>') else {
                continue;
            };
            let Some(token) = page_info(target) else {
                continue;
            };
            match relation(params) {
                Some("next") => links.next = Some(token),
                Some("previous" | "prev") => links.previous = Some(token),
                _ => {}
            }
        }
        links
    }
}

fn page_info(target: &str) -> Option<String> {
    let url = Url::parse(target.trim()).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "page_info")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

fn relation(params: &str) -> Option<&str> {
    params.split(';').find_map(|param| {
        let (key, value) = param.split_once('=')?;
        (key.trim().eq_ignore_ascii_case("rel"))
            .then(|| value.trim().trim_matches(|c| c == '"' || c == ','))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_next_and_previous() {
        let header = concat!(
            "<https://shop.myshopify.com/admin/api/2024-01/products.json",
            "?limit=250&page_info=prevToken>; rel=\"previous\", ",
            "<https://shop.myshopify.com/admin/api/2024-01/products.json",
            "?limit=250&page_info=nextToken>; rel=\"next\"",
        );
        let links = PageLinks::parse(header);
        assert_eq!(links.next.as_deref(), Some("nextToken"));
        assert_eq!(links.previous.as_deref(), Some("prevToken"));
    }

    #[test]
    fn only_next() {
        let header = concat!(
            "<https://s.myshopify.com/admin/api/2024-01/orders.json",
            r#"?page_info=abc&limit=250>; rel="next""#,
        );
        let links = PageLinks::parse(header);
        assert_eq!(links.next.as_deref(), Some("abc"));
        assert!(links.previous.is_none());
    }

    #[test]
    fn commas_inside_urls_are_kept() {
        let header = concat!(
            "<https://s.myshopify.com/admin/api/2024-01/orders.json",
            r#"?fields=id,name&page_info=xyz>; rel="next""#,
        );
        assert_eq!(PageLinks::parse(header).next.as_deref(), Some("xyz"));
    }

    #[test]
    fn garbage_yields_nothing() {
        assert_eq!(PageLinks::parse(""), PageLinks::default());
        assert_eq!(PageLinks::parse("<not a url>; rel=\"next\""), PageLinks::default());
        assert_eq!(
            PageLinks::parse("<https://s.myshopify.com/a.json>; rel=\"next\""),
            PageLinks::default()
        );
    }
}
