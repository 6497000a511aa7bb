use url::Url;

use crate::error::HandoffError;

pub const AR_PARAM: &str = "ar";

/// `<product-url>?ar=true`, replacing any existing `ar` parameter and
/// keeping every other query parameter in order.
pub fn ar_deep_link(product_url: &str) -> Result<String, HandoffError> {
    let mut url = Url::parse(product_url)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != AR_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(AR_PARAM, "true");
    Ok(url.into())
}

/// Whether a page URL asks for the AR flow to open on arrival.
pub fn wants_ar(page_url: &str) -> bool {
    let Ok(url) = Url::parse(page_url) else {
        return false;
    };
    url.query_pairs()
        .any(|(k, v)| k == AR_PARAM && matches!(v.as_ref(), "true" | "1"))
}

#[cfg(test)]
mod tests {
    use super::{ar_deep_link, wants_ar};

    #[test]
    fn appends_flag() {
        assert_eq!(
            ar_deep_link("https://shop.example/products/oak-chair").expect("link"),
            "https://shop.example/products/oak-chair?ar=true"
        );
    }

    #[test]
    fn replaces_existing_flag_and_keeps_others() {
        let link = ar_deep_link("https://shop.example/p/oak?ar=false&ref=mail").expect("link");
        assert_eq!(link, "https://shop.example/p/oak?ref=mail&ar=true");
        assert!(wants_ar(&link));
    }

    #[test]
    fn detects_flag() {
        assert!(wants_ar("https://shop.example/p/oak?ar=1"));
        assert!(!wants_ar("https://shop.example/p/oak?ar=false"));
        assert!(!wants_ar("https://shop.example/p/oak"));
        assert!(!wants_ar("/p/oak?ar=true"));
    }

    #[test]
    fn relative_urls_are_rejected() {
        assert!(ar_deep_link("/products/oak").is_err());
    }
}
