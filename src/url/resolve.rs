use crate::{UrlError, UrlResult};
use url::Url;

/// Parses the URL of a page about to be fetched
///
/// Only HTTP and HTTPS URLs with a host are accepted.
pub fn parse_page_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Resolves an href to an absolute URL
///
/// Returns None if the link should be ignored:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: and data: links
/// - anything that doesn't resolve to HTTP(S)
pub fn resolve_href(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/district/alpha/").unwrap()
    }

    #[test]
    fn test_resolve_absolute() {
        assert_eq!(
            resolve_href("https://other.com/school", &base_url()),
            Some("https://other.com/school".to_string())
        );
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(
            resolve_href("page/2/", &base_url()),
            Some("https://example.com/district/alpha/page/2/".to_string())
        );
        assert_eq!(
            resolve_href("/school/x", &base_url()),
            Some("https://example.com/school/x".to_string())
        );
    }

    #[test]
    fn test_skip_special_links() {
        for href in ["", "  ", "#top", "javascript:void(0)", "mailto:a@b.c", "tel:123"] {
            assert_eq!(resolve_href(href, &base_url()), None, "href {:?}", href);
        }
    }

    #[test]
    fn test_parse_page_url() {
        assert!(parse_page_url("http://127.0.0.1:8080/page1").is_ok());
        assert!(matches!(
            parse_page_url("ftp://example.com/"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(parse_page_url("not a url"), Err(UrlError::Parse(_))));
    }
}
