//! 媒体地址解析：后端返回的图片地址可能是相对路径

use once_cell::sync::Lazy;
use regex::Regex;

static ABSOLUTE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://").unwrap());

/// 把图片地址解析为可直接访问的绝对地址
pub fn resolve_media_url(base_url: &str, url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    if ABSOLUTE_URL.is_match(url) || url.starts_with("data:") {
        return url.to_string();
    }

    let base = base_url.trim_end_matches('/');
    if url.starts_with('/') {
        format!("{}{}", base, url)
    } else {
        format!("{}/{}", base, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:8080";

    #[test]
    fn test_absolute_urls_untouched() {
        assert_eq!(
            resolve_media_url(BASE, "https://cdn.example.com/a.jpg"),
            "https://cdn.example.com/a.jpg"
        );
        assert_eq!(resolve_media_url(BASE, "HTTP://X/y.png"), "HTTP://X/y.png");
        assert_eq!(
            resolve_media_url(BASE, "data:image/png;base64,AAAA"),
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn test_relative_urls_joined() {
        assert_eq!(
            resolve_media_url(BASE, "/uploads/1.jpg"),
            "http://localhost:8080/uploads/1.jpg"
        );
        assert_eq!(
            resolve_media_url("http://localhost:8080/", "uploads/1.jpg"),
            "http://localhost:8080/uploads/1.jpg"
        );
        assert_eq!(resolve_media_url(BASE, ""), "");
    }
}
