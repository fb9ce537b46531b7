//! Image references inside converted Markdown.
//!
//! After conversion, a post body refers to its images through whatever URL
//! Ghost rendered: absolute (`https://blog.example.com/content/images/…`),
//! site-relative (`/content/images/…`), or still carrying the
//! `__GHOST_URL__` placeholder. Hugo page bundles want `./<file>` next to
//! `index.md`, so this module finds every `![alt](url)` construct and
//! rewrites the ones that point into Ghost's image store.
//!
//! Only URLs shaped like a Ghost content image are touched:
//!
//! ```text
//! https://blog.example.com/content/images/2020/01/pic.jpg   → ./pic.jpg
//! /content/images/size/w600/2020/01/pic.JPG                 → ./pic.JPG
//! https://cdn.example.org/pic.jpg                            (unchanged)
//! /content/images/2020/01/report.pdf                         (unchanged)
//! ./pic.jpg                                                  (unchanged)
//! ```

use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// `![alt](url "title")`. Alt may contain escaped brackets.
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[((?:[^\]\\]|\\.)*)\]\(\s*([^)\s]+)(\s+"[^"]*")?\s*\)"#)
        .expect("IMAGE_RE should compile")
});

static CONTENT_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:(?:https?:)?//[^/\s]+|__GHOST_URL__)?",
        r"/(?:[^\s?#]*/)?content/images/(?:[^\s?#]*/)?",
        r"([^/\s?#]+\.(?:jpe?g|png|gif|webp|avif))(?:[?#]\S*)?$",
    ))
    .expect("CONTENT_IMAGE_RE should compile")
});

/// One `![alt](url)` construct found in Markdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    pub alt: String,
    pub url: String,
}

/// All image constructs in document order.
pub fn image_refs(markdown: &str) -> Vec<ImageRef> {
    IMAGE_RE
        .captures_iter(markdown)
        .map(|caps| ImageRef {
            alt: caps[1].to_string(),
            url: caps[2].to_string(),
        })
        .collect()
}

/// Last path segment of a URL or path, without query or fragment.
pub fn url_basename(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

/// [`url_basename`] with percent-escapes decoded, as the name appears on disk.
///
/// Falls back to the raw segment when the escapes do not decode to UTF-8.
pub fn decoded_basename(url: &str) -> Option<String> {
    let name = url_basename(url)?;
    let decoded = percent_decode_str(name)
        .decode_utf8()
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| name.to_string());
    Some(decoded).filter(|d| !d.is_empty() && !d.contains('/'))
}

/// Basename of a URL that points into Ghost's content image store.
pub fn content_image_basename(url: &str) -> Option<&str> {
    CONTENT_IMAGE_RE
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn render(alt: &str, url: &str, title: Option<&str>) -> String {
    format!("![{alt}]({url}{})", title.unwrap_or(""))
}

fn escape_alt(alt: &str) -> String {
    alt.replace('[', "\\[").replace(']', "\\]")
}

/// Give every image with an empty alt text the `default_alt`.
pub fn ensure_alts(markdown: &str, default_alt: &str) -> String {
    let default_alt = escape_alt(default_alt);
    IMAGE_RE
        .replace_all(markdown, |caps: &Captures| {
            if caps[1].trim().is_empty() {
                render(&default_alt, &caps[2], caps.get(3).map(|m| m.as_str()))
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Rewrite image URLs through `f`; `None` keeps the construct verbatim.
pub fn map_image_urls(markdown: &str, mut f: impl FnMut(&str) -> Option<String>) -> String {
    IMAGE_RE
        .replace_all(markdown, |caps: &Captures| match f(&caps[2]) {
            Some(url) => render(&caps[1], &url, caps.get(3).map(|m| m.as_str())),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Point every Ghost content image at `./<basename>`.
///
/// Idempotent: rewritten URLs no longer look like content image URLs.
pub fn rewrite_paths(markdown: &str) -> String {
    map_image_urls(markdown, |url| {
        content_image_basename(url).map(|name| format!("./{name}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_refs_in_order() {
        let md = "![a](one.png) text ![b \\] c](two.jpg \"Title\")";
        assert_eq!(
            image_refs(md),
            vec![
                ImageRef {
                    alt: "a".into(),
                    url: "one.png".into()
                },
                ImageRef {
                    alt: "b \\] c".into(),
                    url: "two.jpg".into()
                },
            ]
        );
    }

    #[test]
    fn links_are_not_images() {
        assert!(image_refs("[text](https://example.com/pic.jpg)").is_empty());
    }

    #[test]
    fn basename_strips_query_and_fragment() {
        assert_eq!(url_basename("https://x.org/a/b/pic.jpg?w=600#top"), Some("pic.jpg"));
        assert_eq!(url_basename("./pic.jpg"), Some("pic.jpg"));
        assert_eq!(url_basename("https://x.org/dir/"), None);
    }

    #[test]
    fn decoded_basename_matches_file_on_disk() {
        assert_eq!(
            decoded_basename("/content/images/2020/01/my%20pic.jpg"),
            Some("my pic.jpg".to_string())
        );
        assert_eq!(
            decoded_basename("./caf%C3%A9.png?v=1"),
            Some("café.png".to_string())
        );
        assert_eq!(decoded_basename("./plain.jpg"), Some("plain.jpg".to_string()));
        assert_eq!(decoded_basename("./bad%FF.jpg"), Some("bad%FF.jpg".to_string()));
        assert_eq!(decoded_basename("./a%2Fb.jpg"), None);
    }

    #[test]
    fn content_image_shapes() {
        for url in [
            "https://blog.example.com/content/images/2020/01/pic.jpg",
            "http://blog.example.com/blog/content/images/pic.jpg",
            "//blog.example.com/content/images/pic.jpg",
            "/content/images/size/w600/2020/01/pic.jpg",
            "__GHOST_URL__/content/images/2020/01/pic.jpg",
            "/content/images/2020/01/pic.jpg?v=3",
        ] {
            assert_eq!(content_image_basename(url), Some("pic.jpg"), "{url}");
        }
        assert_eq!(
            content_image_basename("/content/images/Photo.JPEG"),
            Some("Photo.JPEG")
        );
        for ext in ["png", "gif", "webp", "avif"] {
            let url = format!("/content/images/a.{ext}");
            assert_eq!(content_image_basename(&url), Some(format!("a.{ext}").as_str()));
        }
    }

    #[test]
    fn non_content_urls_rejected() {
        for url in [
            "https://cdn.example.org/pic.jpg",
            "/content/images/2020/01/report.pdf",
            "./pic.jpg",
            "pic.jpg",
            "https://example.com/other/images/pic.png",
        ] {
            assert_eq!(content_image_basename(url), None, "{url}");
        }
    }

    #[test]
    fn ensure_alts_fills_only_empty() {
        let md = "![](a.jpg) ![  ](b.jpg \"T\") ![kept](c.jpg)";
        assert_eq!(
            ensure_alts(md, "my-post"),
            "![my-post](a.jpg) ![my-post](b.jpg \"T\") ![kept](c.jpg)"
        );
    }

    #[test]
    fn rewrite_paths_localizes_content_images() {
        let md = concat!(
            "Intro ![x](https://blog.example.com/content/images/2020/01/pic.jpg) ",
            "and ![y](https://cdn.org/z.png)"
        );
        assert_eq!(
            rewrite_paths(md),
            "Intro ![x](./pic.jpg) and ![y](https://cdn.org/z.png)"
        );
    }

    #[test]
    fn rewrite_paths_keeps_title() {
        assert_eq!(
            rewrite_paths("![x](/content/images/pic.jpg \"Caption\")"),
            "![x](./pic.jpg \"Caption\")"
        );
    }

    #[test]
    fn rewrite_paths_idempotent() {
        let md = concat!(
            "![a](/content/images/2020/01/a.png)\n\n",
            "![b](https://h.io/content/images/b.webp?x=1)\n\n",
            "![c](https://cdn.org/c.jpg)\n\n",
            "![d](./d.gif)"
        );
        let once = rewrite_paths(md);
        assert_eq!(rewrite_paths(&once), once);
    }

    #[test]
    fn rewrite_paths_leaves_plain_links() {
        let md = "[download](/content/images/2020/01/pic.jpg)";
        assert_eq!(rewrite_paths(md), md);
    }
}
