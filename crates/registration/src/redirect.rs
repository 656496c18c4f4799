use std::collections::HashSet;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};
use url::Url;

use tabrelay_core::AutomationError;

use crate::fetcher::{FetchedPage, PageSource};

// Priority order matters: the first pattern that matches wins.
static REDIRECT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r#"(?i)window\.location\.href\s*=\s*["']([^"']+)["']"#).unwrap(),
        Regex::new(r#"(?i)window\.location\.replace\s*\(\s*["']([^"']+)["']\s*\)"#).unwrap(),
        Regex::new(r#"(?i)location\.href\s*=\s*["']([^"']+)["']"#).unwrap(),
    ]
});

/// First client-side redirect target found in the page, as written.
pub fn detect_redirect(html: &str) -> Option<&str> {
    REDIRECT_PATTERNS.iter().find_map(|re| {
        re.captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|target| !target.trim().is_empty())
    })
}

#[derive(Debug, Clone)]
pub struct ResolvedPage {
    pub html: String,
    pub final_url: Url,
    pub hops: usize,
}

/// Follows textual JavaScript redirects without executing any script.
#[derive(Debug, Clone)]
pub struct RedirectResolver {
    max_hops: usize,
}

impl RedirectResolver {
    pub fn new(max_hops: usize) -> Self {
        Self { max_hops }
    }

    /// The next URL to visit, or `None` when the page has no redirect, the
    /// target does not parse, or it points somewhere already visited.
    pub fn next_target(&self, html: &str, base: &Url, visited: &HashSet<Url>) -> Option<Url> {
        let raw = detect_redirect(html)?;
        let target = match base.join(raw.trim()) {
            Ok(url) => url,
            Err(e) => {
                debug!(target = raw, error = %e, "unresolvable redirect target");
                return None;
            }
        };

        if visited.contains(&target) {
            debug!(target = %target, "redirect loop detected");
            return None;
        }
        Some(target)
    }

    /// Follow redirects from an already-fetched page. `observer` hears about
    /// every hop before it is fetched. A failed hop keeps the current page
    /// rather than failing the whole resolution.
    pub async fn resolve(
        &self,
        source: &dyn PageSource,
        start: FetchedPage,
        observer: &dyn HopObserver,
    ) -> Result<ResolvedPage, AutomationError> {
        let mut visited = HashSet::from([start.url, start.final_url.clone()]);
        let mut page = ResolvedPage { html: start.html, final_url: start.final_url, hops: 0 };

        while page.hops < self.max_hops {
            let Some(target) = self.next_target(&page.html, &page.final_url, &visited) else {
                break;
            };

            info!(from = %page.final_url, to = %target, "following client-side redirect");
            visited.insert(target.clone());
            observer.on_hop(&target).await?;

            match source.fetch(&target).await {
                Ok(fetched) => {
                    visited.insert(fetched.final_url.clone());
                    page.html = fetched.html;
                    page.final_url = fetched.final_url;
                    page.hops += 1;
                }
                Err(e) => {
                    warn!(target = %target, error = %e, "redirect target could not be fetched, keeping current page");
                    break;
                }
            }
        }

        Ok(page)
    }
}

/// Hook called before each redirect hop is fetched.
#[async_trait]
pub trait HopObserver: Send + Sync {
    async fn on_hop(&self, target: &Url) -> Result<(), AutomationError>;
}

/// No-op observer.
#[async_trait]
impl HopObserver for () {
    async fn on_hop(&self, _target: &Url) -> Result<(), AutomationError> {
        Ok(())
    }
}

impl Default for RedirectResolver {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn fetched(url: &str, html: &str) -> FetchedPage {
        let url = Url::parse(url).unwrap();
        FetchedPage {
            url: url.clone(),
            final_url: url,
            status: 200,
            html: html.to_string(),
            response_time_ms: 0,
        }
    }

    /// Records the targets it was told about.
    #[derive(Default)]
    struct HopLog(Mutex<Vec<String>>);

    #[async_trait]
    impl HopObserver for HopLog {
        async fn on_hop(&self, target: &Url) -> Result<(), AutomationError> {
            self.0.lock().unwrap().push(target.to_string());
            Ok(())
        }
    }

    /// Serves canned HTML keyed by URL and records every request.
    struct MapSource {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl MapSource {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages.iter().map(|(u, h)| (u.to_string(), h.to_string())).collect(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageSource for MapSource {
        async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            match self.pages.get(url.as_str()) {
                Some(html) => Ok(FetchedPage {
                    url: url.clone(),
                    final_url: url.clone(),
                    status: 200,
                    html: html.clone(),
                    response_time_ms: 0,
                }),
                None => Err(FetchError::Status(404)),
            }
        }
    }

    #[test]
    fn test_detect_patterns_in_priority_order() {
        assert_eq!(detect_redirect(r#"<script>window.location.href = "/a";</script>"#), Some("/a"));
        assert_eq!(detect_redirect(r#"window.location.replace('/b')"#), Some("/b"));
        assert_eq!(detect_redirect(r#"location.href='/c'"#), Some("/c"));
        assert_eq!(
            detect_redirect(r#"location.href="/low"; window.location.replace("/high")"#),
            Some("/high")
        );
        assert_eq!(detect_redirect("<p>no script here</p>"), None);
    }

    #[tokio::test]
    async fn test_relative_redirect_resolves_against_base() {
        let source = MapSource::new(&[("https://site.test/next-step", "<form>signup</form>")]);
        let hops = HopLog::default();
        let start = fetched(
            "https://site.test/start",
            r#"<script>window.location.href = "/next-step"</script>"#,
        );

        let page = RedirectResolver::default().resolve(&source, start, &hops).await.unwrap();

        assert_eq!(page.final_url.as_str(), "https://site.test/next-step");
        assert_eq!(page.html, "<form>signup</form>");
        assert_eq!(page.hops, 1);
        assert_eq!(*hops.0.lock().unwrap(), vec!["https://site.test/next-step"]);
    }

    #[tokio::test]
    async fn test_failed_hop_keeps_current_page() {
        let source = MapSource::new(&[]);
        let hops = HopLog::default();
        let html = r#"location.href = "/missing""#;

        let page = RedirectResolver::default()
            .resolve(&source, fetched("https://site.test/start", html), &hops)
            .await
            .unwrap();

        assert_eq!(page.final_url.as_str(), "https://site.test/start");
        assert_eq!(page.html, html);
        assert_eq!(page.hops, 0);
        // The attempt is still reported.
        assert_eq!(hops.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_redirect_loop_stops() {
        let source = MapSource::new(&[
            ("https://site.test/a", r#"location.href = "/b""#),
            ("https://site.test/b", r#"location.href = "/a""#),
        ]);

        let page = RedirectResolver::default()
            .resolve(&source, fetched("https://site.test/a", r#"location.href = "/b""#), &())
            .await
            .unwrap();

        assert_eq!(page.final_url.as_str(), "https://site.test/b");
        assert_eq!(source.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_server_redirect_origin_counts_as_visited() {
        // Requested /login, the server redirected to /home, whose script points back to /login.
        let source = MapSource::new(&[("https://site.test/login", "<form></form>")]);
        let start = FetchedPage {
            final_url: Url::parse("https://site.test/home").unwrap(),
            ..fetched("https://site.test/login", r#"location.href = "/login""#)
        };

        let page = RedirectResolver::default().resolve(&source, start, &()).await.unwrap();

        assert_eq!(page.hops, 0);
        assert!(source.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hop_limit_is_enforced() {
        let pages: Vec<(String, String)> = (0..10)
            .map(|i| (format!("https://site.test/{}", i), format!(r#"location.href = "/{}""#, i + 1)))
            .collect();
        let refs: Vec<(&str, &str)> = pages.iter().map(|(u, h)| (u.as_str(), h.as_str())).collect();
        let source = MapSource::new(&refs);

        let page = RedirectResolver::new(3)
            .resolve(&source, fetched("https://site.test/0", r#"location.href = "/1""#), &())
            .await
            .unwrap();

        assert_eq!(page.hops, 3);
        assert_eq!(page.final_url.as_str(), "https://site.test/3");
    }

    #[tokio::test]
    async fn test_observer_error_aborts_resolution() {
        struct Refuse;

        #[async_trait]
        impl HopObserver for Refuse {
            async fn on_hop(&self, _target: &Url) -> Result<(), AutomationError> {
                Err(AutomationError::Storage("log unavailable".into()))
            }
        }

        let source = MapSource::new(&[("https://site.test/b", "<p></p>")]);
        let err = RedirectResolver::default()
            .resolve(&source, fetched("https://site.test/a", r#"location.href = "/b""#), &Refuse)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, AutomationError::Storage(_)));
        assert!(source.requests.lock().unwrap().is_empty());
    }
}
