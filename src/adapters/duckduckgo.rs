//! Keyless web search through DuckDuckGo's HTML endpoint.

use crate::domain::model::SearchHit;
use crate::domain::ports::WebSearch;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// `kp=-1` is DuckDuckGo's moderate safe-search setting.
const SAFE_SEARCH_MODERATE: &str = "-1";

const REDIRECT_BASE: &str = "https://duckduckgo.com/";
const AD_PATH: &str = "/y.js";

pub struct DuckDuckGoSearch {
    client: Client,
    endpoint: String,
}

impl DuckDuckGoSearch {
    pub fn new(endpoint: impl Into<String>, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        tracing::debug!("Searching '{}' via {}", query, self.endpoint);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("kp", SAFE_SEARCH_MODERATE)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::SearchError {
                query: query.to_string(),
                message: format!("provider answered {}", status),
            });
        }

        let body = response.text().await?;
        let hits = parse_results(&body, max_results);
        if hits.is_empty() {
            tracing::debug!("No organic results for '{}'", query);
        }
        Ok(hits)
    }
}

/// Organic results of a DuckDuckGo HTML page, in page order.
pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a.result__a") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            let url = resolve_result_url(href)?;
            let title = anchor.text().collect::<String>().trim().to_string();
            Some(SearchHit { url, title })
        })
        .take(max_results)
        .collect()
}

/// Result links usually go through `/l/?uddg=<target>`; unwrap those to the
/// target URL. Sponsored links (`/y.js`) are dropped.
fn resolve_result_url(href: &str) -> Option<String> {
    let url = Url::parse(REDIRECT_BASE).ok()?.join(href).ok()?;
    let on_duckduckgo = url
        .host_str()
        .is_some_and(|host| host == "duckduckgo.com" || host.ends_with(".duckduckgo.com"));

    if on_duckduckgo && url.path() == AD_PATH {
        return None;
    }

    if on_duckduckgo && url.path().starts_with("/l/") {
        return url
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned());
    }

    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const PAGE: &str = r#"<html><body>
<div class="result results_links">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.bikeworld.com%2F&amp;rut=abc">Bike <b>World</b> Seattle</a>
  </h2>
</div>
<div class="result results_links">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="https://www.yelp.com/biz/bike-world-seattle">Bike World - Yelp</a>
  </h2>
</div>
<div class="result results_links">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="/l/?uddg=https%3A%2F%2Fcycles.example.org%2Fabout">Cycles</a>
  </h2>
</div>
</body></html>"#;

    #[test]
    fn test_parse_results_unwraps_redirects() {
        let hits = parse_results(PAGE, 8);

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].url, "https://www.bikeworld.com/");
        assert_eq!(hits[0].title, "Bike World Seattle");
        assert_eq!(hits[1].url, "https://www.yelp.com/biz/bike-world-seattle");
        assert_eq!(hits[2].url, "https://cycles.example.org/about");
    }

    #[test]
    fn test_parse_results_respects_limit() {
        assert_eq!(parse_results(PAGE, 2).len(), 2);
        assert!(parse_results("<html><body>No results.</body></html>", 8).is_empty());
    }

    #[test]
    fn test_sponsored_results_are_skipped() {
        let page = r#"<html><body>
<div class="result result--ad">
  <h2 class="result__title">
    <a class="result__a" href="https://duckduckgo.com/y.js?ad_domain=bikechain.example&amp;ad_provider=bing&amp;u3=x">Bike World Sale - Bike World Deals</a>
  </h2>
</div>
<div class="result results_links">
  <h2 class="result__title">
    <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.bikeworld.com%2F&amp;rut=abc">Bike World</a>
  </h2>
</div>
</body></html>"#;

        let hits = parse_results(page, 8);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://www.bikeworld.com/");

        let policy = crate::core::scoring::SelectionPolicy {
            strong_match: 0.4,
            blocked_domains: Vec::new(),
        };
        let candidate = policy.select("Bike World", &hits);
        assert_eq!(candidate.domain, "bikeworld.com");
        assert_eq!(candidate.url, "https://www.bikeworld.com/");
    }

    #[test]
    fn test_ad_limit_counts_only_organic_results() {
        let page = format!(
            r#"<a class="result__a" href="https://duckduckgo.com/y.js?ad_domain=a.example">Ad</a>{}"#,
            PAGE
        );
        let hits = parse_results(&page, 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://www.bikeworld.com/");
    }

    #[tokio::test]
    async fn test_search_queries_html_endpoint() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/html/")
                .query_param("q", "Bike World bike shop website")
                .query_param("kp", "-1");
            then.status(200)
                .header("Content-Type", "text/html")
                .body(PAGE);
        });

        let search =
            DuckDuckGoSearch::new(server.url("/html/"), "dealer-etl-test/1.0", Duration::from_secs(5)).unwrap();
        let hits = search.search("Bike World bike shop website", 8).await.unwrap();

        mock.assert();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn test_search_rate_limited() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/html/");
            then.status(403);
        });

        let search =
            DuckDuckGoSearch::new(server.url("/html/"), "dealer-etl-test/1.0", Duration::from_secs(5)).unwrap();
        let err = search.search("Bike World", 8).await.unwrap_err();
        assert!(matches!(err, EtlError::SearchError { .. }));
    }
}
