//! Ranking of web search results as website guesses for a business name.

use crate::domain::model::{Candidate, SearchHit};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[a-z0-9]+").expect("token pattern is valid"))
}

/// Lowercased host of `url` without a leading `www.`; empty when there is none.
pub fn domain_from_url(url: &str) -> String {
    let host = match Url::parse(url) {
        Ok(parsed) => parsed.host_str().unwrap_or_default().to_lowercase(),
        Err(_) => return String::new(),
    };
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

pub fn name_tokens(name: &str) -> Vec<String> {
    let lower = name.to_lowercase();
    token_pattern()
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Share of name tokens that occur in `"title domain"`, rounded to two decimals.
pub fn name_token_confidence(name: &str, title: &str, domain: &str) -> f64 {
    let tokens = name_tokens(name);
    if tokens.is_empty() {
        return 0.0;
    }

    let haystack = format!("{} {}", title, domain).to_lowercase();
    let found = tokens
        .iter()
        .filter(|token| haystack.contains(token.as_str()))
        .count();

    round2(found as f64 / tokens.len() as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn is_blocked_domain(domain: &str, blocked: &[String]) -> bool {
    blocked.iter().any(|pattern| domain.contains(pattern.as_str()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPolicy {
    pub strong_match: f64,
    pub blocked_domains: Vec<String>,
}

impl SelectionPolicy {
    /// Pick a website for `name` from `hits`, in search order.
    ///
    /// The first candidate at or above `strong_match` wins outright. Otherwise
    /// the highest-confidence candidate is kept, earlier hits winning ties.
    pub fn select(&self, name: &str, hits: &[SearchHit]) -> Candidate {
        let mut best: Option<Candidate> = None;

        for hit in hits {
            let domain = domain_from_url(&hit.url);
            if domain.is_empty() || is_blocked_domain(&domain, &self.blocked_domains) {
                tracing::debug!("Skipping result {} for '{}'", hit.url, name);
                continue;
            }

            let confidence = name_token_confidence(name, &hit.title, &domain);
            let candidate = Candidate {
                domain,
                url: hit.url.clone(),
                title: hit.title.clone(),
                confidence,
            };

            if confidence >= self.strong_match {
                return candidate;
            }

            if best
                .as_ref()
                .map_or(true, |current| confidence > current.confidence)
            {
                best = Some(candidate);
            }
        }

        best.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SelectionPolicy {
        SelectionPolicy {
            strong_match: 0.4,
            blocked_domains: vec!["yelp.".to_string(), "facebook.".to_string()],
        }
    }

    fn hit(url: &str, title: &str) -> SearchHit {
        SearchHit {
            url: url.to_string(),
            title: title.to_string(),
        }
    }

    #[test]
    fn test_domain_from_url() {
        assert_eq!(domain_from_url("https://www.BikeWorld.com/contact"), "bikeworld.com");
        assert_eq!(domain_from_url("http://shop.example.org:8080/x"), "shop.example.org");
        assert_eq!(domain_from_url("not a url"), "");
        assert_eq!(domain_from_url(""), "");
    }

    #[test]
    fn test_confidence_full_match() {
        let confidence = name_token_confidence(
            "Bike World",
            "Bike World Shop — bikeworld.com",
            "bikeworld.com",
        );
        assert_eq!(confidence, 1.0);
    }

    #[test]
    fn test_confidence_no_match() {
        let confidence = name_token_confidence("Acme Cycles", "Garden Supplies Online", "gardens.net");
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn test_confidence_is_rounded() {
        // 3 個 token 命中 1 個
        let confidence = name_token_confidence("Valley Bike Shop", "Valley Farms", "valleyfarms.com");
        assert_eq!(confidence, 0.33);
        assert_eq!(name_token_confidence("!!!", "anything", "example.com"), 0.0);
    }

    #[test]
    fn test_select_short_circuits_on_strong_match() {
        let hits = vec![
            hit("https://www.yelp.com/biz/bike-world", "Bike World - Yelp"),
            hit("https://random.example.com/", "Totally unrelated"),
            hit("https://www.bikeworld.com/", "Bike World"),
            hit("https://bike-world-too.com/", "Bike World Too"),
        ];

        let candidate = policy().select("Bike World", &hits);
        assert_eq!(candidate.domain, "bikeworld.com");
        assert_eq!(candidate.url, "https://www.bikeworld.com/");
        assert_eq!(candidate.confidence, 1.0);
    }

    #[test]
    fn test_select_falls_back_to_best_weak_candidate() {
        let hits = vec![
            hit("https://alpha.example.com/", "Nothing here"),
            hit("https://beta.example.com/", "Cycles and more"),
        ];

        let candidate = policy().select("Acme Bikes Cycles Outlet Store", &hits);
        assert_eq!(candidate.domain, "beta.example.com");
        assert_eq!(candidate.confidence, 0.2);
    }

    #[test]
    fn test_select_keeps_first_on_ties() {
        let hits = vec![
            hit("https://first.example.com/", "Nothing"),
            hit("https://second.example.com/", "Nothing either"),
        ];

        let candidate = policy().select("Acme Cycles", &hits);
        assert_eq!(candidate.domain, "first.example.com");
        assert_eq!(candidate.confidence, 0.0);
    }

    #[test]
    fn test_select_returns_placeholder_when_everything_is_blocked() {
        let hits = vec![hit("https://m.facebook.com/acme", "Acme Cycles")];
        let candidate = policy().select("Acme Cycles", &hits);
        assert!(candidate.is_empty());
        assert_eq!(candidate, Candidate::default());
    }
}
