use super::*;

fn url(raw: &str) -> PageUrl {
    PageUrl::parse(raw).expect("url should parse")
}

#[test]
fn normalizes_fragment_and_trailing_slash() {
    assert_eq!(
        url("https://handbook.gitlab.com/handbook/values/#transparency").as_str(),
        "https://handbook.gitlab.com/handbook/values"
    );
    assert_eq!(
        url("https://handbook.gitlab.com/").as_str(),
        "https://handbook.gitlab.com"
    );
    assert_eq!(
        url("https://handbook.gitlab.com/handbook/"),
        url("https://handbook.gitlab.com/handbook")
    );
}

#[test]
fn rejects_non_http_urls() {
    assert!(PageUrl::parse("ftp://example.com").is_err());
    assert!(PageUrl::parse("not-a-url").is_err());
    assert!(PageUrl::parse("").is_err());
    assert!(PageUrl::parse("mailto:someone@example.com").is_err());
}

#[test]
fn join_resolves_relative_links() {
    let page = url("https://handbook.gitlab.com/handbook/values");
    assert_eq!(
        page.join("/handbook/people-group/").expect("should join").as_str(),
        "https://handbook.gitlab.com/handbook/people-group"
    );
    assert_eq!(
        page.join("https://about.gitlab.com/direction/#plan")
            .expect("should join")
            .as_str(),
        "https://about.gitlab.com/direction"
    );
    assert!(page.join("javascript:void(0)").is_err());
}

#[test]
fn handbook_domain_policy() {
    let domain = CrawlDomain::handbook();

    assert!(domain.is_valid_url(&url("https://handbook.gitlab.com/handbook/values")));
    assert!(!domain.is_valid_url(&url("https://about.gitlab.com/direction")));
    assert!(!domain.is_valid_url(&url("https://handbook.gitlab.com/search?q=values")));
    assert!(!domain.is_valid_url(&url("https://handbook.gitlab.com/images/logo.PNG")));
    assert!(!domain.is_valid_url(&url("https://handbook.gitlab.com/users/sign_in")));
}

#[test]
fn direction_domain_requires_path() {
    let domain = CrawlDomain::direction();

    assert!(domain.is_valid_url(&url("https://about.gitlab.com/direction/plan")));
    assert!(!domain.is_valid_url(&url("https://about.gitlab.com/pricing")));
    assert!(!domain.is_valid_url(&url("https://handbook.gitlab.com/direction")));
}

#[test]
fn domain_round_trips_through_toml() {
    let domains = default_domains();

    #[derive(Serialize, Deserialize)]
    struct Holder {
        domains: Vec<CrawlDomain>,
    }

    let text = toml::to_string(&Holder {
        domains: domains.clone(),
    })
    .expect("should serialize");
    let parsed: Holder = toml::from_str(&text).expect("should parse");
    assert_eq!(parsed.domains, domains);
}

#[test]
fn missing_exclude_patterns_use_defaults() {
    let parsed: CrawlDomain = toml::from_str(
        r#"
        name = "docs"
        base_url = "https://docs.example.com"
        host = "docs.example.com"
        "#,
    )
    .expect("should parse");
    assert_eq!(parsed.exclude_patterns.len(), DEFAULT_EXCLUDE_PATTERNS.len());
    assert_eq!(parsed.path_contains, None);
}
