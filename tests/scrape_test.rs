//! Page scraping against a served page

use pretty_assertions::assert_eq;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use trackdrop::download::{ExtractorRegistry, ScrapeOutcome, TrackFetcher, TrackReference};

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Album</title></head>
<body>
  <ul class="tracks">
    <li class="item">
      <ul><li class="play" data-url="/get/101.mp3"></li></ul>
      <div class="desc">
        <span class="artist">  Massive
          Attack </span>
        <span class="track">Teardrop</span>
      </div>
    </li>
    <li class="item">
      <ul><li class="play" data-url="https://cdn.example.org/202.mp3"></li></ul>
      <div class="desc"><span class="track">Untitled</span></div>
    </li>
    <li class="item">
      <ul><li class="play"></li></ul>
    </li>
  </ul>
</body>
</html>"#;

#[tokio::test]
async fn test_scrape_served_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/album/7"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html"))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/album/7", server.uri())).unwrap();
    let fetcher = TrackFetcher::new().unwrap();
    let markup = fetcher.fetch_page(&url).await.unwrap();

    let registry = ExtractorRegistry::default_registry();
    let extractor = registry.resolve(&url).unwrap();

    match extractor.scrape(&markup, &url) {
        ScrapeOutcome::Found(tracks) => assert_eq!(
            tracks,
            vec![
                TrackReference::new(format!("{}/get/101.mp3", server.uri()), "Massive Attack - Teardrop"),
                TrackReference::new("https://cdn.example.org/202.mp3", "Untitled"),
            ]
        ),
        ScrapeOutcome::Empty => panic!("expected tracks"),
    }
}
