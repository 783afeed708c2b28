//! Integration tests for the crawler
//!
//! The end-to-end test uses wiremock to stand in for the page-data proxy.
//! The scheduling tests drive the crawler with a scripted in-memory fetcher
//! so they can observe every request.

use async_trait::async_trait;
use crawl_harness::config::{parse_config, Config, UserAgent};
use crawl_harness::crawler::{crawl, FetchError, FetchedPage, Fetcher};
use crawl_harness::page_tests::{PageContext, TestRecorder};
use crawl_harness::state::CrawlState;
use crawl_harness::storage::{RunStatus, SqliteStorage, Storage};
use crawl_harness::{CrawlEvent, Crawler, EventKind};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

type Log = Arc<Mutex<Vec<String>>>;

/// Creates a test configuration for example.com
fn create_test_config(start_paths: &[&str], max_concurrent: u32, extra_session: &str) -> Config {
    let start_paths = start_paths
        .iter()
        .map(|p| format!("\"{}\"", p))
        .collect::<Vec<_>>()
        .join(", ");

    parse_config(&format!(
        r#"
[session]
crawl-id = "integration"
site = "example.com"
start-paths = [{}]
{}

[crawler]
max-concurrent-fetches = {}
loop-interval-ms = 10
fetch-timeout-secs = 5

[proxy]
endpoint = "http://127.0.0.1:9/seotest/getPageData"
"#,
        start_paths, extra_session, max_concurrent
    ))
    .expect("test config is valid")
}

fn html(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!(
        "<html><head><title>Test</title></head><body>{}</body></html>",
        anchors
    )
}

enum Script {
    Page { served: String, body: String },
    Fail,
}

#[derive(Default)]
struct ScriptState {
    pages: HashMap<String, Script>,
    calls: Mutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

/// In-memory fetcher answering from a script, recording every call
#[derive(Clone)]
struct ScriptedFetcher {
    state: Arc<ScriptState>,
    delay: Duration,
}

impl ScriptedFetcher {
    fn builder(delay: Duration) -> ScriptBuilder {
        ScriptBuilder {
            pages: HashMap::new(),
            delay,
        }
    }

    fn calls(&self) -> Vec<String> {
        self.state.calls.lock().unwrap().clone()
    }

    fn calls_to(&self, url: &str) -> usize {
        self.calls().iter().filter(|call| *call == url).count()
    }

    fn max_active(&self) -> usize {
        self.state.max_active.load(Ordering::SeqCst)
    }
}

struct ScriptBuilder {
    pages: HashMap<String, Script>,
    delay: Duration,
}

impl ScriptBuilder {
    fn page(mut self, url: &str, links: &[&str]) -> Self {
        let served = format!("https://example.com/{}", url.trim_start_matches('/'));
        self.pages.insert(
            url.to_string(),
            Script::Page {
                served,
                body: html(links),
            },
        );
        self
    }

    fn redirect(mut self, url: &str, served: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            Script::Page {
                served: format!("https://example.com/{}", served),
                body: html(&[]),
            },
        );
        self
    }

    fn raw(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            Script::Page {
                served: format!("https://example.com/{}", url),
                body: body.to_string(),
            },
        );
        self
    }

    fn failing(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Script::Fail);
        self
    }

    fn build(self) -> ScriptedFetcher {
        ScriptedFetcher {
            state: Arc::new(ScriptState {
                pages: self.pages,
                ..Default::default()
            }),
            delay: self.delay,
        }
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, _user_agent: UserAgent) -> Result<FetchedPage, FetchError> {
        self.state.calls.lock().unwrap().push(url.to_string());
        let active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_active.fetch_max(active, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        self.state.active.fetch_sub(1, Ordering::SeqCst);

        match self.state.pages.get(url) {
            Some(Script::Page { served, body }) => {
                let mut headers = BTreeMap::new();
                headers.insert("content-type".to_string(), vec!["text/html".to_string()]);
                Ok(FetchedPage {
                    url_fetched: served.clone(),
                    headers: Some(headers),
                    body: Some(body.clone()),
                    ..Default::default()
                })
            }
            Some(Script::Fail) => Err(FetchError::Status(500)),
            None => Err(FetchError::Status(404)),
        }
    }
}

fn record(crawler: &mut Crawler, kind: EventKind, log: &Log) {
    let log = Arc::clone(log);
    crawler.on(kind, move |event| {
        let entry = match event {
            CrawlEvent::FoundRedirect { requested, actual } => {
                format!("redirect:{}->{}", requested, actual)
            }
            CrawlEvent::LoadFailed { url, .. } => format!("failed:{}", url),
            CrawlEvent::BeforeTests { url } => format!("tests:{}", url),
            CrawlEvent::BeforeTest { name, page } => format!("before:{}:{}", name, page.url),
            CrawlEvent::AfterTest { name, page } => format!("after:{}:{}", name, page.url),
            CrawlEvent::CrawlFinished { url } => format!("finished:{}", url),
            CrawlEvent::AllCrawlsFinished => "all-finished".to_string(),
            other => format!("{:?}", other.kind()),
        };
        log.lock().unwrap().push(entry);
    });
}

#[tokio::test]
async fn test_full_crawl_through_proxy() {
    let server = MockServer::start().await;
    let endpoint = format!("{}/seotest/getPageData", server.uri());

    let page = |served: &str, links: &[&str]| {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url_fetched": served,
            "headers": { "content-type": "text/html" },
            "body": html(links),
            "field_data": { "word_count": 3 },
            "phrases": ["example"],
        }))
    };

    let pages = [
        (
            "/",
            page(
                "https://example.com/",
                &[
                    "/about",
                    "https://example.com/blog/post#comments",
                    "/logo.png",
                    "https://twitter.com/example",
                    "mailto:team@example.com",
                    "/old",
                    "/broken",
                ],
            ),
        ),
        ("about", page("https://example.com/about/", &["/"])),
        ("blog/post", page("https://example.com/blog/post", &["/about"])),
        ("old", page("https://example.com/new", &[])),
        ("new", page("https://example.com/new", &["/about"])),
        ("broken", ResponseTemplate::new(500)),
    ];

    for (url, response) in pages {
        Mock::given(method("GET"))
            .and(path("/seotest/getPageData"))
            .and(query_param("u", url))
            .and(query_param("agent", "mobile"))
            .respond_with(response)
            .expect(1)
            .mount(&server)
            .await;
    }

    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("crawl.db");
    let config = parse_config(&format!(
        r#"
[session]
crawl-id = "proxy-run"
site = "example.com"
user-agent = "mobile"

[crawler]
loop-interval-ms = 10

[proxy]
endpoint = "{}"

[output]
database-path = "{}"
"#,
        endpoint,
        db_path.display()
    ))
    .unwrap();

    let tested_pages = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&tested_pages);
    let (run_id, report) = crawl(config, "test-hash", move |crawler| {
        crawler.add_test(
            "content",
            "Content",
            ["Words", "Proxy words"],
            |page: &PageContext<'_>, out: &mut TestRecorder<'_>| -> anyhow::Result<()> {
                out.record("Words", page.word_count())?;
                if let Some(words) = page.field("word_count") {
                    out.record("Proxy words", words.clone())?;
                }
                anyhow::ensure!(page.url != "new", "no heading on {}", page.url);
                Ok(())
            },
        )?;
        crawler.on(EventKind::BeforeTests, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        Ok(())
    })
    .await
    .unwrap();

    let mut completed = report.completed.clone();
    completed.sort();
    assert_eq!(completed, vec!["/", "about", "blog/post", "new", "old"]);
    assert_eq!(report.failed, vec!["broken"]);
    assert_eq!(report.redirects.get("old").map(String::as_str), Some("new"));
    assert_eq!(report.pages_tested, 4);
    assert_eq!(report.tests_passed, 3);
    assert_eq!(report.tests_failed, 1);
    assert_eq!(tested_pages.load(Ordering::SeqCst), 4);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let run = storage.get_run(run_id).unwrap();
    assert_eq!(run.crawl_id, "proxy-run");
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.pages_tested, 4);
    assert_eq!(run.tests_passed, 3);
    assert_eq!(run.tests_failed, 1);

    let results = storage.get_test_results(run_id, "content").unwrap();
    let proxy_words: Vec<_> = results.iter().filter(|r| r.column == "Proxy words").collect();
    assert_eq!(proxy_words.len(), 4);
    assert!(proxy_words.iter().all(|r| r.value == serde_json::json!(3)));
    let home_words = results
        .iter()
        .find(|r| r.column == "Words" && r.url == "/")
        .map(|r| r.value.clone());
    assert_eq!(home_words, Some(serde_json::json!(7)));
    assert_eq!(storage.count_pages_by_state(run_id, CrawlState::Completed).unwrap(), 5);
    assert_eq!(
        storage.get_pages_by_state(run_id, CrawlState::Failed).unwrap(),
        vec!["broken"]
    );
    assert_eq!(
        storage.get_redirects(run_id).unwrap(),
        vec![("old".to_string(), "new".to_string())]
    );

    let mut about_sources = storage.get_link_sources(run_id, "about").unwrap();
    about_sources.sort();
    assert_eq!(about_sources, vec!["/", "blog/post", "new"]);

    // Every link is recorded, including those never crawled
    assert_eq!(storage.get_link_sources(run_id, "logo.png").unwrap(), vec!["/"]);
}

#[tokio::test]
async fn test_concurrency_cap() {
    let children: Vec<String> = (1..=10).map(|i| format!("/p{}", i)).collect();
    let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();

    let mut builder = ScriptedFetcher::builder(Duration::from_millis(40)).page("/", &child_refs);
    for child in &children {
        builder = builder.page(child.trim_start_matches('/'), &[]);
    }
    let fetcher = builder.build();

    let mut crawler = Crawler::new(create_test_config(&["/"], 3, ""), fetcher.clone()).unwrap();

    let max_seen = Arc::new(AtomicUsize::new(0));
    let observed = Arc::clone(&max_seen);
    crawler.on(EventKind::CrawlerLoop, move |event| {
        if let CrawlEvent::CrawlerLoop(snapshot) = event {
            observed.fetch_max(snapshot.in_flight, Ordering::SeqCst);
        }
    });

    let report = crawler.run().await.unwrap();

    assert_eq!(report.completed.len(), 11);
    assert!(fetcher.max_active() <= 3, "max active was {}", fetcher.max_active());
    assert!(max_seen.load(Ordering::SeqCst) <= 3);
    assert_eq!(fetcher.calls().len(), 11);
}

#[tokio::test]
async fn test_every_url_fetched_once() {
    let fetcher = ScriptedFetcher::builder(Duration::from_millis(5))
        .page("/", &["/a", "/b", "/a/", "https://example.com/b#top"])
        .page("a", &["/", "/b", "/c"])
        .page("b", &["/a", "/c?"])
        .page("c", &["/a", "/b"])
        .build();

    let crawler = Crawler::new(create_test_config(&["/"], 3, ""), fetcher.clone()).unwrap();
    let report = crawler.run().await.unwrap();

    let mut calls = fetcher.calls();
    calls.sort();
    assert_eq!(calls, vec!["/", "a", "b", "c"]);
    assert_eq!(report.completed.len(), 4);
}

#[tokio::test]
async fn test_redirect_is_followed_not_retried() {
    let fetcher = ScriptedFetcher::builder(Duration::from_millis(5))
        .page("/", &["/old"])
        .redirect("old", "new")
        .page("new", &[])
        .build();

    let mut crawler = Crawler::new(create_test_config(&["/"], 3, ""), fetcher.clone()).unwrap();
    let log: Log = Arc::default();
    record(&mut crawler, EventKind::FoundRedirect, &log);

    let report = crawler.run().await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["redirect:old->new"]);
    assert_eq!(report.redirects.get("old").map(String::as_str), Some("new"));
    assert_eq!(fetcher.calls_to("old"), 1);
    assert_eq!(fetcher.calls_to("new"), 1);
    assert!(report.completed.contains(&"old".to_string()));
    assert!(report.completed.contains(&"new".to_string()));
}

#[tokio::test]
async fn test_all_crawls_finished_fires_once() {
    let fetcher = ScriptedFetcher::builder(Duration::from_millis(5))
        .page("/", &["/a", "/b"])
        .page("a", &[])
        .page("b", &[])
        .build();

    let mut crawler = Crawler::new(create_test_config(&["/"], 2, ""), fetcher.clone()).unwrap();
    let log: Log = Arc::default();
    record(&mut crawler, EventKind::CrawlFinished, &log);
    record(&mut crawler, EventKind::AllCrawlsFinished, &log);

    crawler.run().await.unwrap();
    let calls_at_finish = fetcher.calls().len();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let log = log.lock().unwrap();
    assert_eq!(log.iter().filter(|e| *e == "all-finished").count(), 1);
    assert_eq!(log.last().map(String::as_str), Some("all-finished"));
    assert_eq!(log.iter().filter(|e| e.starts_with("finished:")).count(), 3);
    assert_eq!(fetcher.calls().len(), calls_at_finish);
}

#[tokio::test]
async fn test_link_graph_sources_in_discovery_order() {
    // Start paths are stacked, so "a" is crawled first; a cap of one keeps the order fixed
    let fetcher = ScriptedFetcher::builder(Duration::from_millis(5))
        .page("b", &["/c"])
        .page("a", &["/c", "/c"])
        .page("c", &[])
        .build();

    let crawler = Crawler::new(create_test_config(&["/b", "/a"], 1, ""), fetcher.clone()).unwrap();
    let report = crawler.run().await.unwrap();

    assert_eq!(fetcher.calls(), vec!["a", "c", "b"]);
    assert_eq!(report.links.sources_of("c"), &["a", "b"]);
}

#[tokio::test]
async fn test_page_tests_run_in_order() {
    let fetcher = ScriptedFetcher::builder(Duration::from_millis(5)).page("/", &[]).build();
    let mut crawler = Crawler::new(create_test_config(&["/"], 3, ""), fetcher).unwrap();

    let log: Log = Arc::default();
    for name in ["T1", "T2"] {
        let calls = Arc::clone(&log);
        crawler
            .add_test(
                name,
                name,
                ["Result"],
                move |page: &PageContext<'_>, _out: &mut TestRecorder<'_>| -> anyhow::Result<()> {
                    calls.lock().unwrap().push(format!("{}:{}", name, page.url));
                    Ok(())
                },
            )
            .unwrap();
        record(&mut crawler, EventKind::BeforeTest(name.to_string()), &log);
        record(&mut crawler, EventKind::AfterTest(name.to_string()), &log);
    }

    let report = crawler.run().await.unwrap();

    assert_eq!(report.tests_passed, 2);
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "before:T1:/",
            "T1:/",
            "after:T1:/",
            "before:T2:/",
            "T2:/",
            "after:T2:/",
        ]
    );
}

#[tokio::test]
async fn test_failed_test_is_reported_and_crawl_continues() {
    let fetcher = ScriptedFetcher::builder(Duration::from_millis(5))
        .page("/", &["/next"])
        .page("next", &[])
        .build();
    let mut crawler = Crawler::new(create_test_config(&["/"], 3, ""), fetcher).unwrap();

    crawler
        .add_test(
            "strict",
            "Always fails",
            ["Reason"],
            |_page: &PageContext<'_>, _out: &mut TestRecorder<'_>| -> anyhow::Result<()> {
                anyhow::bail!("rejected")
            },
        )
        .unwrap();

    let failures: Log = Arc::default();
    let sink = Arc::clone(&failures);
    crawler.on(EventKind::TestFailed, move |event| {
        if let CrawlEvent::TestFailed { url, error, .. } = event {
            sink.lock().unwrap().push(format!("{}:{}", url, error));
        }
    });

    let report = crawler.run().await.unwrap();

    let mut failures = failures.lock().unwrap().clone();
    failures.sort();
    assert_eq!(failures, vec!["/:rejected", "next:rejected"]);
    assert_eq!(report.tests_failed, 2);
    assert_eq!(report.completed.len(), 2);
}

#[tokio::test]
async fn test_failure_emits_load_failed_without_retry() {
    let fetcher = ScriptedFetcher::builder(Duration::from_millis(5))
        .page("/", &["/broken"])
        .failing("broken")
        .build();

    let mut crawler = Crawler::new(create_test_config(&["/"], 3, ""), fetcher.clone()).unwrap();
    let log: Log = Arc::default();
    record(&mut crawler, EventKind::LoadFailed, &log);

    let report = crawler.run().await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["failed:broken"]);
    assert_eq!(report.failed, vec!["broken"]);
    assert_eq!(fetcher.calls_to("broken"), 1);
}

#[tokio::test]
async fn test_non_html_completes_without_tests_or_links() {
    let fetcher = ScriptedFetcher::builder(Duration::from_millis(5))
        .page("/", &["/feed"])
        .raw("feed", r#"{"items": ["<a href='/hidden'>"]}"#)
        .build();

    let mut crawler = Crawler::new(create_test_config(&["/"], 3, ""), fetcher.clone()).unwrap();
    let log: Log = Arc::default();
    record(&mut crawler, EventKind::BeforeTests, &log);

    let report = crawler.run().await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["tests:/"]);
    assert!(report.completed.contains(&"feed".to_string()));
    assert_eq!(report.pages_tested, 1);
    assert_eq!(fetcher.calls_to("hidden"), 0);
}

#[tokio::test]
async fn test_ignore_patterns_are_respected() {
    let fetcher = ScriptedFetcher::builder(Duration::from_millis(5))
        .page("/", &["/private/area", "/PRIVATE/other", "/public"])
        .page("public", &[])
        .build();

    let config = create_test_config(&["/"], 3, r#"ignore-paths = ["^private"]"#);
    let crawler = Crawler::new(config, fetcher.clone()).unwrap();
    crawler.run().await.unwrap();

    let mut calls = fetcher.calls();
    calls.sort();
    assert_eq!(calls, vec!["/", "public"]);
}
