mod common;

use common::{relayed_target, serve, serve_silent};
use proxy_radar::{
    Config, EndpointDescriptor, Feed, FeedKind, FetcherConfig, Pipeline, PipelineError,
    ProbeConfig, ProbeEngine, Prober, Progress, RelayProber, RenderSink, ResultAggregator,
    RunContext, Scheme,
};
use std::sync::Arc;
use std::time::Duration;

fn descriptor(host: &str, port: u16) -> EndpointDescriptor {
    EndpointDescriptor::new(
        format!("vless://id@{}:{}", host, port),
        Scheme::Vless,
        Some(host.to_string()),
        Some(port),
    )
}

#[derive(Default)]
struct RecordingSink {
    statuses: Vec<String>,
    renders: Vec<usize>,
}

impl RenderSink for RecordingSink {
    fn status(&mut self, _run_id: u64, message: &str) {
        self.statuses.push(message.to_string());
    }

    fn render(&mut self, _run_id: u64, _aggregator: &ResultAggregator, progress: Progress) {
        self.renders.push(progress.completed);
    }
}

#[tokio::test]
async fn relay_prober_wraps_target_and_ignores_status() {
    let server = serve(|_| (502, "bad gateway".to_string())).await;
    let prober = RelayProber::new(&server.url("/get?url="), false).unwrap();

    prober.probe("10.1.2.3", 8443).await.unwrap();

    let hits = server.hits();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].starts_with("/get?url="));
    assert_eq!(relayed_target(&hits[0]).unwrap(), "http://10.1.2.3:8443");
}

#[tokio::test]
async fn unreachable_relay_is_a_network_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let prober = RelayProber::new(&format!("http://{}/get?url=", addr), false).unwrap();

    assert!(prober.probe("10.1.2.3", 443).await.is_err());
}

#[tokio::test]
async fn engine_measures_through_the_relay() {
    let server = serve(|_| (200, "{}".to_string())).await;
    let prober = RelayProber::new(&server.url("/get?url="), false).unwrap();
    let engine = ProbeEngine::new(
        ProbeConfig::new().with_timeout(Duration::from_secs(5)),
        Arc::new(prober),
    );

    let result = engine.probe_one(&descriptor("10.1.2.3", 443)).await;

    assert!(result.is_reached());
    assert!(result.elapsed_ms.unwrap() < 5_000);
}

#[tokio::test]
async fn silent_relay_times_out_as_no_signal() {
    let addr = serve_silent().await;
    let prober = RelayProber::new(&format!("http://{}/get?url=", addr), false).unwrap();
    let engine = ProbeEngine::new(
        ProbeConfig::new().with_timeout(Duration::from_millis(200)),
        Arc::new(prober),
    );

    let result = engine.probe_one(&descriptor("10.1.2.3", 443)).await;

    assert_eq!(result.elapsed_ms, None);
}

#[tokio::test]
async fn pipeline_runs_a_local_feed_end_to_end() {
    let list = "\
https://t.me/proxy?server=10.0.0.1&port=443&secret=ee00
vless://uuid@10.0.0.2:8443?security=tls#node
trojan://pw@10.0.0.3:443
not a proxy line
ss://
";
    let server = serve(move |path| {
        if path.starts_with("/list.txt") {
            (200, list.to_string())
        } else if path.starts_with("/get") {
            (200, "{}".to_string())
        } else {
            (404, String::new())
        }
    })
    .await;

    let config = Config::new()
        .with_fetcher(FetcherConfig::new().with_system_proxy(false))
        .with_relays(Some(server.url("/raw?url=")), Some(server.url("/get?url=")))
        .with_probe(ProbeConfig::new().with_timeout(Duration::from_secs(5)));
    let pipeline = Pipeline::from_config(&config).unwrap();
    let feed = Feed::custom(&server.url("/list.txt"), FeedKind::V2ray);

    let runs = RunContext::new();
    let token = runs.begin();
    let mut sink = RecordingSink::default();
    let outcome = pipeline.run(&feed, &token, &mut sink).await.unwrap();

    assert!(!outcome.cancelled);
    // The bare "ss://" line is recognized but has nothing to probe.
    assert_eq!(outcome.total, 4);
    assert_eq!(outcome.completed, 4);
    let summary = outcome.aggregator.summary();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.good + summary.mid + summary.bad, 3);

    let results = outcome.aggregator.results();
    let mut hosts: Vec<_> = results
        .iter()
        .filter_map(|r| r.descriptor.host.as_deref())
        .collect();
    hosts.sort_unstable();
    assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
    assert!(results
        .iter()
        .all(|r| r.tier(outcome.aggregator.thresholds()).is_some()));

    assert_eq!(sink.statuses.first().unwrap(), &format!("Fetching v2ray list from {}...", feed.name));
    assert!(sink.statuses.contains(&"Checking 4 endpoints...".to_string()));
    assert_eq!(sink.statuses.last().unwrap(), "3 working endpoints found");
    assert_eq!(sink.renders.last(), Some(&4));
}

#[tokio::test]
async fn pipeline_reports_fetch_failure() {
    let server = serve(|_| (500, String::new())).await;

    let config = Config::new()
        .with_fetcher(FetcherConfig::new().with_system_proxy(false))
        .with_relays(Some(server.url("/raw?url=")), Some(server.url("/get?url=")));
    let pipeline = Pipeline::from_config(&config).unwrap();
    let feed = Feed::custom(&server.url("/list.txt"), FeedKind::Telegram);

    let runs = RunContext::new();
    let token = runs.begin();
    let mut sink = RecordingSink::default();
    let err = pipeline.run(&feed, &token, &mut sink).await.unwrap_err();

    match err {
        PipelineError::Fetch(failure) => assert_eq!(failure.attempts.len(), 2),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(sink.statuses.last().unwrap(), "Failed to fetch the telegram list.");
    assert!(sink.renders.is_empty());
}
