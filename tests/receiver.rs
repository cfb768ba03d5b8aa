use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use musicalert::api::{router, AppState};
use musicalert::config::Config;
use musicalert::error::PlaybackError;
use musicalert::matcher::{FixedClock, Matcher};
use musicalert::playback::PlaybackSerializer;
use musicalert::player::AudioPlayer;
use musicalert::quiet_hours::QuietHours;
use musicalert::rules::RuleTable;

#[derive(Default)]
struct FakePlayer {
    played: Mutex<Vec<PathBuf>>,
}

impl FakePlayer {
    fn played(&self) -> Vec<PathBuf> {
        self.played.lock().unwrap().clone()
    }
}

impl AudioPlayer for FakePlayer {
    fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        self.played.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    player: Arc<FakePlayer>,
    state: AppState,
}

fn fixture(hour: u32, extra_yaml: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("foo.mp3"), b"ID3").unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        format!("sounds:\n  foo.mp3: \"Rule foo\"\n{extra_yaml}"),
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();
    let rules = RuleTable::load(&config).unwrap();
    let quiet_hours = QuietHours::from_config(&config.quiet_hours).unwrap();
    let player = Arc::new(FakePlayer::default());

    let state = AppState {
        matcher: Arc::new(Matcher::new(rules, quiet_hours)),
        playback: PlaybackSerializer::new(player.clone()),
        clock: Arc::new(FixedClock(hour)),
        required_user_agent: config.server.required_user_agent.clone(),
    };

    Fixture {
        _dir: dir,
        player,
        state,
    }
}

fn alert_payload(rule: &str, status: &str, value: &str) -> String {
    serde_json::json!({
        "receiver": "musicalert",
        "status": status,
        "alerts": [{
            "status": status,
            "labels": { "alertname": rule },
            "valueString": value,
        }],
    })
    .to_string()
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Playback runs in the background; wait for the fake player to be called.
async fn wait_for_plays(player: &FakePlayer, count: usize) -> Vec<PathBuf> {
    for _ in 0..100 {
        let played = player.played();
        if played.len() >= count {
            return played;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    player.played()
}

#[tokio::test]
async fn firing_alert_inside_window_plays() {
    let fx = fixture(14, "");
    let resp = router(fx.state.clone())
        .oneshot(post("/alert", alert_payload("Rule foo", "firing", "")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "accepted");
    assert_eq!(json["queued"], 1);

    let played = wait_for_plays(&fx.player, 1).await;
    assert_eq!(played.len(), 1);
    assert!(played[0].ends_with("foo.mp3"));
}

#[tokio::test]
async fn firing_alert_outside_window_is_accepted_silently() {
    let fx = fixture(2, "");
    let resp = router(fx.state.clone())
        .oneshot(post("/alert", alert_payload("Rule foo", "firing", "")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["queued"], 0);
    assert!(!fx.state.playback.is_playing());
    assert!(fx.player.played().is_empty());
}

#[tokio::test]
async fn resolved_alert_does_not_play() {
    let fx = fixture(14, "");
    let resp = router(fx.state.clone())
        .oneshot(post("/alert", alert_payload("Rule foo", "resolved", "")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["queued"], 0);
    assert!(fx.player.played().is_empty());
}

#[tokio::test]
async fn unknown_rule_is_accepted() {
    let fx = fixture(14, "");
    let resp = router(fx.state.clone())
        .oneshot(post("/", alert_payload("Rule bar", "firing", "")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(fx.player.played().is_empty());
}

#[tokio::test]
async fn malformed_payload_is_bad_request() {
    let fx = fixture(14, "");
    let resp = router(fx.state.clone())
        .oneshot(post("/alert", "{\"status\": \"firing\", \"alerts\": [{]"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["status"], "error");
    assert!(fx.player.played().is_empty());
}

#[tokio::test]
async fn empty_body_is_bad_request() {
    let fx = fixture(14, "");
    let resp = router(fx.state.clone())
        .oneshot(post("/alert", Body::empty()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repeated_payloads_are_each_accepted() {
    let fx = fixture(14, "");
    let app = router(fx.state.clone());

    let first = app
        .clone()
        .oneshot(post("/alert", alert_payload("Rule foo", "firing", "")))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    wait_for_plays(&fx.player, 1).await;

    for _ in 0..3 {
        let resp = app
            .clone()
            .oneshot(post("/alert", alert_payload("Rule foo", "resolved", "")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
    assert_eq!(fx.player.played().len(), 1);
}

#[tokio::test]
async fn required_user_agent_is_enforced() {
    let fx = fixture(14, "server:\n  required_user_agent: Grafana\n");
    let app = router(fx.state.clone());

    let rejected = app
        .clone()
        .oneshot(post("/alert", alert_payload("Rule foo", "firing", "")))
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    assert!(fx.player.played().is_empty());

    let mut request = post("/alert", alert_payload("Rule foo", "firing", ""));
    request
        .headers_mut()
        .insert("user-agent", "Grafana".parse().unwrap());
    let accepted = app.oneshot(request).await.unwrap();
    assert_eq!(accepted.status(), StatusCode::OK);
    assert_eq!(wait_for_plays(&fx.player, 1).await.len(), 1);
}

#[tokio::test]
async fn configured_window_is_used() {
    let fx = fixture(2, "quiet_hours:\n  start_hr: 0\n  end_hr: 6\n");
    let resp = router(fx.state.clone())
        .oneshot(post("/alert", alert_payload("Rule foo", "firing", "")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(wait_for_plays(&fx.player, 1).await.len(), 1);
}

#[tokio::test]
async fn healthz_returns_ok() {
    let fx = fixture(14, "");
    let resp = router(fx.state.clone())
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "ok");
}

#[tokio::test]
async fn status_reports_rules_and_window() {
    let fx = fixture(2, "");
    let resp = router(fx.state.clone())
        .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["playing"], false);
    assert_eq!(json["rules"], 1);
    assert_eq!(json["quiet_hours"]["start_hr"], 8);
    assert_eq!(json["quiet_hours"]["end_hr"], 23);
    assert_eq!(json["quiet_hours"]["allowed_now"], false);
}
