//! Panel-level tests against a mock controller: catalogue ingestion
//! with defaults, auxiliary controller operations, and the lock latch.

use std::time::Duration;

use pretty_assertions::assert_eq;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use novaground_core::{
    ActuatorKind, ArmingState, OpenState, Panel, PanelConfig, PowerState, ReconnectPolicy,
};

async fn panel_against(server: &MockServer) -> Panel {
    let base = Url::parse(&server.uri()).expect("mock server uri");
    Panel::new(PanelConfig::new(base)).expect("panel")
}

#[tokio::test]
async fn catalogue_refresh_applies_defaults_and_skips_unknown_kinds() {
    let server = MockServer::start().await;
    // A sparse catalogue: no states anywhere, one record of a kind this
    // client does not know.
    Mock::given(method("GET"))
        .and(path("/get_actuators"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "name": "mv1", "type": "servo" },
            { "name": "ign1", "type": "poweredGpioDevice" },
            { "name": "sel1", "type": "servo3" },
            { "name": "mystery", "type": "hydraulicRam" },
        ])))
        .mount(&server)
        .await;

    let panel = panel_against(&server).await;
    panel.refresh_actuators().await.expect("refresh");

    let snapshot = panel.store().actuators_snapshot();
    let names: Vec<&str> = snapshot.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["mv1", "ign1", "sel1"], "unknown kind is skipped");

    assert_eq!(
        snapshot[0].kind,
        ActuatorKind::Servo {
            open: OpenState::Closed,
            power: PowerState::Off,
        }
    );
    assert_eq!(
        snapshot[1].kind,
        ActuatorKind::PoweredGpioDevice {
            arming: ArmingState::Disarmed,
            power: PowerState::Off,
        }
    );
    // servo3 defaults: positions 1/2/3, parked on the middle one.
    assert_eq!(
        snapshot[2].kind,
        ActuatorKind::Servo3 {
            valve: "2".into(),
            positions: vec!["1".into(), "2".into(), "3".into()],
            power: PowerState::Off,
        }
    );
}

#[tokio::test]
async fn auxiliary_operations_hit_their_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/start_saving_data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"saving": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stop_saving_data"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"saving": false})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/update_config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/toggle_calibration"))
        .and(body_json(serde_json::json!({"calibration": true})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"calibration": true})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let panel = panel_against(&server).await;
    let on = panel.set_data_logging(true).await.expect("start logging");
    assert_eq!(on["saving"], true);
    let off = panel.set_data_logging(false).await.expect("stop logging");
    assert_eq!(off["saving"], false);
    panel.refresh_config().await.expect("config reload");
    let cal = panel.set_calibration(true).await.expect("calibration on");
    assert_eq!(cal["calibration"], true);
}

#[tokio::test]
async fn lock_latch_round_trips() {
    let server = MockServer::start().await;
    let panel = panel_against(&server).await;

    assert!(!panel.is_locked());
    panel.lock();
    assert!(panel.is_locked());
    assert!(!panel.toggle_lock());
    assert!(panel.toggle_lock());
    panel.unlock();
    assert!(!panel.is_locked());
}

#[tokio::test]
async fn disconnect_returns_promptly_after_connect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_actuators"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).expect("mock server uri");
    let config = PanelConfig::new(base).with_reconnect(ReconnectPolicy {
        interval: Duration::from_millis(10),
        max_attempts: 2,
    });
    let panel = Panel::new(config).expect("panel");
    panel.connect().await.expect("connect");

    // Teardown must cancel and join the pump task, not wait on it.
    tokio::time::timeout(Duration::from_secs(5), panel.disconnect())
        .await
        .expect("disconnect completes");

    // The session is fully torn down; observation handles are gone too.
    assert!(panel.link_state().await.is_err());
}

#[tokio::test]
async fn observation_handles_require_a_connection() {
    let server = MockServer::start().await;
    let panel = panel_against(&server).await;

    assert!(panel.link_state().await.is_err());
    assert!(panel.telemetry_events().await.is_err());
}
