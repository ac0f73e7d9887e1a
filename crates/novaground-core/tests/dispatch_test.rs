//! End-to-end dispatch tests against a mock controller: local
//! precondition rejections must never reach the wire, and the shadow
//! must only move on confirmed success.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use novaground_api::DeviceClient;
use novaground_core::{
    Actuator, ActuatorKind, CoreError, Dispatcher, Intent, IntentAction, LockGate, OpenState,
    PowerState, ShadowStore, StateChange,
};

struct Harness {
    server: MockServer,
    store: Arc<ShadowStore>,
    lock: Arc<LockGate>,
    dispatcher: Arc<Dispatcher>,
}

async fn harness(actuators: Vec<Actuator>) -> Harness {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).expect("mock server uri");
    let client = Arc::new(DeviceClient::with_client(reqwest::Client::new(), base));
    let store = Arc::new(ShadowStore::new());
    store.replace_actuators(actuators);
    let lock = Arc::new(LockGate::new());
    let dispatcher = Arc::new(Dispatcher::new(client, store.clone(), lock.clone()));
    Harness {
        server,
        store,
        lock,
        dispatcher,
    }
}

fn solenoid(name: &str, open: OpenState) -> Actuator {
    Actuator {
        name: name.into(),
        kind: ActuatorKind::Solenoid { open },
    }
}

#[tokio::test]
async fn unpowered_servo_never_reaches_the_wire() {
    let h = harness(vec![Actuator {
        name: "mv1".into(),
        kind: ActuatorKind::Servo {
            open: OpenState::Closed,
            power: PowerState::Off,
        },
    }])
    .await;

    Mock::given(method("POST"))
        .and(path("/send_command"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let err = h
        .dispatcher
        .dispatch(Intent::new("mv1", IntentAction::ToggleOpen))
        .await
        .expect_err("power gate");
    assert!(matches!(err, CoreError::PowerRequired { .. }));
    assert!(err.is_local_rejection());
}

#[tokio::test]
async fn engaged_lock_blocks_every_command() {
    let h = harness(vec![Actuator {
        name: "pump1".into(),
        kind: ActuatorKind::PoweredDevice {
            power: PowerState::Off,
        },
    }])
    .await;
    h.lock.engage();

    Mock::given(method("POST"))
        .and(path("/send_command"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let err = h
        .dispatcher
        .dispatch(Intent::new("pump1", IntentAction::TogglePower))
        .await
        .expect_err("locked");
    assert!(matches!(err, CoreError::Locked));

    // Releasing the lock lets the same intent through.
    h.lock.release();
    h.server.reset().await;
    Mock::given(method("POST"))
        .and(path("/send_command"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.server)
        .await;

    let change = h
        .dispatcher
        .dispatch(Intent::new("pump1", IntentAction::TogglePower))
        .await
        .expect("unlocked dispatch");
    assert_eq!(change, StateChange::Power(PowerState::On));
}

#[tokio::test]
async fn valve_selection_sends_the_position_and_updates_the_shadow() {
    let h = harness(vec![Actuator {
        name: "valve1".into(),
        kind: ActuatorKind::Servo3 {
            valve: "1".into(),
            positions: vec!["1".into(), "2".into(), "3".into()],
            power: PowerState::On,
        },
    }])
    .await;

    Mock::given(method("POST"))
        .and(path("/send_command"))
        .and(body_json(serde_json::json!({
            "type": "servo3",
            "name": "valve1",
            "state": "2",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.server)
        .await;

    let change = h
        .dispatcher
        .dispatch(Intent::new("valve1", IntentAction::SelectValve("2".into())))
        .await
        .expect("valve move");
    assert_eq!(change, StateChange::Valve("2".into()));

    let updated = h.store.actuator("valve1").expect("valve1");
    assert_eq!(
        updated.kind,
        ActuatorKind::Servo3 {
            valve: "2".into(),
            positions: vec!["1".into(), "2".into(), "3".into()],
            power: PowerState::On,
        },
        "only the selected position changed"
    );
}

#[tokio::test]
async fn rejected_command_leaves_the_shadow_untouched() {
    let h = harness(vec![solenoid("vent1", OpenState::Closed)]).await;
    let before = h.store.actuators_snapshot();

    Mock::given(method("POST"))
        .and(path("/send_command"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h
        .dispatcher
        .dispatch(Intent::new("vent1", IntentAction::ToggleOpen))
        .await
        .expect_err("controller rejected");
    assert!(matches!(err, CoreError::CommandFailed { .. }));
    assert_eq!(*h.store.actuators_snapshot(), *before);

    // The in-flight slot was released; a retry goes through.
    h.server.reset().await;
    Mock::given(method("POST"))
        .and(path("/send_command"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.server)
        .await;
    h.dispatcher
        .dispatch(Intent::new("vent1", IntentAction::ToggleOpen))
        .await
        .expect("retry after failure");
    assert_eq!(
        h.store.actuator("vent1").expect("vent1").kind,
        ActuatorKind::Solenoid {
            open: OpenState::Open
        }
    );
}

#[tokio::test]
async fn concurrent_commands_for_one_actuator_are_rejected() {
    let h = harness(vec![solenoid("vent1", OpenState::Closed)]).await;

    Mock::given(method("POST"))
        .and(path("/send_command"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(250)))
        .expect(1)
        .mount(&h.server)
        .await;

    let slow = {
        let dispatcher = h.dispatcher.clone();
        tokio::spawn(async move {
            dispatcher
                .dispatch(Intent::new("vent1", IntentAction::ToggleOpen))
                .await
        })
    };
    // Let the first dispatch claim its slot before the second arrives.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = h
        .dispatcher
        .dispatch(Intent::new("vent1", IntentAction::ToggleOpen))
        .await
        .expect_err("second command while first is in flight");
    assert!(matches!(err, CoreError::Busy { .. }));

    slow.await.expect("join").expect("first command succeeds");
    assert_eq!(
        h.store.actuator("vent1").expect("vent1").kind,
        ActuatorKind::Solenoid {
            open: OpenState::Open
        }
    );
}

#[tokio::test]
async fn unsupported_action_is_rejected_locally() {
    let h = harness(vec![solenoid("vent1", OpenState::Closed)]).await;

    Mock::given(method("POST"))
        .and(path("/send_command"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let err = h
        .dispatcher
        .dispatch(Intent::new("vent1", IntentAction::ToggleArming))
        .await
        .expect_err("solenoids have no arming");
    assert!(matches!(err, CoreError::UnsupportedAction { .. }));
}

#[tokio::test]
async fn unknown_actuator_is_rejected_locally() {
    let h = harness(Vec::new()).await;
    let err = h
        .dispatcher
        .dispatch(Intent::new("ghost", IntentAction::ToggleOpen))
        .await
        .expect_err("no such actuator");
    assert!(matches!(err, CoreError::ActuatorNotFound { .. }));
}
