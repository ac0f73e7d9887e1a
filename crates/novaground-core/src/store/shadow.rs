// ── Central shadow store ──
//
// Thread-safe storage for the client's last-known device state.
// Sensor and GPIO snapshots are wholesale-replaced per telemetry frame;
// the actuator catalogue is replaced on full refresh and point-mutated
// on confirmed commands only. Every mutation is broadcast to
// subscribers via `watch` channels.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;

use crate::error::CoreError;
use crate::model::{Actuator, StateChange};
use novaground_api::{GpioReading, SensorReading};

/// Single source of truth for rendering.
///
/// Actuators are kept twice: a `DashMap` keyed by name for O(1) command
/// lookups, and an ordered snapshot (catalogue order) behind a `watch`
/// channel for display. Both are updated together.
pub struct ShadowStore {
    actuators_by_name: DashMap<String, Actuator>,
    actuators: watch::Sender<Arc<Vec<Actuator>>>,
    sensors: watch::Sender<Arc<Vec<SensorReading>>>,
    gpios: watch::Sender<Arc<Vec<GpioReading>>>,
    /// Advisory `receive_time - producer_time` metric, seconds.
    link_delay: watch::Sender<Option<f64>>,
    last_frame: watch::Sender<Option<DateTime<Utc>>>,
}

impl ShadowStore {
    pub fn new() -> Self {
        let (actuators, _) = watch::channel(Arc::new(Vec::new()));
        let (sensors, _) = watch::channel(Arc::new(Vec::new()));
        let (gpios, _) = watch::channel(Arc::new(Vec::new()));
        let (link_delay, _) = watch::channel(None);
        let (last_frame, _) = watch::channel(None);

        Self {
            actuators_by_name: DashMap::new(),
            actuators,
            sensors,
            gpios,
            link_delay,
            last_frame,
        }
    }

    // ── Telemetry path (wholesale replacement) ───────────────────────

    /// Replace the sensor table with a fresh frame snapshot.
    /// No merging, no diffing -- frames are full replacements.
    pub fn replace_sensors(&self, readings: Vec<SensorReading>) {
        self.sensors.send_modify(|snap| *snap = Arc::new(readings));
        let _ = self.last_frame.send(Some(Utc::now()));
    }

    /// Replace the GPIO table with a fresh frame snapshot.
    pub fn replace_gpios(&self, readings: Vec<GpioReading>) {
        self.gpios.send_modify(|snap| *snap = Arc::new(readings));
        let _ = self.last_frame.send(Some(Utc::now()));
    }

    /// Record the advisory telemetry delay metric.
    pub fn set_link_delay(&self, delay_secs: Option<f64>) {
        let _ = self.link_delay.send(delay_secs);
    }

    // ── Actuator path ────────────────────────────────────────────────

    /// Replace the actuator catalogue wholesale (full refresh path).
    /// Defaults were already applied at ingestion.
    pub fn replace_actuators(&self, actuators: Vec<Actuator>) {
        self.actuators_by_name.clear();
        for actuator in &actuators {
            self.actuators_by_name
                .insert(actuator.name.clone(), actuator.clone());
        }
        self.actuators
            .send_modify(|snap| *snap = Arc::new(actuators));
    }

    /// Fold a confirmed command into exactly one field of one actuator.
    ///
    /// Only ever called after the controller answered success -- the
    /// shadow is never mutated speculatively, so a failed command
    /// leaves the store (and whatever renders it) at the prior value.
    /// Returns the updated actuator for the caller to repaint.
    pub fn apply_confirmed(
        &self,
        name: &str,
        change: &StateChange,
    ) -> Result<Actuator, CoreError> {
        let mut entry = self
            .actuators_by_name
            .get_mut(name)
            .ok_or_else(|| CoreError::ActuatorNotFound { name: name.to_owned() })?;
        entry.apply(change)?;
        let updated = entry.clone();
        drop(entry);

        self.actuators.send_modify(|snap| {
            let mut list: Vec<Actuator> = snap.as_ref().clone();
            if let Some(slot) = list.iter_mut().find(|a| a.name == name) {
                *slot = updated.clone();
            }
            *snap = Arc::new(list);
        });

        Ok(updated)
    }

    /// Look up one actuator by name.
    pub fn actuator(&self, name: &str) -> Option<Actuator> {
        self.actuators_by_name.get(name).map(|r| r.value().clone())
    }

    pub fn actuator_count(&self) -> usize {
        self.actuators_by_name.len()
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn actuators_snapshot(&self) -> Arc<Vec<Actuator>> {
        self.actuators.borrow().clone()
    }

    pub fn sensors_snapshot(&self) -> Arc<Vec<SensorReading>> {
        self.sensors.borrow().clone()
    }

    pub fn gpios_snapshot(&self) -> Arc<Vec<GpioReading>> {
        self.gpios.borrow().clone()
    }

    pub fn link_delay(&self) -> Option<f64> {
        *self.link_delay.borrow()
    }

    /// When the last telemetry frame was applied, if ever.
    pub fn last_frame(&self) -> Option<DateTime<Utc>> {
        *self.last_frame.borrow()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_actuators(&self) -> watch::Receiver<Arc<Vec<Actuator>>> {
        self.actuators.subscribe()
    }

    pub fn subscribe_sensors(&self) -> watch::Receiver<Arc<Vec<SensorReading>>> {
        self.sensors.subscribe()
    }

    pub fn subscribe_gpios(&self) -> watch::Receiver<Arc<Vec<GpioReading>>> {
        self.gpios.subscribe()
    }

    pub fn subscribe_link_delay(&self) -> watch::Receiver<Option<f64>> {
        self.link_delay.subscribe()
    }
}

impl Default for ShadowStore {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActuatorKind, OpenState, PowerState};
    use novaground_api::SensorValue;

    fn servo(name: &str, open: OpenState, power: PowerState) -> Actuator {
        Actuator {
            name: name.into(),
            kind: ActuatorKind::Servo { open, power },
        }
    }

    #[test]
    fn sensors_are_wholesale_replaced() {
        let store = ShadowStore::new();
        store.replace_sensors(vec![
            SensorReading {
                name: "pt1".into(),
                value: SensorValue::Number(101.3),
                avg: None,
                rate: None,
                timestamp: None,
            },
            SensorReading {
                name: "pt2".into(),
                value: SensorValue::Number(14.7),
                avg: None,
                rate: None,
                timestamp: None,
            },
        ]);
        assert_eq!(store.sensors_snapshot().len(), 2);

        // A later, smaller frame replaces everything -- no merge.
        store.replace_sensors(vec![SensorReading {
            name: "pt3".into(),
            value: SensorValue::Number(0.0),
            avg: None,
            rate: None,
            timestamp: None,
        }]);
        let snap = store.sensors_snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].name, "pt3");
        assert!(store.last_frame().is_some());
    }

    #[test]
    fn catalogue_replacement_preserves_order() {
        let store = ShadowStore::new();
        store.replace_actuators(vec![
            servo("mv2", OpenState::Closed, PowerState::Off),
            servo("mv1", OpenState::Closed, PowerState::Off),
        ]);

        let snapshot = store.actuators_snapshot();
        let names: Vec<&str> = snapshot
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, ["mv2", "mv1"], "snapshot keeps catalogue order");
        assert!(store.actuator("mv1").is_some());
        assert_eq!(store.actuator_count(), 2);
    }

    #[test]
    fn apply_confirmed_touches_one_field_of_one_actuator() {
        let store = ShadowStore::new();
        store.replace_actuators(vec![
            servo("mv1", OpenState::Closed, PowerState::On),
            servo("mv2", OpenState::Closed, PowerState::Off),
        ]);

        let updated = store
            .apply_confirmed("mv1", &StateChange::Open(OpenState::Open))
            .expect("apply");
        assert_eq!(
            updated.kind,
            ActuatorKind::Servo { open: OpenState::Open, power: PowerState::On }
        );

        // The other actuator and the untouched field are unchanged,
        // in both the map and the ordered snapshot.
        assert_eq!(
            store.actuator("mv2").expect("mv2").kind,
            ActuatorKind::Servo { open: OpenState::Closed, power: PowerState::Off }
        );
        let snap = store.actuators_snapshot();
        assert_eq!(snap[0].kind, ActuatorKind::Servo { open: OpenState::Open, power: PowerState::On });
    }

    #[test]
    fn apply_confirmed_unknown_actuator_is_an_error() {
        let store = ShadowStore::new();
        let err = store
            .apply_confirmed("ghost", &StateChange::Open(OpenState::Open))
            .expect_err("missing actuator");
        assert!(matches!(err, CoreError::ActuatorNotFound { .. }));
    }

    #[test]
    fn mismatched_change_leaves_store_untouched() {
        let store = ShadowStore::new();
        store.replace_actuators(vec![Actuator {
            name: "vent1".into(),
            kind: ActuatorKind::Solenoid { open: OpenState::Closed },
        }]);
        let before = store.actuators_snapshot();

        let err = store
            .apply_confirmed("vent1", &StateChange::Power(PowerState::On))
            .expect_err("mismatch");
        assert!(matches!(err, CoreError::StateMismatch { .. }));
        assert_eq!(*store.actuators_snapshot(), *before);
    }
}
