// ── Command dispatch ──
//
// Turns an operator intent into a wire command, with every local
// precondition checked before the request leaves the process. The
// shadow store is only mutated after the controller confirms.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::model::{Actuator, ActuatorKind, PowerState, StateChange};
use crate::store::ShadowStore;
use novaground_api::{CommandRequest, DeviceClient};

// ── Lock gate ────────────────────────────────────────────────────────

/// Panel-wide safety latch. While engaged, new actuator commands are
/// rejected locally; commands already on the wire are unaffected, and
/// incoming telemetry keeps flowing either way.
#[derive(Debug, Default)]
pub struct LockGate {
    engaged: AtomicBool,
}

impl LockGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engage(&self) {
        self.engaged.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.engaged.store(false, Ordering::SeqCst);
    }

    /// Flip the latch, returning the new engaged state.
    pub fn toggle(&self) -> bool {
        self.engaged.fetch_xor(true, Ordering::SeqCst) ^ true
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::SeqCst)
    }
}

// ── Intents ──────────────────────────────────────────────────────────

/// An operator request against one named actuator. Intents carry no
/// target value for toggles -- the next value is derived from the
/// shadow at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub name: String,
    pub action: IntentAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentAction {
    /// Flip open/closed on a servo or solenoid.
    ToggleOpen,
    /// Flip armed/disarmed on a GPIO device.
    ToggleArming,
    /// Flip the power gate on any powered kind.
    TogglePower,
    /// Move a multi-position valve to a named position.
    SelectValve(String),
}

impl Intent {
    pub fn new(name: impl Into<String>, action: IntentAction) -> Self {
        Self {
            name: name.into(),
            action,
        }
    }
}

// ── Dispatcher ───────────────────────────────────────────────────────

/// Routes intents to the controller, one in-flight command per actuator.
pub struct Dispatcher {
    client: Arc<DeviceClient>,
    store: Arc<ShadowStore>,
    lock: Arc<LockGate>,
    in_flight: DashMap<String, ()>,
}

/// Removes the in-flight marker on every exit path, including errors.
struct InFlightGuard<'a> {
    dispatcher: &'a Dispatcher,
    name: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.dispatcher.in_flight.remove(&self.name);
    }
}

impl Dispatcher {
    pub fn new(client: Arc<DeviceClient>, store: Arc<ShadowStore>, lock: Arc<LockGate>) -> Self {
        Self {
            client,
            store,
            lock,
            in_flight: DashMap::new(),
        }
    }

    /// Dispatch one intent end to end.
    ///
    /// Order of checks: lock gate, per-actuator in-flight guard, shadow
    /// lookup, kind/power preconditions. Any rejection happens before a
    /// request is sent. On confirmed success the change is folded into
    /// the shadow and returned.
    pub async fn dispatch(&self, intent: Intent) -> Result<StateChange, CoreError> {
        if self.lock.is_engaged() {
            return Err(CoreError::Locked);
        }

        // Claim the per-actuator slot; a second command for the same
        // actuator is rejected until the first settles.
        let claimed = {
            use dashmap::mapref::entry::Entry;
            match self.in_flight.entry(intent.name.clone()) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(());
                    true
                }
            }
        };
        if !claimed {
            return Err(CoreError::Busy { name: intent.name });
        }
        let _guard = InFlightGuard {
            dispatcher: self,
            name: intent.name.clone(),
        };

        let actuator = self
            .store
            .actuator(&intent.name)
            .ok_or_else(|| CoreError::ActuatorNotFound {
                name: intent.name.clone(),
            })?;

        let change = plan_change(&actuator, &intent.action)?;
        let request = CommandRequest {
            kind: actuator.kind.tag().to_owned(),
            name: actuator.name.clone(),
            state: change.wire_value(),
        };
        debug!(name = %request.name, kind = %request.kind, state = %request.state, "sending command");

        self.client.send_command(&request).await?;

        let updated = self.store.apply_confirmed(&actuator.name, &change)?;
        info!(name = %updated.name, state = %change, "command confirmed");
        Ok(change)
    }
}

/// Compute the single-field change an intent implies, enforcing the
/// per-kind precondition table. Power gates are checked before
/// anything else so the operator always sees the power error first.
fn plan_change(actuator: &Actuator, action: &IntentAction) -> Result<StateChange, CoreError> {
    let require_power = || {
        if actuator.kind.power() == Some(PowerState::On) {
            Ok(())
        } else {
            Err(CoreError::PowerRequired {
                name: actuator.name.clone(),
            })
        }
    };

    match (&actuator.kind, action) {
        (ActuatorKind::Servo { open, .. }, IntentAction::ToggleOpen) => {
            require_power()?;
            Ok(StateChange::Open(open.toggled()))
        }
        // Solenoids switch through a relay; no power gate applies.
        (ActuatorKind::Solenoid { open }, IntentAction::ToggleOpen) => {
            Ok(StateChange::Open(open.toggled()))
        }
        (ActuatorKind::GpioDevice { arming }, IntentAction::ToggleArming) => {
            Ok(StateChange::Arming(arming.toggled()))
        }
        (ActuatorKind::PoweredGpioDevice { arming, .. }, IntentAction::ToggleArming) => {
            require_power()?;
            Ok(StateChange::Arming(arming.toggled()))
        }
        (ActuatorKind::Servo3 { positions, .. }, IntentAction::SelectValve(position)) => {
            require_power()?;
            if !positions.contains(position) {
                return Err(CoreError::UnknownPosition {
                    name: actuator.name.clone(),
                    position: position.clone(),
                });
            }
            Ok(StateChange::Valve(position.clone()))
        }
        (
            ActuatorKind::Servo { power, .. }
            | ActuatorKind::PoweredDevice { power }
            | ActuatorKind::PoweredGpioDevice { power, .. }
            | ActuatorKind::Servo3 { power, .. },
            IntentAction::TogglePower,
        ) => Ok(StateChange::Power(power.toggled())),
        _ => Err(CoreError::UnsupportedAction {
            name: actuator.name.clone(),
            kind: actuator.kind.tag(),
        }),
    }
}

// ── Tests ────────────────────────────────────────────────────────────
