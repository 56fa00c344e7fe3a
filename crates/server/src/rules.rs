use shared::{
    domain::{DamperPosition, FanState, VentilationRequest, VentilationState},
    error::WsError,
};

pub(crate) const INVALID_STATE: &str = "Invalid ventilation state";
pub(crate) const LASER_LOCK_DENIED: &str = "Lock can only be changed with LaserCard";
pub(crate) const OLGA_LOCK_DENIED: &str = "Not Authorized to change OLGA-Lock";

/// What a requested state changes relative to the current one.
struct Transition {
    closing_damper1: bool,
    opening_damper1: bool,
    closing_damper2: bool,
    opening_damper2: bool,
    closing_damper3: bool,
    opening_damper3: bool,
    stopping_fan: bool,
    starting_fan: bool,
}

impl Transition {
    fn between(prev: &VentilationRequest, next: &VentilationRequest) -> Self {
        let closing = |before: DamperPosition, after: DamperPosition| {
            before != after && after == DamperPosition::Closed
        };
        let fully_opening = |before: DamperPosition, after: DamperPosition| {
            before != after && after == DamperPosition::Open
        };
        Self {
            closing_damper1: closing(prev.damper1, next.damper1),
            opening_damper1: prev.damper1 != next.damper1 && !next.damper1.is_closed(),
            closing_damper2: closing(prev.damper2, next.damper2),
            opening_damper2: fully_opening(prev.damper2, next.damper2),
            closing_damper3: closing(prev.damper3, next.damper3),
            opening_damper3: fully_opening(prev.damper3, next.damper3),
            stopping_fan: prev.fan != next.fan && next.fan == FanState::Off,
            starting_fan: prev.fan != next.fan && next.fan == FanState::On,
        }
    }
}

/// Checks a requested damper/fan change against the current state and the
/// engaged locks. The first violated rule wins. An accepted request with all
/// dampers closed has its fan forced off.
pub(crate) fn check_transition(
    current: &VentilationState,
    next: &mut VentilationRequest,
    is_local: bool,
) -> Result<(), WsError> {
    let prev = &current.vent;
    let change = Transition::between(prev, next);

    if change.starting_fan && next.all_dampers_closed() {
        return Err(WsError::prohibited("Won't start Fan with dampers closed!"));
    }
    if next.fan == FanState::On && next.all_dampers_opened() {
        return Err(WsError::not_authorized("Please open only 2 dampers at a time"));
    }
    if current.laser_lock {
        if change.closing_damper1 {
            return Err(WsError::prohibited(
                "Can't close LaserDamper while Lasercutter in use!",
            ));
        }
        if change.opening_damper2 || change.opening_damper3 {
            return Err(WsError::prohibited(
                "Can't fully open OLGA dampers while Lasercutter in use!",
            ));
        }
        if change.stopping_fan {
            return Err(WsError::prohibited("Can't stop fan while Lasercutter in use!"));
        }
    }
    if current.olga_lock && !is_local {
        let olga_ventilated =
            prev.damper2 == DamperPosition::Open || prev.damper3 == DamperPosition::Open;
        if change.stopping_fan && olga_ventilated {
            return Err(WsError::not_authorized("Can't stop fan while OLGA locked it"));
        }
        if change.closing_damper2 || change.closing_damper3 || change.opening_damper1 {
            return Err(WsError::not_authorized(
                "Can't close OLGA dampers or open LaserDamper while OLGA needs ventilation",
            ));
        }
    }

    if next.all_dampers_closed() {
        next.fan = FanState::Off;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/rules_tests.rs"]
mod tests;
