//! `ArmState` (spec §3.2, §6.1 enum mapping).

/// The controller's externally-visible state. Transitions are authored only
/// by the acquisition thread and by the ARM_REQUEST write handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmState {
    Disarm = 0,
    PostTrigger = 1,
    PrePostTrigger = 2,
    Busy = 3,
    Error = 4,
}

impl ArmState {
    pub fn is_armed_state(self) -> bool {
        matches!(self, ArmState::PostTrigger | ArmState::PrePostTrigger)
    }
}

impl From<ArmState> for i32 {
    fn from(s: ArmState) -> Self {
        s as i32
    }
}

/// Error returned by [`TryFrom<i32>`] when an enum write carries an
/// undefined value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownArmState(pub i32);

impl TryFrom<i32> for ArmState {
    type Error = UnknownArmState;

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(ArmState::Disarm),
            1 => Ok(ArmState::PostTrigger),
            2 => Ok(ArmState::PrePostTrigger),
            3 => Ok(ArmState::Busy),
            4 => Ok(ArmState::Error),
            other => Err(UnknownArmState(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_i32() {
        for s in [
            ArmState::Disarm,
            ArmState::PostTrigger,
            ArmState::PrePostTrigger,
            ArmState::Busy,
            ArmState::Error,
        ] {
            assert_eq!(ArmState::try_from(i32::from(s)), Ok(s));
        }
    }

    #[test]
    fn rejects_unknown_value() {
        assert_eq!(ArmState::try_from(99), Err(UnknownArmState(99)));
    }
}
