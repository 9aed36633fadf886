use std::collections::HashSet;

use super::{ParamId, ParamRegistry};
use crate::error::GateError;

/// Rejects external writes to parameters the controller owns exclusively:
/// every `EFFECTIVE_*` id, and the `DESIRED_*` id of any internal param
/// (spec §3.1, §4.1 "internal" flag).
///
/// Built once from a [`ParamRegistry`] after all params are registered, then
/// consulted by the write handler on every external bus write.
#[derive(Debug, Default)]
pub struct ProtectedParamGate {
    protected: HashSet<ParamId>,
}

impl ProtectedParamGate {
    pub fn new() -> Self {
        ProtectedParamGate {
            protected: HashSet::new(),
        }
    }

    pub fn from_registry(registry: &ParamRegistry) -> Self {
        let mut gate = ProtectedParamGate::new();
        gate.absorb_registry(registry);
        gate
    }

    /// Adds every effective id, and every internal param's desired id, from
    /// `registry`. Used for the five base TypedParams; the plain (non-pair)
    /// read-only scalars (`ARM_STATE`, `EFFECTIVE_SAMPLE_RATE`, burst meta)
    /// are added individually with [`Self::protect`].
    pub fn absorb_registry(&mut self, registry: &ParamRegistry) {
        for param in registry.iter() {
            self.protected.insert(param.effective_id());
            if param.is_internal() {
                self.protected.insert(param.desired_id());
            }
        }
    }

    /// Marks a single id read-only.
    pub fn protect(&mut self, id: ParamId) {
        self.protected.insert(id);
    }

    /// Returns `Ok(())` if an external write to `id` is allowed.
    pub fn check_write(&self, id: ParamId) -> Result<(), GateError> {
        if self.protected.contains(&id) {
            Err(GateError::Protected(id))
        } else {
            Ok(())
        }
    }

    pub fn is_protected(&self, id: ParamId) -> bool {
        self.protected.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{ParamKind, Scalar};

    #[test]
    fn effective_ids_are_always_protected() {
        let mut reg = ParamRegistry::new();
        let h = reg.register(ParamKind::IntInt, "A", Scalar::Int(-1), false);
        let gate = ProtectedParamGate::from_registry(&reg);
        assert!(gate.check_write(reg.get(h).effective_id()).is_err());
        assert!(gate.check_write(reg.get(h).desired_id()).is_ok());
    }

    #[test]
    fn internal_desired_ids_are_protected() {
        let mut reg = ParamRegistry::new();
        let h = reg.register(ParamKind::IntInt, "A", Scalar::Int(-1), true);
        let gate = ProtectedParamGate::from_registry(&reg);
        assert!(gate.check_write(reg.get(h).desired_id()).is_err());
    }
}
