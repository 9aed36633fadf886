use super::{ParamId, ParamKind, Scalar, TypedParam};

/// Addresses one [`TypedParam`] inside a [`ParamRegistry`].
///
/// Opaque on purpose: callers (the `controller` module) hold these instead
/// of raw indices so the registry is free to change its backing storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedParamHandle(usize);

/// Owns every [`TypedParam`] the controller exposes and runs the bulk
/// snapshot/effective verbs across all of them once per arming cycle
/// (spec §4.4 steps "capture settings" / "push effective values").
///
/// Lives inside the controller's `Mutex<Bookkeeping>` — every method here
/// assumes the caller already holds that lock.
#[derive(Debug, Default)]
pub struct ParamRegistry {
    params: Vec<TypedParam>,
    next_id: u32,
}

impl ParamRegistry {
    pub fn new() -> Self {
        ParamRegistry {
            params: Vec::new(),
            next_id: 0,
        }
    }

    fn alloc_id(&mut self) -> ParamId {
        let id = ParamId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Registers a new parameter pair and returns a handle to it.
    pub fn register(
        &mut self,
        kind: ParamKind,
        base_name: &'static str,
        invalid_value: Scalar,
        internal: bool,
    ) -> TypedParamHandle {
        let desired_id = self.alloc_id();
        let effective_id = self.alloc_id();
        let param = TypedParam::new(kind, base_name, desired_id, effective_id, invalid_value, internal);
        self.params.push(param);
        TypedParamHandle(self.params.len() - 1)
    }

    pub fn get(&self, handle: TypedParamHandle) -> &TypedParam {
        &self.params[handle.0]
    }

    pub fn get_mut(&mut self, handle: TypedParamHandle) -> &mut TypedParam {
        &mut self.params[handle.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypedParam> {
        self.params.iter()
    }

    /// Finds the param whose desired or effective id is `id`, and whether
    /// `id` named the desired or the effective half.
    pub fn find_by_id(&self, id: ParamId) -> Option<(&TypedParam, bool)> {
        self.params.iter().find_map(|p| {
            if p.desired_id() == id {
                Some((p, true))
            } else if p.effective_id() == id {
                Some((p, false))
            } else {
                None
            }
        })
    }

    /// Writes `v` to the desired half of whichever param owns `id`.
    /// Returns `false` if no param owns `id` as its desired id.
    pub fn write_desired_by_id(&mut self, id: ParamId, v: Scalar) -> bool {
        for p in &mut self.params {
            if p.desired_id() == id {
                p.write_desired_from_bus(v);
                return true;
            }
        }
        false
    }

    /// `capture()` on every registered param (spec §4.4: snapshot desired
    /// values right after preconditions are satisfied).
    pub fn capture_all(&mut self) {
        for p in &mut self.params {
            p.capture();
        }
    }

    /// `push_effective_from_snapshot()` on every registered param (spec
    /// §4.4: publish effective values once settings are validated).
    pub fn push_effective_from_snapshot_all(&mut self) {
        for p in &mut self.params {
            p.push_effective_from_snapshot();
        }
    }

    /// `push_effective_invalid()` on every registered param (spec §4.6:
    /// reset effective values on disarm or early-stage arm failure).
    pub fn push_effective_invalid_all(&mut self) {
        for p in &mut self.params {
            p.push_effective_invalid();
        }
    }

    /// Returns the desired-id of the second param found registered under a
    /// `base_name` that already appears earlier in the registry, or `None`
    /// if every registered name is unique.
    ///
    /// Base params and adapter-supplied params (spec §3.3) share one
    /// registry and therefore one bus namespace; a collision between them
    /// would silently double up a `DESIRED_*`/`EFFECTIVE_*` bus record.
    pub fn find_duplicate_base_name(&self) -> Option<ParamId> {
        let mut seen = std::collections::HashSet::new();
        for p in &self.params {
            if !seen.insert(p.base_name()) {
                return Some(p.desired_id());
            }
        }
        None
    }
}
