use super::ParamId;

/// Which of the three supported `(V, E)` pairs a [`TypedParam`] holds
/// (spec §3.1: `(int,int)`, `(int,real)`, `(real,real)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Desired and effective are both integers.
    IntInt,
    /// Desired is an integer, effective is a real (can report NaN).
    IntReal,
    /// Desired and effective are both reals.
    RealReal,
}

/// A value that's either the integer or the real half of a parameter pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int(i32),
    Real(f64),
}

impl Scalar {
    pub fn as_f64(self) -> f64 {
        match self {
            Scalar::Int(v) => f64::from(v),
            Scalar::Real(v) => v,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Scalar::Int(v) => v,
            Scalar::Real(v) => v as i32,
        }
    }

    fn is_int(self) -> bool {
        matches!(self, Scalar::Int(_))
    }
}

/// One tunable knob: a `(desired, effective)` pair with a snapshot slot and
/// an "irrelevant" flag (spec §3.1).
///
/// `TypedParam` carries no synchronisation of its own — it lives inside
/// [`super::ParamRegistry`], which in turn lives behind the controller's
/// single port lock. Every method here documents the locking discipline
/// its spec clause requires; `trc-core` upholds it at the call sites in
/// `controller`, not here.
#[derive(Debug)]
pub struct TypedParam {
    kind: ParamKind,
    base_name: &'static str,
    desired_id: ParamId,
    effective_id: ParamId,
    internal: bool,
    invalid_value: Scalar,
    unit: Option<&'static str>,
    description: Option<&'static str>,

    desired: Scalar,
    effective: Scalar,
    snapshot: Scalar,
    irrelevant: bool,
}

impl TypedParam {
    /// Creates a new param. Bus registration (the `DESIRED_<base>` /
    /// `EFFECTIVE_<base>` names and protected-write registration) is the
    /// caller's job — see [`super::ParamRegistry::register`], which is the
    /// only place that should call this.
    pub(crate) fn new(
        kind: ParamKind,
        base_name: &'static str,
        desired_id: ParamId,
        effective_id: ParamId,
        invalid_value: Scalar,
        internal: bool,
    ) -> Self {
        debug_assert_eq!(
            invalid_value.is_int(),
            matches!(kind, ParamKind::IntInt),
            "invalid_value's type must match the param's effective type"
        );

        let desired_default = match kind {
            ParamKind::IntInt | ParamKind::IntReal => Scalar::Int(0),
            ParamKind::RealReal => Scalar::Real(0.0),
        };

        TypedParam {
            kind,
            base_name,
            desired_id,
            effective_id,
            internal,
            invalid_value,
            unit: None,
            description: None,
            desired: desired_default,
            // Effective values are initialised to invalid_value (spec §4.1).
            effective: invalid_value,
            snapshot: desired_default,
            irrelevant: false,
        }
    }

    pub fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn base_name(&self) -> &'static str {
        self.base_name
    }

    pub fn unit(&self) -> Option<&'static str> {
        self.unit
    }

    pub fn description(&self) -> Option<&'static str> {
        self.description
    }

    pub fn desired_id(&self) -> ParamId {
        self.desired_id
    }

    pub fn effective_id(&self) -> ParamId {
        self.effective_id
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn invalid_value(&self) -> Scalar {
        self.invalid_value
    }

    /// Reads the current desired value. Must be called with the controller
    /// mutex held.
    pub fn get_desired(&self) -> Scalar {
        self.desired
    }

    /// Sets the desired value. Only valid for internal params — the adapter
    /// is the only writer for those (external writes are rejected by
    /// [`super::ProtectedParamGate`] before reaching here).
    pub fn set_desired(&mut self, v: Scalar) {
        debug_assert!(self.internal, "set_desired is only for internal params");
        self.desired = v;
    }

    /// Sets desired from an *external* bus write. Bypasses the
    /// internal-only check in [`Self::set_desired`] — callers (the
    /// ARM_REQUEST/parameter write handler) must have already rejected
    /// writes to internal params via the protected gate.
    pub(crate) fn write_desired_from_bus(&mut self, v: Scalar) {
        self.desired = v;
    }

    /// Reads the frozen snapshot. Legal only between `wait_for_preconditions`
    /// returning true and `stop_acquisition` returning (the armed window).
    pub fn get_snapshot(&self) -> Scalar {
        self.snapshot
    }

    /// Overwrites the snapshot. Legal only inside `check_settings`, where an
    /// adapter may want to rewrite a captured value (e.g. round a requested
    /// rate to what the hardware can actually produce).
    pub fn set_snapshot(&mut self, v: Scalar) {
        self.snapshot = v;
    }

    /// Marks this param unused by the current configuration. Legal only
    /// inside `check_settings`. Forces `effective = invalid` at arm time
    /// regardless of what `push_effective_from_snapshot` would otherwise do.
    pub fn set_irrelevant(&mut self) {
        self.irrelevant = true;
    }

    pub fn is_irrelevant(&self) -> bool {
        self.irrelevant
    }

    /// Reads the current effective value (what the hardware is reportedly
    /// using, or `invalid_value` when unarmed/irrelevant).
    pub fn get_effective(&self) -> Scalar {
        self.effective
    }

    /// snapshot <- desired, irrelevant <- false. Called once per arming,
    /// right after `wait_for_preconditions` returns true.
    pub(crate) fn capture(&mut self) {
        self.snapshot = self.desired;
        self.irrelevant = false;
    }

    /// effective <- snapshot, unless irrelevant, in which case
    /// effective <- invalid. Called once settings have been validated.
    pub(crate) fn push_effective_from_snapshot(&mut self) {
        self.effective = if self.irrelevant {
            self.invalid_value
        } else {
            match self.kind {
                ParamKind::IntInt => Scalar::Int(self.snapshot.as_i32()),
                ParamKind::IntReal | ParamKind::RealReal => Scalar::Real(self.snapshot.as_f64()),
            }
        };
    }

    /// effective <- invalid. Called on cleanup (disarm, or early-stage error).
    pub(crate) fn push_effective_invalid(&mut self) {
        self.effective = self.invalid_value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(kind: ParamKind, invalid: Scalar, internal: bool) -> TypedParam {
        TypedParam::new(kind, "TEST", ParamId::new(0), ParamId::new(1), invalid, internal)
    }

    /// Effective starts out invalid, not some zero default.
    #[test]
    fn effective_starts_invalid() {
        let p = make(ParamKind::IntReal, Scalar::Real(f64::NAN), false);
        assert!(matches!(p.get_effective(), Scalar::Real(v) if v.is_nan()));
    }

    /// capture() freezes desired into snapshot and clears irrelevant.
    #[test]
    fn capture_freezes_desired() {
        let mut p = make(ParamKind::IntReal, Scalar::Real(f64::NAN), false);
        p.write_desired_from_bus(Scalar::Int(42));
        p.set_irrelevant();
        p.capture();
        assert_eq!(p.get_snapshot().as_i32(), 42);
        assert!(!p.is_irrelevant());

        // A later external write must not move the snapshot.
        p.write_desired_from_bus(Scalar::Int(99));
        assert_eq!(p.get_snapshot().as_i32(), 42);
    }

    /// push_effective_from_snapshot respects the irrelevant flag.
    #[test]
    fn irrelevant_forces_invalid_effective() {
        let mut p = make(ParamKind::IntReal, Scalar::Real(f64::NAN), false);
        p.write_desired_from_bus(Scalar::Int(7));
        p.capture();
        p.set_irrelevant();
        p.push_effective_from_snapshot();
        assert!(matches!(p.get_effective(), Scalar::Real(v) if v.is_nan()));
    }

    /// push_effective_from_snapshot carries the snapshot through when relevant.
    #[test]
    fn relevant_effective_tracks_snapshot() {
        let mut p = make(ParamKind::RealReal, Scalar::Real(f64::NAN), false);
        p.write_desired_from_bus(Scalar::Real(2.5));
        p.capture();
        p.push_effective_from_snapshot();
        assert_eq!(p.get_effective().as_f64(), 2.5);
    }

    /// push_effective_invalid always resets to the invalid sentinel.
    #[test]
    fn push_invalid_resets_effective() {
        let mut p = make(ParamKind::RealReal, Scalar::Real(f64::NAN), false);
        p.write_desired_from_bus(Scalar::Real(2.5));
        p.capture();
        p.push_effective_from_snapshot();
        p.push_effective_invalid();
        assert!(matches!(p.get_effective(), Scalar::Real(v) if v.is_nan()));
    }

    /// set_desired is honoured for internal params.
    #[test]
    fn set_desired_updates_internal_param() {
        let mut p = make(ParamKind::RealReal, Scalar::Real(f64::NAN), true);
        p.set_desired(Scalar::Real(12.0));
        assert_eq!(p.get_desired().as_f64(), 12.0);
    }
}
