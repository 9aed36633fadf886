//! Base configuration parameters (spec §3.3).

use crate::param::{ParamKind, ParamRegistry, Scalar, TypedParamHandle};

/// Handles for the five TypedParams the controller owns itself, alongside
/// whatever the adapter registers.
#[derive(Debug, Clone, Copy)]
pub struct BaseParams {
    pub num_bursts: TypedParamHandle,
    pub num_post_samples: TypedParamHandle,
    pub num_pre_post_samples: TypedParamHandle,
    pub requested_sample_rate: TypedParamHandle,
    pub achievable_sample_rate: TypedParamHandle,
}

impl BaseParams {
    pub(crate) fn register(registry: &mut ParamRegistry) -> Self {
        BaseParams {
            num_bursts: registry.register(ParamKind::IntReal, "NUM_BURSTS", Scalar::Real(f64::NAN), false),
            num_post_samples: registry.register(
                ParamKind::IntReal,
                "NUM_POST_SAMPLES",
                Scalar::Real(f64::NAN),
                false,
            ),
            num_pre_post_samples: registry.register(
                ParamKind::IntReal,
                "NUM_PRE_POST_SAMPLES",
                Scalar::Real(f64::NAN),
                false,
            ),
            requested_sample_rate: registry.register(
                ParamKind::RealReal,
                "REQUESTED_SAMPLE_RATE",
                Scalar::Real(f64::NAN),
                false,
            ),
            achievable_sample_rate: registry.register(
                ParamKind::RealReal,
                "ACHIEVABLE_SAMPLE_RATE",
                Scalar::Real(f64::NAN),
                true,
            ),
        }
    }

    pub fn num_bursts_desired(&self, registry: &ParamRegistry) -> i32 {
        registry.get(self.num_bursts).get_desired().as_i32()
    }

    pub fn num_bursts_snapshot(&self, registry: &ParamRegistry) -> i32 {
        registry.get(self.num_bursts).get_snapshot().as_i32()
    }

    pub fn num_post_samples_snapshot(&self, registry: &ParamRegistry) -> i32 {
        registry.get(self.num_post_samples).get_snapshot().as_i32()
    }

    pub fn num_pre_post_samples_snapshot(&self, registry: &ParamRegistry) -> i32 {
        registry
            .get(self.num_pre_post_samples)
            .get_snapshot()
            .as_i32()
    }

    pub fn requested_sample_rate_desired(&self, registry: &ParamRegistry) -> f64 {
        registry.get(self.requested_sample_rate).get_desired().as_f64()
    }

    pub fn set_achievable_sample_rate(&self, registry: &mut ParamRegistry, rate: f64) {
        registry
            .get_mut(self.achievable_sample_rate)
            .set_desired(Scalar::Real(rate));
    }
}
