use once_cell::sync::OnceCell;

use crate::Realization;

/// Forces every filter onto the scalar path when set to a true-ish value.
pub const SCALAR_VAR: &str = "BIQUAD_ENGINE_SCALAR";

/// Chooses the default realization: `df2t` or `state-space`.
pub const REALIZATION_VAR: &str = "BIQUAD_ENGINE_REALIZATION";

/// Process-wide settings, read from the environment the first time they are needed.
///
/// These exist mainly for diagnosing problems in a deployed program without rebuilding it;
/// individual filters can override the defaults through [`Builder`](crate::Builder).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// If true, no filter uses vector groups, whatever its `optimized` setting.
    pub force_scalar: bool,
    /// The realization used by filters that don't ask for one.
    pub realization: Realization,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            force_scalar: false,
            realization: Realization::StateSpace,
        }
    }
}

impl EngineConfig {
    /// Builds a configuration from a variable lookup, such as `std::env::var`.
    ///
    /// Unset or unrecognized values fall back to the defaults.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> EngineConfig {
        let mut ret = EngineConfig::default();
        if let Some(v) = lookup(SCALAR_VAR) {
            ret.force_scalar = matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(v) = lookup(REALIZATION_VAR) {
            match v.trim().to_ascii_lowercase().as_str() {
                "df2t" | "direct" | "direct-form" => {
                    ret.realization = Realization::DirectForm2Transposed
                }
                "state-space" | "ss" => ret.realization = Realization::StateSpace,
                _ => {}
            }
        }
        ret
    }
}

static CONFIG: OnceCell<EngineConfig> = OnceCell::new();

/// The process-wide configuration.
pub fn config() -> &'static EngineConfig {
    CONFIG.get_or_init(|| EngineConfig::from_lookup(|name| std::env::var(name).ok()))
}
