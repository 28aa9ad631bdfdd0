//! Drop requested syntheses the case cannot produce.

use tracing::debug;

use nwsynth_core::{SpatialResolution, SynthesisKey};
use nwsynth_io::CaseConfig;

/// Whether the case can produce `key` at all.
pub fn is_valid(key: &SynthesisKey, case: &CaseConfig) -> bool {
    if !key.is_supported() {
        return false;
    }
    if key.variable.requires_wind() && !case.has_wind {
        return false;
    }
    if !case.individualized_hydro
        && (key.resolution == SpatialResolution::HydroPlant
            || key.variable.requires_individualized_hydro())
    {
        return false;
    }
    true
}

/// Keep the keys the case can produce, in request order.
pub fn filter_valid(keys: &[SynthesisKey], case: &CaseConfig) -> Vec<SynthesisKey> {
    keys.iter()
        .filter(|key| {
            let valid = is_valid(key, case);
            if !valid {
                debug!(%key, "synthesis not available for this case");
            }
            valid
        })
        .copied()
        .collect()
}
