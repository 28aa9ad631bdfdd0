//! Synthesis identifiers: a (variable, spatial resolution) pair.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::resolution::SpatialResolution;
use crate::variable::Variable;

/// Delimiter between the variable and resolution codes in a synthesis name.
pub const KEY_DELIMITER: char = '_';

/// Identifies one synthesis. Used as map key for dependencies, bounds
/// strategies, the cache and the ordered-entity store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SynthesisKey {
    pub variable: Variable,
    pub resolution: SpatialResolution,
}

impl SynthesisKey {
    pub const fn new(variable: Variable, resolution: SpatialResolution) -> Self {
        Self {
            variable,
            resolution,
        }
    }

    /// Parse `"{variable}_{resolution}"`.
    ///
    /// Returns `None` for anything that is not exactly two known tokens;
    /// callers skip such entries instead of failing.
    pub fn parse(s: &str) -> Option<Self> {
        let mut tokens = s.trim().split(KEY_DELIMITER);
        let variable = tokens.next()?.parse().ok()?;
        let resolution = tokens.next()?.parse().ok()?;
        if tokens.next().is_some() {
            return None;
        }
        Some(Self::new(variable, resolution))
    }

    /// Whether the variable can be synthesized at this resolution at all.
    pub fn is_supported(&self) -> bool {
        self.variable.resolutions().contains(&self.resolution)
    }

    /// Whether the simulator prints this synthesis directly.
    pub fn is_native(&self) -> bool {
        self.variable.native_resolutions().contains(&self.resolution)
    }

    /// Every supported key, in catalog order.
    pub fn supported() -> Vec<SynthesisKey> {
        Variable::ALL
            .iter()
            .flat_map(|v| v.resolutions().iter().map(|r| SynthesisKey::new(*v, *r)))
            .collect()
    }
}

impl fmt::Display for SynthesisKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.variable.short_name(),
            KEY_DELIMITER,
            self.resolution.short_name()
        )
    }
}
