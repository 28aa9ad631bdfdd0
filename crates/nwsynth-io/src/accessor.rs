//! Read-only access to a case deck and its raw simulator outputs.

use std::sync::Arc;

use nwsynth_core::{SynthError, SynthResult, SynthesisKey};

use crate::registry::*;

/// Shared registry table.
pub type Records<T> = Arc<Vec<T>>;

/// Entity & deck accessor.
///
/// Every method returns `Ok(None)` when the underlying deck file is absent.
/// Callers that cannot proceed without it wrap the call in [`required`].
/// Implementations are shared by the spatial fan-out workers, so they must be
/// `Send + Sync` and safe to call concurrently.
pub trait DeckAccessor: Send + Sync {
    fn case(&self) -> SynthResult<Option<Arc<CaseConfig>>>;
    fn submarkets(&self) -> SynthResult<Option<Records<SubmarketRecord>>>;
    fn reservoir_groups(&self) -> SynthResult<Option<Records<ReservoirGroupRecord>>>;
    fn hydro_plants(&self) -> SynthResult<Option<Records<HydroPlantRecord>>>;
    fn hydro_changes(&self) -> SynthResult<Option<Records<HydroChangeRecord>>>;
    fn thermal_plants(&self) -> SynthResult<Option<Records<ThermalPlantRecord>>>;
    fn thermal_limits(&self) -> SynthResult<Option<Records<ThermalLimitRecord>>>;
    fn wind_farms(&self) -> SynthResult<Option<Records<WindFarmRecord>>>;
    fn block_durations(&self) -> SynthResult<Option<Records<BlockDurationRecord>>>;
    fn exchange_limits(&self) -> SynthResult<Option<Records<ExchangeLimitRecord>>>;
    fn exchange_block_factors(&self) -> SynthResult<Option<Records<ExchangeBlockFactorRecord>>>;
    fn stored_energy_capacity(&self)
        -> SynthResult<Option<Records<StoredEnergyCapacityRecord>>>;
    fn security_curve(&self) -> SynthResult<Option<Records<SecurityCurveRecord>>>;
    fn initial_stored_energy(&self) -> SynthResult<Option<Records<InitialStoredEnergyRecord>>>;

    /// Raw output of `key` for one entity. `None` means the entity has no
    /// output file (e.g. a plant that left the configuration).
    fn raw_output(
        &self,
        key: SynthesisKey,
        selector: EntitySelector,
    ) -> SynthResult<Option<RawTable>>;
}

/// Turn an absent deck table into [`SynthError::MissingInput`].
///
/// ```
/// use nwsynth_io::{required, InMemoryDeck, DeckAccessor};
///
/// let deck = InMemoryDeck::default();
/// let err = required("submarkets", deck.submarkets()).unwrap_err();
/// assert!(err.to_string().contains("submarkets"));
/// ```
pub fn required<T>(name: &str, value: SynthResult<Option<T>>) -> SynthResult<T> {
    value?.ok_or_else(|| SynthError::MissingInput(name.to_string()))
}
