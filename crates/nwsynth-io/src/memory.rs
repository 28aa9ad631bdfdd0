//! In-memory deck, used by tests and by callers that build decks programmatically.

use std::collections::HashMap;
use std::sync::Arc;

use nwsynth_core::{SynthResult, SynthesisKey};

use crate::accessor::{DeckAccessor, Records};
use crate::registry::*;

/// A deck whose tables are supplied directly. Unset tables read as absent.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeck {
    case: Option<Arc<CaseConfig>>,
    submarkets: Option<Records<SubmarketRecord>>,
    reservoir_groups: Option<Records<ReservoirGroupRecord>>,
    hydro_plants: Option<Records<HydroPlantRecord>>,
    hydro_changes: Option<Records<HydroChangeRecord>>,
    thermal_plants: Option<Records<ThermalPlantRecord>>,
    thermal_limits: Option<Records<ThermalLimitRecord>>,
    wind_farms: Option<Records<WindFarmRecord>>,
    block_durations: Option<Records<BlockDurationRecord>>,
    exchange_limits: Option<Records<ExchangeLimitRecord>>,
    exchange_block_factors: Option<Records<ExchangeBlockFactorRecord>>,
    stored_energy_capacity: Option<Records<StoredEnergyCapacityRecord>>,
    security_curve: Option<Records<SecurityCurveRecord>>,
    initial_stored_energy: Option<Records<InitialStoredEnergyRecord>>,
    outputs: HashMap<(SynthesisKey, EntitySelector), RawTable>,
}

macro_rules! with_table {
    ($method:ident, $field:ident, $record:ty) => {
        pub fn $method(mut self, records: Vec<$record>) -> Self {
            self.$field = Some(Arc::new(records));
            self
        }
    };
}

impl InMemoryDeck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_case(mut self, case: CaseConfig) -> Self {
        self.case = Some(Arc::new(case));
        self
    }

    with_table!(with_submarkets, submarkets, SubmarketRecord);
    with_table!(with_reservoir_groups, reservoir_groups, ReservoirGroupRecord);
    with_table!(with_hydro_plants, hydro_plants, HydroPlantRecord);
    with_table!(with_hydro_changes, hydro_changes, HydroChangeRecord);
    with_table!(with_thermal_plants, thermal_plants, ThermalPlantRecord);
    with_table!(with_thermal_limits, thermal_limits, ThermalLimitRecord);
    with_table!(with_wind_farms, wind_farms, WindFarmRecord);
    with_table!(with_block_durations, block_durations, BlockDurationRecord);
    with_table!(with_exchange_limits, exchange_limits, ExchangeLimitRecord);
    with_table!(
        with_exchange_block_factors,
        exchange_block_factors,
        ExchangeBlockFactorRecord
    );
    with_table!(
        with_stored_energy_capacity,
        stored_energy_capacity,
        StoredEnergyCapacityRecord
    );
    with_table!(with_security_curve, security_curve, SecurityCurveRecord);
    with_table!(
        with_initial_stored_energy,
        initial_stored_energy,
        InitialStoredEnergyRecord
    );

    /// Register the raw output of `key` for one entity.
    pub fn with_output(
        mut self,
        key: SynthesisKey,
        selector: EntitySelector,
        rows: RawTable,
    ) -> Self {
        self.outputs.insert((key, selector), rows);
        self
    }

    /// Register a raw output in place.
    pub fn insert_output(&mut self, key: SynthesisKey, selector: EntitySelector, rows: RawTable) {
        self.outputs.insert((key, selector), rows);
    }
}

impl DeckAccessor for InMemoryDeck {
    fn case(&self) -> SynthResult<Option<Arc<CaseConfig>>> {
        Ok(self.case.clone())
    }

    fn submarkets(&self) -> SynthResult<Option<Records<SubmarketRecord>>> {
        Ok(self.submarkets.clone())
    }

    fn reservoir_groups(&self) -> SynthResult<Option<Records<ReservoirGroupRecord>>> {
        Ok(self.reservoir_groups.clone())
    }

    fn hydro_plants(&self) -> SynthResult<Option<Records<HydroPlantRecord>>> {
        Ok(self.hydro_plants.clone())
    }

    fn hydro_changes(&self) -> SynthResult<Option<Records<HydroChangeRecord>>> {
        Ok(self.hydro_changes.clone())
    }

    fn thermal_plants(&self) -> SynthResult<Option<Records<ThermalPlantRecord>>> {
        Ok(self.thermal_plants.clone())
    }

    fn thermal_limits(&self) -> SynthResult<Option<Records<ThermalLimitRecord>>> {
        Ok(self.thermal_limits.clone())
    }

    fn wind_farms(&self) -> SynthResult<Option<Records<WindFarmRecord>>> {
        Ok(self.wind_farms.clone())
    }

    fn block_durations(&self) -> SynthResult<Option<Records<BlockDurationRecord>>> {
        Ok(self.block_durations.clone())
    }

    fn exchange_limits(&self) -> SynthResult<Option<Records<ExchangeLimitRecord>>> {
        Ok(self.exchange_limits.clone())
    }

    fn exchange_block_factors(&self) -> SynthResult<Option<Records<ExchangeBlockFactorRecord>>> {
        Ok(self.exchange_block_factors.clone())
    }

    fn stored_energy_capacity(
        &self,
    ) -> SynthResult<Option<Records<StoredEnergyCapacityRecord>>> {
        Ok(self.stored_energy_capacity.clone())
    }

    fn security_curve(&self) -> SynthResult<Option<Records<SecurityCurveRecord>>> {
        Ok(self.security_curve.clone())
    }

    fn initial_stored_energy(&self) -> SynthResult<Option<Records<InitialStoredEnergyRecord>>> {
        Ok(self.initial_stored_energy.clone())
    }

    fn raw_output(
        &self,
        key: SynthesisKey,
        selector: EntitySelector,
    ) -> SynthResult<Option<RawTable>> {
        Ok(self.outputs.get(&(key, selector)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::required;
    use chrono::NaiveDate;

    #[test]
    fn unset_tables_are_absent() {
        let deck = InMemoryDeck::new();
        assert!(deck.hydro_plants().unwrap().is_none());
        assert!(required("hydro_plants", deck.hydro_plants()).is_err());
    }

    #[test]
    fn outputs_are_looked_up_by_key_and_selector() {
        let key = SynthesisKey::parse("QAFL_UHE").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let deck = InMemoryDeck::new().with_output(
            key,
            EntitySelector::HydroPlant(6),
            vec![RawRow::new(date, 1, 0, 10.0)],
        );
        assert_eq!(
            deck.raw_output(key, EntitySelector::HydroPlant(6))
                .unwrap()
                .map(|rows| rows.len()),
            Some(1)
        );
        assert!(deck
            .raw_output(key, EntitySelector::HydroPlant(7))
            .unwrap()
            .is_none());
    }
}
