//! Toy deck: two submarkets, one reservoir group, a three-plant cascade,
//! twelve monthly stages, one scenario and three load blocks.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use nwsynth_algo::{SynthesisConfig, Synthesizer};
use nwsynth_core::SynthesisKey;
use nwsynth_io::{
    BlockDurationRecord, CaseConfig, DataFrame, EntitySelector, ExchangeBlockFactorRecord,
    ExchangeLimitRecord, HydroPlantRecord, InMemoryDeck, InitialStoredEnergyRecord,
    MemoryExporter, RawRow, RawTable, ReservoirGroupRecord, SecurityCurveRecord,
    StoredEnergyCapacityRecord, SubmarketRecord, ThermalLimitRecord, ThermalPlantRecord,
};

pub const STAGES: u32 = 12;
pub const BLOCK_FRACTIONS: [f64; 3] = [0.2, 0.3, 0.5];
pub const PLANTS: [i32; 3] = [1, 2, 3];

pub fn month(stage: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, stage, 1).unwrap()
}

pub fn key(name: &str) -> SynthesisKey {
    SynthesisKey::parse(name).unwrap()
}

pub fn case() -> CaseConfig {
    CaseConfig {
        study_start: month(1),
        study_stages: STAGES,
        scenarios: 1,
        blocks: BLOCK_FRACTIONS.len() as u32,
        individualized_hydro: true,
        individualized_stages: None,
        has_wind: false,
    }
}

fn plant(
    code: i32,
    name: &str,
    downstream: i32,
    productivity: f64,
    range: (f64, f64),
) -> HydroPlantRecord {
    HydroPlantRecord {
        code,
        name: name.into(),
        group_code: 1,
        downstream_code: downstream,
        productivity,
        min_volume: range.0,
        max_volume: range.1,
        max_turbined_flow: 500.0,
        min_outflow: 50.0,
        initial_volume_percent: 50.0,
    }
}

/// Registry tables only; no simulator outputs.
pub fn registry() -> InMemoryDeck {
    let durations = (1..=STAGES)
        .flat_map(|stage| {
            BLOCK_FRACTIONS
                .iter()
                .enumerate()
                .map(move |(i, fraction)| BlockDurationRecord {
                    start: month(stage),
                    block: i as u32 + 1,
                    fraction: *fraction,
                })
        })
        .collect();
    InMemoryDeck::new()
        .with_case(case())
        .with_submarkets(vec![
            SubmarketRecord {
                code: 1,
                name: "SUDESTE".into(),
                fictitious: false,
            },
            SubmarketRecord {
                code: 2,
                name: "SUL".into(),
                fictitious: false,
            },
        ])
        .with_reservoir_groups(vec![ReservoirGroupRecord {
            code: 1,
            name: "PARANAIBA".into(),
            submarket_code: 1,
        }])
        .with_hydro_plants(vec![
            plant(1, "EMBORCACAO", 2, 0.9, (4669.0, 17725.0)),
            plant(2, "ITUMBIARA", 3, 0.8, (4573.0, 17027.0)),
            plant(3, "SAO SIMAO", 0, 0.7, (7000.0, 12540.0)),
        ])
        .with_block_durations(durations)
}

/// Real blocks of every stage, valued by `f(stage, block)`.
pub fn per_block(f: impl Fn(u32, u32) -> f64) -> RawTable {
    (1..=STAGES)
        .flat_map(|stage| {
            let f = &f;
            (1..=BLOCK_FRACTIONS.len() as u32)
                .map(move |block| RawRow::new(month(stage), 1, block, f(stage, block)))
        })
        .collect()
}

/// Block 0 only, valued by `f(stage)`.
pub fn per_stage(f: impl Fn(u32) -> f64) -> RawTable {
    (1..=STAGES)
        .map(|stage| RawRow::new(month(stage), 1, 0, f(stage)))
        .collect()
}

/// Registry plus the outputs used across the integration tests.
pub fn deck() -> InMemoryDeck {
    let mut deck = registry()
        .with_output(
            key("EVERR_SIN"),
            EntitySelector::System,
            per_block(|s, b| 10.0 * s as f64 + b as f64),
        )
        .with_output(
            key("EVERF_SIN"),
            EntitySelector::System,
            per_block(|s, b| s as f64 + 2.0 * b as f64),
        )
        .with_output(
            key("EARMF_SBM"),
            EntitySelector::Submarket(1),
            per_stage(|s| 40_000.0 + 1_000.0 * s as f64),
        );
    for code in [1, 2] {
        deck.insert_output(
            key("CMO_SBM"),
            EntitySelector::Submarket(code),
            per_block(|s, b| 100.0 * code as f64 + s as f64 + b as f64),
        );
    }
    for code in PLANTS {
        let c = code as f64;
        deck.insert_output(
            key("VTUR_UHE"),
            EntitySelector::HydroPlant(code),
            per_block(move |s, b| 50.0 * c + s as f64 + 10.0 * b as f64),
        );
        deck.insert_output(
            key("VARMF_UHE"),
            EntitySelector::HydroPlant(code),
            per_stage(move |s| 100.0 * c + 50.0 * s as f64),
        );
    }
    deck
}

/// Stored-energy registry tables for group 1.
pub fn with_stored_energy(deck: InMemoryDeck) -> InMemoryDeck {
    deck.with_stored_energy_capacity(
        (1..=STAGES)
            .map(|s| StoredEnergyCapacityRecord {
                group_code: 1,
                start: month(s),
                max_energy: 100_000.0,
            })
            .collect(),
    )
    .with_security_curve(
        (1..=STAGES)
            .map(|s| SecurityCurveRecord {
                group_code: 1,
                start: month(s),
                percent: 20.0,
            })
            .collect(),
    )
    .with_initial_stored_energy(vec![InitialStoredEnergyRecord {
        group_code: 1,
        value: 38_500.0,
    }])
}

/// Thermal plants 1 (ANGRA 1, SUDESTE, 50..640 MW) and 2 (J. LACERDA, SUL,
/// 0..232 MW) generating `100 * fraction` per block, plus the SUDESTE-SUL
/// exchange: 1000 MWmed forward with p.u. 0.8 in block 1, 600 MWmed back.
pub fn with_thermal_and_exchange(deck: InMemoryDeck) -> InMemoryDeck {
    let thermal = |code: i32, name: &str, submarket_code: i32| ThermalPlantRecord {
        code,
        name: name.into(),
        submarket_code,
    };
    let limits = (1..=STAGES)
        .flat_map(|s| {
            [(1, 50.0, 640.0), (2, 0.0, 232.0)].map(|(plant_code, min, max)| ThermalLimitRecord {
                plant_code,
                start: month(s),
                min_generation: min,
                max_generation: max,
            })
        })
        .collect();
    let exchange = |reverse, limit| ExchangeLimitRecord {
        source_code: 1,
        target_code: 2,
        reverse,
        start: month(1),
        limit,
    };
    let factors = (1..=STAGES)
        .map(|s| ExchangeBlockFactorRecord {
            source_code: 1,
            target_code: 2,
            start: month(s),
            block: 1,
            factor: 0.8,
        })
        .collect();
    let mut deck = deck
        .with_thermal_plants(vec![thermal(1, "ANGRA 1", 1), thermal(2, "J. LACERDA", 2)])
        .with_thermal_limits(limits)
        .with_exchange_limits(vec![exchange(false, 1000.0), exchange(true, 600.0)])
        .with_exchange_block_factors(factors)
        .with_output(
            key("INT_SBP"),
            EntitySelector::SubmarketPair(1, 2),
            per_block(|s, b| 150.0 * b as f64 - 10.0 * s as f64),
        );
    for (code, submarket) in [(1, 1), (2, 2)] {
        let rows = per_block(|_, b| 100.0 * BLOCK_FRACTIONS[b as usize - 1])
            .into_iter()
            .map(|row| row.with_code(code))
            .collect();
        deck.insert_output(key("GTER_UTE"), EntitySelector::ThermalPlantsOf(submarket), rows);
    }
    deck
}

pub struct Run {
    pub exporter: Arc<MemoryExporter>,
    pub report: nwsynth_algo::SynthesisReport,
}

impl Run {
    pub fn frame(&self, name: &str) -> DataFrame {
        self.exporter
            .get(name)
            .unwrap_or_else(|| panic!("{name} was not exported"))
    }
}

pub fn run(deck: InMemoryDeck, requested: &[&str]) -> Run {
    let exporter = Arc::new(MemoryExporter::new());
    let synthesizer = Synthesizer::new(
        Arc::new(deck),
        exporter.clone(),
        &SynthesisConfig::default().with_processors(2),
    )
    .unwrap();
    let requested: Vec<String> = requested.iter().map(|s| s.to_string()).collect();
    let report = synthesizer.synthesize(&requested).unwrap();
    Run { exporter, report }
}
