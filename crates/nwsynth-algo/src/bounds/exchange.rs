//! Exchange bounds between submarket pairs.
//!
//! The limit of a direction in one block is `limit * p.u. factor * hours`,
//! matching the energy unit of the printed exchanges. Block 0 carries the sum
//! over the real blocks. The forward limit of a pair is its upper bound and
//! the negated reverse limit its lower bound.

use std::collections::HashMap;

use chrono::NaiveDate;

use nwsynth_core::time::first_of_month;
use nwsynth_core::{Entity, SynthResult};
use nwsynth_io::{required, tables, ExchangeLimitRecord};

use super::grid::{BoundGrid, UNBOUNDED};
use super::BoundsContext;
use crate::temporal::Calendar;

struct DirectedLimits<'a> {
    limits: &'a [ExchangeLimitRecord],
    factors: HashMap<(i32, i32, NaiveDate, u32), f64>,
    calendar: &'a Calendar,
}

impl DirectedLimits<'_> {
    /// Average limit from `from` to `to` in force at `start`.
    fn in_force(&self, from: i32, to: i32, start: NaiveDate) -> Option<f64> {
        self.limits
            .iter()
            .filter(|r| r.direction() == (from, to) && first_of_month(r.start) <= start)
            .max_by_key(|r| r.start)
            .map(|r| r.limit)
    }

    fn block_limit(
        &self,
        from: i32,
        to: i32,
        start: NaiveDate,
        block: u32,
    ) -> SynthResult<Option<f64>> {
        let Some(limit) = self.in_force(from, to, start) else {
            return Ok(None);
        };
        if block == 0 {
            let mut total = 0.0;
            for real in 1..=self.calendar.case().blocks {
                total += self.block_limit(from, to, start, real)?.unwrap_or(0.0);
            }
            return Ok(Some(total));
        }
        let factor = self
            .factors
            .get(&(from, to, start, block))
            .copied()
            .unwrap_or(1.0);
        Ok(Some(limit * factor * self.calendar.block_hours(start, block)?))
    }
}

pub fn exchange(ctx: &BoundsContext<'_>) -> SynthResult<BoundGrid> {
    let limits = required(tables::EXCHANGE_LIMITS, ctx.deck.exchange_limits())?;
    let factors = required(tables::EXCHANGE_BLOCK_FACTORS, ctx.deck.exchange_block_factors())?;
    let directed = DirectedLimits {
        limits: &limits,
        factors: factors
            .iter()
            .map(|f| {
                (
                    (f.source_code, f.target_code, first_of_month(f.start), f.block),
                    f.factor,
                )
            })
            .collect(),
        calendar: ctx.calendar,
    };

    let mut grid = ctx.grid();
    grid.try_map(|entity, start, block, _| {
        let Entity::SubmarketPair {
            source_code,
            target_code,
            ..
        } = entity
        else {
            return Ok(UNBOUNDED);
        };
        let upper = directed
            .block_limit(*source_code, *target_code, start, block)?
            .unwrap_or(f64::INFINITY);
        let lower = directed
            .block_limit(*target_code, *source_code, start, block)?
            .map_or(f64::NEG_INFINITY, |limit| -limit);
        Ok((lower, upper))
    })?;
    Ok(grid)
}
