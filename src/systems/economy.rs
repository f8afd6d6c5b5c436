use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::{
    components::{EntityKind, ObjectId},
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

const DAYS_PER_QUARTER: i64 = 90;
const DAYS_PER_YEAR: i64 = 365;

/// Money that changed hands during one settled day.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DailyLedger {
    pub maintenance: f64,
    pub taxes: f64,
}

fn completes(age: i64, period: i64) -> bool {
    age != 0 && age % period == 0
}

/// Charges maintenance that falls due on `date`, accrues work-zone revenue and
/// collects yearly taxes.
pub fn settle_day(world: &mut World, date: NaiveDate) -> DailyLedger {
    let tax_rate = world.tax_rate();
    let mut ledger = DailyLedger::default();
    let ids: Vec<ObjectId> = world.grid.ids();
    for id in ids {
        let Some(entity) = world.grid.get_mut(id) else {
            continue;
        };
        let age = (date - entity.created).num_days();
        let fee = entity.maintenance_fee;
        match entity.kind() {
            EntityKind::Disaster => {}
            EntityKind::Road | EntityKind::PoliceDepartment | EntityKind::Stadium => {
                if completes(age, DAYS_PER_YEAR) {
                    ledger.maintenance += fee;
                }
            }
            EntityKind::Forest => {
                let mature = entity.forest().is_some_and(|forest| forest.mature);
                if mature && completes(age, DAYS_PER_YEAR) {
                    ledger.maintenance += fee;
                }
            }
            kind => {
                if completes(age, DAYS_PER_QUARTER) {
                    ledger.maintenance += fee;
                }
                if !kind.is_work_zone() {
                    continue;
                }
                let Some(zone) = entity.zone_mut() else {
                    continue;
                };
                zone.accrued_revenue += zone.money_per_day * f64::from(zone.occupancy());
                if completes(age, DAYS_PER_YEAR) {
                    let tax = zone.accrued_revenue * tax_rate;
                    debug!(%id, accrued = zone.accrued_revenue, tax, "work zone taxed");
                    ledger.taxes += tax;
                    zone.accrued_revenue = 0.0;
                }
            }
        }
    }
    world.wallet.charge(ledger.maintenance);
    world.wallet.deposit(ledger.taxes);
    if ledger.maintenance > 0.0 || ledger.taxes > 0.0 {
        info!(
            %date,
            maintenance = ledger.maintenance,
            taxes = ledger.taxes,
            money = world.wallet.balance(),
            "settled day"
        );
    }
    ledger
}

pub struct EconomySystem;

impl EconomySystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EconomySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for EconomySystem {
    fn name(&self) -> &str {
        "economy"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        settle_day(world, ctx.date);
        Ok(())
    }
}
