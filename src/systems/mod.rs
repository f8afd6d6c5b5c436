mod bookkeeping;
pub mod disaster;
mod economy;
mod forest;
mod population;

pub use bookkeeping::{reconcile, BookkeepingSystem, Repairs};
pub use disaster::DisasterSystem;
pub use economy::{settle_day, DailyLedger, EconomySystem};
pub use forest::{grow_forests, ForestSystem};
pub use population::{start_of_month, PopulationSystem};
