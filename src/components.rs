use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::geometry::{Footprint, TilePos};

pub const MIN_SATISFACTION: f64 = 0.0;
pub const MAX_SATISFACTION: f64 = 100.0;
pub const MAX_ZONE_LEVEL: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub(crate) u64);

impl ObjectId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CitizenId(pub(crate) u64);

impl CitizenId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CitizenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "citizen-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Road,
    PoliceDepartment,
    Stadium,
    Forest,
    Disaster,
    ResidentialZone,
    IndustrialZone,
    ServiceZone,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Road,
        EntityKind::PoliceDepartment,
        EntityKind::Stadium,
        EntityKind::Forest,
        EntityKind::Disaster,
        EntityKind::ResidentialZone,
        EntityKind::IndustrialZone,
        EntityKind::ServiceZone,
    ];

    pub fn is_zone(self) -> bool {
        matches!(
            self,
            EntityKind::ResidentialZone | EntityKind::IndustrialZone | EntityKind::ServiceZone
        )
    }

    pub fn is_work_zone(self) -> bool {
        matches!(self, EntityKind::IndustrialZone | EntityKind::ServiceZone)
    }

    pub fn affects_satisfaction(self) -> bool {
        matches!(
            self,
            EntityKind::PoliceDepartment | EntityKind::Stadium | EntityKind::Forest
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Road => "Road",
            EntityKind::PoliceDepartment => "PoliceDepartment",
            EntityKind::Stadium => "Stadium",
            EntityKind::Forest => "Forest",
            EntityKind::Disaster => "Disaster",
            EntityKind::ResidentialZone => "ResidentialZone",
            EntityKind::IndustrialZone => "IndustrialZone",
            EntityKind::ServiceZone => "ServiceZone",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Radius-bounded satisfaction effect of a structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Influence {
    pub radius: i32,
    pub satisfaction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    pub influence: Influence,
    pub year: u32,
    pub mature: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisasterState {
    pub linked: Vec<ObjectId>,
}

/// Decorative sub-object drawn on top of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingStyle {
    House(u8),
    Workplace { level: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub tile: TilePos,
    pub style: BuildingStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub level: u8,
    pub capacity: u32,
    pub money_per_day: f64,
    pub accrued_revenue: f64,
    pub occupants: Vec<CitizenId>,
    pub buildings: Vec<Building>,
}

impl Zone {
    pub fn new(capacity: u32, money_per_day: f64) -> Self {
        Self {
            level: 1,
            capacity,
            money_per_day,
            accrued_revenue: 0.0,
            occupants: Vec::new(),
            buildings: Vec::new(),
        }
    }

    pub fn occupancy(&self) -> u32 {
        self.occupants.len() as u32
    }

    pub fn spare_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.occupancy())
    }

    pub fn has_room(&self) -> bool {
        self.occupancy() < self.capacity
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityData {
    Road,
    PoliceDepartment(Influence),
    Stadium(Influence),
    Forest(Forest),
    Disaster(DisasterState),
    ResidentialZone(Zone),
    IndustrialZone(Zone),
    ServiceZone(Zone),
}

impl EntityData {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityData::Road => EntityKind::Road,
            EntityData::PoliceDepartment(_) => EntityKind::PoliceDepartment,
            EntityData::Stadium(_) => EntityKind::Stadium,
            EntityData::Forest(_) => EntityKind::Forest,
            EntityData::Disaster(_) => EntityKind::Disaster,
            EntityData::ResidentialZone(_) => EntityKind::ResidentialZone,
            EntityData::IndustrialZone(_) => EntityKind::IndustrialZone,
            EntityData::ServiceZone(_) => EntityKind::ServiceZone,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: ObjectId,
    pub footprint: Footprint,
    pub created: NaiveDate,
    pub price: f64,
    pub maintenance_fee: f64,
    pub data: EntityData,
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        self.data.kind()
    }

    pub fn origin(&self) -> TilePos {
        self.footprint.origin
    }

    pub fn zone(&self) -> Option<&Zone> {
        match &self.data {
            EntityData::ResidentialZone(zone)
            | EntityData::IndustrialZone(zone)
            | EntityData::ServiceZone(zone) => Some(zone),
            _ => None,
        }
    }

    pub fn zone_mut(&mut self) -> Option<&mut Zone> {
        match &mut self.data {
            EntityData::ResidentialZone(zone)
            | EntityData::IndustrialZone(zone)
            | EntityData::ServiceZone(zone) => Some(zone),
            _ => None,
        }
    }

    pub fn influence(&self) -> Option<&Influence> {
        match &self.data {
            EntityData::PoliceDepartment(influence) | EntityData::Stadium(influence) => {
                Some(influence)
            }
            EntityData::Forest(forest) => Some(&forest.influence),
            _ => None,
        }
    }

    pub fn forest(&self) -> Option<&Forest> {
        match &self.data {
            EntityData::Forest(forest) => Some(forest),
            _ => None,
        }
    }

    pub fn forest_mut(&mut self) -> Option<&mut Forest> {
        match &mut self.data {
            EntityData::Forest(forest) => Some(forest),
            _ => None,
        }
    }

    pub fn disaster(&self) -> Option<&DisasterState> {
        match &self.data {
            EntityData::Disaster(state) => Some(state),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citizen {
    pub id: CitizenId,
    pub satisfaction: f64,
    pub home: Option<ObjectId>,
    pub work: Option<ObjectId>,
}

impl Citizen {
    pub fn is_valid(&self) -> bool {
        self.home.is_some() || self.work.is_some()
    }

    pub fn is_unemployed(&self) -> bool {
        self.work.is_none()
    }
}

/// The player's money. A negative balance is a game state, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    money: f64,
}

impl Wallet {
    pub fn new(money: f64) -> Self {
        Self { money }
    }

    pub fn balance(&self) -> f64 {
        self.money
    }

    pub fn deposit(&mut self, amount: f64) {
        self.money += amount;
    }

    pub fn charge(&mut self, amount: f64) {
        self.money -= amount;
    }

    pub fn is_bankrupt(&self) -> bool {
        self.money <= 0.0
    }
}
