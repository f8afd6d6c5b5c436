//! Build catalog and tuning knobs. Every field has a default so scenario files
//! only need to name what they change.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    components::{DisasterState, EntityData, EntityKind, Forest, Influence, Zone},
    geometry::{Footprint, TilePos},
    grid::Blueprint,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureSpec {
    pub price: f64,
    pub maintenance_fee: f64,
    pub width: i32,
    pub height: i32,
}

impl StructureSpec {
    fn new(price: f64, maintenance_fee: f64, width: i32, height: i32) -> Self {
        Self {
            price,
            maintenance_fee,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InfluenceSpec {
    pub radius: i32,
    pub satisfaction: f64,
}

impl From<InfluenceSpec> for Influence {
    fn from(spec: InfluenceSpec) -> Self {
        Influence {
            radius: spec.radius,
            satisfaction: spec.satisfaction,
        }
    }
}

fn default_yearly_growth() -> f64 {
    0.03
}

fn default_mature_year() -> u32 {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestGrowthSpec {
    #[serde(default = "default_yearly_growth")]
    pub yearly_growth: f64,
    #[serde(default = "default_mature_year")]
    pub mature_year: u32,
}

impl Default for ForestGrowthSpec {
    fn default() -> Self {
        Self {
            yearly_growth: default_yearly_growth(),
            mature_year: default_mature_year(),
        }
    }
}

fn default_initial_satisfaction() -> f64 {
    100.0
}

fn default_bankruptcy_penalty() -> f64 {
    0.35
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitizenSpec {
    #[serde(default = "default_initial_satisfaction")]
    pub initial_satisfaction: f64,
    /// Fraction of satisfaction lost by everyone when the treasury is empty
    /// at a month boundary.
    #[serde(default = "default_bankruptcy_penalty")]
    pub bankruptcy_penalty: f64,
}

impl Default for CitizenSpec {
    fn default() -> Self {
        Self {
            initial_satisfaction: default_initial_satisfaction(),
            bankruptcy_penalty: default_bankruptcy_penalty(),
        }
    }
}

fn default_nearby_distance() -> f64 {
    5.0
}

fn default_max_arrivals() -> u32 {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationSpec {
    #[serde(default = "default_nearby_distance")]
    pub nearby_distance: f64,
    #[serde(default = "default_max_arrivals")]
    pub max_arrivals_per_period: u32,
}

impl Default for MigrationSpec {
    fn default() -> Self {
        Self {
            nearby_distance: default_nearby_distance(),
            max_arrivals_per_period: default_max_arrivals(),
        }
    }
}

/// Chance that a random disaster strikes on a game-start anniversary.
pub const YEARLY_DISASTER_PROBABILITY: f64 = 0.01;

fn default_yearly_probability() -> f64 {
    YEARLY_DISASTER_PROBABILITY
}

fn default_cascade_delay_days() -> i64 {
    30
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterSpec {
    #[serde(default = "default_yearly_probability")]
    pub yearly_probability: f64,
    #[serde(default = "default_cascade_delay_days")]
    pub cascade_delay_days: i64,
}

impl Default for DisasterSpec {
    fn default() -> Self {
        Self {
            yearly_probability: default_yearly_probability(),
            cascade_delay_days: default_cascade_delay_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub road: StructureSpec,
    pub police_department: StructureSpec,
    pub stadium: StructureSpec,
    pub forest: StructureSpec,
    pub disaster: StructureSpec,
    pub residential_zone: StructureSpec,
    pub industrial_zone: StructureSpec,
    pub service_zone: StructureSpec,
    pub police_influence: InfluenceSpec,
    pub stadium_influence: InfluenceSpec,
    pub forest_influence: InfluenceSpec,
    /// Zone capacity indexed by level - 1.
    pub zone_capacity: [u32; 3],
    /// Revenue accrued per occupant per day by work zones.
    pub work_revenue_per_occupant: f64,
    pub forest_growth: ForestGrowthSpec,
    pub citizens: CitizenSpec,
    pub migration: MigrationSpec,
    pub disasters: DisasterSpec,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            road: StructureSpec::new(75.0, 18.0, 1, 1),
            police_department: StructureSpec::new(500.0, 250.0, 2, 2),
            stadium: StructureSpec::new(600.0, 300.0, 4, 4),
            forest: StructureSpec::new(500.0, 500.0, 1, 1),
            disaster: StructureSpec::new(0.0, 0.0, 4, 4),
            residential_zone: StructureSpec::new(100.0, 200.0, 4, 4),
            industrial_zone: StructureSpec::new(300.0, 500.0, 4, 4),
            service_zone: StructureSpec::new(200.0, 400.0, 4, 4),
            police_influence: InfluenceSpec {
                radius: 4,
                satisfaction: 0.15,
            },
            stadium_influence: InfluenceSpec {
                radius: 6,
                satisfaction: 0.20,
            },
            forest_influence: InfluenceSpec {
                radius: 3,
                satisfaction: 0.10,
            },
            zone_capacity: [20, 40, 60],
            work_revenue_per_occupant: 2.0,
            forest_growth: ForestGrowthSpec::default(),
            citizens: CitizenSpec::default(),
            migration: MigrationSpec::default(),
            disasters: DisasterSpec::default(),
        }
    }
}

impl Catalog {
    pub fn spec(&self, kind: EntityKind) -> &StructureSpec {
        match kind {
            EntityKind::Road => &self.road,
            EntityKind::PoliceDepartment => &self.police_department,
            EntityKind::Stadium => &self.stadium,
            EntityKind::Forest => &self.forest,
            EntityKind::Disaster => &self.disaster,
            EntityKind::ResidentialZone => &self.residential_zone,
            EntityKind::IndustrialZone => &self.industrial_zone,
            EntityKind::ServiceZone => &self.service_zone,
        }
    }

    pub fn capacity_for_level(&self, level: u8) -> u32 {
        let index = usize::from(level.clamp(1, 3)) - 1;
        self.zone_capacity[index]
    }

    /// A fresh, unplaced entity of `kind` whose footprint starts at `origin`.
    pub fn blueprint(&self, kind: EntityKind, origin: TilePos, created: NaiveDate) -> Blueprint {
        let spec = self.spec(kind);
        let work_zone = || Zone::new(self.capacity_for_level(1), self.work_revenue_per_occupant);
        let data = match kind {
            EntityKind::Road => EntityData::Road,
            EntityKind::PoliceDepartment => EntityData::PoliceDepartment(self.police_influence.into()),
            EntityKind::Stadium => EntityData::Stadium(self.stadium_influence.into()),
            EntityKind::Forest => EntityData::Forest(Forest {
                influence: self.forest_influence.into(),
                year: 1,
                mature: false,
            }),
            EntityKind::Disaster => EntityData::Disaster(DisasterState::default()),
            EntityKind::ResidentialZone => {
                EntityData::ResidentialZone(Zone::new(self.capacity_for_level(1), 0.0))
            }
            EntityKind::IndustrialZone => EntityData::IndustrialZone(work_zone()),
            EntityKind::ServiceZone => EntityData::ServiceZone(work_zone()),
        };
        Blueprint {
            footprint: Footprint::new(origin, spec.width, spec.height),
            created,
            price: spec.price,
            maintenance_fee: spec.maintenance_fee,
            data,
        }
    }
}
