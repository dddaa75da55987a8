//! Unit tags and the process-wide name lookup.
//!
//! Prefabs name their unit type with a string. The lookup table is built on
//! first use and never changes afterwards, so it is a `OnceLock` and safe to
//! query from any thread.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Coarse unit classification used by the stuck resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitTag {
    CivilCar,
    CivilTruck,
    CivilBus,
    CivilPerson,
    Ambulance,
    Doctor,
    FireTruck,
    Firefighter,
    PoliceCar,
    Police,
    TechVehicle,
    Helicopter,
}

impl UnitTag {
    const NAMES: [(&'static str, UnitTag); 12] = [
        ("civil_car", UnitTag::CivilCar),
        ("civil_truck", UnitTag::CivilTruck),
        ("civil_bus", UnitTag::CivilBus),
        ("civil_person", UnitTag::CivilPerson),
        ("ambulance", UnitTag::Ambulance),
        ("doctor", UnitTag::Doctor),
        ("fire_truck", UnitTag::FireTruck),
        ("firefighter", UnitTag::Firefighter),
        ("police_car", UnitTag::PoliceCar),
        ("police", UnitTag::Police),
        ("tech_vehicle", UnitTag::TechVehicle),
        ("helicopter", UnitTag::Helicopter),
    ];

    fn registry() -> &'static HashMap<&'static str, UnitTag> {
        static REGISTRY: OnceLock<HashMap<&'static str, UnitTag>> = OnceLock::new();
        REGISTRY.get_or_init(|| Self::NAMES.into_iter().collect())
    }

    /// Look a tag up by its prefab name.
    pub fn from_name(name: &str) -> Option<UnitTag> {
        Self::registry().get(name).copied()
    }

    pub fn name(self) -> &'static str {
        Self::NAMES
            .iter()
            .find(|(_, tag)| *tag == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }

    /// Ambient traffic the game may remove when it gets hopelessly stuck.
    pub fn is_civilian_traffic(self) -> bool {
        matches!(
            self,
            UnitTag::CivilCar | UnitTag::CivilTruck | UnitTag::CivilBus | UnitTag::CivilPerson
        )
    }

    /// Player-controlled emergency units.
    pub fn is_emergency_unit(self) -> bool {
        !self.is_civilian_traffic()
    }
}
