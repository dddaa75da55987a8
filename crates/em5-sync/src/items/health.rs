//! Health replication.

use crate::bit_stream::{BitReader, BitWriter};
use crate::change::ChangeDetector;
use crate::existence::{ComponentExistenceTracking, ComponentFields};
use crate::SyncError;

/// Life energy of a person or vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthComponent {
    pub life_energy: f32,
    pub invincible: bool,
}

impl Default for HealthComponent {
    fn default() -> Self {
        Self {
            life_energy: 100.0,
            invincible: false,
        }
    }
}

/// Wire order: `life_energy`, `invincible`.
#[derive(Debug, Default)]
pub struct HealthFields {
    life_energy: ChangeDetector<f32>,
    invincible: ChangeDetector<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthDelta {
    pub life_energy: Option<f32>,
    pub invincible: Option<bool>,
}

pub type HealthData = ComponentExistenceTracking<HealthFields>;

impl ComponentFields for HealthFields {
    type Component = HealthComponent;
    type Delta = HealthDelta;

    const COMPONENT_NAME: &'static str = "health";

    fn observe(&mut self, component: &HealthComponent) -> bool {
        let life_energy = self.life_energy.observe(component.life_energy);
        let invincible = self.invincible.observe(component.invincible);
        life_energy || invincible
    }

    fn write(&self, writer: &mut BitWriter, force: bool) {
        self.life_energy.write(writer, force);
        self.invincible.write(writer, force);
    }

    fn commit(&mut self) {
        self.life_energy.commit();
        self.invincible.commit();
    }

    fn changed_fields(&self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.life_energy.is_changed() {
            changed.push("life_energy");
        }
        if self.invincible.is_changed() {
            changed.push("invincible");
        }
        changed
    }

    fn read(reader: &mut BitReader<'_>) -> Result<HealthDelta, SyncError> {
        Ok(HealthDelta {
            life_energy: ChangeDetector::read(reader)?,
            invincible: ChangeDetector::read(reader)?,
        })
    }

    fn apply(delta: &HealthDelta, component: &mut HealthComponent) {
        if let Some(life_energy) = delta.life_energy {
            component.life_energy = life_energy;
        }
        if let Some(invincible) = delta.invincible {
            component.invincible = invincible;
        }
    }
}
