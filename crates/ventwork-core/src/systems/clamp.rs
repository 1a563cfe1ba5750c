//! Clamp pass (step 8): pull degenerate nodes back inside safe bounds.

use std::collections::HashSet;

use hecs::{Entity, World};
use ventwork_logic::node::{Node, SafetyFloors};

use crate::components::NodeLabel;

/// Nodes whose clamping has already been logged at warn level.
///
/// A node held at a floor (a vacuum reservoir, an exposed zone under a
/// vacuum ambient) is clamped every tick; only the first one is a warning.
#[derive(Debug, Clone, Default)]
pub struct ClampLog {
    reported: HashSet<Entity>,
}

impl ClampLog {
    pub fn is_reported(&self, entity: Entity) -> bool {
        self.reported.contains(&entity)
    }

    pub fn clear(&mut self) {
        self.reported.clear();
    }
}

/// Clamp every node. Returns how many nodes needed it.
pub fn clamp_system(world: &mut World, floors: &SafetyFloors, clamp_log: &mut ClampLog) -> usize {
    if !clamp_log.reported.is_empty() {
        clamp_log.reported.retain(|e| world.contains(*e));
    }

    let mut clamped = 0;
    for (entity, (node, label)) in world.query_mut::<(&mut Node, Option<&NodeLabel>)>() {
        let report = node.clamp_to_safe_values(floors);
        if report.any() {
            clamped += 1;
            let name = label.map(|l| l.name.as_str()).unwrap_or("unnamed node");
            if clamp_log.reported.insert(entity) {
                log::warn!("clamped {} ({:?}): {}", name, entity, report.describe());
            } else {
                log::debug!("clamped {} ({:?}): {}", name, entity, report.describe());
            }
        }
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use ventwork_logic::gas::GasMixture;

    #[test]
    fn test_healthy_nodes_untouched() {
        let mut world = World::new();
        world.spawn((Node::new(101.3, 293.0, 1.0), NodeLabel::new("Lab")));
        assert_eq!(clamp_system(&mut world, &SafetyFloors::default(), &mut ClampLog::default()), 0);
    }

    #[test]
    fn test_nan_energy_is_clamped() {
        let mut world = World::new();
        let e = world.spawn((Node::new(101.3, 293.0, 1.0),));
        world.get::<&mut Node>(e).unwrap().thermal.internal_energy = f64::NAN;

        assert_eq!(clamp_system(&mut world, &SafetyFloors::default(), &mut ClampLog::default()), 1);
        let node = *world.get::<&Node>(e).unwrap();
        assert!(node.temperature().is_finite());
        assert!(node.internal_energy().is_finite());
    }

    #[test]
    fn test_repeat_clamps_are_remembered() {
        let mut world = World::new();
        let floors = SafetyFloors::default();
        let mut clamp_log = ClampLog::default();
        let vacuum = world.spawn((
            Node::from_mixture(GasMixture::empty(3.0, 1.0)),
            NodeLabel::new("Reservoir"),
        ));

        assert_eq!(clamp_system(&mut world, &floors, &mut clamp_log), 1);
        assert!(clamp_log.is_reported(vacuum));

        world.get::<&mut Node>(vacuum).unwrap().mixture.clear();
        assert_eq!(clamp_system(&mut world, &floors, &mut clamp_log), 1);
        assert!(clamp_log.is_reported(vacuum));

        world.despawn(vacuum).unwrap();
        clamp_system(&mut world, &floors, &mut clamp_log);
        assert!(!clamp_log.is_reported(vacuum));
    }
}
