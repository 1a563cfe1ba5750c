//! Hazard pass: re-evaluate every monitor against its node.

use hecs::World;
use ventwork_logic::hazards::{assess_hazard, HazardReport};

use super::access::read_node;
use crate::components::{HazardMonitor, NodeLabel};

/// Refresh every monitor's report. Returns how many changed level.
pub fn hazard_system(world: &mut World) -> usize {
    let mut reports = Vec::new();
    for (entity, monitor) in world.query::<&HazardMonitor>().iter() {
        let report = match read_node(world, monitor.node) {
            Some(node) => assess_hazard(&node, &monitor.thresholds),
            None => HazardReport::no_atmosphere(),
        };
        let name = world
            .get::<&NodeLabel>(monitor.node)
            .map(|l| l.name.clone())
            .unwrap_or_else(|_| "<missing node>".to_string());
        reports.push((entity, report, name));
    }

    let mut transitions = 0;
    for (entity, report, name) in reports {
        if let Ok(mut monitor) = world.get::<&mut HazardMonitor>(entity) {
            if monitor.report.level != report.level {
                log::info!(
                    "hazard at {}: {} -> {}",
                    name,
                    monitor.report.level,
                    report.level
                );
                transitions += 1;
            }
            monitor.report = report;
        }
    }
    transitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use ventwork_logic::gas::{Gas, GasMixture};
    use ventwork_logic::hazards::HazardLevel;
    use ventwork_logic::node::Node;

    #[test]
    fn test_monitor_tracks_node() {
        let mut world = World::new();
        let air = GasMixture::from_moles([(Gas::Nitrogen, 33.0), (Gas::Oxygen, 8.6)], 293.0, 1.0);
        let room = world.spawn((Node::from_mixture(air), NodeLabel::new("Galley")));
        let monitor = world.spawn((HazardMonitor::new(room),));

        assert_eq!(hazard_system(&mut world), 0);
        assert_eq!(
            world.get::<&HazardMonitor>(monitor).unwrap().level(),
            HazardLevel::Safe
        );

        world.get::<&mut Node>(room).unwrap().set_pressure(5.0);
        assert_eq!(hazard_system(&mut world), 1);
        assert_eq!(
            world.get::<&HazardMonitor>(monitor).unwrap().level(),
            HazardLevel::Critical
        );
    }

    #[test]
    fn test_missing_node_reports_no_atmosphere() {
        let mut world = World::new();
        let room = world.spawn((Node::default(),));
        let monitor = world.spawn((HazardMonitor::new(room),));
        world.despawn(room).unwrap();
        hazard_system(&mut world);
        let m = world.get::<&HazardMonitor>(monitor).unwrap();
        assert_eq!(m.level(), HazardLevel::Critical);
        assert!(!m.report.is_safe_for_humans());
    }
}
