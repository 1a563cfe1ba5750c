//! Leak-group system (step 6).

use hecs::{Entity, World};
use ventwork_logic::leak::{equalize, leak_fraction};
use ventwork_logic::node::Node;

use super::access::{read_node, sorted_entities, write_node};
use crate::components::LeakGroup;

/// Relax every unsealed group toward its pooled state.
///
/// Members that no longer exist are skipped; a group whose exterior is gone
/// does nothing. Returns how many groups exchanged gas.
pub fn leak_system(world: &mut World, dt: f64) -> usize {
    let mut leaked = 0;

    for entity in sorted_entities::<LeakGroup>(world) {
        let Ok(group) = world.get::<&LeakGroup>(entity).map(|g| (*g).clone()) else {
            continue;
        };
        if !group.is_leaking() {
            continue;
        }
        let Some(exterior) = group.exterior else {
            continue;
        };

        let mut participants: Vec<Entity> = Vec::with_capacity(group.members.len() + 1);
        for member in group.members.iter().copied().chain(std::iter::once(exterior)) {
            if !participants.contains(&member) {
                participants.push(member);
            }
        }

        let mut nodes: Vec<Node> = Vec::with_capacity(participants.len());
        let mut present: Vec<Entity> = Vec::with_capacity(participants.len());
        for p in &participants {
            if let Some(node) = read_node(world, *p) {
                nodes.push(node);
                present.push(*p);
            }
        }
        if !present.contains(&exterior) || present.len() < 2 {
            continue;
        }

        if equalize(&mut nodes, leak_fraction(group.leak_rate, dt)) {
            for (e, node) in present.iter().zip(nodes) {
                write_node(world, *e, node);
            }
            leaked += 1;
        }
    }

    leaked
}

#[cfg(test)]
mod tests {
    use super::*;
    use ventwork_logic::gas::{Gas, GasMixture};

    fn spawn(world: &mut World, gas: Gas, moles: f64, temperature: f64) -> Entity {
        world.spawn((Node::from_mixture(GasMixture::from_moles(
            [(gas, moles)],
            temperature,
            1.0,
        )),))
    }

    #[test]
    fn test_unsealed_group_mixes_with_exterior() {
        let mut world = World::new();
        let room = spawn(&mut world, Gas::Oxygen, 10.0, 300.0);
        let outside = spawn(&mut world, Gas::CarbonDioxide, 10.0, 200.0);
        world.spawn((LeakGroup::new(vec![room], Some(outside), 1.0),));

        assert_eq!(leak_system(&mut world, 0.1), 1);
        let node = *world.get::<&Node>(room).unwrap();
        assert!(node.mixture.moles(Gas::CarbonDioxide) > 0.0);
        assert!(node.temperature() < 300.0);
    }

    #[test]
    fn test_sealed_group_is_untouched() {
        let mut world = World::new();
        let room = spawn(&mut world, Gas::Oxygen, 10.0, 300.0);
        let outside = spawn(&mut world, Gas::CarbonDioxide, 10.0, 200.0);
        let mut group = LeakGroup::new(vec![room], Some(outside), 1.0);
        group.set_sealed(true);
        world.spawn((group,));

        let before = *world.get::<&Node>(room).unwrap();
        assert_eq!(leak_system(&mut world, 0.1), 0);
        assert_eq!(*world.get::<&Node>(room).unwrap(), before);
    }

    #[test]
    fn test_missing_exterior_is_noop() {
        let mut world = World::new();
        let room = spawn(&mut world, Gas::Oxygen, 10.0, 300.0);
        let outside = spawn(&mut world, Gas::CarbonDioxide, 10.0, 200.0);
        world.spawn((LeakGroup::new(vec![room], Some(outside), 1.0),));
        world.despawn(outside).unwrap();
        assert_eq!(leak_system(&mut world, 0.1), 0);
    }
}
