//! Node access helpers shared by the systems.
//!
//! hecs tracks borrows per component column, so two `&mut Node` borrows on
//! different entities conflict. Pairwise systems copy both nodes out, work
//! on the copies and write them back.

use hecs::{Entity, World};
use ventwork_logic::node::Node;

/// Copy of a node's state, if the entity exists and is a node.
pub fn read_node(world: &World, entity: Entity) -> Option<Node> {
    world.get::<&Node>(entity).ok().map(|node| *node)
}

/// Overwrite a node's state. Returns false when the entity is gone.
pub fn write_node(world: &World, entity: Entity, node: Node) -> bool {
    match world.get::<&mut Node>(entity) {
        Ok(mut slot) => {
            *slot = node;
            true
        }
        Err(_) => false,
    }
}

/// Run `f` on two distinct nodes and store the results.
///
/// `None` when either entity is missing or both are the same entity.
pub fn with_node_pair<R>(
    world: &World,
    a: Entity,
    b: Entity,
    f: impl FnOnce(&mut Node, &mut Node) -> R,
) -> Option<R> {
    if a == b {
        return None;
    }
    let mut node_a = read_node(world, a)?;
    let mut node_b = read_node(world, b)?;
    let result = f(&mut node_a, &mut node_b);
    write_node(world, a, node_a);
    write_node(world, b, node_b);
    Some(result)
}

/// Entities carrying component `T`, in entity index order.
///
/// The order is deterministic for a given world. hecs reuses the index of a
/// despawned entity, so it is not creation order once anything was removed.
pub fn sorted_entities<T: hecs::Component>(world: &World) -> Vec<Entity> {
    let mut entities: Vec<Entity> = world.query::<&T>().iter().map(|(e, _)| e).collect();
    entities.sort_by_key(|e| e.id());
    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_requires_distinct_existing_nodes() {
        let mut world = World::new();
        let a = world.spawn((Node::default(),));
        let b = world.spawn((Node::default(),));
        let missing = world.spawn(());
        assert!(with_node_pair(&world, a, a, |_, _| ()).is_none());
        assert!(with_node_pair(&world, a, missing, |_, _| ()).is_none());
        assert!(with_node_pair(&world, a, b, |_, _| ()).is_some());
    }

    #[test]
    fn test_pair_writes_back() {
        let mut world = World::new();
        let a = world.spawn((Node::new(100.0, 293.0, 1.0),));
        let b = world.spawn((Node::new(100.0, 293.0, 1.0),));
        with_node_pair(&world, a, b, |na, nb| {
            na.set_temperature(400.0);
            nb.set_temperature(200.0);
        });
        assert_eq!(read_node(&world, a).map(|n| n.temperature()), Some(400.0));
        assert_eq!(read_node(&world, b).map(|n| n.temperature()), Some(200.0));
    }

    #[test]
    fn test_sorted_by_index_not_spawn_time() {
        let mut world = World::new();
        let a = world.spawn((Node::default(),));
        let b = world.spawn((Node::default(),));
        world.despawn(a).unwrap();
        let c = world.spawn((Node::default(),));

        assert_eq!(c.id(), a.id());
        assert_eq!(sorted_entities::<Node>(&world), vec![c, b]);
    }
}
