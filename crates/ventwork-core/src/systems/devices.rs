//! Device systems: scrubbers and canisters (step 7).

use hecs::World;
use ventwork_logic::gas::Gas;
use ventwork_logic::node::Node;
use ventwork_logic::transfer::transfer_moles;

use super::access::{read_node, sorted_entities, write_node};
use crate::components::{Canister, CanisterMode, Scrubber};

/// Canisters stop emptying below this many moles.
const CANISTER_EMPTY_MOLES: f64 = 0.001;
/// Fill and equalize flow per kPa of pressure difference.
const CANISTER_PRESSURE_GAIN: f64 = 0.01;
/// Largest fraction of a canister released per tick.
const CANISTER_EMPTY_FRACTION: f64 = 0.1;
/// Equalize leaves differences smaller than this alone, kPa.
const CANISTER_EQUALIZE_DEADBAND: f64 = 0.1;

/// Run every scrubber. Returns total CO2 removed this tick, mol.
///
/// CO2 is removed and O2 added without touching internal energy; the node's
/// temperature is then re-derived from the unchanged energy.
pub fn scrubber_system(world: &mut World, dt: f64) -> f64 {
    let mut removed_total = 0.0;
    let mut updates = Vec::new();

    for (entity, scrubber) in world.query::<&Scrubber>().iter() {
        if !scrubber.is_running() {
            continue;
        }
        let Some(mut node) = read_node(world, scrubber.node) else {
            updates.push((entity, false, 0.0, 0.0));
            continue;
        };
        let co2 = node.mixture.moles(Gas::CarbonDioxide);
        let amount = (scrubber.scrub_rate * dt).min(co2);
        if !(amount > 0.0) {
            updates.push((entity, false, 0.0, 0.0));
            continue;
        }

        let removed = node.mixture.remove(Gas::CarbonDioxide, amount);
        let produced = if scrubber.produces_oxygen {
            let o2 = removed * scrubber.oxygen_ratio;
            node.mixture.add(Gas::Oxygen, o2);
            o2
        } else {
            0.0
        };
        node.sync_temperature_from_energy();
        write_node(world, scrubber.node, node);

        removed_total += removed;
        updates.push((entity, true, removed, produced));
    }

    for (entity, operational, removed, produced) in updates {
        if let Ok(mut s) = world.get::<&mut Scrubber>(entity) {
            s.operational = operational;
            s.total_scrubbed += removed;
            s.total_produced += produced;
        }
    }
    removed_total
}

/// Run every connected canister in its current mode. Returns moles moved.
pub fn canister_system(world: &mut World, dt: f64) -> f64 {
    let mut moved_total = 0.0;
    for entity in sorted_entities::<Canister>(world) {
        let Ok(mut canister) = world.get::<&Canister>(entity).map(|c| *c) else {
            continue;
        };
        let Some(node_entity) = canister.node else {
            continue;
        };
        let Some(mut node) = read_node(world, node_entity) else {
            continue;
        };

        let moved = step_canister(&mut canister, &mut node, dt);
        if moved == 0.0 {
            continue;
        }
        moved_total += moved;
        write_node(world, node_entity, node);
        if let Ok(mut slot) = world.get::<&mut Canister>(entity) {
            *slot = canister;
        }
    }
    moved_total
}

/// One tick of a canister against its node. Returns moles moved (unsigned).
pub fn step_canister(canister: &mut Canister, node: &mut Node, dt: f64) -> f64 {
    match canister.mode {
        CanisterMode::Manual => 0.0,
        CanisterMode::Fill => {
            let inside = canister.pressure();
            let outside = node.pressure();
            if inside >= canister.max_pressure || outside <= inside {
                return 0.0;
            }
            let request =
                (canister.transfer_rate * dt).min((outside - inside) * CANISTER_PRESSURE_GAIN);
            let moved = transfer_moles(node, &mut canister.store, request).moles;
            canister.total_filled += moved;
            moved
        }
        CanisterMode::Empty => {
            let stored = canister.store.total_moles();
            if canister.store.mixture.is_empty() || stored <= CANISTER_EMPTY_MOLES {
                return 0.0;
            }
            let request = (canister.transfer_rate * dt).min(stored * CANISTER_EMPTY_FRACTION);
            let moved = transfer_moles(&mut canister.store, node, request).moles;
            canister.total_emptied += moved;
            moved
        }
        CanisterMode::Equalize => {
            let diff = canister.pressure() - node.pressure();
            if diff.abs() < CANISTER_EQUALIZE_DEADBAND {
                return 0.0;
            }
            let request = diff.abs() * CANISTER_PRESSURE_GAIN * dt;
            if diff > 0.0 {
                let moved = transfer_moles(&mut canister.store, node, request).moles;
                canister.total_emptied += moved;
                moved
            } else {
                let moved = transfer_moles(node, &mut canister.store, request).moles;
                canister.total_filled += moved;
                moved
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ventwork_logic::gas::GasMixture;

    fn stale_room() -> Node {
        Node::from_mixture(GasMixture::from_moles(
            [(Gas::Nitrogen, 30.0), (Gas::Oxygen, 8.0), (Gas::CarbonDioxide, 2.0)],
            293.0,
            1.0,
        ))
    }

    #[test]
    fn test_scrubber_converts_co2() {
        let mut world = World::new();
        let room = world.spawn((stale_room(),));
        let scrubber = world.spawn((Scrubber::new(room),));
        let energy = world.get::<&Node>(room).unwrap().internal_energy();

        let removed = scrubber_system(&mut world, 1.0);
        assert!((removed - 0.1).abs() < 1e-12);

        let node = *world.get::<&Node>(room).unwrap();
        assert!((node.mixture.moles(Gas::CarbonDioxide) - 1.9).abs() < 1e-12);
        assert!((node.mixture.moles(Gas::Oxygen) - 8.05).abs() < 1e-12);
        assert_eq!(node.internal_energy(), energy);
        // Fewer moles carrying the same energy
        assert!(node.temperature() > 293.0);

        let s = *world.get::<&Scrubber>(scrubber).unwrap();
        assert!((s.total_scrubbed - 0.1).abs() < 1e-12);
        assert!((s.total_produced - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_unpowered_scrubber_is_idle() {
        let mut world = World::new();
        let room = world.spawn((stale_room(),));
        let mut s = Scrubber::new(room);
        s.powered = false;
        world.spawn((s,));
        assert_eq!(scrubber_system(&mut world, 1.0), 0.0);
    }

    #[test]
    fn test_scrubber_without_co2_is_not_operational() {
        let mut world = World::new();
        let room = world.spawn((Node::from_mixture(GasMixture::from_moles(
            [(Gas::Oxygen, 5.0)],
            293.0,
            1.0,
        )),));
        let s = world.spawn((Scrubber::new(room),));
        scrubber_system(&mut world, 1.0);
        assert!(!world.get::<&Scrubber>(s).unwrap().operational);
    }

    #[test]
    fn test_canister_fill_and_empty_conserve_moles() {
        let mut node = Node::new(101.3, 293.0, 1.0);
        let mut canister = Canister::empty(293.0);
        let total = node.total_moles();

        canister.mode = CanisterMode::Fill;
        for _ in 0..20 {
            step_canister(&mut canister, &mut node, 0.1);
        }
        assert!(canister.total_filled > 0.0);
        let after_fill = node.total_moles() + canister.store.total_moles();
        assert!((after_fill - total).abs() < 1e-9);

        canister.mode = CanisterMode::Empty;
        for _ in 0..20 {
            step_canister(&mut canister, &mut node, 0.1);
        }
        assert!(canister.total_emptied > 0.0);
        let after_empty = node.total_moles() + canister.store.total_moles();
        assert!((after_empty - total).abs() < 1e-9);
    }

    #[test]
    fn test_canister_equalize_moves_toward_lower_side() {
        let mut mix = GasMixture::from_moles([(Gas::Oxygen, 1.0)], 293.0, Canister::VOLUME);
        mix.set_pressure(3000.0);
        let mut canister = Canister::with_contents(mix);
        canister.mode = CanisterMode::Equalize;
        let mut node = Node::new(101.3, 293.0, 1.0);

        let moved = step_canister(&mut canister, &mut node, 1.0);
        assert!(moved > 0.0);
        assert!(canister.pressure() < 3000.0);
        assert!(node.fraction(Gas::Oxygen) > 0.21);
    }

    #[test]
    fn test_manual_canister_holds() {
        let mut canister = Canister::empty(293.0);
        let mut node = Node::default();
        assert_eq!(step_canister(&mut canister, &mut node, 1.0), 0.0);
    }
}
