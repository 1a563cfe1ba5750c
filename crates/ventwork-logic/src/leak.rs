//! Leak-group equalization.
//!
//! A leak group is a set of nodes sharing one undivided volume, optionally
//! bleeding to an exterior node. Each tick every participant relaxes toward
//! the pooled composition and the pooled mole-weighted temperature. The same
//! interpolation weight is used for every species, which treats the leak as
//! bulk advection rather than per-species diffusion.

use crate::constants::MIN_MOLES;
use crate::gas::Gas;
use crate::node::Node;

/// Interpolation weight for one tick: `clamp01(leak_rate · dt)`.
pub fn leak_fraction(leak_rate: f64, dt: f64) -> f64 {
    let f = leak_rate * dt;
    if f.is_nan() {
        0.0
    } else {
        f.clamp(0.0, 1.0)
    }
}

/// Pooled totals across every participant of a leak step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pool {
    /// Moles of each species summed over all participants.
    pub moles: [f64; Gas::COUNT],
    /// Sum of all species.
    pub total: f64,
    /// Mole-weighted mean temperature, K.
    pub temperature: f64,
}

impl Pool {
    /// Aggregate `participants`. `None` when they hold effectively no gas.
    pub fn of(participants: &[Node]) -> Option<Pool> {
        let mut pool = Pool::default();
        let mut weighted_temperature = 0.0;
        for node in participants {
            let mut node_total = 0.0;
            for (gas, moles) in node.mixture.iter() {
                pool.moles[gas.index()] += moles;
                node_total += moles;
            }
            weighted_temperature += node_total * node.temperature();
        }
        pool.total = pool.moles.iter().sum();
        if !(pool.total > MIN_MOLES) {
            return None;
        }
        pool.temperature = weighted_temperature / pool.total;
        Some(pool)
    }
}

/// Relax every participant toward the pooled state by `fraction`.
///
/// A participant's target for each species is its share of the pool,
/// proportional to its share of the pooled moles; temperature moves toward
/// the pooled mean. Energy is re-derived from the new moles and temperature.
/// Returns false (and leaves everything untouched) when the pool is empty
/// or the fraction is zero.
pub fn equalize(participants: &mut [Node], fraction: f64) -> bool {
    if !(fraction > 0.0) {
        return false;
    }
    let Some(pool) = Pool::of(participants) else {
        return false;
    };

    for node in participants.iter_mut() {
        let share = raw_total(node) / pool.total;
        for gas in Gas::ALL {
            let current = node.mixture.moles(gas);
            let target = pool.moles[gas.index()] * share;
            node.mixture.set_moles(gas, lerp(current, target, fraction));
        }
        let t = lerp(node.temperature(), pool.temperature, fraction);
        node.mixture.set_temperature(t);
        node.sync_energy_from_temperature();
    }
    true
}

fn raw_total(node: &Node) -> f64 {
    node.mixture.iter().map(|(_, m)| m).sum()
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::GasMixture;

    fn total(nodes: &[Node]) -> f64 {
        nodes.iter().map(raw_total).sum()
    }

    #[test]
    fn test_leak_fraction_clamps() {
        assert_eq!(leak_fraction(1.0, 0.1), 0.1);
        assert_eq!(leak_fraction(50.0, 0.1), 1.0);
        assert_eq!(leak_fraction(-1.0, 0.1), 0.0);
        assert_eq!(leak_fraction(f64::NAN, 0.1), 0.0);
    }

    #[test]
    fn test_equalize_conserves_moles() {
        let mut nodes = [
            Node::new(150.0, 320.0, 1.0),
            Node::from_mixture(GasMixture::from_moles([(Gas::CarbonDioxide, 3.0)], 250.0, 1.0)),
            Node::new(20.0, 200.0, 4.0),
        ];
        let before = total(&nodes);
        assert!(equalize(&mut nodes, 0.3));
        assert!((total(&nodes) - before).abs() < 1e-9);
    }

    #[test]
    fn test_full_fraction_equalizes_composition_and_temperature() {
        let mut nodes = [
            Node::from_mixture(GasMixture::from_moles([(Gas::Oxygen, 10.0)], 400.0, 1.0)),
            Node::from_mixture(GasMixture::from_moles([(Gas::Nitrogen, 30.0)], 200.0, 1.0)),
        ];
        equalize(&mut nodes, 1.0);
        for node in &nodes {
            assert!((node.fraction(Gas::Oxygen) - 0.25).abs() < 1e-9);
            assert!((node.temperature() - 250.0).abs() < 1e-9);
            assert!(node.energy_mismatch() < 1e-6);
        }
        // Totals stay with their owners, only composition mixes
        assert!((raw_total(&nodes[0]) - 10.0).abs() < 1e-9);
        assert!((raw_total(&nodes[1]) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_pool_is_noop() {
        let mut nodes = [
            Node::from_mixture(GasMixture::empty(300.0, 1.0)),
            Node::from_mixture(GasMixture::empty(100.0, 1.0)),
        ];
        let before = nodes;
        assert!(!equalize(&mut nodes, 1.0));
        assert_eq!(nodes, before);
    }

    #[test]
    fn test_zero_fraction_is_noop() {
        let mut nodes = [Node::new(100.0, 300.0, 1.0), Node::new(10.0, 200.0, 1.0)];
        let before = nodes;
        assert!(!equalize(&mut nodes, 0.0));
        assert_eq!(nodes, before);
    }
}
