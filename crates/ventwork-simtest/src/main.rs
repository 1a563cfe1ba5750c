//! Ventwork Headless Simulation Harness
//!
//! Runs the scenario file and a set of voxel zone checks against the engine.
//! Runs entirely in-process, with no rendering and no host game.
//!
//! Usage:
//!   cargo run -p ventwork-simtest
//!   cargo run -p ventwork-simtest -- --verbose
//!
//! Set `RUST_LOG=debug` to see the engine's own logging.

use serde::Deserialize;
use ventwork_core::config::SimConfig;
use ventwork_core::engine::SimulationEngine;
use ventwork_core::generation::{build_scenario, ScenarioSpec, TerrainKind};
use ventwork_core::zones::ZoneUpdate;
use ventwork_logic::gas::Gas;
use ventwork_logic::voxel::{GridSize, VoxelPos, VoxelType};

// ── Scenario file (shared with the core tests' fixtures) ────────────────
const SCENARIOS_JSON: &str = include_str!("../../../data/scenarios.json");

const DT: f64 = 0.1;

#[derive(Debug, Deserialize)]
struct ScenarioCase {
    name: String,
    ticks: usize,
    scenario: ScenarioSpec,
    #[serde(default)]
    max_pressure_spread: Option<f64>,
    #[serde(default)]
    max_temperature_spread: Option<f64>,
    #[serde(default)]
    max_energy_drift: Option<f64>,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== Ventwork Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Scenario file
    results.extend(run_scenarios(verbose));

    // 2. Zone lifecycle on a generated box
    results.extend(validate_zone_lifecycle(verbose));

    // 3. Fixed-tick clock
    results.extend(validate_clock(verbose));

    // 4. Save / load
    results.extend(validate_persistence(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn spread(values: impl Iterator<Item = f64>) -> f64 {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if lo.is_finite() && hi.is_finite() {
        hi - lo
    } else {
        0.0
    }
}

// ── 1. Scenarios ────────────────────────────────────────────────────────

fn run_scenarios(verbose: bool) -> Vec<TestResult> {
    println!("--- Scenarios ---");
    let mut results = Vec::new();

    let cases: Vec<ScenarioCase> = match serde_json::from_str(SCENARIOS_JSON) {
        Ok(c) => c,
        Err(e) => {
            results.push(TestResult {
                name: "scenarios_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            return results;
        }
    };

    results.push(TestResult {
        name: "scenarios_not_empty".into(),
        passed: !cases.is_empty(),
        detail: format!("{} scenarios loaded", cases.len()),
    });

    for case in &cases {
        let mut engine = SimulationEngine::new();
        let built = build_scenario(&mut engine, &case.scenario);
        let nodes = built.nodes();

        let moles_before = engine.total_moles_in_system();
        let energy_before = engine.total_energy();
        for _ in 0..case.ticks {
            engine.step(DT);
        }
        let moles_after = engine.total_moles_in_system();
        let energy_after = engine.total_energy();

        // Mass is conserved in every scenario
        let mass_drift = ((moles_after - moles_before) / moles_before).abs();
        results.push(TestResult {
            name: format!("{}_mass", case.name),
            passed: mass_drift < 1e-9,
            detail: format!("{:.6} -> {:.6} mol", moles_before, moles_after),
        });

        if let Some(limit) = case.max_energy_drift {
            let drift = ((energy_after - energy_before) / energy_before).abs();
            results.push(TestResult {
                name: format!("{}_energy", case.name),
                passed: drift < limit,
                detail: format!("drift {:.4}% (limit {:.2}%)", drift * 100.0, limit * 100.0),
            });
        }

        if let Some(limit) = case.max_pressure_spread {
            let s = spread(nodes.iter().filter_map(|&n| engine.pressure(n)));
            results.push(TestResult {
                name: format!("{}_pressure", case.name),
                passed: s < limit,
                detail: format!("spread {:.3} kPa (limit {})", s, limit),
            });
        }

        if let Some(limit) = case.max_temperature_spread {
            let s = spread(nodes.iter().filter_map(|&n| engine.temperature(n)));
            results.push(TestResult {
                name: format!("{}_temperature", case.name),
                passed: s < limit,
                detail: format!("spread {:.3} K (limit {})", s, limit),
            });
        }

        // Fractions stay a distribution
        let bad_fractions = nodes
            .iter()
            .filter_map(|&n| engine.node(n))
            .filter(|n| {
                let sum: f64 = n.fractions().iter().map(|(_, f)| f).sum();
                (sum - 1.0).abs() > 1e-9
            })
            .count();
        results.push(TestResult {
            name: format!("{}_fractions", case.name),
            passed: bad_fractions == 0,
            detail: format!("{} nodes with fractions not summing to 1", bad_fractions),
        });

        if verbose {
            println!("  {} after {} ticks:", case.name, case.ticks);
            for &n in &nodes {
                if let Some(node) = engine.node(n) {
                    println!(
                        "    {:8.3} kPa  {:7.2} K  {:8.3} mol  CO2 {:5.2}%",
                        node.pressure(),
                        node.temperature(),
                        node.total_moles(),
                        node.percent(Gas::CarbonDioxide)
                    );
                }
            }
        }
    }

    results
}

// ── 2. Zone Lifecycle ───────────────────────────────────────────────────

fn box_engine() -> SimulationEngine {
    let mut config = SimConfig::default();
    config.zones.grid_size = GridSize::new(9, 9, 9);
    let mut engine = SimulationEngine::with_config(config);
    engine.generate_terrain(TerrainKind::Box {
        min: VoxelPos::new(2, 2, 2),
        max: VoxelPos::new(6, 6, 6),
    });
    engine
}

fn validate_zone_lifecycle(verbose: bool) -> Vec<TestResult> {
    println!("--- Zone Lifecycle ---");
    let mut results = Vec::new();
    let mut engine = box_engine();
    let inside = VoxelPos::new(4, 4, 4);

    let summary = engine.zones.summary();
    results.push(TestResult {
        name: "zones_initial".into(),
        passed: summary.enclosed == 1 && summary.exposed == 1,
        detail: summary.to_string(),
    });

    let room = engine.zones.zone_at(inside).map(|z| (z.len(), z.enclosed));
    results.push(TestResult {
        name: "zones_room_size".into(),
        passed: room == Some((27, true)),
        detail: format!("{:?}", room),
    });

    // Punch through the shell: the room joins the outside air
    let update = engine.destroy_voxel(VoxelPos::new(2, 4, 4));
    let merged = engine.zones.zone_at(inside).map(|z| !z.enclosed).unwrap_or(false);
    results.push(TestResult {
        name: "zones_breach_merges_outside".into(),
        passed: matches!(update, ZoneUpdate::Rebuilt(_)) && merged && engine.zone_count() == 1,
        detail: format!("{:?}, {} zones", update, engine.zone_count()),
    });

    // Patch it: the room is enclosed again
    let update = engine.create_voxel(VoxelPos::new(2, 4, 4), VoxelType::Solid, 1.0);
    let sealed = engine.zones.zone_at(inside).map(|z| z.enclosed).unwrap_or(false);
    results.push(TestResult {
        name: "zones_patch_splits".into(),
        passed: matches!(update, ZoneUpdate::Rebuilt(_)) && sealed && engine.zone_count() == 2,
        detail: format!("{:?}, {} zones", update, engine.zone_count()),
    });

    // Wear a wall down until it gives
    let mut engine = box_engine();
    let wall = VoxelPos::new(4, 6, 4);
    let mut steps = Vec::new();
    for _ in 0..12 {
        let update = engine.damage_voxel(wall, 1.0);
        if update != ZoneUpdate::Unchanged {
            steps.push(update);
        }
        if engine.grid.is_passable(wall) {
            break;
        }
    }
    results.push(TestResult {
        name: "zones_damage_opens_wall".into(),
        passed: engine.grid.is_passable(wall) && !steps.is_empty(),
        detail: format!("{:?}", steps),
    });

    // The zone node's air follows the simulation
    let mut engine = box_engine();
    let node = engine.zones.node_at(inside);
    let before = node.and_then(|n| engine.total_moles(n));
    for _ in 0..100 {
        engine.step(DT);
    }
    let after = node.and_then(|n| engine.total_moles(n));
    results.push(TestResult {
        name: "zones_enclosed_holds_air".into(),
        passed: before.is_some() && before == after,
        detail: format!("{:?} -> {:?} mol", before, after),
    });

    if verbose {
        println!("  final: {}", engine.zones.summary());
    }

    results
}

// ── 3. Clock ────────────────────────────────────────────────────────────

fn validate_clock(_verbose: bool) -> Vec<TestResult> {
    println!("--- Clock ---");
    let mut results = Vec::new();

    let mut engine = SimulationEngine::new();
    let mut ticks = 0;
    for _ in 0..60 {
        ticks += engine.advance(1.0 / 60.0);
    }
    results.push(TestResult {
        name: "clock_one_second".into(),
        passed: ticks == 10,
        detail: format!("{} ticks in one second of 60 fps frames", ticks),
    });

    let mut engine = SimulationEngine::new();
    let burst = engine.advance(10.0);
    results.push(TestResult {
        name: "clock_backlog_capped".into(),
        passed: burst == engine.config().max_ticks_per_frame,
        detail: format!("{} ticks from a 10 s frame", burst),
    });

    engine.pause();
    let paused = engine.advance(1.0);
    results.push(TestResult {
        name: "clock_pause".into(),
        passed: paused == 0 && engine.is_paused(),
        detail: format!("{} ticks while paused", paused),
    });

    results
}

// ── 4. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(_verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();

    let mut engine = box_engine();
    for _ in 0..25 {
        engine.step(DT);
    }

    let mut buf = Vec::new();
    if let Err(e) = engine.save(&mut buf) {
        results.push(TestResult {
            name: "persistence_save".into(),
            passed: false,
            detail: e.to_string(),
        });
        return results;
    }

    let mut restored = SimulationEngine::new();
    let loaded = restored.load(buf.as_slice());
    results.push(TestResult {
        name: "persistence_load".into(),
        passed: loaded.is_ok(),
        detail: format!("{} bytes", buf.len()),
    });

    let same = restored.tick_count() == engine.tick_count()
        && restored.zone_count() == engine.zone_count()
        && restored.node_count() == engine.node_count()
        && (restored.total_moles_in_system() - engine.total_moles_in_system()).abs() < 1e-9;
    results.push(TestResult {
        name: "persistence_state_matches".into(),
        passed: same,
        detail: format!(
            "ticks {}/{}, zones {}/{}, nodes {}/{}",
            restored.tick_count(),
            engine.tick_count(),
            restored.zone_count(),
            engine.zone_count(),
            restored.node_count(),
            engine.node_count()
        ),
    });

    results
}
