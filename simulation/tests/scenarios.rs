//! End-to-end runs of the built-in scenarios and generated topologies

use arbor_simulation::{
    ActorNetwork, Scenario, SimConfig, Simulation, SwitchId, TopologyBuilder, run_scenario, verify,
};
use proptest::prelude::*;

fn final_lines(name: &str) -> Vec<String> {
    let scenario = Scenario::builtin(name).unwrap();
    run_scenario(&scenario, SimConfig::default())
        .unwrap()
        .log_lines()
}

#[test]
fn test_line_scenario() {
    assert_eq!(final_lines("line"), vec!["1 - 2", "2 - 1, 2 - 3", "3 - 2"]);
}

#[test]
fn test_bidirectional_scenario() {
    assert_eq!(
        final_lines("bidirectional"),
        vec!["2 - 3, 2 - 4", "3 - 2, 3 - 5", "4 - 2, 4 - 6", "5 - 3", "6 - 4"]
    );
}

#[test]
fn test_tie_breaking_scenario() {
    let scenario = Scenario::builtin("tie-breaking").unwrap();
    let sim = run_scenario(&scenario, SimConfig::default()).unwrap();

    let next_hops: Vec<(u32, u32)> = sim
        .switches()
        .filter(|s| !s.is_root())
        .map(|s| (s.id().as_u32(), s.next_hop().as_u32()))
        .collect();
    assert_eq!(next_hops, vec![(2, 1), (3, 1), (4, 2), (5, 3), (6, 4), (7, 5)]);

    let report = verify(&sim.snapshots(), sim.topology());
    assert!(report.is_converged(), "{}", report);
    assert_eq!(report.tree_links, 6);
}

#[test]
fn test_path_through_scenario_with_room_to_spread() {
    let scenario = Scenario::builtin("path-through").unwrap().with_ttl(16);
    let sim = run_scenario(&scenario, SimConfig::default()).unwrap();

    assert_eq!(
        sim.log_lines(),
        vec!["2 - 3", "3 - 2, 3 - 6", "4 - 5", "5 - 4, 5 - 6", "6 - 3, 6 - 5"]
    );
    let report = verify(&sim.snapshots(), sim.topology());
    assert!(report.is_converged(), "{}", report);
}

#[test]
fn test_every_builtin_runs_cleanly() {
    for name in Scenario::builtin_names() {
        let scenario = Scenario::builtin(name).unwrap();
        let sim = run_scenario(&scenario, SimConfig::default()).unwrap();

        assert!(sim.is_quiescent(), "{name} left messages queued");
        assert_eq!(
            sim.log_lines().len(),
            scenario.topology.switch_count() - scenario.drops.len(),
            "{name}"
        );
        for drop in &scenario.drops {
            assert!(sim.switch(*drop).is_none(), "{name} kept dropped switch {drop}");
        }
        for switch in sim.switches() {
            assert!(switch.invariants_hold(), "{name}: switch {} is inconsistent", switch.id());
        }
        assert_eq!(sim.stats.switches_dropped, scenario.drops.len() as u64);
        assert_eq!(sim.phase() as usize, scenario.drops.len());
    }
}

#[test]
fn test_builtins_converge_with_room_to_spread() {
    for name in Scenario::builtin_names() {
        let scenario = Scenario::builtin(name).unwrap().with_ttl(16);
        let sim = run_scenario(&scenario, SimConfig::default()).unwrap();
        let report = verify(&sim.snapshots(), sim.topology());
        assert!(report.is_converged(), "{name}: {report}");
    }
}

#[test]
fn test_root_drop_reconverges_on_generated_meshes() {
    let mut checked = 0;
    for switches in 4u32..12 {
        for seed in 0u64..40 {
            let topology = TopologyBuilder::new(switches).random(0.35, Some(seed));
            let mut remaining = topology.clone();
            remaining.remove_switch(SwitchId(1)).unwrap();
            if !remaining.is_connected() {
                continue;
            }

            let mut sim = Simulation::new(topology, SimConfig::with_ttl(4 * switches + 10));
            sim.run(&[SwitchId(1)]).unwrap();

            let report = verify(&sim.snapshots(), sim.topology());
            assert!(
                report.is_converged(),
                "{switches} switches, seed {seed}: {report}"
            );
            assert_eq!(report.roots, vec![SwitchId(2)]);
            checked += 1;
        }
    }
    assert!(checked > 0);
}

#[test]
fn test_runs_are_reproducible() {
    for name in Scenario::builtin_names() {
        let scenario = Scenario::builtin(name).unwrap();
        let first = run_scenario(&scenario, SimConfig::default()).unwrap();
        let second = run_scenario(&scenario, SimConfig::default()).unwrap();
        assert_eq!(first.log_lines(), second.log_lines(), "{name}");
        assert_eq!(first.stats, second.stats, "{name}");
    }
}

#[test]
fn test_scenario_file_round_trip() {
    let scenario = Scenario::builtin("bidirectional").unwrap();
    let dir = std::env::temp_dir().join(format!("arbor-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("y-shape.json");

    let mut unnamed = scenario.clone();
    unnamed.name.clear();
    std::fs::write(&path, unnamed.to_json_string().unwrap()).unwrap();

    let loaded = Scenario::from_path(&path).unwrap();
    assert_eq!(loaded.name, "y-shape");
    assert_eq!(loaded.topology, scenario.topology);
    assert_eq!(loaded.drops, vec![SwitchId(1)]);

    let resolved = Scenario::resolve(path.to_str().unwrap()).unwrap();
    assert_eq!(resolved, loaded);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_actor_driver_agrees_with_simulation() {
    for name in ["line", "bidirectional", "tie-breaking"] {
        let scenario = Scenario::builtin(name).unwrap();
        let expected = run_scenario(&scenario, SimConfig::default())
            .unwrap()
            .log_lines();

        let network = ActorNetwork::run_scenario(&scenario).await.unwrap();
        assert_eq!(network.log_lines().await.unwrap(), expected, "{name}");
        network.shutdown().await.unwrap();
    }
}

#[tokio::test]
async fn test_actor_driver_reconverges_after_drops() {
    for name in Scenario::builtin_names() {
        let scenario = Scenario::builtin(name).unwrap().with_ttl(16);
        let expected = run_scenario(&scenario, SimConfig::default())
            .unwrap()
            .log_lines();

        let network = ActorNetwork::run_scenario(&scenario).await.unwrap();
        assert_eq!(network.log_lines().await.unwrap(), expected, "{name}");
        network.shutdown().await.unwrap();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_generated_topologies_converge(
        switches in 1u32..16,
        probability in 0.0f64..0.4,
        seed in any::<u64>(),
    ) {
        let topology = TopologyBuilder::new(switches).random(probability, Some(seed));
        let ttl = topology.diameter() + 1;
        let mut sim = Simulation::new(topology, SimConfig::with_ttl(ttl));
        sim.run(&[]).unwrap();

        let report = verify(&sim.snapshots(), sim.topology());
        prop_assert!(report.is_converged(), "{}", report);
        prop_assert_eq!(report.roots, vec![SwitchId(1)]);
        prop_assert_eq!(report.tree_links, switches as usize - 1);
    }

    #[test]
    fn prop_generated_topologies_reconverge_after_a_drop(
        switches in 3u32..14,
        probability in 0.1f64..0.5,
        seed in any::<u64>(),
        victim in any::<prop::sample::Index>(),
    ) {
        let topology = TopologyBuilder::new(switches).random(probability, Some(seed));
        let drop = *victim.get(&topology.switch_ids());
        let mut remaining = topology.clone();
        remaining.remove_switch(drop).unwrap();
        prop_assume!(remaining.is_connected());

        let ttl = topology.diameter().max(remaining.diameter()) + 1;
        let mut sim = Simulation::new(topology, SimConfig::with_ttl(ttl));
        sim.run(&[drop]).unwrap();

        let report = verify(&sim.snapshots(), sim.topology());
        prop_assert!(report.is_converged(), "{}", report);
        let lowest = remaining.switch_ids()[0];
        prop_assert_eq!(report.roots, vec![lowest]);
        prop_assert_eq!(report.tree_links, switches as usize - 2);
    }

    #[test]
    fn prop_regular_shapes_converge(switches in 2u32..12, columns in 1u32..5) {
        let shapes = [
            TopologyBuilder::new(switches).line(),
            TopologyBuilder::new(switches).ring(),
            TopologyBuilder::new(switches).star(),
            TopologyBuilder::new(switches).full_mesh(),
            TopologyBuilder::new(switches).grid(columns),
        ];
        for topology in shapes {
            let ttl = topology.diameter() + 1;
            let mut sim = Simulation::new(topology, SimConfig::with_ttl(ttl));
            sim.run(&[]).unwrap();
            let report = verify(&sim.snapshots(), sim.topology());
            prop_assert!(report.is_converged(), "{}", report);
        }
    }
}
