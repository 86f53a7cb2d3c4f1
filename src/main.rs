use intersection_sim::{Simulation, SimulationConfig};

fn main() {
    let mut sim = Simulation::new(SimulationConfig::default());

    println!("Simulating...");
    let dt = 1.0 / 60.0;
    for minute in 1..=10 {
        for _ in 0..60 * 60 {
            sim.tick(dt);
        }
        let stats = sim.statistics();
        println!(
            "[{minute:2} min] {} green | {:.0} vehs live | {} passed of {} spawned | avg wait {:.1}s, max {:.1}s",
            sim.current_group(),
            stats.current_count as f64,
            stats.total_passed,
            stats.total_spawned,
            stats.average_wait_time,
            stats.max_wait_time,
        );
        if let Some(decision) = sim.last_decision() {
            println!("         last decision: {}", decision.reason);
        }
    }
}
