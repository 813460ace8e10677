use bloomtick::sim::Result;
use stress_test::{stress_test_kv, stress_test_paths, stress_test_scaling};
pub mod stress_test;

fn main() -> Result<()> {
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            SCHEDULER STRESS TESTS                          ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    // Test 1: Path derivation, small graph
    let stats = stress_test_paths(20, 40, 4)?;
    stats.print();

    // Test 2: Path derivation, larger graph in more batches
    let stats = stress_test_paths(60, 150, 10)?;
    stats.print();

    // Test 3: Replicated KV, small cluster
    let stats = stress_test_kv(4, 100)?;
    stats.print();

    // Test 4: Replicated KV, medium cluster
    let stats = stress_test_kv(10, 200)?;
    stats.print();

    // Test 5: Scaling analysis
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║          SCALING ANALYSIS (Replicated KV)                  ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    stress_test_scaling(12, 3)?;

    println!("\n✓ All stress tests completed successfully!");
    Ok(())
}
