use bloomtick::protocols::{replicated_kv, shortest_path, KvPut, KvReplMap, KvReplReq, Link};
use bloomtick::runtime::lattice::{LSet, LatticeValue};
use bloomtick::runtime::Program;
use bloomtick::sim::{Cluster, NetworkConfig, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

/// Statistics collected during stress testing
#[derive(Clone, Debug)]
pub struct StressTestStats {
    pub nodes: usize,
    pub facts_per_node: usize,
    pub ticks: u64,
    pub derived: usize,
    pub total_time: Duration,
    pub avg_tick_time: Duration,
    pub facts_per_second: f64,
}

impl StressTestStats {
    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║              Stress Test Statistics                         ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Nodes:                     {:>38} ║", self.nodes);
        println!("║  Input Facts per Node:      {:>38} ║", self.facts_per_node);
        println!("║  Ticks / Steps:             {:>38} ║", self.ticks);
        println!("║  Derived Facts:             {:>38} ║", self.derived);
        println!("║  Total Time:                {:>39}s ║", format!("{:.3}", self.total_time.as_secs_f64()));
        println!("║  Average Tick Time:         {:>36}µs ║", format!("{:.2}", self.avg_tick_time.as_micros()));
        println!("║  Facts/Second:              {:>38.0} ║", self.facts_per_second);
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

fn average(times: &[Duration]) -> Duration {
    if times.is_empty() {
        Duration::ZERO
    } else {
        times.iter().sum::<Duration>() / times.len() as u32
    }
}

/// Random links over `vertices` nodes, always from a lower to a higher
/// index so the graph stays acyclic and the path derivation terminates.
fn random_dag(rng: &mut StdRng, vertices: usize, links: usize) -> Vec<Link> {
    (0..links)
        .map(|_| {
            let from = rng.gen_range(0..vertices - 1);
            let to = rng.gen_range(from + 1..vertices);
            Link::new(format!("v{}", from), format!("v{}", to), rng.gen_range(1..100))
        })
        .collect()
}

/// Path derivation over a random DAG, one batch of links per tick.
pub fn stress_test_paths(vertices: usize, links: usize, batches: usize) -> Result<StressTestStats> {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║        Shortest Path Stress Test                           ║");
    println!("║  Vertices: {} | Links: {} | Batches: {} ║", vertices, links, batches);
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut rng = StdRng::from_entropy();
    let mut program = Program::new("paths");
    let sp = shortest_path(&mut program, "")?;
    let all_links = random_dag(&mut rng, vertices.max(2), links);

    println!("\n[Phase 1/1] Deriving paths...");
    let start = Instant::now();
    let mut tick_times = Vec::with_capacity(batches);
    let batch_size = links.div_ceil(batches.max(1)).max(1);
    for (i, chunk) in all_links.chunks(batch_size).enumerate() {
        for link in chunk {
            program.add_next(sp.links, link.clone());
        }
        let tick_start = Instant::now();
        program.tick()?;
        tick_times.push(tick_start.elapsed());
        println!("  Batch {}: {} paths", i + 1, program.get(sp.paths).len());
    }
    let total_time = start.elapsed();
    println!("[Phase 1/1] ✓ Completed");

    let derived = program.get(sp.paths).len();
    Ok(StressTestStats {
        nodes: 1,
        facts_per_node: links,
        ticks: program.ticks(),
        derived,
        total_time,
        avg_tick_time: average(&tick_times),
        facts_per_second: (links + derived) as f64 / total_time.as_secs_f64(),
    })
}

/// Replicated KV cluster: every replica writes locally, then all replicas
/// gossip snapshots over a chaotic network until their maps agree.
pub fn stress_test_kv(replicas: usize, puts_per_replica: usize) -> Result<StressTestStats> {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║        Replicated KV Stress Test (Simulated Network)       ║");
    println!("║  Replicas: {} | Puts/Replica: {} ║", replicas, puts_per_replica);
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut rng = StdRng::from_entropy();
    let mut cluster = Cluster::new(NetworkConfig::chaotic().seeded(rng.gen()));
    let mut handles = Vec::with_capacity(replicas);
    for i in 0..replicas {
        let addr = format!("replica_{}", i);
        let mut program = Program::new(addr.clone());
        let rkv = replicated_kv(&mut program, "")?;
        cluster.add_node(program)?;
        handles.push((addr, rkv));
    }
    cluster.route::<KvReplMap>("KVReplMap");

    println!("\n[Phase 1/2] Writing to replicas...");
    for (i, (addr, rkv)) in handles.iter().enumerate() {
        let program = cluster.node_mut(addr)?;
        for n in 0..puts_per_replica {
            let key = format!("key_{}", rng.gen_range(0..puts_per_replica.max(1)));
            program.send(
                rkv.kv.protocol.put,
                KvPut {
                    req_id: n as i64,
                    addr: addr.clone(),
                    client_addr: addr.clone(),
                    key,
                    val: LatticeValue::from(LSet::one(format!("item_{}_{}", i, n))),
                },
            );
        }
    }
    println!("[Phase 1/2] ✓ Completed");
    println!("[Phase 2/2] Gossiping until converged...");

    let converged = |cluster: &Cluster| {
        let mut maps = handles.iter().filter_map(|(addr, rkv)| {
            cluster.node(addr).ok().map(|program| program.get(rkv.kv.map))
        });
        match maps.next() {
            Some(first) => maps.all(|map| map == first),
            None => true,
        }
    };

    let start = Instant::now();
    let mut step_times = Vec::new();
    let mut stepped = 0;
    // Skip the first comparison: every map is empty before the puts land.
    while stepped == 0 || !converged(&cluster) {
        for (addr, rkv) in &handles {
            let program = cluster.node_mut(addr)?;
            for (peer, _) in &handles {
                if peer != addr {
                    program.send(
                        rkv.repl_req,
                        KvReplReq {
                            addr: addr.clone(),
                            target_addr: peer.clone(),
                        },
                    );
                }
            }
        }
        let step_start = Instant::now();
        cluster.step()?;
        step_times.push(step_start.elapsed());
        stepped += 1;
        if stepped % 10 == 0 {
            println!("  Steps completed: {}", stepped);
        }
    }
    let total_time = start.elapsed();
    println!("[Phase 2/2] ✓ Completed");

    let derived = handles
        .first()
        .and_then(|(addr, rkv)| cluster.node(addr).ok().map(|p| p.get(rkv.kv.map).len()))
        .unwrap_or(0);
    let total_facts = replicas * puts_per_replica + cluster.network().sent_count() as usize;

    Ok(StressTestStats {
        nodes: replicas,
        facts_per_node: puts_per_replica,
        ticks: cluster.steps(),
        derived,
        total_time,
        avg_tick_time: average(&step_times),
        facts_per_second: total_facts as f64 / total_time.as_secs_f64(),
    })
}

/// Replicated KV performance as the cluster grows
pub fn stress_test_scaling(max_replicas: usize, step_size: usize) -> Result<()> {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║      Scaling Analysis - Replicated KV vs Replicas          ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut current_replicas = step_size;
    while current_replicas <= max_replicas {
        let stats = stress_test_kv(current_replicas, 50)?;
        stats.print();
        current_replicas += step_size;
    }
    Ok(())
}
