use std::time::Instant;

use serde_json::{json, Value};
use sieve_core::config::SieveConfig;
use sieve_search::{filter_items, parse, FilterAccordion};

fn gen_machine(i: usize) -> Value {
    let status = match i % 4 {
        0 => "Deployed",
        1 => "Ready",
        2 => "Commissioning",
        _ => "New",
    };
    let mut m = json!({
        "hostname": format!("machine-{i:06}"),
        "system_id": format!("{:06x}", i * 7919),
        "status": status,
        "pool": {"name": format!("pool-{}", i % 8)},
        "zone": {"name": format!("zone-{}", i % 20)},
        "architecture": if i % 5 == 0 { "arm64/generic" } else { "amd64/generic" },
        "tags": [format!("rack-{}", i % 40), if i % 3 == 0 { "gpu" } else { "cpu" }],
        "numa_nodes_count": (i % 4) as i64,
    });
    if i % 10 == 0 {
        m["workload_annotations"] = json!({"team": format!("team-{}", i % 7)});
    }
    m
}

fn percentile_us(xs: &mut [u128], p: f64) -> u128 {
    xs.sort_unstable();
    let idx = ((xs.len() as f64 - 1.0) * p).round() as usize;
    xs[idx]
}

fn main() {
    let n: usize = std::env::var("SIEVE_BENCH_ITEMS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(100_000);
    let rounds: usize = std::env::var("SIEVE_BENCH_ROUNDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(20);

    eprintln!("generating inventory: {} machines", n);
    let t0 = Instant::now();
    let items: Vec<Value> = (0..n).map(gen_machine).collect();
    let gen_ms = t0.elapsed().as_secs_f64() * 1_000.0;

    let kind = match SieveConfig::default().resolve("machines") {
        Ok(k) => k,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let filters = [
        "",
        "status:(=Deployed)",
        "zone:(=zone-1,=zone-2) tags:(=gpu)",
        "workload-team:() pool:(!=pool-0)",
        "status:(deploy) machine-0001",
    ];

    let run = |label: &str, f: &mut dyn FnMut(&str)| {
        let mut times: Vec<u128> = Vec::with_capacity(rounds * filters.len());
        for _ in 0..rounds {
            for &q in filters.iter() {
                let t = Instant::now();
                f(q);
                times.push(t.elapsed().as_micros());
            }
        }
        let p50 = percentile_us(&mut times.clone(), 0.50) as f64 / 1000.0;
        let p99 = percentile_us(&mut times, 0.99) as f64 / 1000.0;
        println!("{}: p50={:.3}ms p99={:.3}ms ({} runs)", label, p50, p99, rounds * filters.len());
    };

    println!("inventory: generated={:.1}ms items={}", gen_ms, n);
    run("sections", &mut |q: &str| {
        let acc = FilterAccordion::for_kind(&kind, Some(q));
        let _ = acc.sections(&items, &kind.extractor);
    });
    run("filter", &mut |q: &str| {
        let _ = filter_items(&items, &parse(Some(q)), &kind.extractor);
    });
}
