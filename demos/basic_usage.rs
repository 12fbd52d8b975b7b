// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic fmcache usage example.
//!
//! Demonstrates:
//! 1. Building a schema-backed mask parser
//! 2. Fetching users through a loader (cold cache, then warm)
//! 3. Widening the mask: only the new paths are loaded
//! 4. Losing a field in the backend and reading around it
//! 5. Displaying metrics
//!
//! Uses Redis when `REDIS_URL` is set, an in-memory store otherwise.
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! REDIS_URL=redis://localhost:6379 cargo run --example basic_usage
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fmcache::{
    EntitySchema, FieldMask, FmCache, FmCacheConfig, HashStore, Id, InMemoryHashStore, LoadError, Record, Schema,
    SchemaParser,
};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

/// Stand-in for the system of record. Returns whole users; the cache keeps
/// only the paths of the mask it asked for.
fn load_users(ids: &[Id]) -> Vec<Record> {
    ids.iter()
        .map(|&id| {
            Record::new(id)
                .with("name", format!("user-{}", id))
                .with("age", 20 + id)
                .with_one(
                    "profile",
                    Some(
                        Record::new(1000 + id)
                            .with("introduction", format!("Hello from {}", id))
                            .with_many(
                                "schools",
                                vec![
                                    Record::new(id * 10).with("name", "North High"),
                                    Record::new(id * 10 + 1).with("name", "South High"),
                                ],
                            ),
                    ),
                )
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt().with_target(false).compact().init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║              fmcache: Basic Usage Example                     ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Schema and cache
    // ─────────────────────────────────────────────────────────────────────────
    let parser = Arc::new(SchemaParser::new(
        Schema::new("User")
            .entity("User", EntitySchema::new().attrs(["name", "age"]).has_one("profile", "Profile"))
            .entity("Profile", EntitySchema::new().attrs(["introduction"]).has_many("schools", "School"))
            .entity("School", EntitySchema::new().attrs(["name"])),
    ));

    let config = FmCacheConfig {
        redis_url: std::env::var("REDIS_URL").ok(),
        key_prefix: "demo".into(),
        ..Default::default()
    };
    let memory = Arc::new(InMemoryHashStore::new());
    let cache = match config.redis_url {
        Some(ref url) => {
            println!("📦 Using Redis at {}", url);
            FmCache::connect(&config, parser).await?
        }
        None => {
            println!("📦 Using the in-memory store");
            FmCache::new(memory.clone() as Arc<dyn HashStore>, parser, &config)
        }
    };

    let loads = Arc::new(AtomicUsize::new(0));
    let fetch = |ids: &'static [Id], mask: FieldMask| {
        let cache = cache.clone();
        let loads = loads.clone();
        async move {
            cache
                .fetch(ids, &mask, |ids, mask| async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    println!("   ↳ loader: ids={:?} paths={:?}", ids, mask.paths());
                    Ok::<_, LoadError>(load_users(&ids))
                })
                .await
        }
    };

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Cold, then warm
    // ─────────────────────────────────────────────────────────────────────────
    let narrow = cache.parse(["name", "profile.introduction"])?;
    println!("\n🔎 Fetching users 1..=3 with {:?}", narrow.paths());
    let users = fetch(&[1, 2, 3], narrow.clone()).await?;
    for user in &users {
        println!("   {}", user.to_json());
    }

    println!("\n🔎 Same fetch again (should not call the loader)");
    fetch(&[1, 2, 3], narrow).await?;
    println!("   loader calls so far: {}", loads.load(Ordering::SeqCst));

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Wider mask
    // ─────────────────────────────────────────────────────────────────────────
    let wide = cache.parse(["name", "age", "profile.introduction", "profile.schools.name"])?;
    println!("\n🔎 Widening to {:?}", wide.paths());
    let users = fetch(&[1, 2, 3], wide.clone()).await?;
    for user in &users {
        println!("   {}", user.to_json());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Partial loss
    // ─────────────────────────────────────────────────────────────────────────
    if config.redis_url.is_none() {
        println!("\n✂️  Dropping `age` of user 2 from the backend");
        memory.hdel_field("demo:2", "age");

        let read = cache.read(&[1, 2, 3], &wide).await?;
        println!(
            "   read: {} valid, {} invalid, incomplete ids={:?} paths={:?}",
            read.values.len(),
            read.invalid_values.len(),
            read.incomplete.ids,
            read.incomplete.field_mask.paths()
        );
        fetch(&[1, 2, 3], wide).await?;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Clean up and show metrics
    // ─────────────────────────────────────────────────────────────────────────
    cache.delete(&[1, 2, 3]).await;
    dump_metrics(&snapshotter);

    println!("\n✅ Done");
    Ok(())
}

fn dump_metrics(snapshotter: &Snapshotter) {
    let mut counters = vec![];
    let mut histograms = vec![];

    for (composite_key, _, _, value) in snapshotter.snapshot().into_vec() {
        let (_, key) = composite_key.into_parts();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };

        match value {
            DebugValue::Counter(v) => counters.push((key.name().to_string(), label_str, v)),
            DebugValue::Histogram(samples) => {
                let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                histograms.push((key.name().to_string(), label_str, samples.len(), sum));
            }
            DebugValue::Gauge(_) => {}
        }
    }
    counters.sort();
    histograms.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));

    println!("\n📊 Metrics");
    println!("   Counters:");
    for (name, labels, v) in counters {
        println!("     {}{} = {}", name, labels, v);
    }
    println!("   Histograms:");
    for (name, labels, count, sum) in histograms {
        println!("     {}{} count={} sum={:.3}", name, labels, count, sum);
    }
}
