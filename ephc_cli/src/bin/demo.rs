//! EPHC Demo
//!
//! Generates synthetic extracellular recordings (one channel and a 32-channel
//! probe), runs every compatible registered algorithm over them, and then
//! writes one container to disk and reads it back to show the full
//! encode → store → decode path.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::time::{Duration, Instant};

use anyhow::Result;

use ephc_cli::{human_bytes, init_logging, run_benchmark, BenchRecord, Dataset};
use ephc_codecs::{algorithm_by_name, algorithms};
use ephc_core::format::{Container, EXTENSION};
use ephc_core::{read_container, verify_lossless, write_container};

// ── constants ──────────────────────────────────────────────────────────────

/// One second at 30 kHz.
const ROWS: usize = 30_000;
const PROBE_CHANNELS: usize = 32;
const SEED: u64 = 42;
const SHOWCASE: &str = "ans-lpc8";

// ── formatting ─────────────────────────────────────────────────────────────

fn fmt_duration(d: Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms < 1.0 {
        format!("{:.1} µs", ms * 1000.0)
    } else if ms < 1000.0 {
        format!("{ms:.1} ms")
    } else {
        format!("{:.2} s", d.as_secs_f64())
    }
}

fn print_table(records: &[BenchRecord]) {
    println!(
        "  {:<26} {:>12}  {:>8}  {:>9}  {:>9}  {:>8}",
        "Algorithm", "Compressed", "Ratio", "Encode", "Decode", "Max err"
    );
    println!("  {}", "─".repeat(82));
    for r in records {
        let max_err = r
            .loss
            .as_ref()
            .map_or_else(|| "exact".to_string(), |m| m.max_abs_error.to_string());
        println!(
            "  {:<26} {:>12}  {:>7.2}x  {:>7.1}ms  {:>7.1}ms  {:>8}",
            r.algorithm(),
            human_bytes(r.encoded_bytes as u64),
            r.ratio,
            r.encode_ms,
            r.decode_ms,
            max_err
        );
    }
}

fn best_lossless(records: &[BenchRecord]) -> Option<&BenchRecord> {
    records
        .iter()
        .filter(|r| r.lossless)
        .max_by(|a, b| a.ratio.total_cmp(&b.ratio))
}

// ── demo runner ────────────────────────────────────────────────────────────

fn run() -> Result<()> {
    init_logging("warn")?;
    let out_dir = std::env::temp_dir().join("ephc_demo");
    std::fs::create_dir_all(&out_dir)?;
    let registry = algorithms()?;

    // ── banner ───────────────────────────────────────────────────────────────
    println!();
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║      EPHC · Predictive compression for ephys integer signals     ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("  {} registered algorithms", registry.len());

    // ── Phase 1: benchmarks ──────────────────────────────────────────────────
    for channels in [1, PROBE_CHANNELS] {
        let dataset = Dataset::synthetic_ephys(ROWS, channels, SEED)?;
        println!();
        println!(
            "── {} · {} · {} raw ──",
            dataset.name,
            dataset.signal.shape(),
            human_bytes(dataset.raw_bytes() as u64)
        );
        println!();

        let t0 = Instant::now();
        let records = run_benchmark(&dataset, &registry, None)?;
        print_table(&records);
        println!();
        println!(
            "  {} algorithms verified in {}",
            records.len(),
            fmt_duration(t0.elapsed())
        );
        if let Some(best) = best_lossless(&records) {
            println!("  best lossless  : {} at {:.2}x", best.algorithm(), best.ratio);
        }
    }

    // ── Phase 2: container round trip ───────────────────────────────────────
    println!();
    println!("── container round trip ({SHOWCASE}) ──");
    println!();

    let dataset = Dataset::synthetic_ephys(ROWS, PROBE_CHANNELS, SEED)?;
    let alg = algorithm_by_name(SHOWCASE)?;
    let path = out_dir.join(format!("{}.{EXTENSION}", dataset.name));

    let t0 = Instant::now();
    let payload = alg.encode(&dataset.signal)?;
    let container = Container::new(
        &alg.name,
        &alg.version,
        dataset.signal.dtype(),
        dataset.signal.shape(),
        payload,
    );
    let written = write_container(&mut BufWriter::new(File::create(&path)?), &container)?;
    let write_time = t0.elapsed();

    let t1 = Instant::now();
    let restored = read_container(&mut BufReader::new(File::open(&path)?))?;
    restored.check_version(&alg.version)?;
    let decoded = alg.decode(&restored.payload, restored.dtype, restored.shape)?;
    let read_time = t1.elapsed();
    verify_lossless(&dataset.signal, &decoded)?;

    println!("  file           : {}", path.display());
    println!("  on disk        : {}", human_bytes(written));
    println!(
        "  ratio          : {:.2}x",
        dataset.raw_bytes() as f64 / written.max(1) as f64
    );
    println!("  encode + write : {}", fmt_duration(write_time));
    println!("  read + decode  : {}", fmt_duration(read_time));
    println!("  verified       : bit-exact");
    println!();
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
