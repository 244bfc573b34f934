//! Lightweight compile/extract benchmark harness for local baselines.
//!
//! Run from repository root:
//! `cargo run -p switchboard_core --example extraction_benchmark --release`

use std::time::Instant;

use switchboard_core::{AliasMeta, ArgMeta, ArgvParser, FunctionMeta, TypeDecl};

fn sample_meta(extra_args: usize) -> FunctionMeta {
    let mut meta = FunctionMeta::new()
        .with_arg("dest", ArgMeta::of_type("str").required().at(0))
        .with_arg(
            "files",
            ArgMeta::of_type(TypeDecl::array_of("str")).at(1).greedy(),
        )
        .with_arg("verbose", ArgMeta::of_type("bool").alias("v", AliasMeta::default()))
        .with_arg("tag", ArgMeta::of_type(TypeDecl::array_of("str")))
        .with_arg("options", ArgMeta::of_type("hash"));
    for i in 0..extra_args {
        meta = meta.with_arg(format!("opt_{i}"), ArgMeta::of_type("int"));
    }
    meta
}

fn sample_argv() -> Vec<String> {
    [
        "-v", "--tag", "a", "--tag", "b", "--options", "{depth: 3, follow: true}", "--opt-0",
        "7", "out", "x.txt", "y.txt", "z.txt",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn run_benchmark(label: &str, meta: &FunctionMeta, iterations: usize) -> Result<(), String> {
    let parser = ArgvParser::new().meta(meta).per_arg_json(true);

    let compile_start = Instant::now();
    for _ in 0..iterations {
        parser.compile().map_err(|e| e.to_string())?;
    }
    let compile_elapsed = compile_start.elapsed();

    let mut parser = parser;
    let argv = sample_argv();
    let extract_start = Instant::now();
    for _ in 0..iterations {
        let mut tokens = argv.clone();
        parser.parse(&mut tokens).map_err(|e| e.to_string())?;
    }
    let extract_elapsed = extract_start.elapsed();

    println!("Benchmark: {label}");
    println!("  args: {}", meta.args.len());
    println!(
        "  compile: total={:?}, per_iter={:.3} ms",
        compile_elapsed,
        compile_elapsed.as_secs_f64() * 1000.0 / iterations as f64
    );
    println!(
        "  extract: total={:?}, per_iter={:.3} ms",
        extract_elapsed,
        extract_elapsed.as_secs_f64() * 1000.0 / iterations as f64
    );
    Ok(())
}

fn main() -> Result<(), String> {
    let iterations = std::env::var("SWITCHBOARD_BENCH_ITERS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(2000);

    for (label, extra) in [("small", 1), ("wide", 200)] {
        run_benchmark(label, &sample_meta(extra), iterations)?;
    }
    Ok(())
}
