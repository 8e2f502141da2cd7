// Chorale generator: CLI entry point.
//
// Runs one generation request and writes the result as a Standard MIDI File
// and, optionally, as JSON for notation front ends.
// The pipeline: request parsing → progression + voicing → MIDI/JSON output.
//
// Usage:
//   cargo run -p chorale_music --bin generate -- [output.mid] [--key KEY]
//     [--meter M/N] [--measures N] [--complexity 0-10] [--smoothness 0-10]
//     [--strictness 0-10] [--seed N] [--tempo BPM] [--config engine.json]
//     [--json out.json]
//
// Set RUST_LOG=chorale_music=debug to trace each measure's voicing.

use chorale_music::config::{EngineConfig, GenerationSettings};
use chorale_music::engine::{GenerationRequest, generate};
use chorale_music::midi::write_midi;
use chorale_music::theory::TertianTheory;
use chorale_music::voicing::Voice;
use chorale_prng::ChoraleRng;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> chorale_music::Result<()> {
    let output_path = args
        .get(1)
        .filter(|s| !s.starts_with("--"))
        .map(|s| s.as_str())
        .unwrap_or("chorale.mid");
    let key: String = parse_flag(args, "--key").unwrap_or_else(|| "C".to_string());
    let meter: String = parse_flag(args, "--meter").unwrap_or_else(|| "4/4".to_string());
    let measures: usize = parse_flag(args, "--measures").unwrap_or(8);
    let defaults = GenerationSettings::default();
    let settings = GenerationSettings {
        harmonic_complexity: parse_flag(args, "--complexity")
            .unwrap_or(defaults.harmonic_complexity),
        melodic_smoothness: parse_flag(args, "--smoothness").unwrap_or(defaults.melodic_smoothness),
        dissonance_strictness: parse_flag(args, "--strictness")
            .unwrap_or(defaults.dissonance_strictness),
    };
    let seed: u64 = parse_flag(args, "--seed").unwrap_or_else(clock_seed);
    let tempo: u16 = parse_flag(args, "--tempo").unwrap_or(72);
    let config_path: Option<String> = parse_flag(args, "--config");
    let json_path: Option<String> = parse_flag(args, "--json");

    let request = GenerationRequest::parse(&key, &meter, measures)?.with_settings(settings);

    println!("=== Chorale Generator ===");
    println!("Output: {}", output_path);
    println!("Key: {}", request.key);
    println!("Meter: {}", request.meter);
    println!("Measures: {}", request.measures);
    println!(
        "Complexity / smoothness / strictness: {} / {} / {}",
        settings.harmonic_complexity, settings.melodic_smoothness, settings.dissonance_strictness
    );
    println!("Seed: {}", seed);
    println!();

    println!("[1/3] Loading engine configuration...");
    let config = match &config_path {
        Some(path) => {
            let config = EngineConfig::load(Path::new(path))?;
            println!("  Loaded {}.", path);
            config
        }
        None => {
            println!("  Using defaults.");
            EngineConfig::default()
        }
    };

    println!("[2/3] Harmonizing...");
    let mut rng = ChoraleRng::new(seed);
    let chorale = generate(&request, &config, &TertianTheory, &mut rng)?;
    println!("  Progression: {}", chorale.progression.join(" "));
    for voice in Voice::ALL {
        let rests = chorale
            .voices
            .voice(voice)
            .iter()
            .filter(|e| e.is_rest())
            .count();
        if rests > 0 {
            println!("  {}: {} resting beats", voice.name(), rests);
        }
    }
    if chorale.findings.is_empty() {
        println!("  No voice-leading findings.");
    } else {
        println!("  {} voice-leading findings:", chorale.findings.len());
        for finding in &chorale.findings {
            println!("    measure {}: {}", finding.measure + 1, finding.violation);
        }
    }

    println!("[3/3] Writing output...");
    write_midi(&chorale, Path::new(output_path), tempo)?;
    println!("  MIDI: {}", output_path);
    if let Some(path) = &json_path {
        let json = serde_json::to_string_pretty(&chorale)?;
        std::fs::write(path, json)?;
        println!("  JSON: {}", path);
    }

    println!();
    println!("Done!");
    Ok(())
}

/// Seed from the wall clock when none is given on the command line.
fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
