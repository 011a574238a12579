//! Example: Analyze a WAV file and print its chord timeline
//!
//! ```text
//! cargo run --example analyze_file -- song.wav [--json]
//! ```
//!
//! Set `RUST_LOG=chordline=debug` to see per-stage decisions.

use chordline::{analyze_audio, AnalysisConfig, AudioInput};

/// Load a WAV file as interleaved f32 samples
fn load_wav(path: &str) -> Result<(Vec<f32>, u16, u32), Box<dyn std::error::Error>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_value))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok((samples, spec.channels, spec.sample_rate))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: analyze_file <file.wav> [--json]");
        std::process::exit(2);
    };
    let as_json = args.any(|a| a == "--json");

    let (samples, channels, sample_rate) = load_wav(&path)?;
    let input = AudioInput::interleaved(&samples, channels, sample_rate);
    let result = analyze_audio(&input, AnalysisConfig::default())?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Analysis Results:");
    println!("  Key: {} / {} (confidence: {:.2})", result.key.name(), result.key.numerical(), result.key.confidence);
    println!("  Tempo: {} BPM", result.tempo_bpm);
    println!("  Music starts at {:.2}s of {:.2}s", result.music_start_time, result.duration_seconds);
    for warning in &result.metadata.confidence_warnings {
        println!("  Warning: {}", warning);
    }
    println!();
    for entry in &result.timeline {
        println!(
            "{:>8.2}s {:>8.2}s  {:<8} {:.2}",
            entry.start_time, entry.end_time, entry.label, entry.confidence
        );
    }
    println!();
    println!("Processing time: {:.2} ms", result.metadata.processing_time_ms);

    Ok(())
}
