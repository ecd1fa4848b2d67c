use std::env;
use std::fs;
use std::process;

use log::info;
use swara::Settings;

const USAGE: &str = "Usage: swara <piece.json> [--settings <file.yaml>] [--out <file.json>]";

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut input_path: Option<&String> = None;
    let mut settings_path: Option<&String> = None;
    let mut output_path: Option<&String> = None;

    // Parse flags
    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--settings" => settings_path = rest.next(),
            "--out" => output_path = rest.next(),
            _ if input_path.is_none() => input_path = Some(arg),
            _ => {
                eprintln!("{}", USAGE);
                process::exit(1);
            }
        }
    }
    let Some(input_path) = input_path else {
        eprintln!("{}", USAGE);
        process::exit(1);
    };

    let settings = match settings_path {
        Some(path) => match Settings::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Error reading settings '{}': {}", path, e);
                process::exit(1);
            }
        },
        None => Settings::default(),
    };

    env_logger::Builder::new()
        .filter_level(settings.log_level)
        .parse_default_env()
        .init();

    // Read input file
    let source = match fs::read_to_string(input_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", input_path, e);
            process::exit(1);
        }
    };

    let piece = match swara::load_piece(&source) {
        Ok(piece) => piece,
        Err(e) => {
            eprintln!("Invalid transcription: {}", e);
            process::exit(1);
        }
    };

    info!(
        "'{}' in raga {}: {:.2}s across {} track(s)",
        piece.title,
        piece.raga().name,
        piece.dur_tot,
        piece.instrumentation.len()
    );
    for (track, instrument) in piece.instrumentation.iter().enumerate() {
        let trajs = piece.all_trajectories(track).map(|t| t.len()).unwrap_or_default();
        let chunks = piece
            .chunked_trajs(track, settings.chunk_duration)
            .map(|c| c.len())
            .unwrap_or_default();
        info!(
            "track {} ({}): {} phrases, {} trajectories, {} chunks",
            track,
            instrument,
            piece.phrase_grid[track].len(),
            trajs,
            chunks
        );
    }

    // Output
    if let Some(path) = output_path {
        let json = match piece.to_json().and_then(|v| Ok(serde_json::to_string_pretty(&v)?)) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Error encoding transcription: {}", e);
                process::exit(1);
            }
        };
        if let Err(e) = fs::write(path, json) {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        }
        eprintln!("Wrote transcription to {}", path);
    }
}
