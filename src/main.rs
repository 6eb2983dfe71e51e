use anyhow::{bail, Context, Result};
use serde_json::json;
use std::fs;
use std::path::Path;

use biolock_lib::face::FaceTemplate;
use biolock_lib::voice::VoiceTemplate;
use biolock_lib::{AppConfig, AppPaths, Biometrics, Modality};

const USAGE: &str = "\
Usage: biolock <command> [args]

Commands:
  status                        Show registration status per modality
  enroll-face  <embedding>      Register a 128-value face embedding
  verify-face  <embedding>      Verify a face embedding against the enrolled one
  enroll-voice <mfcc>           Register an MFCC matrix (rows of 13 values)
  verify-voice <mfcc>           Verify an MFCC matrix against the enrolled voice
  export <face|voice> <out>     Decrypt a template to <out> in canonical encoding
  reset  <face|voice>           Delete the template and key of a modality

<embedding> and <mfcc> are JSON arrays, given inline or as @path/to/file.json";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&args) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<()> {
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let paths = AppPaths::new()?;
    paths.ensure_directories()?;
    let config = AppConfig::load_or_create(&paths.config_file())
        .context("Failed to load configuration")?;
    let biometrics = Biometrics::new(paths, config)?;

    match (command.as_str(), &args[1..]) {
        ("status", []) => print_json(&biometrics.status()),
        ("enroll-face", [input]) => {
            let embedding = parse_face(input)?;
            biometrics.register_face(&embedding)?;
            print_json(&json!({ "success": true, "message": "Face registered and encrypted successfully!" }))
        }
        ("verify-face", [input]) => {
            let embedding = parse_face(input)?;
            let label = biometrics.verify_face(&embedding)?;
            let color = label.color();
            print_json(&json!({
                "label": label.text(),
                "color": [color.0, color.1, color.2],
            }))
        }
        ("enroll-voice", [input]) => {
            let template = parse_voice(input)?;
            biometrics.register_voice(&template)?;
            print_json(&json!({ "success": true, "message": "Voice registered and encrypted successfully!" }))
        }
        ("verify-voice", [input]) => {
            let live = parse_voice(input)?;
            let result = biometrics.verify_voice(&live);
            print_json(&result)?;
            if !result.success {
                std::process::exit(2);
            }
            Ok(())
        }
        ("export", [modality, out]) => {
            let modality: Modality = modality.parse().map_err(anyhow::Error::msg)?;
            biometrics.export_template(modality, Path::new(out))?;
            log::info!("{} template exported to {}", modality, out);
            Ok(())
        }
        ("reset", [modality]) => {
            let modality: Modality = modality.parse().map_err(anyhow::Error::msg)?;
            biometrics.reset(modality)?;
            Ok(())
        }
        _ => bail!("Invalid arguments\n\n{}", USAGE),
    }
}

/// Inline JSON, or `@path` to read it from a file
fn read_input(input: &str) -> Result<String> {
    match input.strip_prefix('@') {
        Some(path) => fs::read_to_string(path).with_context(|| format!("Failed to read {}", path)),
        None => Ok(input.to_string()),
    }
}

fn parse_face(input: &str) -> Result<FaceTemplate> {
    let values: Vec<f64> =
        serde_json::from_str(&read_input(input)?).context("Face embedding must be a JSON array")?;
    Ok(FaceTemplate::try_from(values)?)
}

/// Rows of raw coefficients; normalized on construction
fn parse_voice(input: &str) -> Result<VoiceTemplate> {
    let rows: Vec<Vec<f32>> = serde_json::from_str(&read_input(input)?)
        .context("MFCC matrix must be a JSON array of rows")?;
    Ok(VoiceTemplate::from_rows(rows)?)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
