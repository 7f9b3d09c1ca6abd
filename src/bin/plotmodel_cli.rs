//! PlotModel CLI - Bridge interface for host-language embeddings
//!
//! Commands: schemas, validate, apply
//! Outputs JSON to stdout
//! Returns non-zero on validation failure

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use plotmodel_core::{Document, DocumentError, PropertyKind, SchemaRegistry, Value};

#[derive(Parser)]
#[command(name = "plotmodel-cli")]
#[command(about = "PlotModel CLI - Declarative Plotting Model Engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to schema specs directory
    #[arg(short, long, default_value = "schemas")]
    schemas_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// List available model schemas
    Schemas,

    /// Run one value through a property kind's transform and validate
    Validate {
        /// Property kind: date, datetime, or timedelta
        #[arg(short, long)]
        kind: String,

        /// JSON value literal
        #[arg(short, long)]
        value: String,
    },

    /// Create a model instance and apply a JSON payload atomically
    Apply {
        /// Schema name
        #[arg(short, long)]
        schema: String,

        /// JSON payload (attribute -> value object)
        #[arg(short, long)]
        payload: String,
    },
}

fn parse_kind(s: &str) -> Option<PropertyKind> {
    match s {
        "date" => Some(PropertyKind::Date),
        "datetime" => Some(PropertyKind::Datetime),
        "timedelta" => Some(PropertyKind::TimeDelta),
        _ => None,
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let registry = match SchemaRegistry::load_from_dir(&cli.schemas_dir) {
        Ok(r) => r,
        Err(e) => {
            eprintln!(r#"{{"error": "Failed to load schemas: {}"}}"#, e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Schemas => {
            let schemas: Vec<_> = registry
                .list()
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "name": s.name(),
                        "attributes": s
                            .attributes()
                            .map(|(name, d)| serde_json::json!({
                                "name": name,
                                "kind": d.kind.name(),
                                "help": d.help,
                            }))
                            .collect::<Vec<_>>(),
                    })
                })
                .collect();

            println!("{}", serde_json::to_string_pretty(&schemas).unwrap());
            ExitCode::SUCCESS
        }

        Commands::Validate { kind, value } => {
            let kind = match parse_kind(&kind) {
                Some(k) => k,
                None => {
                    println!(r#"{{"valid": false, "error": "Unknown kind: {}"}}"#, kind);
                    return ExitCode::FAILURE;
                }
            };

            let json: serde_json::Value = match serde_json::from_str(&value) {
                Ok(v) => v,
                Err(e) => {
                    println!(r#"{{"valid": false, "error": "Invalid value literal: {}"}}"#, e);
                    return ExitCode::FAILURE;
                }
            };
            let value = match Value::from_json(&json) {
                Some(v) => v,
                None => {
                    let output = serde_json::json!({
                        "valid": false,
                        "kind": kind.name(),
                        "error": "Value is not representable",
                    });
                    println!("{}", serde_json::to_string(&output).unwrap());
                    return ExitCode::from(2);
                }
            };

            let normalized = kind.transform(value);
            match kind.validate(&normalized, true) {
                Ok(()) => {
                    let output = serde_json::json!({
                        "valid": true,
                        "kind": kind.name(),
                        "normalized": normalized.to_json(),
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    let output = serde_json::json!({
                        "valid": false,
                        "kind": kind.name(),
                        "error": e.to_string(),
                    });
                    println!("{}", serde_json::to_string(&output).unwrap());
                    ExitCode::from(2) // Validation failure
                }
            }
        }

        Commands::Apply { schema, payload } => {
            let payload: serde_json::Value = match serde_json::from_str(&payload) {
                Ok(p) => p,
                Err(e) => {
                    println!(r#"{{"success": false, "error": "Invalid payload: {}"}}"#, e);
                    return ExitCode::FAILURE;
                }
            };
            let Some(entries) = payload.as_object() else {
                println!(r#"{{"success": false, "error": "Payload must be a JSON object"}}"#);
                return ExitCode::FAILURE;
            };

            let mut document = Document::new(registry);
            let id = match document.create(&schema) {
                Ok(id) => id,
                Err(e) => {
                    let output = serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                    });
                    println!("{}", serde_json::to_string(&output).unwrap());
                    return ExitCode::FAILURE;
                }
            };

            match document.apply(id, entries) {
                Ok(()) => {
                    let instance = match document.instance(id) {
                        Ok(i) => i,
                        Err(e) => {
                            println!(r#"{{"success": false, "error": "{}"}}"#, e);
                            return ExitCode::FAILURE;
                        }
                    };
                    let output = serde_json::json!({
                        "success": true,
                        "model": instance.to_json(),
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    let output = serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                    });
                    println!("{}", serde_json::to_string(&output).unwrap());
                    match e {
                        DocumentError::Rejected { .. }
                        | DocumentError::UnknownAttribute { .. }
                        | DocumentError::UnsupportedPayload { .. } => ExitCode::from(2),
                        _ => ExitCode::FAILURE,
                    }
                }
            }
        }
    }
}
