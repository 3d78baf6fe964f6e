use clap::{Parser, Subcommand, ValueEnum};
use formcap::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "formcap")]
#[command(about = "Check form schemas, validate records and resolve completion status")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a form schema for structural errors
    CheckSchema {
        /// Path to the schema file (`{"fields": [...]}`)
        #[arg(short, long)]
        schema: PathBuf,
    },
    /// Validate field values against a form schema
    Validate {
        /// Path to the schema file
        #[arg(short, long)]
        schema: PathBuf,
        /// Path to a JSON object of field values
        #[arg(long)]
        values: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Resolve the completion status of a form for a subject
    Status {
        /// Path to a JSON array of records
        #[arg(short, long)]
        records: PathBuf,
        /// Form id
        #[arg(long)]
        form: String,
        /// Subject id (PID)
        #[arg(long)]
        subject: String,
        /// Visit id
        #[arg(long)]
        visit: Option<String>,
    },
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::CheckSchema { schema } => {
            let schema: FormSchema = read_json(&schema)?;
            match schema.check_structure() {
                Ok(()) => {
                    println!("✓ Schema is valid ({} fields)", schema.len());
                    Ok(true)
                }
                Err(e) => {
                    println!("✗ {e}");
                    Ok(false)
                }
            }
        }
        Commands::Validate {
            schema,
            values,
            format,
        } => {
            let schema: FormSchema = read_json(&schema)?;
            let values: FieldValues = read_json(&values)?;
            let result = RecordValidator::new(&schema)?.validate(&values);

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Text => {
                    if result.is_valid {
                        println!("✓ Record is valid");
                    } else {
                        println!("✗ Record is invalid ({} errors)", result.errors.len());
                        for issue in &result.errors {
                            println!("  - {}: {}", issue.field, issue.message);
                        }
                    }
                }
            }
            Ok(result.is_valid)
        }
        Commands::Status {
            records,
            form,
            subject,
            visit,
        } => {
            let records: Vec<Record> = read_json(&records)?;
            let resolution = resolve_status_detailed(&form, &subject, visit.as_deref(), &records);
            println!("{}", resolution.status);
            if resolution.is_ambiguous() {
                eprintln!("warning: {} records match this tuple", resolution.matches);
            }
            Ok(true)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}
