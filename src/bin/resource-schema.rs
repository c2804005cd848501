//! Resource Schema CLI
//!
//! Command-line interface for generating schemas and serializing payloads
//! from JSON resource declarations.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use resource_schema::{
    load_catalog, load_json, Catalog, LoadError, ResourceType, SchemaOptions, Selection,
    Selector, SerializeOptions, DEFAULT_MAX_DEPTH,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "resource-schema")]
#[command(about = "Generate JSON Schema and serialize payloads from resource declarations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the JSON Schema of a declared resource
    Schema {
        /// Declaration file
        declarations: PathBuf,

        /// Resource name
        #[arg(long, short)]
        resource: String,

        /// Field selection as JSON, e.g. '["id", {"images": ["id"]}]'
        #[arg(long)]
        select: Option<String>,

        /// Encode nullable fields the OpenAPI way (nullable: true)
        #[arg(long)]
        openapi: bool,

        /// Emit reference stubs for nested resources instead of inlining them
        #[arg(long)]
        use_ref: bool,

        /// Maximum resource nesting
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Serialize a JSON payload (object or array of objects) as a resource
    Serialize {
        /// Declaration file
        declarations: PathBuf,

        /// Resource name
        #[arg(long, short)]
        resource: String,

        /// Payload file
        #[arg(long, short)]
        input: PathBuf,

        /// Field selection as JSON
        #[arg(long)]
        select: Option<String>,

        /// Context object file passed to accessors
        #[arg(long)]
        context: Option<PathBuf>,

        /// Maximum resource nesting
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the OpenAPI parameter objects of a declared parameter set
    Parameters {
        /// Declaration file
        declarations: PathBuf,

        /// Parameter set name
        #[arg(long, short)]
        name: String,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Schema {
            declarations,
            resource,
            select,
            openapi,
            use_ref,
            max_depth,
            output,
            pretty,
        } => {
            let options = SchemaOptions::new()
                .openapi(openapi)
                .use_ref(use_ref)
                .max_depth(max_depth);
            run_schema(&declarations, &resource, select.as_deref(), &options, output, pretty)
        }

        Commands::Serialize {
            declarations,
            resource,
            input,
            select,
            context,
            max_depth,
            output,
            pretty,
        } => run_serialize(SerializeArgs {
            declarations,
            resource,
            input,
            select,
            context,
            options: SerializeOptions::new().max_depth(max_depth),
            output,
            pretty,
        }),

        Commands::Parameters {
            declarations,
            name,
            pretty,
        } => run_parameters(&declarations, &name, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_schema(
    declarations: &Path,
    resource: &str,
    select: Option<&str>,
    options: &SchemaOptions,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let catalog = load(declarations)?;
    let selection = selection_for(&catalog, resource, select)?;

    let schema = selection.to_json_schema(options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    write_output(&schema, output, pretty)
}

struct SerializeArgs {
    declarations: PathBuf,
    resource: String,
    input: PathBuf,
    select: Option<String>,
    context: Option<PathBuf>,
    options: SerializeOptions,
    output: Option<PathBuf>,
    pretty: bool,
}

fn run_serialize(args: SerializeArgs) -> Result<(), u8> {
    let SerializeArgs {
        declarations,
        resource,
        input,
        select,
        context,
        options,
        output,
        pretty,
    } = args;

    let catalog = load(&declarations)?;
    let mut selection = selection_for(&catalog, &resource, select.as_deref())?;

    if let Some(path) = context {
        let context = match load_json(&path).map_err(report_load)? {
            Value::Object(map) => map,
            other => {
                eprintln!(
                    "Error: context must be a JSON object, got {}",
                    resource_schema::json_type_name(&other)
                );
                return Err(2);
            }
        };
        selection = selection.context(context);
    }

    let payload = load_json(&input).map_err(report_load)?;

    let serialized = selection.serialize_with(&payload, &options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    write_output(&serialized, output, pretty)
}

fn run_parameters(declarations: &Path, name: &str, pretty: bool) -> Result<(), u8> {
    let catalog = load(declarations)?;
    let Some(params) = catalog.parameters(name) else {
        eprintln!("Error: unknown parameter set `{}`", name);
        return Err(2);
    };

    let openapi = params.to_openapi().map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    write_output(&openapi, None, pretty)
}

fn load(declarations: &Path) -> Result<Catalog, u8> {
    load_catalog(declarations).map_err(report_load)
}

fn report_load(e: LoadError) -> u8 {
    eprintln!("Error: {}", e);
    e.exit_code() as u8
}

fn selection_for(catalog: &Catalog, resource: &str, select: Option<&str>) -> Result<Selection, u8> {
    let resource: &ResourceType = catalog.require_resource(resource).map_err(report_load)?;

    let Some(raw) = select else {
        return Ok(Selection::new(resource.clone()));
    };

    let value: Value = serde_json::from_str(raw).map_err(|e| {
        eprintln!("Error: invalid --select JSON: {}", e);
        2u8
    })?;
    let selector = Selector::from_json(&value).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    Ok(resource.select(selector))
}

fn write_output(value: &Value, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}
