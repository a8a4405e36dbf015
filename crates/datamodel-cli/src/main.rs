//! datamodel CLI: run, validate and explain YAML pipelines.

mod logging;

use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};

use datamodel_core::config::{ConfigOverrides, EngineConfig};
use datamodel_core::prelude::{BuildOptions, DataModel};
use datamodel_io::{load_model, CsvWriter, DataFormat, JsonlWriter};
use datamodel_operators::{Context, PipelineReport};
use datamodel_planner::{
    input_model, lower, parse_yaml_pipeline, validate, PipelineDoc, SourceFormat, Sources,
};

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "datamodel")]
#[command(about = "Run relational pipelines over immutable DataModels", long_about = None)]
struct Cli {
    /// Log filter, e.g. `info` or `datamodel=debug` (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Jsonl,
    Csv,
}

/// Engine settings that override both the environment and the pipeline file.
#[derive(clap::Args, Debug, Default)]
struct ConfigArgs {
    /// Reducer for measures without an explicit one
    #[arg(long)]
    default_reducer: Option<String>,

    /// Bucket count for bins without size/count/boundaries
    #[arg(long)]
    default_bin_count: Option<usize>,

    /// Label for values outside a bin range
    #[arg(long)]
    out_of_range_label: Option<String>,

    /// chrono format for temporal strings
    #[arg(long)]
    temporal_format: Option<String>,
}

impl ConfigArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            default_reducer: self.default_reducer.clone(),
            default_bin_count: self.default_bin_count,
            out_of_range_label: self.out_of_range_label.clone(),
            temporal_format: self.temporal_format.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a pipeline and write its result
    Run {
        /// Path to the pipeline YAML file
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format; inferred from the output extension, else jsonl
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Check a pipeline against its declared schemas without reading data
    Validate {
        /// Path to the pipeline YAML file
        #[arg(short, long)]
        pipeline: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Show each stage and the fields it produces
    Explain {
        /// Path to the pipeline YAML file
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Print the stage report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(&cli.log_level, cli.log_json) {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }

    let result = match cli.command {
        Commands::Run {
            pipeline,
            output,
            format,
            config,
        } => run_pipeline(&pipeline, output.as_deref(), format, &config),
        Commands::Validate { pipeline, config } => {
            validate_pipeline(&pipeline, &config).map(|report| {
                println!(
                    "✓ Pipeline is valid ({} stages, output fields: {})",
                    report.stages.len(),
                    output_fields(&report).join(", ")
                );
            })
        }
        Commands::Explain {
            pipeline,
            json,
            config,
        } => explain_pipeline(&pipeline, json, &config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Environment, then the document's `config:` block, then command-line flags.
fn resolve_config(doc: &PipelineDoc, args: &ConfigArgs) -> EngineConfig {
    let mut cfg = doc.engine_config(EngineConfig::from_env());
    cfg.apply(&args.overrides());
    cfg
}

fn read_doc(path: &Path) -> CliResult<PipelineDoc> {
    let yaml = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Ok(parse_yaml_pipeline(&yaml)?)
}

fn data_format(format: SourceFormat) -> DataFormat {
    match format {
        SourceFormat::Csv => DataFormat::Csv,
        SourceFormat::Json => DataFormat::Json,
        SourceFormat::Jsonl => DataFormat::Jsonl,
    }
}

/// Load every declared source. Relative paths resolve against `base_dir`.
fn load_sources(doc: &PipelineDoc, base_dir: &Path, cfg: &EngineConfig) -> CliResult<Sources> {
    let options = BuildOptions::from_config(cfg);
    let mut sources = Sources::new();
    for (name, def) in &doc.sources {
        let path = base_dir.join(&def.path);
        let model = load_model(&path, data_format(def.format), &def.schema, &options)
            .map_err(|e| format!("source '{name}' ({}): {e}", path.display()))?;
        info!(source = %name, rows = model.len(), "loaded source");
        sources.insert(name.clone(), model);
    }
    Ok(sources)
}

fn base_dir(pipeline: &Path) -> &Path {
    pipeline.parent().unwrap_or_else(|| Path::new("."))
}

/// Load the sources of `doc` and run it, returning its result and stage report.
fn execute(
    pipeline: &Path,
    doc: &PipelineDoc,
    cfg: &EngineConfig,
) -> CliResult<(DataModel, PipelineReport)> {
    debug!(?cfg, "engine config");
    let sources = load_sources(doc, base_dir(pipeline), cfg)?;
    let plan = lower(doc, &sources, cfg)?;
    let ctx = Context::new(cfg.clone());
    let (out, report) = plan.run_with_report(input_model(doc, &sources)?, &ctx)?;
    for stage in &report.stages {
        info!(stage = %stage.description, rows = stage.rows, "stage complete");
    }
    Ok((out, report))
}

fn output_format(output: Option<&Path>, format: Option<OutputFormat>) -> OutputFormat {
    format
        .or_else(|| match output.and_then(DataFormat::from_path) {
            Some(DataFormat::Csv) => Some(OutputFormat::Csv),
            _ => None,
        })
        .unwrap_or(OutputFormat::Jsonl)
}

fn write_output<W: Write>(
    model: &DataModel,
    writer: W,
    format: OutputFormat,
    temporal_format: &str,
) -> CliResult<usize> {
    let written = match format {
        OutputFormat::Jsonl => {
            let mut w = JsonlWriter::to_writer(writer);
            w.write_model(model)?;
            w.rows_written()
        }
        OutputFormat::Csv => {
            let mut w = CsvWriter::to_writer(writer).with_temporal_format(temporal_format);
            w.write_model(model)?;
            w.rows_written()
        }
    };
    Ok(written)
}

fn run_pipeline(
    pipeline: &Path,
    output: Option<&Path>,
    format: Option<OutputFormat>,
    args: &ConfigArgs,
) -> CliResult<()> {
    let doc = read_doc(pipeline)?;
    let cfg = resolve_config(&doc, args);
    let (out, report) = execute(pipeline, &doc, &cfg)?;
    let format = output_format(output, format);

    let written = match output {
        Some(path) => {
            let f = fs::File::create(path)
                .map_err(|e| format!("cannot create {}: {e}", path.display()))?;
            write_output(&out, f, format, &cfg.temporal_format)?
        }
        None => write_output(&out, std::io::stdout().lock(), format, &cfg.temporal_format)?,
    };

    info!(
        input_rows = report.input_rows,
        output_rows = written,
        "pipeline finished"
    );
    Ok(())
}

fn validate_pipeline(pipeline: &Path, args: &ConfigArgs) -> CliResult<PipelineReport> {
    let doc = read_doc(pipeline)?;
    let cfg = resolve_config(&doc, args);
    Ok(validate(&doc, &cfg)?)
}

fn output_fields(report: &PipelineReport) -> Vec<String> {
    report
        .stages
        .last()
        .map(|s| s.fields.clone())
        .unwrap_or_default()
}

fn explain_pipeline(pipeline: &Path, json: bool, args: &ConfigArgs) -> CliResult<()> {
    let doc = read_doc(pipeline)?;
    let cfg = resolve_config(&doc, args);
    let report = validate(&doc, &cfg)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Pipeline Plan");
    println!("=============");
    println!();
    println!("Input: {}", doc.input);
    for (name, def) in &doc.sources {
        let fields: Vec<&str> = def.schema.iter().map(|f| f.name.as_str()).collect();
        println!("  {} ({:?}, {}): {}", name, def.format, def.path, fields.join(", "));
    }
    println!();
    println!("Config:");
    println!("  Default reducer: {}", cfg.default_reducer);
    println!("  Default bin count: {}", cfg.default_bin_count);
    println!("  Temporal format: {}", cfg.temporal_format);
    println!();
    println!("Stages:");
    for (i, stage) in report.stages.iter().enumerate() {
        println!("  {}. {}", i + 1, stage.description);
        println!("     fields: {}", stage.fields.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIPELINE: &str = r#"
config: { default_reducer: sum }
sources:
  sales:
    path: data/sales.csv
    format: csv
    schema:
      - { name: city, type: dimension }
      - { name: sales, type: measure }
input: sales
steps:
  - { op: group_by, dimensions: [city] }
  - { op: sort, by: [ { field: city } ] }
"#;

    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("data")).unwrap();
        fs::write(
            dir.path().join("data/sales.csv"),
            "city,sales\nNY,10\nLA,7\nNY,5\n",
        )
        .unwrap();
        fs::write(dir.path().join("pipeline.yaml"), PIPELINE).unwrap();
        dir
    }

    #[test]
    fn pipeline_config_overrides_env_defaults() {
        let doc = parse_yaml_pipeline(&PIPELINE.replace("sum", "avg")).unwrap();
        let cfg = resolve_config(&doc, &ConfigArgs::default());
        assert_eq!(cfg.default_reducer, "avg");
    }

    #[test]
    fn cli_overrides_higher_priority_than_config() {
        let doc = parse_yaml_pipeline(PIPELINE).unwrap();
        let args = ConfigArgs {
            default_reducer: Some("max".into()),
            ..Default::default()
        };
        assert_eq!(resolve_config(&doc, &args).default_reducer, "max");
    }

    #[test]
    fn sources_resolve_relative_to_the_pipeline() {
        let dir = workspace();
        let doc = parse_yaml_pipeline(PIPELINE).unwrap();
        let cfg = resolve_config(&doc, &ConfigArgs::default());
        let (out, report) = execute(&dir.path().join("pipeline.yaml"), &doc, &cfg).unwrap();
        assert_eq!(report.input_rows, 3);
        let mut buf = Vec::new();
        write_output(&out, &mut buf, OutputFormat::Csv, "%Y-%m-%d").unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "city,sales\nLA,7\nNY,15\n");
    }

    #[test]
    fn run_writes_the_output_file() {
        let dir = workspace();
        let out = dir.path().join("out.jsonl");
        run_pipeline(
            &dir.path().join("pipeline.yaml"),
            Some(&out),
            None,
            &ConfigArgs {
                default_reducer: Some("max".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let text = fs::read_to_string(&out).unwrap();
        assert_eq!(
            text,
            "{\"city\":\"LA\",\"sales\":7.0}\n{\"city\":\"NY\",\"sales\":10.0}\n"
        );
    }

    #[test]
    fn missing_source_files_name_the_source() {
        let dir = workspace();
        fs::remove_file(dir.path().join("data/sales.csv")).unwrap();
        let doc = parse_yaml_pipeline(PIPELINE).unwrap();
        let cfg = resolve_config(&doc, &ConfigArgs::default());
        let err = execute(&dir.path().join("pipeline.yaml"), &doc, &cfg).unwrap_err();
        assert!(err.to_string().starts_with("source 'sales'"));
    }

    #[test]
    fn validate_needs_no_data() {
        let dir = workspace();
        fs::remove_file(dir.path().join("data/sales.csv")).unwrap();
        let report =
            validate_pipeline(&dir.path().join("pipeline.yaml"), &ConfigArgs::default()).unwrap();
        assert_eq!(output_fields(&report), vec!["city", "sales"]);
    }

    #[test]
    fn output_format_inference() {
        assert_eq!(output_format(Some(Path::new("a.csv")), None), OutputFormat::Csv);
        assert_eq!(output_format(Some(Path::new("a.txt")), None), OutputFormat::Jsonl);
        assert_eq!(
            output_format(Some(Path::new("a.csv")), Some(OutputFormat::Jsonl)),
            OutputFormat::Jsonl
        );
        assert_eq!(output_format(None, None), OutputFormat::Jsonl);
    }
}
