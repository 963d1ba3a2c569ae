//! heartrisk CLI - Command-line front-end for heart-risk
//!
//! Commands:
//! - assess: Assess a single request
//! - run: Assess NDJSON requests from stdin (streaming mode)
//! - validate: Range-check requests without scoring them
//! - doctor: Diagnose configuration and artifacts
//! - schema: Print input, output or feature schema
//! - form: Print form labels for an audience mode

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use heart_risk::config::{CONFIG_FILE, ENV_PREFIX};
use heart_risk::encoder::ReportEncoder;
use heart_risk::messages::FormField;
use heart_risk::model::ModelArtifact;
use heart_risk::scaler::ScalerArtifact;
use heart_risk::{
    AssessError, Artifacts, AudienceMode, Config, FeatureSchema, InputAdapter, RawInput,
    RiskService, INPUT_SCHEMA_VERSION, PRODUCER_NAME, VERSION,
};

/// heartrisk - Heart disease risk assessment from clinical attributes
#[derive(Parser)]
#[command(name = "heartrisk")]
#[command(version = VERSION)]
#[command(about = "Assess heart disease risk with a pre-trained classifier", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./heartrisk.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format (filter with HEARTRISK_LOG, default "warn")
    #[arg(long, global = true, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess a single request (JSON object)
    Assess {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Audience mode for the message (overrides config)
        #[arg(long)]
        mode: Option<Mode>,

        /// Output format
        #[arg(long, default_value = "text")]
        output_format: OutputFormat,

        /// Include the assembled feature vector in JSON output
        #[arg(long)]
        show_features: bool,
    },

    /// Assess newline-delimited requests from stdin (streaming mode)
    Run {
        /// Audience mode for messages (overrides config)
        #[arg(long)]
        mode: Option<Mode>,

        /// Flush output after each record
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        flush: bool,
    },

    /// Range-check requests without scoring them
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and artifacts
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },

    /// Print form labels and options for an audience
    Form {
        /// Audience mode (overrides config)
        #[arg(long)]
        mode: Option<Mode>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Plain single-audience copy
    Standard,
    /// Clinical wording
    Professional,
    /// Addressed to the patient
    Patient,
    /// Addressed to a family member
    Family,
}

impl From<Mode> for AudienceMode {
    fn from(m: Mode) -> Self {
        match m {
            Mode::Standard => AudienceMode::Standard,
            Mode::Professional => AudienceMode::Professional,
            Mode::Patient => AudienceMode::Patient,
            Mode::Family => AudienceMode::Family,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one request per line)
    Ndjson,
    /// JSON array of requests
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Rendered message only
    Text,
    /// Single-line JSON report
    Json,
    /// Pretty-printed JSON report
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Request schema (heart.assessment_input.v1)
    Input,
    /// Report schema
    Output,
    /// Feature columns of the configured artifacts
    Features,
}

#[derive(Clone, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_format);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error = CliError::from(e);
            eprintln!(
                "{}",
                serde_json::to_string(&error).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(format: &LogFormat) {
    let filter =
        EnvFilter::try_from_env("HEARTRISK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn run(cli: Cli) -> Result<(), HeartCliError> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Assess {
            input,
            mode,
            output_format,
            show_features,
        } => {
            let mode = mode.map(AudienceMode::from).unwrap_or(config.mode);
            cmd_assess(&config, &input, mode, output_format, show_features)
        }

        Commands::Run { mode, flush } => {
            let mode = mode.map(AudienceMode::from).unwrap_or(config.mode);
            cmd_run(&config, mode, flush)
        }

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { json } => cmd_doctor(&config, cli.config.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(&config, schema_type, json_schema),

        Commands::Form { mode, json } => {
            let mode = mode.map(AudienceMode::from).unwrap_or(config.mode);
            cmd_form(mode, json)
        }
    }
}

fn read_input(input: &Path) -> Result<String, HeartCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn cmd_assess(
    config: &Config,
    input: &Path,
    mode: AudienceMode,
    output_format: OutputFormat,
    show_features: bool,
) -> Result<(), HeartCliError> {
    let input_data = read_input(input)?;
    if input_data.trim().is_empty() {
        return Err(HeartCliError::NoInput);
    }
    let raw: RawInput = serde_json::from_str(&input_data).map_err(AssessError::from)?;

    let service = RiskService::start(config);
    let engine = service.engine()?;
    let vector = engine.features(&raw)?;
    let prediction = engine.score(&vector)?;

    let encoder = ReportEncoder::new();
    let report = encoder.encode(prediction, mode, show_features.then_some(&vector));

    match output_format {
        OutputFormat::Text => println!("{}", report.message),
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

fn cmd_run(config: &Config, mode: AudienceMode, flush: bool) -> Result<(), HeartCliError> {
    // Artifacts load once; every request shares the same read-only engine
    let service = RiskService::start(config);
    if !service.is_ready() {
        warn!("artifacts unavailable; every request will be refused");
    }

    let encoder = ReportEncoder::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    // Split on raw bytes so one undecodable line is rejected on its own
    for (line_num, line) in stdin.lock().split(b'\n').enumerate() {
        let line = line?;

        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let outcome = InputAdapter::decode_line(&line, line_num + 1)
            .and_then(|raw| service.assess(&raw));

        let record = match outcome {
            Ok(prediction) => serde_json::to_string(&encoder.encode(prediction, mode, None))?,
            Err(e) => {
                debug!(line = line_num + 1, error = %e, "request rejected");
                serde_json::to_string(&encoder.encode_rejection(&e))?
            }
        };

        writeln!(stdout, "{}", record)?;
        if flush {
            stdout.flush()?;
        }
    }

    stdout.flush()?;
    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    json: bool,
) -> Result<(), HeartCliError> {
    let input_data = read_input(input)?;

    let inputs = match input_format {
        InputFormat::Ndjson => InputAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => InputAdapter::parse_array(&input_data)?,
    };

    if inputs.is_empty() {
        return Err(HeartCliError::NoInput);
    }

    let results = InputAdapter::validate_records(&inputs);

    let report = ValidationReport {
        total_records: inputs.len(),
        valid_records: inputs.len() - results.len(),
        invalid_records: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Record {}: {}", err.index, err.error);
            }
        }
    }

    if report.invalid_records > 0 {
        Err(HeartCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn artifact_check<T>(
    checks: &mut Vec<DoctorCheck>,
    name: &str,
    path: &Path,
    loaded: Result<T, AssessError>,
    describe: impl Fn(&T) -> String,
) -> Option<T> {
    match loaded {
        Ok(value) => {
            checks.push(DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Ok,
                message: format!("{} ({})", describe(&value), path.display()),
            });
            Some(value)
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            });
            None
        }
    }
}

fn cmd_doctor(
    config: &Config,
    config_file: Option<&Path>,
    json: bool,
) -> Result<(), HeartCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} {}", PRODUCER_NAME, VERSION),
    });

    // Config::load already failed for a missing explicit file
    let config_check = match config_file {
        Some(path) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: format!("loaded {}", path.display()),
        },
        None if Path::new(CONFIG_FILE).exists() => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: format!("loaded ./{}", CONFIG_FILE),
        },
        None => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: format!(
                "no ./{} found; using built-in defaults and {}* environment variables",
                CONFIG_FILE, ENV_PREFIX
            ),
        },
    };
    checks.push(config_check);

    checks.push(DoctorCheck {
        name: "policy".to_string(),
        status: CheckStatus::Ok,
        message: format!(
            "unknown_category={:?}, validate_ranges={}, mode={}",
            config.unknown_category,
            config.validate_ranges,
            config.mode.as_str()
        ),
    });

    let paths = &config.artifacts;
    let schema = artifact_check(
        &mut checks,
        "feature_columns",
        &paths.feature_columns,
        FeatureSchema::load(&paths.feature_columns),
        |s| format!("{} columns", s.len()),
    );
    let scaler = artifact_check(
        &mut checks,
        "scaler",
        &paths.scaler,
        ScalerArtifact::load(&paths.scaler),
        |s| match s {
            ScalerArtifact::Standard(_) => "standard scaler".to_string(),
            ScalerArtifact::MinMax(_) => "min-max scaler".to_string(),
        },
    );
    let model = artifact_check(
        &mut checks,
        "model",
        &paths.model,
        ModelArtifact::load(&paths.model),
        ModelArtifact::describe,
    );

    if let (Some(schema), Some(scaler), Some(model)) = (schema, scaler, model) {
        let check = match Artifacts::from_parts(schema, scaler, model) {
            Ok(_) => DoctorCheck {
                name: "compatibility".to_string(),
                status: CheckStatus::Ok,
                message: "schema, scaler and model agree on width and order".to_string(),
            },
            Err(e) => DoctorCheck {
                name: "compatibility".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        };
        checks.push(check);
    }

    // Check stdin is available (for streaming mode)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("heartrisk Doctor Report");
        println!("=======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(HeartCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(
    config: &Config,
    schema_type: SchemaType,
    json_schema: bool,
) -> Result<(), HeartCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", INPUT_SCHEMA_VERSION);
                println!();
                println!("One JSON object per request. Short training-time names are accepted.");
                println!();
                println!("  age                       integer 20-100");
                println!("  sex                       0 = female, 1 = male");
                println!("  resting_blood_pressure    integer 80-200 (trestbps)");
                println!("  cholesterol               integer 100-600 (chol)");
                println!("  fasting_blood_sugar_high  0 or 1 (fbs)");
                println!("  max_heart_rate            integer 70-220 (thalach)");
                println!("  exercise_angina           0 or 1 (exang)");
                println!("  st_depression             number 0.0-10.0 (oldpeak)");
                println!("  major_vessels             integer 0-3 (ca)");
                println!("  chest_pain_type           0-3 (cp)");
                println!("  resting_ecg               0-2 (restecg)");
                println!("  st_slope                  0-2 (slope)");
                println!("  thalassemia               0-2 (thal)");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output: assessment report");
                println!();
                println!("- report_version: Report schema version");
                println!("- producer: {{ name, version, instance_id }}");
                println!("- assessment_id, computed_at_utc");
                println!("- mode: standard | professional | patient | family");
                println!("- prediction: {{ label, probability }}");
                println!("- probability_percent: two-decimal percentage");
                println!("- message: rendered text for the audience");
                println!("- features: optional ordered [{{ column, value }}]");
                println!();
                println!("Rejections: {{ report_version, code, fault, message, detail }}");
            }
        }
        SchemaType::Features => {
            let schema = FeatureSchema::load(&config.artifacts.feature_columns)?;
            if json_schema {
                println!("{}", serde_json::to_string_pretty(schema.columns())?);
            } else {
                println!("Feature columns ({}):", schema.len());
                for (pos, column) in schema.columns().iter().enumerate() {
                    println!("  {:>2}  {}", pos, column);
                }
            }
        }
    }

    Ok(())
}

fn cmd_form(mode: AudienceMode, json: bool) -> Result<(), HeartCliError> {
    let fields: Vec<FormFieldView> = FormField::ALL
        .iter()
        .map(|f| FormFieldView {
            key: f.key(),
            label: f.label(mode),
            options: f.options(mode).map(|opts| {
                opts.into_iter()
                    .map(|(code, label)| FormOption { code, label })
                    .collect()
            }),
        })
        .collect();

    if json {
        let view = FormView {
            mode,
            title: mode.title(),
            intro: mode.intro(),
            fields,
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("{}", mode.title());
    println!("{}", mode.intro());
    println!();
    for field in &fields {
        println!("{} [{}]", field.label, field.key);
        if let Some(options) = &field.options {
            for option in options {
                println!("    {} = {}", option.code, option.label);
            }
        }
    }

    Ok(())
}

// Helper functions

fn get_input_json_schema() -> String {
    let int = |min: i64, max: i64| {
        serde_json::json!({ "type": "integer", "minimum": min, "maximum": max })
    };
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": INPUT_SCHEMA_VERSION,
        "description": "Clinical attributes for one heart disease risk assessment",
        "type": "object",
        "properties": {
            "age": int(20, 100),
            "sex": int(0, 1),
            "resting_blood_pressure": int(80, 200),
            "cholesterol": int(100, 600),
            "fasting_blood_sugar_high": int(0, 1),
            "max_heart_rate": int(70, 220),
            "exercise_angina": int(0, 1),
            "st_depression": { "type": "number", "minimum": 0.0, "maximum": 10.0 },
            "major_vessels": int(0, 3),
            "chest_pain_type": { "type": "integer", "enum": [0, 1, 2, 3] },
            "resting_ecg": { "type": "integer", "enum": [0, 1, 2] },
            "st_slope": { "type": "integer", "enum": [0, 1, 2] },
            "thalassemia": { "type": "integer", "enum": [0, 1, 2] }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "heart.assessment_report",
        "type": "object",
        "required": ["report_version", "producer", "assessment_id", "computed_at_utc",
                     "mode", "prediction", "probability_percent", "message"],
        "properties": {
            "report_version": { "type": "string" },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" }
                }
            },
            "assessment_id": { "type": "string", "format": "uuid" },
            "computed_at_utc": { "type": "string", "format": "date-time" },
            "mode": { "type": "string", "enum": ["standard", "professional", "patient", "family"] },
            "prediction": {
                "type": "object",
                "properties": {
                    "label": { "type": "boolean" },
                    "probability": { "type": "number", "minimum": 0.0, "maximum": 1.0 }
                }
            },
            "probability_percent": { "type": "string" },
            "message": { "type": "string" },
            "features": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "column": { "type": "string" },
                        "value": { "type": "number" }
                    }
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum HeartCliError {
    Io(io::Error),
    Assess(AssessError),
    Json(serde_json::Error),
    NoInput,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for HeartCliError {
    fn from(e: io::Error) -> Self {
        HeartCliError::Io(e)
    }
}

impl From<AssessError> for HeartCliError {
    fn from(e: AssessError) -> Self {
        HeartCliError::Assess(e)
    }
}

impl From<serde_json::Error> for HeartCliError {
    fn from(e: serde_json::Error) -> Self {
        HeartCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<HeartCliError> for CliError {
    fn from(e: HeartCliError) -> Self {
        match e {
            HeartCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            HeartCliError::Assess(e) => CliError {
                code: e.code().to_string(),
                message: e.to_string(),
                hint: Some(heart_risk::messages::rejection(&e)),
            },
            HeartCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            HeartCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "No requests found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            HeartCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            HeartCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

#[derive(serde::Serialize)]
struct FormView {
    mode: AudienceMode,
    title: &'static str,
    intro: &'static str,
    fields: Vec<FormFieldView>,
}

#[derive(serde::Serialize)]
struct FormFieldView {
    key: &'static str,
    label: &'static str,
    options: Option<Vec<FormOption>>,
}

#[derive(serde::Serialize)]
struct FormOption {
    code: u8,
    label: &'static str,
}
