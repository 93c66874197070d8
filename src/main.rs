use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use serde::Serialize;

use claims_lakehouse::transform::DiagnosisDictionary;
use claims_lakehouse::{LookupService, Pipeline, PipelineConfig, TotalPaidPolicy, ValidationReport};

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

#[derive(Parser)]
#[command(name = "claims-lakehouse")]
#[command(about = "Build bronze, silver and gold claim datasets and serve patient summaries")]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every stage and write the validation report
    Run {
        #[command(flatten)]
        pipeline: PipelineArgs,
        /// Exit with a failure code when the report holds any warning
        #[arg(long)]
        strict: bool,
    },
    /// Normalize raw extracts into the bronze layer
    Bronze {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Build the dimensional model from the bronze layer
    Silver {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Build the analytical views from the silver layer
    Gold {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Sample every layer and write the validation report
    Validate {
        #[command(flatten)]
        pipeline: PipelineArgs,
        #[arg(long)]
        strict: bool,
    },
    /// Print the summary of one patient in one year
    Lookup {
        #[command(flatten)]
        service: ServiceArgs,
        /// Patient identifier
        bene_id: String,
        year: i32,
    },
    /// Report which gold tables exist for each supported year
    Health {
        #[command(flatten)]
        service: ServiceArgs,
    },
}

#[derive(Args)]
struct PipelineArgs {
    /// Directory of raw CSV or Parquet extracts
    #[arg(long, default_value = "data/raw")]
    raw: PathBuf,
    /// Root directory of the bronze, silver and gold layers
    #[arg(long, default_value = "data/lakehouse")]
    output: PathBuf,
    /// Rank cutoff for top diagnoses
    #[arg(long, default_value_t = 5)]
    top_k: u32,
    #[arg(long, value_enum, default_value_t = PolicyArg::ProgramPlusPatient)]
    total_paid: PolicyArg,
    /// Worker threads (defaults to the number of CPUs)
    #[arg(long)]
    workers: Option<usize>,
    #[arg(long)]
    no_progress: bool,
    /// JSON file replacing built-in reconciliation descriptors
    #[arg(long)]
    descriptors: Option<PathBuf>,
    /// JSON object of diagnosis families and descriptions
    #[arg(long)]
    diagnoses: Option<PathBuf>,
}

#[derive(Args)]
struct ServiceArgs {
    /// Gold layer directory
    #[arg(long, default_value = "data/lakehouse/gold")]
    gold: PathBuf,
    #[arg(long, default_value_t = 2008)]
    first_year: i32,
    #[arg(long, default_value_t = 2010)]
    last_year: i32,
    #[arg(long, default_value_t = 5)]
    top_k: u32,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    ProgramOnly,
    ProgramPlusPatient,
}

impl From<PolicyArg> for TotalPaidPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::ProgramOnly => Self::ProgramOnly,
            PolicyArg::ProgramPlusPatient => Self::ProgramPlusPatient,
        }
    }
}

impl PipelineArgs {
    fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default()
            .with_top_k(self.top_k)
            .with_total_paid_policy(self.total_paid.into())
            .with_progress(!self.no_progress);
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(path) = &self.descriptors {
            config = config.with_descriptor_overrides(path);
        }
        config
    }

    fn pipeline(&self) -> Result<Pipeline> {
        let pipeline = Pipeline::new(self.config(), &self.raw, &self.output)
            .context("Invalid pipeline configuration")?;
        match &self.diagnoses {
            Some(path) => {
                let dictionary = DiagnosisDictionary::from_json(path).with_context(|| {
                    format!("Failed to load diagnosis dictionary {}", path.display())
                })?;
                Ok(pipeline.with_dictionary(dictionary))
            }
            None => Ok(pipeline),
        }
    }
}

impl ServiceArgs {
    fn service(&self) -> LookupService {
        let config = PipelineConfig::default()
            .with_years(self.first_year, self.last_year)
            .with_top_k(self.top_k);
        LookupService::from_config(&self.gold, &config)
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(report: &ValidationReport, strict: bool) -> ExitCode {
    if strict && report.has_warnings() {
        log::error!(
            "Strict mode: {} warnings recorded in the validation report",
            report.warnings.len()
        );
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Run { pipeline, strict } => {
            let pipeline = pipeline.pipeline()?;
            info!("Running pipeline on {}", pipeline.paths().raw.display());
            let (summary, report) = pipeline.run().context("Pipeline run failed")?;
            print_json(&summary)?;
            Ok(exit_code(&report, strict))
        }
        Commands::Bronze { pipeline } => {
            let outcome = pipeline.pipeline()?.bronze().context("Bronze stage failed")?;
            print_json(&outcome)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Silver { pipeline } => {
            let outcome = pipeline.pipeline()?.silver().context("Silver stage failed")?;
            print_json(&outcome)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Gold { pipeline } => {
            let outcome = pipeline.pipeline()?.gold().context("Gold stage failed")?;
            print_json(&outcome)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { pipeline, strict } => {
            let pipeline = pipeline.pipeline()?;
            let report = pipeline.validate().context("Validation failed")?;
            report
                .save(&pipeline.report_path())
                .context("Failed to save validation report")?;
            print_json(&report)?;
            Ok(exit_code(&report, strict))
        }
        Commands::Lookup {
            service,
            bene_id,
            year,
        } => {
            let view = service
                .service()
                .patient(&bene_id, year)
                .await
                .with_context(|| format!("Lookup of {bene_id} in {year} failed"))?;
            match view {
                Some(view) => {
                    print_json(&view)?;
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    print_json(&serde_json::json!({
                        "error": "not_found",
                        "bene_id": bene_id,
                        "year": year,
                    }))?;
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Health { service } => {
            let report = service.service().health().await.context("Health check failed")?;
            print_json(&report)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
