use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cloudscan::api::{ApiError, DiscoveryApi, InventoryApi};
use cloudscan::config::Config;
use cloudscan::discovery::{JobCoordinator, TaskContext, WorkerPool};
use cloudscan::gcp::auth::{self, GcpCredentials};
use cloudscan::gcp::client::GcpClient;
use cloudscan::gcp::http::format_gcp_error;
use cloudscan::model::{JobId, Resource, ResourceKind};
use cloudscan::query::QueryFacade;
use cloudscan::store::{JournalJobStatusStore, JournalResourceStore, StoreError};
use cloudscan::watch::{DetailLevel, JobWatch};
use cloudscan::VERSION;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Discover cloud resources asynchronously and query the inventory
#[derive(Parser, Debug)]
#[command(name = "cloudscan", version = VERSION, about, long_about = None)]
struct Args {
    /// GCP project to use
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// Directory holding the inventory journals
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Maximum number of discovery tasks running at once
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Access token to use instead of Application Default Credentials
    #[arg(long, global = true)]
    access_token: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    output: OutputFormat,

    /// Shorter progress lines while watching jobs
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover services (EC2 = compute instances, S3 = buckets)
    Discover {
        #[arg(required = true)]
        services: Vec<String>,
    },
    /// Discover the objects of one bucket
    Bucket { name: String },
    /// Show or change the saved configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    #[command(flatten)]
    Query(QueryCommand),
}

/// Commands that only read the inventory
#[derive(Subcommand, Debug)]
enum QueryCommand {
    /// Show the status of a job
    Status { job_id: String },
    /// List discovered details for a service
    Results { service: String },
    /// List discovered objects of a bucket
    Objects { bucket: String },
    /// Count discovered objects of a bucket
    Count { bucket: String },
    /// List discovered objects of a bucket whose name contains PATTERN
    Like { bucket: String, pattern: String },
    /// Show every record a job produced
    Job { job_id: String },
    /// Find records by kind (compute-instance, bucket, bucket-object) and exact details
    Find { kind: String, details: String },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    SetProject { project_id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Logging disabled: cannot open {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("cloudscan {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("cloudscan").join("cloudscan.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".cloudscan").join("cloudscan.log");
    }
    PathBuf::from("cloudscan.log")
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Err(err) = run(args, Config::load()).await {
        eprintln!("Error: {}", describe_error(&err));
        std::process::exit(1);
    }
}

/// Typed faults print as-is; anything else may carry provider details
fn describe_error(err: &anyhow::Error) -> String {
    if err.downcast_ref::<ApiError>().is_some() || err.downcast_ref::<StoreError>().is_some() {
        format!("{:#}", err)
    } else {
        tracing::error!("{:#}", err);
        format_gcp_error(err)
    }
}

struct Stores {
    resources: Arc<JournalResourceStore>,
    statuses: Arc<JournalJobStatusStore>,
}

impl Stores {
    fn open(dir: &std::path::Path) -> Result<Self> {
        tracing::debug!("Opening inventory at {:?}", dir);
        Ok(Self {
            resources: Arc::new(JournalResourceStore::open_in(dir)?),
            statuses: Arc::new(JournalJobStatusStore::open_in(dir)?),
        })
    }

    fn queries(&self) -> QueryFacade {
        QueryFacade::new(self.resources.clone(), self.statuses.clone())
    }
}

async fn run(args: Args, mut config: Config) -> Result<()> {
    let format = args.output;
    let store_dir = config.effective_store_dir(args.store_dir.clone());

    match &args.command {
        Command::Config { action } => match action {
            ConfigAction::Show => print_value(format, &config, || {
                serde_json::to_string_pretty(&config).unwrap_or_default()
            }),
            ConfigAction::SetProject { project_id } => {
                if !auth::validate_project_id(project_id) {
                    anyhow::bail!("Invalid project ID: {}", project_id);
                }
                config.set_project(project_id)?;
                println!("Project set to {}", project_id);
                Ok(())
            }
        },
        Command::Query(query) => {
            let stores = Stores::open(&store_dir)?;
            run_query(query, InventoryApi::new(stores.queries()), format)
        }
        Command::Discover { services } => {
            let stores = Stores::open(&store_dir)?;
            let api = discovery_api(&args, &config, &stores).await?;
            let job_id = api.submit_discovery(services.as_slice());
            report_job(&args, &config, &api, &stores, job_id, services.join(",")).await
        }
        Command::Bucket { name } => {
            let stores = Stores::open(&store_dir)?;
            let api = discovery_api(&args, &config, &stores).await?;
            let job_id = api.submit_bucket_objects(name);
            report_job(&args, &config, &api, &stores, job_id, format!("bucket {}", name)).await
        }
    }
}

async fn discovery_api(args: &Args, config: &Config, stores: &Stores) -> Result<DiscoveryApi> {
    let project = config.effective_project(args.project.as_deref()).context(
        "No GCP project configured. Set GOOGLE_CLOUD_PROJECT or use --project flag",
    )?;
    tracing::info!("Using project: {}", project);

    let credentials = GcpCredentials::resolve(args.access_token.as_deref()).await?;
    let client = Arc::new(GcpClient::with_endpoints(
        credentials,
        &project,
        config.endpoints()?,
    )?);

    let ctx = TaskContext::new(
        client.clone(),
        client,
        stores.resources.clone(),
        stores.statuses.clone(),
    );
    let pool = WorkerPool::new(config.effective_max_workers(args.workers));
    tracing::info!("Worker pool: up to {} concurrent tasks", pool.max_workers());

    Ok(DiscoveryApi::new(JobCoordinator::new(ctx, pool)))
}

/// Print the job id, then report status changes until the pool drains.
///
/// Submission itself does not wait; the process does, so running tasks are
/// not cut short by exit.
async fn report_job(
    args: &Args,
    config: &Config,
    api: &DiscoveryApi,
    stores: &Stores,
    job_id: String,
    label: String,
) -> Result<()> {
    print_value(args.output, &JobSubmitted { job_id: &job_id }, || job_id.clone())?;

    let mut watch = JobWatch::new(config.poll_interval());
    if args.quiet {
        watch.detail_level = DetailLevel::Minimal;
    }
    watch.track(job_id.parse::<JobId>()?, label);
    watch
        .run(api.coordinator().pool(), &stores.queries(), |line| eprintln!("{}", line))
        .await;

    Ok(())
}

#[derive(Serialize)]
struct JobSubmitted<'a> {
    job_id: &'a str,
}

#[derive(Serialize)]
struct JobState<'a> {
    job_id: &'a str,
    status: &'a str,
}

#[derive(Serialize)]
struct BucketCount<'a> {
    bucket: &'a str,
    count: usize,
}

fn run_query(command: &QueryCommand, api: InventoryApi, format: OutputFormat) -> Result<()> {
    match command {
        QueryCommand::Status { job_id } => {
            let status = api.job_status(job_id);
            print_value(
                format,
                &JobState {
                    job_id,
                    status: &status,
                },
                || status.clone(),
            )
        }
        QueryCommand::Results { service } => {
            let details = api.discovery_result(service)?;
            print_value(format, &details, || details.join("\n"))
        }
        QueryCommand::Objects { bucket } => {
            let details = api.bucket_objects(bucket);
            print_value(format, &details, || details.join("\n"))
        }
        QueryCommand::Count { bucket } => {
            let count = api.bucket_object_count(bucket);
            print_value(format, &BucketCount { bucket, count }, || count.to_string())
        }
        QueryCommand::Like { bucket, pattern } => {
            let details = api.bucket_objects_like(bucket, pattern);
            print_value(format, &details, || details.join("\n"))
        }
        QueryCommand::Job { job_id } => {
            let job_id: JobId = job_id
                .parse()
                .with_context(|| format!("Invalid job id: {}", job_id))?;
            let records = api.queries().job_resources(job_id);
            print_value(format, &records, || resource_table(&records))
        }
        QueryCommand::Find { kind, details } => {
            let kind: ResourceKind = kind.parse().map_err(anyhow::Error::msg)?;
            let records = api.queries().lookup(kind, details);
            print_value(format, &records, || resource_table(&records))
        }
    }
}

fn resource_table(records: &[Resource]) -> String {
    records
        .iter()
        .map(|r| {
            format!(
                "{}\t{}\t{}\t{}",
                r.kind,
                r.details,
                r.bucket_name.as_deref().unwrap_or("-"),
                r.discovered_at.format("%Y-%m-%d %H:%M:%S")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn print_value<T: Serialize>(
    format: OutputFormat,
    value: &T,
    text: impl FnOnce() -> String,
) -> Result<()> {
    let rendered = match format {
        OutputFormat::Text => text(),
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    if !rendered.is_empty() {
        println!("{}", rendered.trim_end());
    }
    Ok(())
}
