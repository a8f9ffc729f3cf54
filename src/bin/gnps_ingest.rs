use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use gnps_ingest::app::App;
use gnps_ingest::cancel::CancelToken;
use gnps_ingest::domain::TaskId;
use gnps_ingest::error::GnpsError;
use gnps_ingest::gnps::{BASE_URL, GnpsHttpClient};
use gnps_ingest::output::{IngestSummary, JsonOutput};
use gnps_ingest::staging::{FTP_HOST, FtpSpectraStore};
use gnps_ingest::table::AbundanceTable;

#[derive(Parser)]
#[command(name = "gnps-ingest")]
#[command(about = "Submit feature files to GNPS molecular networking and assemble the results into an abundance table")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Stage spectra, run a networking job and ingest its bucket table")]
    Cluster(ClusterArgs),
    #[command(about = "Ingest the bucket table of an already-submitted task")]
    FromTask(FromTaskArgs),
    #[command(about = "Ingest a bucket table file from local disk")]
    FromBuckettable(FromBuckettableArgs),
    #[command(about = "Ingest an MZmine2 quantification report (no remote job)")]
    Mzmine(MzmineArgs),
}

#[derive(Args)]
struct ClusterArgs {
    #[arg(long)]
    manifest: PathBuf,

    #[arg(long)]
    credentials: PathBuf,

    #[command(flatten)]
    common: CommonArgs,

    #[arg(long, default_value = FTP_HOST)]
    ftp_host: String,
}

#[derive(Args)]
struct FromTaskArgs {
    task: String,

    #[arg(long)]
    manifest: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct FromBuckettableArgs {
    buckettable: PathBuf,

    #[arg(long)]
    manifest: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct MzmineArgs {
    report: PathBuf,

    #[arg(long)]
    manifest: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct CommonArgs {
    /// Where to write the assembled table as TSV. Defaults to stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long, default_value = BASE_URL)]
    base_url: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(gnps) = report.downcast_ref::<GnpsError>() {
            return ExitCode::from(map_exit_code(gnps));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &GnpsError) -> u8 {
    match error {
        GnpsError::InputNotFound(_)
        | GnpsError::ManifestRead(_)
        | GnpsError::CredentialsRead(_) => 2,
        GnpsError::Http(_)
        | GnpsError::HttpStatus { .. }
        | GnpsError::Ftp(_)
        | GnpsError::TaskNotCreated
        | GnpsError::SubmissionRejected(_)
        | GnpsError::JobFailed { .. } => 3,
        GnpsError::Cancelled { .. } => 130,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Cluster(args) => {
            let client = GnpsHttpClient::with_base_url(&args.common.base_url).into_diagnostic()?;
            let store = FtpSpectraStore::with_host(&args.ftp_host);
            let app = App::new(client, store);
            let cancel = CancelToken::new();
            let table = app
                .import_clustering(&args.manifest, &args.credentials, &cancel)
                .into_diagnostic()?;
            finish("cluster", &table, &args.common)
        }
        Commands::FromTask(args) => {
            let task = args.task.parse::<TaskId>().into_diagnostic()?;
            let client = GnpsHttpClient::with_base_url(&args.common.base_url).into_diagnostic()?;
            let app = App::new(client, FtpSpectraStore::new());
            let cancel = CancelToken::new();
            let table = app
                .import_from_task(&args.manifest, &task, &cancel)
                .into_diagnostic()?;
            finish("from-task", &table, &args.common)
        }
        Commands::FromBuckettable(args) => {
            let client = GnpsHttpClient::with_base_url(&args.common.base_url).into_diagnostic()?;
            let app = App::new(client, FtpSpectraStore::new());
            let table = app
                .import_from_buckettable(&args.manifest, &args.buckettable)
                .into_diagnostic()?;
            finish("from-buckettable", &table, &args.common)
        }
        Commands::Mzmine(args) => {
            let client = GnpsHttpClient::with_base_url(&args.common.base_url).into_diagnostic()?;
            let app = App::new(client, FtpSpectraStore::new());
            let table = app
                .import_mzmine(&args.manifest, &args.report)
                .into_diagnostic()?;
            finish("mzmine", &table, &args.common)
        }
    }
}

fn finish(operation: &str, table: &AbundanceTable, common: &CommonArgs) -> miette::Result<()> {
    match &common.output {
        Some(path) => {
            let file = File::create(path).into_diagnostic()?;
            table.write_tsv(file).into_diagnostic()?;
            let summary = IngestSummary::new(
                operation,
                table,
                Some(path.to_string_lossy().into_owned()),
            );
            JsonOutput::print_summary(&summary).into_diagnostic()?;
        }
        None => {
            table.write_tsv(std::io::stdout().lock()).into_diagnostic()?;
        }
    }
    Ok(())
}
