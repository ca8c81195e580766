use camino::Utf8PathBuf;
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use heliofetch::cluster;
use heliofetch::config::Config;
use heliofetch::decode::NullReader;
use heliofetch::error::HelioError;
use heliofetch::fetch::HttpRemoteClient;
use heliofetch::interval::TimeInterval;
use heliofetch::messenger;
use heliofetch::mission::{CsaMission, DataRequest, Mission, SpdfMission};
use heliofetch::session::Session;

#[derive(Parser)]
#[command(name = "heliofetch")]
#[command(about = "Fetch and cache spacecraft time-series archives")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download missing day artifacts for an interval")]
    Fetch(FetchArgs),
}

#[derive(Args)]
struct FetchArgs {
    #[arg(long)]
    mission: String,

    #[arg(long)]
    instrument: String,

    #[arg(long)]
    probe: Option<String>,

    /// Interval start, `YYYY-MM-DDThh:mm:ss`.
    #[arg(long)]
    start: String,

    /// Interval end, `YYYY-MM-DDThh:mm:ss` (exclusive).
    #[arg(long)]
    end: String,

    #[arg(long)]
    config: Option<String>,
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Fetch(args) => run_fetch(args),
    }
}

fn run_fetch(args: FetchArgs) -> miette::Result<()> {
    let config_path = args.config.as_deref().map(Utf8PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    let interval = TimeInterval::new(
        parse_time(&args.start)?,
        parse_time(&args.end)?,
    )?;
    let (mission, request) =
        resolve_instrument(&args.mission, &args.instrument, args.probe.as_deref())?;

    let session = Session::new(config, HttpRemoteClient::new()?, NullReader);
    let reports = session.prefetch(mission.as_ref(), &request, interval)?;

    let json = serde_json::to_string_pretty(&reports).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

fn parse_time(value: &str) -> Result<NaiveDateTime, HelioError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .map_err(|_| HelioError::InvalidTimestamp(value.to_string()))
}

fn resolve_instrument(
    mission: &str,
    instrument: &str,
    probe: Option<&str>,
) -> Result<(Box<dyn Mission>, DataRequest), HelioError> {
    match (mission, instrument) {
        ("cluster", _) => {
            let probe = probe
                .ok_or_else(|| HelioError::MissingProbe(mission.to_string()))?
                .parse::<cluster::Probe>()?;
            let request = match instrument {
                "fgm" => cluster::fgm_request(&probe)?,
                "peace" => cluster::peace_moments_request(&probe)?,
                "cis" => cluster::cis_hia_onboard_moms_request(&probe)?,
                _ => {
                    return Err(HelioError::UnknownInstrument {
                        mission: mission.to_string(),
                        instrument: instrument.to_string(),
                    });
                }
            };
            Ok((Box::new(CsaMission::cluster()), request))
        }
        ("messenger", "mag_rtn") => Ok((
            Box::new(SpdfMission::messenger()),
            messenger::mag_rtn_request()?,
        )),
        _ => Err(HelioError::UnknownInstrument {
            mission: mission.to_string(),
            instrument: instrument.to_string(),
        }),
    }
}
