use crate::model::{LocatorConfig, SessionConfig, DEFAULT_DISTANCE_KM};
use crate::orchestrator::{LogObserver, RouteSessionController};
use crate::position::{Locator, PositionProvider};
use crate::service::HttpRouteService;
use crate::text_summary::RouteSummary;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

pub const DEFAULT_LOCATE_URL: &str = "https://speed.cloudflare.com/meta";

#[derive(Debug, Parser, Clone)]
#[command(
    name = "routefindr",
    version,
    about = "Generate circular running routes around you, view them on a terminal map and export GPX"
)]
pub struct Cli {
    /// Base URL of the route service
    #[arg(long, env = "ROUTEFINDR_BASE_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Target route distance in kilometres
    #[arg(long, default_value_t = DEFAULT_DISTANCE_KM)]
    pub distance: f64,

    /// Start latitude; skips geolocation when given with --lon
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Start longitude; skips geolocation when given with --lat
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Geolocation endpoint answering with latitude/longitude JSON
    #[arg(long, default_value = DEFAULT_LOCATE_URL)]
    pub locate_url: String,

    /// Never look up the position; route generation stays disabled without --lat/--lon
    #[arg(long, conflicts_with = "locate_url")]
    pub no_locate: bool,

    /// Per-request timeout for the route service and geolocation
    #[arg(long, default_value = "30s")]
    pub request_timeout: humantime::Duration,

    /// Print a text route summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Print the route as JSON and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Download the route as GPX to this path and exit (no TUI)
    #[arg(long)]
    pub export_gpx: Option<PathBuf>,

    /// Reset the service's route cache and exit (no TUI)
    #[arg(long)]
    pub reset_cache: bool,

    /// Directory for routefindr.log (defaults to the user cache directory)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    /// True when any flag asks for a one-shot run instead of the TUI.
    pub fn is_headless(&self) -> bool {
        self.text || self.json || self.reset_cache || self.export_gpx.is_some()
    }
}

/// Build a `SessionConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> SessionConfig {
    let locator = match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => LocatorConfig::Fixed { lat, lon },
        _ if args.no_locate => LocatorConfig::Disabled,
        _ => LocatorConfig::IpLookup {
            url: args.locate_url.clone(),
        },
    };
    SessionConfig {
        base_url: args.base_url.clone(),
        distance_km: args.distance,
        request_timeout: Duration::from(args.request_timeout),
        user_agent: format!("routefindr/{}", env!("CARGO_PKG_VERSION")),
        locator,
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);

    if !args.is_headless() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(cfg).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            let mut args = args;
            args.text = true;
            return run_headless(&args, &cfg).await;
        }
    }

    run_headless(&args, &cfg).await
}

/// One-shot run: optional cache reset, then locate, generate and print or export.
async fn run_headless(args: &Cli, cfg: &SessionConfig) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();
    let outcome = headless_steps(args, cfg, &out_tx).await;
    drop(out_tx);
    let _ = out_handle.await;
    outcome
}

async fn headless_steps(
    args: &Cli,
    cfg: &SessionConfig,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let service = HttpRouteService::new(cfg)?;
    let controller = RouteSessionController::new(service, LogObserver, cfg.distance_km);

    if args.reset_cache {
        let message = controller
            .reset_cache()
            .await
            .context("failed to reset route cache")?;
        let _ = out_tx.send(OutputLine::Stderr(format!("Cache reset: {message}")));
    }

    let wants_route = args.text || args.json;
    if !wants_route && args.export_gpx.is_none() {
        return Ok(());
    }

    let provider = PositionProvider::new(Locator::from_config(cfg)?);
    let position = controller
        .acquire_position(provider)
        .await
        .context("unable to retrieve your location")?;
    let _ = out_tx.send(OutputLine::Stderr(format!("Position: {position}")));

    if wants_route {
        controller
            .generate_route(cfg.distance_km)
            .await
            .context("route generation failed")?;
        let summary = RouteSummary::from_state(&controller.snapshot());
        if args.json {
            let out = serde_json::to_string_pretty(&summary)?;
            let _ = out_tx.send(OutputLine::Stdout(out));
        } else {
            for line in summary.lines() {
                let _ = out_tx.send(OutputLine::Stdout(line));
            }
        }
    }

    if let Some(path) = args.export_gpx.as_deref() {
        let bytes = controller
            .export_gpx(cfg.distance_km)
            .await
            .context("failed to download GPX")?;
        std::fs::write(path, &bytes).with_context(|| format!("write {}", path.display()))?;
        let _ = out_tx.send(OutputLine::Stderr(format!("Saved: {}", path.display())));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["routefindr"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_start_the_tui_with_ip_lookup() {
        let cli = parse(&[]);
        assert!(!cli.is_headless());
        let cfg = build_config(&cli);
        assert_eq!(cfg.distance_km, 5.0);
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert_eq!(
            cfg.locator,
            LocatorConfig::IpLookup {
                url: DEFAULT_LOCATE_URL.into()
            }
        );
        assert!(cfg.user_agent.starts_with("routefindr/"));
    }

    #[test]
    fn fixed_position_wins_over_lookup() {
        let cli = parse(&["--lat", "51.5", "--lon", "-0.09", "--text"]);
        assert!(cli.is_headless());
        assert_eq!(
            build_config(&cli).locator,
            LocatorConfig::Fixed {
                lat: 51.5,
                lon: -0.09
            }
        );
    }

    #[test]
    fn no_locate_disables_lookup() {
        let cli = parse(&["--no-locate"]);
        assert_eq!(build_config(&cli).locator, LocatorConfig::Disabled);
    }

    #[test]
    fn lat_requires_lon() {
        assert!(Cli::try_parse_from(["routefindr", "--lat", "51.5"]).is_err());
    }

    #[test]
    fn text_and_json_conflict() {
        assert!(Cli::try_parse_from(["routefindr", "--text", "--json"]).is_err());
    }

    #[test]
    fn timeout_and_export_parse() {
        let cli = parse(&["--request-timeout", "2s", "--export-gpx", "out.gpx", "--distance", "12.5"]);
        let cfg = build_config(&cli);
        assert_eq!(cfg.request_timeout, Duration::from_secs(2));
        assert_eq!(cfg.distance_km, 12.5);
        assert_eq!(cli.export_gpx, Some(PathBuf::from("out.gpx")));
        assert!(cli.is_headless());
    }
}
