use std::path::PathBuf;

use chromiumoxide::Browser;
use clap::Parser;
use tracing::{error, info, warn};

use nightjar::core::config::HarvestTuning;
use nightjar::core::error::ScrapeError;
use nightjar::core::types::{HarvestSummary, SessionState};
use nightjar::scraping::collect::Collector;
use nightjar::scraping::surface::CdpSurface;
use nightjar::scraping::{browser, harvest, navigate};
use nightjar::session::auth::{self, Credentials};
use nightjar::session::{store, validate};

/// Harvest public search-result posts from x.com into a JSON file.
#[derive(Parser, Debug)]
#[command(name = "nightjar", version, about)]
struct Cli {
    /// X.com username or email
    #[arg(short = 'u', long)]
    username: Option<String>,

    /// X.com password
    #[arg(short = 'p', long)]
    password: Option<String>,

    /// Search keyword
    #[arg(short = 'k', long)]
    keyword: String,

    /// Output JSON file (default: {sanitized_keyword}_tweets.json)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Maximum scroll cycles
    #[arg(short = 's', long, default_value_t = 15)]
    max_scrolls: u32,

    /// Run the browser headless
    #[arg(long)]
    headless: bool,

    /// Reuse the stored session instead of logging in
    #[arg(long)]
    skip_login: bool,

    /// Session cookie file (default: ~/.nightjar/session.json)
    #[arg(long)]
    session_file: Option<PathBuf>,
}

/// Where the authenticated session comes from on this run.
enum SessionSource {
    Stored(SessionState),
    Fresh(Credentials),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let mut tuning = HarvestTuning::resolve();
    tuning.max_scrolls = cli.max_scrolls;

    let session_path = cli
        .session_file
        .clone()
        .unwrap_or_else(store::default_session_path);

    // Resolve the session source up front: a skip-login run with a missing or
    // corrupt session file must fail fast, before a browser ever launches.
    let source = if cli.skip_login {
        SessionSource::Stored(store::load(&session_path)?)
    } else {
        match (cli.username.clone(), cli.password.clone()) {
            (Some(username), Some(password)) => {
                SessionSource::Fresh(Credentials { username, password })
            }
            _ => anyhow::bail!("username and password are required unless --skip-login is set"),
        }
    };

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| Collector::default_output_path(&cli.keyword));
    let mut collector = Collector::new(&output_path);

    let (mut chrome, handler) = browser::launch(cli.headless).await?;

    // The scrape runs against ctrl-c: whichever finishes first, whatever was
    // collected still gets flushed.
    let outcome = {
        let run = run_scrape(
            &chrome,
            source,
            &cli,
            &tuning,
            &session_path,
            &mut collector,
        );
        tokio::pin!(run);
        tokio::select! {
            res = &mut run => Some(res),
            _ = tokio::signal::ctrl_c() => None,
        }
    };

    chrome.close().await.ok();
    handler.abort();

    match outcome {
        None => {
            warn!(
                "interrupted — flushing {} collected records to {}",
                collector.len(),
                collector.output_path().display()
            );
            collector.finalize()?;
            Ok(())
        }
        Some(Ok(summary)) => {
            collector.finalize()?;
            report(&summary, &collector);
            Ok(())
        }
        Some(Err(e)) => {
            if !collector.is_empty() {
                warn!(
                    "run failed — flushing {} records collected before the error",
                    collector.len()
                );
                if let Err(flush) = collector.finalize() {
                    error!("flush failed too: {}", flush);
                }
            }
            Err(e.into())
        }
    }
}

async fn run_scrape(
    chrome: &Browser,
    source: SessionSource,
    cli: &Cli,
    tuning: &HarvestTuning,
    session_path: &std::path::Path,
    collector: &mut Collector,
) -> Result<HarvestSummary, ScrapeError> {
    let page = chrome
        .new_page("about:blank")
        .await
        .map_err(ScrapeError::browser)?;

    match source {
        SessionSource::Stored(state) => {
            store::inject(&page, &state).await?;
        }
        SessionSource::Fresh(creds) => {
            let state = auth::login(&page, &creds, tuning).await?;
            store::save(session_path, &state)?;
        }
    }

    if !validate::is_authenticated(&page, tuning).await {
        return Err(ScrapeError::AuthenticationFailed(
            "session rejected by the platform — cookies may be expired; re-run without --skip-login"
                .to_string(),
        ));
    }

    navigate::to_search(&page, &cli.keyword, true, tuning).await?;

    let mut surface = CdpSurface::new(&page, tuning);
    harvest::run(&mut surface, collector, tuning).await
}

fn report(summary: &HarvestSummary, collector: &Collector) {
    if collector.is_empty() {
        warn!(
            "no posts collected after {} cycles ({:?})",
            summary.cycles, summary.termination
        );
    } else {
        info!(
            "collected {} unique posts in {} cycles ({:?}) → {}",
            summary.accepted,
            summary.cycles,
            summary.termination,
            collector.output_path().display()
        );
    }
}
