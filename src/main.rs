use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use triage::ajax::AjaxClient;
use triage::api::create_router;
use triage::backend::{FixtureBackend, SearchBackend, UpstreamBackend};
use triage::config::CONFIG;
use triage::data_models::SearchForm;
use triage::location::{AddressMode, PageLocation};
use triage::session::SearchSession;
use triage::view::ViewState;

#[derive(Parser)]
#[command(name = "triage", about = "Find solutions and similar issues for a problem description")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the search page and its results endpoint
    Serve {
        #[arg(long)]
        addr: Option<String>,
        /// JSON fixture file for the built-in backend
        #[arg(long)]
        fixtures: Option<PathBuf>,
        /// Page url of another deployment to forward searches to
        #[arg(long)]
        upstream: Option<String>,
        #[arg(long)]
        static_dir: Option<String>,
    },
    /// Run one search against a page's results endpoint and print the result area
    Search {
        query: String,
        /// Strictness slider position, 1 (strict) to 4 (loose)
        #[arg(long, default_value_t = 4)]
        slider: i64,
        #[arg(long, default_value = "http://127.0.0.1:8000/")]
        page: String,
        /// Keep the query string in the rewritten address
        #[arg(long)]
        with_query: bool,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Html,
    Text,
}

fn build_backend(
    fixtures: Option<PathBuf>,
    upstream: Option<String>,
) -> anyhow::Result<Arc<dyn SearchBackend>> {
    if let Some(upstream) = upstream.or_else(|| CONFIG.upstream_url.clone()) {
        log::info!("forwarding searches to {upstream}");
        let location = PageLocation::parse(&upstream)?;
        return Ok(Arc::new(UpstreamBackend::new(AjaxClient::new(), location)));
    }
    match fixtures.or_else(|| CONFIG.fixtures.as_ref().map(PathBuf::from)) {
        Some(path) => Ok(Arc::new(FixtureBackend::from_file(path)?)),
        None => {
            log::warn!("no fixtures or upstream configured, every search will be empty");
            Ok(Arc::new(FixtureBackend::default()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber (handles both tracing and log crate)
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve {
            addr,
            fixtures,
            upstream,
            static_dir,
        } => {
            let backend = build_backend(fixtures, upstream)?;
            let static_dir = static_dir.unwrap_or_else(|| CONFIG.static_dir.clone());
            let addr = addr.unwrap_or_else(|| CONFIG.bind_addr.clone());

            let router = create_router(backend, static_dir);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            log::info!("listening on http://{}", listener.local_addr()?);
            axum::serve(listener, router).await?;
        }
        Command::Search {
            query,
            slider,
            page,
            with_query,
            format,
        } => {
            let mode = if with_query {
                AddressMode::WithQuery
            } else {
                CONFIG.address_mode
            };
            let session = SearchSession::new(AjaxClient::new(), PageLocation::parse(&page)?, mode);
            let res = session.search(&SearchForm::new(query, slider)).await;
            if let Err(e) = res {
                anyhow::bail!("invalid search form: {e}");
            }

            let area = session.area().await;
            match format {
                Format::Html => println!("{}", area.to_html()),
                Format::Text => print!("{}", area.to_text()),
            }
            if let Some(address) = session.address().await {
                eprintln!("address: {address}");
            }
            if session.state().await == ViewState::Error {
                anyhow::bail!("search failed: {}", area.error_message);
            }
        }
    }
    Ok(())
}
