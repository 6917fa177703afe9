mod config;
mod keyword;
mod markdown;
mod marketplace;
mod messages;
mod product;
mod sidebar;
mod title;
mod visual;

pub const USER_AGENT: &str = concat!("lensmatch/", env!("CARGO_PKG_VERSION"));

/// Characters `encodeURIComponent` leaves alone stay unescaped.
pub(crate) const COMPONENT_ENCODE_SET: &percent_encoding::AsciiSet =
    &percent_encoding::NON_ALPHANUMERIC
        .remove(b'-')
        .remove(b'_')
        .remove(b'.')
        .remove(b'!')
        .remove(b'~')
        .remove(b'*')
        .remove(b'\'')
        .remove(b'(')
        .remove(b')');

use clap::{Parser, Subcommand};
use reqwest::Client;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::oneshot;
use tracing::{info, warn};

use config::Config;
use keyword::{CatalogClient, search_expanded};
use markdown::{format_matches, format_sidebar};
use messages::{Core, FrameMessage, PageMessage, Request, Response};
use product::{MatchResult, PageMeta};
use sidebar::{Page, ProductStore, SearchMode, Sidebar, read_page_meta};
use visual::VisualSearch;
use visual::backend::{BackendProvider, SurfaceKind};
use visual::chrome::ChromeProvider;
use visual::document::HtmlDocument;
use visual::http_surface::HttpSurfaceProvider;

type AppCore = Core<BackendProvider, visual::TokioSleep, CatalogClient>;

#[derive(Parser)]
#[command(name = "lensmatch", version, about = "Find Daraz listings similar to an Alibaba product")]
struct Cli {
    /// Print JSON instead of Markdown
    #[arg(long, global = true)]
    json: bool,

    /// Override the number of visual-search polling attempts
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    /// Surface the image search runs in
    #[arg(long, global = true, value_enum)]
    surface: Option<SurfaceKind>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reduce a wholesale title to a short consumer query
    Normalize {
        title: String,
        /// Also list the fallback queries
        #[arg(long)]
        expand: bool,
    },
    /// Search the marketplace catalog
    Keyword {
        query: String,
        /// Treat the query as a raw product title and try its expanded queries
        #[arg(long)]
        from_title: bool,
    },
    /// Search the marketplace by image
    Visual { image_url: String },
    /// Scrape a product page, then run visual search with keyword fallback
    Compare { page_url: String },
    /// Answer JSON-line requests on stdin
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lensmatch=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()
        .with_max_attempts(cli.max_attempts)
        .with_surface(cli.surface);
    let http = config::http_client()?;

    match cli.command {
        Command::Normalize { title, expand } => {
            println!("{}", title::normalize(&title));
            if expand {
                for query in title::expand_queries(&title) {
                    println!("  {query}");
                }
            }
        }
        Command::Keyword { query, from_title } => {
            let catalog = CatalogClient::new(http, &config.marketplace_url);
            let results = if from_title {
                search_expanded(&catalog, &query).await?
            } else {
                keyword::KeywordSearch::search(&catalog, &query).await?
            };
            print_matches(cli.json, "Keyword matches", &results)?;
        }
        Command::Visual { image_url } => {
            let core = build_core(&config, http);
            let response = core.handle(Request::VisualSearch { image_url }).await;
            print_response(cli.json, "Visual matches", &response)?;
        }
        Command::Compare { page_url } => {
            let core = build_core(&config, http.clone());
            compare(&core, &http, &page_url, cli.json).await?;
        }
        Command::Serve => {
            let core = build_core(&config, http);
            serve(&core).await?;
        }
    }
    Ok(())
}

fn build_core(config: &Config, http: Client) -> AppCore {
    let provider = match config.surface {
        SurfaceKind::Chrome => {
            BackendProvider::Chrome(ChromeProvider::new(http.clone(), config.chrome_path.clone()))
        }
        SurfaceKind::Static => BackendProvider::Static(HttpSurfaceProvider::new(http.clone())),
    };
    info!(surface = ?config.surface, "visual search surface");
    let visual = VisualSearch::new(provider, config.poll, &config.lens_url);
    Core::new(visual, CatalogClient::new(http, &config.marketplace_url))
}

async fn compare(
    core: &AppCore,
    http: &Client,
    page_url: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let markup = http.get(page_url).send().await?.error_for_status()?.text().await?;
    let meta: PageMeta = read_page_meta(&HtmlDocument::parse(&markup, Some(page_url)), page_url);

    let store = ProductStore::default();
    let page = Page::new(&store, page_url);
    let product = page.scrape(meta);
    info!(title = %product.title, has_image = !product.image.is_empty(), "page scraped");

    let mut sidebar = Sidebar::default();
    sidebar.refresh(&store, core).await;
    if sidebar.notice.as_ref().is_some_and(|n| n.suggests_keyword()) {
        info!("no visual matches, falling back to keyword search");
        sidebar.keyword_search(core, None).await;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&sidebar.results)?);
    } else {
        let heading = match sidebar.mode {
            SearchMode::Visual => "Visual matches",
            SearchMode::Keyword => "Keyword matches",
        };
        print!(
            "{}",
            format_sidebar(
                sidebar.product.as_ref(),
                &sidebar.results,
                sidebar.notice.as_ref(),
                heading
            )
        );
    }
    Ok(())
}

/// Anything a caller may write to `serve`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Inbound {
    Search(Request),
    Page(PageMessage),
    Frame(FrameMessage),
}

/// One message per stdin line. Searches get one response line each, in order;
/// page messages echo whatever the page forwards to the sidebar frame.
async fn serve(core: &AppCore) -> Result<(), Box<dyn std::error::Error>> {
    info!("serving requests on stdin");
    let store = ProductStore::default();
    let mut page = Page::new(&store, "");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let out = match serde_json::from_str::<Inbound>(&line) {
            Ok(Inbound::Search(request)) => {
                let (tx, mut rx) = oneshot::channel();
                let wait = async move {
                    tokio::select! {
                        response = &mut rx => response.ok(),
                        _ = tokio::signal::ctrl_c() => None,
                    }
                };
                let ((), response) = tokio::join!(core.respond(request, tx), wait);
                let Some(response) = response else {
                    info!("interrupted, search abandoned");
                    break;
                };
                serde_json::to_string(&response)?
            }
            Ok(Inbound::Page(message)) => match page.on_message(message) {
                Some(forward) => serde_json::to_string(&forward)?,
                None => continue,
            },
            Ok(Inbound::Frame(message)) => {
                page.on_frame_message(message);
                info!(open = page.is_sidebar_open(), "sidebar state");
                continue;
            }
            Err(e) => {
                warn!(error = %e, "unreadable request");
                serde_json::to_string(&Response::error(format!("invalid request: {e}")))?
            }
        };

        stdout.write_all(out.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    info!("server stopped");
    Ok(())
}

fn print_response(json: bool, heading: &str, response: &Response) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }
    match response.message {
        Some(ref message) => eprintln!("{message}"),
        None => print!("{}", format_matches(heading, response.results())),
    }
    Ok(())
}

fn print_matches(json: bool, heading: &str, results: &[MatchResult]) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
    } else {
        print!("{}", format_matches(heading, results));
    }
    Ok(())
}
