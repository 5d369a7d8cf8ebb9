//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use newsdesk_api::AppState;
use newsdesk_core::{
    ArticleSearchFilter, CategoryPageMap, FeedPage, FeedQuery, RepairOptions, RepairProgress,
    RepairReport, query_feed, repair_pages, search_feed,
};
use newsdesk_shared::{AppConfig, Category, Page, init_config, load_config, load_config_from};
use newsdesk_storage::{FeedFilter, FeedSort, Storage};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Newsdesk: bilingual news publishing backend.
#[derive(Parser)]
#[command(
    name = "newsdesk",
    version,
    about = "Serve, query and maintain a bilingual news article store.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.newsdesk/newsdesk.toml.
    #[arg(long, global = true, env = "NEWSDESK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Start the HTTP API server.
    Serve {
        /// Address to bind (overrides server.bind_addr).
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (overrides server.port).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Recompute every article's pages from its category.
    RepairPages {
        /// Report what would change without writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print one page of a feed.
    Feed {
        /// Display page to list (home, sports, ...).
        #[arg(short, long)]
        surface: Option<Page>,

        /// Only articles in this category.
        #[arg(short, long)]
        category: Option<Category>,

        /// Articles per page.
        #[arg(short, long)]
        limit: Option<u32>,

        /// 1-based page number.
        #[arg(long)]
        page: Option<u32>,

        /// Print the raw JSON page instead of a listing.
        #[arg(long)]
        json: bool,
    },

    /// Search titles, excerpts and bodies in both languages.
    Search {
        /// Text to look for (case-insensitive).
        query: String,

        /// Maximum number of results.
        #[arg(short, long)]
        limit: Option<u32>,

        /// Print the raw JSON page instead of a listing.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "newsdesk=info,tower_http=info",
        1 => "newsdesk=debug,tower_http=debug",
        _ => "newsdesk=trace,tower_http=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Serve { bind, port } => cmd_serve(config_path, bind, port).await,
        Command::RepairPages { dry_run } => cmd_repair_pages(config_path, dry_run).await,
        Command::Feed {
            surface,
            category,
            limit,
            page,
            json,
        } => {
            let filter = FeedFilter {
                surface,
                category,
                ..Default::default()
            };
            cmd_feed(config_path, filter, page, limit, json).await
        }
        Command::Search { query, limit, json } => {
            cmd_search(config_path, &query, limit, json).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

async fn open_storage(config: &AppConfig) -> Result<Storage> {
    let path = Path::new(&config.database.path);
    let storage = Storage::open(path)
        .await
        .wrap_err_with(|| format!("cannot open database at {}", path.display()))?;
    Ok(storage)
}

async fn open_storage_readonly(config: &AppConfig) -> Result<Storage> {
    let path = Path::new(&config.database.path);
    let storage = Storage::open_readonly(path)
        .await
        .wrap_err_with(|| format!("cannot open database at {}", path.display()))?;
    Ok(storage)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_serve(config_path: Option<&Path>, bind: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    if let Some(bind) = bind {
        config.server.bind_addr = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let page_map = CategoryPageMap::with_overrides(&config.category_pages)?;
    let storage = open_storage(&config).await?;
    info!(
        database = %config.database.path,
        mapped = page_map.entries().iter().filter(|e| e.page.is_some()).count(),
        "starting newsdesk"
    );

    let state = AppState::new(Arc::new(storage), Arc::new(page_map), config.feed);
    newsdesk_api::serve(state, &config.server).await?;
    Ok(())
}

async fn cmd_repair_pages(config_path: Option<&Path>, dry_run: bool) -> Result<()> {
    let config = resolve_config(config_path)?;
    let page_map = CategoryPageMap::with_overrides(&config.category_pages)?;
    let storage = open_storage(&config).await?;

    let reporter = CliProgress::new();
    let report = repair_pages(&storage, &page_map, RepairOptions { dry_run }, &reporter).await?;

    let verb = if dry_run { "Would update" } else { "Updated" };
    println!();
    println!("  Page repair {}", if dry_run { "(dry run)" } else { "complete" });
    println!("  Scanned:   {}", report.scanned);
    println!("  {verb}: {}", report.updated);
    println!("  Unchanged: {}", report.unchanged);
    println!("  Unmapped:  {}", report.unmapped);
    println!("  Skipped:   {}", report.skipped);
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_feed(
    config_path: Option<&Path>,
    filter: FeedFilter,
    page: Option<u32>,
    limit: Option<u32>,
    json: bool,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let storage = open_storage_readonly(&config).await?;

    let query = FeedQuery::new(filter, FeedSort::Newest, page, limit, &config.feed);
    let feed = query_feed(&storage, &query).await?;
    print_feed(&feed, json)
}

async fn cmd_search(
    config_path: Option<&Path>,
    text: &str,
    limit: Option<u32>,
    json: bool,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let storage = open_storage_readonly(&config).await?;

    let search = ArticleSearchFilter::new(text)?;
    let query = FeedQuery::new(
        FeedFilter::default(),
        FeedSort::Newest,
        None,
        limit,
        &config.feed,
    );
    let feed = search_feed(&storage, &search, &query).await?;
    print_feed(&feed, json)
}

fn print_feed(feed: &FeedPage, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(feed)?);
        return Ok(());
    }

    if feed.articles.is_empty() {
        println!("No articles found.");
        return Ok(());
    }

    for article in &feed.articles {
        let mut flags = String::new();
        if article.is_breaking {
            flags.push_str(" [breaking]");
        }
        if article.is_featured {
            flags.push_str(" [featured]");
        }
        let pages: Vec<&str> = article.pages.iter().map(|p| p.as_str()).collect();
        println!(
            "  {}  {:<10} {}{flags}",
            article.created_at.format("%Y-%m-%d"),
            article.category.as_str(),
            article.title
        );
        println!("              {}  pages: {}", article.slug, pages.join(", "));
    }
    println!();
    println!(
        "  Page {}/{} ({} articles)",
        feed.page,
        feed.total_pages.max(1),
        feed.total
    );
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Repair progress rendered as an indicatif bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }
}

impl RepairProgress for CliProgress {
    fn start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_message("checking pages");
    }

    fn record(&self, id: &str, changed: bool) {
        if changed {
            self.bar.set_message(format!("repaired {id}"));
        }
        self.bar.inc(1);
    }

    fn done(&self, _report: &RepairReport) {
        self.bar.finish_and_clear();
    }
}
