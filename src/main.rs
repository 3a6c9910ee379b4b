use clap::{Parser, Subcommand};
use commentlens::backdrop::Backdrop;
use commentlens::credential::{store_supplied_key, CredentialStore, MemoryStore, API_KEY_SLOT};
use commentlens::flows::{CommentPredictor, Outcome, VideoAnalyzer};
use commentlens::report::{self, Report};
use commentlens::terminal::{TerminalCharts, TerminalScreen};
use commentlens::{Config, Database, HttpService, PanelId, Panels};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "commentlens")]
#[command(author, version, about = "Classify comments by topic and sentiment")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Base URL of the classification service
    #[arg(long, env = "COMMENTLENS_SERVER", default_value = commentlens::config::DEFAULT_SERVER, global = true)]
    server: String,

    /// SQLite file holding the cached API key
    #[arg(long, env = "COMMENTLENS_DB", default_value = commentlens::config::DEFAULT_DB_PATH, global = true)]
    db: PathBuf,

    /// Show progress logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Predict topic and sentiment of one comment
    Predict {
        /// Comment text, sent as-is
        comment: String,
    },

    /// Analyze the comments of a YouTube video
    Analyze {
        /// Video URL
        url: String,

        /// YouTube API key (cached for later runs)
        #[arg(long)]
        api_key: Option<String>,

        /// Write a report (.html, .json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Don't open the report in a browser
        #[arg(long)]
        no_open: bool,

        /// Expand the advanced results (legends and topic/sentiment splits)
        #[arg(long)]
        advanced: bool,

        /// Expand the full results table
        #[arg(long)]
        full: bool,

        /// Draw the animated background (first frame) behind the HTML report
        #[arg(long)]
        backdrop: bool,
    },

    /// Start interactive web UI
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3001")]
        port: u16,

        /// Don't open a browser
        #[arg(long)]
        no_open: bool,
    },

    /// Manage the cached YouTube API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Render background animation frames as SVG
    Backdrop {
        #[arg(long, default_value = "1280")]
        width: u32,

        #[arg(long, default_value = "720")]
        height: u32,

        /// Number of frames, the first is the initial state
        #[arg(long, default_value = "3")]
        frames: usize,

        /// Pattern seed (default: current time)
        #[arg(long)]
        seed: Option<u64>,

        /// Directory for the frames
        #[arg(long, default_value = "backdrop-frames")]
        out_dir: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum KeyAction {
    /// Show the cached key (masked)
    Show,

    /// Cache a key
    Set {
        key: String,
    },

    /// Forget the cached key
    Clear,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(io::stderr)
        .init();

    let config = Config::new().with_server(args.server).with_db_path(args.db);

    let code = match args.command {
        Command::Predict { comment } => run_predict(&config, &comment),
        Command::Analyze { url, api_key, output, no_open, advanced, full, backdrop } => {
            let mut panels = Panels::default();
            if advanced {
                panels.toggle(PanelId::AdvancedResults);
            }
            if full {
                panels.toggle(PanelId::FullResults);
            }
            let options = ReportOptions { output, open: !no_open, backdrop };
            run_analyze(config, &url, api_key, options, panels)
        }
        Command::Serve { port, no_open } => {
            if let Err(e) = commentlens::serve::start(port, config, !no_open) {
                eprintln!("Server error: {}", e);
                1
            } else {
                0
            }
        }
        Command::Key { action } => handle_key_action(&config, action),
        Command::Backdrop { width, height, frames, seed, out_dir } => {
            let seed = seed.unwrap_or_else(|| chrono::Utc::now().timestamp_millis() as u64);
            run_backdrop(width, height, frames, seed, &out_dir)
        }
    };

    std::process::exit(code);
}

fn service(config: &Config) -> Option<HttpService> {
    match HttpService::new(config.server.clone()) {
        Ok(s) => Some(s),
        Err(e) => {
            eprintln!("Failed to create HTTP client: {}", e);
            None
        }
    }
}

fn exit_code<T>(outcome: &Outcome<T>) -> i32 {
    if outcome.is_done() {
        0
    } else {
        1
    }
}

fn run_predict(config: &Config, comment: &str) -> i32 {
    let Some(service) = service(config) else { return 1 };

    let stdin = io::stdin();
    let mut screen = TerminalScreen::new(io::stdout(), stdin.lock());
    let outcome = CommentPredictor::new(&service).run(&mut screen, comment);
    screen.into_inner();
    exit_code(&outcome)
}

struct ReportOptions {
    output: Option<PathBuf>,
    open: bool,
    backdrop: bool,
}

fn run_analyze(config: Config, url: &str, api_key: Option<String>, report_opts: ReportOptions, panels: Panels) -> i32 {
    let Some(service) = service(&config) else { return 1 };

    // An unusable database only costs the cache
    let mut store: Box<dyn CredentialStore> = match Database::open_at(&config.db_path) {
        Ok(db) => Box::new(db),
        Err(e) => {
            tracing::warn!("credential store unavailable, key will not be cached: {}", e);
            Box::new(MemoryStore::new())
        }
    };

    // Only cache once there is something to analyze
    if !url.trim().is_empty() {
        if let Some(key) = api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            store = store_supplied_key(store, key);
        }
    }

    eprintln!("\x1b[1mcommentlens\x1b[0m {}", url);
    eprintln!("{}", "─".repeat(70));

    let charts = TerminalCharts::new(io::stdout()).with_pies(panels.advanced.shown);
    let mut analyzer = VideoAnalyzer::new(config, charts);

    let stdin = io::stdin();
    let mut screen = TerminalScreen::new(io::stdout(), stdin.lock()).with_panels(panels);
    let outcome = analyzer.run(&service, store.as_ref(), &mut screen, url);
    screen.into_inner();

    let view = match outcome {
        Outcome::Done(view) => view,
        other => return exit_code(&other),
    };

    let censorable = view.censorable_rows().count();
    eprintln!("\n{}", "─".repeat(70));
    eprintln!("\x1b[1mSummary:\x1b[0m");
    eprintln!("  Rows:        {}", view.rows.len());
    eprintln!("  \x1b[31mCensorable:\x1b[0m  {}", censorable);
    if !panels.full.shown && !view.rows.is_empty() {
        eprintln!("\x1b[90m  (--full shows every row)\x1b[0m");
    }

    if let Some(ref output_path) = report_opts.output {
        let mut report = Report::new(url, &view).with_panels(panels);
        if report_opts.backdrop {
            let seed = chrono::Utc::now().timestamp_millis() as u64;
            report = report.with_backdrop(&Backdrop::new(1280, 720, seed));
        }
        if let Err(e) = report::generate(output_path, &report) {
            eprintln!("Failed to write report: {}", e);
            return 1;
        }
        eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", output_path.display());

        if report_opts.open {
            if let Err(e) = open::that(output_path) {
                eprintln!("Failed to open report: {}", e);
            }
        }
    }

    0
}

fn handle_key_action(config: &Config, action: KeyAction) -> i32 {
    let db = match Database::open_at(&config.db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to open database: {}", e);
            return 1;
        }
    };

    match action {
        KeyAction::Show => match db.get(API_KEY_SLOT) {
            Ok(Some(key)) => {
                println!("{}", mask(&key));
                0
            }
            Ok(None) => {
                println!("No API key cached.");
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },

        KeyAction::Set { key } => {
            let key = key.trim();
            if key.is_empty() {
                eprintln!("{}", commentlens::credential::ALERT_API_KEY_REQUIRED);
                return 1;
            }
            match db.set(API_KEY_SLOT, key) {
                Ok(()) => {
                    println!("API key cached in {}", db.path().display());
                    0
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    1
                }
            }
        }

        KeyAction::Clear => match db.delete(API_KEY_SLOT) {
            Ok(true) => {
                println!("API key removed.");
                0
            }
            Ok(false) => {
                println!("No API key cached.");
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
    }
}

fn run_backdrop(width: u32, height: u32, frames: usize, seed: u64, out_dir: &Path) -> i32 {
    if let Err(e) = std::fs::create_dir_all(out_dir) {
        eprintln!("Failed to create {}: {}", out_dir.display(), e);
        return 1;
    }

    let mut backdrop = Backdrop::new(width, height, seed);
    for frame in 0..frames {
        if frame > 0 {
            let t = backdrop.tick();
            eprintln!("  repaint: layer {} in, layer {} out", t.painted, t.faded_out);
        }
        let path = out_dir.join(format!("frame-{:03}.svg", frame));
        if let Err(e) = std::fs::write(&path, backdrop.to_svg()) {
            eprintln!("Failed to write {}: {}", path.display(), e);
            return 1;
        }
        println!("{}", path.display());
    }
    0
}

fn mask(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    let hidden = key.chars().count().saturating_sub(4);
    format!("{}{}", visible, "*".repeat(hidden))
}
