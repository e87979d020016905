//! CLI binary for notecypher.
//!
//! A thin shim over the library crate: loads the given decks into a
//! `Session`, applies the page selection, and exports one handout PDF.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use notecypher::{
    DisplayPreferences, ExportConfig, ImportConfig, ImportReport, NoteError, Orientation,
    PageError, PageSelection, PdfiumEngine, ProgressCallback, Session, SessionProgressCallback,
    SourceFile,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}
fn blue(s: &str) -> String {
    format!("\x1b[34m{s}\x1b[0m")
}

/// Accent colour for headings: cyan reads better on dark terminals, blue on
/// light ones.
fn accent(dark: bool, s: &str) -> String {
    if dark {
        cyan(s)
    } else {
        blue(s)
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Percentage bar for one import or export.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new(prefix: &'static str) -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(100);
        bar.set_style(style);
        bar.set_prefix(prefix);
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl SessionProgressCallback for CliProgressCallback {
    fn on_progress(&self, percent: f32, status: &str) {
        // The delayed reset to 0 arrives with an empty status; a CLI has
        // nothing to reset.
        if status.is_empty() || self.bar.is_finished() {
            return;
        }
        self.bar.set_position(percent.round() as u64);
        self.bar.set_message(status.to_string());
    }

    fn on_page_error(&self, error: &PageError) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = error.to_string();
        let msg = if msg.chars().count() > 100 {
            format!("{}\u{2026}", msg.chars().take(99).collect::<String>())
        } else {
            msg
        };
        self.bar.println(format!("  {} {}", red("✗"), red(&msg)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One slide per page, written to ./optimized-notes-<timestamp>.pdf
  notecypher lecture.pdf

  # Six slides per page, printer friendly
  notecypher --layout 6 --grayscale --invert --threshold week*.pdf -o handouts/

  # Only pages 3-10 of the combined deck, landscape, 3 mm margin
  notecypher --pages 3-10 --layout 2 --orientation landscape --margin 3 a.pdf b.pdf -o notes.pdf

  # List loaded documents and pages without exporting
  notecypher --list --json lecture.pdf

  # Save page previews
  notecypher --thumbnails previews/ --list lecture.pdf

LAYOUTS:
  1  1x1    2  1x2    3  1x3    4  2x2    6  2x3
  Pages are A4 (595x842 pt portrait). Slides keep their aspect ratio and
  are centred in their cell.

FILTERS (applied in this order):
  --grayscale  luminance 0.299 R + 0.587 G + 0.114 B
  --invert     255 - channel
  --threshold  pixels brighter than 220 on average become white

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory)
  RUST_LOG          Override log filter (e.g. notecypher=debug)
"#;

/// Turn slide decks into printer-friendly handouts.
#[derive(Parser, Debug)]
#[command(
    name = "notecypher",
    version,
    about = "Turn slide decks into printer-friendly handouts",
    long_about = "Load one or more PDF slide decks, pick pages, optionally convert them to \
grayscale, invert and threshold them for printing, and lay several slides out on each A4 page.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files to load, in order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output file, or a directory for the default timestamped name.
    #[arg(short, long, env = "NOTECYPHER_OUTPUT")]
    output: Option<PathBuf>,

    /// Pages to export by position across all inputs: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "NOTECYPHER_PAGES", default_value = "all")]
    pages: String,

    /// Convert slides to grayscale.
    #[arg(long)]
    grayscale: bool,

    /// Invert colours (dark slides become light).
    #[arg(long)]
    invert: bool,

    /// Turn near-white pixels pure white.
    #[arg(long)]
    threshold: bool,

    /// Slides per page: 1, 2, 3, 4 or 6.
    #[arg(long, env = "NOTECYPHER_LAYOUT", default_value_t = 1)]
    layout: u8,

    /// Page orientation.
    #[arg(long, env = "NOTECYPHER_ORIENTATION", value_enum, default_value = "portrait")]
    orientation: OrientationArg,

    /// Page margin in millimetres (0–5).
    #[arg(long, env = "NOTECYPHER_MARGIN", default_value_t = 0.0)]
    margin: f32,

    /// Write a PNG preview of every loaded page into this directory.
    #[arg(long)]
    thumbnails: Option<PathBuf>,

    /// List documents and pages, do not export.
    #[arg(long)]
    list: bool,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    /// Set and remember the colour theme.
    #[arg(long, value_enum)]
    theme: Option<ThemeArg>,

    /// Path to libpdfium (file or containing directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, env = "NOTECYPHER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "NOTECYPHER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "NOTECYPHER_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OrientationArg {
    Portrait,
    Landscape,
}

impl From<OrientationArg> for Orientation {
    fn from(v: OrientationArg) -> Self {
        match v {
            OrientationArg::Portrait => Orientation::Portrait,
            OrientationArg::Landscape => Orientation::Landscape,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ThemeArg {
    Dark,
    Light,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Display preferences ──────────────────────────────────────────────
    let mut prefs = DisplayPreferences::load();
    if let Some(theme) = cli.theme {
        prefs.dark_mode = matches!(theme, ThemeArg::Dark);
        prefs.save().context("Failed to save display preferences")?;
    }
    let dark = prefs.dark_mode;

    // ── Read inputs ──────────────────────────────────────────────────────
    let (files, unreadable) = read_inputs(&cli.inputs).await;
    if !cli.quiet && !cli.json {
        for (path, err) in &unreadable {
            eprintln!("  {} {} {}", red("✗"), path.display(), dim(&format!("({err})")));
        }
    }
    if files.is_empty() {
        anyhow::bail!("None of the {} input files could be read", cli.inputs.len());
    }

    let engine = match cli.pdfium_lib {
        Some(ref path) => PdfiumEngine::with_library_path(path),
        None => PdfiumEngine::new(),
    };
    let mut session = Session::new(Arc::new(engine));

    // ── Import ───────────────────────────────────────────────────────────
    let import_cb = show_progress.then(|| CliProgressCallback::new("Importing"));
    let mut import_config = ImportConfig::builder();
    if let Some(ref cb) = import_cb {
        import_config = import_config.progress_callback(cb.clone() as ProgressCallback);
    }
    let import_config = import_config.build().context("Invalid configuration")?;

    let report = session
        .import(files, &import_config)
        .await
        .context("Import failed")?;
    if let Some(cb) = import_cb {
        cb.finish();
    }
    if !cli.quiet && !cli.json {
        print_import_summary(&report, dark);
    }

    if let Some(ref dir) = cli.thumbnails {
        let written = write_thumbnails(&session, dir).await?;
        if !cli.quiet && !cli.json {
            let dir = bold(&dir.display().to_string());
            eprintln!("{} {} previews → {}", green("✔"), written, dir);
        }
    }

    if cli.list {
        print_listing(&session, &report, cli.json, dark)?;
        return Ok(());
    }

    if session.is_empty() {
        anyhow::bail!("No pages could be loaded from the given files");
    }

    // ── Select ───────────────────────────────────────────────────────────
    let selection = parse_pages(&cli.pages)?;
    session.select_pages(&selection);

    // ── Export ───────────────────────────────────────────────────────────
    let export_cb = show_progress.then(|| CliProgressCallback::new("Exporting"));
    let mut builder = ExportConfig::builder()
        .grayscale(cli.grayscale)
        .invert(cli.invert)
        .threshold(cli.threshold)
        .slides_per_page(cli.layout)
        .orientation(cli.orientation.into())
        .margin_mm(cli.margin);
    if let Some(ref cb) = export_cb {
        builder = builder.progress_callback(cb.clone() as ProgressCallback);
    }
    let export_config = builder.build().context("Invalid configuration")?;

    let output = session
        .export(&export_config)
        .await
        .context("Export failed")?;
    if let Some(cb) = export_cb {
        cb.finish();
    }

    let path = match cli.output {
        Some(ref p) if is_directory_target(p) => output.save_to_dir(p).await?,
        Some(ref p) => {
            output.save_to(p).await?;
            p.clone()
        }
        None => output.save_to_dir(".").await?,
    };

    // ── Summary ──────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::json!({
            "file": path,
            "mime_type": output.mime_type,
            "bytes": output.bytes.len(),
            "stats": output.stats,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {}/{} slides  {} pages  {}ms  →  {}",
            if stats.skipped_pages == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.exported_pages,
            stats.selected_pages,
            stats.output_pages,
            stats.duration_ms,
            bold(&path.display().to_string()),
        );
    }

    Ok(())
}

/// Read every input, keeping the ones that load. An unreadable path is
/// logged and returned alongside its error instead of ending the run.
async fn read_inputs(paths: &[PathBuf]) -> (Vec<SourceFile>, Vec<(PathBuf, NoteError)>) {
    let mut files = Vec::with_capacity(paths.len());
    let mut unreadable = Vec::new();
    for path in paths {
        match SourceFile::from_path(path).await {
            Ok(file) => files.push(file),
            Err(err) => {
                tracing::warn!("Skipping {}: {}", path.display(), err);
                unreadable.push((path.clone(), err));
            }
        }
    }
    (files, unreadable)
}

fn print_import_summary(report: &ImportReport, dark: bool) {
    for name in &report.rejected_files {
        eprintln!("  {} {} {}", red("✗"), name, dim("(not a PDF)"));
    }
    let mark = if report.errors.is_empty() {
        green("✔")
    } else {
        cyan("⚠")
    };
    eprintln!(
        "{} {} pages from {} documents{}",
        mark,
        accent(dark, &report.pages_added.to_string()),
        report.documents.len(),
        if report.errors.is_empty() {
            String::new()
        } else {
            format!("  ({} skipped)", red(&report.errors.len().to_string()))
        }
    );
}

fn print_listing(session: &Session, report: &ImportReport, json: bool, dark: bool) -> Result<()> {
    if json {
        let listing = serde_json::json!({
            "documents": session.documents(),
            "pages": session.pages(),
            "import": report,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&listing).context("Failed to serialise listing")?
        );
        return Ok(());
    }

    for doc in session.documents() {
        println!(
            "{}  {}  {}",
            accent(dark, &bold(&doc.name)),
            dim(&format!("{} pages", doc.page_count)),
            dim(&format!("{} KiB", doc.size_bytes / 1024)),
        );
        for page in session.pages_of(doc.id) {
            let position = session.position_of(page.id).map(|p| p + 1).unwrap_or(0);
            println!(
                "  {:>4}  page {:>3}  {}",
                position,
                page.page_number,
                dim(&format!("{}x{} px", page.export_width, page.export_height)),
            );
        }
    }
    Ok(())
}

/// Write every thumbnail as `<deck stem>-p<page>.png`.
async fn write_thumbnails(session: &Session, dir: &Path) -> Result<usize> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let mut written = 0;
    for page in session.pages() {
        let stem = Path::new(&page.file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "page".to_string());
        let path = dir.join(format!("{stem}-p{:03}.png", page.page_number));
        tokio::fs::write(&path, &page.thumbnail.png)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written += 1;
    }
    Ok(written)
}

fn is_directory_target(path: &Path) -> bool {
    path.is_dir() || path.as_os_str().to_string_lossy().ends_with(std::path::MAIN_SEPARATOR)
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}
