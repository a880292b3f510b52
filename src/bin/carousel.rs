//! CLI binary for edgequake-carousel.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig`, writes the snapshots and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_carousel::progress::{percent, status_message};
use edgequake_carousel::{
    convert, inspect, write_output, Color, ConversionConfig, ConversionProgressCallback, PageSelection,
    ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a percentage bar whose message follows the
/// four-stage status line, plus one log line per skipped page.
struct CliProgressCallback {
    bar: ProgressBar,
    completed: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message(status_message(0));
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            completed: AtomicUsize::new(0),
        })
    }

    fn advance(&self, total: usize) {
        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        let pct = percent(done, total);
        self.bar.set_position(u64::from(pct));
        self.bar.set_message(status_message(pct));
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.bar.set_prefix("Rendering");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total_pages} page(s)…"))
        ));
    }

    fn on_page_complete(&self, _index: usize, total_pages: usize, _fraction: f32) {
        self.advance(total_pages);
    }

    fn on_page_skipped(&self, index: usize, total_pages: usize, reason: &str) {
        let msg: String = if reason.chars().count() > 80 {
            let cut: String = reason.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            reason.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            index,
            total_pages,
            red(&msg)
        ));
        self.advance(total_pages);
    }

    fn on_conversion_complete(&self, total_pages: usize, produced_pages: usize) {
        self.bar.finish_and_clear();
        let skipped = total_pages.saturating_sub(produced_pages);
        if skipped == 0 {
            eprintln!(
                "{} {} pages rendered",
                green("✔"),
                bold(&produced_pages.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages rendered  ({} skipped)",
                cyan("⚠"),
                bold(&produced_pages.to_string()),
                total_pages,
                red(&skipped.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Slides to PNG snapshots in the current directory
  carousel deck.pptx

  # Into a folder, with drafted post copy
  carousel deck.pptx -o out/ --caption

  # Selected PDF pages at 2x
  carousel --pages 1-5 --scale 2 report.pdf -o out/

  # From a URL
  carousel https://example.com/handbook.docx -o out/

  # Document info only (no rendering, no API key)
  carousel --inspect-only deck.pptx

OUTPUT:
  <stem>-snap-<N>.png   one per rendered slide/page (N is the source position)
  <stem>-copy.json      headline, caption and hashtags (with --caption)

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory) for PDF input
  CAROUSEL_FONT           Regular font used for slide text

FONTS:
  Slide and document text is drawn with a TrueType/OpenType font. Common
  system fonts (DejaVu, Liberation, Arial, Helvetica) are found
  automatically; pass --font to choose one. Without a font, text is
  skipped and shapes/pictures still render.
"#;

/// Convert PDF, DOCX and PPTX documents into carousel-ready PNG snapshots.
#[derive(Parser, Debug)]
#[command(
    name = "carousel",
    version,
    about = "Convert PDF, DOCX and PPTX documents into carousel-ready PNG snapshots",
    long_about = "Convert documents (local files or URLs) into one high-resolution PNG per \
slide or page, ready for social-media carousel posts. Optionally drafts a headline, caption \
and hashtags with an LLM (OpenAI, Gemini, Anthropic, Ollama, …).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local document path or HTTP/HTTPS URL.
    input: String,

    /// Directory to write snapshots into.
    #[arg(short, long, env = "CAROUSEL_OUTPUT", default_value = ".")]
    output: PathBuf,

    /// Supersampling factor (1–8) over the 1280×720 slide canvas.
    #[arg(long, env = "CAROUSEL_SCALE", default_value_t = 4.0)]
    scale: f32,

    /// Draft social copy (headline, caption, hashtags) with an LLM.
    #[arg(long, env = "CAROUSEL_CAPTION")]
    caption: bool,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (default: gpt-4.1-nano).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Regular text font (TTF/OTF).
    #[arg(long, env = "CAROUSEL_FONT")]
    font: Option<PathBuf>,

    /// Bold text font (TTF/OTF). Defaults to the regular font.
    #[arg(long, env = "CAROUSEL_BOLD_FONT")]
    bold_font: Option<PathBuf>,

    /// Colour under every page, as RRGGBB.
    #[arg(long, env = "CAROUSEL_BACKGROUND")]
    background: Option<String>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "CAROUSEL_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "CAROUSEL_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt for --caption.
    #[arg(long, env = "CAROUSEL_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "CAROUSEL_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max LLM output tokens for the copy.
    #[arg(long, env = "CAROUSEL_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Print the ConversionOutput (or DocumentInfo) as JSON on stdout.
    #[arg(long, env = "CAROUSEL_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "CAROUSEL_NO_PROGRESS")]
    no_progress: bool,

    /// Print document info only, no rendering.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CAROUSEL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CAROUSEL_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "CAROUSEL_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides all the feedback that matters while it is
    // visible, so library INFO logs are suppressed unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input, cli.password.as_deref())
            .await
            .context("Failed to inspect document")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize document info")?
            );
        } else {
            println!("File:         {}", info.file_name);
            if let Some(kind) = info.kind {
                println!("Format:       {}", kind);
            }
            println!("Pages:        {}", info.page_count);
            if let Some(ref t) = info.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = info.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = info.subject {
                println!("Subject:      {}", s);
            }
            if let Some(ref c) = info.creator {
                println!("Creator:      {}", c);
            }
            if let Some(ref p) = info.producer {
                println!("Producer:     {}", p);
            }
            println!("Size:         {} bytes", info.size_bytes);
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert(&cli.input, &config)
        .await
        .context("Conversion failed")?;
    let written = write_output(&output, &cli.output)
        .await
        .context("Failed to write snapshots")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {}/{} pages  {}ms  →  {}",
            if stats.skipped_pages == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.produced_pages,
            stats.total_pages,
            stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
        for path in &written {
            eprintln!("   {}", dim(&path.display().to_string()));
        }
        if let Some(ref suggestion) = output.suggestion {
            println!("{}", suggestion.post_text());
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = ConversionConfig::builder()
        .pixel_ratio(cli.scale)
        .pages(pages)
        .generate_copy(cli.caption)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref hex) = cli.background {
        let color = Color::from_hex(hex)
            .with_context(|| format!("Invalid --background '{hex}': expected RRGGBB"))?;
        builder = builder.background(color);
    }
    if let Some(ref path) = cli.font {
        builder = builder.font_path(path);
    }
    if let Some(ref path) = cli.bold_font {
        builder = builder.bold_font_path(path);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
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

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_page_selections() {
        assert_eq!(parse_pages("all").unwrap(), PageSelection::All);
        assert_eq!(parse_pages(" 5 ").unwrap(), PageSelection::Single(5));
        assert_eq!(parse_pages("3-15").unwrap(), PageSelection::Range(3, 15));
        assert_eq!(parse_pages("1,3,5").unwrap(), PageSelection::Set(vec![1, 3, 5]));
    }

    #[test]
    fn rejects_bad_page_selections() {
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("5-3").is_err());
        assert!(parse_pages("1,0").is_err());
        assert!(parse_pages("abc").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
