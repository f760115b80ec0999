//! CLI binary for photocite.
//!
//! A thin shim over the library crate that maps CLI flags to a
//! `ComposeRequest` and `ComposeConfig`, and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use photocite::{
    compose, inspect, resolve_request, ComposeConfig, ComposeProgressCallback, ModeKind,
    PhotociteError, ProgressCallback, RequestArgs, Stage, ToolPaths,
};
use std::ffi::OsString;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one spinner naming the running stage, and a
/// log line per finished stage printed above it.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::ResolveInput => "Reading input",
        Stage::Preflight => "Checking tools",
        Stage::Inspect => "Inspecting image",
        Stage::Render => "Typesetting citation",
        Stage::Crop => "Cropping page",
        Stage::Rasterize => "Rasterising caption",
        Stage::Scale => "Scaling caption",
        Stage::Composite => "Appending caption",
        Stage::Emit => "Writing caption",
        Stage::Cleanup => "Cleaning up",
    }
}

impl ComposeProgressCallback for CliProgressCallback {
    fn on_compose_start(&self, mode: ModeKind) {
        self.bar.set_prefix(match mode {
            ModeKind::Standard => "Composing",
            ModeKind::CitationOnly => "Citation only",
        });
    }

    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{}…", stage_label(stage)));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        if stage == Stage::Cleanup {
            return;
        }
        self.bar.println(format!(
            "  {} {:<22} {}",
            green("✓"),
            stage_label(stage),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        let first_line = error.lines().next().unwrap_or(error);
        let msg = if first_line.chars().count() > 80 {
            let cut: String = first_line.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            first_line.to_string()
        };
        self.bar.println(format!(
            "  {} {:<22} {}",
            red("✗"),
            stage_label(stage),
            red(&msg)
        ));
        self.bar.finish_and_clear();
    }

    fn on_compose_complete(&self, _output: &Path) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Citation as an argument
  photocite crane.jpg "Photo: *Whooping crane*, USFWS, 2021."

  # Citation from a Markdown file, explicit output
  photocite -c crane.md -o crane_cite.jpg crane.jpg

  # Citation piped on stdin
  cat crane.md | photocite crane.jpg

  # Caption alone, no photo
  photocite -co crane.md
  echo "Photo: *Whooping crane*" | photocite -co -o caption.png

  # Custom LaTeX template
  photocite -t mytemplate.latex crane.jpg -c crane.md

  # Probe an image
  photocite --inspect-only --json crane.jpg

CITATION SOURCES (exactly one is used):
  1. text piped on stdin
  2. the file given with -c/--cite
  3. the citation text argument

EXIT CODES:
  0  success
  1  a pipeline stage failed
  2  usage error
  3  a required external program is missing
  4  an external program timed out

REQUIREMENTS:
  magick (ImageMagick 7), pandoc, xelatex and pdfcrop (TeX Live) on PATH,
  or pointed at with --magick/--pandoc/--xelatex/--pdfcrop.

ENVIRONMENT VARIABLES:
  Every option can be set with a PHOTOCITE_* variable (see --help).
  RUST_LOG overrides the log filter.
"#;

/// Append a typeset citation caption below an image.
#[derive(Parser, Debug)]
#[command(
    name = "photocite",
    version,
    about = "Append a typeset citation caption below an image",
    long_about = "Render a Markdown citation with Pandoc and XeLaTeX, crop it, rasterise it at \
the photo's resolution and append it below the photo with ImageMagick. In citation-only mode \
(-co) the caption is written on its own.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source image (standard mode), or citation file / text (citation-only mode).
    image: Option<String>,

    /// Citation text in Markdown (standard mode).
    citation_text: Option<String>,

    /// Generate only the citation image (also accepted as -co).
    #[arg(long = "citation-only", env = "PHOTOCITE_CITATION_ONLY")]
    citation_only: bool,

    /// Custom LaTeX template for Pandoc.
    #[arg(
        short = 't',
        long = "template",
        visible_short_alias = 'l',
        visible_alias = "latex",
        env = "PHOTOCITE_TEMPLATE"
    )]
    template: Option<PathBuf>,

    /// Output file path.
    #[arg(short, long, env = "PHOTOCITE_OUTPUT")]
    output: Option<PathBuf>,

    /// Read the citation from this Markdown file.
    #[arg(short, long, env = "PHOTOCITE_CITE")]
    cite: Option<PathBuf>,

    /// Keep temporary files and log every command.
    #[arg(short, long, env = "PHOTOCITE_DEBUG")]
    debug: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PHOTOCITE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PHOTOCITE_QUIET")]
    quiet: bool,

    /// Print the result as JSON on stdout.
    #[arg(long, env = "PHOTOCITE_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PHOTOCITE_NO_PROGRESS")]
    no_progress: bool,

    /// Print the image's size, DPI and quality, then exit.
    #[arg(long)]
    inspect_only: bool,

    /// Per-tool timeout in seconds.
    #[arg(long, env = "PHOTOCITE_TIMEOUT", default_value_t = 120,
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// White gap between photo and caption, in pixels.
    #[arg(long, env = "PHOTOCITE_CAPTION_GAP", default_value_t = 0)]
    caption_gap: u32,

    /// Margin around the cropped caption, in points.
    #[arg(long, env = "PHOTOCITE_CROP_MARGIN", default_value_t = 20)]
    crop_margin: u32,

    /// Caption DPI in citation-only mode (1–2400).
    #[arg(long, env = "PHOTOCITE_DPI",
          value_parser = clap::value_parser!(u32).range(1..=2400))]
    dpi: Option<u32>,

    /// Maximum caption width in citation-only mode, in pixels.
    #[arg(long, env = "PHOTOCITE_MAX_WIDTH",
          value_parser = clap::value_parser!(u32).range(1..))]
    max_width: Option<u32>,

    /// ImageMagick 7 executable.
    #[arg(long, env = "PHOTOCITE_MAGICK", default_value = "magick")]
    magick: PathBuf,

    /// Pandoc executable.
    #[arg(long, env = "PHOTOCITE_PANDOC", default_value = "pandoc")]
    pandoc: PathBuf,

    /// XeLaTeX executable.
    #[arg(long, env = "PHOTOCITE_XELATEX", default_value = "xelatex")]
    xelatex: PathBuf,

    /// pdfcrop executable.
    #[arg(long, env = "PHOTOCITE_PDFCROP", default_value = "pdfcrop")]
    pdfcrop: PathBuf,
}

/// Accept the two-letter `-co` short flag by rewriting it before parsing.
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut seen_terminator = false;
    args.into_iter()
        .map(|arg| {
            if seen_terminator {
                return arg;
            }
            if arg == "--" {
                seen_terminator = true;
                arg
            } else if arg == "-co" {
                OsString::from("--citation-only")
            } else {
                arg
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", red("✘"));
            ExitCode::from(exit_code(&e))
        }
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PhotociteError>())
        .map_or(1, PhotociteError::exit_code)
}

async fn run(cli: Cli) -> Result<()> {
    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs are hidden while the spinner runs; it already shows
    // every stage.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && io::stderr().is_terminal();
    let filter = if cli.verbose || cli.debug {
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
        let config = build_config(&cli, None)?;
        let image = cli
            .image
            .as_deref()
            .ok_or_else(|| PhotociteError::Usage("--inspect-only needs an image argument.".into()))?;
        let source = inspect(image, &config)
            .await
            .context("Failed to inspect image")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&source).context("Failed to serialize image info")?
            );
        } else {
            println!("File:     {}", source.path.display());
            println!("Format:   {}", source.format);
            println!("Size:     {}x{} px", source.width, source.height);
            println!("Density:  {:.0}x{:.0} DPI", source.dpi_x, source.dpi_y);
            match source.quality {
                Some(q) => println!("Quality:  {q}"),
                None => println!("Quality:  n/a"),
            }
        }
        return Ok(());
    }

    // ── Resolve the request ──────────────────────────────────────────────
    let request = resolve_request(RequestArgs {
        citation_only: cli.citation_only,
        image: cli.image.clone(),
        citation_text: cli.citation_text.clone(),
        cite: cli.cite.clone(),
        output: cli.output.clone(),
        template: cli.template.clone(),
        piped: read_piped_stdin()?,
    })?;

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ComposeProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = compose(&request, &config)
        .await
        .context("Composition failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    }
    if !cli.quiet {
        eprintln!("{} {}", green("✔"), output.confirmation());
        if !cli.json {
            eprintln!(
                "   {}  {}",
                bold(&format!("{}x{} px", output.width, output.height)),
                dim(&format!("{}ms total", output.stats.total_duration_ms)),
            );
        }
    }

    Ok(())
}

/// Text piped on stdin, if stdin is not a terminal.
fn read_piped_stdin() -> Result<Option<String>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut text = String::new();
    stdin
        .lock()
        .read_to_string(&mut text)
        .context("Failed to read citation from stdin")?;
    Ok(Some(text))
}

/// Map CLI args to `ComposeConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ComposeConfig> {
    let mut builder = ComposeConfig::builder()
        .tool_timeout_secs(cli.timeout)
        .caption_gap(cli.caption_gap)
        .crop_margin(cli.crop_margin)
        .keep_scratch(cli.debug)
        .tools(ToolPaths {
            magick: cli.magick.clone(),
            pandoc: cli.pandoc.clone(),
            xelatex: cli.xelatex.clone(),
            pdfcrop: cli.pdfcrop.clone(),
        });

    if let Some(dpi) = cli.dpi {
        builder = builder.citation_only_dpi(dpi);
    }
    if let Some(width) = cli.max_width {
        builder = builder.max_caption_width(width);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(normalize_args(args.iter().map(OsString::from)))
            .expect("arguments should parse")
    }

    #[test]
    fn co_short_flag_is_citation_only() {
        let cli = parse(&["photocite", "-co", "crane.md"]);
        assert!(cli.citation_only);
        assert_eq!(cli.image.as_deref(), Some("crane.md"));
    }

    #[test]
    fn co_after_terminator_is_positional() {
        let cli = parse(&["photocite", "crane.jpg", "--", "-co"]);
        assert!(!cli.citation_only);
        assert_eq!(cli.citation_text.as_deref(), Some("-co"));
    }

    #[test]
    fn latex_alias_sets_template() {
        let cli = parse(&["photocite", "-l", "t.latex", "crane.jpg"]);
        assert_eq!(cli.template, Some(PathBuf::from("t.latex")));
        let cli = parse(&["photocite", "--latex", "u.latex", "crane.jpg"]);
        assert_eq!(cli.template, Some(PathBuf::from("u.latex")));
    }

    #[test]
    fn standard_positionals() {
        let cli = parse(&["photocite", "-o", "out.jpg", "crane.jpg", "Photo: *crane*"]);
        assert_eq!(cli.image.as_deref(), Some("crane.jpg"));
        assert_eq!(cli.citation_text.as_deref(), Some("Photo: *crane*"));
        assert_eq!(cli.output, Some(PathBuf::from("out.jpg")));
        assert_eq!(cli.timeout, 120);
        assert_eq!(cli.magick, PathBuf::from("magick"));
    }

    #[test]
    fn exit_codes_follow_error_kind() {
        let usage = anyhow::Error::new(PhotociteError::Usage("x".into()));
        assert_eq!(exit_code(&usage), 2);

        let missing = anyhow::Error::new(PhotociteError::ToolNotFound {
            program: "pdfcrop".into(),
            hint: String::new(),
        })
        .context("Composition failed");
        assert_eq!(exit_code(&missing), 3);

        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }
}
