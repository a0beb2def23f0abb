use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser, ValueEnum};
use dialoguer::Select;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[cfg(feature = "server")]
use gitlanes::serve::{ServeArgs, run_serve};
use gitlanes::svg::render_svg;
use gitlanes::{AppConfig, ApproxMetrics, FilterConfig, GitHistory, GraphLayout, Theme, ViewState};

const DEFAULT_OUTPUT_STEM: &str = "graph";
const LOG_ENV: &str = "GITLANES_LOG";

#[derive(Debug, Clone)]
enum OutputDestination {
    Stdout,
    File(PathBuf),
}

#[derive(Debug, Parser)]
#[command(
    name = "gitlanes",
    about = "Render a repository's history as a horizontal, lane-based commit graph."
)]
pub struct RenderArgs {
    /// Repository to read; any path inside the work tree works.
    #[arg(short = 'r', long = "repo", default_value = ".")]
    repo: PathBuf,

    /// Path to the output file. Use '-' to write to stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Output format (defaults to the output file extension or svg).
    #[arg(short = 'e', long = "output-format")]
    output_format: Option<OutputFormat>,

    /// Convenience flag to force PNG output without specifying --output-format.
    #[arg(long = "png", action = ArgAction::SetTrue, conflicts_with = "output_format")]
    png: bool,

    /// Scale factor when rasterizing PNG output.
    #[arg(long = "scale", default_value_t = 2.0)]
    scale: f32,

    /// Only show history reachable from this branch (case-insensitive).
    #[arg(long = "branch", conflicts_with = "pick_branch")]
    branch: Option<String>,

    /// Only show commits carrying this tag.
    #[arg(long = "tag")]
    tag: Option<String>,

    /// Only show commits by this author (case-insensitive).
    #[arg(long = "author")]
    author: Option<String>,

    /// Only show commits whose message contains this text (case-insensitive).
    #[arg(long = "message")]
    message: Option<String>,

    /// Maximum number of commits to draw.
    #[arg(long = "max-commits")]
    max_commits: Option<usize>,

    /// Maximum number of local branches to start from.
    #[arg(long = "max-branches")]
    max_branches: Option<usize>,

    /// Choose the branch filter interactively.
    #[arg(long = "pick-branch", action = ArgAction::SetTrue)]
    pick_branch: bool,

    /// Colour theme.
    #[arg(long = "theme", value_enum)]
    theme: Option<Theme>,

    /// Background color for the rendered graph.
    #[arg(short = 'b', long = "background")]
    background: Option<String>,

    /// JSON config file; defaults to the per-user config.
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Suppress informational output.
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,

    /// Log debug output to stderr.
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    verbose: bool,
}

impl RenderArgs {
    /// Command-line filters win over the config file.
    fn filters(&self, base: FilterConfig) -> FilterConfig {
        FilterConfig {
            branch: self.branch.clone().or(base.branch),
            tag: self.tag.clone().or(base.tag),
            author: self.author.clone().or(base.author),
            message: self.message.clone().or(base.message),
            max_commits: self.max_commits.unwrap_or(base.max_commits),
            max_branches: self.max_branches.unwrap_or(base.max_branches),
        }
        .normalized()
    }
}

#[derive(Debug, Parser)]
#[command(name = "gitlanes list", about = "List branches, tags or authors usable as filters.")]
pub struct ListArgs {
    /// What to list.
    #[arg(value_enum)]
    kind: ListKind,

    /// Repository to read; any path inside the work tree works.
    #[arg(short = 'r', long = "repo", default_value = ".")]
    repo: PathBuf,

    /// Number of commits scanned for authors (at least 1000).
    #[arg(long = "max-commits")]
    max_commits: Option<usize>,

    /// Log debug output to stderr.
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum ListKind {
    Branches,
    Tags,
    Authors,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Svg,
    Png,
}

impl OutputFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
        {
            Some(ext) if ext == "svg" => Some(OutputFormat::Svg),
            Some(ext) if ext == "png" => Some(OutputFormat::Png),
            _ => None,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("gitlanes=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

fn select_branch(history: &GitHistory) -> Result<Option<String>> {
    let branches = history.list_branches()?;
    if branches.is_empty() {
        return Ok(None);
    }

    let mut options = vec!["(all branches)".to_string()];
    options.extend(branches.iter().cloned());

    let selection = Select::new()
        .with_prompt("Select branch to draw")
        .items(&options)
        .default(0)
        .interact()
        .context("branch selection was cancelled")?;

    Ok(selection
        .checked_sub(1)
        .and_then(|idx| branches.get(idx).cloned()))
}

fn run_render(cli: RenderArgs) -> Result<()> {
    init_logging(cli.verbose);

    let config = AppConfig::load(cli.config.as_deref())?;
    let format_preference = if cli.png {
        Some(OutputFormat::Png)
    } else {
        cli.output_format
    };

    let output_dest = parse_output(cli.output.as_deref(), format_preference)?;
    let format = determine_format(format_preference, &output_dest)?;

    if format == OutputFormat::Png && cli.scale <= 0.0 {
        bail!("--scale must be greater than zero for PNG output");
    }

    let history = GitHistory::open(&cli.repo)
        .with_context(|| format!("failed to open repository at '{}'", cli.repo.display()))?;

    let mut filters = cli.filters(config.filters.clone());
    if cli.pick_branch {
        filters.branch = select_branch(&history)?;
    }
    filters.validate()?;

    let loaded = history.load_commits(&filters)?;
    info!(status = %loaded.status, "history loaded");
    let status = loaded.status.clone();

    let layout = GraphLayout::build(loaded.commits, loaded.refs, config.layout);
    let theme = cli.theme.unwrap_or(config.theme);
    let background = cli.background.clone().or(config.background.clone());
    let measure = ApproxMetrics::default();

    let output_bytes = match format {
        OutputFormat::Svg => render_svg(
            &layout,
            &ViewState::default(),
            theme,
            background.as_deref(),
            &measure,
        )?
        .into_bytes(),
        OutputFormat::Png => {
            let view = ViewState {
                scale: cli.scale,
                ..ViewState::default()
            };
            render_png_bytes(&layout, &view, theme, background.as_deref(), &measure)?
        }
    };

    write_output(output_dest, &output_bytes, &status, cli.quiet)?;

    Ok(())
}

#[cfg(feature = "png")]
fn render_png_bytes(
    layout: &GraphLayout,
    view: &ViewState,
    theme: Theme,
    background: Option<&str>,
    measure: &ApproxMetrics,
) -> Result<Vec<u8>> {
    gitlanes::svg::render_png(layout, view, theme, background, measure)
}

#[cfg(not(feature = "png"))]
fn render_png_bytes(
    _layout: &GraphLayout,
    _view: &ViewState,
    _theme: Theme,
    _background: Option<&str>,
    _measure: &ApproxMetrics,
) -> Result<Vec<u8>> {
    Err(anyhow!("PNG output requires the 'png' feature to be enabled"))
}

fn run_list(args: ListArgs) -> Result<()> {
    init_logging(args.verbose);

    let history = GitHistory::open(&args.repo)
        .with_context(|| format!("failed to open repository at '{}'", args.repo.display()))?;

    let names = match args.kind {
        ListKind::Branches => history.list_branches()?,
        ListKind::Tags => history.list_tags()?,
        ListKind::Authors => {
            let mut filters = FilterConfig::default();
            if let Some(max) = args.max_commits {
                filters.max_commits = max;
            }
            history.list_authors(filters.author_scan_limit())?
        }
    };

    let mut stdout = io::stdout().lock();
    for name in names {
        writeln!(stdout, "{name}")?;
    }
    stdout.flush()?;
    Ok(())
}

fn subcommand_args(args: &[String]) -> impl Iterator<Item = String> + '_ {
    std::iter::once(args[0].clone()).chain(args.iter().skip(2).cloned())
}

#[cfg(feature = "server")]
pub async fn dispatch() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        Some("serve") => {
            let serve_args = ServeArgs::parse_from(subcommand_args(&args));
            init_logging(serve_args.verbose);
            run_serve(serve_args).await
        }
        Some("list") => run_list(ListArgs::parse_from(subcommand_args(&args))),
        Some("render") => run_render(RenderArgs::parse_from(subcommand_args(&args))),
        _ => run_render(RenderArgs::parse_from(args)),
    }
}

#[cfg(not(feature = "server"))]
pub fn dispatch_sync() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        Some("serve") => Err(anyhow!(
            "'serve' command requires the 'server' feature to be enabled"
        )),
        Some("list") => run_list(ListArgs::parse_from(subcommand_args(&args))),
        Some("render") => run_render(RenderArgs::parse_from(subcommand_args(&args))),
        _ => run_render(RenderArgs::parse_from(args)),
    }
}

fn parse_output(
    output: Option<&str>,
    format_hint: Option<OutputFormat>,
) -> Result<OutputDestination> {
    match output {
        Some("-") => Ok(OutputDestination::Stdout),
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(anyhow!(
                        "output directory '{}' does not exist",
                        parent.display()
                    ));
                }
            }
            Ok(OutputDestination::File(path))
        }
        None => {
            let ext = format_hint.unwrap_or(OutputFormat::Svg).extension();
            Ok(OutputDestination::File(PathBuf::from(format!(
                "{DEFAULT_OUTPUT_STEM}.{ext}"
            ))))
        }
    }
}

fn determine_format(
    preference: Option<OutputFormat>,
    output: &OutputDestination,
) -> Result<OutputFormat> {
    if let Some(fmt) = preference {
        return Ok(fmt);
    }

    match output {
        OutputDestination::Stdout => Ok(OutputFormat::Svg),
        OutputDestination::File(path) => OutputFormat::from_path(path).ok_or_else(|| {
            anyhow!(
                "unable to determine output format from '{}'; please specify --output-format",
                path.display()
            )
        }),
    }
}

fn write_output(dest: OutputDestination, bytes: &[u8], status: &str, quiet: bool) -> Result<()> {
    match dest {
        OutputDestination::Stdout => {
            let mut stdout = io::stdout();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
        OutputDestination::File(path) => {
            fs::write(&path, bytes)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            if !quiet {
                println!("{status}");
                println!("Generated graph -> {}", path.display());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_follows_format() {
        match parse_output(None, Some(OutputFormat::Png)).unwrap() {
            OutputDestination::File(path) => assert_eq!(path, PathBuf::from("graph.png")),
            OutputDestination::Stdout => panic!("expected a file"),
        }
        let dest = parse_output(None, None).unwrap();
        assert_eq!(determine_format(None, &dest).unwrap(), OutputFormat::Svg);
    }

    #[test]
    fn unknown_extension_needs_explicit_format() {
        let dest = parse_output(Some("graph.txt"), None).unwrap();
        assert!(determine_format(None, &dest).is_err());
        assert_eq!(
            determine_format(Some(OutputFormat::Png), &dest).unwrap(),
            OutputFormat::Png
        );
    }

    #[test]
    fn cli_filters_override_config() {
        let cli = RenderArgs::parse_from(["gitlanes", "--author", " Ada ", "--max-commits", "7"]);
        let base = FilterConfig {
            branch: Some("main".into()),
            author: Some("Grace".into()),
            ..FilterConfig::default()
        };
        let filters = cli.filters(base);

        assert_eq!(filters.branch.as_deref(), Some("main"));
        assert_eq!(filters.author.as_deref(), Some("Ada"));
        assert_eq!(filters.max_commits, 7);
    }
}
