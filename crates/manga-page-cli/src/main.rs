use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use globset::{Glob, GlobSet, GlobSetBuilder};
use image::{DynamicImage, Rgb};
use indicatif::{ProgressBar, ProgressStyle};
use manga_page_core::pipeline::{FrameOutcome, FrameReport};
use manga_page_core::{
    ComposeOptions, MangaError, PageConfig, QualityGate, Style, compose_with,
    generate_layout_with, layout_to_json, page_output_to_json, parse_color, reports_to_json,
    stylize_path, synthesize_page_from_paths_with,
};
use serde::Deserialize;
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "manga-page",
    about = "Screen video frames and compose them into a manga page",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --no-progress or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the quality gate over frames and print a verdict per file
    Check(CheckArgs),
    /// Stylize each frame into an output directory
    Stylize(StylizeArgs),
    /// Generate panel geometry only and export it as JSON
    Layout(LayoutArgs),
    /// Full pipeline: screen, stylize, lay out and compose one page
    Page(PageArgs),
}

#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// Input file or directory
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// YAML config file path (overrides command-line options it sets)
    #[arg(long, help_heading = "Config")]
    config: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Config")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Config")]
    print_config_format: String,

    // Quality
    /// Minimum Laplacian variance for a frame to count as sharp
    #[arg(long, default_value_t = 100.0, help_heading = "Quality")]
    blur_threshold: f64,
    /// Minimum mean luminance (0..=255)
    #[arg(long, default_value_t = 50.0, help_heading = "Quality")]
    brightness_threshold: f64,

    // Layout
    /// Page width
    #[arg(long, default_value_t = 1000, help_heading = "Layout")]
    width: u32,
    /// Page height
    #[arg(long, default_value_t = 1400, help_heading = "Layout")]
    height: u32,
    /// Seed for a reproducible layout (random when omitted)
    #[arg(long, help_heading = "Layout")]
    seed: Option<u64>,
    /// Standard deviation of the split ratio around 0.5
    #[arg(long, default_value_t = 0.1, help_heading = "Layout")]
    split_std_dev: f64,
    /// Margin shaved off every panel side
    #[arg(long, default_value_t = 10, help_heading = "Layout")]
    margin: u32,
    /// Lower clamp for the split ratio (upper is 1 - value)
    #[arg(long, default_value_t = 0.3, help_heading = "Layout")]
    min_split_ratio: f64,

    // Page
    /// Style: a|line_art, b|cel_shade, c|edge_preserve
    #[arg(long, default_value = "line_art", help_heading = "Page")]
    style: String,
    /// Upper bound on panels; accepted frames are sampled evenly
    #[arg(long, help_heading = "Page")]
    max_panels: Option<usize>,
    /// Page background: white|black|gray|#rrggbb|#rgb
    #[arg(long, default_value = "white", help_heading = "Page")]
    background: String,
    /// Draw red panel outlines (debug)
    #[arg(long, default_value_t = false, help_heading = "Page")]
    outlines: bool,
    /// Screen and stylize in parallel (requires core feature `parallel`)
    #[arg(long, default_value_t = false, help_heading = "Page")]
    parallel: bool,
}

#[derive(Args, Debug, Clone)]
struct CheckArgs {
    #[command(flatten)]
    input: InputArgs,
    #[command(flatten)]
    config: ConfigArgs,
    /// Print verdicts as a JSON array instead of one line per file
    #[arg(long, default_value_t = false, help_heading = "Export")]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct StylizeArgs {
    #[command(flatten)]
    input: InputArgs,
    #[command(flatten)]
    config: ConfigArgs,
    /// Output directory
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct LayoutArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Number of panels
    #[arg(short = 'n', long, default_value_t = 8, help_heading = "Layout")]
    panels: usize,
    /// Write the layout JSON here instead of stdout
    #[arg(short, long, help_heading = "Export")]
    out: Option<PathBuf>,
    /// Also render a blank preview page with outlined panels
    #[arg(long, help_heading = "Export")]
    preview: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct PageArgs {
    #[command(flatten)]
    input: InputArgs,
    #[command(flatten)]
    config: ConfigArgs,
    /// Output page image (format from extension)
    #[arg(short, long, default_value = "page.png", help_heading = "Input/Output")]
    out: PathBuf,
    /// Export a JSON report (layout, placement, verdicts) to this file
    #[arg(long, help_heading = "Export")]
    report: Option<PathBuf>,
    /// Dry run: run the pipeline and print stats but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    let show_progress = cli.progress && !cli.quiet;
    match &cli.command {
        Commands::Check(args) => run_check(args, show_progress),
        Commands::Stylize(args) => run_stylize(args, show_progress),
        Commands::Layout(args) => run_layout(args),
        Commands::Page(args) => run_page(args, show_progress),
    }
}

/// Builds the page config from CLI values, then applies the YAML file on top.
/// Returns `None` when `--print-config` was handled.
fn resolve_config(args: &ConfigArgs) -> anyhow::Result<Option<PageConfig>> {
    let mut cfg = PageConfig::builder()
        .with_page_dimensions(args.width, args.height)
        .blur_threshold(args.blur_threshold)
        .brightness_threshold(args.brightness_threshold)
        .seed(args.seed)
        .split_std_dev(args.split_std_dev)
        .margin(args.margin)
        .min_split_ratio(args.min_split_ratio)
        .style(args.style.parse()?)
        .max_panels(args.max_panels)
        .background(parse_color(&args.background)?)
        .outlines(args.outlines)
        .parallel(args.parallel)
        .build();

    if let Some(path) = &args.config {
        let file = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg = y.into_page_config(cfg)?;
    }
    cfg.validate()?;

    if args.print_config {
        match args.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(None);
    }
    Ok(Some(cfg))
}

fn run_check(args: &CheckArgs, show_progress: bool) -> anyhow::Result<()> {
    let Some(cfg) = resolve_config(&args.config)? else {
        return Ok(());
    };
    let paths = gather_paths(&args.input.input, &args.input.include, &args.input.exclude)?;
    let gate = QualityGate::new(cfg.quality.clone());
    let bar = progress_bar(paths.len(), "checking", show_progress);

    let mut rows = Vec::with_capacity(paths.len());
    let mut usable = 0usize;
    for p in &paths {
        if let Some(b) = &bar {
            b.set_message(file_label(p));
        }
        let key = path_key(p);
        let row = match gate.check_path(p) {
            Ok(v) => {
                if v.is_usable {
                    usable += 1;
                }
                if !args.json {
                    println!("{}: {}", key, v.reason);
                }
                serde_json::json!({"path": key, "verdict": v})
            }
            Err(e) => {
                error!(path = %p.display(), error = %e, "check failed");
                serde_json::json!({"path": key, "error": e.to_string()})
            }
        };
        rows.push(row);
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    }
    info!(total = paths.len(), usable, "quality check done");
    Ok(())
}

fn run_stylize(args: &StylizeArgs, show_progress: bool) -> anyhow::Result<()> {
    let Some(cfg) = resolve_config(&args.config)? else {
        return Ok(());
    };
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create out_dir {}", args.out_dir.display()))?;
    let paths = gather_paths(&args.input.input, &args.input.include, &args.input.exclude)?;
    let bar = progress_bar(paths.len(), "stylizing", show_progress);

    let start = Instant::now();
    let mut written = 0usize;
    for p in &paths {
        if let Some(b) = &bar {
            b.set_message(file_label(p));
        }
        let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or("frame");
        let out = args
            .out_dir
            .join(format!("{}_{}.png", stem, cfg.style.name()));
        match stylize_path(cfg.style, p, Some(out.as_path())) {
            Ok(_) => written += 1,
            Err(e) => error!(path = %p.display(), error = %e, "skip image"),
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    info!(
        total = paths.len(),
        written,
        style = cfg.style.name(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "stylize done"
    );
    Ok(())
}

fn run_layout(args: &LayoutArgs) -> anyhow::Result<()> {
    let Some(cfg) = resolve_config(&args.config)? else {
        return Ok(());
    };
    let mut layout = cfg.layout.clone();
    layout.panel_count = args.panels;
    let panels = generate_layout_with(&layout)?;
    let value = layout_to_json(&panels, layout.page_width, layout.page_height);
    let text = serde_json::to_string_pretty(&value)?;
    match &args.out {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
            info!(?path, panels = panels.len(), "layout exported");
        }
        None => println!("{}", text),
    }

    if let Some(path) = &args.preview {
        let blank: Vec<DynamicImage> = panels
            .iter()
            .map(|_| DynamicImage::ImageRgb8(image::RgbImage::from_pixel(1, 1, Rgb([220, 220, 220]))))
            .collect();
        let opts = ComposeOptions {
            background: Rgb(cfg.background),
            outline: Some(Rgb([255, 0, 0])),
        };
        let page = compose_with(&blank, &panels, layout.page_width, layout.page_height, &opts)?;
        page.save(path)
            .with_context(|| format!("write {}", path.display()))?;
        info!(?path, "layout preview written");
    }
    Ok(())
}

fn run_page(args: &PageArgs, show_progress: bool) -> anyhow::Result<()> {
    let Some(cfg) = resolve_config(&args.config)? else {
        return Ok(());
    };
    let paths = gather_paths(&args.input.input, &args.input.include, &args.input.exclude)?;
    let bar = progress_bar(paths.len(), "loading", show_progress);

    let start = Instant::now();
    let result = synthesize_page_from_paths_with(&paths, &cfg, |p| {
        if let Some(b) = &bar {
            b.set_message(file_label(p));
            b.inc(1);
        }
    });
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    let out = match result {
        Ok(out) => out,
        Err(MangaError::Empty { reports }) => {
            for r in &reports {
                println!("{}: {}", r.key, outcome_label(r));
            }
            if let Some(report) = args.report.as_ref().filter(|_| !args.dry_run) {
                let value = serde_json::json!({ "frames": reports_to_json(&reports) });
                fs::write(report, serde_json::to_string_pretty(&value)?)
                    .with_context(|| format!("write {}", report.display()))?;
                info!(?report, "report exported");
            }
            anyhow::bail!("no usable frames among {} inputs", reports.len());
        }
        Err(e) => return Err(anyhow::Error::new(e).context("compose page")),
    };
    let stats = out.stats();
    info!(
        panels = stats.num_panels,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "page composed"
    );

    if args.dry_run {
        println!("{}", stats.summary());
        for r in &out.reports {
            println!("{}: {}", r.key, outcome_label(r));
        }
        return Ok(());
    }

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }
    out.page
        .save(&args.out)
        .with_context(|| format!("write {}", args.out.display()))?;
    info!(path = ?args.out, "page written");

    if let Some(report) = &args.report {
        let value = page_output_to_json(&out);
        fs::write(report, serde_json::to_string_pretty(&value)?)
            .with_context(|| format!("write {}", report.display()))?;
        info!(?report, "report exported");
    }
    Ok(())
}

fn outcome_label(r: &FrameReport) -> String {
    match &r.outcome {
        FrameOutcome::Accepted(v) if r.placed => format!("placed, {}", v.reason),
        FrameOutcome::Accepted(v) => format!("accepted (not placed), {}", v.reason),
        FrameOutcome::Rejected(v) => format!("rejected, {}", v.reason),
        FrameOutcome::Failed { error } => format!("failed, {}", error),
    }
}

fn gather_paths(
    path: &Path,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let inc_set = build_globset(include)?;
    let exc_set = build_globset(exclude)?;
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) && is_image(path) {
            list.push(path.to_path_buf());
        }
    } else {
        for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    // frame order follows file names
    list.sort();
    if list.is_empty() {
        warn!(path = %path.display(), "no input images found");
    }
    Ok(list)
}

fn build_globset(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat).with_context(|| format!("invalid glob {pat}"))?);
    }
    Ok(Some(b.build()?))
}

fn should_skip(p: &Path, include: Option<&GlobSet>, exclude: Option<&GlobSet>) -> bool {
    let s = path_key(p);
    if let Some(ex) = exclude {
        if ex.is_match(&s) {
            return true;
        }
    }
    if let Some(inc) = include {
        if !inc.is_match(&s) {
            return true;
        }
    }
    false
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg")
    )
}

fn path_key(p: &Path) -> String {
    p.to_string_lossy().replace('\\', "/")
}

fn file_label(p: &Path) -> String {
    p.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string()
}

fn progress_bar(len: usize, verb: &str, enabled: bool) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }
    let b = ProgressBar::new(len as u64);
    let template = format!("{{spinner:.green}} {verb} {{pos}}/{{len}} [{{elapsed_precise}}] {{wide_msg}}");
    if let Ok(style) = ProgressStyle::with_template(&template) {
        b.set_style(style);
    }
    Some(b)
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

/// YAML override file. Every field is optional; set fields replace the
/// command-line value.
#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    page_width: Option<u32>,
    page_height: Option<u32>,
    seed: Option<u64>,
    split_std_dev: Option<f64>,
    margin: Option<u32>,
    min_split_ratio: Option<f64>,
    blur_threshold: Option<f64>,
    brightness_threshold: Option<f64>,
    style: Option<String>,
    max_panels: Option<usize>,
    background: Option<String>,
    panel_outlines: Option<bool>,
    parallel: Option<bool>,
}

impl YamlConfig {
    fn into_page_config(self, mut cfg: PageConfig) -> anyhow::Result<PageConfig> {
        if let Some(v) = self.page_width {
            cfg.layout.page_width = v;
        }
        if let Some(v) = self.page_height {
            cfg.layout.page_height = v;
        }
        if let Some(v) = self.seed {
            cfg.layout.seed = Some(v);
        }
        if let Some(v) = self.split_std_dev {
            cfg.layout.split_std_dev = v;
        }
        if let Some(v) = self.margin {
            cfg.layout.margin = v;
        }
        if let Some(v) = self.min_split_ratio {
            cfg.layout.min_split_ratio = v;
        }
        if let Some(v) = self.blur_threshold {
            cfg.quality.blur_threshold = v;
        }
        if let Some(v) = self.brightness_threshold {
            cfg.quality.brightness_threshold = v;
        }
        if let Some(v) = self.style {
            cfg.style = v.parse::<Style>()?;
        }
        if let Some(v) = self.max_panels {
            cfg.max_panels = Some(v);
        }
        if let Some(v) = self.background {
            cfg.background = parse_color(&v)?;
        }
        if let Some(v) = self.panel_outlines {
            cfg.panel_outlines = v;
        }
        if let Some(v) = self.parallel {
            cfg.parallel = v;
        }
        Ok(cfg)
    }
}
