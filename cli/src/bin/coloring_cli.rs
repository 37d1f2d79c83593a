use clap::{Parser, Subcommand};
use coloring::{
    BoundaryMask, ColoringSession, CommandScript, FillStatus, PageArtwork, Rgb, SessionConfig, VectorizeOptions,
    ExportProgress, export_pages,
    io::raster::{clean_illustration_bytes, encode_png},
};
use coloring_cli::{PageManifest, PageSource, carry_through, load_pages, page_file_name};
use color_eyre::eyre::{Result, eyre};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Threshold a generated illustration into pure black-and-white line art
    Clean {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Write the fill boundary mask of a page as a black/white PNG
    Mask {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Flood fill one region of a page and write the composite
    Fill {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short = 'x', long)]
        x: f64,
        #[arg(short = 'y', long)]
        y: f64,
        /// Fill color as #RRGGBB
        #[arg(short, long)]
        color: Rgb,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Trace a page into an SVG document
    Vectorize {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Upscale factor applied before thresholding
        #[arg(long, default_value = "2.0")]
        scale: f32,
        /// Luminance cutoff; darker pixels become ink
        #[arg(long, default_value = "200")]
        threshold: u8,
    },
    /// Replay a JSON or TOML command script against a page
    Run {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        script: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Session configuration (.toml or .json); studio defaults otherwise
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Vectorize a batch of pages, falling back to PNG for pages that fail
    Export {
        /// Directory receiving page-N.svg / page-N.png
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Page manifest (.toml or .json) listing pages and options
        #[arg(short, long, conflicts_with = "pages")]
        manifest: Option<PathBuf>,
        pages: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Clean { input, output } => clean(&input, &output)?,
        Commands::Mask { input, output } => write_mask(&input, &output)?,
        Commands::Fill { input, x, y, color, output } => fill(&input, x, y, color, &output).await?,
        Commands::Vectorize { input, output, scale, threshold } => {
            let options = VectorizeOptions { scale, threshold, ..VectorizeOptions::default() };
            options.validate()?;
            vectorize(&input, &output, options).await?
        }
        Commands::Run { input, script, output, config } => {
            run_script(&input, &script, &output, config.as_deref()).await?
        }
        Commands::Export { output_dir, manifest, pages } => {
            export(output_dir, manifest.as_deref(), pages).await?
        }
    }

    Ok(())
}

fn clean(input: &Path, output: &Path) -> Result<()> {
    let bytes = std::fs::read(input)?;
    std::fs::write(output, clean_illustration_bytes(&bytes))?;
    info!("Cleaned {:?} -> {:?}", input, output);
    Ok(())
}

fn write_mask(input: &Path, output: &Path) -> Result<()> {
    let page = image::open(input)?.to_rgba8();
    let mask = BoundaryMask::from_line_art(&page);
    mask.to_image().save(output)?;
    info!(walls = mask.wall_count(), total = mask.len(), "Wrote mask to {:?}", output);
    Ok(())
}

async fn fill(input: &Path, x: f64, y: f64, color: Rgb, output: &Path) -> Result<()> {
    let mut session = ColoringSession::new(SessionConfig::studio())?;
    session.open_page(image::open(input)?.to_rgba8())?;

    match session.fill(x, y, color).await? {
        Some(FillStatus::Applied) => info!("Filled region at ({x}, {y}) with {color}"),
        Some(FillStatus::Failed(message)) => return Err(eyre!("fill failed: {message}")),
        status => warn!(?status, "Fill left the page unchanged"),
    }

    std::fs::write(output, session.export_png()?)?;
    info!("Wrote {:?}", output);
    Ok(())
}

async fn vectorize(input: &Path, output: &Path, options: VectorizeOptions) -> Result<()> {
    let page = image::open(input)?.to_rgba8();
    let outcome = tokio::task::spawn_blocking(move || coloring::vectorize(&page, &options)).await?;
    let elapsed = outcome.elapsed;

    let document = outcome
        .into_document()
        .ok_or_else(|| eyre!("tracing produced no usable paths for {:?}", input))?;
    document.save_svg(output)?;
    info!(paths = document.paths.len(), ?elapsed, "Wrote {:?}", output);
    Ok(())
}

async fn run_script(input: &Path, script: &Path, output: &Path, config: Option<&Path>) -> Result<()> {
    let config = match config {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::studio(),
    };
    let script = CommandScript::from_file(script)?;

    let mut session = ColoringSession::new(config)?;
    session.open_page(image::open(input)?.to_rgba8())?;
    let changed = session.run_script(&script).await?;
    info!(
        commands = script.commands.len(),
        changed,
        history = session.history().len(),
        "Script finished"
    );

    std::fs::write(output, session.export_png()?)?;
    info!("Wrote {:?}", output);
    Ok(())
}

async fn export(output_dir: Option<PathBuf>, manifest: Option<&Path>, pages: Vec<PathBuf>) -> Result<()> {
    let (output_dir, pages, options) = match manifest {
        Some(path) => {
            let manifest = PageManifest::from_file(path)?;
            if let Some(title) = &manifest.title {
                info!("Exporting '{}'", title);
            }
            let dir = output_dir.unwrap_or_else(|| PathBuf::from(&manifest.output_dir));
            (dir, manifest.page_paths(), manifest.vectorize)
        }
        None => {
            if pages.is_empty() {
                return Err(eyre!("no pages given; pass page images or --manifest"));
            }
            let dir = output_dir.ok_or_else(|| eyre!("--output-dir is required without a manifest"))?;
            (dir, pages, VectorizeOptions::default())
        }
    };

    std::fs::create_dir_all(&output_dir)?;
    let mut decoded = Vec::new();
    let mut images = Vec::new();
    for (index, source) in load_pages(&pages).into_iter().enumerate() {
        match source {
            PageSource::Decoded(image) => {
                decoded.push(index);
                images.push(image);
            }
            PageSource::Unreadable { path, reason } => {
                match carry_through(&path, &output_dir, index)? {
                    Some(target) => warn!(%reason, "Page {} copied unchanged to {:?}", index + 1, target),
                    None => warn!(%reason, "Page {} skipped", index + 1),
                }
            }
        }
    }
    if images.is_empty() {
        warn!("No page could be decoded; nothing to vectorize");
        return Ok(());
    }

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<ExportProgress>();
    let reporter = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            info!("Export progress: page {}/{} ({}%)", progress.page, progress.total, progress.percent);
        }
    });

    let artwork = export_pages(images, options, Some(progress_tx)).await;
    reporter.await?;

    for (&index, page) in decoded.iter().zip(&artwork) {
        let target = output_dir.join(page_file_name(index, page.is_vector()));
        match page {
            PageArtwork::Vector(document) => document.save_svg(&target)?,
            PageArtwork::Raster(raster) => {
                warn!("Page {} could not be traced; writing raster fallback", index + 1);
                std::fs::write(&target, encode_png(raster)?)?;
            }
        }
    }

    info!("✅ Exported {} of {} pages to {:?}", artwork.len(), pages.len(), output_dir);
    Ok(())
}
