use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "scenegen", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose synthetic scenes with per-instance annotation masks.
    Compose(ComposeArgs),
    /// Extract foreground cut-outs from chroma-keyed source photos.
    Extract(ExtractArgs),
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Composer configuration JSON.
    #[arg(long = "config")]
    config_path: PathBuf,

    /// Override the configured RNG seed.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Asset tree root containing a Classes/ folder of source photos.
    #[arg(long = "data-dir")]
    data_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Compose(args) => cmd_compose(args),
        Command::Extract(args) => cmd_extract(args),
    }
}

fn read_config_json(path: &Path) -> anyhow::Result<scenegen::ComposerConfig> {
    let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
    let r = BufReader::new(f);
    let config: scenegen::ComposerConfig =
        serde_json::from_reader(r).with_context(|| "parse config JSON")?;
    Ok(config)
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let mut config = read_config_json(&args.config_path)?;
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    config.validate()?;

    let store = scenegen::AssetStore::open(&config.asset_dir)?;
    let compositor = scenegen::Compositor::new(config, store)?;
    let report = compositor.run()?;

    eprintln!(
        "wrote {} scene(s), {} failed",
        report.scenes_written, report.scenes_failed
    );
    if report.scenes_failed > 0 {
        anyhow::bail!("{} scene(s) failed", report.scenes_failed);
    }
    Ok(())
}

fn cmd_extract(args: ExtractArgs) -> anyhow::Result<()> {
    scenegen::layout::ensure_tree(&args.data_dir, &scenegen::layout::INPUT_FOLDERS)?;
    let written = scenegen::chroma::extract_class_tree(&args.data_dir)?;
    eprintln!("extracted {written} foreground(s)");
    Ok(())
}
