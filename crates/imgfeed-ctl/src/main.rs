use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

use imgfeed_core::{refresh, store::SdkStore, AppConfig, Dispatcher, Manifest, ObjectStore, PriorManifest};

#[derive(Parser)]
#[command(name = "imgfeed-ctl", version)]
struct Cli {
    /// Path to imgfeed.toml (defaults to $IMGFEED_CONFIG, then ./imgfeed.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild and publish the image manifest once.
    ///
    /// Refreshes must not overlap: run at most one at a time per manifest key.
    Refresh,
    /// Print the currently published manifest
    Show,
    /// Upload a single file under the watch root, as the watcher would
    Upload(UploadArgs),
}

#[derive(Args, Debug, Clone)]
struct UploadArgs {
    /// File to upload; must live under [watch].root
    path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let cfg = AppConfig::load(&cfg_path)?;
    let store = SdkStore::new(cfg.s3.clone()).await?;
    match cli.command {
        Command::Refresh => refresh_once(&store, &cfg).await?,
        Command::Show => show(&store, &cfg).await?,
        Command::Upload(args) => upload(&store, &cfg, args).await?,
    }
    Ok(())
}

async fn refresh_once(store: &dyn ObjectStore, cfg: &AppConfig) -> Result<()> {
    let manifest_cfg = cfg.manifest()?;
    let report = refresh::run(store, manifest_cfg).await?;
    println!(
        "Updated {} with {} images ({} added, {} dropped; previous manifest {})",
        manifest_cfg.key,
        report.manifest.len(),
        report.added,
        report.dropped,
        report.prior
    );
    Ok(())
}

async fn show(store: &dyn ObjectStore, cfg: &AppConfig) -> Result<()> {
    let key = &cfg.manifest()?.key;
    let manifest: Manifest = match refresh::load_prior(store, key).await? {
        PriorManifest::Loaded(m) => m,
        PriorManifest::Missing => anyhow::bail!("{key} does not exist yet"),
        PriorManifest::Corrupt(reason) => anyhow::bail!("{key} is not a valid manifest: {reason}"),
    };
    println!("{}", serde_json::to_string_pretty(&manifest)?);
    Ok(())
}

async fn upload(store: &dyn ObjectStore, cfg: &AppConfig, args: UploadArgs) -> Result<()> {
    let watch = cfg.watch()?;
    if !watch.extensions.matches_path(&args.path) {
        anyhow::bail!("{} is not an image file", args.path.display());
    }
    let dispatcher = Dispatcher::new(store, &watch.root, &watch.dest_prefix);
    let up = dispatcher
        .upload(&args.path)
        .await
        .with_context(|| format!("uploading {}", args.path.display()))?;
    println!("Uploaded {} to {} with Content-Type: {}", args.path.display(), up.key, up.content_type);
    Ok(())
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,aws_config=warn,aws_smithy_runtime=warn".to_string());
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
