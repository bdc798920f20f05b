use anyhow::Context;
use std::path::Path;
use tracing::{error, info, warn, Level};

use imgfeed_core::{config::WatchConfig, store::SdkStore, AppConfig, Dispatcher};

mod scan;
mod stability;
use scan::Scanner;
use stability::{wait_for_stable, Stability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cfg_path = AppConfig::default_path();
    let cfg = AppConfig::load(&cfg_path)?;
    let watch = cfg.watch().context("imgfeed-watcher needs a [watch] section")?.clone();

    let store = SdkStore::new(cfg.s3.clone()).await?;
    info!(bucket = %cfg.s3.bucket, "ObjectStore=SDK initialized");

    let dispatcher = Dispatcher::new(&store, &watch.root, &watch.dest_prefix);
    let mut scanner = Scanner::new(&watch.root, watch.extensions.clone());
    info!(root = %watch.root.display(), prefix = %watch.dest_prefix, "monitoring folder (including subfolders)");

    let mut ticker = tokio::time::interval(watch.scan_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            res = &mut shutdown => {
                if let Err(e) = res { warn!(error = %e, "failed to listen for ctrl-c"); }
                info!("shutting down");
                break;
            }
        }
        for path in scanner.scan() {
            process(&dispatcher, &watch, &path).await;
        }
    }
    Ok(())
}

/// Wait for one new file to settle and upload it. Failures are logged and
/// never stop the loop.
async fn process(dispatcher: &Dispatcher<'_>, watch: &WatchConfig, path: &Path) {
    if let Stability::TimedOut = wait_for_stable(path, watch.stability_timeout(), watch.poll_interval()).await {
        info!(path = %path.display(), "uploading without a stable size");
    }
    match dispatcher.upload(path).await {
        Ok(up) => info!(key = %up.key, content_type = up.content_type, bytes = up.bytes, "upload complete"),
        Err(e) => error!(path = %path.display(), error = %e, "upload failed"),
    }
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,aws_config=warn,aws_smithy_runtime=warn".to_string());
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(env_filter)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgfeed_core::ExtensionSet;
    use imgfeed_mem::MemStore;
    use std::fs;

    fn watch_config(root: &Path) -> WatchConfig {
        WatchConfig {
            root: root.to_path_buf(),
            dest_prefix: "cam/".into(),
            stability_timeout_ms: 3_000,
            poll_interval_ms: 1_000,
            scan_interval_ms: 1_000,
            extensions: ExtensionSet::default(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn new_file_is_uploaded_under_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemStore::new();
        let watch = watch_config(dir.path());
        let dispatcher = Dispatcher::new(&store, dir.path(), "cam/");
        let mut scanner = Scanner::new(dir.path(), ExtensionSet::default());

        fs::create_dir_all(dir.path().join("2025")).unwrap();
        fs::write(dir.path().join("2025/img 1.png"), b"png-bytes").unwrap();
        for path in scanner.scan() {
            process(&dispatcher, &watch, &path).await;
        }

        let obj = store.object("cam/2025/img 1.png").expect("uploaded");
        assert_eq!(obj.content_type, "image/png");
        assert_eq!(&obj.body[..], b"png-bytes");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_upload_does_not_stop_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemStore::new();
        let watch = watch_config(dir.path());
        let dispatcher = Dispatcher::new(&store, dir.path(), "cam/");
        let mut scanner = Scanner::new(dir.path(), ExtensionSet::default());

        fs::write(dir.path().join("a.jpg"), b"a").unwrap();
        fs::write(dir.path().join("b.jpg"), b"b").unwrap();
        let created = scanner.scan();
        assert_eq!(created.len(), 2);

        // First file vanishes before upload; the second still goes through.
        fs::remove_file(&created[0]).unwrap();
        for path in &created {
            process(&dispatcher, &watch, path).await;
        }
        assert_eq!(store.keys(), vec!["cam/b.jpg".to_string()]);
    }
}
