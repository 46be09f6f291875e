use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use mf_core::{FilterSession, InsertedNode, PageProfile};

use crate::page::{read_catalog, read_config, FilePage};

pub struct WatchOptions {
    pub page_path: String,
    pub config_path: Option<String>,
    pub catalog_path: Option<String>,
    pub poll_ms: u64,
}

pub fn run_watch(opts: WatchOptions) -> Result<(), String> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    runtime.block_on(run_watch_async(opts))
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Poll the capture file and config for changes, driving a session the way
/// the content script does with DOM mutations and storage updates.
async fn run_watch_async(opts: WatchOptions) -> Result<(), String> {
    let catalog = read_catalog(opts.catalog_path.as_deref());
    let config = read_config(opts.config_path.as_deref())?;

    let page_path = PathBuf::from(&opts.page_path);
    let config_path = opts.config_path.as_ref().map(PathBuf::from);

    let mut session = FilterSession::new(catalog, config, PageProfile::default());
    let mut page = FilePage::new(page_path.clone());

    let started = Instant::now();
    let now_ms = || started.elapsed().as_millis() as u64;

    let mut page_mtime = modified(&page_path);
    let mut config_mtime = config_path.as_deref().and_then(modified);

    session.start(now_ms());
    println!("Watching '{}' (Ctrl-C to stop)", page_path.display());

    let mut poll = tokio::time::interval(Duration::from_millis(opts.poll_ms.max(10)));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!("Stopped");
                return Ok(());
            }
            _ = poll.tick() => {}
        }

        let now = now_ms();

        if let Some(path) = config_path.as_deref() {
            let current = modified(path);
            if current != config_mtime {
                config_mtime = current;
                match read_config(path.to_str()) {
                    Ok(config) => session.update_config(now, config, &mut page),
                    Err(e) => log::warn!("Keeping previous filters: {}", e),
                }
            }
        }

        let current = modified(&page_path);
        if current != page_mtime {
            page_mtime = current;
            let changed = InsertedNode::element(Vec::<String>::new()).with_candidate_inside();
            session.on_insertions(now, &[changed]);
        }

        if let Some(report) = session.tick(now, &mut page) {
            if session.config().enabled {
                println!(
                    "[{:>7}ms] {} of {} markets filtered",
                    now, report.hidden_count, report.scanned
                );
            } else {
                println!("[{:>7}ms] filters disabled, {} markets restored", now, report.scanned);
            }
            if report.scanned == 0 && session.next_deadline().is_none() {
                println!("[{:>7}ms] no market cards found", now);
            }
        }
    }
}
