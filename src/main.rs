mod app;
mod data;
mod graph;
mod util;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::Parser;

use data::PageStore;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to the page dataset (JSON list of pages with links).
    #[arg(long)]
    data: PathBuf,
    /// Center page id; defaults to the first page in the dataset.
    #[arg(long)]
    page: Option<String>,
    /// Viewing user; their own pages are excluded from related results.
    #[arg(long)]
    viewer: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let store = Arc::new(PageStore::load(&args.data)?);
    let page_id = match args.page {
        Some(page) => page,
        None => store
            .first_page_id()
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("page dataset has no pages"))?,
    };
    if store.page_title(&page_id).is_none() {
        return Err(anyhow!("page id {page_id} not present in dataset"));
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 860.0]),
        ..Default::default()
    };

    let viewer = args.viewer;
    eframe::run_native(
        "linkgraph",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(app::LinkGraphApp::new(store, page_id, viewer)))
        }),
    )
    .map_err(|error| anyhow!("failed to launch ui: {error}"))
}
