use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use super::{Connection, HopExpansion, PageStore};

/// Everything the graph builder needs for one center page. Bundled so the
/// builder never runs against partially fetched data.
#[derive(Clone, Debug)]
pub struct ConnectionData {
    pub center_id: String,
    pub center_title: String,
    pub incoming: Vec<Connection>,
    pub outgoing: Vec<Connection>,
    pub hops: HopExpansion,
    pub related: Vec<Connection>,
}

/// Result of one background fetch. `generation` is compared against the
/// controller's current generation on receipt; mismatches are stale
/// (the center page changed while the fetch was in flight) and dropped.
pub struct FetchResult {
    pub generation: u64,
    pub page_id: String,
    pub outcome: Result<ConnectionData, String>,
}

pub fn spawn_fetch(
    store: Arc<PageStore>,
    page_id: String,
    viewer: Option<String>,
    generation: u64,
) -> Receiver<FetchResult> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let outcome = fetch_connections(&store, &page_id, viewer.as_deref());
        let _ = tx.send(FetchResult {
            generation,
            page_id,
            outcome,
        });
    });

    rx
}

/// The base incoming/outgoing fetch must succeed; hop-expansion and
/// related-page failures degrade to empty lists so the 1-hop graph still
/// renders.
fn fetch_connections(
    store: &PageStore,
    page_id: &str,
    viewer: Option<&str>,
) -> Result<ConnectionData, String> {
    let center_title = store
        .page_title(page_id)
        .ok_or_else(|| format!("unknown page id {page_id}"))?
        .to_owned();

    let incoming = store.incoming(page_id).map_err(|error| error.to_string())?;
    let outgoing = store.outgoing(page_id).map_err(|error| error.to_string())?;

    let hops = store.hop_expansion(page_id).unwrap_or_else(|error| {
        log::warn!("hop expansion failed for {page_id}: {error}");
        HopExpansion::default()
    });

    let related = store.related(page_id, viewer).unwrap_or_else(|error| {
        log::warn!("related-page lookup failed for {page_id}: {error}");
        Vec::new()
    });

    Ok(ConnectionData {
        center_id: page_id.to_owned(),
        center_title,
        incoming,
        outgoing,
        hops,
        related,
    })
}
