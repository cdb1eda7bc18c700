use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use serde::Deserialize;

pub mod fetch;

/// Raw link primitive handed to the graph builder. One entry per page
/// reachable from (or similar to) the center page.
#[derive(Clone, Debug, PartialEq)]
pub struct Connection {
    pub id: String,
    pub title: String,
    pub username: Option<String>,
    pub last_modified: Option<String>,
    pub is_public: Option<bool>,
}

/// A second- or third-hop connection together with the previous-hop page
/// ids that evidence it. The builder links each entry to the first `via`
/// parent it already placed, so graph shape is deterministic.
#[derive(Clone, Debug)]
pub struct HopConnection {
    pub connection: Connection,
    pub via: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct HopExpansion {
    pub second_hop: Vec<HopConnection>,
    pub third_hop: Vec<HopConnection>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default, rename = "lastModified")]
    last_modified: Option<String>,
    #[serde(default, rename = "isPublic")]
    is_public: Option<bool>,
    #[serde(default)]
    links: Vec<String>,
}

#[derive(Clone, Debug)]
struct PageRecord {
    id: String,
    title: String,
    username: Option<String>,
    last_modified: Option<String>,
    is_public: Option<bool>,
    links: Vec<String>,
    backlinks: Vec<String>,
}

impl PageRecord {
    fn connection(&self) -> Connection {
        Connection {
            id: self.id.clone(),
            title: self.title.clone(),
            username: self.username.clone(),
            last_modified: self.last_modified.clone(),
            is_public: self.is_public,
        }
    }
}

/// In-process stand-in for the link-data and related-pages services: a
/// page dataset loaded from JSON with a derived reverse-link index.
pub struct PageStore {
    pages: HashMap<String, PageRecord>,
    order: Vec<String>,
}

impl PageStore {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read page dataset {}", path.display()))?;
        let pages: Vec<RawPage> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse page dataset {}", path.display()))?;
        Self::from_raw(pages)
    }

    fn from_raw(raw_pages: Vec<RawPage>) -> Result<Self> {
        let mut pages = HashMap::with_capacity(raw_pages.len());
        let mut order = Vec::with_capacity(raw_pages.len());

        for raw in raw_pages {
            if raw.id.is_empty() || raw.title.is_empty() {
                log::warn!("dropping page record with missing id or title");
                continue;
            }

            let id = raw.id;
            let mut links = raw
                .links
                .into_iter()
                .filter(|target| !target.is_empty() && target != &id)
                .collect::<Vec<_>>();
            let mut seen = HashSet::new();
            links.retain(|target| seen.insert(target.clone()));

            if pages
                .insert(
                    id.clone(),
                    PageRecord {
                        id: id.clone(),
                        title: raw.title,
                        username: raw.username,
                        last_modified: raw.last_modified,
                        is_public: raw.is_public,
                        links,
                        backlinks: Vec::new(),
                    },
                )
                .is_none()
            {
                order.push(id);
            }
        }

        if pages.is_empty() {
            return Err(anyhow!("page dataset contains no usable pages"));
        }

        // Reverse index, in dataset order so incoming() is deterministic.
        let mut backlink_pairs = Vec::new();
        for source_id in &order {
            let Some(record) = pages.get(source_id) else {
                continue;
            };
            for target_id in &record.links {
                if pages.contains_key(target_id) {
                    backlink_pairs.push((target_id.clone(), source_id.clone()));
                }
            }
        }
        for (target_id, source_id) in backlink_pairs {
            if let Some(record) = pages.get_mut(&target_id) {
                record.backlinks.push(source_id);
            }
        }

        Ok(Self { pages, order })
    }

    pub fn first_page_id(&self) -> Option<&str> {
        self.order.first().map(String::as_str)
    }

    pub fn page_title(&self, page_id: &str) -> Option<&str> {
        self.pages.get(page_id).map(|record| record.title.as_str())
    }

    /// Pages that link to `page_id`.
    pub fn incoming(&self, page_id: &str) -> Result<Vec<Connection>> {
        let record = self.record(page_id)?;
        Ok(record
            .backlinks
            .iter()
            .filter_map(|source_id| self.pages.get(source_id))
            .map(PageRecord::connection)
            .collect())
    }

    /// Pages that `page_id` links to; unknown targets are dropped.
    pub fn outgoing(&self, page_id: &str) -> Result<Vec<Connection>> {
        let record = self.record(page_id)?;
        Ok(record
            .links
            .iter()
            .filter_map(|target_id| self.pages.get(target_id))
            .map(PageRecord::connection)
            .collect())
    }

    /// Breadth-first expansion to hops 2 and 3 over the undirected link
    /// relation. Every entry carries the previous-hop parents that reach
    /// it, so the builder never has to guess an attachment point.
    pub fn hop_expansion(&self, page_id: &str) -> Result<HopExpansion> {
        let center = self.record(page_id)?;

        let mut hop1 = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(center.id.as_str());
        for neighbor_id in center.backlinks.iter().chain(center.links.iter()) {
            if self.pages.contains_key(neighbor_id.as_str()) && seen.insert(neighbor_id.as_str()) {
                hop1.push(neighbor_id.as_str());
            }
        }

        let second_hop = self.expand_one_hop(&hop1, &mut seen);
        let second_ids = second_hop
            .iter()
            .map(|entry| entry.connection.id.as_str())
            .collect::<Vec<_>>();
        let third_hop = self.expand_one_hop(&second_ids, &mut seen);

        Ok(HopExpansion {
            second_hop,
            third_hop,
        })
    }

    fn expand_one_hop<'a>(
        &'a self,
        frontier: &[&str],
        seen: &mut HashSet<&'a str>,
    ) -> Vec<HopConnection> {
        let mut expanded: Vec<HopConnection> = Vec::new();
        let mut index_by_id = HashMap::new();

        for &parent_id in frontier {
            let Some(parent) = self.pages.get(parent_id) else {
                continue;
            };

            for neighbor_id in parent.backlinks.iter().chain(parent.links.iter()) {
                let Some(neighbor) = self.pages.get(neighbor_id.as_str()) else {
                    continue;
                };

                if let Some(&existing) = index_by_id.get(neighbor_id.as_str()) {
                    let entry: &mut HopConnection = &mut expanded[existing];
                    if !entry.via.iter().any(|via| via == parent_id) {
                        entry.via.push(parent_id.to_owned());
                    }
                    continue;
                }

                if !seen.insert(neighbor.id.as_str()) {
                    continue;
                }

                index_by_id.insert(neighbor.id.as_str(), expanded.len());
                expanded.push(HopConnection {
                    connection: neighbor.connection(),
                    via: vec![parent_id.to_owned()],
                });
            }
        }

        expanded
    }

    /// Content-similar pages ranked by title similarity, best first. The
    /// center page and pages authored by `exclude_username` are omitted.
    pub fn related(&self, page_id: &str, exclude_username: Option<&str>) -> Result<Vec<Connection>> {
        let center = self.record(page_id)?;
        let matcher = SkimMatcherV2::default();

        let mut scored = self
            .order
            .iter()
            .filter(|candidate_id| candidate_id.as_str() != page_id)
            .filter_map(|candidate_id| self.pages.get(candidate_id))
            .filter(|candidate| {
                match (exclude_username, candidate.username.as_deref()) {
                    (Some(viewer), Some(author)) => viewer != author,
                    _ => true,
                }
            })
            .filter_map(|candidate| {
                title_similarity(&matcher, &center.title, &candidate.title)
                    .map(|score| (score, candidate))
            })
            .collect::<Vec<_>>();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        Ok(scored
            .into_iter()
            .map(|(_score, record)| record.connection())
            .collect())
    }

    fn record(&self, page_id: &str) -> Result<&PageRecord> {
        self.pages
            .get(page_id)
            .ok_or_else(|| anyhow!("unknown page id {page_id}"))
    }
}

fn title_similarity(matcher: &SkimMatcherV2, center_title: &str, candidate: &str) -> Option<i64> {
    // Score every center-title token against the candidate and keep the
    // sum; a single shared word is enough to count as related.
    let mut total = 0i64;
    let mut matched = false;
    for token in center_title.split_whitespace() {
        if token.chars().count() < 3 {
            continue;
        }
        if let Some(score) = matcher
            .fuzzy_match(candidate, token)
            .or_else(|| matcher.fuzzy_match(&candidate.to_ascii_lowercase(), &token.to_ascii_lowercase()))
        {
            total += score;
            matched = true;
        }
    }
    matched.then_some(total)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn store_from_json(json: &str) -> PageStore {
        let raw: Vec<RawPage> = serde_json::from_str(json).expect("valid test dataset");
        PageStore::from_raw(raw).expect("non-empty test dataset")
    }

    pub(crate) fn sample_store() -> PageStore {
        store_from_json(
            r#"[
                {"id": "center", "title": "Garden Planning", "username": "ana", "links": ["a", "b"]},
                {"id": "a", "title": "Soil Basics", "username": "ana", "links": ["center", "c"]},
                {"id": "b", "title": "Composting", "username": "lee", "links": ["d"]},
                {"id": "c", "title": "Worms", "username": "lee", "links": ["e"]},
                {"id": "d", "title": "Mulch", "links": []},
                {"id": "e", "title": "Deep Soil Chemistry", "links": []},
                {"id": "r1", "title": "Garden Tools", "username": "lee", "links": []},
                {"id": "r2", "title": "Planning a Trip", "username": "ana", "links": []}
            ]"#,
        )
    }

    #[test]
    fn incoming_and_outgoing_follow_the_link_index() {
        let store = sample_store();

        let outgoing = store.outgoing("center").unwrap();
        assert_eq!(
            outgoing.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );

        let incoming = store.incoming("center").unwrap();
        assert_eq!(
            incoming.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            vec!["a"]
        );
    }

    #[test]
    fn hop_expansion_reports_parent_evidence() {
        let store = sample_store();
        let hops = store.hop_expansion("center").unwrap();

        let second_ids = hops
            .second_hop
            .iter()
            .map(|entry| entry.connection.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(second_ids, vec!["c", "d"]);

        let c_entry = &hops.second_hop[0];
        assert_eq!(c_entry.via, vec!["a".to_owned()]);

        let third_ids = hops
            .third_hop
            .iter()
            .map(|entry| entry.connection.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(third_ids, vec!["e"]);
        assert_eq!(hops.third_hop[0].via, vec!["c".to_owned()]);
    }

    #[test]
    fn related_excludes_viewer_authored_pages() {
        let store = sample_store();

        let related = store.related("center", Some("ana")).unwrap();
        assert!(related.iter().all(|c| c.username.as_deref() != Some("ana")));
        assert!(related.iter().any(|c| c.id == "r1"));

        let unfiltered = store.related("center", None).unwrap();
        assert!(unfiltered.iter().any(|c| c.id == "r2"));
    }

    #[test]
    fn malformed_records_are_dropped_not_fatal() {
        let store = store_from_json(
            r#"[
                {"id": "ok", "title": "Fine", "links": ["missing-title"]},
                {"id": "missing-title", "title": "", "links": []},
                {"title": "No Id", "links": []}
            ]"#,
        );

        assert_eq!(store.first_page_id(), Some("ok"));
        assert!(store.outgoing("ok").unwrap().is_empty());
    }

    #[test]
    fn unknown_page_is_an_error() {
        let store = sample_store();
        assert!(store.incoming("nope").is_err());
    }
}
