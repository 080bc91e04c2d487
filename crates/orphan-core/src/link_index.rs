use crate::error::{ExtractionError, StoreError};
use crate::link_name::LinkName;
use crate::link_parser::extract_link_names;
use dashmap::DashMap;
use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use tokio::sync::watch;

/// Outcome of a bulk rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    pub indexed: usize,
    pub failed: usize,
}

/// Document id -> set of link names found in that document's content.
///
/// Each value-set is replaced wholesale on update, never merged. Orphans are
/// derived at query time and never cached here, because target existence
/// changes without any index mutation.
///
/// Every mutation bumps a generation counter published on a `watch` channel;
/// subscribers re-derive the orphan list when it changes.
pub struct LinkIndex {
    entries: DashMap<String, HashSet<LinkName>>,
    generation: watch::Sender<u64>,
}

impl LinkIndex {
    pub fn new() -> Self {
        let (generation, _rx) = watch::channel(0);
        Self {
            entries: DashMap::new(),
            generation,
        }
    }

    /// Populate the index from `(id, content)` pairs.
    ///
    /// A failed read is logged and skipped; that document keeps whatever entry
    /// it had before. The whole batch emits a single refresh notification.
    pub fn initialize<I>(&self, documents: I) -> RebuildReport
    where
        I: IntoIterator<Item = (String, Result<String, StoreError>)>,
    {
        let mut report = RebuildReport::default();
        for (id, content) in documents {
            match content {
                Ok(content) => {
                    let links = extract_link_names(&content);
                    self.entries.insert(id, links);
                    report.indexed += 1;
                }
                Err(source) => {
                    let err = ExtractionError { id, source };
                    tracing::warn!("{}", err);
                    report.failed += 1;
                }
            }
        }
        tracing::info!(
            "Link index initialized: {} documents indexed, {} skipped",
            report.indexed,
            report.failed
        );
        self.notify_changed();
        report
    }

    /// Replace the link set for `id` with the links found in `content`.
    /// Acts as an insert for documents not indexed yet.
    pub fn upsert(&self, id: &str, content: &str) {
        let links = extract_link_names(content);
        tracing::debug!("Doc {}: {} link(s)", id, links.len());
        self.entries.insert(id.to_string(), links);
        self.notify_changed();
    }

    /// Drop the entry for `id`. Returns whether an entry existed.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.entries.remove(id).is_some();
        self.notify_changed();
        removed
    }

    /// Move the link set of `old_id` to `new_id`.
    ///
    /// No-op (returns false) when `old_id` is not indexed; no empty entry is
    /// created for `new_id` in that case.
    pub fn rename(&self, old_id: &str, new_id: &str) -> bool {
        let moved = match self.entries.remove(old_id) {
            Some((_, links)) => {
                self.entries.insert(new_id.to_string(), links);
                true
            }
            None => false,
        };
        self.notify_changed();
        moved
    }

    /// Sorted, deduplicated link names for which `exists` reports no target.
    ///
    /// `exists` must apply the resolution policy itself (see
    /// [`crate::doc_resolver`]). Its first error aborts the query. The name
    /// set is snapshotted before the first check, so no map guard is held
    /// while `exists` is pending.
    pub async fn orphans<F, Fut, E>(&self, mut exists: F) -> Result<Vec<LinkName>, E>
    where
        F: FnMut(LinkName) -> Fut,
        Fut: Future<Output = Result<bool, E>>,
    {
        let mut orphans = Vec::new();
        for name in self.link_names() {
            if !exists(name.clone()).await? {
                orphans.push(name);
            }
        }
        Ok(orphans)
    }

    /// Union of every indexed link set, sorted.
    pub fn link_names(&self) -> BTreeSet<LinkName> {
        self.entries
            .iter()
            .flat_map(|entry| entry.value().iter().cloned().collect::<Vec<_>>())
            .collect()
    }

    pub fn links_for(&self, id: &str) -> Option<HashSet<LinkName>> {
        self.entries.get(id).map(|links| links.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Sorted ids of all indexed documents.
    pub fn document_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry. Called on shutdown.
    pub fn clear(&self) {
        self.entries.clear();
        self.notify_changed();
    }

    /// Signal subscribers without changing any entry, e.g. when a link
    /// target appeared in the store.
    pub fn touch(&self) {
        self.notify_changed();
    }

    /// Receive a new generation number after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    fn notify_changed(&self) {
        self.generation.send_modify(|generation| *generation += 1);
    }
}

impl Default for LinkIndex {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc_resolver::resolve_with;
    use std::convert::Infallible;
    use std::future::{ready, Ready};

    /// Existence check over a fixed set of ids, with the `.md` suffix convention.
    fn exists_in<'a>(
        ids: &'a [&'a str],
    ) -> impl FnMut(LinkName) -> Ready<Result<bool, Infallible>> + 'a {
        move |name: LinkName| {
            let resolved =
                resolve_with(name.as_str(), "md", |id| Ok::<bool, Infallible>(ids.contains(&id)));
            ready(resolved.map(|target| target.is_some()))
        }
    }

    fn link_set(names: &[&str]) -> HashSet<LinkName> {
        names.iter().map(|n| LinkName::from(*n)).collect()
    }

    // === upsert tests ===

    #[test]
    fn upsert_inserts_new_document() {
        let index = LinkIndex::new();
        index.upsert("A.md", "[[X]] and [[Y|alias]]");
        assert_eq!(index.links_for("A.md"), Some(link_set(&["X", "Y"])));
    }

    #[test]
    fn upsert_twice_with_same_content_is_idempotent() {
        let index = LinkIndex::new();
        index.upsert("A.md", "[[X]] [[Y]]");
        let first = index.links_for("A.md");
        index.upsert("A.md", "[[X]] [[Y]]");
        assert_eq!(index.links_for("A.md"), first);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn upsert_replaces_instead_of_merging() {
        let index = LinkIndex::new();
        index.upsert("A.md", "[[A]]");
        index.upsert("A.md", "[[B]]");
        assert_eq!(index.links_for("A.md"), Some(link_set(&["B"])));
    }

    #[test]
    fn upsert_with_no_links_keeps_empty_entry() {
        let index = LinkIndex::new();
        index.upsert("A.md", "[[A]]");
        index.upsert("A.md", "nothing here");
        assert!(index.contains("A.md"));
        assert_eq!(index.links_for("A.md"), Some(HashSet::new()));
    }

    // === remove / rename tests ===

    #[tokio::test]
    async fn remove_drops_entry_and_ignores_unknown() {
        let index = LinkIndex::new();
        index.upsert("A.md", "[[X]]");
        assert!(index.remove("A.md"));
        assert!(!index.remove("A.md"));
        assert!(index.is_empty());
        assert_eq!(index.orphans(exists_in(&[])).await.unwrap(), Vec::<LinkName>::new());
    }

    #[test]
    fn rename_moves_links_and_drops_old_key() {
        let index = LinkIndex::new();
        index.upsert("id1", "[[X]]");
        assert!(index.rename("id1", "id2"));
        assert!(!index.contains("id1"));
        assert_eq!(index.links_for("id2"), Some(link_set(&["X"])));
    }

    #[test]
    fn rename_of_unknown_key_does_not_fabricate_entry() {
        let index = LinkIndex::new();
        assert!(!index.rename("ghost.md", "other.md"));
        assert!(!index.contains("other.md"));
        assert!(index.is_empty());
    }

    #[test]
    fn rename_onto_existing_key_replaces_it() {
        let index = LinkIndex::new();
        index.upsert("old.md", "[[Keep]]");
        index.upsert("new.md", "[[Lose]]");
        index.rename("old.md", "new.md");
        assert_eq!(index.links_for("new.md"), Some(link_set(&["Keep"])));
        assert_eq!(index.len(), 1);
    }

    // === initialize tests ===

    #[test]
    fn initialize_empty_store_yields_empty_index() {
        let index = LinkIndex::new();
        let report = index.initialize(Vec::new());
        assert_eq!(report, RebuildReport::default());
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn initialize_isolates_failed_documents() {
        let index = LinkIndex::new();
        index.upsert("broken.md", "[[Stale]]");
        let report = index.initialize(vec![
            (
                "broken.md".to_string(),
                Err(StoreError::io("broken.md", std::io::Error::other("unreadable"))),
            ),
            ("good.md".to_string(), Ok("[[Fresh]]".to_string())),
        ]);
        assert_eq!(report, RebuildReport { indexed: 1, failed: 1 });
        // Prior entry stays stale, the good document still shows up.
        assert_eq!(index.links_for("broken.md"), Some(link_set(&["Stale"])));
        assert_eq!(
            index.orphans(exists_in(&[])).await.unwrap(),
            vec!["Fresh", "Stale"]
        );
    }

    // === orphans tests ===

    #[tokio::test]
    async fn orphans_apply_suffix_convention() {
        let index = LinkIndex::new();
        index.upsert("A.md", "[[Target]] [[Exact.png]] [[Missing]]");
        let orphans = index.orphans(exists_in(&["Target.md", "Exact.png"])).await.unwrap();
        assert_eq!(orphans, vec!["Missing"]);
    }

    #[tokio::test]
    async fn orphans_sorted_case_sensitively() {
        let index = LinkIndex::new();
        index.upsert("A.md", "[[zeta]] [[alpha]] [[Beta]]");
        assert_eq!(
            index.orphans(exists_in(&[])).await.unwrap(),
            vec!["Beta", "alpha", "zeta"]
        );
    }

    #[tokio::test]
    async fn orphans_deduplicate_across_documents() {
        let index = LinkIndex::new();
        index.upsert("A.md", "[[Ghost]]");
        index.upsert("B.md", "[[Ghost]] [[Other]]");
        assert_eq!(index.orphans(exists_in(&[])).await.unwrap(), vec!["Ghost", "Other"]);
    }

    #[tokio::test]
    async fn orphans_propagate_existence_errors() {
        let index = LinkIndex::new();
        index.upsert("A.md", "[[X]]");
        let result: Result<Vec<LinkName>, &str> =
            index.orphans(|_: LinkName| ready(Err("store offline"))).await;
        assert_eq!(result, Err("store offline"));
    }

    // === refresh notification tests ===

    #[tokio::test]
    async fn every_mutation_bumps_generation() {
        let index = LinkIndex::new();
        let mut rx = index.subscribe();
        let start = *rx.borrow_and_update();

        index.upsert("A.md", "[[X]]");
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), start + 1);

        index.rename("A.md", "B.md");
        index.remove("B.md");
        index.clear();
        assert_eq!(*rx.borrow_and_update(), start + 4);
        assert_eq!(index.generation(), start + 4);
    }

    #[tokio::test]
    async fn touch_signals_without_changing_entries() {
        let index = LinkIndex::new();
        index.upsert("A.md", "[[X]]");
        let mut rx = index.subscribe();
        rx.borrow_and_update();

        index.touch();
        assert!(rx.has_changed().unwrap());
        assert_eq!(index.links_for("A.md"), Some(link_set(&["X"])));
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn subscriber_wakes_on_upsert() {
        let index = std::sync::Arc::new(LinkIndex::new());
        let mut rx = index.subscribe();
        let writer = index.clone();
        tokio::spawn(async move {
            writer.upsert("A.md", "[[X]]");
        });
        rx.changed().await.unwrap();
        assert!(index.contains("A.md"));
    }
}
