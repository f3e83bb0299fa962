// The `apply` orchestration façade: a public, builder-style options struct
// (`EngineConfig`) threaded through a stateful entry point (`Engine`) that
// owns the text-map cache.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Mutex, OnceLock};

use crate::anchor::Anchor;
use crate::applicator::apply_ranges;
use crate::dom::{build_text_map_with_marker, parse, remove_highlights, serialize_children, DEFAULT_MARKER_TAG};
use crate::overlap::eliminate_overlaps;
use crate::resolver::{resolve, ResolverConfig};
use crate::text_map::TextMap;

/// Engine configuration: the marker tag, the cache's capacity, and the
/// resolver's three acceptance thresholds.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub marker_tag: String,
    pub cache_capacity: usize,
    pub dom_path_threshold: f64,
    pub text_position_threshold: f64,
    pub context_search_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            marker_tag: DEFAULT_MARKER_TAG.to_string(),
            cache_capacity: 20,
            dom_path_threshold: 0.9,
            text_position_threshold: 0.7,
            context_search_threshold: 0.5,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_marker_tag(mut self, tag: impl Into<String>) -> Self {
        self.marker_tag = tag.into();
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            dom_path_threshold: self.dom_path_threshold,
            text_position_threshold: self.text_position_threshold,
            context_search_threshold: self.context_search_threshold,
        }
    }
}

/// The outcome of one `apply` call.
///
/// Not `Debug`: `text_map` may hold a `TextMap`, whose records embed
/// `markup5ever_rcdom::Handle` values that don't implement it.
#[derive(Clone)]
pub struct HighlightResult {
    pub html: String,
    pub applied: usize,
    /// Preserves input order.
    pub orphaned_ids: Vec<String>,
    pub text_map: Option<Rc<TextMap>>,
    pub total: usize,
}

impl HighlightResult {
    pub fn orphaned_count(&self) -> usize {
        self.orphaned_ids.len()
    }

    pub fn all_applied(&self) -> bool {
        self.orphaned_ids.is_empty() && self.applied == self.total
    }
}

/// Engine state: the process-local (or caller-owned) text-map cache, keyed
/// by `article_id`. Not `Send`/`Sync` — `TextMap` holds `Rc<Node>` handles,
/// so a shared cache across threads needs external serialization,
/// which `global()` provides via a `Mutex`.
#[derive(Default)]
pub struct EngineState {
    cache: HashMap<String, Rc<TextMap>>,
    insertion_order: Vec<String>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, article_id: &str) -> Option<Rc<TextMap>> {
        self.cache.get(article_id).cloned()
    }

    fn insert(&mut self, article_id: String, map: Rc<TextMap>, capacity: usize) {
        if !self.cache.contains_key(&article_id) {
            self.insertion_order.push(article_id.clone());
        }
        self.cache.insert(article_id, map);
        self.evict_if_over_capacity(capacity);
    }

    /// Drop the oldest half of entries (by insertion order) once over
    /// capacity.
    fn evict_if_over_capacity(&mut self, capacity: usize) {
        if self.cache.len() <= capacity {
            return;
        }
        let drop_count = self.insertion_order.len() / 2;
        let to_drop: Vec<String> = self.insertion_order.drain(..drop_count).collect();
        for id in to_drop {
            self.cache.remove(&id);
        }
    }

    pub fn clear_cache(&mut self, article_id: &str) {
        self.cache.remove(article_id);
        self.insertion_order.retain(|id| id != article_id);
    }

    pub fn clear_all_cache(&mut self) {
        self.cache.clear();
        self.insertion_order.clear();
    }
}

/// The engine façade. Owns a configuration and, optionally, its own cache;
/// callers that want a shared process-wide cache should use [`global`]
/// instead of constructing their own `Engine`.
#[derive(Default)]
pub struct Engine {
    pub config: EngineConfig,
    state: EngineState,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            config,
            state: EngineState::new(),
        }
    }

    /// Run the full pipeline: parse, strip prior markers, build the text
    /// map, resolve each anchor, filter overlaps, apply in reverse order,
    /// serialize.
    pub fn apply(&mut self, html: &str, anchors: &[Anchor], article_id: Option<&str>, include_text_map: bool) -> HighlightResult {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("apply", article_id = ?article_id, anchors = anchors.len()).entered();

        if anchors.is_empty() {
            let map = include_text_map.then(|| {
                let root = parse(html);
                remove_highlights(&root, &self.config.marker_tag);
                Rc::new(build_text_map_with_marker(&root, &self.config.marker_tag))
            });
            return HighlightResult {
                html: html.to_string(),
                applied: 0,
                orphaned_ids: Vec::new(),
                text_map: map,
                total: 0,
            };
        }

        let root = parse(html);
        remove_highlights(&root, &self.config.marker_tag);
        let map = Rc::new(build_text_map_with_marker(&root, &self.config.marker_tag));

        if let Some(id) = article_id {
            self.state.insert(id.to_string(), map.clone(), self.config.cache_capacity);
        }

        let resolver_config = self.config.resolver_config();
        let mut resolved = Vec::with_capacity(anchors.len());
        let mut orphaned_ids = Vec::new();
        for anchor in anchors {
            let result = resolve(anchor, &map, &resolver_config);
            #[cfg(feature = "tracing")]
            tracing::trace!(anchor_id = %anchor.id, strategy = ?result.strategy, confidence = result.confidence, "resolved anchor");
            if result.is_failed() {
                orphaned_ids.push(anchor.id.clone());
            } else {
                resolved.push(result);
            }
        }

        if resolved.is_empty() {
            return HighlightResult {
                html: serialize_children(&root),
                applied: 0,
                orphaned_ids,
                text_map: include_text_map.then(|| map.clone()),
                total: anchors.len(),
            };
        }

        let ranges = eliminate_overlaps(resolved);
        let applied = ranges.len();
        let by_id: HashMap<String, &Anchor> = anchors.iter().map(|a| (a.id.clone(), a)).collect();
        apply_ranges(&root, &map, &ranges, &by_id, &self.config.marker_tag);

        HighlightResult {
            html: serialize_children(&root),
            applied,
            orphaned_ids,
            text_map: include_text_map.then(|| map.clone()),
            total: anchors.len(),
        }
    }

    /// Parse, strip markers, build the text map, optionally caching it.
    pub fn get_text_map(&mut self, html: &str, article_id: Option<&str>) -> Rc<TextMap> {
        let root = parse(html);
        remove_highlights(&root, &self.config.marker_tag);
        let map = Rc::new(build_text_map_with_marker(&root, &self.config.marker_tag));
        if let Some(id) = article_id {
            self.state.insert(id.to_string(), map.clone(), self.config.cache_capacity);
        }
        map
    }

    /// The cached text map for `article_id`, if present and not evicted.
    pub fn cached_text_map(&self, article_id: &str) -> Option<Rc<TextMap>> {
        self.state.get(article_id)
    }

    pub fn clear_cache(&mut self, article_id: &str) {
        self.state.clear_cache(article_id);
    }

    pub fn clear_all_cache(&mut self) {
        self.state.clear_all_cache();
    }
}

/// Parse, strip prior markers, build the text map, and return just the
/// plain text.
///
/// Markers must be stripped first: `build_text_map`'s marker-tag rule skips
/// an `<html-hl>` element's entire subtree (it isn't a block boundary, it's
/// ignored content like `script`/`style`), so projecting an already-applied
/// document without stripping would drop every highlighted word from the
/// plain text instead of just omitting the wrapper tag.
pub fn extract_plain_text(html: &str) -> String {
    let root = parse(html);
    remove_highlights(&root, DEFAULT_MARKER_TAG);
    build_text_map_with_marker(&root, DEFAULT_MARKER_TAG).plain_text
}

/// A process-wide default engine, guarded by a mutex.
/// `TextMap`/`Engine` are not `Send`, so the mutex wraps a thread-confined
/// engine behind a one-call-at-a-time gate rather than genuinely sharing
/// `Rc` data across threads; callers needing true cross-thread sharing
/// should build their own thread-local `Engine`.
static GLOBAL: OnceLock<Mutex<Engine>> = OnceLock::new();

fn global() -> &'static Mutex<Engine> {
    GLOBAL.get_or_init(|| Mutex::new(Engine::default()))
}

/// `apply` against the process-wide default engine and cache.
pub fn apply(html: &str, anchors: &[Anchor], article_id: Option<&str>, include_text_map: bool) -> HighlightResult {
    global()
        .lock()
        .expect("global engine mutex poisoned")
        .apply(html, anchors, article_id, include_text_map)
}

/// `get_text_map` against the process-wide default engine and cache.
pub fn get_text_map(html: &str, article_id: Option<&str>) -> Rc<TextMap> {
    global()
        .lock()
        .expect("global engine mutex poisoned")
        .get_text_map(html, article_id)
}

/// `clear_cache` against the process-wide default engine's cache.
pub fn clear_cache(article_id: &str) {
    global().lock().expect("global engine mutex poisoned").clear_cache(article_id);
}

/// `clear_all_cache` against the process-wide default engine's cache.
pub fn clear_all_cache() {
    global().lock().expect("global engine mutex poisoned").clear_all_cache();
}
