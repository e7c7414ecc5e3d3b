//! In-memory host used by the unit tests.
//!
//! A `Database` holds record sources; every `new_pad` snapshots them into an
//! immutable revision with its own virtual cache. Queries list the children
//! of a record and support equality/less-than filters, ordering and
//! slicing. Reading a record through the pad records a dependency with the
//! active [`Context`].


pub use builder::Builder;
pub use context::Context;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Result;
use crate::host::{
    BoxedFilter, BoxedResolver, Environment, Pad, Query, Record, TemplateValue, VirtualCache,
    VirtualSource,
};
use crate::plugin::LimitDependencies;
use crate::query::FrozenQuery;
use crate::results::ContentHash;

type Fields = BTreeMap<String, String>;

// ============================================================================
// Database
// ============================================================================

/// Mutable record sources; pads are snapshots of it.
pub struct Database {
    sources: RwLock<BTreeMap<String, Fields>>,
    env: Arc<TestEnv>,
}

impl Database {
    pub fn new() -> Self {
        Self::with_env(TestEnv::default())
    }

    pub fn with_env(env: TestEnv) -> Self {
        Self {
            sources: RwLock::default(),
            env: Arc::new(env),
        }
    }

    pub fn insert(&self, path: &str, fields: &[(&str, &str)]) {
        let fields = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.sources.write().insert(path.to_string(), fields);
    }

    /// Append a newline to the record's body, as an editor save would.
    pub fn touch(&self, path: &str) {
        let mut sources = self.sources.write();
        let fields = sources.get_mut(path).expect("touched record must exist");
        fields.entry("body".into()).or_default().push('\n');
    }

    pub fn new_pad(&self) -> TestPad {
        TestPad {
            inner: Arc::new(PadInner {
                records: self.sources.read().clone(),
                env: Arc::clone(&self.env),
                cache: VirtualCache::new(),
                evaluations: AtomicUsize::new(0),
            }),
        }
    }
}

// ============================================================================
// Pad
// ============================================================================

struct PadInner {
    records: BTreeMap<String, Fields>,
    env: Arc<TestEnv>,
    cache: VirtualCache,
    evaluations: AtomicUsize,
}

#[derive(Clone)]
pub struct TestPad {
    inner: Arc<PadInner>,
}

impl TestPad {
    pub fn same_revision(&self, other: &TestPad) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn env(&self) -> &TestEnv {
        &self.inner.env
    }

    /// How many times a query was evaluated against this pad.
    pub fn evaluations(&self) -> usize {
        self.inner.evaluations.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<String> {
        self.inner.records.keys().cloned().collect()
    }

    /// Source checksum of a record, `None` if it does not exist.
    pub fn checksum_of(&self, path: &str) -> Option<ContentHash> {
        let fields = self.inner.records.get(path)?;
        Some(ContentHash::of(serde_json::to_vec(fields).unwrap()))
    }

    /// Resolve `/@<prefix>/<pieces...>` through the registered resolvers.
    pub fn resolve_virtual(&self, path: &str) -> Option<Arc<dyn VirtualSource>> {
        let rest = path.strip_prefix("/@")?;
        let (prefix, rest) = rest.split_once('/').unwrap_or((rest, ""));
        let pieces: Vec<&str> = rest.split('/').filter(|p| !p.is_empty()).collect();
        let resolver = self.env().resolvers.get(prefix)?;
        resolver(&self.record("/", None), &pieces)
    }

    fn record(&self, path: &str, alt: Option<&str>) -> TestRecord {
        TestRecord {
            pad: self.clone(),
            path: path.to_string(),
            alt: alt.map(str::to_owned),
        }
    }

    fn child_paths(&self, parent: &str) -> Vec<String> {
        let prefix = format!("{}/", parent.trim_end_matches('/'));
        self.inner
            .records
            .keys()
            .filter(|path| {
                path.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .cloned()
            .collect()
    }
}

impl fmt::Debug for TestPad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TestPad({:p})", Arc::as_ptr(&self.inner))
    }
}

impl Pad for TestPad {
    type Record = TestRecord;
    type Query = TestQuery;

    fn root(&self) -> TestRecord {
        context::record_dependency("/");
        self.record("/", None)
    }

    fn get(&self, path: &str, alt: Option<&str>) -> Option<TestRecord> {
        if !self.inner.records.contains_key(path) {
            return None;
        }
        context::record_dependency(path);
        Some(self.record(path, alt))
    }

    fn virtual_cache(&self) -> &VirtualCache {
        &self.inner.cache
    }

    fn without_dependencies<R>(&self, f: impl FnOnce() -> R) -> R {
        context::without_dependencies(f)
    }

    fn record_virtual_dependency(&self, source: &dyn VirtualSource) -> bool {
        context::record_virtual_dependency(source.path(), || source.checksum())
    }
}

// ============================================================================
// Record
// ============================================================================

#[derive(Clone, Debug)]
pub struct TestRecord {
    pad: TestPad,
    path: String,
    alt: Option<String>,
}

impl TestRecord {
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "_id" => Some(self.id().to_string()),
            "_path" => Some(self.path.clone()),
            _ => self.pad.inner.records.get(&self.path)?.get(name).cloned(),
        }
    }
}

impl PartialEq for TestRecord {
    fn eq(&self, other: &Self) -> bool {
        self.pad.same_revision(&other.pad) && self.path == other.path && self.alt == other.alt
    }
}

impl Record for TestRecord {
    type Pad = TestPad;

    fn pad(&self) -> &TestPad {
        &self.pad
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn id(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }
}

// ============================================================================
// Query
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum FilterOp {
    Eq,
    Lt,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct FieldFilter {
    field: String,
    op: FilterOp,
    value: String,
}

impl FieldFilter {
    fn matches(&self, record: &TestRecord) -> bool {
        let actual = record.field(&self.field).unwrap_or_default();
        match self.op {
            FilterOp::Eq => actual == self.value,
            FilterOp::Lt => actual < self.value,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestQuery {
    path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alt: Option<String>,
    #[serde(default)]
    filters: Vec<FieldFilter>,
    #[serde(default)]
    order_by: Vec<String>,
    #[serde(default)]
    offset: usize,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(skip)]
    pad: Option<TestPad>,
}

impl TestQuery {
    /// Children of the record at `path`.
    pub fn children(pad: &TestPad, path: &str) -> Self {
        Self {
            pad: Some(pad.clone()),
            ..Self::unbound(path)
        }
    }

    pub fn unbound(path: &str) -> Self {
        Self {
            path: path.to_string(),
            alt: None,
            filters: Vec::new(),
            order_by: Vec::new(),
            offset: 0,
            limit: None,
            pad: None,
        }
    }

    pub fn filter_eq(mut self, field: &str, value: &str) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        });
        self
    }

    pub fn filter_lt(mut self, field: &str, value: &str) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            op: FilterOp::Lt,
            value: value.into(),
        });
        self
    }

    /// Order by a field; a leading `-` sorts descending.
    pub fn order_by(mut self, key: &str) -> Self {
        self.order_by.push(key.into());
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_alt(mut self, alt: &str) -> Self {
        self.alt = Some(alt.into());
        self
    }
}

impl Query for TestQuery {
    type Pad = TestPad;

    const KIND: &'static str = "test-query";

    fn pad(&self) -> Option<&TestPad> {
        self.pad.as_ref()
    }

    fn set_pad(&mut self, pad: Option<TestPad>) {
        self.pad = pad;
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn alt(&self) -> Option<&str> {
        self.alt.as_deref()
    }

    fn result_ids(&self) -> Vec<String> {
        let Some(pad) = &self.pad else {
            return Vec::new();
        };
        pad.inner.evaluations.fetch_add(1, Ordering::SeqCst);

        let mut records: Vec<TestRecord> = pad
            .child_paths(&self.path)
            .iter()
            .filter_map(|path| pad.get(path, self.alt.as_deref()))
            .filter(|record| self.filters.iter().all(|f| f.matches(record)))
            .collect();

        records.sort_by(|a, b| {
            self.order_by
                .iter()
                .map(|key| match key.strip_prefix('-') {
                    Some(field) => b.field(field).cmp(&a.field(field)),
                    None => a.field(key).cmp(&b.field(key)),
                })
                .find(|ord| ord.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        records
            .iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .map(|record| record.id().to_string())
            .collect()
    }
}

/// Assert two queries are equivalent, ignoring the pad they are bound to.
pub fn assert_queries_equal(query: &TestQuery, other: &TestQuery) {
    assert_eq!(
        serde_json::to_value(query).unwrap(),
        serde_json::to_value(other).unwrap()
    );
}

// ============================================================================
// Template values and environment
// ============================================================================

#[derive(Debug)]
pub enum TestValue {
    Undefined(String),
    Str(String),
    Query(TestQuery),
    Frozen(FrozenQuery<TestPad>),
}

impl TemplateValue<TestPad> for TestValue {
    fn as_query(&self) -> Option<&TestQuery> {
        match self {
            Self::Query(query) => Some(query),
            _ => None,
        }
    }

    fn undefined(hint: String) -> Self {
        Self::Undefined(hint)
    }

    fn frozen(query: FrozenQuery<TestPad>) -> Self {
        Self::Frozen(query)
    }
}

#[derive(Default)]
pub struct TestEnv {
    filters: FxHashMap<String, BoxedFilter<TestValue>>,
    resolvers: FxHashMap<String, BoxedResolver<TestRecord>>,
}

impl TestEnv {
    pub fn has_filter(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    pub fn has_resolver(&self, prefix: &str) -> bool {
        self.resolvers.contains_key(prefix)
    }

    pub fn apply_filter(&self, name: &str, value: &TestValue) -> Result<TestValue> {
        let filter = self.filters.get(name).expect("filter must be registered");
        filter(value)
    }
}

impl Environment for TestEnv {
    type Pad = TestPad;
    type Value = TestValue;

    fn register_filter(&mut self, name: &str, filter: BoxedFilter<TestValue>) {
        self.filters.insert(name.to_string(), filter);
    }

    fn register_virtual_path_resolver(&mut self, prefix: &str, resolver: BoxedResolver<TestRecord>) {
        self.resolvers.insert(prefix.to_string(), resolver);
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn populate(db: &Database) {
    db.insert("/", &[("title", "Home"), ("body", "Welcome")]);
    db.insert("/about", &[("title", "About"), ("body", "Who we are")]);
    db.insert("/projects", &[("title", "Projects"), ("body", "What we do")]);
}

/// Root with two children, `about` and `projects`.
pub fn sample_site() -> Database {
    let db = Database::new();
    populate(&db);
    db
}

/// [`sample_site`] with the plugin registered in its environment.
pub fn sample_site_with_env(plugin: LimitDependencies) -> (Database, Arc<LimitDependencies>) {
    let plugin = Arc::new(plugin);
    let mut env = TestEnv::default();
    Arc::clone(&plugin).on_setup_env(&mut env);
    let db = Database::with_env(env);
    populate(&db);
    (db, plugin)
}

/// Query shapes exercised across the test suite.
pub fn query_shapes(pad: &TestPad) -> Vec<TestQuery> {
    vec![
        TestQuery::children(pad, "/"),
        TestQuery::children(pad, "/").filter_lt("_id", "g"),
        TestQuery::children(pad, "/").order_by("-title"),
        TestQuery::children(pad, "/").order_by("title").limit(1),
        TestQuery::children(pad, "/")
            .order_by("title")
            .limit(1)
            .offset(1),
        TestQuery::children(pad, "/").filter_eq("title", "missing"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_shapes_sanity() {
        let db = sample_site();
        let pad = db.new_pad();
        let expected: [&[&str]; 6] = [
            &["about", "projects"],
            &["about"],
            &["projects", "about"],
            &["about"],
            &["projects"],
            &[],
        ];
        for (query, expected) in query_shapes(&pad).iter().zip(expected) {
            assert_eq!(query.result_ids(), expected);
        }
    }

    #[test]
    fn test_children_exclude_grandchildren() {
        let db = sample_site();
        db.insert("/projects/crate", &[("title", "Crate")]);
        let pad = db.new_pad();
        assert_eq!(
            TestQuery::children(&pad, "/").result_ids(),
            ["about", "projects"]
        );
        assert_eq!(
            TestQuery::children(&pad, "/projects").result_ids(),
            ["crate"]
        );
    }

    #[test]
    fn test_pads_are_snapshots() {
        let db = sample_site();
        let before = db.new_pad();
        db.touch("/about");
        let after = db.new_pad();
        assert_ne!(before.checksum_of("/about"), after.checksum_of("/about"));
        assert_eq!(before.checksum_of("/projects"), after.checksum_of("/projects"));
    }
}
