#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use weave_core::{CallContext, PropertyInfo};
use weave_weaviate::{Backend, BackendError, GetData, GetQuery, GetResponse, RawItem, SearchOperator};

/// Backend that replays canned `get` answers in order and records every
/// query it receives.
pub struct ScriptedBackend {
    pub schema: Result<Vec<PropertyInfo>, BackendError>,
    answers: Mutex<VecDeque<Result<GetResponse, BackendError>>>,
    pub queries: Mutex<Vec<GetQuery>>,
    pub deleted: Mutex<Vec<String>>,
    failing_deletes: HashSet<String>,
    get_delay: Option<Duration>,
    cancel_on_get: Option<CallContext>,
}

impl ScriptedBackend {
    pub fn new(schema: Vec<PropertyInfo>) -> Self {
        Self {
            schema: Ok(schema),
            answers: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            failing_deletes: HashSet::new(),
            get_delay: None,
            cancel_on_get: None,
        }
    }

    pub fn docs_schema() -> Self {
        Self::new(vec![PropertyInfo::text("content"), PropertyInfo::text("metadata")])
    }

    pub fn schema_error(mut self, e: BackendError) -> Self { self.schema = Err(e); self }

    pub fn answer(self, answer: Result<GetResponse, BackendError>) -> Self {
        self.answers.lock().push_back(answer);
        self
    }

    pub fn items(self, collection: &str, items: Vec<RawItem>) -> Self {
        self.answer(Ok(GetResponse::ok(GetData::single(collection, items))))
    }

    pub fn fail_delete(mut self, id: &str) -> Self { self.failing_deletes.insert(id.to_string()); self }

    pub fn delay(mut self, d: Duration) -> Self { self.get_delay = Some(d); self }

    pub fn cancel_on_get(mut self, ctx: CallContext) -> Self { self.cancel_on_get = Some(ctx); self }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.queries.lock().iter().map(|q| kind(&q.search)).collect()
    }
}

pub fn kind(search: &SearchOperator) -> &'static str {
    match search {
        SearchOperator::NearText { .. } => "nearText",
        SearchOperator::Bm25 { .. } => "bm25",
        SearchOperator::Hybrid { .. } => "hybrid",
        SearchOperator::None => "where",
    }
}

impl Backend for ScriptedBackend {
    fn class_schema(&self, _collection: &str, _ctx: &CallContext) -> Result<Vec<PropertyInfo>, BackendError> {
        self.schema.clone()
    }

    fn get(&self, query: &GetQuery, _ctx: &CallContext) -> Result<GetResponse, BackendError> {
        self.queries.lock().push(query.clone());
        if let Some(d) = self.get_delay {
            std::thread::sleep(d);
        }
        if let Some(ctx) = &self.cancel_on_get {
            ctx.cancel();
        }
        self.answers
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::other("no scripted answer left")))
    }

    fn aggregate_count(&self, _collection: &str, _ctx: &CallContext) -> Result<usize, BackendError> {
        Ok(self.answers.lock().len())
    }

    fn delete_object(&self, _collection: &str, id: &str, _ctx: &CallContext) -> Result<(), BackendError> {
        if self.failing_deletes.contains(id) {
            return Err(BackendError::other("delete refused"));
        }
        self.deleted.lock().push(id.to_string());
        Ok(())
    }

    fn list_classes(&self, _ctx: &CallContext) -> Result<Vec<String>, BackendError> {
        Ok(vec!["WeaveDocs".to_string()])
    }

    fn ready(&self, _ctx: &CallContext) -> Result<(), BackendError> {
        Ok(())
    }
}
