//! Scripted driver for unit tests
//!
//! Records every command sent through `query_multi` and answers with
//! canned result sets, one scripted response per call.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use deferred_core::{
    Connection, ConnectionConfig, DatabaseDriver, DbError, MultiResultCursor, QueryResult, Result,
    Value,
};
use parking_lot::Mutex;

enum Response {
    Results(Vec<QueryResult>),
    Fail(String),
}

#[derive(Default)]
struct ScriptState {
    responses: Mutex<VecDeque<Response>>,
    commands: Mutex<Vec<String>>,
    connects: AtomicUsize,
    closes: AtomicUsize,
    fail_close: AtomicBool,
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedDriver {
    state: Arc<ScriptState>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result sets for the next batch
    pub fn respond(&self, results: Vec<QueryResult>) -> &Self {
        self.state
            .responses
            .lock()
            .push_back(Response::Results(results));
        self
    }

    /// Make the next batch fail with a query error
    pub fn fail(&self, message: &str) -> &Self {
        self.state
            .responses
            .lock()
            .push_back(Response::Fail(message.to_string()));
        self
    }

    pub fn fail_close(&self) -> &Self {
        self.state.fail_close.store(true, Ordering::SeqCst);
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.commands.lock().clone()
    }

    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> ConnectionConfig {
        ConnectionConfig::new("scripted")
    }
}

#[async_trait]
impl DatabaseDriver for ScriptedDriver {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn connect(&self, _config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(ScriptedConnection {
            state: Arc::clone(&self.state),
        }))
    }
}

struct ScriptedConnection {
    state: Arc<ScriptState>,
}

#[async_trait]
impl Connection for ScriptedConnection {
    fn driver_name(&self) -> &str {
        "scripted"
    }

    async fn query(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
        Err(DbError::NotSupported("scripted connections only batch".into()))
    }

    async fn query_multi(&self, sql: &str) -> Result<MultiResultCursor> {
        self.state.commands.lock().push(sql.to_string());
        match self.state.responses.lock().pop_front() {
            Some(Response::Results(results)) => Ok(MultiResultCursor::new(results)),
            Some(Response::Fail(message)) => Err(DbError::Query(message)),
            None => Err(DbError::Other("no scripted response left".into())),
        }
    }

    async fn close(&self) -> Result<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_close.load(Ordering::SeqCst) {
            return Err(DbError::Connection("socket already gone".into()));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }
}

/// One-column result set
pub(crate) fn scalar_set(column: &str, values: Vec<Value>) -> QueryResult {
    QueryResult::from_rows([column], values.into_iter().map(|v| vec![v]).collect())
}
