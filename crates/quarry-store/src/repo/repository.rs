//! Async repository over one record type
//!
//! Every call runs as one job on the shared executor, so calls from any
//! number of tasks queue against the single connection. Tables changed by a
//! successful call are signalled on the change notifier after the job
//! returns, which is after its statements have committed.

use crate::errors::Result;
use crate::executor::Executor;
use crate::notify::ChangeNotifier;
use crate::repo::session::Session;
use quarry_core::{encode, log_op_end, log_op_error, log_op_start, QuerySpec, Record, Row};
use quarry_core_types::{RequestId, TableId};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

/// Typed CRUD for `R`
pub struct Repository<R: Record> {
    executor: Arc<Executor>,
    notifier: Arc<ChangeNotifier>,
    table: TableId,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            notifier: self.notifier.clone(),
            table: self.table.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> std::fmt::Debug for Repository<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl<R: Record> Repository<R> {
    pub fn new(executor: Arc<Executor>, notifier: Arc<ChangeNotifier>) -> Self {
        Self {
            executor,
            notifier,
            table: R::descriptor().table_id(),
            _record: PhantomData,
        }
    }

    pub fn table(&self) -> &TableId {
        &self.table
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    // ========== Reads ==========

    /// Record with the given identity; absence is `Ok(None)`
    pub async fn find(&self, id: R::Id) -> Result<Option<R>> {
        self.run("find", move |s| s.find::<R>(&id)).await
    }

    pub async fn find_all(&self, spec: &QuerySpec) -> Result<Vec<R>> {
        let spec = spec.clone();
        self.run("find_all", move |s| s.find_all::<R>(&spec)).await
    }

    /// Every row of the table
    pub async fn all(&self) -> Result<Vec<R>> {
        self.find_all(&QuerySpec::new()).await
    }

    pub async fn find_first(&self, spec: &QuerySpec) -> Result<Option<R>> {
        let spec = spec.clone();
        self.run("find_first", move |s| s.find_first::<R>(&spec))
            .await
    }

    /// Alias of [`Repository::find_first`]
    pub async fn find_by(&self, spec: &QuerySpec) -> Result<Option<R>> {
        self.find_first(spec).await
    }

    pub async fn count(&self, spec: &QuerySpec) -> Result<u64> {
        let spec = spec.clone();
        self.run("count", move |s| s.count::<R>(&spec)).await
    }

    pub async fn exists(&self, spec: &QuerySpec) -> Result<bool> {
        let spec = spec.clone();
        self.run("exists", move |s| s.exists::<R>(&spec)).await
    }

    // ========== Writes ==========

    /// Insert `record` and return it with its identity filled in
    pub async fn insert(&self, record: R) -> Result<R> {
        self.run("insert", move |s| {
            let mut record = record;
            s.insert(&mut record)?;
            Ok(record)
        })
        .await
    }

    /// Insert all records in one transaction
    pub async fn insert_all(&self, records: Vec<R>) -> Result<Vec<R>> {
        self.run("insert_all", move |s| {
            let mut records = records;
            s.insert_all(&mut records)?;
            Ok(records)
        })
        .await
    }

    /// Update by identity; zero affected rows is `Ok(0)`
    pub async fn update(&self, record: &R) -> Result<usize> {
        let row = encode(record)?;
        let id = record.id();
        self.run("update", move |s| s.update_row::<R>(&id, &row))
            .await
    }

    /// Update by identity, failing with `NotFound` when nothing matched
    pub async fn update_existing(&self, record: &R) -> Result<()> {
        let row = encode(record)?;
        let id = record.id();
        self.run("update_existing", move |s| s.update_existing_row::<R>(&id, &row))
            .await
    }

    /// Insert or update depending on whether the identity exists
    pub async fn save(&self, record: R) -> Result<R> {
        self.run("save", move |s| {
            let mut record = record;
            s.save(&mut record)?;
            Ok(record)
        })
        .await
    }

    /// Bulk update by field name; identity is never assigned
    pub async fn update_where(&self, spec: &QuerySpec, assignments: Row) -> Result<usize> {
        let spec = spec.clone();
        self.run("update_where", move |s| {
            s.update_where::<R>(&spec, &assignments)
        })
        .await
    }

    pub async fn delete(&self, id: R::Id) -> Result<usize> {
        self.run("delete", move |s| s.delete::<R>(&id)).await
    }

    pub async fn delete_where(&self, spec: &QuerySpec) -> Result<usize> {
        let spec = spec.clone();
        self.run("delete_where", move |s| s.delete_where::<R>(&spec))
            .await
    }

    pub async fn delete_all(&self) -> Result<usize> {
        self.run("delete_all", |s| s.delete_all::<R>()).await
    }

    // ========== Schema ==========

    pub async fn create_table(&self) -> Result<()> {
        self.run("create_table", |s| s.create_table::<R>()).await
    }

    pub async fn drop_table(&self) -> Result<()> {
        self.run("drop_table", |s| s.drop_table::<R>()).await
    }

    /// Run one session job, log it and notify the tables it changed
    async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let request_id = RequestId::new();
        let start = Instant::now();
        log_op_start!(op, table = %self.table, request_id = %request_id);

        let result = self
            .executor
            .run(move |engine| {
                let mut session = Session::new(engine);
                let value = f(&mut session)?;
                Ok((value, session.into_touched()))
            })
            .await;

        let duration_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok((value, touched)) => {
                for table in &touched {
                    self.notifier.notify(table);
                }
                log_op_end!(op, duration_ms = duration_ms, table = %self.table, request_id = %request_id);
                Ok(value)
            }
            Err(err) => {
                let err = err.or_op(op).with_request_id(request_id.clone());
                let err = if err.table().is_some() {
                    err
                } else {
                    err.with_table(self.table.clone())
                };
                log_op_error!(op, err, duration_ms = duration_ms, table = %self.table, request_id = %request_id);
                Err(err)
            }
        }
    }
}
