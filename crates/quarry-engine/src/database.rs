//! Database handle
//!
//! Opening a database moves one configured connection onto the executor
//! thread and creates the change notifier that every repository and live
//! subscription built from this handle shares. `close` tears both down.

use crate::config::DatabaseConfig;
use quarry_core::errors::Result;
use quarry_core::{log_op_end, log_op_error, log_op_start, Record};
use quarry_core_types::RequestId;
use quarry_store::{ChangeNotifier, Executor, Repository, Session, SqliteEngine};
use std::sync::Arc;
use std::time::Instant;

pub struct Database {
    config: DatabaseConfig,
    executor: Arc<Executor>,
    notifier: Arc<ChangeNotifier>,
}

impl Database {
    /// Open the database described by `config`
    pub fn open(config: DatabaseConfig) -> Result<Self> {
        let start = Instant::now();
        log_op_start!("open_database", in_memory = config.is_in_memory());

        let settings = config.to_settings();
        let opened = match &config.path {
            Some(path) => SqliteEngine::open(path, &settings),
            None => SqliteEngine::open_in_memory(&settings),
        }
        .and_then(|engine| Executor::spawn(Box::new(engine)));

        let duration_ms = start.elapsed().as_millis() as u64;
        let executor = match opened {
            Ok(executor) => executor,
            Err(err) => {
                let err = err.or_op("open_database");
                log_op_error!("open_database", err, duration_ms = duration_ms);
                return Err(err);
            }
        };
        log_op_end!("open_database", duration_ms = duration_ms);

        let notifier = Arc::new(ChangeNotifier::with_capacity(config.notifier_capacity));
        Ok(Self {
            config,
            executor: Arc::new(executor),
            notifier,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(DatabaseConfig::in_memory())
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    pub fn is_open(&self) -> bool {
        self.executor.is_open()
    }

    /// Repository for `R` sharing this database's connection and notifier
    pub fn repository<R: Record>(&self) -> Repository<R> {
        Repository::new(self.executor.clone(), self.notifier.clone())
    }

    /// Run `f` in one transaction on the executor
    ///
    /// Rolls back if `f` fails. Every table `f` changed is notified once,
    /// after COMMIT succeeds; a rolled-back transaction notifies nothing.
    pub async fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let request_id = RequestId::new();
        let start = Instant::now();
        log_op_start!("transaction", request_id = %request_id);

        let result = self
            .executor
            .run(move |engine| {
                let mut session = Session::new(engine);
                let value = session.transaction(f)?;
                Ok((value, session.into_touched()))
            })
            .await;

        let duration_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok((value, touched)) => {
                for table in &touched {
                    self.notifier.notify(table);
                }
                log_op_end!(
                    "transaction",
                    duration_ms = duration_ms,
                    request_id = %request_id,
                    tables = touched.len()
                );
                Ok(value)
            }
            Err(err) => {
                let err = err.or_op("transaction").with_request_id(request_id.clone());
                log_op_error!("transaction", err, duration_ms = duration_ms, request_id = %request_id);
                Err(err)
            }
        }
    }

    /// Finish queued work, stop the executor and close every notifier
    /// channel
    ///
    /// Later calls through this handle or its repositories fail with
    /// `ConnectionFailed`. Closing twice is harmless.
    pub async fn close(&self) {
        let start = Instant::now();
        log_op_start!("close_database");
        self.executor.shutdown().await;
        self.notifier.cleanup_all();
        log_op_end!("close_database", duration_ms = start.elapsed().as_millis() as u64);
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("open", &self.is_open())
            .finish()
    }
}
