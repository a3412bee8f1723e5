//! Single-writer actor.
//!
//! SQLite allows one writer at a time, so every write goes through a task
//! that owns one pooled connection and runs jobs serially, each inside an
//! immediate transaction. Reads use the pool directly.

use std::any::Any;

use diesel::SqliteConnection;
use log::{error, warn};
use tokio::sync::{mpsc, oneshot};

use super::DbPool;
use crate::errors::StorageError;
use pricewatch_core::errors::{DatabaseError, Error, Result};

const WRITER_QUEUE_DEPTH: usize = 1024;

type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;
type AnyBox = Box<dyn Any + Send + 'static>;
type Envelope = (Job<AnyBox>, oneshot::Sender<Result<AnyBox>>);

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<Envelope>,
}

impl WriteHandle {
    /// Run `job` on the writer connection and wait for its result.
    ///
    /// A stopped writer surfaces as `DatabaseError::Internal` rather than a
    /// panic, so callers can treat it like any other storage failure.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as AnyBox)),
                ret_tx,
            ))
            .await
            .map_err(|_| writer_gone("writer queue is closed"))?;

        let boxed = ret_rx
            .await
            .map_err(|_| writer_gone("writer dropped the reply"))??;

        boxed
            .downcast::<T>()
            .map(|v| *v)
            .map_err(|_| writer_gone("writer returned an unexpected type"))
    }
}

fn writer_gone(reason: &str) -> Error {
    Error::Database(DatabaseError::Internal(format!(
        "Database writer unavailable: {}",
        reason
    )))
}

/// Spawn the writer task on the current Tokio runtime.
///
/// If no connection can be taken from the pool, every queued job is answered
/// with the pool error instead.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<Envelope>(WRITER_QUEUE_DEPTH);

    tokio::spawn(async move {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                error!("Writer could not acquire a database connection: {}", e);
                let reason = e.to_string();
                while let Some((_, reply_tx)) = rx.recv().await {
                    let _ = reply_tx.send(Err(Error::Database(
                        DatabaseError::ConnectionFailed(reason.clone()),
                    )));
                }
                return;
            }
        };

        while let Some((job, reply_tx)) = rx.recv().await {
            let result: Result<AnyBox> = conn
                .immediate_transaction::<_, StorageError, _>(|c| job(c).map_err(StorageError::from))
                .map_err(|e| e.into());

            if reply_tx.send(result).is_err() {
                warn!("Write finished after its caller went away");
            }
        }
    });

    WriteHandle { tx }
}
