use crate::error::{Error, Result};
use crate::fetch::batch::partition;
use crate::fetch::context::FetchContext;
use crate::observability::metrics::FANOUT_BATCHES;
use crate::observability::tracing::trace_fan_out;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

/// Concurrent batch fetcher with all-or-nothing results.
///
/// Every batch runs as its own task inside a child scope of the caller's
/// context. The first failing batch cancels that scope, the remaining tasks
/// abort, and only the first error is returned. The optional semaphore is
/// shared by every clone, bounding upstream requests process-wide.
#[derive(Clone, Default)]
pub struct FanOutExecutor {
    in_flight: Option<Arc<Semaphore>>,
}

impl FanOutExecutor {
    pub fn new() -> Self {
        FanOutExecutor { in_flight: None }
    }

    pub fn with_in_flight_limit(max_in_flight: usize) -> Self {
        FanOutExecutor {
            in_flight: Some(Arc::new(Semaphore::new(max_in_flight))),
        }
    }

    pub async fn fetch_all<V, D, Fut, C>(
        &self,
        symbols: &[String],
        batch_size: usize,
        ctx: &FetchContext,
        dispatch: D,
        decode: C,
    ) -> Result<HashMap<String, V>>
    where
        V: Send + 'static,
        D: Fn(Vec<String>, FetchContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<u8>>> + Send + 'static,
        C: Fn(&[u8]) -> Result<HashMap<String, V>> + Send + Sync + 'static,
    {
        let mut seen = HashSet::with_capacity(symbols.len());
        let unique: Vec<String> = symbols
            .iter()
            .filter(|s| seen.insert(s.as_str()))
            .cloned()
            .collect();

        let batches = partition(&unique, batch_size)?;
        if batches.is_empty() {
            return Ok(HashMap::new());
        }

        let span = trace_fan_out(unique.len(), batches.len());
        self.run(batches, ctx, Arc::new(dispatch), Arc::new(decode))
            .instrument(span)
            .await
    }

    async fn run<V, D, Fut, C>(
        &self,
        batches: Vec<Vec<String>>,
        ctx: &FetchContext,
        dispatch: Arc<D>,
        decode: Arc<C>,
    ) -> Result<HashMap<String, V>>
    where
        V: Send + 'static,
        D: Fn(Vec<String>, FetchContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<u8>>> + Send + 'static,
        C: Fn(&[u8]) -> Result<HashMap<String, V>> + Send + Sync + 'static,
    {
        let scope = ctx.child();
        // Leaving early (error or drop) still cancels whatever is running.
        let _guard = scope.token().clone().drop_guard();
        FANOUT_BATCHES.inc_by(batches.len() as u64);

        let mut tasks = JoinSet::new();
        for batch in batches {
            let scope = scope.clone();
            let dispatch = dispatch.clone();
            let decode = decode.clone();
            let in_flight = self.in_flight.clone();

            tasks.spawn(async move { run_batch(batch, &scope, in_flight, dispatch, decode).await });
        }

        let mut merged = HashMap::new();
        let mut first_error: Option<Error> = None;

        while let Some(joined) = tasks.join_next().await {
            let result = joined.unwrap_or_else(|e| Err(Error::TaskFailed(e.to_string())));

            match result {
                Ok(partial) if first_error.is_none() => merged.extend(partial),
                Ok(_) => {}
                Err(e) if first_error.is_none() => {
                    tracing::warn!("Batch failed, cancelling siblings: {}", e);
                    scope.cancel();
                    first_error = Some(e);
                }
                Err(e) => {
                    tracing::debug!("Batch aborted after first error: {}", e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(merged),
        }
    }
}

async fn run_batch<V, D, Fut, C>(
    batch: Vec<String>,
    scope: &FetchContext,
    in_flight: Option<Arc<Semaphore>>,
    dispatch: Arc<D>,
    decode: Arc<C>,
) -> Result<HashMap<String, V>>
where
    D: Fn(Vec<String>, FetchContext) -> Fut,
    Fut: Future<Output = Result<Vec<u8>>>,
    C: Fn(&[u8]) -> Result<HashMap<String, V>>,
{
    let _permit = match in_flight {
        Some(semaphore) => Some(tokio::select! {
            biased;
            err = scope.done() => return Err(err),
            permit = semaphore.acquire_owned() => permit
                .map_err(|e| Error::TaskFailed(e.to_string()))?,
        }),
        None => None,
    };

    let raw = tokio::select! {
        biased;
        err = scope.done() => return Err(err),
        raw = dispatch(batch, scope.clone()) => raw?,
    };
    let partial = decode(&raw)?;

    // A sibling may have failed while this batch was decoding.
    if let Some(err) = scope.err() {
        return Err(err);
    }
    Ok(partial)
}
