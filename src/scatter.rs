//! Fan-out/fan-in over independent units of work.
//!
//! Every descriptor gets its own tokio task. Results come back through one
//! unbounded channel, so they arrive in completion order; the channel closes
//! once every task has dropped its sender.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinError;

/// Results of one scatter-gather run, tagged with the descriptor index.
#[derive(Debug)]
pub struct Gathered<T, E> {
    outcomes: Vec<(usize, Result<T, E>)>,
}

impl<T, E> Gathered<T, E> {
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Results in descriptor order.
    pub fn into_ordered(mut self) -> Vec<Result<T, E>> {
        self.outcomes.sort_by_key(|(index, _)| *index);
        self.outcomes.into_iter().map(|(_, result)| result).collect()
    }

    /// Successes and failures, each in descriptor order.
    pub fn split(self) -> (Vec<T>, Vec<E>) {
        let mut ok = Vec::new();
        let mut failed = Vec::new();
        for result in self.into_ordered() {
            match result {
                Ok(value) => ok.push(value),
                Err(err) => failed.push(err),
            }
        }
        (ok, failed)
    }
}

/// Runs `worker` once per descriptor, all concurrently, and waits for all of them.
///
/// A failing unit does not stop its siblings. A unit whose task panicked is
/// reported as `E::from(JoinError)` at its own index.
pub async fn scatter_gather<D, T, E, F, Fut>(
    descriptors: impl IntoIterator<Item = D>,
    worker: F,
) -> Gathered<T, E>
where
    F: Fn(D) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: From<JoinError> + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, Result<T, E>)>();

    let handles: Vec<_> = descriptors
        .into_iter()
        .enumerate()
        .map(|(index, descriptor)| {
            let unit = worker(descriptor);
            let tx = tx.clone();
            (
                index,
                tokio::spawn(async move {
                    // The receiver outlives every task.
                    let _ = tx.send((index, unit.await));
                }),
            )
        })
        .collect();
    drop(tx);

    let mut outcomes = Vec::with_capacity(handles.len());
    while let Some(outcome) = rx.recv().await {
        outcomes.push(outcome);
    }

    // The channel is closed, so every task is done; only panicked ones are left to report.
    for (index, handle) in handles {
        if let Err(err) = handle.await {
            tracing::error!(index, error = %err, "Scatter-gather unit panicked");
            outcomes.push((index, Err(E::from(err))));
        }
    }

    Gathered { outcomes }
}
