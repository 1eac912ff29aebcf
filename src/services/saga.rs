//! Ordered compensation for multi-step writes over a store without transactions.
//!
//! Each successful step may register an undo action. When a later step fails the
//! registered undos run newest first; their own failures are logged and swallowed
//! so the caller always sees the error of the step that broke the sequence.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
type Undo<'a> = Box<dyn FnOnce() -> BoxFuture<'a, Result<(), String>> + Send + 'a>;

pub(crate) struct Saga<'a> {
    name: &'static str,
    compensations: Vec<(&'static str, Undo<'a>)>,
}

impl<'a> Saga<'a> {
    pub(crate) fn new(name: &'static str) -> Self {
        Self { name, compensations: Vec::new() }
    }

    /// Runs one step. On failure every registered undo is executed before the
    /// step's error is returned.
    pub(crate) async fn run<T, E, F>(&mut self, label: &'static str, step: F) -> Result<T, E>
    where
        E: Display,
        F: Future<Output = Result<T, E>>,
    {
        match step.await {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::warn!(saga = self.name, step = label, error = %err, "Saga step failed");
                self.rollback().await;
                Err(err)
            }
        }
    }

    /// Registers the compensation for the step that just completed.
    pub(crate) fn on_rollback<F, Fut, E>(&mut self, label: &'static str, undo: F)
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<(), E>> + Send + 'a,
        E: Display,
    {
        self.compensations.push((
            label,
            Box::new(move || Box::pin(async move { undo().await.map_err(|err| err.to_string()) })),
        ));
    }

    pub(crate) async fn rollback(&mut self) {
        while let Some((label, undo)) = self.compensations.pop() {
            match undo().await {
                Ok(()) => tracing::info!(saga = self.name, step = label, "Compensation applied"),
                Err(error) => tracing::error!(
                    saga = self.name,
                    step = label,
                    error = %error,
                    "Compensation failed"
                ),
            }
        }
    }

    pub(crate) fn commit(mut self) {
        self.compensations.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::Saga;

    fn recorder() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn failed_step_runs_compensations_newest_first() {
        let log = recorder();
        let mut saga = Saga::new("test");

        for name in ["first", "second"] {
            saga.run(name, async { Ok::<_, String>(()) }).await.unwrap();
            let log = log.clone();
            saga.on_rollback(name, move || async move {
                log.lock().unwrap().push(format!("undo {name}"));
                Ok::<_, String>(())
            });
        }

        let err = saga.run("third", async { Err::<(), _>("boom".to_string()) }).await.unwrap_err();

        assert_eq!(err, "boom");
        assert_eq!(*log.lock().unwrap(), vec!["undo second", "undo first"]);
    }

    #[tokio::test]
    async fn failing_compensation_does_not_stop_the_rest() {
        let log = recorder();
        let mut saga = Saga::new("test");

        let first = log.clone();
        saga.on_rollback("first", move || async move {
            first.lock().unwrap().push("undo first".to_string());
            Ok::<_, String>(())
        });
        saga.on_rollback("second", || async { Err::<(), _>("cannot undo".to_string()) });

        let result = saga.run("third", async { Err::<(), _>("boom".to_string()) }).await;

        assert!(result.is_err());
        assert_eq!(*log.lock().unwrap(), vec!["undo first"]);
    }

    #[tokio::test]
    async fn committed_saga_never_compensates() {
        let log = recorder();
        let mut saga = Saga::new("test");

        let undo = log.clone();
        saga.on_rollback("step", move || async move {
            undo.lock().unwrap().push("undo".to_string());
            Ok::<_, String>(())
        });
        saga.commit();

        assert!(log.lock().unwrap().is_empty());
    }
}
