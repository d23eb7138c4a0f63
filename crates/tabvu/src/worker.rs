//! Cancellable foreground query execution.
//!
//! One worker per user-triggered run. Cancellation is terminal: once
//! [`QueryWorker::cancel`] is called, neither a success nor an error
//! outcome is delivered for that request - the result channel just
//! closes. Keeping only one worker in flight per user action is the
//! outer surface's job, not enforced here.

use crate::TabvuError;
use crate::client::QueryGateway;
use crate::model::Record;
use crate::request::QueryRequest;
use diagnostics::*;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct QueryWorker {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl QueryWorker {
    /// Starts the query on a background task. The outcome, success or
    /// error, arrives on `results` - unless the worker is cancelled
    /// first, in which case the sender is dropped unsent.
    pub fn spawn(
        gateway: Arc<dyn QueryGateway>,
        request: QueryRequest,
        results: oneshot::Sender<Result<Vec<Record>, TabvuError>>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => {
                    debug!("query cancelled while in flight");
                    return;
                }
                outcome = gateway.query_datasource(&request) => outcome,
            };
            // cancel() may have landed between response and delivery
            if token.is_cancelled() {
                debug!("query cancelled after completion, suppressing outcome");
                return;
            }
            let _ = results.send(outcome);
        });
        Self { cancel, task }
    }

    /// Cancels this request. Terminal: no outcome will be delivered
    /// afterwards.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct SlowGateway {
        delay: Duration,
    }

    #[async_trait]
    impl QueryGateway for SlowGateway {
        async fn query_datasource(
            &self,
            _request: &QueryRequest,
        ) -> Result<Vec<Record>, TabvuError> {
            tokio::time::sleep(self.delay).await;
            Ok(vec![Record::new()])
        }
    }

    fn request() -> QueryRequest {
        QueryRequest {
            payload: json!({}),
            warnings: vec![],
        }
    }

    #[tokio::test]
    async fn test_cancel_suppresses_any_outcome() {
        let gateway = Arc::new(SlowGateway {
            delay: Duration::from_millis(200),
        });
        let (sender, receiver) = oneshot::channel();
        let worker = QueryWorker::spawn(gateway, request(), sender);

        tokio::time::sleep(Duration::from_millis(10)).await;
        worker.cancel();

        // the sender is dropped without ever sending; no success and no
        // error is observable
        assert!(receiver.await.is_err());
    }

    #[tokio::test]
    async fn test_uncancelled_worker_delivers_result() {
        let gateway = Arc::new(SlowGateway {
            delay: Duration::from_millis(5),
        });
        let (sender, receiver) = oneshot::channel();
        let _worker = QueryWorker::spawn(gateway, request(), sender);

        let outcome = receiver.await.expect("outcome should be delivered");
        assert_eq!(outcome.unwrap().len(), 1);
    }
}
