use crate::{Connection, OrderRequest, OrderStore, RowCounts, WorkloadError};
use futures::FutureExt;
use std::{
    fmt,
    future::Future,
    pin::{Pin, pin},
    time::Duration,
};
use tokio::time::{sleep, timeout};

/// Pacing and cap of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    /// Pause between two consecutive orders.
    pub interval: Duration,
    /// Stop after this many orders, unlimited when `None`.
    pub max_orders: Option<u64>,
    /// Time left to the order in flight once `shutdown` resolves, after
    /// which it is dropped and its transaction rolled back.
    pub grace: Duration,
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_orders: None,
            grace: Duration::from_secs(5),
        }
    }
}

#[derive(Debug)]
pub enum StopReason {
    /// The requests ran out or the cap was reached.
    Completed,
    /// The shutdown future resolved.
    Interrupted,
    Failed(WorkloadError),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Completed => f.write_str("completed"),
            StopReason::Interrupted => f.write_str("stopped by user"),
            StopReason::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    /// Counts before the first order, `None` if they could not be read.
    pub initial: Option<RowCounts>,
    /// Counts after the last order, `None` if they could not be read.
    pub last: Option<RowCounts>,
    pub inserted: u64,
    pub stop: StopReason,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        !matches!(self.stop, StopReason::Failed(..))
    }
}

impl Workload {
    fn reached_cap(&self, inserted: u64) -> bool {
        self.max_orders.is_some_and(|max| inserted >= max)
    }

    /// Feed `requests` to the store until they run out, the cap is reached,
    /// `shutdown` resolves or an order fails.
    ///
    /// An order in flight when `shutdown` resolves gets [`Workload::grace`] to
    /// commit or roll back, then it is abandoned. The connection is closed on
    /// every path.
    pub async fn run<C, I, F>(&self, mut store: OrderStore<C>, requests: I, shutdown: F) -> RunReport
    where
        C: Connection,
        I: IntoIterator<Item = OrderRequest>,
        F: Future<Output = ()>,
    {
        let mut shutdown = pin!(shutdown);
        let mut inserted = 0;
        let (initial, stop) = match store.get_counts().await {
            Ok(counts) => {
                log::info!("Initial counts - {}", counts);
                let stop = self
                    .run_loop(&mut store, requests, &mut shutdown, &mut inserted)
                    .await;
                (Some(counts), stop)
            }
            Err(e) => (None, StopReason::Failed(e)),
        };
        match &stop {
            StopReason::Completed => log::info!("Reached the end of the workload, stopping"),
            StopReason::Interrupted => log::info!("Workload stopped by user"),
            StopReason::Failed(e) => log::error!("Workload error: {}", e),
        }
        let last = match store.get_counts().await {
            Ok(counts) => {
                log::info!("Final counts - {}", counts);
                Some(counts)
            }
            Err(e) => {
                log::error!("{:#}", anyhow::Error::from(e));
                None
            }
        };
        log::info!("Inserted {} new orders during this run", inserted);
        if let Err(e) = store.close().await {
            log::error!("Could not close the connection: {:#}", e);
        }
        RunReport {
            initial,
            last,
            inserted,
            stop,
        }
    }

    async fn run_loop<C, I, F>(
        &self,
        store: &mut OrderStore<C>,
        requests: I,
        shutdown: &mut Pin<&mut F>,
        inserted: &mut u64,
    ) -> StopReason
    where
        C: Connection,
        I: IntoIterator<Item = OrderRequest>,
        F: Future<Output = ()>,
    {
        let mut requests = requests.into_iter();
        loop {
            if shutdown.as_mut().now_or_never().is_some() {
                return StopReason::Interrupted;
            }
            if self.reached_cap(*inserted) {
                return StopReason::Completed;
            }
            let Some(order) = requests.next() else {
                return StopReason::Completed;
            };
            let (result, interrupted) = {
                let mut insert = pin!(store.insert(&order));
                tokio::select! {
                    result = insert.as_mut() => (Some(result), false),
                    _ = shutdown.as_mut() => {
                        log::info!(
                            "Stopping, waiting up to {:?} for the order in flight",
                            self.grace
                        );
                        match timeout(self.grace, insert.as_mut()).await {
                            Ok(result) => (Some(result), true),
                            Err(..) => {
                                log::warn!(
                                    "The order in flight did not finish in {:?}, rolling it back",
                                    self.grace
                                );
                                (None, true)
                            }
                        }
                    }
                }
            };
            match result {
                None => {}
                Some(Ok(order_id)) => {
                    *inserted += 1;
                    log::info!(
                        "Order #{} inserted - {} shares @ ${:.2}",
                        order_id,
                        order.shares,
                        order.cost
                    );
                }
                Some(Err(e)) => return StopReason::Failed(e),
            }
            if interrupted {
                return StopReason::Interrupted;
            }
            if self.reached_cap(*inserted) {
                return StopReason::Completed;
            }
            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = shutdown.as_mut() => return StopReason::Interrupted,
            }
        }
    }
}
