//! Batching combiner for publish requests.
//!
//! Every participant takes two steps: it [`announces`] itself, receiving a
//! [`Submitter`] and a [`ResultHandle`], and later submits exactly one input
//! (or drops the submitter to leave). A single background task runs cycles:
//!
//! 1. **Idle**: wait until any announced participant's input arrives.
//! 2. **Collecting**: the batch is every participant announced before that
//!    first input was submitted. Wait for each of their inputs; later
//!    announcers belong to the next cycle, even if they announce while this
//!    one is still collecting.
//! 3. **Combining**: invoke the [`Combiner`] once with all batch inputs.
//! 4. **Delivering**: send a clone of the one outcome to every member.
//!
//! Combines never overlap. The coordinator holds no repository lock.
//!
//! [`announces`]: PublishCoordinator::announce

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::PublishError;

/// The shared operation executed once per cycle.
#[async_trait]
pub trait Combiner<I: Send + 'static, O>: Send + Sync + 'static {
    async fn combine(&self, inputs: Vec<I>) -> O;
}

/// Tuning for [`PublishCoordinator`].
#[derive(Clone, Debug, Default)]
pub struct CoordinatorConfig {
    /// How long collection waits for batch members that have announced but
    /// not submitted. `None` waits indefinitely.
    pub submit_timeout: Option<Duration>,
}

/// Coordinator lifecycle, observable through [`PublishCoordinator::phase`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Collecting,
    Combining,
    Delivering,
    Closed,
}

type Delivery<O> = oneshot::Sender<Result<O, PublishError>>;

struct Announcement<I, O> {
    id: u64,
    input: oneshot::Receiver<Stamped<I>>,
    result: Delivery<O>,
}

/// An input tagged with the number of announcements made before it was
/// submitted. Every participant with a lower id belongs to its cycle.
struct Stamped<I> {
    stamp: u64,
    input: I,
}

/// Supplies a participant's single input.
///
/// Dropping it without calling [`submit`](Submitter::submit) abandons the
/// request.
pub struct Submitter<I> {
    id: u64,
    shared: Arc<Shared>,
    tx: oneshot::Sender<Stamped<I>>,
}

impl<I> Submitter<I> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Hand the input to the coordinator.
    ///
    /// Fails with `Rejected` if the participant was already dropped from
    /// its batch (timed out, or the coordinator stopped).
    pub fn submit(self, input: I) -> Result<(), PublishError> {
        // Held across the send so every lower id is already queued.
        let announced = self.shared.lock_announced();
        self.tx
            .send(Stamped {
                stamp: *announced,
                input,
            })
            .map_err(|_| PublishError::Rejected)
    }

    /// Leave without submitting.
    pub fn abandon(self) {}
}

/// Receives the outcome shared by a participant's batch.
pub struct ResultHandle<O> {
    rx: oneshot::Receiver<Result<O, PublishError>>,
}

impl<O> ResultHandle<O> {
    pub async fn wait(self) -> Result<O, PublishError> {
        self.rx.await.unwrap_or(Err(PublishError::Stopped))
    }
}

struct Shared {
    /// Announcements accepted so far, which is also the next participant id.
    announced: Mutex<u64>,
    cycles: AtomicU64,
}

impl Shared {
    fn lock_announced(&self) -> MutexGuard<'_, u64> {
        self.announced.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Coalesces concurrent requests into one [`Combiner`] call per cycle.
pub struct PublishCoordinator<I, O> {
    tx: Mutex<Option<mpsc::UnboundedSender<Announcement<I, O>>>>,
    phase: watch::Receiver<Phase>,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<I, O> PublishCoordinator<I, O>
where
    I: Send + 'static,
    O: Clone + Send + 'static,
{
    /// Start the coordination task on the current tokio runtime.
    pub fn spawn<C: Combiner<I, O>>(combiner: C, config: CoordinatorConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (phase_tx, phase_rx) = watch::channel(Phase::Idle);
        let shared = Arc::new(Shared {
            announced: Mutex::new(0),
            cycles: AtomicU64::new(0),
        });
        let worker = Worker {
            rx,
            rx_open: true,
            combiner,
            config,
            phase: phase_tx,
            shared: Arc::clone(&shared),
            inputs: JoinSet::new(),
            members: HashMap::new(),
            ready: Vec::new(),
        };
        let task = tokio::spawn(worker.run());
        Self {
            tx: Mutex::new(Some(tx)),
            phase: phase_rx,
            shared,
            task: Mutex::new(Some(task)),
        }
    }

    /// Register a participant for the next cycle.
    pub fn announce(&self) -> Result<(Submitter<I>, ResultHandle<O>), PublishError> {
        let mut announced = self.shared.lock_announced();
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = guard.as_ref().ok_or(PublishError::Closed)?;

        let id = *announced;
        let (input_tx, input_rx) = oneshot::channel();
        let (result_tx, result_rx) = oneshot::channel();
        tx.send(Announcement {
            id,
            input: input_rx,
            result: result_tx,
        })
        .map_err(|_| PublishError::Closed)?;
        *announced += 1;

        let submitter = Submitter {
            id,
            shared: Arc::clone(&self.shared),
            tx: input_tx,
        };
        Ok((submitter, ResultHandle { rx: result_rx }))
    }

    /// Stop accepting participants. Those already announced are still
    /// collected and combined; the task exits afterwards.
    pub fn close(&self) {
        if self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            debug!("publish coordinator closing");
        }
    }

    /// Close and wait for the final cycle to finish.
    pub async fn shutdown(&self) {
        self.close();
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "publish coordinator task failed");
            }
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Number of completed combine cycles.
    pub fn cycles(&self) -> u64 {
        self.shared.cycles.load(Ordering::Relaxed)
    }
}

impl<I, O> Drop for PublishCoordinator<I, O> {
    fn drop(&mut self) {
        // Dropping the sender lets the task drain and exit on its own.
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
    }
}

struct Member<O> {
    result: Delivery<O>,
    waiter: AbortHandle,
}

struct Worker<I, O, C> {
    rx: mpsc::UnboundedReceiver<Announcement<I, O>>,
    rx_open: bool,
    combiner: C,
    config: CoordinatorConfig,
    phase: watch::Sender<Phase>,
    shared: Arc<Shared>,
    /// One task per announced participant, resolving with its input.
    inputs: JoinSet<(u64, Option<Stamped<I>>)>,
    /// Participants announced and not yet delivered to.
    members: HashMap<u64, Member<O>>,
    /// Inputs received and not yet combined, in arrival order.
    ready: Vec<(u64, Stamped<I>)>,
}

impl<I, O, C> Worker<I, O, C>
where
    I: Send + 'static,
    O: Clone + Send + 'static,
    C: Combiner<I, O>,
{
    async fn run(mut self) {
        loop {
            self.set_phase(Phase::Idle);
            if !self.await_first_input().await {
                break;
            }
            let batch = self.collect().await;
            if batch.is_empty() {
                continue;
            }

            self.set_phase(Phase::Combining);
            let (ids, inputs): (Vec<u64>, Vec<I>) = batch.into_iter().unzip();
            let outcome = self.combiner.combine(inputs).await;

            let cycle = self.shared.cycles.fetch_add(1, Ordering::Relaxed) + 1;
            info!(cycle, participants = ids.len(), "publish cycle combined");

            self.set_phase(Phase::Delivering);
            for id in &ids {
                if let Some(member) = self.members.remove(id) {
                    // The participant may have stopped waiting.
                    let _ = member.result.send(Ok(outcome.clone()));
                }
            }
        }
        self.set_phase(Phase::Closed);
        debug!("publish coordinator stopped");
    }

    /// Idle until some input is ready. Returns `false` once the channel is
    /// closed and no participant remains.
    async fn await_first_input(&mut self) -> bool {
        while self.ready.is_empty() {
            if !self.rx_open && self.inputs.is_empty() {
                return false;
            }
            tokio::select! {
                biased;
                msg = self.rx.recv(), if self.rx_open => match msg {
                    Some(a) => self.register(a),
                    None => self.rx_open = false,
                },
                Some(joined) = self.inputs.join_next() => self.on_input(joined, None),
            }
        }
        true
    }

    /// Close the batch over everyone announced before the first input was
    /// submitted and wait for their inputs. Returns the batch in arrival
    /// order.
    async fn collect(&mut self) -> Vec<(u64, I)> {
        self.set_phase(Phase::Collecting);
        let Some(cutoff) = self.ready.first().map(|(_, s)| s.stamp) else {
            return Vec::new();
        };
        // Every id below the cutoff was queued before that input was sent.
        while let Ok(a) = self.rx.try_recv() {
            self.register(a);
        }
        let (mut batch, mut next): (Vec<_>, Vec<_>) = std::mem::take(&mut self.ready)
            .into_iter()
            .partition(|(id, _)| *id < cutoff);
        let deadline = self.config.submit_timeout.map(|t| Instant::now() + t);
        debug!(cutoff, "collecting publish batch");

        loop {
            let outstanding: Vec<u64> = self
                .members
                .keys()
                .copied()
                .filter(|id| *id < cutoff && !batch.iter().any(|(b, _)| b == id))
                .collect();
            if outstanding.is_empty() {
                break;
            }
            tokio::select! {
                biased;
                Some(joined) = self.inputs.join_next() => {
                    let target = match &joined {
                        Ok((id, _)) if *id < cutoff => &mut batch,
                        _ => &mut next,
                    };
                    self.on_input(joined, Some(target));
                }
                msg = self.rx.recv(), if self.rx_open => match msg {
                    Some(a) => self.register(a),
                    None => self.rx_open = false,
                },
                _ = sleep_until(deadline) => {
                    if let Some(timeout) = self.config.submit_timeout {
                        for id in outstanding {
                            self.drop_member(id, PublishError::SubmitTimedOut(timeout));
                        }
                    }
                }
            }
        }
        self.ready = next;
        batch.into_iter().map(|(id, s)| (id, s.input)).collect()
    }

    fn register(&mut self, a: Announcement<I, O>) {
        let Announcement { id, input, result } = a;
        let waiter = self.inputs.spawn(async move { (id, input.await.ok()) });
        self.members.insert(id, Member { result, waiter });
        debug!(participant = id, "participant announced");
    }

    /// Record a finished input waiter. Inputs go to `target` (or the ready
    /// queue when `None`); closed submitters are dropped as abandoned.
    fn on_input(
        &mut self,
        joined: Result<(u64, Option<Stamped<I>>), tokio::task::JoinError>,
        target: Option<&mut Vec<(u64, Stamped<I>)>>,
    ) {
        // Cancelled waiters belong to participants already removed.
        let Ok((id, input)) = joined else { return };
        match input {
            Some(input) if self.members.contains_key(&id) => {
                debug!(participant = id, "input received");
                target.unwrap_or(&mut self.ready).push((id, input));
            }
            Some(_) => {}
            None => self.drop_member(id, PublishError::Abandoned),
        }
    }

    fn drop_member(&mut self, id: u64, reason: PublishError) {
        if let Some(member) = self.members.remove(&id) {
            warn!(participant = id, %reason, "participant dropped from batch");
            member.waiter.abort();
            let _ = member.result.send(Err(reason));
        }
    }

    fn set_phase(&self, phase: Phase) {
        self.phase.send_replace(phase);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    type Batch = PublishCoordinator<u32, Vec<u32>>;

    /// Returns the sorted batch and counts invocations.
    #[derive(Default)]
    struct Recording {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Combiner<u32, Vec<u32>> for Recording {
        async fn combine(&self, mut inputs: Vec<u32>) -> Vec<u32> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            inputs.sort();
            inputs
        }
    }

    struct Failing {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Combiner<u32, Result<(), String>> for Failing {
        async fn combine(&self, _inputs: Vec<u32>) -> Result<(), String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err("rejected: non-fast-forward".into())
        }
    }

    /// Blocks each combine until released, reporting when it starts.
    struct Gated {
        started: mpsc::UnboundedSender<Vec<u32>>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl Combiner<u32, Vec<u32>> for Gated {
        async fn combine(&self, inputs: Vec<u32>) -> Vec<u32> {
            let _ = self.started.send(inputs.clone());
            self.release.notified().await;
            inputs
        }
    }

    #[tokio::test]
    async fn concurrent_participants_share_one_combine() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coord = Batch::spawn(
            Recording { calls: Arc::clone(&calls) },
            CoordinatorConfig::default(),
        );

        let handles: Vec<_> = (0..5).map(|_| coord.announce().unwrap()).collect();
        let mut results = Vec::new();
        for (i, (submitter, result)) in handles.into_iter().enumerate() {
            submitter.submit(i as u32).unwrap();
            results.push(result);
        }
        for result in results {
            assert_eq!(result.wait().await.unwrap(), vec![0, 1, 2, 3, 4]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coord.cycles(), 1);
    }

    #[tokio::test]
    async fn failure_outcome_is_shared() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coord: PublishCoordinator<u32, Result<(), String>> = PublishCoordinator::spawn(
            Failing { calls: Arc::clone(&calls) },
            CoordinatorConfig::default(),
        );

        let (s1, r1) = coord.announce().unwrap();
        let (s2, r2) = coord.announce().unwrap();
        let (s3, r3) = coord.announce().unwrap();
        s2.submit(2).unwrap();
        s1.submit(1).unwrap();
        s3.submit(3).unwrap();

        let expected = Err("rejected: non-fast-forward".to_string());
        assert_eq!(r1.wait().await.unwrap(), expected);
        assert_eq!(r2.wait().await.unwrap(), expected);
        assert_eq!(r3.wait().await.unwrap(), expected);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_tasks_are_coalesced() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coord = Arc::new(Batch::spawn(
            Recording { calls: Arc::clone(&calls) },
            CoordinatorConfig::default(),
        ));
        let barrier = Arc::new(tokio::sync::Barrier::new(4));

        let mut tasks = Vec::new();
        for i in 0..4u32 {
            let coord = Arc::clone(&coord);
            let barrier = Arc::clone(&barrier);
            tasks.push(tokio::spawn(async move {
                let (submitter, result) = coord.announce().unwrap();
                // Everyone is announced before anyone submits.
                barrier.wait().await;
                submitter.submit(i).unwrap();
                result.wait().await.unwrap()
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap(), vec![0, 1, 2, 3]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn late_announcer_joins_next_cycle() {
        let (started_tx, mut started) = mpsc::unbounded_channel();
        let release = Arc::new(Notify::new());
        let coord = Batch::spawn(
            Gated {
                started: started_tx,
                release: Arc::clone(&release),
            },
            CoordinatorConfig::default(),
        );

        let (s1, r1) = coord.announce().unwrap();
        s1.submit(1).unwrap();
        assert_eq!(started.recv().await.unwrap(), vec![1]);
        assert_eq!(coord.phase(), Phase::Combining);

        // Announced while the first batch is combining.
        let (s2, r2) = coord.announce().unwrap();
        s2.submit(2).unwrap();
        release.notify_one();
        assert_eq!(r1.wait().await.unwrap(), vec![1]);

        assert_eq!(started.recv().await.unwrap(), vec![2]);
        release.notify_one();
        assert_eq!(r2.wait().await.unwrap(), vec![2]);
        assert_eq!(coord.cycles(), 2);
    }

    #[tokio::test]
    async fn announcer_after_first_input_waits_for_next_cycle() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coord = Batch::spawn(
            Recording { calls: Arc::clone(&calls) },
            CoordinatorConfig::default(),
        );

        let (s1, r1) = coord.announce().unwrap();
        s1.submit(1).unwrap();
        // Announced after the first input and never submitted in this cycle.
        let (s2, r2) = coord.announce().unwrap();

        let first = tokio::time::timeout(Duration::from_secs(2), r1.wait())
            .await
            .expect("first batch must not wait on a later announcer");
        assert_eq!(first.unwrap(), vec![1]);
        assert_eq!(coord.cycles(), 1);

        s2.submit(2).unwrap();
        assert_eq!(r2.wait().await.unwrap(), vec![2]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn abandoned_participant_leaves_batch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coord = Batch::spawn(
            Recording { calls: Arc::clone(&calls) },
            CoordinatorConfig::default(),
        );

        let (s1, r1) = coord.announce().unwrap();
        let (s2, r2) = coord.announce().unwrap();
        s2.abandon();
        s1.submit(7).unwrap();

        assert_eq!(r1.wait().await.unwrap(), vec![7]);
        assert_eq!(r2.wait().await.unwrap_err(), PublishError::Abandoned);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn announce_after_close_is_rejected() {
        let coord = Batch::spawn(Recording::default(), CoordinatorConfig::default());
        let (s1, r1) = coord.announce().unwrap();
        coord.close();

        assert_eq!(coord.announce().err(), Some(PublishError::Closed));

        // Participants announced before close still complete.
        s1.submit(3).unwrap();
        assert_eq!(r1.wait().await.unwrap(), vec![3]);
        coord.shutdown().await;
        assert_eq!(coord.phase(), Phase::Closed);
    }

    #[tokio::test]
    async fn shutdown_with_no_participants_stops_task() {
        let coord = Batch::spawn(Recording::default(), CoordinatorConfig::default());
        coord.shutdown().await;
        assert_eq!(coord.phase(), Phase::Closed);
        assert_eq!(coord.cycles(), 0);
    }

    #[tokio::test]
    async fn straggler_times_out() {
        let timeout = Duration::from_millis(50);
        let coord = Batch::spawn(
            Recording::default(),
            CoordinatorConfig {
                submit_timeout: Some(timeout),
            },
        );

        let (s1, r1) = coord.announce().unwrap();
        let (s2, r2) = coord.announce().unwrap();
        s1.submit(1).unwrap();

        assert_eq!(r1.wait().await.unwrap(), vec![1]);
        assert_eq!(r2.wait().await.unwrap_err(), PublishError::SubmitTimedOut(timeout));
        assert_eq!(coord.cycles(), 1);
        drop(s2);
    }

    #[tokio::test]
    async fn dropped_result_handle_does_not_stall_cycle() {
        let coord = Batch::spawn(Recording::default(), CoordinatorConfig::default());
        let (s1, r1) = coord.announce().unwrap();
        let (s2, r2) = coord.announce().unwrap();
        drop(r1);
        s1.submit(1).unwrap();
        s2.submit(2).unwrap();
        assert_eq!(r2.wait().await.unwrap(), vec![1, 2]);
    }
}
