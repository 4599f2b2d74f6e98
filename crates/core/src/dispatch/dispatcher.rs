use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::analysis::domain::frame_analyzer::{FrameAnalyzer, Job};
use crate::dispatch::admission::AdmissionTicket;
use crate::dispatch::job_result::JobResult;
use crate::pool::instance_pool::InstancePool;
use crate::stats::stats_registry::StatsRegistry;

pub type Engine = Box<dyn FrameAnalyzer>;

enum WorkerEvent {
    /// A worker holds an engine for the job; it will run to completion.
    Claimed,
    Finished(JobResult),
}

struct Envelope {
    job: Job,
    ticket: Arc<AdmissionTicket>,
    admission_deadline: Instant,
    /// Reported when no engine is claimed by `admission_deadline`.
    on_expiry: JobResult,
    reply: Sender<WorkerEvent>,
}

/// Stand-in for deadlines too far away to represent.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Runs jobs on a fixed set of worker threads, one engine per running job.
///
/// Layout: `callers → unbounded queue → N workers ⇄ InstancePool(N)`
///
/// Callers block in [`Dispatcher::submit`] until their job is finished or
/// one of its deadlines passes. A job that has not reached an engine by its
/// admission deadline is abandoned and never runs. A job that has is never
/// interrupted: if its caller stops waiting, it finishes in the background
/// and its engine goes back to the pool.
pub struct Dispatcher {
    queue: Option<Sender<Envelope>>,
    pool: InstancePool<Engine>,
    workers: Vec<JoinHandle<()>>,
    stats: Arc<StatsRegistry>,
}

impl Dispatcher {
    /// Spawns one worker per engine.
    pub fn new(engines: Vec<Engine>, stats: Arc<StatsRegistry>) -> Self {
        let pool = InstancePool::new(engines);
        let (queue_tx, queue_rx) = crossbeam_channel::unbounded::<Envelope>();
        let workers = (0..pool.capacity())
            .map(|index| spawn_worker(index, pool.clone(), queue_rx.clone()))
            .collect();

        log::info!("Dispatcher started with {} workers", pool.capacity());
        Self {
            queue: Some(queue_tx),
            pool,
            workers,
            stats,
        }
    }

    /// Runs `job` on a pooled engine and waits for its result.
    ///
    /// `pool_timeout` bounds the wait for an engine, counted from the job's
    /// submission time and including time spent queued. `job_timeout` bounds
    /// the whole wait for a result, also from submission.
    pub fn submit(&self, job: Job, pool_timeout: Duration, job_timeout: Duration) -> JobResult {
        let _in_flight = self.stats.enter();
        let result = self.run(job, pool_timeout, job_timeout);
        self.stats.record(&result);
        result
    }

    pub fn available_workers(&self) -> usize {
        self.pool.available_count()
    }

    pub fn max_workers(&self) -> usize {
        self.pool.capacity()
    }

    pub fn stats(&self) -> &Arc<StatsRegistry> {
        &self.stats
    }

    /// Stops accepting jobs and waits for the workers to drain the queue.
    pub fn shutdown(&mut self) {
        if self.queue.take().is_none() {
            return;
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("Analysis worker exited abnormally");
            }
        }
        log::info!("Dispatcher stopped");
    }

    fn run(&self, job: Job, pool_timeout: Duration, job_timeout: Duration) -> JobResult {
        let Some(queue) = self.queue.as_ref() else {
            return JobResult::EngineFailure("Dispatcher is shut down".into());
        };

        let result_deadline = deadline(job.submitted_at, job_timeout);
        let admission_deadline = deadline(job.submitted_at, pool_timeout).min(result_deadline);
        // Running out of admission time is a pool timeout only while the
        // pool wait is the tighter of the two limits.
        let on_expiry = if pool_timeout < job_timeout {
            JobResult::PoolTimeout
        } else {
            JobResult::AnalysisTimeout
        };
        let student_id = job.student_id.clone();
        let ticket = Arc::new(AdmissionTicket::new());
        let (reply_tx, reply_rx) = crossbeam_channel::bounded::<WorkerEvent>(2);

        let envelope = Envelope {
            job,
            ticket: Arc::clone(&ticket),
            admission_deadline,
            on_expiry: on_expiry.clone(),
            reply: reply_tx,
        };
        if queue.send(envelope).is_err() {
            return JobResult::EngineFailure("No analysis workers running".into());
        }

        match reply_rx.recv_deadline(admission_deadline) {
            Ok(WorkerEvent::Claimed) => {}
            Ok(WorkerEvent::Finished(result)) => return result,
            Err(RecvTimeoutError::Timeout) => {
                if ticket.abandon() {
                    log::warn!(
                        "No engine available for student {student_id} within {:?}",
                        pool_timeout.min(job_timeout)
                    );
                    return on_expiry;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                return JobResult::EngineFailure("Analysis worker dropped the job".into());
            }
        }

        loop {
            match reply_rx.recv_deadline(result_deadline) {
                Ok(WorkerEvent::Claimed) => continue,
                Ok(WorkerEvent::Finished(result)) => return result,
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!(
                        "Analysis for student {student_id} exceeded {job_timeout:?}; finishing in background"
                    );
                    return JobResult::AnalysisTimeout;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return JobResult::EngineFailure("Analysis worker dropped the job".into());
                }
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_worker(
    index: usize,
    pool: InstancePool<Engine>,
    jobs: Receiver<Envelope>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for envelope in jobs {
            serve(&pool, envelope);
        }
        log::debug!("Analysis worker {index} exiting");
    })
}

fn serve(pool: &InstancePool<Engine>, envelope: Envelope) {
    let Envelope {
        job,
        ticket,
        admission_deadline,
        on_expiry,
        reply,
    } = envelope;

    if !ticket.is_pending() {
        log::debug!("Skipping abandoned job for student {}", job.student_id);
        return;
    }

    let budget = admission_deadline.saturating_duration_since(Instant::now());
    let mut engine = match pool.acquire(budget) {
        Ok(engine) => engine,
        Err(_) => {
            if ticket.abandon() {
                let _ = reply.send(WorkerEvent::Finished(on_expiry));
            }
            return;
        }
    };
    if !ticket.claim() {
        return;
    }
    let _ = reply.send(WorkerEvent::Claimed);

    let outcome = catch_unwind(AssertUnwindSafe(|| engine.analyze(&job)));
    drop(engine);

    let result = match outcome {
        Ok(Ok(analysis)) => JobResult::Success(analysis),
        Ok(Err(e)) => {
            log::warn!("Analysis failed for student {}: {e}", job.student_id);
            JobResult::EngineFailure(e.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::error!("Engine panicked for student {}: {message}", job.student_id);
            JobResult::EngineFailure(message)
        }
    };
    let _ = reply.send(WorkerEvent::Finished(result));
}

/// `start + timeout`, saturating at a far-future instant.
fn deadline(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Engine panicked".to_string())
}
