use std::{
    any::Any,
    io,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{
    phase_barrier::{CountDownGuard, PhaseBarrier, PhaseError},
    task_queue::{Task, TaskQueue},
};

/// A task together with the barrier of the phase that submitted it.
pub struct Job {
    task: Task,
    barrier: Arc<PhaseBarrier>,
}

/// Fixed set of long-lived threads draining one shared queue.
///
/// No priorities and no work stealing. Workers live until the pool is dropped.
pub struct WorkerPool {
    queue: Arc<TaskQueue<Job>>,
    workers: Vec<JoinHandle<()>>,
    stalled: AtomicBool,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> io::Result<Self> {
        let queue = Arc::new(TaskQueue::new());
        let mut workers = Vec::with_capacity(worker_count);
        for i in 0..worker_count.max(1) {
            let worker_queue = Arc::clone(&queue);
            let worker = thread::Builder::new()
                .name(format!("mesh-masher-worker-{i}"))
                .spawn(move || worker_loop(&worker_queue));
            match worker {
                Ok(worker) => workers.push(worker),
                Err(err) => {
                    queue.close();
                    return Err(err);
                }
            }
        }
        log::debug!("Started {} worker threads", workers.len());
        Ok(Self {
            queue,
            workers,
            stalled: AtomicBool::new(false),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Queues a task that counts `barrier` down once it is done.
    pub fn submit(&self, barrier: &Arc<PhaseBarrier>, task: Task) {
        let job = Job {
            task,
            barrier: Arc::clone(barrier),
        };
        if let Err(job) = self.queue.push(job) {
            log::error!(
                "Worker queue is closed, dropping task {:?}",
                job.task.label()
            );
            job.barrier.count_down();
        }
    }

    /// Submits a whole phase and blocks until all of its tasks completed.
    ///
    /// The barrier is sized before the first task is queued, so it can never drain early.
    pub fn run_phase(
        &self,
        phase: &str,
        tasks: Vec<Task>,
        timeout: Option<Duration>,
    ) -> Result<(), PhaseError> {
        let barrier = Arc::new(PhaseBarrier::new(phase, tasks.len()));
        log::debug!("Phase {:?}: {} tasks", phase, tasks.len());
        for task in tasks {
            self.submit(&barrier, task);
        }
        let result = barrier.wait_for(timeout);
        if result.is_err() {
            // Whatever is still running may never finish, so don't wait for it on drop.
            self.stalled.store(true, Ordering::Release);
            self.queue.close();
        }
        result
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.queue.close();
        if self.stalled.load(Ordering::Acquire) {
            log::warn!("Leaving {} stalled worker threads behind", self.workers.len());
            return;
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("A worker thread panicked outside of a task");
            }
        }
    }
}

fn worker_loop(queue: &TaskQueue<Job>) {
    while let Some(Job { task, barrier }) = queue.pop() {
        let _count_down = CountDownGuard::new(&barrier);
        let label = task.label().to_string();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task.execute())) {
            log::error!("Task {:?} panicked: {}", label, panic_message(&*payload));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use parking_lot::Mutex;

    use super::*;
    use crate::slot::{take_all, Slot};

    #[test]
    fn phase_fills_every_slot_before_returning() {
        let pool = WorkerPool::new(4).unwrap();
        let slots: Vec<_> = (0..64).map(|_| Slot::new()).collect();
        let tasks = slots
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                let slot = Arc::clone(slot);
                Task::new(format!("square {i}"), move || slot.fill(i * i))
            })
            .collect();

        pool.run_phase("squares", tasks, None).unwrap();

        let values = take_all(&slots).unwrap();
        assert_eq!(values, (0..64).map(|i| i * i).collect::<Vec<_>>());
    }

    #[test]
    fn single_worker_runs_tasks_in_submission_order() {
        let pool = WorkerPool::new(1).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        let tasks = (0..10)
            .map(|i| {
                let order = Arc::clone(&order);
                Task::new("record", move || order.lock().push(i))
            })
            .collect();
        pool.run_phase("ordered", tasks, None).unwrap();
        assert_eq!(*order.lock(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn panicking_task_still_completes_its_phase() {
        let pool = WorkerPool::new(2).unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        let mut tasks = vec![Task::new("boom", || panic!("broken input"))];
        for _ in 0..5 {
            let done = Arc::clone(&done);
            tasks.push(Task::new("ok", move || {
                done.fetch_add(1, Ordering::SeqCst);
            }));
        }

        pool.run_phase("mixed", tasks, Some(Duration::from_secs(10)))
            .unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 5);

        // The worker that caught the panic keeps serving later phases.
        let slot = Slot::new();
        let task = {
            let slot = Arc::clone(&slot);
            Task::new("after", move || slot.fill(()))
        };
        pool.run_phase("after", vec![task], Some(Duration::from_secs(10)))
            .unwrap();
        assert!(slot.is_filled());
    }

    #[test]
    fn stuck_phase_surfaces_as_timeout() {
        let pool = WorkerPool::new(1).unwrap();
        let release = Arc::new(AtomicBool::new(false));
        let task = {
            let release = Arc::clone(&release);
            Task::new("spin", move || {
                while !release.load(Ordering::Acquire) {
                    thread::sleep(Duration::from_millis(1));
                }
            })
        };
        let result = pool.run_phase("stuck", vec![task], Some(Duration::from_millis(20)));
        assert!(matches!(result, Err(PhaseError::Timeout { remaining: 1, .. })));
        release.store(true, Ordering::Release);
    }

    #[test]
    fn zero_workers_still_gets_one_thread() {
        let pool = WorkerPool::new(0).unwrap();
        assert_eq!(pool.worker_count(), 1);
    }
}
