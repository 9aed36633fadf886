use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

/// Something a [`WorkerQueue`] can run.
///
/// `id` is a caller-chosen discriminator handed back to `run` so one `Task`
/// impl can be enqueued under different identities (e.g. "recompute rate
/// for channel 3").
pub trait Task: Send + Sync {
    fn run(&self, id: u32);
}

enum Entry<T: ?Sized> {
    Item(u32, Arc<T>),
    Shutdown,
}

struct Shared<T: ?Sized> {
    queue: Mutex<VecDeque<Entry<T>>>,
    condvar: Condvar,
}

/// A single-consumer FIFO of tasks with at-most-one-queued-per-task
/// semantics and graceful shutdown.
///
/// Offered to adapters for off-thread work, e.g. recomputing an achievable
/// sample rate without blocking the port lock.
pub struct WorkerQueue<T: ?Sized + 'static> {
    shared: Arc<Shared<T>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: ?Sized + Task + 'static> WorkerQueue<T> {
    /// Spawns the consumer thread and returns a queue to post work to it.
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
        });

        let worker = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("trc-worker-queue".into())
                .spawn(move || Self::run(&shared))
                .expect("failed to spawn worker queue thread")
        };

        WorkerQueue {
            shared,
            worker: Some(worker),
        }
    }

    fn run(shared: &Shared<T>) {
        loop {
            let entry = {
                let mut queue = shared.queue.lock().expect("worker queue mutex poisoned");
                loop {
                    if let Some(entry) = queue.pop_front() {
                        break entry;
                    }
                    queue = shared
                        .condvar
                        .wait(queue)
                        .expect("worker queue mutex poisoned");
                }
            };

            match entry {
                Entry::Shutdown => return,
                Entry::Item(id, task) => task.run(id),
            }
        }
    }

    /// Enqueues `task` under `id`. Returns `false` if an `Arc`-identical
    /// task is already queued.
    pub fn enqueue(&self, id: u32, task: Arc<T>) -> bool {
        let mut queue = self.shared.queue.lock().expect("worker queue mutex poisoned");
        let already_queued = queue.iter().any(|entry| match entry {
            Entry::Item(_, queued) => Arc::ptr_eq(queued, &task),
            Entry::Shutdown => false,
        });

        if already_queued {
            return false;
        }

        queue.push_back(Entry::Item(id, task));
        self.shared.condvar.notify_one();
        true
    }

    /// Removes `task` from the queue if present. Returns whether it was
    /// queued. Does not affect a run already in progress.
    pub fn cancel(&self, task: &Arc<T>) -> bool {
        let mut queue = self.shared.queue.lock().expect("worker queue mutex poisoned");
        let before = queue.len();
        queue.retain(|entry| match entry {
            Entry::Item(_, queued) => !Arc::ptr_eq(queued, task),
            Entry::Shutdown => true,
        });
        queue.len() != before
    }
}

impl<T: ?Sized + Task + 'static> Default for WorkerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + 'static> Drop for WorkerQueue<T> {
    fn drop(&mut self) {
        {
            let mut queue = self.shared.queue.lock().expect("worker queue mutex poisoned");
            queue.push_back(Entry::Shutdown);
            self.shared.condvar.notify_one();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct Counter(AtomicU32);
    impl Task for Counter {
        fn run(&self, id: u32) {
            self.0.fetch_add(id, Ordering::SeqCst);
        }
    }

    struct Blocker;
    impl Task for Blocker {
        fn run(&self, _id: u32) {
            thread::sleep(Duration::from_millis(200));
        }
    }

    /// Tasks enqueued are eventually run by the consumer thread.
    #[test]
    fn enqueued_task_runs() {
        let queue: WorkerQueue<dyn Task> = WorkerQueue::new();
        let task = Arc::new(Counter(AtomicU32::new(0)));
        assert!(queue.enqueue(7, Arc::clone(&task) as Arc<dyn Task>));

        let mut waited = Duration::ZERO;
        while task.0.load(Ordering::SeqCst) == 0 && waited < Duration::from_secs(1) {
            thread::sleep(Duration::from_millis(5));
            waited += Duration::from_millis(5);
        }
        assert_eq!(task.0.load(Ordering::SeqCst), 7);
    }

    /// Re-enqueueing the same task (by Arc identity) before it runs is a no-op.
    #[test]
    fn duplicate_enqueue_is_rejected() {
        let queue: WorkerQueue<dyn Task> = WorkerQueue::new();
        let task = Arc::new(Counter(AtomicU32::new(0))) as Arc<dyn Task>;

        // Block the consumer with a first task so the second enqueue races
        // against a still-queued (not yet run) first one.
        assert!(queue.enqueue(1, Arc::new(Blocker)));
        assert!(queue.enqueue(2, Arc::clone(&task)));
        assert!(!queue.enqueue(3, Arc::clone(&task)));
    }

    /// cancel() removes a still-queued task and reports that it did.
    #[test]
    fn cancel_removes_queued_task() {
        let queue: WorkerQueue<dyn Task> = WorkerQueue::new();
        let task = Arc::new(Counter(AtomicU32::new(0))) as Arc<dyn Task>;

        assert!(queue.enqueue(1, Arc::new(Blocker)));
        assert!(queue.enqueue(2, Arc::clone(&task)));
        assert!(queue.cancel(&task));
        assert!(!queue.cancel(&task));
    }
}
