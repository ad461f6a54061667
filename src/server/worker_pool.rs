//! Worker Pool
//!
//! OS threads that execute queued commands, optionally pinned to CPU cores.

use std::io;
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

use super::command_queue::{CommandQueue, WorkItem};
use super::handler::Executor;

/// Worker pool configuration
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of worker threads (0 = auto-detect)
    pub num_workers: usize,
    /// Whether to pin workers to CPU cores
    pub pin_to_cores: bool,
    /// Command queue capacity
    pub queue_capacity: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            pin_to_cores: false,
            queue_capacity: 10_000,
        }
    }
}

/// Multi-threaded worker pool
pub struct WorkerPool {
    config: WorkerPoolConfig,
    queue: CommandQueue,
    executor: Executor,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(config: WorkerPoolConfig, executor: Executor) -> Self {
        let queue = CommandQueue::new(config.queue_capacity.max(1));
        Self {
            config,
            queue,
            executor,
            handles: Vec::new(),
        }
    }

    /// Spawn the worker threads
    pub fn start(&mut self) -> io::Result<()> {
        let num_workers = if self.config.num_workers == 0 {
            num_cpus::get()
        } else {
            self.config.num_workers
        };

        info!("Starting {} worker threads", num_workers);

        let core_ids = if self.config.pin_to_cores {
            core_affinity::get_core_ids().unwrap_or_default()
        } else {
            Vec::new()
        };

        for i in 0..num_workers {
            let receiver = self.queue.receiver();
            let executor = self.executor.clone();
            let core_id = core_ids.get(i).copied();

            let handle = thread::Builder::new()
                .name(format!("glove-worker-{}", i))
                .spawn(move || {
                    if let Some(core) = core_id {
                        if core_affinity::set_for_current(core) {
                            debug!("Worker {} pinned to core {:?}", i, core);
                        }
                    }

                    debug!("Worker {} started", i);
                    Self::worker_loop(i, receiver, executor);
                    debug!("Worker {} stopped", i);
                })?;

            self.handles.push(handle);
        }
        Ok(())
    }

    /// Queue shared with connection handlers
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    fn worker_loop(
        worker_id: usize,
        receiver: crossbeam::channel::Receiver<WorkItem>,
        executor: Executor,
    ) {
        while let Ok(work_item) = receiver.recv() {
            let response = executor.execute(work_item.command);
            if work_item.response_tx.send(response).is_err() {
                debug!(
                    request_id = work_item.request_id,
                    "Worker {}: response channel closed", worker_id
                );
            }
        }
    }

    pub fn num_workers(&self) -> usize {
        self.handles.len()
    }
}
