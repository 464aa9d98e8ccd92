//! Worker pool for capture processing
//!
//! A fixed pool of threads pulls capture ids from a shared queue, each
//! running one job at a time through the orchestrator. Stages within a job
//! stay strictly sequential; parallelism exists only across jobs.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::pipeline::Orchestrator;
use crate::{PipelineError, Result};

/// Pool of capture processing workers
pub struct WorkerPool {
    sender: Option<Sender<String>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `workers` threads serving the queue
    pub fn start(orchestrator: Arc<Orchestrator>, workers: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<String>();
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|worker_id| {
                let queue = Arc::clone(&receiver);
                let orchestrator = Arc::clone(&orchestrator);
                std::thread::spawn(move || worker_loop(worker_id, queue, orchestrator))
            })
            .collect();

        Self {
            sender: Some(sender),
            handles,
        }
    }

    /// Enqueue a capture for processing
    pub fn enqueue(&self, capture_id: impl Into<String>) -> Result<()> {
        let sender = self.sender.as_ref().ok_or_else(|| {
            PipelineError::Processing("Worker pool is shut down".to_string())
        })?;
        sender
            .send(capture_id.into())
            .map_err(|e| PipelineError::Processing(format!("Worker queue closed: {e}")))
    }

    /// Drain the queue and join all workers
    pub fn shutdown(mut self) {
        self.sender.take();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("Worker thread panicked during shutdown");
            }
        }
    }
}

fn worker_loop(
    worker_id: usize,
    queue: Arc<Mutex<Receiver<String>>>,
    orchestrator: Arc<Orchestrator>,
) {
    log::debug!("Worker {worker_id} started");
    loop {
        let capture_id = match queue.lock() {
            Ok(guard) => guard.recv(),
            Err(_) => break,
        };

        let capture_id = match capture_id {
            Ok(id) => id,
            // Channel closed: pool is shutting down
            Err(_) => break,
        };

        match orchestrator.process(&capture_id) {
            Ok(job) => {
                log::info!("Worker {worker_id} finished capture {capture_id}: {}", job.status)
            }
            Err(e) => {
                log::error!("Worker {worker_id} could not process capture {capture_id}: {e}")
            }
        }
    }
    log::debug!("Worker {worker_id} stopped");
}
