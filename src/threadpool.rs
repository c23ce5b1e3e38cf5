use log::{debug, warn};
use std::sync::mpsc::Receiver;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use crate::error::{Error, Result};

/// Fixed set of worker threads pulling boxed jobs off a shared channel.
///
/// Dropping the pool closes the channel and joins every worker, so all
/// jobs submitted before the drop have run once it returns.
pub struct ThreadPool {
    tx: Option<mpsc::Sender<Job>>,
    threads: Vec<Worker>,
}

impl ThreadPool {
    pub fn new(n_workers: usize) -> Self {
        let n_workers = n_workers.max(1);
        let (tx, rx) = mpsc::channel();
        let rx = Arc::new(Mutex::new(rx));

        let mut handles = Vec::with_capacity(n_workers);

        for id in 0..n_workers {
            handles.push(Worker::new(id, Arc::clone(&rx)));
        }

        debug!("Started thread pool with {} workers", n_workers);

        ThreadPool {
            tx: Some(tx),
            threads: handles,
        }
    }

    /// One worker per available core.
    pub fn with_available_parallelism() -> Self {
        let n = thread::available_parallelism().map_or(1, |n| n.get());
        Self::new(n)
    }

    pub fn size(&self) -> usize {
        self.threads.len()
    }

    pub fn execute<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.tx {
            Some(tx) => tx.send(Box::new(f)).map_err(|_| Error::PoolClosed),
            None => Err(Error::PoolClosed),
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        drop(self.tx.take());

        for worker in &mut self.threads {
            if let Some(handle) = worker.thread.take() {
                if handle.join().is_err() {
                    warn!("Worker {} panicked", worker.id);
                }
            }
        }
    }
}

struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn new(id: usize, rx: Arc<Mutex<Receiver<Job>>>) -> Self {
        let handle = thread::spawn(move || loop {
            let msg = match rx.lock() {
                Ok(rx) => rx.recv(),
                Err(_) => break,
            };

            match msg {
                Ok(job) => {
                    job();
                }
                Err(_) => {
                    break;
                }
            }
        });

        Worker {
            id,
            thread: Some(handle),
        }
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;
