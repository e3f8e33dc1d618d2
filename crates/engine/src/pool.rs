// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-size worker pool over an mpsc task channel.
//!
//! Dropping the pool closes the channel and joins the workers, so every
//! submitted task runs to completion before the drop returns.

use parking_lot::Mutex;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use weft_core::WorkError;

type Task = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    sender: Option<mpsc::Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self, WorkError> {
        if size == 0 {
            return Err(WorkError::invalid_argument(
                "worker pool size must be positive",
            ));
        }
        let (sender, receiver) = mpsc::channel::<Task>();
        let receiver = Arc::new(Mutex::new(receiver));
        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let receiver = Arc::clone(&receiver);
            let handle = thread::Builder::new()
                .name(format!("weft-worker-{id}"))
                .spawn(move || loop {
                    // The lock is held only while waiting for the next
                    // task; execution happens after the guard drops.
                    let task = receiver.lock().recv();
                    match task {
                        Ok(task) => task(),
                        Err(_) => break,
                    }
                })
                .map_err(|e| WorkError::failed("thread-spawn", e.to_string()))?;
            workers.push(handle);
        }
        Ok(WorkerPool {
            sender: Some(sender),
            workers,
        })
    }

    pub fn submit(&self, task: impl FnOnce() + Send + 'static) -> Result<(), WorkError> {
        match &self.sender {
            Some(sender) => sender
                .send(Box::new(task))
                .map_err(|_| WorkError::InvalidStatus("worker pool is shut down".to_string())),
            None => Err(WorkError::InvalidStatus(
                "worker pool is shut down".to_string(),
            )),
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Close the channel and join every worker. Idempotent.
    pub fn shutdown(&mut self) {
        self.sender.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
