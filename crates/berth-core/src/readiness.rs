//! Fail-fast readiness checks for the servers of one machine.
//!
//! Every checked server gets its own probe thread. Probes report through a
//! single channel and `wait` counts results down, returning on the first
//! failure without waiting for the other probes. Abandoned probes are not
//! cancelled; they finish on their own timer and their result is dropped.

use crate::probe::ProbeFactory;
use berth_model::{InfrastructureError, Server};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info};

/// Server references whose readiness is checked. Other servers are ignored.
pub const READINESS_SERVERS: &[&str] = &["wsagent", "exec-agent", "terminal"];

type Handler = Arc<dyn Fn(&str) + Send + Sync>;

pub struct ServerReadinessChecker {
    machine: String,
    servers: BTreeMap<String, Server>,
    factory: Arc<dyn ProbeFactory>,
    results: Option<Receiver<Result<String, InfrastructureError>>>,
    remaining: usize,
    started: bool,
}

impl ServerReadinessChecker {
    pub fn new(
        machine: impl Into<String>,
        servers: &BTreeMap<String, Server>,
        factory: Arc<dyn ProbeFactory>,
    ) -> Self {
        let servers = servers
            .iter()
            .filter(|(reference, _)| READINESS_SERVERS.contains(&reference.as_str()))
            .map(|(reference, server)| (reference.clone(), server.clone()))
            .collect();
        Self {
            machine: machine.into(),
            servers,
            factory,
            results: None,
            remaining: 0,
            started: false,
        }
    }

    /// References that will be probed.
    pub fn checked_servers(&self) -> Vec<&str> {
        self.servers.keys().map(String::as_str).collect()
    }

    /// Spawn one probe per checked server and return immediately.
    ///
    /// `handler` receives the reference of each server that became
    /// available, on the probe's thread, in completion order. It is not
    /// called for failed probes nor after any probe has failed.
    pub fn start_async<F>(&mut self, handler: F) -> Result<(), InfrastructureError>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        if self.started {
            return Err(InfrastructureError::new(format!(
                "Readiness check of machine {} was already started",
                self.machine
            )));
        }
        self.started = true;

        let handler: Handler = Arc::new(handler);
        let failed = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();

        for (reference, server) in &self.servers {
            let probe = self.factory.create(&self.machine, reference, server);
            let tx = tx.clone();
            let handler = Arc::clone(&handler);
            let failed = Arc::clone(&failed);
            let reference = reference.clone();
            let machine = self.machine.clone();
            debug!(machine = %machine, server = %reference, url = %server.url, "starting probe");
            thread::spawn(move || {
                let result = match probe.check() {
                    Ok(()) => {
                        if !failed.load(Ordering::SeqCst) {
                            handler(&reference);
                        }
                        Ok(reference)
                    }
                    Err(e) => {
                        failed.store(true, Ordering::SeqCst);
                        Err(e)
                    }
                };
                // The receiver is gone once `wait` has returned early.
                let _ = tx.send(result);
            });
        }

        self.remaining = self.servers.len();
        self.results = Some(rx);
        Ok(())
    }

    /// Block until every probe succeeded or one failed.
    pub fn wait(&mut self) -> Result<(), InfrastructureError> {
        let Some(results) = self.results.take() else {
            return Err(InfrastructureError::new(format!(
                "Readiness check of machine {} is not running",
                self.machine
            )));
        };

        while self.remaining > 0 {
            match results.recv() {
                Ok(Ok(reference)) => {
                    self.remaining -= 1;
                    debug!(machine = %self.machine, server = %reference, remaining = self.remaining, "server ready");
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    return Err(InfrastructureError::new(format!(
                        "Readiness probes of machine {} terminated unexpectedly",
                        self.machine
                    )))
                }
            }
        }
        info!(machine = %self.machine, "all servers ready");
        Ok(())
    }
}
