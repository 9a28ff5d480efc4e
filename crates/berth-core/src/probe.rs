use berth_model::{InfrastructureError, Server};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// A single server availability check.
pub trait ServerProbe: Send {
    /// Block until the server answers or the probe gives up.
    fn check(&self) -> Result<(), InfrastructureError>;
}

pub trait ProbeFactory: Send + Sync {
    fn create(&self, machine: &str, reference: &str, server: &Server) -> Box<dyn ServerProbe>;
}

/// Servers whose readiness is checked on their `/liveness` endpoint.
const LIVENESS_SERVERS: &[&str] = &["exec-agent", "terminal"];

/// HTTP URL probed for a server. WebSocket schemes are probed over HTTP.
pub fn probe_url(reference: &str, url: &str) -> String {
    let url = if let Some(rest) = url.strip_prefix("ws://") {
        format!("http://{rest}")
    } else if let Some(rest) = url.strip_prefix("wss://") {
        format!("https://{rest}")
    } else {
        url.to_owned()
    };
    if LIVENESS_SERVERS.contains(&reference) {
        format!("{}/liveness", url.trim_end_matches('/'))
    } else {
        url
    }
}

pub fn not_available(reference: &str, machine: &str) -> InfrastructureError {
    InfrastructureError::new(format!(
        "Server {reference} in machine {machine} not available."
    ))
}

/// Creates HTTP probes sharing one agent.
pub struct HttpProbeFactory {
    agent: ureq::Agent,
    period: Duration,
    timeout: Duration,
}

impl HttpProbeFactory {
    pub fn new(period: Duration, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            period,
            timeout,
        }
    }
}

impl ProbeFactory for HttpProbeFactory {
    fn create(&self, machine: &str, reference: &str, server: &Server) -> Box<dyn ServerProbe> {
        Box::new(HttpServerProbe {
            agent: self.agent.clone(),
            url: probe_url(reference, &server.url),
            machine: machine.to_owned(),
            reference: reference.to_owned(),
            period: self.period,
            timeout: self.timeout,
        })
    }
}

/// Polls a URL with GET until it answers 2xx or 3xx.
pub struct HttpServerProbe {
    agent: ureq::Agent,
    url: String,
    machine: String,
    reference: String,
    period: Duration,
    timeout: Duration,
}

impl HttpServerProbe {
    /// One GET, bounded by `budget`.
    fn attempt(&self, budget: Duration) -> bool {
        let request = self
            .agent
            .get(&self.url)
            .config()
            .timeout_global(Some(budget))
            .build();
        match request.call() {
            Ok(resp) => {
                let code = resp.status().as_u16();
                trace!(url = %self.url, code, "probe response");
                (200..400).contains(&code)
            }
            Err(e) => {
                trace!(url = %self.url, "probe failed: {e}");
                false
            }
        }
    }
}

impl ServerProbe for HttpServerProbe {
    fn check(&self) -> Result<(), InfrastructureError> {
        let started = Instant::now();
        let remaining = || self.timeout.saturating_sub(started.elapsed());
        loop {
            let budget = remaining();
            if budget.is_zero() {
                return Err(not_available(&self.reference, &self.machine));
            }
            if self.attempt(budget) {
                debug!(server = %self.reference, machine = %self.machine, "server available");
                return Ok(());
            }
            let left = remaining();
            if left.is_zero() {
                return Err(not_available(&self.reference, &self.machine));
            }
            thread::sleep(self.period.min(left));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liveness_is_appended_for_agents_only() {
        assert_eq!(
            probe_url("exec-agent", "http://h:1/process/"),
            "http://h:1/process/liveness"
        );
        assert_eq!(probe_url("terminal", "ws://h:2"), "http://h:2/liveness");
        assert_eq!(probe_url("wsagent", "http://h:3/api"), "http://h:3/api");
    }

    #[test]
    fn unreachable_server_times_out_with_message() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let factory = HttpProbeFactory::new(Duration::from_millis(20), Duration::from_millis(100));
        let url = format!("http://127.0.0.1:{port}/api");
        let probe = factory.create("dev", "wsagent", &Server::new(url));
        let err = probe.check().unwrap_err();
        assert_eq!(err.message(), "Server wsagent in machine dev not available.");
    }

    #[test]
    fn silent_server_does_not_outlive_the_probe_timeout() {
        // Accepted by the kernel backlog but never answered.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let factory = HttpProbeFactory::new(Duration::from_secs(5), Duration::from_millis(200));
        let probe = factory.create(
            "dev",
            "wsagent",
            &Server::new(format!("http://127.0.0.1:{port}/api")),
        );

        let started = Instant::now();
        assert!(probe.check().is_err());
        assert!(started.elapsed() < Duration::from_secs(2));
        drop(listener);
    }
}
