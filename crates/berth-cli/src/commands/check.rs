use super::{json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS, INFRASTRUCTURE_PREFIX};
use berth_core::{HttpProbeFactory, RuntimeConfig, ServerReadinessChecker};
use berth_model::Server;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Parse `ref=url` arguments.
pub fn parse_servers(args: &[String]) -> Result<BTreeMap<String, Server>, String> {
    args.iter()
        .map(|arg| {
            let (reference, url) = arg
                .split_once('=')
                .filter(|(r, u)| !r.is_empty() && !u.is_empty())
                .ok_or_else(|| format!("invalid server '{arg}', expected ref=url"))?;
            Ok((reference.to_owned(), Server::new(url)))
        })
        .collect()
}

pub fn run(
    config: &RuntimeConfig,
    machine: &str,
    servers: &[String],
    json: bool,
) -> Result<u8, String> {
    let servers = parse_servers(servers)?;
    let probes = HttpProbeFactory::new(config.readiness.period(), config.readiness.timeout());
    let mut checker = ServerReadinessChecker::new(machine, &servers, Arc::new(probes));
    let checked: Vec<String> = checker
        .checked_servers()
        .into_iter()
        .map(str::to_owned)
        .collect();
    let skipped: Vec<&String> = servers.keys().filter(|r| !checked.contains(*r)).collect();

    let ready = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&ready);
    let pb = if json {
        None
    } else {
        Some(spinner(&format!("waiting for servers of {machine}...")))
    };
    let result = checker
        .start_async(move |reference| {
            if let Ok(mut ready) = sink.lock() {
                ready.push(reference.to_owned());
            }
        })
        .and_then(|()| checker.wait());
    let ready: Vec<String> = ready.lock().map(|r| r.clone()).unwrap_or_default();

    match result {
        Ok(()) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, &format!("servers of {machine} available"));
            }
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "readiness check failed");
            }
            return Err(format!("{INFRASTRUCTURE_PREFIX} {e}"));
        }
    }

    if json {
        let payload = serde_json::json!({
            "machine": machine,
            "ready": ready,
            "skipped": skipped,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        for reference in &ready {
            println!("ready: {reference}");
        }
        for reference in &skipped {
            println!("not checked: {reference}");
        }
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_url_pairs() {
        let servers = parse_servers(&[
            "wsagent=http://127.0.0.1:4401/api?x=1".to_owned(),
            "terminal=ws://127.0.0.1:4411".to_owned(),
        ])
        .unwrap();
        assert_eq!(servers["wsagent"].url, "http://127.0.0.1:4401/api?x=1");
        assert_eq!(servers.len(), 2);
        assert!(parse_servers(&["wsagent".to_owned()]).is_err());
        assert!(parse_servers(&["=http://x".to_owned()]).is_err());
    }
}
