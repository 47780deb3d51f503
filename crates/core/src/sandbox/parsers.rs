//! Observation parsing per tool family (spec.md §4.2 "Observation parsing").

use crate::types::{
    Finding, HostRecord, Observation, ObservationKind, PortRecord, Severity, ToolFamily,
    TopologyDelta,
};

/// Raw sandbox execution result, before family-specific parsing.
#[derive(Debug, Clone)]
pub struct RawExecution {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub truncated: bool,
}

/// Turn a raw execution into a structured `Observation`, per the tool's
/// family. Unknown tools return raw output verbatim; the cognitive engine
/// must then summarise it (spec.md §4.2).
pub fn parse_observation(family: ToolFamily, tool_name: &str, raw: RawExecution) -> Observation {
    if raw.exit_code != 0 {
        let mut obs = Observation::error(
            ObservationKind::ToolError,
            format!("{tool_name} exited with status {}", raw.exit_code),
        );
        obs.raw_output = raw.stdout;
        obs.metadata
            .insert("stderr".to_string(), raw.stderr);
        obs.exit_status = raw.exit_code;
        return obs;
    }

    let mut obs = Observation::success(raw.stdout.clone(), raw.exit_code);
    if raw.truncated {
        obs.metadata
            .insert("truncated".to_string(), "true".to_string());
    }

    match family {
        ToolFamily::SubdomainEnumerator => {
            obs.topology = parse_subdomains(&raw.stdout, tool_name);
        }
        ToolFamily::PortScanner => {
            obs.topology = parse_ports(&raw.stdout, tool_name);
        }
        ToolFamily::VulnTemplateEngine => {
            obs.findings = parse_vuln_templates(&raw.stdout, tool_name);
        }
        ToolFamily::Unknown => {}
    }
    obs
}

/// One hostname per non-empty line (subfinder-style output).
fn parse_subdomains(stdout: &str, tool_name: &str) -> TopologyDelta {
    let hosts = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|hostname| HostRecord {
            hostname: hostname.to_string(),
            source_tool: tool_name.to_string(),
        })
        .collect();
    TopologyDelta {
        hosts,
        ports: Vec::new(),
    }
}

/// `host:port[/service]` per line (naabu/nmap-summary-style output).
fn parse_ports(stdout: &str, _tool_name: &str) -> TopologyDelta {
    let mut ports = Vec::new();
    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (addr, service) = match line.split_once('/') {
            Some((a, s)) => (a, Some(s.to_string())),
            None => (line, None),
        };
        if let Some((host, port_str)) = addr.rsplit_once(':') {
            if let Ok(port) = port_str.parse::<u16>() {
                ports.push(PortRecord {
                    host: host.to_string(),
                    port,
                    service,
                });
            }
        }
    }
    TopologyDelta {
        hosts: Vec::new(),
        ports,
    }
}

/// `severity|kind|location|evidence` per line (nuclei-style template matches).
fn parse_vuln_templates(stdout: &str, tool_name: &str) -> Vec<Finding> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|line| {
            let mut parts = line.splitn(4, '|');
            let severity = match parts.next()?.trim().to_lowercase().as_str() {
                "critical" => Severity::Critical,
                "high" => Severity::High,
                "medium" => Severity::Medium,
                "low" => Severity::Low,
                _ => Severity::Info,
            };
            let kind = parts.next()?.trim().to_string();
            let location = parts.next()?.trim().to_string();
            let evidence = parts.next().unwrap_or("").trim().to_string();
            let host = location
                .split("://")
                .nth(1)
                .and_then(|rest| rest.split('/').next())
                .unwrap_or(&location)
                .to_string();
            Some(Finding {
                severity,
                kind,
                host,
                location,
                evidence,
                remediation: String::new(),
                source_tool: tool_name.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subdomain_enumerator_output() {
        let raw = RawExecution {
            stdout: "a.example.com\nb.example.com\n".to_string(),
            stderr: String::new(),
            exit_code: 0,
            truncated: false,
        };
        let obs = parse_observation(ToolFamily::SubdomainEnumerator, "subfinder", raw);
        assert_eq!(obs.topology.hosts.len(), 2);
        assert_eq!(obs.kind, ObservationKind::Success);
    }

    #[test]
    fn non_zero_exit_is_tool_error() {
        let raw = RawExecution {
            stdout: String::new(),
            stderr: "boom".to_string(),
            exit_code: 1,
            truncated: false,
        };
        let obs = parse_observation(ToolFamily::Unknown, "whatever", raw);
        assert_eq!(obs.kind, ObservationKind::ToolError);
    }

    #[test]
    fn parses_vuln_template_matches_with_severity() {
        let raw = RawExecution {
            stdout: "critical|exposed-git|http://a.example.com/.git/config|HEAD found"
                .to_string(),
            stderr: String::new(),
            exit_code: 0,
            truncated: false,
        };
        let obs = parse_observation(ToolFamily::VulnTemplateEngine, "nuclei", raw);
        assert_eq!(obs.findings.len(), 1);
        assert_eq!(obs.findings[0].severity, Severity::Critical);
        assert_eq!(obs.findings[0].host, "a.example.com");
    }
}
