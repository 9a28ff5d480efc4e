//! Compose document model: parsing, cross-reference validation, and start order.

use crate::ValidationError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComposeRecipe {
    #[serde(default)]
    pub services: BTreeMap<String, ComposeService>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComposeBuild {
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub dockerfile: Option<String>,
    #[serde(default, deserialize_with = "string_map")]
    pub args: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComposeService {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "build_section")]
    pub build: Option<ComposeBuild>,
    #[serde(default)]
    pub container_name: Option<String>,
    #[serde(default, deserialize_with = "command_line")]
    pub command: Vec<String>,
    #[serde(default, deserialize_with = "command_line")]
    pub entrypoint: Vec<String>,
    #[serde(default, deserialize_with = "string_map")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "string_list")]
    pub expose: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub ports: Vec<String>,
    #[serde(default, deserialize_with = "string_map")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "string_list")]
    pub links: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub depends_on: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub volumes: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub volumes_from: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub networks: Vec<String>,
    #[serde(default, deserialize_with = "memory_size")]
    pub mem_limit: Option<u64>,
}

impl ComposeService {
    /// Names of the services this one must start after.
    pub fn dependencies(&self) -> BTreeSet<&str> {
        let links = self.links.iter().map(|l| split_reference(l));
        let volumes_from = self.volumes_from.iter().map(|v| split_reference(v));
        self.depends_on
            .iter()
            .map(String::as_str)
            .chain(links)
            .chain(volumes_from)
            .collect()
    }
}

/// `service:alias` and `service:ro` both reference `service`.
fn split_reference(reference: &str) -> &str {
    reference
        .split_once(':')
        .map_or(reference, |(service, _)| service)
}

pub fn parse_compose(content: &str) -> Result<ComposeRecipe, ValidationError> {
    serde_yaml::from_str(content).map_err(|e| {
        ValidationError::new(format!("Parsing of environment configuration failed. {e}"))
    })
}

impl ComposeRecipe {
    /// Check that every service is buildable and every reference resolves.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.services.is_empty() {
            return Err(ValidationError::new(
                "Environment should contain at least 1 machine",
            ));
        }
        for (name, service) in &self.services {
            let has_context = service
                .build
                .as_ref()
                .and_then(|b| b.context.as_deref())
                .is_some_and(|c| !c.trim().is_empty());
            let has_image = service
                .image
                .as_deref()
                .is_some_and(|i| !i.trim().is_empty());
            if !has_image && !has_context {
                return Err(ValidationError::new(format!(
                    "Field 'image' or 'build.context' is required in machine '{name}' in environment"
                )));
            }
            for dependency in service.dependencies() {
                if !self.services.contains_key(dependency) {
                    return Err(ValidationError::new(format!(
                        "Dependency '{dependency}' in machine '{name}' points to unknown machine."
                    )));
                }
            }
        }
        Ok(())
    }

    /// Service names ordered so that every service follows its dependencies.
    ///
    /// Services that become startable in the same round are ordered by name.
    pub fn start_order(&self) -> Result<Vec<String>, ValidationError> {
        let mut remaining: BTreeMap<&str, BTreeSet<&str>> = self
            .services
            .iter()
            .map(|(name, service)| (name.as_str(), service.dependencies()))
            .collect();
        let mut order = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let ready: Vec<&str> = remaining
                .iter()
                .filter(|(_, deps)| deps.iter().all(|d| !remaining.contains_key(d)))
                .map(|(name, _)| *name)
                .collect();
            if ready.is_empty() {
                let names: Vec<&str> = remaining.keys().copied().collect();
                return Err(ValidationError::new(format!(
                    "Launch order of machines '{}' can't be evaluated. Circular dependency.",
                    names.join(", ")
                )));
            }
            for name in ready {
                remaining.remove(name);
                order.push(name.to_owned());
            }
        }
        Ok(order)
    }
}

/// Parse `512m`, `2g`, `1024k`, `100b`, `2gb` or a plain byte count.
pub fn parse_memory_size(raw: &str) -> Option<u64> {
    let normalized = raw.trim().to_ascii_lowercase();
    let lower = normalized
        .strip_suffix('b')
        .unwrap_or(normalized.as_str());
    let (digits, multiplier) = match lower.chars().last()? {
        'k' => (&lower[..lower.len() - 1], 1u64 << 10),
        'm' => (&lower[..lower.len() - 1], 1 << 20),
        'g' => (&lower[..lower.len() - 1], 1 << 30),
        _ => (lower, 1),
    };
    digits.trim().parse::<u64>().ok()?.checked_mul(multiplier)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => items
            .iter()
            .map(|item| scalar(item).ok_or_else(|| D::Error::custom("expected a list of values")))
            .collect(),
        // `depends_on` and `networks` may also be written as maps keyed by name.
        Value::Mapping(map) => map
            .iter()
            .map(|(key, _)| scalar(key).ok_or_else(|| D::Error::custom("expected string keys")))
            .collect(),
        other => scalar(&other)
            .map(|s| vec![s])
            .ok_or_else(|| D::Error::custom("expected a list of values")),
    }
}

fn string_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(BTreeMap::new()),
        Value::Mapping(map) => map
            .iter()
            .map(|(k, v)| match (scalar(k), scalar(v)) {
                (Some(k), Some(v)) => Ok((k, v)),
                _ => Err(D::Error::custom("expected a map of scalar values")),
            })
            .collect(),
        Value::Sequence(items) => items
            .iter()
            .map(|item| {
                let entry = scalar(item).ok_or_else(|| D::Error::custom("expected KEY=VALUE"))?;
                Ok(match entry.split_once('=') {
                    Some((k, v)) => (k.to_owned(), v.to_owned()),
                    None => (entry, String::new()),
                })
            })
            .collect(),
        _ => Err(D::Error::custom("expected a map or a list of KEY=VALUE")),
    }
}

fn command_line<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(line) => Ok(line.split_whitespace().map(str::to_owned).collect()),
        other => string_list(other).map_err(D::Error::custom),
    }
}

fn build_section<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ComposeBuild>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(context) => Ok(Some(ComposeBuild {
            context: Some(context),
            ..ComposeBuild::default()
        })),
        section @ Value::Mapping(_) => serde_yaml::from_value(section)
            .map(Some)
            .map_err(D::Error::custom),
        _ => Err(D::Error::custom("expected a build context or a build section")),
    }
}

fn memory_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| D::Error::custom("memory limit must be a positive number of bytes")),
        Value::String(s) => parse_memory_size(&s)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid memory size '{s}'"))),
        _ => Err(D::Error::custom("invalid memory size")),
    }
}
