//! Node enumeration and the hostname → node number registry.
//!
//! The registry is rebuilt at every collector startup from the node listing
//! command (by default `sinfo -o %n`), whose first output line is a header.

use ahash::AHashMap as HashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collectors::command::{run_capture, CommandTemplate};
use crate::error::CollectError;

static TRAILING_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)$").expect("static regex is valid"));

/// How a node number is derived from a hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum NodeNaming {
    /// The last `width` characters, parsed as an integer (`node07` → 7).
    Suffix { width: usize },
    /// The trailing run of ASCII digits (`compute123` → 123).
    TrailingDigits,
}

impl Default for NodeNaming {
    fn default() -> Self {
        NodeNaming::Suffix { width: 2 }
    }
}

impl NodeNaming {
    /// Derive the node number for `name`.
    pub fn number_for(&self, name: &str) -> Result<u32, CollectError> {
        let digits = match self {
            NodeNaming::Suffix { width } => {
                let start = name
                    .char_indices()
                    .rev()
                    .nth(width.saturating_sub(1))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                &name[start..]
            }
            NodeNaming::TrailingDigits => TRAILING_DIGITS
                .captures(name)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
                .unwrap_or(""),
        };
        digits.parse::<u32>().map_err(|_| {
            CollectError::Parse(format!(
                "cannot derive a node number from '{}' ({:?})",
                name, self
            ))
        })
    }
}

/// Ordered node names plus their numbers. Duplicate names: last one wins.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    names: Vec<String>,
    numbers: HashMap<String, u32>,
    naming: NodeNaming,
}

impl NodeRegistry {
    /// Build a registry from already split node names.
    pub fn from_names<I, S>(names: I, naming: NodeNaming) -> Result<Self, CollectError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = NodeRegistry {
            names: Vec::new(),
            numbers: HashMap::new(),
            naming,
        };
        for name in names {
            let name = name.into();
            let number = naming.number_for(&name)?;
            registry.numbers.insert(name.clone(), number);
            registry.names.push(name);
        }
        Ok(registry)
    }

    /// Node names in listing order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Node numbers in listing order.
    pub fn numbers(&self) -> Vec<u32> {
        self.names
            .iter()
            .filter_map(|n| self.numbers.get(n).copied())
            .collect()
    }

    /// Comma-joined node list, as substituted into the stats command.
    pub fn node_list(&self) -> String {
        self.names.join(",")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number for a node name; names the listing did not report go
    /// through the naming policy.
    pub fn number_of(&self, name: &str) -> Result<u32, CollectError> {
        match self.numbers.get(name) {
            Some(n) => Ok(*n),
            None => self.naming.number_for(name),
        }
    }
}

/// Parse node listing output: drop the header line, keep the rest in order.
pub fn parse_node_listing(output: &str, naming: NodeNaming) -> Result<NodeRegistry, CollectError> {
    let names = output
        .trim()
        .split('\n')
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty());
    NodeRegistry::from_names(names, naming)
}

/// Run the node listing command and build the registry.
pub async fn enumerate_nodes(
    command: &CommandTemplate,
    naming: NodeNaming,
) -> Result<NodeRegistry, CollectError> {
    let output = run_capture(command.program(), command.args()).await?;
    let registry = parse_node_listing(&output, naming)?;
    debug!(
        nodes = registry.len(),
        list = %registry.node_list(),
        "Node registry built"
    );
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_drops_header() {
        let registry =
            parse_node_listing("Hostname\nnode01\nnode50\n", NodeNaming::default()).unwrap();
        assert_eq!(registry.names(), &["node01", "node50"]);
        assert_eq!(registry.numbers(), vec![1, 50]);
        assert_eq!(registry.number_of("node01").unwrap(), 1);
        assert_eq!(registry.number_of("node50").unwrap(), 50);
        assert_eq!(registry.node_list(), "node01,node50");
    }

    #[test]
    fn test_non_numeric_suffix_is_parse_error() {
        let err = parse_node_listing("HOSTNAMES\nalpha\n", NodeNaming::default()).unwrap_err();
        assert!(matches!(err, CollectError::Parse(_)));
    }

    #[test]
    fn test_suffix_policy_width() {
        let naming = NodeNaming::Suffix { width: 3 };
        assert_eq!(naming.number_for("spdr123").unwrap(), 123);
        // Shorter than the width: the whole name is used.
        assert_eq!(naming.number_for("7").unwrap(), 7);
        assert!(NodeNaming::Suffix { width: 2 }.number_for("node1a").is_err());
    }

    #[test]
    fn test_trailing_digits_policy() {
        let naming = NodeNaming::TrailingDigits;
        assert_eq!(naming.number_for("compute123").unwrap(), 123);
        assert_eq!(naming.number_for("n7").unwrap(), 7);
        assert!(naming.number_for("login").is_err());
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let registry = NodeRegistry::from_names(["node01", "node01"], NodeNaming::default())
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.number_of("node01").unwrap(), 1);
    }

    #[test]
    fn test_unlisted_node_uses_policy() {
        let registry = NodeRegistry::from_names(["node01"], NodeNaming::default()).unwrap();
        assert_eq!(registry.number_of("node17").unwrap(), 17);
        assert!(registry.number_of("head").is_err());
    }
}
