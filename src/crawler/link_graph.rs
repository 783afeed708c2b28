use std::collections::HashMap;

/// Reverse adjacency from a target URL to the pages that link to it
///
/// Sources are kept in discovery order without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkGraph {
    sources: HashMap<String, Vec<String>>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `source` links to `target`
    ///
    /// Returns false if the edge was already known.
    pub fn record(&mut self, target: &str, source: &str) -> bool {
        let sources = self.sources.entry(target.to_string()).or_default();
        if sources.iter().any(|known| known == source) {
            return false;
        }
        sources.push(source.to_string());
        true
    }

    /// Pages linking to `target`, in discovery order
    pub fn sources_of(&self, target: &str) -> &[String] {
        self.sources.get(target).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterates over every target and its sources, sorted by target
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        let mut targets: Vec<_> = self.sources.iter().collect();
        targets.sort_by(|a, b| a.0.cmp(b.0));
        targets
            .into_iter()
            .map(|(target, sources)| (target.as_str(), sources.as_slice()))
    }

    /// Number of distinct targets
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Total number of distinct edges
    pub fn edge_count(&self) -> usize {
        self.sources.values().map(Vec::len).sum()
    }
}
