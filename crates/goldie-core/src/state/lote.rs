use tracing::debug;

use crate::types::{LoteEntry, Order};

/// Items gathered for a single order, at most one entry per catalog item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lote {
    entries: Vec<LoteEntry>,
}

impl Lote {
    pub fn from_entries(entries: Vec<LoteEntry>) -> Self {
        let mut lote = Self::default();
        for entry in entries {
            lote.add(entry);
        }
        lote
    }

    /// Add an entry, replacing any entry for the same item in place
    pub fn add(&mut self, entry: LoteEntry) {
        match self.entries.iter_mut().find(|e| e.item_id == entry.item_id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        debug!("Lote now holds {} item(s)", self.entries.len());
    }

    pub fn remove(&mut self, item_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.item_id != item_id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn total_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LoteEntry] {
        &self.entries
    }

    pub fn orders(&self) -> Vec<Order> {
        self.entries.iter().map(LoteEntry::to_order).collect()
    }
}
