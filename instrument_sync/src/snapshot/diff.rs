use std::fmt;

use indexmap::IndexMap;
use instrument_api::{Instrument, InstrumentId};

use crate::snapshot::ListSnapshot;

/// What changed between two list snapshots, keyed by instrument id in list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotDiff {
    pub added: IndexMap<InstrumentId, Instrument>,
    pub removed: IndexMap<InstrumentId, Instrument>,
    /// id -> (before, after)
    pub changed: IndexMap<InstrumentId, (Instrument, Instrument)>,
    pub total_before: usize,
    pub total_after: usize,
}

impl SnapshotDiff {
    /// Compare `before` against `after`.
    pub fn between(before: &ListSnapshot, after: &ListSnapshot) -> Self {
        let old: IndexMap<InstrumentId, &Instrument> = before.items.iter().map(|i| (i.id, i)).collect();
        let new: IndexMap<InstrumentId, &Instrument> = after.items.iter().map(|i| (i.id, i)).collect();

        let mut d = SnapshotDiff {
            total_before: before.total,
            total_after: after.total,
            ..Default::default()
        };
        for (id, item) in &new {
            match old.get(id) {
                None => {
                    d.added.insert(*id, (*item).clone());
                }
                Some(prev) if prev != item => {
                    d.changed.insert(*id, ((*prev).clone(), (*item).clone()));
                }
                Some(_) => {}
            }
        }
        for (id, item) in &old {
            if !new.contains_key(id) {
                d.removed.insert(*id, (*item).clone());
            }
        }
        d
    }

    /// True if the two snapshots list the same rows with the same total.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.changed.is_empty()
            && self.total_before == self.total_after
    }
}

fn label(i: &Instrument) -> String {
    format!("#{} {} \"{}\"", i.id, i.attrs.short_name, i.attrs.full_name)
}

impl fmt::Display for SnapshotDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // helper: section header with underline
        let mut wrote_any = false;
        let mut section = |title: &str,
                           body: &mut dyn FnMut(&mut fmt::Formatter<'_>) -> fmt::Result|
         -> fmt::Result {
            if wrote_any {
                writeln!(f)?;
            }
            writeln!(f, "{title}")?;
            writeln!(f, "{}", "-".repeat(title.len()))?;
            body(f)?;
            wrote_any = true;
            Ok(())
        };

        if !self.added.is_empty() {
            section("Added", &mut |f| {
                for item in self.added.values() {
                    writeln!(f, "+ {}", label(item))?;
                }
                Ok(())
            })?;
        }
        if !self.removed.is_empty() {
            section("Removed", &mut |f| {
                for item in self.removed.values() {
                    writeln!(f, "- {}", label(item))?;
                }
                Ok(())
            })?;
        }
        if !self.changed.is_empty() {
            section("Changed", &mut |f| {
                for (before, after) in self.changed.values() {
                    if before.attrs.short_name == after.attrs.short_name
                        && before.attrs.full_name == after.attrs.full_name
                    {
                        writeln!(f, "~ {}", label(after))?;
                    } else {
                        writeln!(f, "~ {} → {}", label(before), label(after))?;
                    }
                }
                Ok(())
            })?;
        }
        if self.total_before != self.total_after {
            section("Total", &mut |f| writeln!(f, "{} → {}", self.total_before, self.total_after))?;
        }

        if !wrote_any {
            write!(f, "No changes")
        } else {
            Ok(())
        }
    }
}
