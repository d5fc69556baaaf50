use crate::aggregate::{GlobalTable, LocalTable};

/// Folds local tables into one global table. Local tables may arrive in any
/// order; the result only depends on which observations went in.
#[derive(Debug, Default)]
pub struct Merger {
    global: GlobalTable,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, local: LocalTable) {
        if self.global.is_empty() {
            self.global = local;
        } else {
            for (key, aggregate) in local {
                self.global.absorb(key, aggregate);
            }
        }
    }

    pub fn finish(self) -> GlobalTable {
        self.global
    }
}

pub fn merge_all<I>(locals: I) -> GlobalTable
where
    I: IntoIterator<Item = LocalTable>,
{
    let mut merger = Merger::new();
    for local in locals {
        merger.absorb(local);
    }
    merger.finish()
}
