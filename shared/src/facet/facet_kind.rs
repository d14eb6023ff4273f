use std::fmt;

use crate::facet::facet::Facet;

/// Identity of a facet type, keyed by its wire name
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FacetKind {
    type_name: &'static str,
}

impl FacetKind {
    pub fn of<F: Facet>() -> Self {
        Self {
            type_name: F::TYPE_NAME,
        }
    }

    pub fn name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}
