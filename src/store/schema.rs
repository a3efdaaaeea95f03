//! Canonical field-name normalization.
//!
//! The remote workspace grew organically, so the same logical field appears
//! under different names across (and sometimes within) collections. All
//! reads are normalized here at the store boundary so handler and router
//! logic only ever sees one canonical name per field.

use crate::store::Collection;
use serde_json::{Map, Value};

/// `(external alias, canonical name)` pairs per collection. When both names
/// are present the canonical one wins and the alias is dropped.
fn aliases(collection: Collection) -> &'static [(&'static str, &'static str)] {
    match collection {
        Collection::Properties => &[
            ("Sold/Available", "Status"),
            ("Sales Price", "Price"),
            ("Property Address", "Address"),
        ],
        Collection::Pipeline => &[("Status", "Loan Status")],
        Collection::ClosedDeals => &[("Property Address", "Address")],
        Collection::TeamMembers => &[
            ("Email - ERA", "Email Work"),
            ("Email - Personal", "Email Personal"),
            ("View", "Role"),
        ],
        Collection::ActivityLog | Collection::Schedule => &[],
    }
}

/// Rewrite aliased field names in a flattened record to their canonical
/// form. Idempotent.
pub fn canonicalize(collection: Collection, flat: &mut Map<String, Value>) {
    for (alias, canonical) in aliases(collection) {
        if let Some(value) = flat.remove(*alias) {
            flat.entry(canonical.to_string()).or_insert(value);
        }
    }
}
