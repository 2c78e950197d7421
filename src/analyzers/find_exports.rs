//! Every physical export of the reference projects, with no consumer matches.

use super::{QueryResultItem, ResultAccumulator};
use crate::config::DuplicatePolicy;
use crate::index::ExportIndex;

pub fn collect(index: &ExportIndex) -> Vec<QueryResultItem> {
    let mut accumulator = ResultAccumulator::new(DuplicatePolicy::Keep);
    for specifier in index.specifiers() {
        accumulator.item(specifier);
    }
    accumulator.into_items()
}
