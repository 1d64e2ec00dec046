//! Merge per-source batches into one unique-by-id result set

use std::collections::HashMap;

use nerkh_core::catalog;
use nerkh_core::PriceAsset;

/// Merge records, one per id
///
/// A live record always replaces a fallback one with the same id; otherwise
/// the first record seen wins. Output follows catalog order, unknown ids keep
/// their arrival order at the end.
pub fn merge_assets<I>(records: I) -> Vec<PriceAsset>
where
    I: IntoIterator<Item = PriceAsset>,
{
    let mut merged: Vec<PriceAsset> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        match index.get(&record.id) {
            Some(&i) => {
                if merged[i].is_fallback() && !record.is_fallback() {
                    merged[i] = record;
                }
            }
            None => {
                index.insert(record.id.clone(), merged.len());
                merged.push(record);
            }
        }
    }

    // Stable, so ties keep arrival order
    merged.sort_by_key(|a| catalog::display_position(&a.id));
    merged
}
