// Dataset preparation: raw records in, labeled feature table out.
//
// Extraction runs on rayon's pool with order preserved. Rows without a
// usable Bot Label are skipped and counted. With per-account aggregation,
// every account collapses to one example: the arithmetic mean of each
// feature and the majority label (a tie goes to the account's first row).
// Rows without a username have no account and are dropped. Accounts come
// out in ascending username order.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{info, warn};

use super::{LabeledDataset, LabeledExample};
use crate::features::{FeatureExtractor, FeatureVector, RawField, RawRecord};

/// What happened to the input rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareStats {
    pub rows_in: usize,
    pub unlabeled: usize,
    /// Rows dropped by aggregation because they had no username.
    pub without_entity: usize,
    pub examples_out: usize,
}

/// Build a labeled dataset in the extractor's current schema.
pub fn prepare(
    extractor: &FeatureExtractor,
    records: &[RawRecord],
    aggregate_by_entity: bool,
) -> (LabeledDataset, PrepareStats) {
    let rows: Vec<Option<LabeledExample>> = records
        .par_iter()
        .map(|record| {
            let label = record.flag(RawField::BotLabel)?;
            let entity = record
                .text(RawField::Username)
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty());
            Some(LabeledExample {
                entity,
                features: extractor.extract(record),
                label,
            })
        })
        .collect();

    let mut stats = PrepareStats {
        rows_in: records.len(),
        ..Default::default()
    };
    let labeled: Vec<LabeledExample> = rows.into_iter().flatten().collect();
    stats.unlabeled = stats.rows_in - labeled.len();
    if stats.unlabeled > 0 {
        warn!(
            skipped = stats.unlabeled,
            "Skipped rows with a missing or unreadable Bot Label"
        );
    }

    let examples = if aggregate_by_entity {
        let (aggregated, without_entity) = aggregate(labeled);
        stats.without_entity = without_entity;
        if without_entity > 0 {
            warn!(
                dropped = without_entity,
                "Dropped rows without a username during aggregation"
            );
        }
        aggregated
    } else {
        labeled
    };
    stats.examples_out = examples.len();

    info!(
        rows = stats.rows_in,
        examples = stats.examples_out,
        aggregated = aggregate_by_entity,
        "Prepared dataset"
    );
    (LabeledDataset::new(extractor.schema(), examples), stats)
}

/// Collapse examples per entity. Returns the aggregated examples and the
/// number of rows dropped for having no entity.
pub fn aggregate(examples: Vec<LabeledExample>) -> (Vec<LabeledExample>, usize) {
    let mut groups: BTreeMap<String, Vec<LabeledExample>> = BTreeMap::new();
    let mut without_entity = 0;
    for example in examples {
        match example.entity.clone() {
            Some(entity) => groups.entry(entity).or_default().push(example),
            None => without_entity += 1,
        }
    }

    let aggregated = groups
        .into_iter()
        .filter_map(|(entity, group)| collapse(entity, &group))
        .collect();
    (aggregated, without_entity)
}

fn collapse(entity: String, group: &[LabeledExample]) -> Option<LabeledExample> {
    let first = group.first()?;
    let version = first.features.version();
    let width = first.features.len();

    let mut sums = vec![0.0; width];
    for example in group {
        for (sum, value) in sums.iter_mut().zip(example.features.values()) {
            *sum += value;
        }
    }
    let n = group.len() as f64;
    let means = sums.into_iter().map(|s| s / n).collect();

    let bots = group.iter().filter(|e| e.label).count();
    let humans = group.len() - bots;
    let label = match bots.cmp(&humans) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => first.label,
    };

    Some(LabeledExample {
        entity: Some(entity),
        features: FeatureVector::from_values(version, means)?,
        label,
    })
}
