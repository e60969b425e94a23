//! Validated index over personal attributions.
//!
//! Maps each attributing participant to its recipients (by participant
//! index) so the builder can ask "what fraction does `p` redirect to whom at
//! time `t`" without rescanning the raw configuration.

use std::collections::{BTreeMap, HashMap};

use cred_core::constants::ROW_SUM_TOLERANCE;
use cred_core::error::ConfigError;
use cred_core::types::{AttributionRecipient, IdentityId, PersonalAttribution};

#[derive(Debug, Default)]
pub(crate) struct AttributionIndex<'a> {
    by_from: BTreeMap<usize, Vec<(usize, &'a AttributionRecipient)>>,
}

impl<'a> AttributionIndex<'a> {
    /// Validate `attributions` against the participant set and index them.
    pub(crate) fn new(
        attributions: &'a [PersonalAttribution],
        participant_index: &HashMap<IdentityId, usize>,
    ) -> Result<Self, ConfigError> {
        let lookup = |id: &IdentityId| {
            participant_index
                .get(id)
                .copied()
                .ok_or(ConfigError::UnknownAttributionParticipant(*id))
        };

        let mut by_from: BTreeMap<usize, Vec<(usize, &'a AttributionRecipient)>> = BTreeMap::new();
        for attribution in attributions {
            let from = lookup(&attribution.from)?;
            for recipient in &attribution.recipients {
                let to = lookup(&recipient.to)?;
                if to == from {
                    return Err(ConfigError::SelfAttribution(attribution.from));
                }
                if let Some(bad) = recipient
                    .proportions
                    .iter()
                    .find(|p| !(p.value.is_finite() && (0.0..=1.0).contains(&p.value)))
                {
                    return Err(ConfigError::InvalidProportion {
                        from: attribution.from,
                        value: bad.value,
                    });
                }
                by_from.entry(from).or_default().push((to, recipient));
            }
        }

        let index = Self { by_from };
        for (&from, recipients) in &index.by_from {
            let from_id = attributions
                .iter()
                .map(|a| a.from)
                .find(|id| participant_index.get(id) == Some(&from))
                .unwrap_or_default();
            // The step functions only change at proportion timestamps, so
            // checking those instants covers every instant.
            for (_, recipient) in recipients {
                for p in &recipient.proportions {
                    let total = index.total_at(from, p.timestamp_ms);
                    if total > 1.0 + ROW_SUM_TOLERANCE {
                        return Err(ConfigError::ProportionsExceedOne {
                            from: from_id,
                            timestamp_ms: p.timestamp_ms,
                            total,
                        });
                    }
                }
            }
        }
        Ok(index)
    }

    fn total_at(&self, from: usize, timestamp_ms: i64) -> f64 {
        self.by_from
            .get(&from)
            .map_or(0.0, |rs| rs.iter().map(|(_, r)| r.proportion_at(timestamp_ms)).sum())
    }

    /// Non-zero proportions in effect for `from` at `timestamp_ms`, merged
    /// per recipient and ordered by recipient index.
    pub(crate) fn recipients_at(&self, from: usize, timestamp_ms: i64) -> Vec<(usize, f64)> {
        let Some(recipients) = self.by_from.get(&from) else {
            return Vec::new();
        };
        let mut merged: BTreeMap<usize, f64> = BTreeMap::new();
        for (to, recipient) in recipients {
            let value = recipient.proportion_at(timestamp_ms);
            if value > 0.0 {
                *merged.entry(*to).or_default() += value;
            }
        }
        merged.into_iter().collect()
    }
}
