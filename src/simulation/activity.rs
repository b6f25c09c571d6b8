//! Snapshot to per-node intensity mapping.

use crate::topology::NodeId;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_INTENSITY: f32 = 0.5;
/// Emissive strength per unit of intensity.
pub const EMISSIVE_GAIN: f32 = 0.5;

/// Named signals of one sub-record. Non-numeric values read as absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct SignalRecord(HashMap<String, Value>);

impl SignalRecord {
    pub fn signal(&self, name: &str) -> Option<f64> {
        self.0
            .get(name)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), Value::from(value));
    }

    pub fn from_pairs<'a>(signals: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        let mut record = SignalRecord::default();
        for (name, value) in signals {
            record.set(name, value);
        }
        record
    }
}

/// Latest emotional/somatic readings from the backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActivitySnapshot {
    #[serde(default)]
    pub emotional: Option<SignalRecord>,
    #[serde(default)]
    pub somatic: Option<SignalRecord>,
}

impl ActivitySnapshot {
    pub fn with_emotional<'a>(mut self, signals: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        self.emotional = Some(SignalRecord::from_pairs(signals));
        self
    }

    pub fn with_somatic<'a>(mut self, signals: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        self.somatic = Some(SignalRecord::from_pairs(signals));
        self
    }

    /// Parse either the bare `{emotional, somatic}` shape or the
    /// `{consciousness: {...}}` envelope. A null envelope yields `None`.
    pub fn from_json(text: &str) -> Result<Option<Self>, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(mut value: Value) -> Result<Option<Self>, serde_json::Error> {
        if let Some(inner) = value.get_mut("consciousness").map(Value::take) {
            if inner.is_null() {
                return Ok(None);
            }
            return serde_json::from_value(inner).map(Some);
        }
        serde_json::from_value(value).map(Some)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Record {
    Emotional,
    Somatic,
}

/// Which record governs each node and which signals are averaged.
const BINDINGS: [(NodeId, Record, &[&str]); 12] = [
    (NodeId::Lab001, Record::Emotional, &["joy", "trust", "anticipation"]),
    (NodeId::Lab002, Record::Somatic, &["emotional_regulation"]),
    (NodeId::Lab003, Record::Somatic, &["body_state", "temporal_awareness"]),
    (NodeId::Lab004, Record::Emotional, &["surprise", "anticipation"]),
    (NodeId::Lab005, Record::Somatic, &["social_engagement"]),
    (NodeId::Lab006, Record::Somatic, &["cognitive_load"]),
    (NodeId::Lab007, Record::Somatic, &["temporal_awareness"]),
    (NodeId::Lab008, Record::Emotional, &["joy", "trust"]),
    (NodeId::Lab009, Record::Somatic, &["body_state"]),
    (NodeId::Lab010, Record::Somatic, &["arousal", "cognitive_load"]),
    (NodeId::Lab011, Record::Somatic, &["cognitive_load"]),
    (NodeId::Lab012, Record::Emotional, &["anticipation"]),
];

pub type ActivityMap = BTreeMap<NodeId, f32>;

fn mean_of(record: &SignalRecord, signals: &[&str]) -> f32 {
    let sum: f64 = signals
        .iter()
        .map(|s| record.signal(s).unwrap_or(DEFAULT_INTENSITY as f64))
        .sum();
    (sum / signals.len() as f64) as f32
}

/// Intensity for every node. Total: a missing record puts its nodes at the
/// default, a missing signal counts as the default inside its mean.
pub fn map_activity(snapshot: &ActivitySnapshot) -> ActivityMap {
    BINDINGS
        .iter()
        .map(|(id, record, signals)| {
            let source = match record {
                Record::Emotional => snapshot.emotional.as_ref(),
                Record::Somatic => snapshot.somatic.as_ref(),
            };
            let intensity = source
                .map(|r| mean_of(r, signals))
                .unwrap_or(DEFAULT_INTENSITY);
            (*id, intensity)
        })
        .collect()
}

/// Emissive strength shown for an intensity, kept inside [0, 1].
pub fn emissive_strength(intensity: f32) -> f32 {
    let strength = intensity * EMISSIVE_GAIN;
    if strength.is_nan() {
        return DEFAULT_INTENSITY * EMISSIVE_GAIN;
    }
    strength.clamp(0.0, 1.0)
}
