//! Reading: the value type flowing from producers to consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProducerId;

/// A single reading emitted by a simulated sensor.
///
/// Serialized as the broker payload:
/// `{"producer_id":1,"value":0.42,"captured_at":"2024-01-01T12:00:00Z"}`.
///
/// Not wire compatible with the legacy sensor payload `{"ID":1,"Value":0.42,"Timestamp":...}`:
/// the keys are snake_case on purpose, so subscribers of the old format need a mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub producer_id: ProducerId,

    /// Sampled value. Uniform in [0, 1) unless the simulation uses another `Source`.
    pub value: f64,

    /// Non-decreasing within one producer; no ordering across producers.
    pub captured_at: DateTime<Utc>,
}

impl Reading {
    pub fn new(producer_id: ProducerId, value: f64, captured_at: DateTime<Utc>) -> Self {
        Self {
            producer_id,
            value,
            captured_at,
        }
    }

    /// Broker subject for this reading: `<prefix>.data.<producer_id>`.
    pub fn subject(&self, prefix: &str) -> String {
        format!("{prefix}.data.{}", self.producer_id)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Reading {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        Reading::new(ProducerId::new(17), 0.25, at)
    }

    #[test]
    fn subject_follows_prefix_data_id_pattern() {
        assert_eq!(sample().subject("iot.sensors"), "iot.sensors.data.17");
    }

    #[test]
    fn json_payload_has_flat_fields() {
        let bytes = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["producer_id"], 17);
        assert_eq!(value["value"], 0.25);
        assert_eq!(value["captured_at"], "2024-01-01T12:00:00Z");
        for legacy in ["ID", "Value", "Timestamp"] {
            assert!(value.get(legacy).is_none(), "unexpected key {legacy}");
        }
    }
}
