//! Reading lib for decoding the EEG readings streamed by a
//! BrainLink-style headset bridge.
//!
//! The bridge publishes one JSON object per frame, carrying eleven
//! integer channels:
//!
//! ```json
//! {"Signal":0,"Attention":61,"Meditation":48,"Delta":81272,"Theta":22180,
//!  "LowAlpha":5113,"HighAlpha":3902,"LowBeta":4018,"HighBeta":6611,
//!  "LowGamma":2045,"HighGamma":1120}
//! ```
//!
//! [`decode`] turns such a frame into a [`Reading`], or rejects it with
//! [`DecodeError::MalformedPayload`]. Decoding is all or nothing: a frame
//! missing a channel, carrying a non-integer value or failing to parse
//! never yields a partially filled reading. Unknown extra keys are ignored
//! so newer bridges can add fields without breaking older clients.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> DecodeError {
        DecodeError::MalformedPayload(e.to_string())
    }
}

/// A single decoded measurement. `signal` is the headset's contact
/// quality indicator (0 is a good fit), the rest are the attention /
/// meditation scores and the eight band powers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Reading {
    pub signal: i32,
    pub attention: i32,
    pub meditation: i32,
    pub delta: i32,
    pub theta: i32,
    pub low_alpha: i32,
    pub high_alpha: i32,
    pub low_beta: i32,
    pub high_beta: i32,
    pub low_gamma: i32,
    pub high_gamma: i32,
}

/// The eleven channels carried by a [`Reading`], in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Signal,
    Attention,
    Meditation,
    Delta,
    Theta,
    LowAlpha,
    HighAlpha,
    LowBeta,
    HighBeta,
    LowGamma,
    HighGamma,
}

impl Channel {
    pub const ALL: [Channel; 11] = [
        Channel::Signal,
        Channel::Attention,
        Channel::Meditation,
        Channel::Delta,
        Channel::Theta,
        Channel::LowAlpha,
        Channel::HighAlpha,
        Channel::LowBeta,
        Channel::HighBeta,
        Channel::LowGamma,
        Channel::HighGamma,
    ];

    /// Key used for this channel in a JSON frame
    pub fn wire_name(&self) -> &'static str {
        match self {
            Channel::Signal => "Signal",
            Channel::Attention => "Attention",
            Channel::Meditation => "Meditation",
            Channel::Delta => "Delta",
            Channel::Theta => "Theta",
            Channel::LowAlpha => "LowAlpha",
            Channel::HighAlpha => "HighAlpha",
            Channel::LowBeta => "LowBeta",
            Channel::HighBeta => "HighBeta",
            Channel::LowGamma => "LowGamma",
            Channel::HighGamma => "HighGamma",
        }
    }

    /// Human readable label, for front ends
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Signal => "Signal",
            Channel::Attention => "Attention",
            Channel::Meditation => "Meditation",
            Channel::Delta => "Delta",
            Channel::Theta => "Theta",
            Channel::LowAlpha => "Low Alpha",
            Channel::HighAlpha => "High Alpha",
            Channel::LowBeta => "Low Beta",
            Channel::HighBeta => "High Beta",
            Channel::LowGamma => "Low Gamma",
            Channel::HighGamma => "High Gamma",
        }
    }
}

impl Reading {
    pub fn get(&self, channel: Channel) -> i32 {
        match channel {
            Channel::Signal => self.signal,
            Channel::Attention => self.attention,
            Channel::Meditation => self.meditation,
            Channel::Delta => self.delta,
            Channel::Theta => self.theta,
            Channel::LowAlpha => self.low_alpha,
            Channel::HighAlpha => self.high_alpha,
            Channel::LowBeta => self.low_beta,
            Channel::HighBeta => self.high_beta,
            Channel::LowGamma => self.low_gamma,
            Channel::HighGamma => self.high_gamma,
        }
    }

    /// Iterate `(channel, value)` pairs in wire order
    pub fn channels(&self) -> impl Iterator<Item = (Channel, i32)> + '_ {
        Channel::ALL.iter().map(move |&c| (c, self.get(c)))
    }

    /// Encode back into the bridge's frame format
    pub fn to_json(&self) -> Result<String, DecodeError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Decode one text frame into a [`Reading`].
///
/// Only a JSON object is accepted: serde would otherwise happily fill the
/// struct from an eleven element array, which the bridge never sends.
pub fn decode(payload: &str) -> Result<Reading, DecodeError> {
    if !payload.trim_start().starts_with('{') {
        return Err(DecodeError::MalformedPayload(
            "frame is not a JSON object".to_string(),
        ));
    }
    Ok(serde_json::from_str::<Reading>(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{"Signal":90,"Attention":50,"Meditation":43,"Delta":81272,
        "Theta":22180,"LowAlpha":5113,"HighAlpha":3902,"LowBeta":4018,
        "HighBeta":6611,"LowGamma":2045,"HighGamma":-1120}"#;

    #[test]
    fn decodes_all_channels() {
        let reading = decode(FULL).expect("valid frame");
        assert_eq!(
            reading,
            Reading {
                signal: 90,
                attention: 50,
                meditation: 43,
                delta: 81272,
                theta: 22180,
                low_alpha: 5113,
                high_alpha: 3902,
                low_beta: 4018,
                high_beta: 6611,
                low_gamma: 2045,
                high_gamma: -1120,
            }
        );
    }

    #[test]
    fn key_order_does_not_matter() {
        let shuffled = r#"{"HighGamma":11,"LowGamma":10,"HighBeta":9,"LowBeta":8,
            "HighAlpha":7,"LowAlpha":6,"Theta":5,"Delta":4,"Meditation":3,
            "Attention":2,"Signal":1}"#;
        let reading = decode(shuffled).unwrap();
        let values: Vec<i32> = reading.channels().map(|(_, v)| v).collect();
        assert_eq!(values, (1..=11).collect::<Vec<i32>>());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let extended = FULL.replacen('{', r#"{"Battery":77,"Firmware":"2.1","#, 1);
        assert_eq!(decode(&extended).unwrap(), decode(FULL).unwrap());
    }

    #[test]
    fn missing_field_is_malformed() {
        let missing = FULL.replace(r#""Theta":22180,"#, "");
        assert!(matches!(
            decode(&missing),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn non_integer_values_are_malformed() {
        for bad in [r#""Signal":90.5"#, r#""Signal":"90""#, r#""Signal":null"#] {
            let frame = FULL.replace(r#""Signal":90"#, bad);
            assert!(
                matches!(decode(&frame), Err(DecodeError::MalformedPayload(_))),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn out_of_range_value_is_malformed() {
        let frame = FULL.replace(r#""Delta":81272"#, r#""Delta":4294967296"#);
        assert!(decode(&frame).is_err());
    }

    #[test]
    fn garbage_and_non_objects_are_malformed() {
        assert!(decode("").is_err());
        assert!(decode("not json").is_err());
        assert!(decode(r#"{"Signal":90"#).is_err());
        assert!(decode("[1,2,3,4,5,6,7,8,9,10,11]").is_err());
        assert!(decode(&format!("{FULL} trailing")).is_err());
    }

    #[test]
    fn duplicate_keys_are_malformed() {
        let frame = FULL.replacen('{', r#"{"Signal":1,"#, 1);
        assert!(decode(&frame).is_err());
    }

    #[test]
    fn encoded_reading_decodes_back() {
        let reading = decode(FULL).unwrap();
        let json = reading.to_json().unwrap();
        assert!(json.contains(r#""LowAlpha":5113"#));
        assert_eq!(decode(&json).unwrap(), reading);
    }

    #[test]
    fn channel_lookup_matches_fields() {
        let reading = decode(FULL).unwrap();
        assert_eq!(reading.get(Channel::Signal), 90);
        assert_eq!(reading.get(Channel::HighGamma), -1120);
        assert_eq!(Channel::LowAlpha.wire_name(), "LowAlpha");
        assert_eq!(Channel::LowAlpha.label(), "Low Alpha");
        assert_eq!(reading.channels().count(), 11);
    }
}
