/*!
 * Incident reports and their wire representation.
 *
 * A Message is one report relayed through the mesh: who sent it, which node it came from and which
 * node handed it to us, what it says, how urgent it is, and (maybe) where it came from. The
 * MessageRecord is the forgiving JSON shape used by the remote server and the seed files.
 */
use crate::geo::Coord;
use serde::{de::Deserializer, Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display};
use strum::{EnumIter, EnumString, IntoStaticStr};

/// Sender name shown when a report did not carry one.
pub const UNKNOWN_SENDER: &str = "Unknown";

/** Severity classification of an incident report. */
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Urgency {
    High,
    Medium,
    Low,
    None,
}

impl Urgency {
    /// Get the wire name of the urgency, e.g. "HIGH".
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Parse a wire value, anything unrecognized is treated as no urgency.
    pub fn from_wire(value: &str) -> Self {
        value.parse().unwrap_or(Urgency::None)
    }

    /// Position of this level in a fixed size table ordered HIGH, MEDIUM, LOW, NONE.
    pub(crate) fn index(self) -> usize {
        match self {
            Urgency::High => 0,
            Urgency::Medium => 1,
            Urgency::Low => 2,
            Urgency::None => 3,
        }
    }
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::None
    }
}

impl Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", self.name())
    }
}

impl Serialize for Urgency {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Urgency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(s) => Urgency::from_wire(&s),
            _ => Urgency::None,
        })
    }
}

/// The natural key of a message, (source node, message id).
pub type MessageKey<'a> = (&'a str, &'a str);

/**
 * A single incident report.
 *
 * Coordinates are only ever stored when both components are finite, so `coordinates()` being
 * `Some` is the definition of a geolocated message.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    source_node: String,
    current_node: String,
    message_id: String,
    sender_name: Option<String>,
    text: String,
    coordinates: Option<Coord>,
    urgency: Urgency,
    log_id: Option<String>,
}

impl Message {
    /// Create a message with no sender name, text, location or urgency.
    pub fn new<S: Into<String>>(source_node: S, current_node: S, message_id: S) -> Self {
        Message {
            source_node: source_node.into(),
            current_node: current_node.into(),
            message_id: message_id.into(),
            sender_name: None,
            text: String::new(),
            coordinates: None,
            urgency: Urgency::None,
            log_id: None,
        }
    }

    pub fn with_sender_name<S: Into<String>>(mut self, name: S) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = text.into();
        self
    }

    /// Attach a location. Non-finite values leave the message without one.
    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        let coord = Coord::new(latitude, longitude);
        self.coordinates = if coord.is_finite() { Some(coord) } else { None };
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn with_log_id<S: Into<String>>(mut self, log_id: S) -> Self {
        self.log_id = Some(log_id.into());
        self
    }

    /// The node the report originated from.
    pub fn source_node(&self) -> &str {
        &self.source_node
    }

    /// The node that relayed the report to the server.
    pub fn current_node(&self) -> &str {
        &self.current_node
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// The sender's name, or "Unknown".
    pub fn sender_name(&self) -> &str {
        match self.sender_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => UNKNOWN_SENDER,
        }
    }

    /// Whether the report actually carried a sender name.
    pub fn has_sender_name(&self) -> bool {
        self.sender_name.as_deref().map_or(false, |n| !n.is_empty())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn coordinates(&self) -> Option<Coord> {
        self.coordinates
    }

    pub fn is_geolocated(&self) -> bool {
        self.coordinates.is_some()
    }

    pub fn urgency(&self) -> Urgency {
        self.urgency
    }

    /// The id the server wants back when this report is marked as handled.
    ///
    /// Falls back to the message id when the server did not hand out a separate log id.
    pub fn log_id(&self) -> &str {
        self.log_id.as_deref().unwrap_or(&self.message_id)
    }

    /// The deduplication key.
    pub fn key(&self) -> MessageKey<'_> {
        (&self.source_node, &self.message_id)
    }

    /// Convert back into the wire shape, e.g. for exporting.
    pub fn to_record(&self) -> MessageRecord {
        MessageRecord {
            source_node: self.source_node.clone(),
            current_node: self.current_node.clone(),
            message_id: self.message_id.clone(),
            sender_name: self.sender_name.clone(),
            message: Some(self.text.clone()),
            gps: self.coordinates,
            urgency: self.urgency,
            log_id: self.log_id.clone(),
        }
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(
            f,
            "[{:>6}] {}/{} via {} from {}: {}",
            self.urgency.name(),
            self.source_node,
            self.message_id,
            self.current_node,
            self.sender_name(),
            self.text
        )?;

        if let Some(coord) = self.coordinates {
            write!(f, " ({})", coord)?;
        }

        Ok(())
    }
}

/**
 * One message as it appears on the wire.
 *
 * Every field is optional. The older local server used short field names, so those are accepted
 * too, and ids may be numbers or strings.
 */
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    #[serde(default, alias = "src", deserialize_with = "lenient_string")]
    pub source_node: String,
    #[serde(default, alias = "cur", deserialize_with = "lenient_string")]
    pub current_node: String,
    #[serde(default, alias = "msg_id", deserialize_with = "lenient_string")]
    pub message_id: String,
    #[serde(
        default,
        alias = "name",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_opt_string"
    )]
    pub sender_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub message: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_gps"
    )]
    pub gps: Option<Coord>,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_opt_string"
    )]
    pub log_id: Option<String>,
}

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Message {
            source_node: record.source_node,
            current_node: record.current_node,
            message_id: record.message_id,
            sender_name: record.sender_name,
            text: record.message.unwrap_or_default(),
            coordinates: record.gps.filter(Coord::is_finite),
            urgency: record.urgency,
            log_id: record.log_id,
        }
    }
}

/** The `{ "logs": [...] }` envelope used by the server and the seed files. */
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageLog {
    #[serde(default)]
    pub logs: Vec<MessageRecord>,
}

impl MessageLog {
    pub fn from_messages(messages: &[Message]) -> Self {
        MessageLog {
            logs: messages.iter().map(Message::to_record).collect(),
        }
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.logs.into_iter().map(Message::from).collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LogReply {
    Bare(Vec<MessageRecord>),
    Wrapped {
        #[serde(default)]
        logs: Option<Vec<MessageRecord>>,
    },
}

/**
 * Decode a message list from JSON.
 *
 * Accepts the `{ "logs": [...] }` envelope (a missing or null `logs` is an empty list) as well as a
 * bare array of records.
 */
pub fn decode_message_log(bytes: &[u8]) -> Result<Vec<Message>, serde_json::Error> {
    let reply: LogReply = serde_json::from_slice(bytes)?;

    let records = match reply {
        LogReply::Bare(records) => records,
        LogReply::Wrapped { logs } => logs.unwrap_or_default(),
    };

    Ok(records.into_iter().map(Message::from).collect())
}

/*-------------------------------------------------------------------------------------------------
 *                                  Lenient field decoding
 *-----------------------------------------------------------------------------------------------*/
fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn value_to_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(value_to_string(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(value_to_string(Value::deserialize(deserializer)?))
}

fn lenient_gps<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Coord>, D::Error> {
    let value = Value::deserialize(deserializer)?;

    let coord = match value {
        Value::Object(map) => {
            let latitude = value_to_f64(map.get("latitude"));
            let longitude = value_to_f64(map.get("longitude"));
            match (latitude, longitude) {
                (Some(lat), Some(lon)) => Some(Coord::new(lat, lon)),
                _ => None,
            }
        }
        _ => None,
    };

    Ok(coord.filter(Coord::is_finite))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_urgency_from_wire() {
        assert_eq!(Urgency::from_wire("HIGH"), Urgency::High);
        assert_eq!(Urgency::from_wire("MEDIUM"), Urgency::Medium);
        assert_eq!(Urgency::from_wire("LOW"), Urgency::Low);
        assert_eq!(Urgency::from_wire("NONE"), Urgency::None);
        assert_eq!(Urgency::from_wire("high"), Urgency::None);
        assert_eq!(Urgency::from_wire("SEVERE"), Urgency::None);
        assert_eq!(Urgency::from_wire(""), Urgency::None);
    }

    #[test]
    fn test_record_defaults() {
        let msgs = decode_message_log(br#"{"logs": [{}]}"#).unwrap();
        assert_eq!(msgs.len(), 1);

        let msg = &msgs[0];
        assert_eq!(msg.source_node(), "");
        assert_eq!(msg.message_id(), "");
        assert_eq!(msg.sender_name(), "Unknown");
        assert!(!msg.has_sender_name());
        assert_eq!(msg.text(), "");
        assert_eq!(msg.urgency(), Urgency::None);
        assert!(msg.coordinates().is_none());
    }

    #[test]
    fn test_full_record() {
        let json = br#"{"logs": [{
            "source_node": "3", "current_node": "7", "message_id": "0042",
            "sender_name": "Asha", "message": "Water rising near bridge",
            "gps": {"latitude": 12.97, "longitude": 77.59},
            "urgency": "HIGH"
        }]}"#;

        let msgs = decode_message_log(json).unwrap();
        let msg = &msgs[0];

        assert_eq!(msg.key(), ("3", "0042"));
        assert_eq!(msg.current_node(), "7");
        assert_eq!(msg.sender_name(), "Asha");
        assert_eq!(msg.text(), "Water rising near bridge");
        assert_eq!(msg.urgency(), Urgency::High);
        assert_eq!(msg.coordinates(), Some(Coord::new(12.97, 77.59)));
        assert_eq!(msg.log_id(), "0042");
    }

    #[test]
    fn test_short_field_names_and_numeric_ids() {
        let json = br#"[{"src": 1, "cur": 2, "msg_id": 17, "name": "Ravi", "urgency": "unknown"}]"#;

        let msgs = decode_message_log(json).unwrap();
        let msg = &msgs[0];

        assert_eq!(msg.key(), ("1", "17"));
        assert_eq!(msg.current_node(), "2");
        assert_eq!(msg.sender_name(), "Ravi");
        assert_eq!(msg.urgency(), Urgency::None);
    }

    #[test]
    fn test_missing_or_null_logs_is_empty() {
        assert!(decode_message_log(br#"{}"#).unwrap().is_empty());
        assert!(decode_message_log(br#"{"logs": null}"#).unwrap().is_empty());
        assert!(decode_message_log(br#"[]"#).unwrap().is_empty());
        assert!(decode_message_log(br#"not json"#).is_err());
    }

    #[test]
    fn test_bad_gps_is_not_geolocated() {
        let json = br#"{"logs": [
            {"message_id": "a", "gps": {"latitude": null, "longitude": 77.5}},
            {"message_id": "b", "gps": {"latitude": 12.9}},
            {"message_id": "c", "gps": null},
            {"message_id": "d", "gps": {"latitude": "abc", "longitude": "77.5"}},
            {"message_id": "e", "gps": {"latitude": "12.5", "longitude": "77.5"}},
            {"message_id": "f", "gps": "12.5,77.5"}
        ]}"#;

        let msgs = decode_message_log(json).unwrap();
        let located: Vec<&str> = msgs
            .iter()
            .filter(|m| m.is_geolocated())
            .map(|m| m.message_id())
            .collect();

        assert_eq!(located, vec!["e"]);
    }

    #[test]
    fn test_non_finite_coordinates_dropped() {
        let msg = Message::new("1", "1", "1").with_coordinates(f64::NAN, 10.0);
        assert!(!msg.is_geolocated());

        let msg = Message::new("1", "1", "1").with_coordinates(10.0, f64::INFINITY);
        assert!(!msg.is_geolocated());
    }

    #[test]
    fn test_record_round_trip_keeps_wire_names() {
        let msg = Message::new("4", "5", "9")
            .with_sender_name("Meera")
            .with_text("Need insulin")
            .with_coordinates(10.0, 20.0)
            .with_urgency(Urgency::Medium);

        let json = serde_json::to_value(MessageLog::from_messages(&[msg.clone()])).unwrap();
        let record = &json["logs"][0];

        assert_eq!(record["source_node"], "4");
        assert_eq!(record["sender_name"], "Meera");
        assert_eq!(record["urgency"], "MEDIUM");
        assert_eq!(record["gps"]["latitude"], 10.0);

        let bytes = serde_json::to_vec(&json).unwrap();
        assert_eq!(decode_message_log(&bytes).unwrap(), vec![msg]);
    }
}
