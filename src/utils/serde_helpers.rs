use serde::{ Deserializer, Serializer };
use serde::de::{ self, Visitor };
use std::fmt;
use tracing::Level;

/// Lowercase name of a level, as accepted by [`parse_level`]
pub fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Case-insensitive level name, `None` when unknown
pub fn parse_level(value: &str) -> Option<Level> {
    match value.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Serialize `tracing::Level` to a string
pub fn serialize_level<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer
{
    serializer.serialize_str(level_name(level))
}

/// Deserialize `tracing::Level` from a string
pub fn deserialize_level<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where D: Deserializer<'de>
{
    struct LevelVisitor;

    impl<'de> Visitor<'de> for LevelVisitor {
        type Value = Level;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str(
                "a string representing a log level (trace, debug, info, warn, error)"
            )
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E> where E: de::Error {
            parse_level(value).ok_or_else(|| E::custom(format!("unknown log level: {}", value)))
        }
    }

    deserializer.deserialize_str(LevelVisitor)
}
