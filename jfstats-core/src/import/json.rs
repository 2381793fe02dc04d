//! Incremental JSON walker: hands each record to a channel as soon as it has
//! been parsed, so arbitrarily large arrays never sit in memory at once.

use std::fmt;
use std::io::Read;

use jfstats_model::SourceFormat;
use serde::Deserialize;
use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use super::latch::JellystatsLatch;

const ACTIVITY_SECTION: &str = "jf_playback_activity";
const SECTION_PREFIX: &str = "jf_";

/// Result of walking one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamOutcome {
    pub emitted: u64,
    /// Bare objects dropped because a wrapper section came first.
    pub ignored_bare: u64,
    pub latch: JellystatsLatch,
}

struct StreamContext {
    format: SourceFormat,
    tx: mpsc::Sender<Value>,
    outcome: StreamOutcome,
}

impl StreamContext {
    fn emit<E: de::Error>(&mut self, record: Value) -> Result<(), E> {
        self.tx
            .blocking_send(record)
            .map_err(|_| E::custom("import consumer stopped"))?;
        self.outcome.emitted += 1;
        Ok(())
    }
}

/// Walks a JSON document from `reader`, sending every record of `format` to
/// `tx`. Must run on a blocking thread.
pub fn stream_records<R: Read>(
    reader: R,
    format: SourceFormat,
    tx: mpsc::Sender<Value>,
) -> (StreamOutcome, Result<(), serde_json::Error>) {
    let mut ctx = StreamContext {
        format,
        tx,
        outcome: StreamOutcome::default(),
    };
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    let result = RootSeed(&mut ctx)
        .deserialize(&mut deserializer)
        .and_then(|()| deserializer.end());
    (ctx.outcome, result)
}

struct RootSeed<'a>(&'a mut StreamContext);

impl<'de> DeserializeSeed<'de> for RootSeed<'_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_any(RootVisitor(self.0))
    }
}

struct RootVisitor<'a>(&'a mut StreamContext);

impl<'de> Visitor<'de> for RootVisitor<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON array of records or a Jellystats backup object")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        while seq.next_element_seed(ElementSeed(&mut *self.0))?.is_some() {}
        Ok(())
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<(), A::Error> {
        match self.0.format {
            SourceFormat::Jellystats => visit_jellystats_object(self.0, map),
            _ => {
                // A single record object at the root.
                let record = Value::Object(collect_map(map)?);
                self.0.emit(record)
            }
        }
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        Ok(())
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<(), E> {
        Ok(())
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<(), E> {
        Ok(())
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<(), E> {
        Ok(())
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<(), E> {
        Ok(())
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<(), E> {
        Ok(())
    }
}

struct ElementSeed<'a>(&'a mut StreamContext);

impl<'de> DeserializeSeed<'de> for ElementSeed<'_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        match self.0.format {
            SourceFormat::Jellystats => deserializer.deserialize_any(JellystatsElementVisitor(self.0)),
            _ => {
                let record = Value::deserialize(deserializer)?;
                self.0.emit(record)
            }
        }
    }
}

struct JellystatsElementVisitor<'a>(&'a mut StreamContext);

impl<'de> Visitor<'de> for JellystatsElementVisitor<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a Jellystats section object or session")
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<(), A::Error> {
        visit_jellystats_object(self.0, map)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(())
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        Ok(())
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<(), E> {
        Ok(())
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<(), E> {
        Ok(())
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<(), E> {
        Ok(())
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<(), E> {
        Ok(())
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<(), E> {
        Ok(())
    }
}

/// An object is either a backup wrapper (any `jf_*` key) or a bare session.
/// Only a `jf_playback_activity` array closes the door on later bare objects.
fn visit_jellystats_object<'de, A: MapAccess<'de>>(
    ctx: &mut StreamContext,
    mut map: A,
) -> Result<(), A::Error> {
    let mut fields = Map::new();
    let mut wrapper = false;

    while let Some(key) = map.next_key::<String>()? {
        if key == ACTIVITY_SECTION {
            wrapper = true;
            map.next_value_seed(ActivitySectionSeed(&mut *ctx))?;
        } else if key.starts_with(SECTION_PREFIX) {
            wrapper = true;
            map.next_value::<IgnoredAny>()?;
        } else {
            let value: Value = map.next_value()?;
            fields.insert(key, value);
        }
    }

    if wrapper {
        return Ok(());
    }
    if ctx.outcome.latch.accept_bare_object() {
        ctx.emit(Value::Object(fields))
    } else {
        ctx.outcome.ignored_bare += 1;
        Ok(())
    }
}

struct ActivitySectionSeed<'a>(&'a mut StreamContext);

impl<'de> DeserializeSeed<'de> for ActivitySectionSeed<'_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_any(ActivitySectionVisitor(self.0))
    }
}

struct ActivitySectionVisitor<'a>(&'a mut StreamContext);

impl<'de> Visitor<'de> for ActivitySectionVisitor<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of playback activity rows")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        self.0.outcome.latch.observe_wrapper();
        while let Some(record) = seq.next_element::<Value>()? {
            self.0.emit(record)?;
        }
        Ok(())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(())
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        Ok(())
    }
}

fn collect_map<'de, A: MapAccess<'de>>(mut map: A) -> Result<Map<String, Value>, A::Error> {
    let mut fields = Map::new();
    while let Some((key, value)) = map.next_entry::<String, Value>()? {
        fields.insert(key, value);
    }
    Ok(fields)
}
