//! Persisted reaction statistics: attempt count, best time and a bounded
//! window of recent latencies.
//!
//! Loading never fails. A missing or unparsable blob yields
//! [`Statistics::default`], and a blob with some malformed fields keeps
//! whatever fields are still usable, coerced one at a time.
//!
//! # Storage Format
//!
//! ```json
//! {"attempts": 3, "best": 50.0, "recent": [100.0, 50.0, 200.0]}
//! ```
//!
//! `best` is `null` until the first reaction is recorded; `recent` holds at
//! most [`RECENT_WINDOW`] entries, oldest first.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::present::Aggregates;
use crate::store::{KeyValueStore, STORAGE_KEY};

/// Number of recent latencies kept for the running average.
pub const RECENT_WINDOW: usize = 10;

// ---------------------------------------------------------------------------
// Sample
// ---------------------------------------------------------------------------

/// A single measured reaction latency in milliseconds.
///
/// Always finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Sample(f64);

impl Sample {
    /// Wrap a latency in milliseconds. Returns `None` for negative or
    /// non-finite values.
    pub fn new(ms: f64) -> Option<Self> {
        (ms.is_finite() && ms >= 0.0).then_some(Self(ms))
    }

    /// Latency from an elapsed monotonic duration.
    pub fn from_duration(elapsed: Duration) -> Self {
        Self(elapsed.as_nanos() as f64 / 1_000_000.0)
    }

    pub fn millis(self) -> f64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Aggregate reaction statistics as persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    /// Completed valid reactions since the last reset.
    pub attempts: u64,
    /// Fastest latency ever recorded, in ms.
    pub best: Option<f64>,
    /// Most recent latencies, oldest first.
    pub recent: VecDeque<f64>,
}

impl Statistics {
    /// Fold a new sample into the aggregates.
    pub fn record(&mut self, sample: Sample) {
        let ms = sample.millis();
        self.attempts = self.attempts.saturating_add(1);
        self.best = Some(match self.best {
            Some(best) => best.min(ms),
            None => ms,
        });
        self.recent.push_back(ms);
        while self.recent.len() > RECENT_WINDOW {
            self.recent.pop_front();
        }
    }

    /// Arithmetic mean of the recent window.
    pub fn average(&self) -> Option<f64> {
        average(self)
    }

    /// Serialize to the persisted JSON blob.
    pub fn to_json(&self) -> String {
        // Every field is a plain number or sequence; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }

    /// Parse a persisted blob, falling back to the default on any failure.
    pub fn parse(raw: &str) -> Self {
        let cleaned = sanitize_non_finite(raw);
        match serde_json::from_str::<Value>(&cleaned) {
            Ok(value) => Self::from_json(&value),
            Err(e) => {
                log::debug!("discarding unparsable statistics blob: {e}");
                Self::default()
            }
        }
    }

    /// Coerce a decoded JSON value field by field.
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            log::debug!("statistics blob is not an object, using defaults");
            return Self::default();
        };

        let attempts = obj.get("attempts").map_or(0, coerce_attempts);
        let best = obj.get("best").and_then(coerce_best);
        let recent = match obj.get("recent") {
            Some(Value::Array(items)) => {
                let numbers: Vec<f64> = items
                    .iter()
                    .filter_map(Value::as_f64)
                    .filter(|v| v.is_finite())
                    .collect();
                let skip = numbers.len().saturating_sub(RECENT_WINDOW);
                numbers.into_iter().skip(skip).collect()
            }
            _ => VecDeque::new(),
        };

        Self {
            attempts,
            best,
            recent,
        }
    }
}

/// Arithmetic mean of `stats.recent`, or `None` when the window is empty.
pub fn average(stats: &Statistics) -> Option<f64> {
    if stats.recent.is_empty() {
        return None;
    }
    let sum: f64 = stats.recent.iter().sum();
    Some(sum / stats.recent.len() as f64)
}

/// Read statistics from `backend`, defaulting on absence, I/O error or corruption.
pub fn load_statistics<K: KeyValueStore + ?Sized>(backend: &K) -> Statistics {
    match backend.get(STORAGE_KEY) {
        Ok(Some(raw)) => Statistics::parse(&raw),
        Ok(None) => Statistics::default(),
        Err(e) => {
            log::warn!("could not read statistics, starting fresh: {e}");
            Statistics::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Field coercion
// ---------------------------------------------------------------------------

fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().ok()?
            }
        }
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn coerce_attempts(value: &Value) -> u64 {
    match coerce_number(value) {
        // `as` saturates; negatives land on 0.
        Some(n) => n.trunc() as u64,
        None => 0,
    }
}

fn coerce_best(value: &Value) -> Option<f64> {
    match value {
        Value::Number(_) => coerce_number(value),
        // Only the number 0 is a valid zero best; a string "0" is not.
        Value::String(_) => coerce_number(value).filter(|n| *n != 0.0),
        _ => None,
    }
}

/// Tokens some JSON writers emit for non-finite floats.
const NON_FINITE_TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

/// Replace values outside string literals that cannot be an `f64` with
/// `null`: bare `NaN` / `Infinity` / `-Infinity` tokens and number literals
/// that overflow (`1e999`). The rest of the document can still be salvaged.
fn sanitize_non_finite(raw: &str) -> Cow<'_, str> {
    let mut out = String::with_capacity(raw.len());
    let mut changed = false;
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = raw;

    while let Some(c) = rest.chars().next() {
        if !in_string {
            if let Some(token) = NON_FINITE_TOKENS.iter().find(|t| rest.starts_with(**t)) {
                out.push_str("null");
                rest = &rest[token.len()..];
                changed = true;
                continue;
            }
            if c == '-' || c.is_ascii_digit() {
                let len = rest.find(|ch: char| !is_number_char(ch)).unwrap_or(rest.len());
                let literal = &rest[..len];
                if literal.parse::<f64>().is_ok_and(f64::is_infinite) {
                    out.push_str("null");
                    changed = true;
                } else {
                    out.push_str(literal);
                }
                rest = &rest[len..];
                continue;
            }
        }

        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        }

        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    if changed {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(raw)
    }
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')
}

// ---------------------------------------------------------------------------
// StatisticsStore
// ---------------------------------------------------------------------------

/// Owns the statistics and writes them through to a [`KeyValueStore`] after
/// every mutation.
pub struct StatisticsStore<K: KeyValueStore> {
    backend: K,
    stats: Statistics,
    write_failures: u64,
}

impl<K: KeyValueStore> StatisticsStore<K> {
    /// Wrap `backend` and load whatever it currently holds.
    pub fn open(backend: K) -> Self {
        let stats = load_statistics(&backend);
        log::debug!(
            "loaded statistics: {} attempts, {} recent",
            stats.attempts,
            stats.recent.len()
        );
        Self {
            backend,
            stats,
            write_failures: 0,
        }
    }

    /// Re-read the persisted blob, replacing the in-memory copy.
    pub fn load(&mut self) -> &Statistics {
        self.stats = load_statistics(&self.backend);
        &self.stats
    }

    /// Fold in a new sample and persist.
    pub fn record(&mut self, sample: Sample) -> &Statistics {
        self.stats.record(sample);
        self.persist();
        &self.stats
    }

    /// Replace everything with the defaults and persist.
    pub fn reset(&mut self) -> &Statistics {
        self.stats = Statistics::default();
        self.persist();
        &self.stats
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn average(&self) -> Option<f64> {
        average(&self.stats)
    }

    /// The four displayed aggregates, with `last` supplied by the caller.
    pub fn aggregates(&self, last: Option<f64>) -> Aggregates {
        Aggregates {
            last,
            best: self.stats.best,
            average: self.average(),
            attempts: self.stats.attempts,
        }
    }

    /// Number of writes that failed since this store was opened.
    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    pub fn backend(&self) -> &K {
        &self.backend
    }

    fn persist(&mut self) {
        let json = self.stats.to_json();
        if let Err(e) = self.backend.set(STORAGE_KEY, &json) {
            self.write_failures += 1;
            log::warn!("failed to persist statistics: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::io;

    fn sample(ms: f64) -> Sample {
        Sample::new(ms).unwrap()
    }

    // -----------------------------------------------------------------------
    // Sample tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_sample_rejects_invalid() {
        assert!(Sample::new(-1.0).is_none());
        assert!(Sample::new(f64::NAN).is_none());
        assert!(Sample::new(f64::INFINITY).is_none());
        assert_eq!(Sample::new(0.0).unwrap().millis(), 0.0);
    }

    #[test]
    fn test_sample_from_duration() {
        let s = Sample::from_duration(Duration::from_micros(123_500));
        assert_eq!(s.millis(), 123.5);
    }

    // -----------------------------------------------------------------------
    // Aggregate tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_record_scenario() {
        let mut stats = Statistics::default();
        stats.record(sample(100.0));
        stats.record(sample(50.0));
        stats.record(sample(200.0));

        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.best, Some(50.0));
        assert_eq!(stats.recent, VecDeque::from(vec![100.0, 50.0, 200.0]));
        let avg = stats.average().unwrap();
        assert!((avg - 116.67).abs() < 0.01, "avg = {avg}");
    }

    #[test]
    fn test_recent_evicts_oldest_first() {
        let mut stats = Statistics::default();
        for i in 1..=11 {
            stats.record(sample(i as f64));
        }
        assert_eq!(stats.recent.len(), RECENT_WINDOW);
        assert!(!stats.recent.contains(&1.0));
        let expected: VecDeque<f64> = (2..=11).map(|i| i as f64).collect();
        assert_eq!(stats.recent, expected);
        assert_eq!(stats.attempts, 11);
    }

    #[test]
    fn test_best_never_exceeds_any_sample() {
        let mut stats = Statistics::default();
        let values = [320.0, 210.5, 999.0, 180.25, 181.0, 400.0];
        for v in values {
            stats.record(sample(v));
            let best = stats.best.unwrap();
            assert!(stats.recent.iter().all(|&r| best <= r));
        }
        assert_eq!(stats.best, Some(180.25));
    }

    #[test]
    fn test_average_empty_is_none() {
        assert_eq!(average(&Statistics::default()), None);
    }

    // -----------------------------------------------------------------------
    // Parsing / coercion tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_valid_blob() {
        let stats = Statistics::parse(r#"{"attempts":3,"best":50,"recent":[100,50,200]}"#);
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.best, Some(50.0));
        assert_eq!(stats.recent, VecDeque::from(vec![100.0, 50.0, 200.0]));
    }

    #[test]
    fn test_parse_garbage_defaults() {
        assert_eq!(Statistics::parse("not json"), Statistics::default());
        assert_eq!(Statistics::parse(""), Statistics::default());
        assert_eq!(Statistics::parse("[1,2,3]"), Statistics::default());
        assert_eq!(Statistics::parse("null"), Statistics::default());
    }

    #[test]
    fn test_parse_best_zero_is_present() {
        let stats = Statistics::parse(r#"{"attempts":1,"best":0,"recent":[0]}"#);
        assert_eq!(stats.best, Some(0.0));
    }

    #[test]
    fn test_parse_best_null_or_wrong_shape_is_absent() {
        assert_eq!(Statistics::parse(r#"{"best":null}"#).best, None);
        assert_eq!(Statistics::parse(r#"{"best":"fast"}"#).best, None);
        assert_eq!(Statistics::parse(r#"{"best":[1]}"#).best, None);
        assert_eq!(Statistics::parse(r#"{"best":""}"#).best, None);
        assert_eq!(Statistics::parse(r#"{"best":NaN}"#).best, None);
    }

    #[test]
    fn test_parse_best_numeric_string_is_coerced() {
        assert_eq!(Statistics::parse(r#"{"best":"187.5"}"#).best, Some(187.5));
    }

    #[test]
    fn test_parse_best_zero_string_is_absent() {
        assert_eq!(Statistics::parse(r#"{"best":"0"}"#).best, None);
        assert_eq!(Statistics::parse(r#"{"best":" 0.0 "}"#).best, None);
        assert_eq!(Statistics::parse(r#"{"best":0}"#).best, Some(0.0));
    }

    #[test]
    fn test_parse_recent_filters_non_numbers() {
        let stats = Statistics::parse(r#"{"recent":[1,"x",3,NaN,5]}"#);
        assert_eq!(stats.recent, VecDeque::from(vec![1.0, 3.0, 5.0]));
    }

    #[test]
    fn test_parse_overflowing_number_drops_only_that_field() {
        let stats = Statistics::parse(r#"{"attempts":3,"best":50,"recent":[1e999,5,7]}"#);
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.best, Some(50.0));
        assert_eq!(stats.recent, VecDeque::from(vec![5.0, 7.0]));

        let stats = Statistics::parse(r#"{"attempts":1e400,"best":50,"recent":[5,7]}"#);
        assert_eq!(stats.attempts, 0);
        assert_eq!(stats.best, Some(50.0));
        assert_eq!(stats.recent, VecDeque::from(vec![5.0, 7.0]));

        let stats = Statistics::parse(r#"{"attempts":2,"best":-1E+999,"recent":[]}"#);
        assert_eq!(stats.attempts, 2);
        assert_eq!(stats.best, None);
    }

    #[test]
    fn test_parse_recent_keeps_last_ten() {
        let items: Vec<String> = (1..=15).map(|i| i.to_string()).collect();
        let raw = format!(r#"{{"recent":[{}]}}"#, items.join(","));
        let stats = Statistics::parse(&raw);
        let expected: VecDeque<f64> = (6..=15).map(|i| i as f64).collect();
        assert_eq!(stats.recent, expected);
    }

    #[test]
    fn test_parse_recent_not_array_is_empty() {
        assert!(Statistics::parse(r#"{"recent":"1,2,3"}"#).recent.is_empty());
        assert!(Statistics::parse(r#"{"recent":{"0":1}}"#).recent.is_empty());
    }

    #[test]
    fn test_parse_attempts_coercion() {
        assert_eq!(Statistics::parse(r#"{"attempts":"7"}"#).attempts, 7);
        assert_eq!(Statistics::parse(r#"{"attempts":4.9}"#).attempts, 4);
        assert_eq!(Statistics::parse(r#"{"attempts":-3}"#).attempts, 0);
        assert_eq!(Statistics::parse(r#"{"attempts":"abc"}"#).attempts, 0);
        assert_eq!(Statistics::parse(r#"{"attempts":null}"#).attempts, 0);
        assert_eq!(Statistics::parse(r#"{"attempts":true}"#).attempts, 1);
        assert_eq!(Statistics::parse(r#"{"attempts":Infinity}"#).attempts, 0);
    }

    #[test]
    fn test_parse_fields_coerced_independently() {
        // Inconsistent partial data is kept as-is, not reconciled.
        let stats = Statistics::parse(r#"{"attempts":12,"best":"oops","recent":[]}"#);
        assert_eq!(stats.attempts, 12);
        assert_eq!(stats.best, None);
        assert!(stats.recent.is_empty());
    }

    #[test]
    fn test_sanitize_leaves_strings_alone() {
        let raw = r#"{"note":"NaN \"Infinity\"","recent":[-Infinity,2]}"#;
        let cleaned = sanitize_non_finite(raw);
        assert_eq!(
            cleaned,
            r#"{"note":"NaN \"Infinity\"","recent":[null,2]}"#
        );
    }

    #[test]
    fn test_sanitize_borrows_when_clean() {
        assert!(matches!(sanitize_non_finite("{}"), Cow::Borrowed(_)));
        let raw = r#"{"attempts":3,"best":1.5e2,"recent":[-0.5,1e3]}"#;
        assert!(matches!(sanitize_non_finite(raw), Cow::Borrowed(_)));
    }

    #[test]
    fn test_sanitize_overflowing_literals() {
        let raw = r#"{"note":"1e999","recent":[1e999,2,-1e400]}"#;
        assert_eq!(
            sanitize_non_finite(raw),
            r#"{"note":"1e999","recent":[null,2,null]}"#
        );
    }

    #[test]
    fn test_to_json_shape() {
        let mut stats = Statistics::default();
        assert_eq!(stats.to_json(), r#"{"attempts":0,"best":null,"recent":[]}"#);
        stats.record(sample(150.0));
        assert_eq!(
            stats.to_json(),
            r#"{"attempts":1,"best":150.0,"recent":[150.0]}"#
        );
    }

    // -----------------------------------------------------------------------
    // StatisticsStore tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_store_persists_after_record() {
        let mut store = StatisticsStore::open(MemoryStore::new());
        store.record(sample(250.0));

        let raw = store.backend().get(STORAGE_KEY).unwrap().unwrap();
        let reloaded = Statistics::parse(&raw);
        assert_eq!(&reloaded, store.statistics());
    }

    #[test]
    fn test_store_reset_persists_default() {
        let backend =
            MemoryStore::new().with_entry(STORAGE_KEY, r#"{"attempts":5,"best":90,"recent":[90]}"#);
        let mut store = StatisticsStore::open(backend);
        assert_eq!(store.statistics().attempts, 5);

        store.reset();
        assert_eq!(store.statistics(), &Statistics::default());
        let raw = store.backend().get(STORAGE_KEY).unwrap().unwrap();
        assert_eq!(Statistics::parse(&raw), Statistics::default());
    }

    #[test]
    fn test_store_attempts_equal_reactions_after_reset() {
        let mut store = StatisticsStore::open(MemoryStore::new());
        store.record(sample(1.0));
        store.reset();
        for n in 1..=25u64 {
            store.record(sample(100.0 + n as f64));
            assert_eq!(store.statistics().attempts, n);
        }
    }

    #[test]
    fn test_store_aggregates() {
        let mut store = StatisticsStore::open(MemoryStore::new());
        assert_eq!(
            store.aggregates(None),
            Aggregates {
                last: None,
                best: None,
                average: None,
                attempts: 0
            }
        );
        store.record(sample(200.0));
        store.record(sample(100.0));
        let agg = store.aggregates(Some(100.0));
        assert_eq!(agg.last, Some(100.0));
        assert_eq!(agg.best, Some(100.0));
        assert_eq!(agg.average, Some(150.0));
        assert_eq!(agg.attempts, 2);
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> io::Result<Option<String>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }

        fn set(&mut self, _key: &str, _value: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    #[test]
    fn test_store_write_failure_is_not_fatal() {
        let mut store = StatisticsStore::open(FailingStore);
        assert_eq!(store.statistics(), &Statistics::default());

        let stats = store.record(sample(321.0)).clone();
        assert_eq!(stats.attempts, 1);
        assert_eq!(stats.best, Some(321.0));
        assert_eq!(store.write_failures(), 1);
    }

    #[test]
    fn test_store_load_rereads_backend() {
        use crate::store::FileStore;

        let tmp = tempfile::tempdir().unwrap();
        let mut store = StatisticsStore::open(FileStore::new(tmp.path()));
        assert_eq!(store.statistics().attempts, 0);

        let mut other = FileStore::new(tmp.path());
        other
            .set(STORAGE_KEY, r#"{"attempts":2,"best":5,"recent":[5,10]}"#)
            .unwrap();

        let reloaded = store.load();
        assert_eq!(reloaded.attempts, 2);
        assert_eq!(reloaded.best, Some(5.0));
    }
}
