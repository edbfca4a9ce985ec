//! Wire shapes for the records persisted in the sample and bookmark stores.
//!
//! These are hand-derived prost messages; the field tags are part of the
//! on-disk format and must never be renumbered.

use std::collections::HashMap;

#[derive(Clone, PartialEq, Eq, Hash, prost::Message)]
pub struct Label {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A single float sample of one series.
#[derive(Clone, PartialEq, prost::Message)]
pub struct MetricSample {
    #[prost(message, repeated, tag = "1")]
    pub labels: Vec<Label>,
    #[prost(int64, tag = "2")]
    pub timestamp_ms: i64,
    #[prost(double, tag = "3")]
    pub value: f64,
}

#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct BucketSpan {
    #[prost(sint32, tag = "1")]
    pub offset: i32,
    #[prost(uint32, tag = "2")]
    pub length: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ResetHint {
    Unknown = 0,
    Yes = 1,
    No = 2,
    Gauge = 3,
}

/// Native (sparse) histogram with integer counts stored as deltas.
#[derive(Clone, PartialEq, prost::Message)]
pub struct HistogramSample {
    #[prost(message, repeated, tag = "1")]
    pub labels: Vec<Label>,
    #[prost(int64, tag = "2")]
    pub timestamp_ms: i64,
    #[prost(sint32, tag = "3")]
    pub schema: i32,
    #[prost(double, tag = "4")]
    pub zero_threshold: f64,
    #[prost(uint64, tag = "5")]
    pub zero_count: u64,
    #[prost(uint64, tag = "6")]
    pub count: u64,
    #[prost(double, tag = "7")]
    pub sum: f64,
    #[prost(message, repeated, tag = "8")]
    pub positive_spans: Vec<BucketSpan>,
    #[prost(sint64, repeated, tag = "9")]
    pub positive_deltas: Vec<i64>,
    #[prost(message, repeated, tag = "10")]
    pub negative_spans: Vec<BucketSpan>,
    #[prost(sint64, repeated, tag = "11")]
    pub negative_deltas: Vec<i64>,
    #[prost(enumeration = "ResetHint", tag = "12")]
    pub reset_hint: i32,
}

/// Native histogram with float counts stored as absolute values.
#[derive(Clone, PartialEq, prost::Message)]
pub struct FloatHistogramSample {
    #[prost(message, repeated, tag = "1")]
    pub labels: Vec<Label>,
    #[prost(int64, tag = "2")]
    pub timestamp_ms: i64,
    #[prost(sint32, tag = "3")]
    pub schema: i32,
    #[prost(double, tag = "4")]
    pub zero_threshold: f64,
    #[prost(double, tag = "5")]
    pub zero_count: f64,
    #[prost(double, tag = "6")]
    pub count: f64,
    #[prost(double, tag = "7")]
    pub sum: f64,
    #[prost(message, repeated, tag = "8")]
    pub positive_spans: Vec<BucketSpan>,
    #[prost(double, repeated, tag = "9")]
    pub positive_counts: Vec<f64>,
    #[prost(message, repeated, tag = "10")]
    pub negative_spans: Vec<BucketSpan>,
    #[prost(double, repeated, tag = "11")]
    pub negative_counts: Vec<f64>,
    #[prost(enumeration = "ResetHint", tag = "12")]
    pub reset_hint: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum MetricType {
    Unknown = 0,
    Counter = 1,
    Gauge = 2,
    Histogram = 3,
    GaugeHistogram = 4,
    Summary = 5,
    Info = 6,
    StateSet = 7,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct MetricMetadata {
    #[prost(string, tag = "1")]
    pub metric_family: String,
    #[prost(enumeration = "MetricType", tag = "2")]
    pub metric_type: i32,
    #[prost(string, tag = "3")]
    pub help: String,
    #[prost(string, tag = "4")]
    pub unit: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ExemplarSample {
    #[prost(message, repeated, tag = "1")]
    pub series_labels: Vec<Label>,
    #[prost(message, repeated, tag = "2")]
    pub exemplar_labels: Vec<Label>,
    #[prost(double, tag = "3")]
    pub value: f64,
    #[prost(int64, tag = "4")]
    pub timestamp_ms: i64,
}

/// A consumer's checkpoint: the last sample key it fully processed.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Bookmark {
    #[prost(uint64, tag = "1")]
    pub key: u64,
    #[prost(map = "string, string", tag = "2")]
    pub metadata: HashMap<String, String>,
}

impl Bookmark {
    pub fn at(key: u64) -> Self {
        Self {
            key,
            metadata: HashMap::new(),
        }
    }
}
