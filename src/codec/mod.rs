//! Typed record encoding for the sample and bookmark stores.
//!
//! Every stored value is a single discriminator byte followed by the prost
//! encoding of the record body:
//!
//! ```text
//! [kind: u8][prost message bytes]
//! ```
//!
//! The discriminator values are persisted and therefore fixed:
//! Metric=0, Histogram=1, FloatHistogram=2, Metadata=3, Exemplar=4, Bookmark=5.

mod messages;

pub use messages::{
    BucketSpan, Bookmark, ExemplarSample, FloatHistogramSample, HistogramSample, Label,
    MetricMetadata, MetricSample, MetricType, ResetHint,
};

use prost::Message;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Empty record buffer")]
    Empty,

    #[error("Unknown record kind: {0}")]
    UnknownKind(u8),

    #[error("Protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Discriminator written in front of every encoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordKind {
    Metric = 0,
    Histogram = 1,
    FloatHistogram = 2,
    Metadata = 3,
    Exemplar = 4,
    Bookmark = 5,
}

impl RecordKind {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for RecordKind {
    type Error = CodecError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::Metric),
            1 => Ok(Self::Histogram),
            2 => Ok(Self::FloatHistogram),
            3 => Ok(Self::Metadata),
            4 => Ok(Self::Exemplar),
            5 => Ok(Self::Bookmark),
            other => Err(CodecError::UnknownKind(other)),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Metric => "metric",
            Self::Histogram => "histogram",
            Self::FloatHistogram => "float_histogram",
            Self::Metadata => "metadata",
            Self::Exemplar => "exemplar",
            Self::Bookmark => "bookmark",
        };
        f.write_str(name)
    }
}

/// One value held by a `SignalDb`.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Metric(MetricSample),
    Histogram(HistogramSample),
    FloatHistogram(FloatHistogramSample),
    Metadata(MetricMetadata),
    Exemplar(ExemplarSample),
    Bookmark(Bookmark),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Metric(_) => RecordKind::Metric,
            Record::Histogram(_) => RecordKind::Histogram,
            Record::FloatHistogram(_) => RecordKind::FloatHistogram,
            Record::Metadata(_) => RecordKind::Metadata,
            Record::Exemplar(_) => RecordKind::Exemplar,
            Record::Bookmark(_) => RecordKind::Bookmark,
        }
    }

    /// Encode as `[kind][body]`.
    pub fn encode(&self) -> Vec<u8> {
        let body = match self {
            Record::Metric(m) => m.encode_to_vec(),
            Record::Histogram(h) => h.encode_to_vec(),
            Record::FloatHistogram(h) => h.encode_to_vec(),
            Record::Metadata(m) => m.encode_to_vec(),
            Record::Exemplar(e) => e.encode_to_vec(),
            Record::Bookmark(b) => b.encode_to_vec(),
        };

        let mut buf = Vec::with_capacity(1 + body.len());
        buf.push(self.kind().as_u8());
        buf.extend_from_slice(&body);
        buf
    }

    /// Decode a buffer produced by [`Record::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&tag, body) = bytes.split_first().ok_or(CodecError::Empty)?;
        let record = match RecordKind::try_from(tag)? {
            RecordKind::Metric => Record::Metric(MetricSample::decode(body)?),
            RecordKind::Histogram => Record::Histogram(HistogramSample::decode(body)?),
            RecordKind::FloatHistogram => {
                Record::FloatHistogram(FloatHistogramSample::decode(body)?)
            }
            RecordKind::Metadata => Record::Metadata(MetricMetadata::decode(body)?),
            RecordKind::Exemplar => Record::Exemplar(ExemplarSample::decode(body)?),
            RecordKind::Bookmark => Record::Bookmark(Bookmark::decode(body)?),
        };
        Ok(record)
    }

    /// Read only the discriminator of an encoded record.
    pub fn peek_kind(bytes: &[u8]) -> Result<RecordKind> {
        let tag = *bytes.first().ok_or(CodecError::Empty)?;
        RecordKind::try_from(tag)
    }

    pub fn into_bookmark(self) -> Option<Bookmark> {
        match self {
            Record::Bookmark(b) => Some(b),
            _ => None,
        }
    }
}

impl From<MetricSample> for Record {
    fn from(value: MetricSample) -> Self {
        Record::Metric(value)
    }
}

impl From<HistogramSample> for Record {
    fn from(value: HistogramSample) -> Self {
        Record::Histogram(value)
    }
}

impl From<FloatHistogramSample> for Record {
    fn from(value: FloatHistogramSample) -> Self {
        Record::FloatHistogram(value)
    }
}

impl From<MetricMetadata> for Record {
    fn from(value: MetricMetadata) -> Self {
        Record::Metadata(value)
    }
}

impl From<ExemplarSample> for Record {
    fn from(value: ExemplarSample) -> Self {
        Record::Exemplar(value)
    }
}

impl From<Bookmark> for Record {
    fn from(value: Bookmark) -> Self {
        Record::Bookmark(value)
    }
}
