mod author;
mod media;
mod post;
mod term;
mod watermark;

pub(crate) use self::author::AuthorRow;
pub(crate) use self::media::MediaRow;
pub(crate) use self::post::PostRow;
pub(crate) use self::term::TermRow;
pub(crate) use self::watermark::WatermarkRow;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use time::UtcDateTime;

pub(crate) fn to_id(id: u64, field: &'static str) -> Result<i64> {
    i64::try_from(id).or_raise(|| ErrorKind::InvalidData(field))
}

pub(crate) fn from_id(id: i64, field: &'static str) -> Result<u64> {
    u64::try_from(id).or_raise(|| ErrorKind::InvalidData(field))
}

/// Timestamps are stored as nanoseconds since the Unix epoch, which covers
/// the years 1677 to 2262.
pub(crate) fn to_timestamp(at: UtcDateTime, field: &'static str) -> Result<i64> {
    i64::try_from(at.unix_timestamp_nanos()).or_raise(|| ErrorKind::InvalidData(field))
}

pub(crate) fn from_timestamp(nanos: i64, field: &'static str) -> Result<UtcDateTime> {
    UtcDateTime::from_unix_timestamp_nanos(i128::from(nanos)).or_raise(|| ErrorKind::InvalidData(field))
}
