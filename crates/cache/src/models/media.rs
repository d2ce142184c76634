use crate::error::{Error, ErrorKind};
use crate::models::{from_id, from_timestamp, to_id, to_timestamp};
use exn::ResultExt;
use feedstash_models::Media;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MediaRow {
    pub(crate) id: i64,
    pub(crate) title: Option<String>,
    pub(crate) alt_text: Option<String>,
    pub(crate) caption: Option<String>,
    pub(crate) mime_type: Option<String>,
    pub(crate) source_url: Option<String>,
    pub(crate) width: Option<i64>,
    pub(crate) height: Option<i64>,
    pub(crate) published_at: Option<i64>,
}
impl TryFrom<&Media> for MediaRow {
    type Error = Error;
    fn try_from(media: &Media) -> Result<Self, Self::Error> {
        Ok(Self {
            id: to_id(media.id, "media id")?,
            title: media.title.clone(),
            alt_text: media.alt_text.clone(),
            caption: media.caption.clone(),
            mime_type: media.mime_type.clone(),
            source_url: media.source_url.clone(),
            width: media.width.map(i64::from),
            height: media.height.map(i64::from),
            published_at: media.published_at.map(|t| to_timestamp(t, "media published at")).transpose()?,
        })
    }
}
impl TryFrom<MediaRow> for Media {
    type Error = Error;
    fn try_from(row: MediaRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: from_id(row.id, "media id")?,
            title: row.title,
            alt_text: row.alt_text,
            caption: row.caption,
            mime_type: row.mime_type,
            source_url: row.source_url,
            width: row.width.map(u32::try_from).transpose().or_raise(|| ErrorKind::InvalidData("media width"))?,
            height: row.height.map(u32::try_from).transpose().or_raise(|| ErrorKind::InvalidData("media height"))?,
            published_at: row.published_at.map(|t| from_timestamp(t, "media published at")).transpose()?,
        })
    }
}
