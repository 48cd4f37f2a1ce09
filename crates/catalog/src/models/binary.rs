use crate::error::{Error, ErrorKind};
use crate::models::{parse_uuid, to_u32};
use exn::ResultExt;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Media type recorded when the store doesn't report one.
pub const UNKNOWN_MEDIA_TYPE: &str = "unknown/unknown";

/// Which master a binary is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MasterType {
    Preservation,
    Access,
}
impl MasterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preservation => "preservation",
            Self::Access => "access",
        }
    }
}
impl FromStr for MasterType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "preservation" => Self::Preservation,
            "access" => Self::Access,
            _ => exn::bail!(ErrorKind::InvalidData("master type")),
        })
    }
}
impl Display for MasterType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Coarse grouping of media types used for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaCategory {
    Image,
    Video,
    Audio,
    Text,
    Document,
    ThreeD,
    Unknown,
}
impl MediaCategory {
    /// Derive the category of a MIME type.
    ///
    /// ```
    /// use arca_catalog::MediaCategory;
    /// assert_eq!(MediaCategory::from_media_type("image/jp2"), MediaCategory::Image);
    /// assert_eq!(MediaCategory::from_media_type("application/pdf"), MediaCategory::Document);
    /// assert_eq!(MediaCategory::from_media_type("unknown/unknown"), MediaCategory::Unknown);
    /// ```
    pub fn from_media_type(media_type: &str) -> Self {
        let essence = media_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        let Some((top, sub)) = essence.split_once('/') else {
            return Self::Unknown;
        };
        match (top, sub) {
            ("image", _) => Self::Image,
            ("video", _) => Self::Video,
            ("audio", _) => Self::Audio,
            ("model", _) => Self::ThreeD,
            ("application", "sla" | "vnd.ms-pki.stl" | "x-tgif" | "x-blender" | "prs.wavefront-obj") => Self::ThreeD,
            ("text", _) => Self::Text,
            ("application", "pdf" | "msword" | "rtf" | "epub+zip" | "postscript") => Self::Document,
            ("application", sub)
                if sub.starts_with("vnd.openxmlformats-officedocument.")
                    || sub.starts_with("vnd.oasis.opendocument.")
                    || sub.starts_with("vnd.ms-") =>
            {
                Self::Document
            },
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Text => "text",
            Self::Document => "document",
            Self::ThreeD => "3d",
            Self::Unknown => "unknown",
        }
    }
}
impl Display for MediaCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A file-level artifact owned by exactly one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    /// Owning item's repository id.
    pub item_id: Uuid,
    pub master_type: MasterType,
    pub media_type: String,
    /// Content-store-relative pathname. Unique across the catalog.
    pub object_key: String,
    pub byte_size: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}
impl Binary {
    pub fn new(item_id: Uuid, master_type: MasterType, object_key: impl Into<String>, byte_size: u64) -> Self {
        Self {
            item_id,
            master_type,
            media_type: UNKNOWN_MEDIA_TYPE.to_string(),
            object_key: object_key.into(),
            byte_size,
            width: None,
            height: None,
        }
    }

    pub fn media_category(&self) -> MediaCategory {
        MediaCategory::from_media_type(&self.media_type)
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BinaryRow {
    pub(crate) item_id: String,
    pub(crate) master_type: String,
    pub(crate) media_type: String,
    pub(crate) object_key: String,
    pub(crate) byte_size: i64,
    pub(crate) width: Option<i64>,
    pub(crate) height: Option<i64>,
}
impl TryFrom<&Binary> for BinaryRow {
    type Error = Error;
    fn try_from(binary: &Binary) -> Result<Self, Self::Error> {
        Ok(Self {
            item_id: binary.item_id.to_string(),
            master_type: binary.master_type.as_str().to_string(),
            media_type: binary.media_type.clone(),
            object_key: binary.object_key.clone(),
            byte_size: i64::try_from(binary.byte_size).or_raise(|| ErrorKind::InvalidData("byte size"))?,
            width: binary.width.map(i64::from),
            height: binary.height.map(i64::from),
        })
    }
}
impl TryFrom<BinaryRow> for Binary {
    type Error = Error;
    fn try_from(row: BinaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            item_id: parse_uuid(&row.item_id, "item id")?,
            master_type: row.master_type.parse()?,
            media_type: row.media_type,
            object_key: row.object_key,
            byte_size: u64::try_from(row.byte_size).or_raise(|| ErrorKind::InvalidData("byte size"))?,
            width: to_u32(row.width, "width")?,
            height: to_u32(row.height, "height")?,
        })
    }
}
