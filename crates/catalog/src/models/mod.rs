mod binary;
mod element;
mod item;

pub use self::binary::{Binary, MasterType, MediaCategory, UNKNOWN_MEDIA_TYPE};
pub(crate) use self::binary::BinaryRow;
pub use self::element::Element;
pub(crate) use self::element::ElementRow;
pub use self::item::{Item, Variant};
pub(crate) use self::item::ItemRow;
use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use uuid::Uuid;

fn parse_uuid(value: &str, field: &'static str) -> Result<Uuid, Error> {
    Uuid::parse_str(value).or_raise(|| ErrorKind::InvalidData(field))
}

fn to_u32(value: Option<i64>, field: &'static str) -> Result<Option<u32>, Error> {
    value.map(|v| u32::try_from(v).or_raise(|| ErrorKind::InvalidData(field))).transpose()
}
