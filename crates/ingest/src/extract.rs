//! Embedded metadata extraction.

use arca_catalog::Element;
use arca_store::{ContentStore, Node};
use async_trait::async_trait;
use derive_more::{Display, Error};
use exn::ResultExt;
use std::io::Cursor;
use std::sync::Arc;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not read file from the content store")]
    Read,
    #[display("malformed metadata: {_0}")]
    Malformed(#[error(not(source))] String),
}

/// Reads embedded `(name, value)` metadata pairs from files.
///
/// Files an extractor doesn't understand yield an empty list, not an error.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Name of the extractor (used for logging only).
    fn name(&self) -> &str;

    async fn extract(&self, store: &dyn ContentStore, node: &Node) -> Result<Vec<Element>>;
}

pub type ExtractorHandle = Arc<dyn MetadataExtractor + Send + Sync>;

const EXIF_MEDIA_TYPES: [&str; 6] = ["image/jpeg", "image/tiff", "image/png", "image/webp", "image/heic", "image/heif"];

/// EXIF metadata of still images.
///
/// Only primary image fields are reported; thumbnail fields are dropped.
/// Values are rendered the way a person would read them, with units.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifExtractor;
impl ExifExtractor {
    pub fn supports(media_type: &str) -> bool {
        EXIF_MEDIA_TYPES.iter().any(|supported| media_type.eq_ignore_ascii_case(supported))
    }

    /// Parse EXIF fields from an image container.
    pub fn parse(bytes: &[u8]) -> Result<Vec<Element>> {
        let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_) | exif::Error::NotSupported(_) | exif::Error::BlankValue(_)) => {
                return Ok(Vec::new());
            },
            Err(e) => exn::bail!(ErrorKind::Malformed(e.to_string())),
        };
        Ok(exif
            .fields()
            .filter(|field| field.ifd_num == exif::In::PRIMARY)
            .map(|field| Element::new(field.tag.to_string(), field.display_value().with_unit(&exif).to_string()))
            .collect())
    }
}

#[async_trait]
impl MetadataExtractor for ExifExtractor {
    fn name(&self) -> &str {
        "exif"
    }

    async fn extract(&self, store: &dyn ContentStore, node: &Node) -> Result<Vec<Element>> {
        let supported = node.media_type.as_deref().is_some_and(Self::supports);
        if !node.is_file() || !supported {
            return Ok(Vec::new());
        }
        let bytes = store.read(node.id).await.or_raise(|| ErrorKind::Read)?;
        Self::parse(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arca_store::backend::MockStore;

    /// Little-endian TIFF with a single IFD holding `Make = "Nikon"`.
    const TIFF_WITH_MAKE: [u8; 32] = [
        b'I', b'I', 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00, // header, IFD0 at 8
        0x01, 0x00, // one entry
        0x0F, 0x01, 0x02, 0x00, 0x06, 0x00, 0x00, 0x00, 0x1A, 0x00, 0x00, 0x00, // Make, ASCII, 6, @26
        0x00, 0x00, 0x00, 0x00, // no next IFD
        b'N', b'i', b'k', b'o', b'n', 0x00,
    ];

    #[test]
    fn test_supported_media_types() {
        assert!(ExifExtractor::supports("image/jpeg"));
        assert!(ExifExtractor::supports("IMAGE/TIFF"));
        assert!(!ExifExtractor::supports("image/jp2"));
        assert!(!ExifExtractor::supports("application/pdf"));
    }

    #[test]
    fn test_parse_fields() {
        let elements = ExifExtractor::parse(&TIFF_WITH_MAKE).unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].name, "Make");
        assert!(elements[0].value.contains("Nikon"));
    }

    #[test]
    fn test_unknown_container_is_malformed() {
        let err = ExifExtractor::parse(b"definitely not an image").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Malformed(_)));
    }

    #[tokio::test]
    async fn test_extract_through_store() {
        let store = MockStore::with_files([
            ("c/preservation/scan.tif", TIFF_WITH_MAKE.to_vec()),
            ("c/preservation/notes.txt", b"Nikon".to_vec()),
        ]);
        let tiff = store.get_node(store.id_of("c/preservation/scan.tif")).await.unwrap();
        assert_eq!(ExifExtractor.extract(&store, &tiff).await.unwrap().len(), 1);
        let text = store.get_node(store.id_of("c/preservation/notes.txt")).await.unwrap();
        assert!(ExifExtractor.extract(&store, &text).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_file_is_error() {
        let store = MockStore::with_files([("c/preservation/scan.tif", TIFF_WITH_MAKE.to_vec())]);
        let tiff = store.get_node(store.id_of("c/preservation/scan.tif")).await.unwrap();
        store.set_unreachable("c/preservation/scan.tif");
        assert!(ExifExtractor.extract(&store, &tiff).await.is_err());
    }
}
