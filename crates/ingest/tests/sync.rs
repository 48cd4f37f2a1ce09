use arca_catalog::{Database, Item, MasterType, Repository, Variant};
use arca_ingest::error::ErrorKind;
use arca_ingest::{Collection, Ingester, PackageProfile, SyncMode};
use arca_store::StoreHandle;
use arca_store::backend::MockStore;
use rstest::rstest;
use std::sync::Arc;
use uuid::Uuid;

const COLLECTION: Uuid = Uuid::from_u128(0xc011);

/// Little-endian TIFF with a single IFD holding `Make = "Nikon"`.
const TIFF_WITH_MAKE: [u8; 32] = [
    b'I', b'I', 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00, // header, IFD0 at 8
    0x01, 0x00, // one entry
    0x0F, 0x01, 0x02, 0x00, 0x06, 0x00, 0x00, 0x00, 0x1A, 0x00, 0x00, 0x00, // Make, ASCII, 6, @26
    0x00, 0x00, 0x00, 0x00, // no next IFD
    b'N', b'i', b'k', b'o', b'n', 0x00,
];

struct Fixture {
    store: Arc<MockStore>,
    ingester: Ingester,
    collection: Collection,
}
impl Fixture {
    async fn new(profile: PackageProfile, files: &[&str]) -> Self {
        let store = Arc::new(MockStore::with_files(files.iter().map(|path| (*path, b"data".to_vec()))));
        let db = Database::connect_in_memory().await.unwrap();
        Self::with_catalog(store, Repository::from(&db), profile)
    }

    fn with_catalog(store: Arc<MockStore>, catalog: Repository, profile: PackageProfile) -> Self {
        let collection = Collection::new(COLLECTION)
            .with_profile(profile)
            .with_root(store.id_of("1164"), store.root_id());
        let handle: StoreHandle = store.clone();
        Self {
            store,
            ingester: Ingester::new(handle, catalog),
            collection,
        }
    }

    fn catalog(&self) -> &Repository {
        self.ingester.catalog()
    }

    async fn items(&self) -> Vec<Item> {
        self.catalog().list_items(COLLECTION).await.unwrap()
    }

    async fn binary_count(&self) -> usize {
        self.catalog().list_collection_binaries(COLLECTION).await.unwrap().len()
    }

    async fn item(&self, pathname: &str) -> Item {
        self.catalog().find_item(self.store.id_of(pathname)).await.unwrap().unwrap()
    }

    /// Child items of the object at `pathname`, by title.
    async fn pages(&self, pathname: &str) -> Vec<(String, Option<u32>, usize)> {
        let mut pages = Vec::new();
        for page in self.catalog().list_children(self.store.id_of(pathname)).await.unwrap() {
            let binaries = self.catalog().list_binaries(page.repository_id).await.unwrap().len();
            pages.push((page.title, page.page_number, binaries));
        }
        pages
    }
}

const TWO_OBJECTS: [&str; 6] = [
    "1164/obj1/preservation/p1.tif",
    "1164/obj1/access/p1.jp2",
    "1164/obj2/preservation/p1.tif",
    "1164/obj2/preservation/p2.tif",
    "1164/obj2/access/p1.jp2",
    "1164/obj2/access/p2.jp2",
];

#[tokio::test]
async fn test_create_only_is_idempotent() {
    let fixture = Fixture::new(PackageProfile::CompoundObject, &TWO_OBJECTS).await;
    let first = fixture.ingester.create_items(&fixture.collection).await.unwrap();
    assert_eq!(first.created, Some(4));
    assert!(first.warnings.is_empty());
    let (items, binaries) = (fixture.items().await.len(), fixture.binary_count().await);

    let second = fixture.ingester.create_items(&fixture.collection).await.unwrap();
    assert_eq!(second.created, Some(0));
    assert_eq!(fixture.items().await.len(), items);
    assert_eq!(fixture.binary_count().await, binaries);
}

#[tokio::test]
async fn test_update_converges_on_appearing_binary() {
    let fixture = Fixture::new(PackageProfile::CompoundObject, &TWO_OBJECTS[1..]).await;
    fixture.store.add_directory("1164/obj1/preservation");
    let first = fixture.ingester.update_items(&fixture.collection).await.unwrap();
    assert_eq!(first.warnings.len(), 1);
    let obj1 = fixture.store.id_of("1164/obj1");
    assert_eq!(fixture.catalog().list_binaries(obj1).await.unwrap().len(), 1);

    fixture.store.add_file("1164/obj1/preservation/p1.tif", b"data".to_vec());
    let second = fixture.ingester.update_items(&fixture.collection).await.unwrap();
    assert_eq!(second.created, Some(0));
    assert_eq!(second.updated, Some(1));
    assert!(second.warnings.is_empty());
    let binaries = fixture.catalog().list_binaries(obj1).await.unwrap();
    assert_eq!(binaries.len(), 2);
    assert!(binaries.iter().any(|b| b.master_type == MasterType::Preservation));

    let third = fixture.ingester.update_items(&fixture.collection).await.unwrap();
    assert_eq!(third.updated, Some(0));
}

#[tokio::test]
async fn test_update_converges_on_appearing_page_master() {
    let fixture = Fixture::new(
        PackageProfile::CompoundObject,
        &["1164/obj/preservation/p1.tif", "1164/obj/access/p1.jp2", "1164/obj/access/p2.jp2"],
    )
    .await;
    let first = fixture.ingester.update_items(&fixture.collection).await.unwrap();
    assert_eq!(first.created, Some(3));
    assert_eq!(first.warnings.len(), 1);

    fixture.store.add_file("1164/obj/preservation/p2.tif", b"data".to_vec());
    let second = fixture.ingester.update_items(&fixture.collection).await.unwrap();
    assert_eq!((second.created, second.updated), (Some(0), Some(1)));
    assert!(second.warnings.is_empty());
    assert_eq!(
        fixture.pages("1164/obj").await,
        [("p1.tif".to_string(), Some(1), 2), ("p2.tif".to_string(), Some(2), 2)]
    );
    assert_eq!(fixture.items().await.len(), 3);
}

#[tokio::test]
async fn test_update_converges_on_appearing_sub_item_master() {
    let fixture = Fixture::new(
        PackageProfile::MixedMedia,
        &[
            "1164/obj/side_a/preservation/t.wav",
            "1164/obj/side_a/access/t.mp3",
            "1164/obj/side_b/access/t.mp3",
        ],
    )
    .await;
    fixture.store.add_directory("1164/obj/side_b/preservation");
    let first = fixture.ingester.update_items(&fixture.collection).await.unwrap();
    assert_eq!(first.created, Some(3));
    assert_eq!(first.warnings.len(), 1);

    fixture.store.add_file("1164/obj/side_b/preservation/t.wav", b"data".to_vec());
    let second = fixture.ingester.update_items(&fixture.collection).await.unwrap();
    assert_eq!((second.created, second.updated), (Some(0), Some(1)));
    assert!(second.warnings.is_empty());
    assert_eq!(
        fixture.pages("1164/obj").await,
        [("side_a".to_string(), Some(1), 2), ("side_b".to_string(), Some(2), 2)]
    );
}

#[tokio::test]
async fn test_update_converges_on_appearing_single_item_master() {
    let fixture = Fixture::new(
        PackageProfile::SingleItemObject,
        &["1164/preservation/a.tif", "1164/access/a.jp2", "1164/access/b.jp2"],
    )
    .await;
    let first = fixture.ingester.update_items(&fixture.collection).await.unwrap();
    assert_eq!(first.created, Some(2));
    assert_eq!(first.warnings.len(), 1);

    fixture.store.add_file("1164/preservation/b.tif", b"data".to_vec());
    let second = fixture.ingester.update_items(&fixture.collection).await.unwrap();
    assert_eq!((second.created, second.updated), (Some(0), Some(1)));
    assert!(second.warnings.is_empty());
    let items = fixture.items().await;
    let titles: Vec<_> = items.iter().map(|item| item.title.as_str()).collect();
    assert_eq!(titles, ["a.tif", "b.tif"]);
    for item in &items {
        assert_eq!(fixture.catalog().list_binaries(item.repository_id).await.unwrap().len(), 2);
    }
}

#[tokio::test]
async fn test_update_collapses_two_pages_into_object() {
    let fixture = Fixture::new(PackageProfile::CompoundObject, &TWO_OBJECTS).await;
    fixture.ingester.update_items(&fixture.collection).await.unwrap();

    fixture.store.remove("1164/obj2/preservation/p2.tif");
    fixture.store.remove("1164/obj2/access/p2.jp2");
    let result = fixture.ingester.update_items(&fixture.collection).await.unwrap();
    assert_eq!((result.created, result.updated), (Some(0), Some(1)));
    assert!(result.warnings.is_empty());
    let obj2 = fixture.store.id_of("1164/obj2");
    assert_eq!(fixture.catalog().list_binaries(obj2).await.unwrap().len(), 2);
    assert_eq!(
        fixture.pages("1164/obj2").await,
        [("p1.tif".to_string(), Some(1), 0), ("p2.tif".to_string(), Some(2), 2)]
    );

    let deleted = fixture.ingester.delete_missing_items(&fixture.collection).await.unwrap();
    assert_eq!(deleted.deleted, Some(2));
    assert_eq!(fixture.binary_count().await, 4);
}

#[tokio::test]
async fn test_delete_missing_removes_set_difference() {
    let fixture = Fixture::new(
        PackageProfile::FreeForm,
        &["1164/dir1/a.jpg", "1164/dir1/b.jpg", "1164/dir1/c.jpg", "1164/dir2/d.jpg"],
    )
    .await;
    assert_eq!(fixture.ingester.create_items(&fixture.collection).await.unwrap().created, Some(6));

    fixture.store.remove("1164/dir1/b.jpg");
    fixture.store.remove("1164/dir2");
    let result = fixture.ingester.delete_missing_items(&fixture.collection).await.unwrap();
    assert_eq!(result.deleted, Some(3));
    assert_eq!((result.created, result.updated), (None, None));
    let titles: Vec<_> = fixture.items().await.into_iter().map(|item| item.title).collect();
    assert_eq!(titles, ["dir1", "a.jpg", "c.jpg"]);
    assert_eq!(fixture.binary_count().await, 2);
}

#[tokio::test]
async fn test_profile_collapse() {
    let fixture = Fixture::new(PackageProfile::CompoundObject, &TWO_OBJECTS).await;
    fixture.ingester.create_items(&fixture.collection).await.unwrap();

    let single = fixture.item("1164/obj1").await;
    assert_eq!(single.variant, None);
    assert!(single.is_top_level());
    assert_eq!(fixture.catalog().list_binaries(single.repository_id).await.unwrap().len(), 2);
    assert!(fixture.catalog().list_children(single.repository_id).await.unwrap().is_empty());

    let paged = fixture.item("1164/obj2").await;
    assert!(fixture.catalog().list_binaries(paged.repository_id).await.unwrap().is_empty());
    let pages = fixture.catalog().list_children(paged.repository_id).await.unwrap();
    assert_eq!(pages.len(), 2);
    for (page, number) in pages.iter().zip(1..) {
        assert_eq!(page.variant, Some(Variant::Page));
        assert_eq!(page.page_number, Some(number));
        assert_eq!(fixture.catalog().list_binaries(page.repository_id).await.unwrap().len(), 2);
    }
}

#[tokio::test]
async fn test_missing_role_folder_is_tolerated() {
    let fixture = Fixture::new(PackageProfile::CompoundObject, &TWO_OBJECTS[1..]).await;
    let result = fixture.ingester.create_items(&fixture.collection).await.unwrap();
    assert_eq!(result.created, Some(4));
    assert_eq!(result.warnings, ["1164/obj1: missing preservation folder"]);

    let obj1 = fixture.catalog().list_binaries(fixture.store.id_of("1164/obj1")).await.unwrap();
    assert_eq!(obj1.len(), 1);
    assert_eq!(obj1[0].master_type, MasterType::Access);
    let pages = fixture.catalog().list_children(fixture.store.id_of("1164/obj2")).await.unwrap();
    assert_eq!(pages.len(), 2);
}

#[tokio::test]
async fn test_free_form_hierarchy() {
    let fixture = Fixture::new(PackageProfile::FreeForm, &["1164/dir1/image1.jpg", "1164/dir1/dir2/image2.jpg"]).await;
    let result = fixture.ingester.create_items(&fixture.collection).await.unwrap();
    assert_eq!(result.created, Some(4));

    let dir1 = fixture.item("1164/dir1").await;
    let dir2 = fixture.item("1164/dir1/dir2").await;
    let image1 = fixture.item("1164/dir1/image1.jpg").await;
    let image2 = fixture.item("1164/dir1/dir2/image2.jpg").await;
    assert_eq!((dir1.variant, dir1.parent_id), (Some(Variant::Directory), None));
    assert_eq!((dir2.variant, dir2.parent_id), (Some(Variant::Directory), Some(dir1.repository_id)));
    assert_eq!((image1.variant, image1.parent_id), (Some(Variant::File), Some(dir1.repository_id)));
    assert_eq!((image2.variant, image2.parent_id), (Some(Variant::File), Some(dir2.repository_id)));

    let binary = fixture.catalog().find_binary("1164/dir1/image1.jpg").await.unwrap().unwrap();
    assert_eq!(binary.item_id, image1.repository_id);
    assert_eq!(binary.media_type, "image/jpeg");
    assert_eq!(binary.byte_size, 4);
}

#[tokio::test]
async fn test_store_failure_leaves_catalog_unchanged() {
    let fixture = Fixture::new(PackageProfile::FreeForm, &["1164/dir1/image1.jpg", "1164/dir1/dir2/image2.jpg"]).await;
    fixture.ingester.create_items(&fixture.collection).await.unwrap();
    let before = fixture.items().await;

    fixture.store.add_file("1164/dir3/image3.jpg", b"data".to_vec());
    fixture.store.remove("1164/dir1/image1.jpg");
    fixture.store.set_unreachable("1164/dir3");
    for mode in [SyncMode::CreateAndUpdate, SyncMode::DeleteMissing] {
        let err = fixture.ingester.sync(&fixture.collection, mode).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::StoreUnreachable));
        assert!(err.is_retryable());
    }
    assert_eq!(fixture.items().await, before);
}

#[tokio::test]
async fn test_duplicate_listing_yields_one_item() {
    let fixture = Fixture::new(PackageProfile::FreeForm, &["1164/dir1/image1.jpg"]).await;
    fixture.store.link("1164", "1164/dir1/image1.jpg");
    let result = fixture.ingester.create_items(&fixture.collection).await.unwrap();
    assert_eq!(result.created, Some(2));
    assert_eq!(result.warnings, ["1164/dir1/image1.jpg: listed more than once, skipped"]);
    assert_eq!(fixture.item("1164/dir1/image1.jpg").await.parent_id, Some(fixture.store.id_of("1164/dir1")));
}

#[tokio::test]
async fn test_paged_store_gives_same_catalog() {
    let eager = Fixture::new(PackageProfile::CompoundObject, &TWO_OBJECTS).await;
    eager.ingester.create_items(&eager.collection).await.unwrap();
    let store = Arc::new(MockStore::with_files(TWO_OBJECTS.map(|path| (path, b"data".to_vec()))).paged(1));
    let db = Database::connect_in_memory().await.unwrap();
    let paged = Fixture::with_catalog(store, Repository::from(&db), PackageProfile::CompoundObject);
    paged.ingester.create_items(&paged.collection).await.unwrap();
    assert_eq!(eager.items().await, paged.items().await);
}

#[tokio::test]
async fn test_foreign_items_are_skipped() {
    let fixture = Fixture::new(PackageProfile::FreeForm, &["1164/dir1/image1.jpg", "1164/dir2/image2.jpg"]).await;
    let mut other = fixture.collection.clone();
    other.id = Uuid::from_u128(0xc022);
    other.content_store_root_id = Some(fixture.store.id_of("1164"));
    fixture.ingester.create_items(&other).await.unwrap();
    fixture.store.remove("1164/dir2");

    let result = fixture.ingester.create_items(&fixture.collection).await.unwrap();
    assert_eq!(result.created, Some(0));
    assert_eq!(result.warnings.len(), 2);
    assert!(result.warnings[0].contains("already belongs to collection"));
    assert!(fixture.items().await.is_empty());
}

#[tokio::test]
async fn test_recreate_binaries() {
    let fixture = Fixture::new(PackageProfile::CompoundObject, &TWO_OBJECTS).await;
    fixture.ingester.create_items(&fixture.collection).await.unwrap();
    fixture.store.add_file("1164/obj3/preservation/p1.tif", b"data".to_vec());
    fixture.store.set_dimensions("1164/obj1/access/p1.jp2", 640, 480);

    let result = fixture.ingester.recreate_binaries(&fixture.collection).await.unwrap();
    assert_eq!(result.created, Some(6));
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(fixture.items().await.len(), 4);
    let access = fixture.catalog().find_binary("1164/obj1/access/p1.jp2").await.unwrap().unwrap();
    assert_eq!((access.width, access.height), (Some(640), Some(480)));
    assert!(fixture.catalog().find_binary("1164/obj3/preservation/p1.tif").await.unwrap().is_none());
}

#[tokio::test]
async fn test_metadata_extraction() {
    let store = Arc::new(MockStore::with_files([
        ("1164/obj/preservation/scan.tif", TIFF_WITH_MAKE.to_vec()),
        ("1164/obj/access/scan.jpg", b"not really a jpeg".to_vec()),
    ]));
    let db = Database::connect_in_memory().await.unwrap();
    let fixture = Fixture::with_catalog(store, Repository::from(&db), PackageProfile::CompoundObject);
    fixture.ingester.create_items(&fixture.collection).await.unwrap();
    let obj = fixture.store.id_of("1164/obj");
    assert!(fixture.catalog().list_elements(obj).await.unwrap().is_empty());

    let result = fixture.ingester.replace_metadata(&fixture.collection, true).await.unwrap();
    assert_eq!(result.updated, Some(1));
    let elements = fixture.catalog().list_elements(obj).await.unwrap();
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0].name, "Make");
    assert!(elements[0].value.contains("Nikon"));
}

#[tokio::test]
async fn test_create_with_metadata_extraction() {
    let store = Arc::new(MockStore::with_files([("1164/scan.tif", TIFF_WITH_MAKE.to_vec())]));
    let db = Database::connect_in_memory().await.unwrap();
    let mut fixture = Fixture::with_catalog(store, Repository::from(&db), PackageProfile::FreeForm);
    fixture.ingester = fixture.ingester.with_metadata_extraction(true);
    fixture.ingester.create_items(&fixture.collection).await.unwrap();
    let elements = fixture.catalog().list_elements(fixture.store.id_of("1164/scan.tif")).await.unwrap();
    assert_eq!(elements.len(), 1);
}

#[tokio::test]
async fn test_renumber_pages() {
    let fixture = Fixture::new(PackageProfile::CompoundObject, &TWO_OBJECTS).await;
    fixture.ingester.create_items(&fixture.collection).await.unwrap();
    let obj2 = fixture.store.id_of("1164/obj2");
    let mut page = fixture.catalog().list_children(obj2).await.unwrap().remove(0);
    assert_eq!(page.title, "p1.tif");
    page.page_number = Some(7);
    let mut batch = fixture.catalog().begin().await.unwrap();
    batch.update_item(&page).await.unwrap();
    batch.commit().await.unwrap();

    let result = fixture.ingester.renumber_pages(&fixture.collection).await.unwrap();
    assert_eq!(result.updated, Some(1));
    assert_eq!(
        fixture.pages("1164/obj2").await,
        [("p1.tif".to_string(), Some(1), 2), ("p2.tif".to_string(), Some(2), 2)]
    );
}

#[rstest]
#[case(PackageProfile::FreeForm)]
#[case(PackageProfile::SingleItemObject)]
#[tokio::test]
async fn test_renumber_pages_unsupported(#[case] profile: PackageProfile) {
    let fixture = Fixture::new(profile, &["1164/preservation/a.tif"]).await;
    let err = fixture.ingester.renumber_pages(&fixture.collection).await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::InvalidConfiguration(_)));
}

#[tokio::test]
async fn test_dry_run_recreate_binaries_counts_inserts() {
    let store = Arc::new(MockStore::with_files(TWO_OBJECTS.map(|path| (path, b"data".to_vec()))));
    let db = Database::connect_in_memory().await.unwrap();
    let fixture = Fixture::with_catalog(store.clone(), Repository::from(&db), PackageProfile::CompoundObject);
    fixture.ingester.create_items(&fixture.collection).await.unwrap();

    let dry_run = Fixture::with_catalog(store, Repository::new(db.pool().clone(), true), PackageProfile::CompoundObject);
    let result = dry_run.ingester.recreate_binaries(&dry_run.collection).await.unwrap();
    assert_eq!(result.created, Some(6));
    assert!(result.warnings.is_empty());
    assert_eq!(fixture.binary_count().await, 6);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let store = Arc::new(MockStore::with_files(TWO_OBJECTS.map(|path| (path, b"data".to_vec()))));
    let db = Database::connect_in_memory().await.unwrap();
    let fixture = Fixture::with_catalog(store, Repository::new(db.pool().clone(), true), PackageProfile::CompoundObject);
    let result = fixture.ingester.create_items(&fixture.collection).await.unwrap();
    assert_eq!(result.created, Some(4));
    assert!(fixture.items().await.is_empty());
}

#[tokio::test]
async fn test_single_item_and_mixed_media_profiles() {
    let single = Fixture::new(
        PackageProfile::SingleItemObject,
        &["1164/preservation/a.tif", "1164/preservation/b.tif", "1164/access/a.jp2", "1164/access/b.jp2"],
    )
    .await;
    assert_eq!(single.ingester.create_items(&single.collection).await.unwrap().created, Some(2));
    assert!(single.items().await.iter().all(|item| item.is_top_level() && item.variant.is_none()));

    let mixed = Fixture::new(
        PackageProfile::MixedMedia,
        &[
            "1164/obj/side_a/preservation/t.wav",
            "1164/obj/side_a/access/t.mp3",
            "1164/obj/side_b/preservation/t.wav",
            "1164/obj/side_b/access/t.mp3",
        ],
    )
    .await;
    let result = mixed.ingester.create_items(&mixed.collection).await.unwrap();
    assert_eq!(result.created, Some(3));
    assert_eq!(mixed.binary_count().await, 4);
    let sides = mixed.catalog().list_children(mixed.store.id_of("1164/obj")).await.unwrap();
    let titles: Vec<_> = sides.iter().map(|side| side.title.as_str()).collect();
    assert_eq!(titles, ["side_a", "side_b"]);
}
