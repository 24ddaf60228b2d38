//! Integration tests for the on-disk species store
//!
//! Tests cover:
//! - Save then load reproduces the record exactly
//! - Folder layout (`<root>/<key>/<key>.jpg|json`)
//! - Last-write-wins on key collision
//! - Missing and empty storage roots are reported as listings, not errors
//! - Malformed JSON is reported per entry; downloads are byte-exact

use species_common::{
    FolderKey, Listing, SpeciesRecord, SpeciesStore, StoreError, StoredRecord,
};
use tempfile::TempDir;

fn record(common_name: &str) -> SpeciesRecord {
    SpeciesRecord {
        group: "Mammalia".to_string(),
        binomial: "Panthera uncia".to_string(),
        iucn_id_no: 22732,
        common_name: common_name.to_string(),
        name_language: "English".to_string(),
        iucn_category: "VU".to_string(),
        iso_a3: "NPL".to_string(),
        total_area: 2_802_450.123_456_789,
        small_range: false,
        wb_datanam: "Nepal".to_string(),
        wb_iso: "NP".to_string(),
        datanam_area: 0.1 + 0.2,
        datanam_pct_area: 1.0 / 3.0,
    }
}

const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

#[tokio::test]
async fn test_snow_leopard_layout() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("data");
    let store = SpeciesStore::new(&root);

    let stored = store.save(&record("Snow Leopard"), JPEG_BYTES).await.unwrap();

    assert_eq!(stored.key.as_str(), "Snow_Leopard");
    assert_eq!(stored.folder, root.join("Snow_Leopard"));
    assert!(root.join("Snow_Leopard/Snow_Leopard.jpg").is_file());
    assert!(root.join("Snow_Leopard/Snow_Leopard.json").is_file());
    assert!(!stored.replaced);

    let json = std::fs::read_to_string(root.join("Snow_Leopard/Snow_Leopard.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["common_name"], "Snow Leopard");
    assert!(json.contains("\n    \"binomial\""), "JSON should be indented");

    let image = std::fs::read(root.join("Snow_Leopard/Snow_Leopard.jpg")).unwrap();
    assert_eq!(image, JPEG_BYTES);
}

#[tokio::test]
async fn test_save_then_load_round_trip() {
    let temp = TempDir::new().unwrap();
    let store = SpeciesStore::new(temp.path());
    let original = record("Red Panda");

    let stored = store.save(&original, JPEG_BYTES).await.unwrap();
    let entry = store.load(&stored.key).await.unwrap();

    assert_eq!(entry.record, StoredRecord::Valid(original));
    assert_eq!(
        entry.image_path,
        Some(temp.path().join("Red_Panda").join("Red_Panda.jpg"))
    );
    assert_eq!(store.read_image(&stored.key).await.unwrap(), JPEG_BYTES);
}

#[tokio::test]
async fn test_same_key_last_write_wins() {
    let temp = TempDir::new().unwrap();
    let store = SpeciesStore::new(temp.path());

    let mut first = record("Grey Wolf");
    first.iucn_category = "LC".to_string();
    let mut second = record("Grey Wolf");
    second.iucn_category = "NT".to_string();

    store.save(&first, b"first image").await.unwrap();
    let stored = store.save(&second, b"second image").await.unwrap();
    assert!(stored.replaced);

    let key = FolderKey::from_common_name("Grey Wolf").unwrap();
    let entry = store.load(&key).await.unwrap();
    assert_eq!(entry.record.valid().unwrap().iucn_category, "NT");
    assert_eq!(store.read_image(&key).await.unwrap(), b"second image");

    assert_eq!(store.browse().await.unwrap(), Listing::Entries(vec![key]));
}

#[tokio::test]
async fn test_names_normalising_to_same_key_overwrite() {
    let temp = TempDir::new().unwrap();
    let store = SpeciesStore::new(temp.path());

    store.save(&record("Grey Wolf"), JPEG_BYTES).await.unwrap();
    store.save(&record("Grey_Wolf"), JPEG_BYTES).await.unwrap();

    let listing = store.browse().await.unwrap();
    assert_eq!(listing.entries().len(), 1);

    let entry = store.load(&listing.entries()[0]).await.unwrap();
    assert_eq!(entry.record.valid().unwrap().common_name, "Grey_Wolf");
}

#[tokio::test]
async fn test_empty_common_name_not_stored() {
    let temp = TempDir::new().unwrap();
    let store = SpeciesStore::new(temp.path().join("data"));

    let result = store.save(&record(""), JPEG_BYTES).await;
    assert!(matches!(result, Err(StoreError::EmptyCommonName)));
    assert!(!temp.path().join("data").exists());
}

#[tokio::test]
async fn test_browse_missing_root() {
    let temp = TempDir::new().unwrap();
    let store = SpeciesStore::new(temp.path().join("does-not-exist"));

    let listing = store.browse().await.unwrap();
    assert_eq!(listing, Listing::MissingRoot);
    assert!(listing.entries().is_empty());
}

#[tokio::test]
async fn test_browse_empty_root_ignores_files() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("stray.txt"), "not a species").unwrap();
    let store = SpeciesStore::new(temp.path());

    assert_eq!(store.browse().await.unwrap(), Listing::Empty);
}

#[tokio::test]
async fn test_browse_sorted() {
    let temp = TempDir::new().unwrap();
    let store = SpeciesStore::new(temp.path());
    for name in ["Zebra", "Aardvark", "Snow Leopard"] {
        store.save(&record(name), JPEG_BYTES).await.unwrap();
    }

    let listing = store.browse().await.unwrap();
    let keys: Vec<&str> = listing.entries().iter().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["Aardvark", "Snow_Leopard", "Zebra"]);
}

#[tokio::test]
async fn test_load_folder_with_missing_files() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("Empty_Folder")).unwrap();
    let store = SpeciesStore::new(temp.path());

    let key = FolderKey::parse("Empty_Folder").unwrap();
    let entry = store.load(&key).await.unwrap();
    assert_eq!(entry.record, StoredRecord::Missing);
    assert!(entry.image_path.is_none());
    assert!(matches!(
        store.read_image(&key).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_load_unknown_key() {
    let temp = TempDir::new().unwrap();
    let store = SpeciesStore::new(temp.path());

    let key = FolderKey::parse("Unicorn").unwrap();
    assert!(matches!(store.load(&key).await, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_load_malformed_json() {
    let temp = TempDir::new().unwrap();
    let folder = temp.path().join("Broken");
    std::fs::create_dir_all(&folder).unwrap();
    std::fs::write(folder.join("Broken.json"), "{\"group\": \"Mam").unwrap();
    std::fs::write(folder.join("Broken.jpg"), JPEG_BYTES).unwrap();
    let store = SpeciesStore::new(temp.path());

    let key = FolderKey::parse("Broken").unwrap();
    let entry = store.load(&key).await.unwrap();
    assert!(matches!(entry.record, StoredRecord::Malformed(_)));
    assert!(entry.record.valid().is_none());
    assert!(entry.image_path.is_some());
}

#[tokio::test]
async fn test_read_record_json_is_byte_exact() {
    let temp = TempDir::new().unwrap();
    let folder = temp.path().join("Odd_Bytes");
    std::fs::create_dir_all(&folder).unwrap();
    // Invalid UTF-8 must come back unchanged
    let raw: &[u8] = &[b'{', 0xFF, 0xFE, b'}'];
    std::fs::write(folder.join("Odd_Bytes.json"), raw).unwrap();
    let store = SpeciesStore::new(temp.path());

    let key = FolderKey::parse("Odd_Bytes").unwrap();
    assert_eq!(store.read_record_json(&key).await.unwrap(), raw);
}
