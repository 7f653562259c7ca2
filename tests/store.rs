use std::fs;

use camino::Utf8PathBuf;

use aviflora::store::{CacheEntry, Store};

fn temp_store(temp: &tempfile::TempDir) -> Store {
    Store::new(
        Utf8PathBuf::from_path_buf(temp.path().join("cache")).unwrap(),
        Utf8PathBuf::from_path_buf(temp.path().join("media")).unwrap(),
    )
}

#[test]
fn cache_entry_states() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(&temp);
    let path = store.profile_cache_path("Turdus merula");

    assert!(matches!(
        store.read_json_cache::<serde_json::Value>(&path),
        CacheEntry::Absent
    ));

    store
        .write_json_atomic(&path, &serde_json::json!({ "scientific_name": "Turdus merula" }))
        .unwrap();
    match store.read_json_cache::<serde_json::Value>(&path) {
        CacheEntry::Valid(value) => assert_eq!(value["scientific_name"], "Turdus merula"),
        other => panic!("expected valid entry, got {other:?}"),
    }

    fs::write(path.as_std_path(), b"{ truncated").unwrap();
    assert!(matches!(
        store.read_json_cache::<serde_json::Value>(&path),
        CacheEntry::Corrupt
    ));
}

#[test]
fn atomic_write_leaves_no_temp_file() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(&temp);
    let path = store.profile_cache_path("Pica pica");
    store
        .write_json_atomic(&path, &serde_json::json!({ "scientific_name": "Pica pica" }))
        .unwrap();

    let entries: Vec<_> = fs::read_dir(store.cache_root().as_std_path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(entries, vec!["pica_pica.json".to_string()]);
}

#[test]
fn image_write_overwrites_previous_download() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(&temp);

    let reference = store.write_species_image("Turdus merula", b"first").unwrap();
    assert_eq!(reference, "/media/turdus_merula/image.jpg");
    store.write_species_image("Turdus merula", b"second").unwrap();

    let path = store.species_image_path("Turdus merula");
    assert_eq!(fs::read(path.as_std_path()).unwrap(), b"second");
}
