use std::fs;

use aviflora::inat::extract_record;

#[test]
fn extract_inat_record() {
    let raw = fs::read_to_string("tests/fixtures/inat_turdus_merula.json").unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let record = extract_record("Turdus merula", &value).unwrap();

    assert_eq!(record.source, "iNaturalist");
    assert_eq!(record.taxon_id, Some(12716));
    assert_eq!(record.scientific_name, "Turdus merula");
    assert_eq!(record.common_name.as_deref(), Some("Eurasian Blackbird"));
    assert!(record.summary.as_deref().unwrap().contains("true thrush"));
    assert_eq!(
        record.images_remote,
        vec![
            "https://inaturalist-open-data.s3.amazonaws.com/photos/175264836/medium.jpg"
                .to_string()
        ]
    );
    assert_eq!(record.image_local, None);
    assert_eq!(
        record.url.as_deref(),
        Some("https://www.inaturalist.org/taxa/12716")
    );
}
