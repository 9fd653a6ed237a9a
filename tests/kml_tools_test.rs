use anyhow::Result;
use dealer_etl::config::toml_config::{AuditConfig, TomlConfig};
use dealer_etl::core::kml::KmlDocument;
use dealer_etl::utils::validation::Validate;
use dealer_etl::{AuditPipeline, EtlEngine, FlipPipeline, LocalStorage};
use tempfile::TempDir;

const DEALERS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns:kml="http://www.opengis.net/kml/2.2">
<kml:Document>
<kml:Placemark><kml:name>Nairobi Bikes</kml:name><kml:Point><kml:coordinates>36.8,-1.3,0</kml:coordinates></kml:Point></kml:Placemark>
<kml:Placemark><kml:name>Oslo Sykkel</kml:name><kml:Point><kml:coordinates>10.7,59.9,0</kml:coordinates></kml:Point></kml:Placemark>
<kml:Placemark><kml:name>Lost Dealer</kml:name></kml:Placemark>
</kml:Document>
</kml>
"#;

fn setup() -> Result<(TempDir, LocalStorage)> {
    let temp_dir = TempDir::new()?;
    std::fs::write(temp_dir.path().join("dealers.kml"), DEALERS)?;
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    Ok((temp_dir, storage))
}

#[tokio::test]
async fn test_audit_reports_missing_points() -> Result<()> {
    let (temp_dir, storage) = setup()?;
    let config = AuditConfig {
        input: "dealers.kml".to_string(),
        report: Some("reports/missing.txt".to_string()),
    };

    let report = EtlEngine::new(AuditPipeline::new(storage, config)).run().await?;

    assert_eq!(report.counter("placemarks"), Some(3));
    assert_eq!(report.counter("missing"), Some(1));
    assert_eq!(
        std::fs::read_to_string(temp_dir.path().join("reports/missing.txt"))?,
        "Lost Dealer\n"
    );
    Ok(())
}

/// 邊界框內的點交換經緯度，其餘保持 lon,lat,0
#[tokio::test]
async fn test_flip_with_configured_boxes() -> Result<()> {
    let (temp_dir, storage) = setup()?;
    let config = TomlConfig::from_toml_str(
        r#"
[flip]
input = "dealers.kml"
output = "dealers_flipped.kml"

[[flip.boxes]]
min_lat = -5
max_lat = 5
min_lon = 30
max_lon = 40
"#,
    )?;
    config.validate()?;

    let report = EtlEngine::new_with_monitoring(FlipPipeline::new(storage, config.flip.clone()), true)
        .run()
        .await?;

    assert_eq!(report.counter("flipped"), Some(1));
    assert_eq!(report.counter("unchanged"), Some(1));
    assert_eq!(report.counter("unparsable"), Some(0));

    let output = std::fs::read_to_string(temp_dir.path().join("dealers_flipped.kml"))?;
    assert!(output.contains("\n  <kml:Document>\n    <kml:Placemark>\n"));

    let document = KmlDocument::parse(&output)?;
    let coords: Vec<_> = document
        .placemarks()
        .iter()
        .map(|p| p.coordinate_text().map(str::to_string))
        .collect();
    assert_eq!(
        coords,
        vec![
            Some("-1.3,36.8,0".to_string()),
            Some("10.7,59.9,0".to_string()),
            None,
        ]
    );
    Ok(())
}
