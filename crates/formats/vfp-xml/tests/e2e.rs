use std::io::Write;
use std::path::Path;

use arrow_schema::DataType;
use tempfile::NamedTempFile;
use vfp_shared::{DiagnosticKind, FormatReadError, FormatReadResult};
use vfp_xml::{
    Classification, FormatSniffer, ScanOptions, SchemaScanner, SchemaStrategies, SniffOptions,
    StopReason,
};

const PARCELS: &str = "tests/e2e_data/parcels.vfp";
const GPX: &str = "tests/e2e_data/track.gpx";
const BOMB: &str = "tests/e2e_data/lol_bomb.vfp";

fn temp_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Test classifying a VFP file without version discovery
#[test]
fn test_sniff_parcels_defaults_version() -> FormatReadResult<()> {
    let report = FormatSniffer::default().classify(Path::new(PARCELS))?;

    assert_eq!(report.classification, Classification::Valid);
    assert_eq!(report.version.as_deref(), Some("2.0"));
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::UnknownVersion);
    Ok(())
}

/// Test classifying a VFP file reading the version attribute
#[test]
fn test_sniff_parcels_with_version_attribute() -> FormatReadResult<()> {
    let sniffer = FormatSniffer::new(
        SniffOptions::default().with_version_attribute(Some("verze".to_string())),
    );
    let report = sniffer.classify(Path::new(PARCELS))?;

    assert_eq!(report.classification, Classification::Valid);
    assert_eq!(report.version.as_deref(), Some("2.0"));
    assert!(report.diagnostics.is_empty());
    Ok(())
}

/// Test that another XML format is rejected quietly
#[test]
fn test_sniff_gpx_is_invalid() -> FormatReadResult<()> {
    let report = FormatSniffer::default().classify(Path::new(GPX))?;

    assert_eq!(report.classification, Classification::Invalid);
    assert!(report.diagnostics.is_empty());
    Ok(())
}

/// Test that an entity-expansion bomb is rejected in bounded time
#[test]
fn test_sniff_entity_bomb_is_invalid() -> FormatReadResult<()> {
    let report = FormatSniffer::default().classify(Path::new(BOMB))?;

    assert_eq!(report.classification, Classification::Invalid);
    assert_eq!(report.version, None);
    assert!(
        report
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::SuspiciousExpansion)
    );
    Ok(())
}

/// Test that a missing file is an I/O error
#[test]
fn test_sniff_missing_file() {
    let err = FormatSniffer::default()
        .classify(Path::new("tests/e2e_data/missing.vfp"))
        .unwrap_err();
    assert!(matches!(err, FormatReadError::Io { .. }));
    assert!(err.to_string().contains("missing.vfp"));
}

/// Test giving up when no start tag appears within the chunk budget
#[test]
fn test_sniff_gives_up_on_long_preamble() -> FormatReadResult<()> {
    let file = temp_file(&format!(
        "<?xml version=\"1.0\"?>\n<!--{}-->\n<v:vfp/>\n",
        "padding ".repeat(60_000)
    ));
    let report = FormatSniffer::default().classify(file.path())?;

    assert_eq!(report.classification, Classification::Unknown);
    assert_eq!(report.chunks_read, 50);
    Ok(())
}

/// Test scanning the direct children of a layer element
#[test]
fn test_scan_ucastnici() -> FormatReadResult<()> {
    let report = SchemaScanner::default().scan(Path::new(PARCELS), "ucastnici")?;

    assert!(report.is_complete());
    assert_eq!(report.target_depth, Some(2));
    assert_eq!(report.child_elements, ["id", "jmeno", "podil"]);
    assert_eq!(report.final_depth, 0);
    assert!(report.schema.is_empty());
    Ok(())
}

/// Test that repeated target occurrences merge their children
#[test]
fn test_scan_zs_merges_occurrences() -> FormatReadResult<()> {
    let report = SchemaScanner::default().scan(Path::new(PARCELS), "zs")?;

    assert_eq!(report.child_elements, ["cislo", "vymera", "oprava", "poznamka"]);
    assert_eq!(report.final_depth, 0);
    Ok(())
}

/// Test type inference from child text
#[test]
fn test_scan_with_text_inference() -> FormatReadResult<()> {
    let scanner =
        SchemaScanner::default().with_strategies(SchemaStrategies::text_inference(["zs", "bpej"]));

    let zs = scanner.scan(Path::new(PARCELS), "zs")?;
    let arrow = zs.schema.to_arrow_schema();
    assert_eq!(arrow.fields().len(), 4);
    assert_eq!(arrow.field_with_name("cislo").unwrap().data_type(), &DataType::Int64);
    assert_eq!(arrow.field_with_name("vymera").unwrap().data_type(), &DataType::Float64);
    assert_eq!(arrow.field_with_name("oprava").unwrap().data_type(), &DataType::Boolean);
    assert_eq!(arrow.field_with_name("poznamka").unwrap().data_type(), &DataType::Utf8);

    let bpej = scanner.scan(Path::new(PARCELS), "bpej")?;
    assert_eq!(bpej.schema.field("kod").unwrap().data_type, DataType::Utf8);
    assert_eq!(bpej.schema.field("cena").unwrap().data_type, DataType::Float64);

    let ucastnici = scanner.scan(Path::new(PARCELS), "ucastnici")?;
    assert!(ucastnici.schema.is_empty());
    Ok(())
}

/// Test that nesting below a direct child stops the scan
#[test]
fn test_scan_deep_target_stops() -> FormatReadResult<()> {
    let report = SchemaScanner::default().scan(Path::new(PARCELS), "v:data")?;

    assert_eq!(report.stop_reason, Some(StopReason::StructuralAnomaly));
    assert_eq!(report.child_elements, ["ucastnici"]);
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::StructuralAnomaly);
    Ok(())
}

/// Test that the entity bomb is caught by the scanner as well
#[test]
fn test_scan_entity_bomb() -> FormatReadResult<()> {
    let report = SchemaScanner::default().scan(Path::new(BOMB), "zs")?;

    assert_eq!(report.stop_reason, Some(StopReason::SuspiciousExpansion));
    assert_eq!(report.child_elements, ["pozn"]);
    Ok(())
}

/// Test that a huge comment is abandoned after the stall limit
#[test]
fn test_scan_huge_comment_stalls() -> FormatReadResult<()> {
    let file = temp_file(&format!(
        "<v:vfp>\n<zs><id>1</id></zs>\n<!--{}-->\n<zs><id>2</id></zs>\n</v:vfp>\n",
        "x".repeat(128 * 1024)
    ));
    let report = SchemaScanner::default().scan(file.path(), "zs")?;

    assert_eq!(report.stop_reason, Some(StopReason::Stalled));
    assert_eq!(report.child_elements, ["id"]);
    assert!(report.diagnostics[0].message.contains("Too much data inside one element"));
    Ok(())
}

/// Test that a text node longer than the stall limit is scanned through
#[test]
fn test_scan_long_text_node() -> FormatReadResult<()> {
    let file = temp_file(&format!(
        "<v:vfp><zs><geom>{}</geom><id>1</id></zs></v:vfp>",
        "1 2 ".repeat(24576)
    ));
    let report = SchemaScanner::default().scan(file.path(), "zs")?;

    assert!(report.is_complete());
    assert_eq!(report.child_elements, ["geom", "id"]);
    assert!(report.diagnostics.is_empty());
    Ok(())
}

/// Test that nested references to an empty entity are caught without output
#[test]
fn test_sniff_empty_entity_bomb_is_invalid() -> FormatReadResult<()> {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<!DOCTYPE v:vfp [\n<!ENTITY e0 \"\">\n");
    for level in 1..=8 {
        let body = format!("&e{};", level - 1).repeat(10);
        xml.push_str(&format!("<!ENTITY e{level} \"{body}\">\n"));
    }
    xml.push_str("]>\n<v:vfp>&e8;</v:vfp>\n");
    let file = temp_file(&xml);

    let report = FormatSniffer::default().classify(file.path())?;
    assert_eq!(report.classification, Classification::Invalid);
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::SuspiciousExpansion);

    let report = SchemaScanner::default().scan(file.path(), "v:vfp")?;
    assert_eq!(report.stop_reason, Some(StopReason::SuspiciousExpansion));
    Ok(())
}

/// Test a document spanning many small chunks
#[test]
fn test_scan_many_chunks() -> FormatReadResult<()> {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<v:vfp>\n");
    for id in 0..500 {
        xml.push_str(&format!("  <narok><id>{id}</id><podil>{id}.5</podil></narok>\n"));
    }
    xml.push_str("</v:vfp>\n");
    let file = temp_file(&xml);

    let scanner = SchemaScanner::new(ScanOptions::default().with_chunk_size(128))
        .with_strategies(SchemaStrategies::text_inference(["narok"]));
    let report = scanner.scan(file.path(), "narok")?;

    assert!(report.is_complete());
    assert_eq!(report.target_depth, Some(1));
    assert_eq!(report.schema.field("id").unwrap().data_type, DataType::Int64);
    assert_eq!(report.schema.field("podil").unwrap().data_type, DataType::Float64);
    Ok(())
}

/// Test that classify and scan are pure functions of the file contents
#[test]
fn test_repeated_calls_are_identical() -> FormatReadResult<()> {
    let sniffer = FormatSniffer::default();
    let first = sniffer.classify(Path::new(PARCELS))?;
    let second = sniffer.classify(Path::new(PARCELS))?;
    assert_eq!(first, second);

    let scanner = SchemaScanner::default()
        .with_strategies(SchemaStrategies::text_inference(["zs"]));
    let first = scanner.scan(Path::new(PARCELS), "zs")?;
    let second = scanner.scan(Path::new(PARCELS), "zs")?;
    assert_eq!(first, second);
    Ok(())
}
