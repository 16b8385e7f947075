use std::io::Write;
use std::path::Path;

use anyhow::Result;
use tempfile::NamedTempFile;
use vfp_core::error::{DriverError, FormatError};
use vfp_core::operations::{info, scan_layer};
use vfp_core::{OpenMode, OpenOptions, VfpDataSource, VfpError};

const PARCELS: &str = "tests/parcels.vfp";

fn entity_bomb() -> String {
    let mut doc =
        String::from("<?xml version=\"1.0\"?>\n<!DOCTYPE v:vfp [\n<!ENTITY a \"aaaaaaaa\">\n");
    let mut previous = "a".to_string();
    for level in 1..=8 {
        let name = format!("a{level}");
        doc.push_str(&format!(
            "<!ENTITY {name} \"{}\">\n",
            format!("&{previous};").repeat(10)
        ));
        previous = name;
    }
    doc.push_str(&format!("]>\n<v:vfp><zs><x>&{previous};</x></zs></v:vfp>\n"));
    doc
}

/// Test that update mode fails regardless of file contents
#[test]
fn test_update_mode_always_rejected() -> Result<()> {
    for path in [PARCELS, "tests/absent.vfp"] {
        let err = VfpDataSource::open(path, OpenMode::Update, &OpenOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            VfpError::Driver(DriverError::OperationNotSupported { .. })
        ));
    }
    Ok(())
}

/// Test opening the sample file with type inference
#[test]
fn test_open_parcels_with_inference() -> Result<()> {
    let options = OpenOptions::default().with_text_inference();
    let ds = VfpDataSource::open(Path::new(PARCELS), OpenMode::ReadOnly, &options)?;

    assert_eq!(ds.layer_count(), 19);
    let ucastnici = ds.layer_by_name("ucastnici").expect("layer exists");
    let names: Vec<_> = ucastnici
        .schema()
        .fields()
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(names, ["id", "jmeno", "podil"]);

    let arrow = ucastnici.schema().to_arrow_schema();
    assert_eq!(arrow.fields().len(), 3);

    let missing = ds.layer_by_name("hvpsz").expect("layer exists");
    assert!(!missing.scan().found_target());
    assert!(missing.schema().is_empty());
    Ok(())
}

/// Test that an entity bomb is not opened
#[test]
fn test_entity_bomb_not_recognized() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    file.write_all(entity_bomb().as_bytes())?;

    let err = VfpDataSource::open(file.path(), OpenMode::ReadOnly, &OpenOptions::default())
        .unwrap_err();
    assert!(matches!(err, VfpError::Format(FormatError::NotRecognized { .. })));
    Ok(())
}

/// Test that info is a pure function of the file contents
#[test]
fn test_info_is_repeatable() -> Result<()> {
    let options = OpenOptions::default().with_text_inference();
    let first = info(Path::new(PARCELS), &options)?;
    let second = info(Path::new(PARCELS), &options)?;
    assert_eq!(first, second);

    let zs = scan_layer(Path::new(PARCELS), "zs_2", &options)?;
    assert_eq!(zs.element, "zs");
    assert_eq!(zs.child_elements, ["cislo", "vymera", "oprava", "poznamka"]);
    Ok(())
}

/// Test that a missing file surfaces as a not-found error
#[test]
fn test_missing_file() {
    let err = info(Path::new("tests/absent.vfp"), &OpenOptions::default()).unwrap_err();
    assert!(err.user_message().starts_with("File not found"));
}
