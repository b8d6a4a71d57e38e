use processkit_core::{KnowledgeBase, KnowledgeBaseError, ToolKind};
use std::io::Write;

const LEGACY_DOCUMENT: &str = r#"{
  "materials": {
    "aluminum_6061": { "recommended_rpm": 12000, "recommended_feed_mm_per_min": 800, "notes": "legacy" }
  },
  "tools": {
    "endmill_6mm": { "type": "endmill", "diameter_mm": 6.0, "flutes": 3, "material": "carbide" },
    "drill_6mm": { "type": "drill", "diameter_mm": 6.0, "flutes": 2, "material": "HSS" }
  },
  "operations": {
    "face_milling": { "description": "Face", "default_tool": "endmill_6mm" },
    "drilling": { "description": "Drill", "default_tool": "drill_6mm" }
  }
}"#;

#[test]
fn test_load_from_file_reads_legacy_keys() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(LEGACY_DOCUMENT.as_bytes()).unwrap();

    let kb = KnowledgeBase::load_from_file(file.path()).unwrap();
    let material = kb.material("aluminum_6061").unwrap();
    assert_eq!(material.recommended_rpm, 12000);
    assert_eq!(material.recommended_feed_rate, 800.0);
    assert_eq!(kb.tool("drill_6mm").unwrap().kind, ToolKind::Drill);
    assert_eq!(
        kb.operation("drilling").unwrap().default_tool.as_str(),
        "drill_6mm"
    );
}

#[test]
fn test_load_from_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = KnowledgeBase::load_from_file(&dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, KnowledgeBaseError::Io { .. }));
}

#[test]
fn test_lookup_is_exact() {
    let kb = KnowledgeBase::bundled().unwrap();
    assert!(kb.material("aluminum_6061").is_some());
    assert!(kb.material("Aluminum_6061").is_none());
    assert!(kb.material("aluminum").is_none());
}

#[test]
fn test_bundled_document_contents() {
    let kb = KnowledgeBase::bundled().unwrap();
    let drills: Vec<&str> = kb
        .tools()
        .iter()
        .filter(|(_, tool)| tool.kind == ToolKind::Drill)
        .map(|(id, _)| id.as_str())
        .collect();
    assert_eq!(drills, vec!["drill_10mm", "drill_3mm", "drill_6mm"]);
    assert_eq!(
        kb.drill_for_diameter(10.0).unwrap().0.as_str(),
        "drill_10mm"
    );
    assert_eq!(kb.tool("drill_10mm").unwrap().recommended_rpm, Some(2500));
}

#[test]
fn test_serialized_document_round_trips_through_loader() {
    let kb = KnowledgeBase::bundled().unwrap();
    let text = serde_json::to_string_pretty(&kb).unwrap();
    assert!(text.contains("\"recommendedFeedRate\""));
    assert!(text.contains("\"defaultTool\""));
    assert_eq!(KnowledgeBase::from_json_str(&text).unwrap(), kb);
}
