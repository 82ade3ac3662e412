// Tests for configuration defaults and JSON loading.

use rusty_vit::error::VitError;
use rusty_vit::models::vit::VitConfig;

#[test]
fn default_config_is_vit_base() {
    let config = VitConfig::default();
    assert_eq!(config.image_size, 224);
    assert_eq!(config.patch_size, 16);
    assert_eq!(config.embed_dim, 768);
    assert_eq!(config.depth, 12);
    assert_eq!(config.n_heads, 12);
    assert_eq!(config.n_classes, 1000);
    assert!(config.qkv_bias);
}

#[test]
fn config_round_trips_through_json() {
    let config = VitConfig {
        image_size: 32,
        patch_size: 8,
        embed_dim: 64,
        depth: 2,
        n_heads: 4,
        n_classes: 10,
        seed: 7,
        ..Default::default()
    };

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vit.json");
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = VitConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded.image_size, 32);
    assert_eq!(loaded.patch_size, 8);
    assert_eq!(loaded.embed_dim, 64);
    assert_eq!(loaded.depth, 2);
    assert_eq!(loaded.seed, 7);
}

#[test]
fn missing_config_file_is_an_io_error() {
    let result = VitConfig::from_json_file("/nonexistent/vit.json");
    assert!(matches!(result, Err(VitError::ConfigIo(_))));
}

#[test]
fn malformed_config_file_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        VitConfig::from_json_file(&path),
        Err(VitError::ConfigParse(_))
    ));
}
