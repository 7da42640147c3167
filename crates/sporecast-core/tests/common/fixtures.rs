//! Test fixture loading utilities

use std::path::PathBuf;

use sporecast_core::SporecastConfig;

/// Get the path to a fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_fixtures")
        .join(name)
}

/// Load a fixture file as a string
#[allow(dead_code)]
pub fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", name))
}

/// Config pointing at the two-stump model
///
/// Tree 0 adds -1/+1 on `cap-shape < 0.5`, tree 1 adds -0.5/+0.5 on
/// `stem-width < 1.0`; base score 0.5 contributes no margin.
pub fn stub_config() -> SporecastConfig {
    SporecastConfig {
        model_path: fixture_path("mushroom_stub_model.json"),
        ..SporecastConfig::default()
    }
}

/// Same model with the saved category code table
#[allow(dead_code)]
pub fn stub_config_with_codes() -> SporecastConfig {
    SporecastConfig {
        category_table_path: Some(fixture_path("category_codes.json")),
        ..stub_config()
    }
}
