//! Configuration layering and config-driven pipeline construction

use quire::config::{ConfigLoader, API_KEY_ENV};
use quire::types::GenerationRequest;
use quire::Pipeline;
use std::fs;
use tempfile::TempDir;

use crate::integration::with_env;

const REGISTRY: &str = r#"
[[models]]
id = "fast"

[[sections]]
section_type = "faqBlock"

[[sections.blocks]]
name = "questions"

[[sections.blocks.fields]]
name = "questions"
type = "array"
description = "Reader questions with answers"
"#;

#[test]
fn environment_overrides_workspace_files() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = temp_dir.path().join("workspace");
    fs::create_dir_all(workspace.join("config")).unwrap();
    fs::write(
        workspace.join("config").join("config.toml"),
        "[generation]\nconcurrency_limit = 6\n\n[provider]\nfallback = false\n",
    )
    .unwrap();

    let config = with_env(
        &[
            ("XDG_CONFIG_HOME", temp_dir.path().join("xdg").to_str()),
            ("QUIRE_ENV", None),
            ("QUIRE__GENERATION__CONCURRENCY_LIMIT", Some("8")),
        ],
        || ConfigLoader::load(&workspace).unwrap(),
    );

    assert_eq!(config.generation.concurrency_limit, 8);
    assert!(!config.provider.fallback);
}

#[test]
fn malformed_workspace_file_is_a_config_error() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("config")).unwrap();
    fs::write(
        temp_dir.path().join("config").join("config.toml"),
        "[generation\nconcurrency_limit = ",
    )
    .unwrap();

    let result = with_env(
        &[
            ("XDG_CONFIG_HOME", temp_dir.path().join("xdg").to_str()),
            ("QUIRE_ENV", None),
        ],
        || ConfigLoader::load(temp_dir.path()),
    );
    assert!(matches!(result, Err(quire::GenerationError::ConfigError(_))));
}

#[tokio::test]
async fn pipeline_from_loaded_config_generates_synthetic_content() {
    let temp_dir = TempDir::new().unwrap();
    let registry_path = temp_dir.path().join("registry.toml");
    fs::write(&registry_path, REGISTRY).unwrap();

    let workspace = temp_dir.path().join("workspace");
    fs::create_dir_all(workspace.join("config")).unwrap();
    fs::write(
        workspace.join("config").join("config.toml"),
        format!(
            "[provider]\nsynthetic_delay_ms = 0\n\n[generation]\nconcurrency_limit = 1\nregistry_path = {:?}\n",
            registry_path.to_string_lossy()
        ),
    )
    .unwrap();

    let pipeline = with_env(
        &[
            ("XDG_CONFIG_HOME", temp_dir.path().join("xdg").to_str()),
            ("QUIRE_ENV", None),
            (API_KEY_ENV, None),
        ],
        || {
            let config = ConfigLoader::load(&workspace).unwrap();
            Pipeline::from_config(&config).unwrap()
        },
    );
    assert_eq!(pipeline.client().strategy_name(), "synthetic");
    assert_eq!(pipeline.orchestrator().concurrency_limit(), 1);

    let results = pipeline
        .run(vec![
            GenerationRequest::new("faqBlock", "fast").with_blocks(["questions"]),
        ])
        .await
        .unwrap();
    let result = results.values().next().unwrap();
    assert!(result.success);
    assert!(result.data.as_ref().unwrap()["questions"]["questions"].is_array());
}
