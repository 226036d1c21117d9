pub mod params;

use crate::{
    errors::{ModelError, ModelResult},
    geometry::Point3,
};
use params::{CacheParams, GoldStandardParams, SegmentExtractionParams, SolutionParams};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// The store backend selected for a project
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendType {
    /// Process local maps, lost on exit
    #[default]
    Local,

    /// A rocksdb database at `path`
    RocksDb { path: String },
}

/// Project wide configuration, shared by all stores and guarantors of a project. Use `ProjectConfig::new` for a
/// configuration with default parameters over a given grid, `ConfigBuilder` for anything more complex, or load one
/// from TOML with `ProjectConfig::from_toml_str`/`ProjectConfig::from_file`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub backend: BackendType,

    pub stack_size: Point3,
    pub block_size: Point3,
    pub core_size_in_blocks: Point3,

    #[serde(default)]
    pub segment_extraction: SegmentExtractionParams,

    #[serde(default)]
    pub solution: SolutionParams,

    #[serde(default)]
    pub gold_standard: GoldStandardParams,

    #[serde(default)]
    pub cache: CacheParams,
}

impl ProjectConfig {
    pub fn new(stack_size: Point3, block_size: Point3, core_size_in_blocks: Point3) -> Self {
        Self {
            backend: BackendType::Local,
            stack_size,
            block_size,
            core_size_in_blocks,
            segment_extraction: Default::default(),
            solution: Default::default(),
            gold_standard: Default::default(),
            cache: Default::default(),
        }
    }

    pub fn to_builder(&self) -> ConfigBuilder {
        ConfigBuilder { config: self.clone() }
    }

    pub fn from_toml_str(s: &str) -> ModelResult<Self> {
        toml::from_str(s).map_err(|err| ModelError::Config(err.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| ModelError::Config(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> ModelResult<String> {
        toml::to_string(self).map_err(|err| ModelError::Config(err.to_string()))
    }
}

pub struct ConfigBuilder {
    config: ProjectConfig,
}

impl ConfigBuilder {
    pub fn new(stack_size: Point3, block_size: Point3, core_size_in_blocks: Point3) -> Self {
        Self { config: ProjectConfig::new(stack_size, block_size, core_size_in_blocks) }
    }

    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn edit_segment_extraction<F>(mut self, edit_func: F) -> Self
    where
        F: Fn(&mut SegmentExtractionParams),
    {
        edit_func(&mut self.config.segment_extraction);
        self
    }

    pub fn edit_solution<F>(mut self, edit_func: F) -> Self
    where
        F: Fn(&mut SolutionParams),
    {
        edit_func(&mut self.config.solution);
        self
    }

    pub fn edit_gold_standard<F>(mut self, edit_func: F) -> Self
    where
        F: Fn(&mut GoldStandardParams),
    {
        edit_func(&mut self.config.gold_standard);
        self
    }

    pub fn apply_args<F>(mut self, edit_func: F) -> Self
    where
        F: Fn(&mut ProjectConfig),
    {
        edit_func(&mut self.config);
        self
    }

    pub fn force_explanation(mut self) -> Self {
        self.config.solution.force_explanation = true;
        self
    }

    pub fn build(self) -> ProjectConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_defaults() {
        let config = ProjectConfig::from_toml_str(
            r#"
            stack_size = { x = 100, y = 100, z = 10 }
            block_size = { x = 50, y = 50, z = 5 }
            core_size_in_blocks = { x = 2, y = 2, z = 1 }

            [backend]
            type = "rocks_db"
            path = "/tmp/sopnet"

            [solution]
            force_explanation = true
            "#,
        )
        .unwrap();

        assert_eq!(BackendType::RocksDb { path: "/tmp/sopnet".into() }, config.backend);
        assert!(config.solution.force_explanation);
        assert_eq!(1, config.solution.core_padding);
        assert_eq!(SegmentExtractionParams::default(), config.segment_extraction);
        assert_eq!(config, ProjectConfig::from_toml_str(&config.to_toml_string().unwrap()).unwrap());
    }

    #[test]
    fn test_builder() {
        let config = ConfigBuilder::new(Point3::new(10, 10, 4), Point3::new(10, 10, 2), Point3::ONE)
            .edit_segment_extraction(|p| p.enable_branches = false)
            .edit_solution(|p| p.core_padding = 0)
            .force_explanation()
            .build();
        assert!(!config.segment_extraction.enable_branches);
        assert!(config.solution.force_explanation);
        assert_eq!(0, config.solution.core_padding);
        assert_eq!(BackendType::Local, config.to_builder().build().backend);
        assert!(ProjectConfig::from_toml_str("stack_size = 3").is_err());
    }
}
