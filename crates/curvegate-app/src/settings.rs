//! Config resolution: defaults, per-suite overrides and command-line flags.

use std::path::PathBuf;

use anyhow::Context;
use curvegate_adapters::{StoreLayout, TestLocation};
use curvegate_types::{
    AnalysisSettings, AnalyzerKind, ConfigFile, DEFAULT_BASE_SUFFIX, DEFAULT_OUTPUT_SUFFIX,
    DEFAULT_SIGNIFICANT_DIGITS, DEFAULT_STDDEV_MULTIPLIER, SuiteConfig,
};

use crate::EvaluateRequest;

/// Command-line values that win over the config file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub mode: Option<AnalyzerKind>,
    pub significant_digits: Option<u32>,
    pub stddev_multiplier: Option<f64>,
    pub baseline_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub brief: Option<bool>,
}

/// Parse a `curvegate.toml` document.
pub fn parse_config(text: &str) -> anyhow::Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(text).context("parse curvegate config")?;
    for suite in &config.suites {
        if suite.name.trim().is_empty() {
            anyhow::bail!("suite entries need a non-empty name");
        }
    }
    Ok(config)
}

/// Settings for the whole run, before suite overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub analysis: AnalysisSettings,
    pub layout: StoreLayout,
    pub brief: bool,
}

impl RunSettings {
    pub fn resolve(config: &ConfigFile, overrides: &Overrides) -> Self {
        let d = &config.defaults;
        let analysis = AnalysisSettings {
            mode: overrides.mode.or(d.mode).unwrap_or_default(),
            significant_digits: overrides
                .significant_digits
                .or(d.significant_digits)
                .unwrap_or(DEFAULT_SIGNIFICANT_DIGITS),
            stddev_multiplier: overrides
                .stddev_multiplier
                .or(d.stddev_multiplier)
                .unwrap_or(DEFAULT_STDDEV_MULTIPLIER),
        };
        let layout = StoreLayout {
            baseline_dir: overrides
                .baseline_dir
                .clone()
                .or_else(|| d.baseline_dir.as_ref().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(".")),
            output_dir: overrides
                .output_dir
                .clone()
                .or_else(|| d.output_dir.as_ref().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(".")),
            base_suffix: d
                .base_suffix
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_SUFFIX.to_string()),
            output_suffix: d
                .output_suffix
                .clone()
                .unwrap_or_else(|| DEFAULT_OUTPUT_SUFFIX.to_string()),
        };
        Self {
            analysis,
            layout,
            brief: overrides.brief.or(d.brief).unwrap_or(false),
        }
    }
}

/// Everything needed to evaluate the tests of one suite.
#[derive(Debug, Clone, PartialEq)]
pub struct SuitePlan {
    pub name: String,
    /// Known-test registry; empty for suites missing from the config.
    pub registry: Vec<String>,
    /// `false` when the suite is not in the config at all.
    pub configured: bool,
    pub analysis: AnalysisSettings,
    pub layout: StoreLayout,
    pub run_validation_suffix: Option<String>,
}

impl SuitePlan {
    /// Resolve `name` against the config. Command-line overrides still beat
    /// per-suite values.
    pub fn resolve(
        config: &ConfigFile,
        run: &RunSettings,
        overrides: &Overrides,
        name: &str,
    ) -> Self {
        match config.suite(name) {
            Some(suite) => Self::from_suite(suite, run, overrides),
            None => Self {
                name: name.to_string(),
                registry: Vec::new(),
                configured: false,
                analysis: run.analysis.clone(),
                layout: run.layout.clone(),
                run_validation_suffix: None,
            },
        }
    }

    fn from_suite(suite: &SuiteConfig, run: &RunSettings, overrides: &Overrides) -> Self {
        let analysis = AnalysisSettings {
            mode: overrides
                .mode
                .or(suite.mode)
                .unwrap_or(run.analysis.mode),
            significant_digits: overrides
                .significant_digits
                .or(suite.significant_digits)
                .unwrap_or(run.analysis.significant_digits),
            stddev_multiplier: overrides
                .stddev_multiplier
                .or(suite.stddev_multiplier)
                .unwrap_or(run.analysis.stddev_multiplier),
        };
        let mut layout = run.layout.clone();
        if let Some(suffix) = &suite.base_suffix {
            layout.base_suffix = suffix.clone();
        }
        if let Some(suffix) = &suite.output_suffix {
            layout.output_suffix = suffix.clone();
        }
        Self {
            name: suite.name.clone(),
            registry: suite.tests.clone(),
            configured: true,
            analysis,
            layout,
            run_validation_suffix: suite.run_validation_suffix.clone(),
        }
    }

    /// Tests to run: the requested ones, or the whole registry.
    pub fn selected_tests(&self, requested: &[String]) -> Vec<String> {
        if requested.is_empty() {
            self.registry.clone()
        } else {
            requested.to_vec()
        }
    }

    pub fn request(&self, test: &str) -> EvaluateRequest {
        EvaluateRequest {
            location: TestLocation::new(&self.name, test, self.layout.clone()),
            known: self.registry.iter().any(|t| t == test),
            analysis: self.analysis.clone(),
            run_validation_suffix: self.run_validation_suffix.clone(),
        }
    }
}
