use std::env;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::Serialize;
use thiserror::Error;

use crate::processing::{CleaningOptions, SegmentationOptions, ValidationError};

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Parsed values violate an option constraint.
    #[error("Invalid pipeline configuration: {0}")]
    Validation(#[from] ValidationError),
}

/// Runtime configuration for the PDF pipeline driver.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    /// Defaults for the cleaning stage.
    pub cleaning: CleaningOptions,
    /// Defaults for the segmentation stage.
    pub segmentation: SegmentationOptions,
    /// Whether extracted text is cleaned before segmentation.
    pub apply_cleaning: bool,
    /// Number of documents processed concurrently.
    pub jobs: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cleaning: CleaningOptions::default(),
            segmentation: SegmentationOptions::default(),
            apply_cleaning: true,
            jobs: default_jobs(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let cleaning = CleaningOptions {
            remove_headers_footers: parse_bool(
                &get,
                "PDF_PIPELINE_REMOVE_HEADERS_FOOTERS",
                defaults.cleaning.remove_headers_footers,
            )?,
            remove_page_numbers: parse_bool(
                &get,
                "PDF_PIPELINE_REMOVE_PAGE_NUMBERS",
                defaults.cleaning.remove_page_numbers,
            )?,
            remove_repeated_artifacts: parse_bool(
                &get,
                "PDF_PIPELINE_REMOVE_ARTIFACTS",
                defaults.cleaning.remove_repeated_artifacts,
            )?,
            clean_formatting: parse_bool(
                &get,
                "PDF_PIPELINE_CLEAN_FORMATTING",
                defaults.cleaning.clean_formatting,
            )?,
            header_footer_threshold: parse_value(
                &get,
                "PDF_PIPELINE_HEADER_FOOTER_THRESHOLD",
                defaults.cleaning.header_footer_threshold,
            )?,
            artifact_threshold: parse_value(
                &get,
                "PDF_PIPELINE_ARTIFACT_THRESHOLD",
                defaults.cleaning.artifact_threshold,
            )?,
            ..defaults.cleaning
        };

        let segmentation = SegmentationOptions {
            chunk_size_tokens: parse_value(
                &get,
                "PDF_PIPELINE_CHUNK_SIZE",
                defaults.segmentation.chunk_size_tokens,
            )?,
            overlap_percentage: parse_value(
                &get,
                "PDF_PIPELINE_CHUNK_OVERLAP",
                defaults.segmentation.overlap_percentage,
            )?,
            min_chunk_size: parse_value(
                &get,
                "PDF_PIPELINE_MIN_CHUNK_SIZE",
                defaults.segmentation.min_chunk_size,
            )?,
            max_chunk_size: parse_value(
                &get,
                "PDF_PIPELINE_MAX_CHUNK_SIZE",
                defaults.segmentation.max_chunk_size,
            )?,
            prefer_semantic_boundaries: parse_bool(
                &get,
                "PDF_PIPELINE_PREFER_SEMANTIC_BOUNDARIES",
                defaults.segmentation.prefer_semantic_boundaries,
            )?,
            sentence_segmentation_model: get("PDF_PIPELINE_SENTENCE_MODEL")
                .map(|value| value.trim().to_string())
                .unwrap_or(defaults.segmentation.sentence_segmentation_model),
        };

        let jobs: usize = parse_value(&get, "PDF_PIPELINE_JOBS", defaults.jobs)?;
        if jobs == 0 {
            return Err(ConfigError::InvalidValue("PDF_PIPELINE_JOBS".to_string()));
        }

        let apply_cleaning =
            parse_bool(&get, "PDF_PIPELINE_APPLY_CLEANING", defaults.apply_cleaning)?;

        cleaning.validate()?;
        segmentation.validate()?;
        Ok(Self {
            cleaning,
            segmentation,
            apply_cleaning,
            jobs,
        })
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(4)
}

fn parse_value<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}

fn parse_bool<G>(get: &G, key: &str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(value) = get(key) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(key.to_string())),
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<PipelineConfig> = OnceLock::new();

/// Retrieve the loaded configuration, falling back to defaults when initialization has not
/// occurred.
pub fn get_config() -> &'static PipelineConfig {
    CONFIG.get_or_init(PipelineConfig::default)
}

/// Load configuration from the environment (and `.env`) and install it in the global cache.
pub fn init_config() -> Result<&'static PipelineConfig, ConfigError> {
    dotenvy::dotenv().ok();
    let config = PipelineConfig::from_env()?;
    tracing::debug!(
        apply_cleaning = config.apply_cleaning,
        chunk_size = config.segmentation.chunk_size_tokens,
        overlap = config.segmentation.overlap_percentage,
        sentence_model = %config.segmentation.sentence_segmentation_model,
        jobs = config.jobs,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = PipelineConfig::from_lookup(lookup(&[])).expect("config");
        assert!(config.apply_cleaning);
        assert_eq!(config.cleaning, CleaningOptions::default());
        assert_eq!(config.segmentation, SegmentationOptions::default());
        assert!(config.jobs >= 1);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("PDF_PIPELINE_APPLY_CLEANING", "false"),
            ("PDF_PIPELINE_REMOVE_PAGE_NUMBERS", "0"),
            ("PDF_PIPELINE_HEADER_FOOTER_THRESHOLD", "0.6"),
            ("PDF_PIPELINE_CHUNK_SIZE", "128"),
            ("PDF_PIPELINE_CHUNK_OVERLAP", " 0.1 "),
            ("PDF_PIPELINE_SENTENCE_MODEL", "rule_based"),
            ("PDF_PIPELINE_JOBS", "3"),
        ]))
        .expect("config");
        assert!(!config.apply_cleaning);
        assert!(!config.cleaning.remove_page_numbers);
        assert_eq!(config.cleaning.header_footer_threshold, 0.6);
        assert_eq!(config.segmentation.chunk_size_tokens, 128);
        assert_eq!(config.segmentation.overlap_percentage, 0.1);
        assert_eq!(config.segmentation.sentence_segmentation_model, "rule_based");
        assert_eq!(config.jobs, 3);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let blank = lookup(&[("PDF_PIPELINE_CHUNK_SIZE", "  ")]);
        let config = PipelineConfig::from_lookup(blank).expect("config");
        assert_eq!(config.segmentation.chunk_size_tokens, 256);
    }

    #[test]
    fn unparseable_values_are_rejected() {
        let error = PipelineConfig::from_lookup(lookup(&[("PDF_PIPELINE_CHUNK_SIZE", "big")]))
            .unwrap_err();
        assert!(
            matches!(error, ConfigError::InvalidValue(key) if key == "PDF_PIPELINE_CHUNK_SIZE")
        );

        let clean_formatting = lookup(&[("PDF_PIPELINE_CLEAN_FORMATTING", "maybe")]);
        let error = PipelineConfig::from_lookup(clean_formatting).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn out_of_range_values_fail_validation() {
        let error = PipelineConfig::from_lookup(lookup(&[("PDF_PIPELINE_CHUNK_OVERLAP", "0.9")]))
            .unwrap_err();
        assert!(matches!(error, ConfigError::Validation(_)));

        let error =
            PipelineConfig::from_lookup(lookup(&[("PDF_PIPELINE_JOBS", "0")])).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue(_)));
    }
}
