use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

pub const DEFAULT_BASE_URL: &str = "https://api.cloud.llamaindex.ai";
pub const API_KEY_ENV: &str = "LLAMA_CLOUD_API_KEY";
pub const BASE_URL_ENV: &str = "LLAMA_CLOUD_BASE_URL";

/// Value used when a config key is present but set to `null`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyDefault {
    Unset,
    Bool(bool),
    Int(i64),
    Str(&'static str),
}

impl KeyDefault {
    fn to_value(self) -> Value {
        match self {
            KeyDefault::Unset => Value::Null,
            KeyDefault::Bool(b) => Value::Bool(b),
            KeyDefault::Int(i) => Value::from(i),
            KeyDefault::Str(s) => Value::from(s),
        }
    }
}

/// camelCase config key, parser parameter name, default.
pub const KEY_TABLE: &[(&str, &str, KeyDefault)] = &[
    ("adaptiveLongTable", "adaptive_long_table", KeyDefault::Bool(false)),
    ("annotateLinks", "annotate_links", KeyDefault::Unset),
    ("autoMode", "auto_mode", KeyDefault::Bool(false)),
    ("autoModeConfigurationJson", "auto_mode_configuration_json", KeyDefault::Unset),
    ("autoModeTriggerOnImageInPage", "auto_mode_trigger_on_image_in_page", KeyDefault::Bool(false)),
    ("autoModeTriggerOnRegexpInPage", "auto_mode_trigger_on_regexp_in_page", KeyDefault::Unset),
    ("autoModeTriggerOnTableInPage", "auto_mode_trigger_on_table_in_page", KeyDefault::Bool(false)),
    ("autoModeTriggerOnTextInPage", "auto_mode_trigger_on_text_in_page", KeyDefault::Unset),
    ("azureOpenAiApiVersion", "azure_openai_api_version", KeyDefault::Unset),
    ("azureOpenAiDeploymentName", "azure_openai_deployment_name", KeyDefault::Unset),
    ("azureOpenAiEndpoint", "azure_openai_endpoint", KeyDefault::Unset),
    ("azureOpenAiKey", "azure_openai_key", KeyDefault::Unset),
    ("bboxBottom", "bbox_bottom", KeyDefault::Unset),
    ("bboxLeft", "bbox_left", KeyDefault::Unset),
    ("bboxRight", "bbox_right", KeyDefault::Unset),
    ("bboxTop", "bbox_top", KeyDefault::Unset),
    ("boundingBox", "bounding_box", KeyDefault::Unset),
    ("compactMarkdownTable", "compact_markdown_table", KeyDefault::Bool(false)),
    ("complementalFormattingInstruction", "complemental_formatting_instruction", KeyDefault::Unset),
    ("contentGuidelineInstruction", "content_guideline_instruction", KeyDefault::Unset),
    ("disableImageExtraction", "disable_image_extraction", KeyDefault::Bool(false)),
    ("disableOcr", "disable_ocr", KeyDefault::Bool(false)),
    ("doNotCache", "do_not_cache", KeyDefault::Bool(false)),
    ("doNotUnrollColumns", "do_not_unroll_columns", KeyDefault::Bool(false)),
    ("extractCharts", "extract_charts", KeyDefault::Bool(false)),
    ("extractLayout", "extract_layout", KeyDefault::Bool(false)),
    ("fileId", "file_id", KeyDefault::Unset),
    ("fileName", "file_name", KeyDefault::Str("input.pdf")),
    ("formattingInstruction", "formatting_instruction", KeyDefault::Unset),
    ("guessXLSXSheetName", "guess_xlsx_sheet_name", KeyDefault::Bool(false)),
    ("hideFooters", "hide_footers", KeyDefault::Bool(false)),
    ("hideHeaders", "hide_headers", KeyDefault::Bool(false)),
    ("highResOcr", "high_res_ocr", KeyDefault::Bool(false)),
    ("htmlMakeAllElementsVisible", "html_make_all_elements_visible", KeyDefault::Bool(false)),
    ("htmlRemoveFixedElements", "html_remove_fixed_elements", KeyDefault::Bool(false)),
    ("htmlRemoveNavigationElements", "html_remove_navigation_elements", KeyDefault::Bool(false)),
    ("httpProxy", "http_proxy", KeyDefault::Unset),
    ("ignoreDocumentElementsForLayoutDetection", "ignore_document_elements_for_layout_detection", KeyDefault::Bool(false)),
    ("inputS3Path", "input_s3_path", KeyDefault::Unset),
    ("inputS3Region", "input_s3_region", KeyDefault::Unset),
    ("inputUrl", "input_url", KeyDefault::Unset),
    ("invalidateCache", "invalidate_cache", KeyDefault::Bool(false)),
    ("isFormattingInstruction", "is_formatting_instruction", KeyDefault::Bool(true)),
    ("jobTimeoutExtraTimePerPageInSeconds", "job_timeout_extra_time_per_page_in_seconds", KeyDefault::Int(2)),
    ("jobTimeoutInSeconds", "job_timeout_in_seconds", KeyDefault::Unset),
    ("keepPageSeparatorWhenMergingTables", "keep_page_separator_when_merging_tables", KeyDefault::Bool(false)),
    ("language", "lang", KeyDefault::Str("en")),
    ("layoutAware", "layout_aware", KeyDefault::Bool(false)),
    ("preciseBoundingBox", "precise_bounding_box", KeyDefault::Bool(false)),
    ("specializedChartParsingAgentic", "specialized_chart_parsing_agentic", KeyDefault::Bool(false)),
    ("specializedChartParsingOneShot", "specialized_chart_parsing_one_shot", KeyDefault::Bool(false)),
    ("specializedChartParsingEfficient", "specialized_chart_parsing_efficient", KeyDefault::Bool(false)),
    ("specializedImageParsing", "specialized_image_parsing", KeyDefault::Bool(false)),
    ("logFiles", "log_files", KeyDefault::Bool(false)),
    ("markdownTableMultilineHeaderSeparator", "markdown_table_multiline_header_separator", KeyDefault::Str("<br/>")),
    ("maxPages", "max_pages", KeyDefault::Int(0)),
    ("mergeTablesAcrossPagesInMarkdown", "merge_tables_across_pages_in_markdown", KeyDefault::Bool(false)),
    ("model", "model", KeyDefault::Unset),
    ("multimodalPipeline", "multimodal_pipeline", KeyDefault::Bool(false)),
    ("outlinedTableExtraction", "outlined_table_extraction", KeyDefault::Bool(false)),
    ("aggressiveTableExtraction", "aggressive_table_extraction", KeyDefault::Bool(false)),
    ("outputPDFOfDocument", "output_pdf_of_document", KeyDefault::Bool(false)),
    ("outputS3PathPrefix", "output_s3_path_prefix", KeyDefault::Unset),
    ("outputS3Region", "output_s3_region", KeyDefault::Unset),
    ("outputTablesAsHTML", "output_tables_as_HTML", KeyDefault::Bool(false)),
    ("pageErrorTolerance", "page_error_tolerance", KeyDefault::Int(0)),
    ("pageFooterPrefix", "page_footer_prefix", KeyDefault::Unset),
    ("pageFooterSuffix", "page_footer_suffix", KeyDefault::Unset),
    ("pageHeaderPrefix", "page_header_prefix", KeyDefault::Unset),
    ("pageHeaderSuffix", "page_header_suffix", KeyDefault::Unset),
    ("pagePrefix", "page_prefix", KeyDefault::Unset),
    ("pageSeparator", "page_separator", KeyDefault::Str("\n---\n")),
    ("pageSuffix", "page_suffix", KeyDefault::Unset),
    ("parseMode", "parse_mode", KeyDefault::Str("parse_page_with_llm")),
    ("preserveLayoutAlignmentAcrossPages", "preserve_layout_alignment_across_pages", KeyDefault::Bool(false)),
    ("preserveVerySmallText", "preserve_very_small_text", KeyDefault::Bool(false)),
    ("replaceFailedPageMode", "replace_failed_page_mode", KeyDefault::Str("RAW_TEXT")),
    ("replaceFailedPageWithErrorMessagePrefix", "replace_failed_page_with_error_message_prefix", KeyDefault::Unset),
    ("replaceFailedPageWithErrorMessageSuffix", "replace_failed_page_with_error_message_suffix", KeyDefault::Unset),
    ("saveImages", "save_images", KeyDefault::Bool(false)),
    ("skipDiagonalText", "skip_diagonal_text", KeyDefault::Bool(false)),
    ("spreadSheetExtractSubTables", "spreadsheet_extract_sub_tables", KeyDefault::Bool(false)),
    ("spreadSheetForceFormulaComputation", "spreadsheet_force_formula_computation", KeyDefault::Bool(false)),
    ("inlineImagesInMarkdown", "inline_images_in_markdown", KeyDefault::Bool(false)),
    ("strictModeBuggyFont", "strict_mode_buggy_font", KeyDefault::Bool(false)),
    ("strictModeImageExtraction", "strict_mode_image_extraction", KeyDefault::Bool(false)),
    ("strictModeImageOCR", "strict_mode_image_ocr", KeyDefault::Bool(false)),
    ("strictModeReconstruction", "strict_mode_reconstruction", KeyDefault::Bool(false)),
    ("structuredOutput", "structured_output", KeyDefault::Bool(false)),
    ("structuredOutputJSONSchema", "structured_output_json_schema", KeyDefault::Unset),
    ("structuredOutputJSONSchemaName", "structured_output_json_schema_name", KeyDefault::Unset),
    ("structuredOutputSchema", "structured_output_schema", KeyDefault::Unset),
    ("takeScreenshot", "take_screenshot", KeyDefault::Bool(false)),
    ("targetPages", "target_pages", KeyDefault::Unset),
    ("template", "template", KeyDefault::Unset),
    ("vendorAPIKey", "vendor_api_key", KeyDefault::Unset),
    ("webhookUrl", "webhook_url", KeyDefault::Unset),
    ("premiumMode", "premium_mode", KeyDefault::Bool(false)),
    ("removeHiddenText", "remove_hidden_text", KeyDefault::Bool(false)),
];

static KEY_INDEX: LazyLock<HashMap<&'static str, (&'static str, KeyDefault)>> =
    LazyLock::new(|| {
        KEY_TABLE
            .iter()
            .map(|&(camel, snake, default)| (camel, (snake, default)))
            .collect()
    });

static WORD_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("valid regex"));
static LOWER_UPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));

/// Known keys go through the table, everything else through a regex conversion.
pub fn camel_to_snake(name: &str) -> String {
    if let Some((snake, _)) = KEY_INDEX.get(name) {
        return snake.to_string();
    }

    let spaced = WORD_BOUNDARY.replace_all(name, "${1}_${2}");
    LOWER_UPPER
        .replace_all(&spaced, "${1}_${2}")
        .to_lowercase()
}

/// Rename keys to parameter names, filling table defaults for `null` values.
pub fn convert_config_keys(config: Map<String, Value>) -> Map<String, Value> {
    config
        .into_iter()
        .map(|(key, value)| {
            let snake = camel_to_snake(&key);
            let value = match (value, KEY_INDEX.get(key.as_str())) {
                (Value::Null, Some((_, default))) => default.to_value(),
                (value, _) => value,
            };
            (snake, value)
        })
        .collect()
}

/// Parsing parameters sent with every upload.
#[derive(Debug, Clone, PartialEq)]
pub struct LlamaParseConfig {
    pub params: Map<String, Value>,
}

impl Default for LlamaParseConfig {
    fn default() -> Self {
        let mut params = Map::new();
        params.insert("parse_mode".into(), Value::from("parse_page_with_agent"));
        params.insert("model".into(), Value::from("openai-gpt-4-1-mini"));
        params.insert("high_res_ocr".into(), Value::Bool(true));
        params.insert("adaptive_long_table".into(), Value::Bool(true));
        params.insert("outlined_table_extraction".into(), Value::Bool(true));
        params.insert("output_tables_as_HTML".into(), Value::Bool(true));
        Self { params }
    }
}

impl LlamaParseConfig {
    pub fn from_config_file(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let contents = fs::read_to_string(path)?;
        let raw: Map<String, Value> = serde_json::from_str(&contents)?;
        let params = convert_config_keys(raw);

        tracing::info!("Loaded config from: {}", path.display());
        tracing::info!(
            "Config keys: {}",
            params.keys().cloned().collect::<Vec<_>>().join(", ")
        );
        Ok(Self { params })
    }

    /// Defaults when no path is given, otherwise the file's contents.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_config_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Multipart text fields for the upload request; `null` values are left out.
    pub fn build_form_data(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .filter_map(|(key, value)| {
                let field = match key.as_str() {
                    "lang" => "language".to_string(),
                    _ => key.clone(),
                };
                let text = match value {
                    Value::Null => return None,
                    Value::String(s) => s.clone(),
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    other => other.to_string(),
                };
                Some((field, text))
            })
            .collect()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.params.clone())
    }
}

/// Connection settings read from the environment.
#[derive(Debug, Clone)]
pub struct LlamaCloudSettings {
    pub api_key: String,
    pub base_url: String,
}

impl LlamaCloudSettings {
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty())?;
        let base_url = std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Some(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn upload_endpoint(&self) -> String {
        format!("{}/api/v1/parsing/upload", self.base_url)
    }

    pub fn job_endpoint(&self, job_id: &str) -> String {
        format!("{}/api/v1/parsing/job/{}", self.base_url, job_id)
    }

    pub fn result_endpoint(&self, job_id: &str) -> String {
        format!("{}/api/v1/parsing/job/{}/result/json", self.base_url, job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn table_keys_keep_their_exact_parameter_names() {
        assert_eq!(camel_to_snake("outputTablesAsHTML"), "output_tables_as_HTML");
        assert_eq!(camel_to_snake("language"), "lang");
        assert_eq!(camel_to_snake("spreadSheetExtractSubTables"), "spreadsheet_extract_sub_tables");
    }

    #[test]
    fn unknown_keys_fall_back_to_regex_conversion() {
        assert_eq!(camel_to_snake("someNewOption"), "some_new_option");
        assert_eq!(camel_to_snake("HTMLParser"), "html_parser");
        assert_eq!(camel_to_snake("already_snake"), "already_snake");
    }

    #[test]
    fn null_values_take_table_defaults() {
        let raw = json!({
            "parseMode": null,
            "highResOcr": true,
            "maxPages": null,
            "customThing": null,
        });
        let Value::Object(raw) = raw else { unreachable!() };

        let converted = convert_config_keys(raw);
        assert_eq!(converted["parse_mode"], json!("parse_page_with_llm"));
        assert_eq!(converted["high_res_ocr"], json!(true));
        assert_eq!(converted["max_pages"], json!(0));
        assert_eq!(converted["custom_thing"], Value::Null);
    }

    #[test]
    fn loads_camel_case_config_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("fast_mode.json");
        fs::write(&path, r#"{"parseMode": "parse_page_without_llm", "targetPages": "0,1"}"#).unwrap();

        let config = LlamaParseConfig::from_config_file(&path).unwrap();
        assert_eq!(config.params["parse_mode"], json!("parse_page_without_llm"));
        assert_eq!(config.params["target_pages"], json!("0,1"));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = LlamaParseConfig::from_config_file(Path::new("/no/such/config.json")).unwrap_err();
        assert!(err.to_string().starts_with("Config file not found"));
    }

    #[test]
    fn default_config_uses_agent_mode() {
        let config = LlamaParseConfig::load(None).unwrap();
        assert_eq!(config.params["parse_mode"], json!("parse_page_with_agent"));
        assert_eq!(config.params["model"], json!("openai-gpt-4-1-mini"));
    }

    #[test]
    fn form_data_stringifies_values_and_drops_nulls() {
        let Value::Object(params) = json!({
            "high_res_ocr": true,
            "max_pages": 5,
            "lang": "fr",
            "webhook_url": null,
            "target_pages": "0,1",
        }) else {
            unreachable!()
        };

        let mut form = LlamaParseConfig { params }.build_form_data();
        form.sort();
        assert_eq!(
            form,
            vec![
                ("high_res_ocr".to_string(), "true".to_string()),
                ("language".to_string(), "fr".to_string()),
                ("max_pages".to_string(), "5".to_string()),
                ("target_pages".to_string(), "0,1".to_string()),
            ]
        );
    }

    #[test]
    fn endpoints_are_built_from_base_url() {
        let settings = LlamaCloudSettings {
            api_key: "key".to_string(),
            base_url: "https://staging.example.com".to_string(),
        };
        assert_eq!(
            settings.upload_endpoint(),
            "https://staging.example.com/api/v1/parsing/upload"
        );
        assert_eq!(
            settings.job_endpoint("abc"),
            "https://staging.example.com/api/v1/parsing/job/abc"
        );
        assert_eq!(
            settings.result_endpoint("abc"),
            "https://staging.example.com/api/v1/parsing/job/abc/result/json"
        );
    }
}
