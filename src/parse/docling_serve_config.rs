use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const API_KEY_ENV: &str = "DOCLING_SERVE_API_KEY";

/// Conversion options for a docling-serve instance. Every field is optional in
/// the JSON file; missing ones keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DoclingServeConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub use_ocr: bool,
    pub force_ocr: bool,
    pub ocr_engine: String,
    pub ocr_languages: Vec<String>,
    pub pdf_backend: String,
    pub table_mode: String,
    pub enable_table_structure: bool,
    pub table_cell_matching: bool,
    pub include_images: bool,
    pub image_scale: f64,
    pub image_export_mode: String,
    pub do_code_enrichment: bool,
    pub do_formula_enrichment: bool,
    pub do_picture_classification: bool,
    pub do_picture_description: bool,
    pub processing_pipeline: String,
    pub document_timeout: f64,
    pub abort_on_error: bool,
    /// Submit to the async endpoint and poll instead of waiting on one request
    pub use_async: bool,
    /// Seconds between status polls
    pub poll_interval: u64,
    pub max_poll_attempts: usize,
    pub to_formats: Vec<String>,
    pub from_formats: Vec<String>,
    pub page_range: Option<Vec<i64>>,
    pub md_page_break_placeholder: String,
}

impl Default for DoclingServeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5001".to_string(),
            api_key: std::env::var(API_KEY_ENV).ok(),
            use_ocr: false,
            force_ocr: false,
            ocr_engine: "easyocr".to_string(),
            ocr_languages: vec![],
            pdf_backend: "dlparse_v4".to_string(),
            table_mode: "accurate".to_string(),
            enable_table_structure: true,
            table_cell_matching: true,
            include_images: false,
            image_scale: 2.0,
            image_export_mode: "embedded".to_string(),
            do_code_enrichment: false,
            do_formula_enrichment: false,
            do_picture_classification: false,
            do_picture_description: false,
            processing_pipeline: "standard".to_string(),
            document_timeout: 604800.0,
            abort_on_error: false,
            use_async: false,
            poll_interval: 5,
            max_poll_attempts: 60,
            to_formats: vec!["md".to_string()],
            from_formats: ["docx", "pptx", "html", "image", "pdf", "asciidoc", "md"]
                .map(String::from)
                .to_vec(),
            page_range: None,
            md_page_break_placeholder: "".to_string(),
        }
    }
}

impl DoclingServeConfig {
    pub fn from_config_file(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let contents = fs::read_to_string(path)?;
        let config: DoclingServeConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if let Some(range) = &self.page_range {
            if range.len() != 2 {
                anyhow::bail!(
                    "page_range must be a [first, last] pair, got {} entries",
                    range.len()
                );
            }
        }
        Ok(())
    }

    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_config_file(path),
            None => Ok(Self::default()),
        }
    }

    /// The config as saved next to the run outputs, without credentials.
    pub fn to_saved_value(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(object) = value.as_object_mut() {
            object.remove("api_key");
        }
        value
    }

    /// Multipart text fields sent alongside the uploaded document.
    pub fn build_form_data(&self) -> Vec<(&'static str, String)> {
        let flags = [
            ("do_ocr", self.use_ocr),
            ("force_ocr", self.force_ocr),
            ("do_table_structure", self.enable_table_structure),
            ("table_cell_matching", self.table_cell_matching),
            ("include_images", self.include_images),
            ("do_code_enrichment", self.do_code_enrichment),
            ("do_formula_enrichment", self.do_formula_enrichment),
            ("do_picture_classification", self.do_picture_classification),
            ("do_picture_description", self.do_picture_description),
            ("abort_on_error", self.abort_on_error),
        ];
        let mut form_data: Vec<(&'static str, String)> = flags
            .into_iter()
            .map(|(key, flag)| (key, flag.to_string()))
            .collect();

        form_data.extend([
            ("ocr_engine", self.ocr_engine.clone()),
            ("pdf_backend", self.pdf_backend.clone()),
            ("table_mode", self.table_mode.clone()),
            ("pipeline", self.processing_pipeline.clone()),
            ("image_export_mode", self.image_export_mode.clone()),
            ("images_scale", self.image_scale.to_string()),
            ("document_timeout", self.document_timeout.to_string()),
        ]);

        if !self.md_page_break_placeholder.is_empty() {
            form_data.push(("md_page_break_placeholder", self.md_page_break_placeholder.clone()));
        }

        // Arrays repeat the field name: to_formats=md&to_formats=json
        let repeated = [
            ("ocr_lang", &self.ocr_languages),
            ("to_formats", &self.to_formats),
            ("from_formats", &self.from_formats),
        ];
        for (key, values) in repeated {
            form_data.extend(values.iter().map(|value| (key, value.clone())));
        }

        // page_range is a [first, last] pair
        if let Some([first, last]) = self.page_range.as_deref() {
            form_data.push(("page_range", first.to_string()));
            form_data.push(("page_range", last.to_string()));
        }

        form_data
    }

    /// HTTP timeout: the server-side document timeout plus some slack.
    pub fn request_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.document_timeout.max(0.0) + 30.0)
            .unwrap_or(Duration::MAX)
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn get_convert_endpoint(&self) -> String {
        let suffix = if self.use_async { "/async" } else { "" };
        format!("{}/v1/convert/file{suffix}", self.base())
    }

    pub fn get_status_endpoint(&self, task_id: &str) -> String {
        format!("{}/v1/status/poll/{task_id}", self.base())
    }

    pub fn get_result_endpoint(&self, task_id: &str) -> String {
        format!("{}/v1/result/{task_id}", self.base())
    }

    pub fn get_health_endpoint(&self) -> String {
        format!("{}/health", self.base())
    }
}
