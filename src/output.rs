//! Result types returned by the extraction entry points.
//!
//! These structs double as the JSON contract the parser script prints on
//! stdout, so their serde shape (camelCase field names, optional fields
//! omitted when absent) must stay in lock-step with the script. Numeric
//! metadata fields default to zero so that older script versions that omit
//! them still parse.

use crate::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Strategy identifier reported when the orchestrator builds a result itself.
pub const DEFAULT_STRATEGY: &str = "docling";

/// Brazilian postal tracking code, e.g. `AB123456789BR`.
static RE_TRACKING_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}\d{9}[A-Z]{2}$").unwrap());

/// One shipment entry parsed from the manifest table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedPackageRecord {
    /// Line number printed on the manifest.
    pub line_number: u32,
    pub tracking_code: String,
    pub recipient: String,
    /// Shelf or slot label where the package is stored.
    pub position: String,
    /// Arrival date as printed (`DD/MM/YYYY`).
    pub date: String,
    /// Arrival date in ISO form (`YYYY-MM-DD`).
    #[serde(rename = "dateISO")]
    pub date_iso: String,
    /// Pickup deadline in ISO form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_deadline: Option<String>,
    /// Pickup deadline as printed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_deadline_str: Option<String>,
    /// Confidence reported by the parser script, kept verbatim.
    ///
    /// Use [`ExtractedPackageRecord::confidence_ratio`] for a value in `[0, 1]`.
    pub confidence: f64,
}

impl ExtractedPackageRecord {
    /// Confidence normalised to `[0, 1]`.
    ///
    /// The parser script reports percentages (60, 80, 90); values above 1
    /// are treated as percentages.
    pub fn confidence_ratio(&self) -> f64 {
        let c = if self.confidence > 1.0 {
            self.confidence / 100.0
        } else {
            self.confidence
        };
        c.clamp(0.0, 1.0)
    }

    /// Whether the tracking code matches the `XX000000000XX` format.
    pub fn has_valid_tracking_code(&self) -> bool {
        is_valid_tracking_code(&self.tracking_code)
    }
}

/// Check a tracking code against the `XX000000000XX` format (case-insensitive).
pub fn is_valid_tracking_code(code: &str) -> bool {
    RE_TRACKING_CODE.is_match(&code.trim().to_uppercase())
}

/// Document-level facts about one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetadata {
    pub file_name: String,
    #[serde(default)]
    pub file_size: u64,
    /// Wall-clock time in milliseconds, measured by the orchestrator.
    #[serde(default)]
    pub processing_time: u64,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Total printed in the manifest footer, 0 when not found.
    #[serde(default)]
    pub expected_total: u32,
    #[serde(default)]
    pub extracted_total: u32,
    #[serde(default)]
    pub pages_processed: u32,
    /// Return date printed in the manifest header (`DD/MM/YYYY`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<String>,
    /// Arrival date printed in the manifest header (`DD/MM/YYYY`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_date: Option<String>,
}

fn default_strategy() -> String {
    DEFAULT_STRATEGY.to_string()
}

impl ExtractionMetadata {
    /// Zeroed metadata for a run that never produced output.
    pub fn empty(file_name: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            file_size: 0,
            processing_time: 0,
            strategy: strategy.into(),
            expected_total: 0,
            extracted_total: 0,
            pages_processed: 0,
            return_date: None,
            arrival_date: None,
        }
    }
}

/// The complete outcome of an extraction.
///
/// Always produced, never thrown: failures are `success: false` with at
/// least one entry in `errors`. Warnings are advisory and never turn a
/// successful result into a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub success: bool,
    pub total_packages: u32,
    #[serde(default)]
    pub packages: Vec<ExtractedPackageRecord>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub metadata: ExtractionMetadata,
}

impl ExtractionResult {
    /// Build a failed result from an [`ExtractError`].
    ///
    /// Metadata is zeroed; the caller stamps `processing_time` when the
    /// failure happened after the clock started.
    pub fn failure(file_name: impl Into<String>, strategy: impl Into<String>, err: &ExtractError) -> Self {
        Self {
            success: false,
            total_packages: 0,
            packages: Vec::new(),
            errors: err.error_lines(),
            warnings: err.warning().map(|w| vec![w.to_string()]).unwrap_or_default(),
            metadata: ExtractionMetadata::empty(file_name, strategy),
        }
    }

    /// Set the measured wall-clock time and return `self`.
    pub fn with_processing_time(mut self, ms: u64) -> Self {
        self.metadata.processing_time = ms;
        self
    }

    /// `true` when a successful result reports as many packages as it carries.
    ///
    /// Failed results are always considered consistent.
    pub fn is_consistent(&self) -> bool {
        !self.success || self.total_packages as usize == self.packages.len()
    }

    /// Records whose tracking code does not match the postal format.
    pub fn invalid_tracking_codes(&self) -> Vec<&ExtractedPackageRecord> {
        self.packages
            .iter()
            .filter(|p| !p.has_valid_tracking_code())
            .collect()
    }

    /// `expected_total - extracted_total` when the manifest printed a total
    /// and it disagrees with what was extracted.
    pub fn count_mismatch(&self) -> Option<i64> {
        let expected = self.metadata.expected_total as i64;
        let extracted = self.metadata.extracted_total as i64;
        if expected > 0 && expected != extracted {
            Some(expected - extracted)
        } else {
            None
        }
    }

    /// Convert into `Err(ExtractError::Reported)` when `success` is false.
    ///
    /// For callers that would rather propagate with `?` than inspect the flag.
    pub fn into_result(self) -> Result<ExtractionResult, ExtractError> {
        if self.success {
            Ok(self)
        } else {
            Err(ExtractError::Reported {
                errors: self.errors,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(code: &str, confidence: f64) -> ExtractedPackageRecord {
        ExtractedPackageRecord {
            line_number: 1,
            tracking_code: code.into(),
            recipient: "MARIA DA SILVA".into(),
            position: "A-12".into(),
            date: "03/02/2025".into(),
            date_iso: "2025-02-03".into(),
            pickup_deadline: None,
            pickup_deadline_str: None,
            confidence,
        }
    }

    #[test]
    fn parses_script_payload() {
        let json = r#"{
            "success": true,
            "totalPackages": 1,
            "packages": [{
                "lineNumber": 7,
                "trackingCode": "QB123456789BR",
                "recipient": "JOAO PEREIRA",
                "position": "B-3",
                "date": "10/03/2025",
                "dateISO": "2025-03-10",
                "pickupDeadline": "2025-03-17",
                "pickupDeadlineStr": "17/03/2025",
                "confidence": 90
            }],
            "errors": [],
            "warnings": [],
            "metadata": {
                "fileName": "ldi.pdf",
                "fileSize": 2048,
                "processingTime": 999,
                "strategy": "docling",
                "expectedTotal": 1,
                "extractedTotal": 1,
                "pagesProcessed": 1,
                "returnDate": "17/03/2025",
                "arrivalDate": "10/03/2025"
            }
        }"#;
        let r: ExtractionResult = serde_json::from_str(json).unwrap();
        assert!(r.success);
        assert!(r.is_consistent());
        let p = &r.packages[0];
        assert_eq!(p.date_iso, "2025-03-10");
        assert_eq!(p.pickup_deadline.as_deref(), Some("2025-03-17"));
        assert!((p.confidence_ratio() - 0.9).abs() < f64::EPSILON);
        assert_eq!(r.metadata.arrival_date.as_deref(), Some("10/03/2025"));
    }

    #[test]
    fn missing_metadata_numbers_default_to_zero() {
        let json = r#"{"success":false,"totalPackages":0,"metadata":{"fileName":"x.pdf"}}"#;
        let r: ExtractionResult = serde_json::from_str(json).unwrap();
        assert_eq!(r.metadata.file_size, 0);
        assert_eq!(r.metadata.strategy, DEFAULT_STRATEGY);
        assert!(r.packages.is_empty());
    }

    #[test]
    fn serialises_camel_case_and_skips_absent_options() {
        let r = ExtractionResult {
            success: true,
            total_packages: 1,
            packages: vec![record("AA000000000BR", 0.8)],
            errors: vec![],
            warnings: vec![],
            metadata: ExtractionMetadata::empty("a.pdf", "docling"),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["totalPackages"], 1);
        assert_eq!(v["packages"][0]["dateISO"], "2025-02-03");
        assert!(v["packages"][0].get("pickupDeadline").is_none());
        assert!(v["metadata"].get("returnDate").is_none());
    }

    #[test]
    fn tracking_code_validation() {
        assert!(is_valid_tracking_code("QB123456789BR"));
        assert!(is_valid_tracking_code(" qb123456789br "));
        assert!(!is_valid_tracking_code("QB12345678BR"));
        assert!(!is_valid_tracking_code(""));

        let r = ExtractionResult {
            success: true,
            total_packages: 2,
            packages: vec![record("QB123456789BR", 90.0), record("garbled", 60.0)],
            errors: vec![],
            warnings: vec![],
            metadata: ExtractionMetadata::empty("a.pdf", "docling"),
        };
        let bad = r.invalid_tracking_codes();
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].tracking_code, "garbled");
    }

    #[test]
    fn confidence_ratio_is_clamped() {
        assert_eq!(record("x", 150.0).confidence_ratio(), 1.0);
        assert_eq!(record("x", -3.0).confidence_ratio(), 0.0);
        assert_eq!(record("x", 0.5).confidence_ratio(), 0.5);
    }

    #[test]
    fn count_mismatch_only_when_total_known() {
        let mut meta = ExtractionMetadata::empty("a.pdf", "docling");
        meta.extracted_total = 3;
        let mut r = ExtractionResult {
            success: true,
            total_packages: 3,
            packages: vec![],
            errors: vec![],
            warnings: vec![],
            metadata: meta,
        };
        assert_eq!(r.count_mismatch(), None);
        r.metadata.expected_total = 5;
        assert_eq!(r.count_mismatch(), Some(2));
        assert!(!r.is_consistent());
    }

    #[test]
    fn failure_and_into_result() {
        let err = ExtractError::LibraryMissing {
            module: "docling".into(),
            interpreter: PathBuf::from("python3"),
        };
        let r = ExtractionResult::failure("up.pdf", "docling", &err).with_processing_time(12);
        assert!(!r.success);
        assert_eq!(r.errors.len(), 1);
        assert_eq!(r.warnings.len(), 1);
        assert_eq!(r.metadata.processing_time, 12);
        assert!(r.is_consistent());

        match r.into_result() {
            Err(ExtractError::Reported { errors }) => assert_eq!(errors.len(), 1),
            other => panic!("expected Reported, got {other:?}"),
        }
    }
}
