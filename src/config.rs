//! Configuration types for pdf-toolkit operations.
//!
//! Process-wide limits and tuning knobs live in [`ToolkitConfig`], built via
//! [`ToolkitConfigBuilder`]. Per-call arguments that have their own parsing
//! or clamping rules get small value types here: [`CompressionLevel`],
//! [`EncryptionAlgorithm`] and [`PageRange`].
//!
//! # Design choice: builder over constructor
//! Most callers only ever touch the size ceiling. The builder lets them set
//! that and rely on documented defaults for the rest, while `build()` is the
//! single place invalid combinations are rejected.

use crate::error::ToolkitError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default input size ceiling: 30 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 30 * 1024 * 1024;

/// Number of leading bytes inspected by the content sniffer.
pub const DEFAULT_SNIFF_LEN: usize = 1024;

/// JPEG quality used when recompressing embedded images.
pub const DEFAULT_IMAGE_QUALITY: u8 = 60;

/// Pages per batch for table extraction.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Shared configuration for every operation of a [`crate::PdfToolkit`].
///
/// # Example
/// ```rust
/// use pdf_toolkit::ToolkitConfig;
///
/// let config = ToolkitConfig::builder()
///     .max_file_size(10 * 1024 * 1024)
///     .image_quality(75)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_file_size, 10 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolkitConfig {
    /// Inputs larger than this many bytes fail validation. Default: 30 MiB.
    pub max_file_size: u64,

    /// Leading bytes handed to the MIME sniffer. Default: 1024.
    pub sniff_len: usize,

    /// JPEG quality (1–100) for recompressed images. Default: 60.
    ///
    /// Deliberately independent of the compression level: the level tunes
    /// zlib effort on content streams, this tunes lossy image size.
    pub image_quality: u8,

    /// Default pages-per-batch for table extraction. Default: 5.
    pub batch_size: usize,

    /// Algorithm used by `encrypt` when the caller names none. Default: AES-256-R5.
    pub default_algorithm: EncryptionAlgorithm,

    /// Table detection tuning.
    pub tables: TableDetection,
}

/// Tolerances for the built-in alignment table detector.
///
/// PDF text has no notion of rows or cells; the detector clusters glyph runs
/// by baseline and left edge. These tolerances are in PDF points (1/72 in).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableDetection {
    /// Runs whose baselines differ by at most this much share a row. Default: 3.0.
    pub row_tolerance: f32,

    /// Cells whose left edges differ by at most this much share a column. Default: 12.0.
    pub column_tolerance: f32,

    /// Horizontal gap that separates two cells within a row. Default: 14.0.
    pub cell_gap: f32,

    /// Minimum consecutive aligned rows that count as a table. Default: 2.
    pub min_rows: usize,
}

impl Default for TableDetection {
    fn default() -> Self {
        Self {
            row_tolerance: 3.0,
            column_tolerance: 12.0,
            cell_gap: 14.0,
            min_rows: 2,
        }
    }
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            sniff_len: DEFAULT_SNIFF_LEN,
            image_quality: DEFAULT_IMAGE_QUALITY,
            batch_size: DEFAULT_BATCH_SIZE,
            default_algorithm: EncryptionAlgorithm::default(),
            tables: TableDetection::default(),
        }
    }
}

impl ToolkitConfig {
    /// Create a new builder for `ToolkitConfig`.
    pub fn builder() -> ToolkitConfigBuilder {
        ToolkitConfigBuilder {
            config: ToolkitConfig::default(),
        }
    }
}

/// Builder for [`ToolkitConfig`].
#[derive(Debug, Clone)]
pub struct ToolkitConfigBuilder {
    config: ToolkitConfig,
}

impl ToolkitConfigBuilder {
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn sniff_len(mut self, len: usize) -> Self {
        self.config.sniff_len = len;
        self
    }

    pub fn image_quality(mut self, quality: u8) -> Self {
        self.config.image_quality = quality;
        self
    }

    pub fn batch_size(mut self, pages: usize) -> Self {
        self.config.batch_size = pages.max(1);
        self
    }

    pub fn default_algorithm(mut self, algorithm: EncryptionAlgorithm) -> Self {
        self.config.default_algorithm = algorithm;
        self
    }

    pub fn table_detection(mut self, tables: TableDetection) -> Self {
        self.config.tables = tables;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ToolkitConfig, ToolkitError> {
        let c = &self.config;
        if c.max_file_size == 0 {
            return Err(ToolkitError::InvalidConfig(
                "max_file_size must be greater than zero".into(),
            ));
        }
        if c.sniff_len == 0 {
            return Err(ToolkitError::InvalidConfig(
                "sniff_len must be greater than zero".into(),
            ));
        }
        if !(1..=100).contains(&c.image_quality) {
            return Err(ToolkitError::InvalidConfig(format!(
                "image_quality must be between 1 and 100, got {}",
                c.image_quality
            )));
        }
        if c.tables.min_rows == 0 {
            return Err(ToolkitError::InvalidConfig(
                "tables.min_rows must be at least 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Compression level ────────────────────────────────────────────────────

/// User-facing compression level, always within 1–10.
///
/// Out-of-range requests are clamped rather than rejected, so `--level 42`
/// behaves like `--level 10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// Clamp `level` into 1–10.
    pub fn new(level: i64) -> Self {
        Self(level.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zlib level handed to the stream compressor.
    ///
    /// | user level | zlib level |
    /// |------------|------------|
    /// | 1–4        | level × 2  |
    /// | 5–10       | 9          |
    ///
    /// The upper half collapses onto the maximum on purpose; it is a
    /// calibration, not a linear interpolation.
    pub fn engine_level(self) -> u32 {
        if self.0 < 5 {
            u32::from(self.0) * 2
        } else {
            9
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self(5)
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Encryption algorithm ─────────────────────────────────────────────────

/// Standard security handler revisions supported by `encrypt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EncryptionAlgorithm {
    /// RC4, 40-bit key (V1/R2).
    #[serde(rename = "RC4-40")]
    Rc4_40,
    /// RC4, 128-bit key (V2/R3).
    #[serde(rename = "RC4-128")]
    Rc4_128,
    /// AES-128 crypt filters (V4/R4).
    #[serde(rename = "AES-128")]
    Aes128,
    /// AES-256, revision 5 (Adobe extension level 3).
    #[default]
    #[serde(rename = "AES-256-R5")]
    Aes256R5,
    /// AES-256, revision 6 (ISO 32000-2).
    #[serde(rename = "AES-256")]
    Aes256,
}

impl EncryptionAlgorithm {
    pub const ALL: [EncryptionAlgorithm; 5] = [
        EncryptionAlgorithm::Rc4_40,
        EncryptionAlgorithm::Rc4_128,
        EncryptionAlgorithm::Aes128,
        EncryptionAlgorithm::Aes256R5,
        EncryptionAlgorithm::Aes256,
    ];

    /// Canonical name, as accepted by `FromStr`.
    pub fn name(self) -> &'static str {
        match self {
            EncryptionAlgorithm::Rc4_40 => "RC4-40",
            EncryptionAlgorithm::Rc4_128 => "RC4-128",
            EncryptionAlgorithm::Aes128 => "AES-128",
            EncryptionAlgorithm::Aes256R5 => "AES-256-R5",
            EncryptionAlgorithm::Aes256 => "AES-256",
        }
    }
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EncryptionAlgorithm {
    type Err = ToolkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ToolkitError::UnsupportedAlgorithm {
                name: wanted.to_string(),
            })
    }
}

// ── Page range ───────────────────────────────────────────────────────────

/// 0-based, inclusive page range. `end: None` means "through the last page".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl PageRange {
    pub fn new(start: usize, end: Option<usize>) -> Self {
        Self { start, end }
    }

    /// Every page.
    pub fn all() -> Self {
        Self::default()
    }

    /// Resolve against a document with `total` pages.
    ///
    /// Returns the inclusive `(first, last)` indices. An `end` past the last
    /// page is clamped; a `start` past it, or an `end` before `start`, is an
    /// error.
    pub fn resolve(&self, total: usize) -> Result<(usize, usize), ToolkitError> {
        if total == 0 || self.start >= total {
            return Err(ToolkitError::PageOutOfRange {
                page: self.start,
                total,
            });
        }
        let last = self.end.map_or(total - 1, |e| e.min(total - 1));
        if last < self.start {
            return Err(ToolkitError::InvalidConfig(format!(
                "end page {} is before start page {}",
                last, self.start
            )));
        }
        Ok((self.start, last))
    }
}
