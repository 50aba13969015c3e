//! Report record and payload types
//!
//! A `Report` is one daily situation report as persisted and synchronized
//! across the local cache, the durable log, and the remote endpoint. Field
//! names follow the wire format of the deployed system, so serialized records
//! stay interchangeable with data produced by earlier clients. Every field
//! tolerates absence on deserialization: foreign records arrive from the
//! remote endpoint and from imported snapshots, and a missing field must not
//! reject the whole document.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// NAMESPACES
// ============================================================================

/// Cache namespace discriminator. Entries of different namespaces share the
/// substrate under one key prefix and are told apart by their token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    Report,
    Template,
    Settings,
}

impl Namespace {
    /// Wire token used inside cache keys and remote payloads.
    pub fn token(&self) -> &'static str {
        match self {
            Namespace::Report => "laporan",
            Namespace::Template => "template",
            Namespace::Settings => "settings",
        }
    }

    /// Reverse lookup from a key token. Unknown tokens (possible after a raw
    /// import wrote foreign keys) return None.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "laporan" => Some(Namespace::Report),
            "template" => Some(Namespace::Template),
            "settings" => Some(Namespace::Settings),
            _ => None,
        }
    }
}

// ============================================================================
// REPORT PERIOD
// ============================================================================

/// Reporting period marker. Reports are filed twice daily, at 04.00 and
/// 16.00 local time; the wire format keeps the dotted clock labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportPeriod {
    #[default]
    #[serde(rename = "04.00")]
    Dawn,
    #[serde(rename = "16.00")]
    Dusk,
}

impl ReportPeriod {
    /// Dotted clock label as it appears on the wire.
    pub fn label(&self) -> &'static str {
        match self {
            ReportPeriod::Dawn => "04.00",
            ReportPeriod::Dusk => "16.00",
        }
    }

    /// Label without the dot, used in derived report ids.
    pub fn compact(&self) -> &'static str {
        match self {
            ReportPeriod::Dawn => "0400",
            ReportPeriod::Dusk => "1600",
        }
    }
}

impl std::fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// PAYLOAD
// ============================================================================

/// Operational readiness summary (personnel strength figures).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpsReadiness {
    #[serde(default)]
    pub top_dspp: String,
    #[serde(default)]
    pub nyata: String,
    #[serde(default)]
    pub kurang: String,
    #[serde(default)]
    pub siap_ops: String,
}

/// Activity entries grouped by role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySet {
    #[serde(default)]
    pub danramil: Vec<String>,
    #[serde(default)]
    pub koramil: Vec<String>,
    #[serde(default)]
    pub babinsa: Vec<String>,
}

/// Structured report payload stored alongside the formatted narrative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportBody {
    /// Noteworthy events ("hal-hal menonjol").
    #[serde(default)]
    pub haljol: String,
    /// Readiness figures.
    #[serde(default)]
    pub data_siap_ops: OpsReadiness,
    /// Free-form remarks block.
    #[serde(default)]
    pub keterangan: String,
    /// Activities by role.
    #[serde(default)]
    pub kegiatan: ActivitySet,
}

// ============================================================================
// REPORT RECORD
// ============================================================================

/// One situation report as persisted across all tiers.
///
/// `laporan` holds the pre-formatted narrative and is opaque to this layer;
/// `data` carries the structured fields it was rendered from. `timestamp`
/// stays a raw string so that foreign records round-trip byte-identically
/// even when their instant does not parse; ordering goes through
/// [`Report::sort_timestamp`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Unique record id; empty when a foreign record carried none.
    #[serde(default)]
    pub id: String,
    /// Report date, "YYYY-MM-DD".
    #[serde(default)]
    pub tanggal: String,
    /// Reporting period.
    #[serde(default)]
    pub waktu: ReportPeriod,
    /// Formatted narrative, opaque payload.
    #[serde(default)]
    pub laporan: String,
    /// Structured payload.
    #[serde(default)]
    pub data: ReportBody,
    /// ISO creation instant.
    #[serde(default)]
    pub timestamp: String,
    /// Locale display instant, set when the report was saved.
    #[serde(default, rename = "savedAt")]
    pub saved_at: String,
}

impl Report {
    /// Create a report for the given date and period, deriving its id and
    /// stamping creation instants.
    pub fn new(
        tanggal: impl Into<String>,
        waktu: ReportPeriod,
        laporan: impl Into<String>,
        data: ReportBody,
    ) -> Self {
        let tanggal = tanggal.into();
        let now = Utc::now();
        Report {
            id: Self::derive_id(&tanggal, waktu),
            tanggal,
            waktu,
            laporan: laporan.into(),
            data,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            saved_at: now.format("%-d/%-m/%Y, %H.%M.%S").to_string(),
        }
    }

    /// Derived id: `laporan_<date>_<period>`, e.g. `laporan_2024-01-01_1600`.
    /// One slot per date and period; a re-save overwrites the cache entry.
    pub fn derive_id(tanggal: &str, waktu: ReportPeriod) -> String {
        format!("laporan_{}_{}", tanggal, waktu.compact())
    }

    /// Fresh id for records restored without one.
    pub fn restored_id() -> String {
        format!("restored_{}", Uuid::now_v7())
    }

    /// True when the record carries a usable id.
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// Creation instant for ordering. Unparseable timestamps sort as the
    /// Unix epoch, so malformed foreign records sink to the oldest end
    /// instead of rejecting the merge.
    pub fn sort_timestamp(&self) -> DateTime<Utc> {
        parse_timestamp_or_epoch(&self.timestamp)
    }
}

/// Parse an ISO instant, accepting the zoned RFC 3339 form and the naive
/// variant without an offset; anything else maps to the Unix epoch.
pub fn parse_timestamp_or_epoch(raw: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.and_utc();
    }
    DateTime::UNIX_EPOCH
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Strings that contain no digits cannot form an instant and must
        /// fall back to the epoch (and never panic on the way).
        #[test]
        fn prop_digitless_strings_fall_back_to_epoch(raw in "[a-zA-Z :+.\\-]{0,40}") {
            prop_assert_eq!(parse_timestamp_or_epoch(&raw), DateTime::UNIX_EPOCH);
        }

        /// Well-formed zoned instants parse to their own instant, not the
        /// fallback.
        #[test]
        fn prop_rfc3339_instants_parse(
            year in 2020u16..2100,
            month in 1u8..=12,
            day in 1u8..=28,
            hour in 0u8..24,
        ) {
            let raw = format!("{:04}-{:02}-{:02}T{:02}:30:00Z", year, month, day, hour);
            let parsed = parse_timestamp_or_epoch(&raw);
            prop_assert!(parsed > DateTime::UNIX_EPOCH);
            prop_assert_eq!(parsed.to_rfc3339_opts(SecondsFormat::Secs, true), raw);
        }

        /// Derived ids embed the date and the compact period label.
        #[test]
        fn prop_derive_id_embeds_parts(
            year in 2020u16..2100,
            month in 1u8..=12,
            day in 1u8..=28,
        ) {
            let tanggal = format!("{:04}-{:02}-{:02}", year, month, day);
            for waktu in [ReportPeriod::Dawn, ReportPeriod::Dusk] {
                let id = Report::derive_id(&tanggal, waktu);
                prop_assert!(id.starts_with("laporan_"));
                prop_assert!(id.contains(&tanggal));
                prop_assert!(id.ends_with(waktu.compact()));
            }
        }
    }
}
