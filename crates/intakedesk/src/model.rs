//! Intake records and the payloads that mutate them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::format::format_elapsed;

/// Lifecycle status of an intake.
///
/// The set is closed: the database carries a matching `CHECK` constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntakeStatus {
    Uploading,
    Extracting,
    Review,
    Flagged,
    Approved,
    Sent,
    Rejected,
    /// Kept for compatibility with existing rows. No transition produces it.
    Failed,
}

impl IntakeStatus {
    pub const ALL: [IntakeStatus; 8] = [
        IntakeStatus::Uploading,
        IntakeStatus::Extracting,
        IntakeStatus::Review,
        IntakeStatus::Flagged,
        IntakeStatus::Approved,
        IntakeStatus::Sent,
        IntakeStatus::Rejected,
        IntakeStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntakeStatus::Uploading => "Uploading",
            IntakeStatus::Extracting => "Extracting",
            IntakeStatus::Review => "Review",
            IntakeStatus::Flagged => "Flagged",
            IntakeStatus::Approved => "Approved",
            IntakeStatus::Sent => "Sent",
            IntakeStatus::Rejected => "Rejected",
            IntakeStatus::Failed => "Failed",
        }
    }

    /// Approved and Sent records no longer accept edits to case fields.
    pub fn is_locked(&self) -> bool {
        matches!(self, IntakeStatus::Approved | IntakeStatus::Sent)
    }

    /// Statuses the dashboard keeps polling for.
    pub fn is_transient(&self) -> bool {
        matches!(self, IntakeStatus::Uploading | IntakeStatus::Extracting)
    }

    /// Statuses with no outgoing transitions.
    pub fn is_absorbing(&self) -> bool {
        matches!(self, IntakeStatus::Rejected | IntakeStatus::Failed)
    }
}

impl fmt::Display for IntakeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntakeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntakeStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown intake status '{}'", s))
    }
}

/// Whether the bodily-injury paragraph goes into the retainer email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodilyInjuryOption {
    Yes,
    No,
    #[serde(rename = "Needs Review")]
    NeedsReview,
}

impl BodilyInjuryOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodilyInjuryOption::Yes => "Yes",
            BodilyInjuryOption::No => "No",
            BodilyInjuryOption::NeedsReview => "Needs Review",
        }
    }
}

impl FromStr for BodilyInjuryOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Yes" => Ok(BodilyInjuryOption::Yes),
            "No" => Ok(BodilyInjuryOption::No),
            "Needs Review" => Ok(BodilyInjuryOption::NeedsReview),
            other => Err(format!("unknown bodily injury option '{}'", other)),
        }
    }
}

/// Fields populated by the extraction pipeline.
///
/// Re-extraction resets this whole struct to its default; the extraction
/// callback overwrites it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseFields {
    pub clio_matter_id: Option<String>,
    #[serde(default)]
    pub clio_flagged: bool,
    pub client_name: Option<String>,
    pub client_gender: Option<String>,
    pub date_of_accident: Option<String>,
    pub accident_location: Option<String>,
    pub defendant_name: Option<String>,
    pub client_plate_number: Option<String>,
    pub number_of_injured: Option<u32>,
    #[serde(default)]
    pub injury_flag: bool,
    pub use_bodily_injury_paragraph: Option<BodilyInjuryOption>,
    pub accident_description: Option<String>,
    pub statute_of_limitations_date: Option<String>,
}

/// One uploaded police report and everything known about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intake {
    pub id: String,
    pub status: IntakeStatus,
    pub pdf_url: Option<String>,
    #[serde(flatten)]
    pub case: CaseFields,
    pub notes: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub extracted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Intake {
    /// A fresh record in `Uploading`, before its document is stored.
    pub fn new_upload(now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status: IntakeStatus::Uploading,
            pdf_url: None,
            case: CaseFields::default(),
            notes: None,
            uploaded_at: now,
            extracted_at: None,
            approved_at: None,
            sent_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Speed timer: upload to sent, or upload to `now` while still open.
    pub fn elapsed(&self, now: DateTime<Utc>) -> String {
        format_elapsed(self.uploaded_at, self.sent_at.unwrap_or(now))
    }
}

/// Body posted by the extraction pipeline once a document has been read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractedPayload {
    pub intake_id: Option<String>,
    pub clio_matter_id: Option<String>,
    pub clio_flagged: Option<bool>,
    pub client_name: Option<String>,
    pub client_gender: Option<String>,
    pub date_of_accident: Option<String>,
    pub accident_location: Option<String>,
    pub defendant_name: Option<String>,
    pub client_plate_number: Option<String>,
    pub number_of_injured: Option<u32>,
    pub injury_flag: Option<bool>,
    pub use_bodily_injury_paragraph: Option<BodilyInjuryOption>,
    pub accident_description: Option<String>,
    pub statute_of_limitations_date: Option<String>,
}

impl ExtractedPayload {
    /// Splits the payload into the target intake id and the case fields.
    ///
    /// Returns `None` when `intake_id` is missing or blank.
    pub fn into_parts(self) -> Option<(String, CaseFields)> {
        let id = self.intake_id.filter(|id| !id.trim().is_empty())?;
        let fields = CaseFields {
            clio_matter_id: self.clio_matter_id,
            clio_flagged: self.clio_flagged.unwrap_or(false),
            client_name: self.client_name,
            client_gender: self.client_gender,
            date_of_accident: self.date_of_accident,
            accident_location: self.accident_location,
            defendant_name: self.defendant_name,
            client_plate_number: self.client_plate_number,
            number_of_injured: self.number_of_injured,
            injury_flag: self.injury_flag.unwrap_or(false),
            use_bodily_injury_paragraph: self.use_bodily_injury_paragraph,
            accident_description: self.accident_description,
            statute_of_limitations_date: self.statute_of_limitations_date,
        };
        Some((id.trim().to_string(), fields))
    }
}

/// Distinguishes an absent key (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial edit submitted from the review surface.
///
/// Only case fields and notes are editable. Status, identifiers and
/// timestamps are owned by the lifecycle and rejected as unknown fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntakePatch {
    #[serde(default, deserialize_with = "double_option")]
    pub clio_matter_id: Option<Option<String>>,
    #[serde(default)]
    pub clio_flagged: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub client_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub client_gender: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub date_of_accident: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub accident_location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub defendant_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub client_plate_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub number_of_injured: Option<Option<u32>>,
    #[serde(default)]
    pub injury_flag: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub use_bodily_injury_paragraph: Option<Option<BodilyInjuryOption>>,
    #[serde(default, deserialize_with = "double_option")]
    pub accident_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub statute_of_limitations_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl IntakePatch {
    pub fn is_empty(&self) -> bool {
        !self.touches_case_fields() && self.notes.is_none()
    }

    /// True when the patch writes anything besides `notes`.
    pub fn touches_case_fields(&self) -> bool {
        self.clio_matter_id.is_some()
            || self.clio_flagged.is_some()
            || self.client_name.is_some()
            || self.client_gender.is_some()
            || self.date_of_accident.is_some()
            || self.accident_location.is_some()
            || self.defendant_name.is_some()
            || self.client_plate_number.is_some()
            || self.number_of_injured.is_some()
            || self.injury_flag.is_some()
            || self.use_bodily_injury_paragraph.is_some()
            || self.accident_description.is_some()
            || self.statute_of_limitations_date.is_some()
    }

    /// Writes every present key onto the intake.
    pub fn apply_to(self, intake: &mut Intake) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        let case = &mut intake.case;
        set(&mut case.clio_matter_id, self.clio_matter_id);
        set(&mut case.clio_flagged, self.clio_flagged);
        set(&mut case.client_name, self.client_name);
        set(&mut case.client_gender, self.client_gender);
        set(&mut case.date_of_accident, self.date_of_accident);
        set(&mut case.accident_location, self.accident_location);
        set(&mut case.defendant_name, self.defendant_name);
        set(&mut case.client_plate_number, self.client_plate_number);
        set(&mut case.number_of_injured, self.number_of_injured);
        set(&mut case.injury_flag, self.injury_flag);
        set(
            &mut case.use_bodily_injury_paragraph,
            self.use_bodily_injury_paragraph,
        );
        set(&mut case.accident_description, self.accident_description);
        set(
            &mut case.statute_of_limitations_date,
            self.statute_of_limitations_date,
        );
        set(&mut intake.notes, self.notes);
    }
}

/// Dashboard pipeline tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineTab {
    #[default]
    All,
    Review,
    Approved,
    Sent,
}

impl PipelineTab {
    pub fn includes(&self, status: IntakeStatus) -> bool {
        match self {
            PipelineTab::All => true,
            PipelineTab::Review => matches!(status, IntakeStatus::Review | IntakeStatus::Flagged),
            PipelineTab::Approved => status == IntakeStatus::Approved,
            PipelineTab::Sent => status == IntakeStatus::Sent,
        }
    }
}
