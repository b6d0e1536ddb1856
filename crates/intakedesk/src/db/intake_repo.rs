//! Intake repository: CRUD operations for the `intakes` table.
//!
//! Functions suffixed `_in` take a bare connection so they can run inside a
//! caller's transaction; the others lock the shared handle themselves.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_timestamp, parse_timestamp, Database, DatabaseError};
use crate::model::{CaseFields, Intake};

/// A raw intake row from the database.
#[derive(Debug, Clone)]
pub struct IntakeRow {
    pub id: String,
    pub status: String,
    pub pdf_url: Option<String>,
    pub clio_matter_id: Option<String>,
    pub clio_flagged: bool,
    pub client_name: Option<String>,
    pub client_gender: Option<String>,
    pub date_of_accident: Option<String>,
    pub accident_location: Option<String>,
    pub defendant_name: Option<String>,
    pub client_plate_number: Option<String>,
    pub number_of_injured: Option<i64>,
    pub injury_flag: bool,
    pub use_bodily_injury_paragraph: Option<String>,
    pub accident_description: Option<String>,
    pub statute_of_limitations_date: Option<String>,
    pub notes: Option<String>,
    pub uploaded_at: String,
    pub extracted_at: Option<String>,
    pub approved_at: Option<String>,
    pub sent_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl IntakeRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            status: row.get("status")?,
            pdf_url: row.get("pdf_url")?,
            clio_matter_id: row.get("clio_matter_id")?,
            clio_flagged: row.get("clio_flagged")?,
            client_name: row.get("client_name")?,
            client_gender: row.get("client_gender")?,
            date_of_accident: row.get("date_of_accident")?,
            accident_location: row.get("accident_location")?,
            defendant_name: row.get("defendant_name")?,
            client_plate_number: row.get("client_plate_number")?,
            number_of_injured: row.get("number_of_injured")?,
            injury_flag: row.get("injury_flag")?,
            use_bodily_injury_paragraph: row.get("use_bodily_injury_paragraph")?,
            accident_description: row.get("accident_description")?,
            statute_of_limitations_date: row.get("statute_of_limitations_date")?,
            notes: row.get("notes")?,
            uploaded_at: row.get("uploaded_at")?,
            extracted_at: row.get("extracted_at")?,
            approved_at: row.get("approved_at")?,
            sent_at: row.get("sent_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn from_intake(intake: &Intake) -> Self {
        let case = &intake.case;
        Self {
            id: intake.id.clone(),
            status: intake.status.as_str().to_string(),
            pdf_url: intake.pdf_url.clone(),
            clio_matter_id: case.clio_matter_id.clone(),
            clio_flagged: case.clio_flagged,
            client_name: case.client_name.clone(),
            client_gender: case.client_gender.clone(),
            date_of_accident: case.date_of_accident.clone(),
            accident_location: case.accident_location.clone(),
            defendant_name: case.defendant_name.clone(),
            client_plate_number: case.client_plate_number.clone(),
            number_of_injured: case.number_of_injured.map(i64::from),
            injury_flag: case.injury_flag,
            use_bodily_injury_paragraph: case
                .use_bodily_injury_paragraph
                .map(|o| o.as_str().to_string()),
            accident_description: case.accident_description.clone(),
            statute_of_limitations_date: case.statute_of_limitations_date.clone(),
            notes: intake.notes.clone(),
            uploaded_at: format_timestamp(intake.uploaded_at),
            extracted_at: intake.extracted_at.map(format_timestamp),
            approved_at: intake.approved_at.map(format_timestamp),
            sent_at: intake.sent_at.map(format_timestamp),
            created_at: format_timestamp(intake.created_at),
            updated_at: format_timestamp(intake.updated_at),
        }
    }

    /// Converts the row into a domain record, rejecting unparseable values.
    pub fn into_intake(self) -> Result<Intake, DatabaseError> {
        let id = self.id;
        let malformed = |reason: String| DatabaseError::MalformedRow {
            id: id.clone(),
            reason,
        };
        let required = |name: &str, value: &str| {
            parse_timestamp(value).ok_or_else(|| malformed(format!("bad {} '{}'", name, value)))
        };
        let optional = |name: &str, value: Option<&String>| match value {
            Some(v) => required(name, v).map(Some),
            None => Ok(None),
        };

        let status = self.status.parse().map_err(malformed)?;
        let use_bodily_injury_paragraph = self
            .use_bodily_injury_paragraph
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(malformed)?;
        let number_of_injured = self
            .number_of_injured
            .map(u32::try_from)
            .transpose()
            .map_err(|e| malformed(format!("bad number_of_injured: {}", e)))?;

        Ok(Intake {
            status,
            pdf_url: self.pdf_url,
            case: CaseFields {
                clio_matter_id: self.clio_matter_id,
                clio_flagged: self.clio_flagged,
                client_name: self.client_name,
                client_gender: self.client_gender,
                date_of_accident: self.date_of_accident,
                accident_location: self.accident_location,
                defendant_name: self.defendant_name,
                client_plate_number: self.client_plate_number,
                number_of_injured,
                injury_flag: self.injury_flag,
                use_bodily_injury_paragraph,
                accident_description: self.accident_description,
                statute_of_limitations_date: self.statute_of_limitations_date,
            },
            notes: self.notes,
            uploaded_at: required("uploaded_at", &self.uploaded_at)?,
            extracted_at: optional("extracted_at", self.extracted_at.as_ref())?,
            approved_at: optional("approved_at", self.approved_at.as_ref())?,
            sent_at: optional("sent_at", self.sent_at.as_ref())?,
            created_at: required("created_at", &self.created_at)?,
            updated_at: required("updated_at", &self.updated_at)?,
            id,
        })
    }
}

/// Inserts a new intake row.
pub fn insert_in(conn: &Connection, intake: &Intake) -> Result<(), DatabaseError> {
    let row = IntakeRow::from_intake(intake);
    conn.execute(
        "INSERT INTO intakes (id, status, pdf_url, clio_matter_id, clio_flagged, client_name,
         client_gender, date_of_accident, accident_location, defendant_name, client_plate_number,
         number_of_injured, injury_flag, use_bodily_injury_paragraph, accident_description,
         statute_of_limitations_date, notes, uploaded_at, extracted_at, approved_at, sent_at,
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                 ?18, ?19, ?20, ?21, ?22, ?23)",
        params![
            row.id,
            row.status,
            row.pdf_url,
            row.clio_matter_id,
            row.clio_flagged,
            row.client_name,
            row.client_gender,
            row.date_of_accident,
            row.accident_location,
            row.defendant_name,
            row.client_plate_number,
            row.number_of_injured,
            row.injury_flag,
            row.use_bodily_injury_paragraph,
            row.accident_description,
            row.statute_of_limitations_date,
            row.notes,
            row.uploaded_at,
            row.extracted_at,
            row.approved_at,
            row.sent_at,
            row.created_at,
            row.updated_at,
        ],
    )?;
    Ok(())
}

pub fn insert(db: &Database, intake: &Intake) -> Result<(), DatabaseError> {
    db.with_conn(|conn| insert_in(conn, intake))
}

/// Overwrites every column except `id` and `created_at`.
///
/// Returns `false` when no row matched.
pub fn update_in(conn: &Connection, intake: &Intake) -> Result<bool, DatabaseError> {
    let row = IntakeRow::from_intake(intake);
    let changed = conn.execute(
        "UPDATE intakes SET status=?2, pdf_url=?3, clio_matter_id=?4, clio_flagged=?5,
         client_name=?6, client_gender=?7, date_of_accident=?8, accident_location=?9,
         defendant_name=?10, client_plate_number=?11, number_of_injured=?12, injury_flag=?13,
         use_bodily_injury_paragraph=?14, accident_description=?15,
         statute_of_limitations_date=?16, notes=?17, uploaded_at=?18, extracted_at=?19,
         approved_at=?20, sent_at=?21, updated_at=?22
         WHERE id=?1",
        params![
            row.id,
            row.status,
            row.pdf_url,
            row.clio_matter_id,
            row.clio_flagged,
            row.client_name,
            row.client_gender,
            row.date_of_accident,
            row.accident_location,
            row.defendant_name,
            row.client_plate_number,
            row.number_of_injured,
            row.injury_flag,
            row.use_bodily_injury_paragraph,
            row.accident_description,
            row.statute_of_limitations_date,
            row.notes,
            row.uploaded_at,
            row.extracted_at,
            row.approved_at,
            row.sent_at,
            row.updated_at,
        ],
    )?;
    Ok(changed > 0)
}

/// Finds an intake by its ID.
pub fn find_in(conn: &Connection, id: &str) -> Result<Option<Intake>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT * FROM intakes WHERE id = ?1",
            params![id],
            IntakeRow::from_row,
        )
        .optional()?;
    row.map(IntakeRow::into_intake).transpose()
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Intake>, DatabaseError> {
    db.with_conn(|conn| find_in(conn, id))
}

/// Lists every intake, newest first.
///
/// Rows that fail to convert are logged and skipped so one corrupt record
/// cannot take the dashboard down.
pub fn list_all(db: &Database) -> Result<Vec<Intake>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM intakes ORDER BY created_at DESC")?;
        let rows: Vec<IntakeRow> = stmt
            .query_map([], IntakeRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match row.into_intake() {
                Ok(intake) => Some(intake),
                Err(e) => {
                    log::warn!("Skipping intake row: {}", e);
                    None
                }
            })
            .collect())
    })
}

/// Deletes an intake. Returns `false` when no row matched.
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute("DELETE FROM intakes WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    })
}
