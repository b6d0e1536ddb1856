//! Retainer agreement email draft, rendered from an intake.
//!
//! Downstream automation sends the real email after the case sync; this
//! preview lets the reviewer see what the client will receive.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::config::RetainerConfig;
use crate::format::{first_name, format_date};
use crate::model::{BodilyInjuryOption, Intake};

pub const BODILY_INJURY_PARAGRAPH: &str = "Please be aware that based on the information \
provided, there may be bodily injuries that require medical attention. Our legal team will \
ensure that your personal injury claim fully accounts for all injuries sustained in this \
accident, and we will work diligently to secure appropriate compensation for your medical \
expenses, pain and suffering, and related damages.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentKind {
    InOffice,
    Virtual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulingLink {
    pub kind: AppointmentKind,
    pub url: String,
    pub label: &'static str,
    pub reason: &'static str,
}

/// In-office appointments March through August, virtual otherwise.
pub fn scheduling_link(config: &RetainerConfig, now: DateTime<Utc>) -> SchedulingLink {
    if (3..=8).contains(&now.month()) {
        SchedulingLink {
            kind: AppointmentKind::InOffice,
            url: config.in_office_url.clone(),
            label: "In-Office Appointment",
            reason: "In-office link used March–August",
        }
    } else {
        SchedulingLink {
            kind: AppointmentKind::Virtual,
            url: config.virtual_url.clone(),
            label: "Virtual Appointment",
            reason: "Virtual link used September–February",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetainerEmail {
    pub to: String,
    pub subject: String,
    pub greeting: String,
    pub paragraphs: Vec<String>,
    pub signature: Vec<String>,
    pub attachment_name: String,
    pub scheduling: SchedulingLink,
    pub includes_bodily_injury: bool,
}

impl RetainerEmail {
    /// Plain-text rendering of the whole email body.
    pub fn body_text(&self) -> String {
        let mut parts = Vec::with_capacity(self.paragraphs.len() + 2);
        parts.push(self.greeting.clone());
        parts.extend(self.paragraphs.iter().cloned());
        parts.push(self.signature.join("\n"));
        parts.join("\n\n")
    }
}

pub fn render(intake: &Intake, config: &RetainerConfig, now: DateTime<Utc>) -> RetainerEmail {
    let case = &intake.case;
    let scheduling = scheduling_link(config, now);
    let client_name = case.client_name.as_deref().filter(|n| !n.trim().is_empty());

    let accident_on = case
        .date_of_accident
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(|d| format!(" on {}", format_date(d)))
        .unwrap_or_default();

    let mut paragraphs = vec![format!(
        "I hope you're doing well. I wanted to follow up regarding your car accident{}. \
         I know dealing with the aftermath of a crash is stressful, and I want to make sure \
         we move things forward as smoothly as possible for you.",
        accident_on
    )];

    if let Some(description) = case
        .accident_description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
    {
        paragraphs.push(format!(
            "From the details shared, I understand that {}",
            description
        ));
    }

    let includes_bodily_injury =
        case.use_bodily_injury_paragraph == Some(BodilyInjuryOption::Yes);
    if includes_bodily_injury {
        paragraphs.push(BODILY_INJURY_PARAGRAPH.to_string());
    }

    paragraphs.push(
        "Attached is your Retainer Agreement, which sets the foundation for our partnership. \
         It details the specific legal services we will provide and the mutual responsibilities \
         needed to move your claim forward effectively. Please take a moment to review it \
         before we meet."
            .to_string(),
    );
    paragraphs.push(format!(
        "When you're ready, you can book an appointment with us using this link: {}. \
         At that meeting, we'll go through the agreement in detail and discuss next steps.",
        scheduling.url
    ));

    RetainerEmail {
        to: config.recipient.clone(),
        subject: format!("Retainer Agreement for Your Review – {}", config.firm_name),
        greeting: format!("Hello {},", first_name(client_name)),
        paragraphs,
        signature: vec![config.signer_name.clone(), config.firm_name.clone()],
        attachment_name: format!(
            "{} [Retainer Agreement].pdf",
            client_name.unwrap_or("Client Name")
        ),
        scheduling,
        includes_bodily_injury,
    }
}
