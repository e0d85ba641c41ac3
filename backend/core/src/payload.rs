//! Appointment payload shape and the helpers used to build it.

use anyhow::{Context, Result};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body posted to the clinic server. Every field is string-typed on the wire,
/// including the age components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppointmentPayload {
    pub visit_date: String,
    pub dr_code: String,
    pub dr_name: String,
    pub patient_name: String,
    pub mobile_no: String,
    pub dob: String,
    pub age_day: String,
    pub age_month: String,
    pub age_year: String,
    pub sex: String,
    pub visit_type: String,
}

/// Doctor identity stamped on every payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorDefaults {
    pub dr_code: String,
    pub dr_name: String,
}

impl Default for DoctorDefaults {
    fn default() -> Self {
        Self {
            dr_code: "0000".to_string(),
            dr_name: "Unassigned".to_string(),
        }
    }
}

/// Patient-entered fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientFields {
    pub patient_name: String,
    pub mobile_no: String,
    /// `YYYY-MM-DD`
    pub dob: String,
    pub sex: String,
    pub visit_type: String,
}

impl AppointmentPayload {
    /// Build a payload, deriving the age components from `dob` as of `today`.
    pub fn new(
        patient: PatientFields,
        doctor: &DoctorDefaults,
        visit_date: NaiveDate,
        today: NaiveDate,
    ) -> Self {
        let (years, months, days) = compute_full_age(&patient.dob, today);
        Self {
            visit_date: visit_date.to_string(),
            dr_code: doctor.dr_code.clone(),
            dr_name: doctor.dr_name.clone(),
            patient_name: patient.patient_name,
            mobile_no: patient.mobile_no,
            dob: patient.dob,
            age_day: days.to_string(),
            age_month: months.to_string(),
            age_year: years.to_string(),
            sex: patient.sex,
            visit_type: patient.visit_type,
        }
    }

    /// Placeholder used when a deferred job lost its payload.
    pub fn fallback(today: NaiveDate, doctor: &DoctorDefaults) -> Self {
        Self {
            visit_date: today.to_string(),
            dr_code: doctor.dr_code.clone(),
            dr_name: doctor.dr_name.clone(),
            patient_name: "Unknown".to_string(),
            mobile_no: "Unknown".to_string(),
            dob: "1970-01-01".to_string(),
            age_day: "0".to_string(),
            age_month: "0".to_string(),
            age_year: "0".to_string(),
            sex: "Unknown".to_string(),
            visit_type: String::new(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize appointment payload")
    }
}

/// Age as `(years, months, days)` between `dob` and `today`.
///
/// Unparseable or future birth dates yield `(0, 0, 0)`.
pub fn compute_full_age(dob: &str, today: NaiveDate) -> (u32, u32, u32) {
    let Ok(birth) = NaiveDate::parse_from_str(dob.trim(), "%Y-%m-%d") else {
        return (0, 0, 0);
    };
    if birth > today {
        return (0, 0, 0);
    }

    let month_index = |d: NaiveDate| d.year() as i64 * 12 + d.month0() as i64;
    let mut total_months = month_index(today) - month_index(birth);
    let mut days = today.day() as i64 - birth.day() as i64;

    if total_months > 0 && days < 0 {
        total_months -= 1;
        let anchor = birth
            .checked_add_months(Months::new(total_months as u32))
            .unwrap_or(birth);
        days = (today - anchor).num_days();
    }

    let total_months = total_months.max(0) as u32;
    (total_months / 12, total_months % 12, days.max(0) as u32)
}

/// Fields recovered from a logged payload for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadSummary {
    pub patient_name: Option<String>,
    pub visit_date: Option<String>,
    pub mobile_no: Option<String>,
    pub age_years: Option<u32>,
    pub age_months: Option<u32>,
    pub age_days: Option<u32>,
    pub dr_name: Option<String>,
    pub visit_type: Option<String>,
}

impl PayloadSummary {
    /// `None` unless `raw` is a JSON object.
    pub fn parse(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw).ok()?;
        let obj = value.as_object()?;

        let text = |key: &str| -> Option<String> {
            let s = match obj.get(key)? {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            (!s.trim().is_empty()).then_some(s)
        };
        let number = |key: &str| text(key).and_then(|s| s.trim().parse::<u32>().ok());

        Some(Self {
            patient_name: text("PatientName"),
            visit_date: text("VisitDate"),
            mobile_no: text("MobileNo"),
            age_years: number("AgeYear"),
            age_months: number("AgeMonth"),
            age_days: number("AgeDay"),
            dr_name: text("DrName"),
            visit_type: text("VisitType"),
        })
    }

    /// e.g. `"34y 2m 5d"`, or `None` when no component is known.
    pub fn age_label(&self) -> Option<String> {
        if self.age_years.is_none() && self.age_months.is_none() && self.age_days.is_none() {
            return None;
        }
        Some(format!(
            "{}y {}m {}d",
            self.age_years.unwrap_or(0),
            self.age_months.unwrap_or(0),
            self.age_days.unwrap_or(0)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn age_borrows_days_from_previous_month() {
        assert_eq!(compute_full_age("1990-01-31", date("2026-03-01")), (36, 1, 1));
        assert_eq!(compute_full_age("2000-05-10", date("2026-05-10")), (26, 0, 0));
        assert_eq!(compute_full_age("2026-10-01", date("2026-10-19")), (0, 0, 18));
    }

    #[test]
    fn age_degrades_to_zero() {
        let today = date("2026-10-19");
        assert_eq!(compute_full_age("not a date", today), (0, 0, 0));
        assert_eq!(compute_full_age("2030-01-01", today), (0, 0, 0));
    }

    #[test]
    fn payload_uses_wire_field_names() {
        let patient = PatientFields {
            patient_name: "Rahima Khatun".into(),
            mobile_no: "01712345678".into(),
            dob: "1990-01-31".into(),
            sex: "Female".into(),
            visit_type: "New".into(),
        };
        let payload = AppointmentPayload::new(
            patient,
            &DoctorDefaults::default(),
            date("2026-10-20"),
            date("2026-03-01"),
        );
        let json: Value = serde_json::from_str(&payload.to_json().unwrap()).unwrap();
        assert_eq!(json["VisitDate"], "2026-10-20");
        assert_eq!(json["PatientName"], "Rahima Khatun");
        assert_eq!(json["AgeYear"], "36");
        assert_eq!(json["AgeMonth"], "1");
        assert_eq!(json["AgeDay"], "1");
        assert_eq!(json["Dob"], "1990-01-31");
        assert_eq!(json.as_object().unwrap().len(), 11);
    }

    #[test]
    fn fallback_uses_unknown_identity() {
        let payload = AppointmentPayload::fallback(date("2026-10-19"), &DoctorDefaults::default());
        assert_eq!(payload.visit_date, "2026-10-19");
        assert_eq!(payload.patient_name, "Unknown");
        assert_eq!(payload.mobile_no, "Unknown");
        assert_eq!(payload.sex, "Unknown");
        assert_eq!(payload.age_year, "0");
    }

    #[test]
    fn summary_reads_string_and_numeric_fields() {
        let summary = PayloadSummary::parse(
            r#"{"PatientName":"Rahima","AgeYear":"36","AgeMonth":1,"AgeDay":"x","VisitType":" "}"#,
        )
        .unwrap();
        assert_eq!(summary.patient_name.as_deref(), Some("Rahima"));
        assert_eq!(summary.age_years, Some(36));
        assert_eq!(summary.age_months, Some(1));
        assert_eq!(summary.age_days, None);
        assert_eq!(summary.visit_type, None);
        assert_eq!(summary.age_label().as_deref(), Some("36y 1m 0d"));

        assert!(PayloadSummary::parse("not json").is_none());
        assert!(PayloadSummary::parse("[1,2]").is_none());
    }
}
