//! Payload arguments shared by `send` and `schedule`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Args;

use courier_core::{AppointmentPayload, DoctorDefaults, PatientFields};

#[derive(Args, Debug, Default, Clone)]
pub struct PayloadArgs {
    /// JSON file holding a complete payload; sent as-is
    #[arg(long, value_name = "FILE", conflicts_with = "patient_name")]
    pub payload_file: Option<PathBuf>,

    #[arg(long)]
    pub patient_name: Option<String>,

    #[arg(long)]
    pub mobile: Option<String>,

    /// Date of birth, YYYY-MM-DD
    #[arg(long, value_name = "DATE")]
    pub dob: Option<String>,

    #[arg(long)]
    pub sex: Option<String>,

    #[arg(long)]
    pub visit_type: Option<String>,

    /// Visit date, YYYY-MM-DD; defaults to the submission day
    #[arg(long, value_name = "DATE")]
    pub visit_date: Option<NaiveDate>,

    #[arg(long)]
    pub dr_code: Option<String>,

    #[arg(long)]
    pub dr_name: Option<String>,
}

impl PayloadArgs {
    /// Produce the JSON body to submit.
    pub async fn resolve(
        &self,
        defaults: &DoctorDefaults,
        default_visit: NaiveDate,
        today: NaiveDate,
    ) -> Result<String> {
        if let Some(path) = &self.payload_file {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read payload file: {}", path.display()))?;
            serde_json::from_str::<serde_json::Value>(&raw)
                .with_context(|| format!("Payload file is not valid JSON: {}", path.display()))?;
            return Ok(raw.trim().to_string());
        }

        let Some(patient_name) = self.patient_name.clone().filter(|n| !n.trim().is_empty()) else {
            bail!("Either --payload-file or --patient-name is required");
        };

        let doctor = DoctorDefaults {
            dr_code: self.dr_code.clone().unwrap_or_else(|| defaults.dr_code.clone()),
            dr_name: self.dr_name.clone().unwrap_or_else(|| defaults.dr_name.clone()),
        };
        let patient = PatientFields {
            patient_name,
            mobile_no: self.mobile.clone().unwrap_or_default(),
            dob: self.dob.clone().unwrap_or_default(),
            sex: self.sex.clone().unwrap_or_default(),
            visit_type: self.visit_type.clone().unwrap_or_default(),
        };
        let visit = self.visit_date.unwrap_or(default_visit);

        AppointmentPayload::new(patient, &doctor, visit, today).to_json()
    }
}
