use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::models::{ReserveResourcesTask, Variables};

/// The engine serializes dates as `yyyy-MM-dd'T'HH:mm:ss.SSSZ`, e.g. `2025-01-01T09:00:00.000+0000`.
const ENGINE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Validates the variables of a reserve-resources task. The first problem found is
/// reported; malformed input is never retried.
pub fn parse_reserve_task(variables: &Variables) -> Result<ReserveResourcesTask, WorkflowError> {
    Ok(ReserveResourcesTask {
        appointment_id: required_uuid(variables, "appointmentId")?,
        appointment_date_time: required_instant(variables, "appointmentDateTime")?,
        facility_id: optional_uuid(variables, "facilityId")?,
        equipment_id: optional_uuid(variables, "equipmentId")?,
        medicine_id: optional_uuid(variables, "medicineId")?,
    })
}

fn invalid(message: String) -> WorkflowError {
    WorkflowError::InvalidVariables(message)
}

fn present<'a>(variables: &'a Variables, name: &str) -> Option<&'a Value> {
    variables
        .get(name)
        .map(|v| &v.value)
        .filter(|value| !value.is_null())
}

fn required_uuid(variables: &Variables, name: &str) -> Result<Uuid, WorkflowError> {
    let value =
        present(variables, name).ok_or_else(|| invalid(format!("Missing '{}' variable", name)))?;
    let text = value.as_str().ok_or_else(|| {
        invalid(format!("Invalid type for '{}', expected string UUID", name))
    })?;
    Uuid::parse_str(text).map_err(|e| invalid(format!("Invalid format for '{}': {}", name, e)))
}

fn optional_uuid(variables: &Variables, name: &str) -> Result<Option<Uuid>, WorkflowError> {
    let Some(value) = present(variables, name) else {
        return Ok(None);
    };
    let text = value.as_str().ok_or_else(|| {
        invalid(format!("Invalid type for '{}', expected string UUID", name))
    })?;
    if text.is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(text)
        .map(Some)
        .map_err(|e| invalid(format!("Invalid format for '{}': {}", name, e)))
}

fn required_instant(variables: &Variables, name: &str) -> Result<DateTime<Utc>, WorkflowError> {
    let value =
        present(variables, name).ok_or_else(|| invalid(format!("Missing '{}' variable", name)))?;
    let text = value
        .as_str()
        .ok_or_else(|| invalid(format!("Invalid type for '{}', expected string", name)))?;
    parse_instant(text)
        .map_err(|e| invalid(format!("Failed to parse '{}' string: {}", name, e)))
}

pub fn parse_instant(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_str(text, ENGINE_DATE_FORMAT))
        .map(|instant| instant.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VariableValue;

    fn variables(pairs: &[(&str, Value)]) -> Variables {
        pairs
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    VariableValue {
                        value: value.clone(),
                        value_type: None,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn engine_and_rfc3339_dates_agree() {
        let engine = parse_instant("2025-01-01T10:00:00.000+0100").unwrap();
        let rfc = parse_instant("2025-01-01T09:00:00Z").unwrap();
        assert_eq!(engine, rfc);
    }

    #[test]
    fn missing_appointment_id_is_reported_by_name() {
        let err = parse_reserve_task(&variables(&[(
            "appointmentDateTime",
            Value::String("2025-01-01T09:00:00Z".into()),
        )]))
        .unwrap_err();
        assert_eq!(err.to_string(), "Missing 'appointmentId' variable");
    }

    #[test]
    fn non_string_id_is_a_type_error() {
        let err = parse_reserve_task(&variables(&[
            ("appointmentId", Value::from(42)),
            ("appointmentDateTime", Value::String("2025-01-01T09:00:00Z".into())),
        ]))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid type for 'appointmentId', expected string UUID"
        );
    }

    #[test]
    fn empty_optional_ids_are_absent() {
        let id = Uuid::new_v4();
        let task = parse_reserve_task(&variables(&[
            ("appointmentId", Value::String(id.to_string())),
            ("appointmentDateTime", Value::String("2025-01-01T09:00:00Z".into())),
            ("facilityId", Value::String(String::new())),
            ("medicineId", Value::Null),
        ]))
        .unwrap();
        assert_eq!(task.appointment_id, id);
        assert!(task.facility_id.is_none());
        assert!(task.medicine_id.is_none());
    }

    #[test]
    fn malformed_optional_id_fails() {
        let err = parse_reserve_task(&variables(&[
            ("appointmentId", Value::String(Uuid::new_v4().to_string())),
            ("appointmentDateTime", Value::String("2025-01-01T09:00:00Z".into())),
            ("equipmentId", Value::String("mri".into())),
        ]))
        .unwrap_err();
        assert!(err.to_string().starts_with("Invalid format for 'equipmentId'"));
    }
}
