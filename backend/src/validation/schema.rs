//! JSON Schema check for persisted transaction records.
//!
//! The schema is embedded at compile time from `schemas/transaction.json` and
//! mirrors the constraints of the `transactions` table. The row rules already
//! guarantee these constraints; the store runs this check again right before
//! inserting. The schema is compiled once, on first use.

use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::models::ValidatedRecord;

static TRANSACTION_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/transaction.json"))
        .expect("Invalid embedded schema")
});

static TRANSACTION_VALIDATOR: Lazy<Validator> =
    Lazy::new(|| jsonschema::draft7::new(&TRANSACTION_SCHEMA).expect("Invalid embedded schema"));

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with every violation otherwise
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    collect_errors(&validator, data)
}

fn collect_errors(validator: &Validator, data: &Value) -> Result<(), Vec<String>> {
    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a JSON value against the transaction schema.
pub fn validate_transaction(data: &Value) -> Result<(), Vec<String>> {
    collect_errors(&TRANSACTION_VALIDATOR, data)
}

/// Validate a record as it will be stored.
pub fn validate_record(record: &ValidatedRecord) -> Result<(), Vec<String>> {
    let value = serde_json::to_value(record).map_err(|e| vec![e.to_string()])?;
    validate_transaction(&value)
}
