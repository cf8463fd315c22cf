use tracing::{debug, error};

use crate::error::{ReferoError, Result};
use crate::types::{
    find_items_with_path, AnswerPad, AnswerValue, Coding, ItemType, Quantity, Questionnaire,
    QuestionnaireItem, QuestionnaireResponse, QuestionnaireResponseAnswer,
};

use super::eval::{evaluate, EvalContext, FpValue};

/// Applies calculated and score expressions to a response.
///
/// Expressions run depth-first in definition order, single pass: an
/// expression sees the results of expressions applied earlier in the same
/// pass, never later ones. The first failing expression aborts the whole
/// call; retry and fallback live in the dispatcher above this layer.
#[derive(Debug, Default)]
pub struct FhirPathExtensions;

impl FhirPathExtensions {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate every calculated expression and return the response with the
    /// computed answers applied.
    pub fn evaluate_all_expressions(
        &self,
        questionnaire: &Questionnaire,
        response: &QuestionnaireResponse,
    ) -> Result<QuestionnaireResponse> {
        let mut updated = response.clone();
        let items = calculated_items(questionnaire);
        debug!(expressions = items.len(), "evaluating calculated expressions");

        for item in items {
            let expression = item
                .calculated_expression()
                .unwrap_or_default();
            let values = self.evaluate_expression(expression, &updated)?;
            let answers = convert_to_answers(item, &values)?;
            apply_answers(item, &answers, &mut updated);
        }

        Ok(updated)
    }

    /// Collect the computed values per linkId from an already-updated
    /// response. Only items carrying an expression contribute.
    pub fn calculate_fhir_scores(
        &self,
        questionnaire: &Questionnaire,
        updated: &QuestionnaireResponse,
    ) -> Result<AnswerPad> {
        let mut pad = AnswerPad::new();
        for item in calculated_items(questionnaire) {
            let matches = find_items_with_path(&item.link_id, updated);
            let values = matches
                .first()
                .map(|(found, _)| found.answer_values())
                .unwrap_or_default();
            pad.insert(item.link_id.clone(), values);
        }
        Ok(pad)
    }

    fn evaluate_expression(
        &self,
        expression: &str,
        response: &QuestionnaireResponse,
    ) -> Result<Vec<FpValue>> {
        let compiled = super::compile(expression)?;
        let root = serde_json::to_value(response)?;
        let ctx = EvalContext::new(root);
        let focus = ctx.root_collection();
        evaluate(&compiled, &focus, &ctx).inspect_err(|e| {
            error!(expression, error = %e, "calculated expression failed");
        })
    }
}

/// Definition items with a calculated expression, depth-first in definition
/// order. This traversal order is the single-pass propagation order.
fn calculated_items(questionnaire: &Questionnaire) -> Vec<&QuestionnaireItem> {
    fn walk<'a>(items: &'a [QuestionnaireItem], out: &mut Vec<&'a QuestionnaireItem>) {
        for item in items {
            if item.calculated_expression().is_some() {
                out.push(item);
            }
            walk(&item.item, out);
        }
    }
    let mut out = Vec::new();
    walk(&questionnaire.item, &mut out);
    out
}

fn convert_to_answers(
    item: &QuestionnaireItem,
    values: &[FpValue],
) -> Result<Vec<AnswerValue>> {
    values
        .iter()
        .map(|value| convert_value(item, value))
        .collect()
}

fn convert_value(item: &QuestionnaireItem, value: &FpValue) -> Result<AnswerValue> {
    let type_error = || {
        ReferoError::evaluation(format!(
            "expression for '{}' produced a value incompatible with type {}",
            item.link_id, item.item_type
        ))
    };

    match item.item_type {
        ItemType::Integer => {
            let number = value.as_number().ok_or_else(type_error)?;
            Ok(AnswerValue::Integer(number.round() as i64))
        }
        ItemType::Decimal => {
            let number = value.as_number().ok_or_else(type_error)?;
            Ok(AnswerValue::Decimal(number))
        }
        ItemType::Quantity => {
            let number = value.as_number().ok_or_else(type_error)?;
            let unit = item.unit_coding();
            Ok(AnswerValue::Quantity(Quantity {
                value: Some(number),
                unit: unit.and_then(|u| u.display.clone()),
                system: unit.and_then(|u| u.system.clone()),
                code: unit.and_then(|u| u.code.clone()),
            }))
        }
        ItemType::Boolean => match value {
            FpValue::Boolean(b) => Ok(AnswerValue::Boolean(*b)),
            _ => Err(type_error()),
        },
        ItemType::String | ItemType::Text => match value {
            FpValue::String(s) => Ok(AnswerValue::String(s.clone())),
            FpValue::Integer(i) => Ok(AnswerValue::String(i.to_string())),
            FpValue::Decimal(d) => Ok(AnswerValue::String(d.to_string())),
            _ => Err(type_error()),
        },
        ItemType::Choice | ItemType::OpenChoice => match value {
            FpValue::Object(object) => {
                let coding: Coding =
                    serde_json::from_value(object.clone()).map_err(|_| type_error())?;
                Ok(AnswerValue::Coding(coding))
            }
            FpValue::String(s) => Ok(AnswerValue::String(s.clone())),
            _ => Err(type_error()),
        },
        _ => Err(type_error()),
    }
}

/// Write the computed answers onto every response item matching the
/// definition item's linkId.
fn apply_answers(
    item: &QuestionnaireItem,
    answers: &[AnswerValue],
    response: &mut QuestionnaireResponse,
) {
    let paths: Vec<_> = find_items_with_path(&item.link_id, response)
        .into_iter()
        .map(|(_, path)| path)
        .collect();

    for path in paths {
        if let Some(target) = crate::types::item_at_path_mut(&path, response) {
            target.answer = answers
                .iter()
                .map(|value| QuestionnaireResponseAnswer::new(value.clone()))
                .collect();
        }
    }
}
