use tracing::debug;

use crate::types::{
    ItemType, Questionnaire, QuestionnaireItem, QuestionnaireResponse,
    QuestionnaireResponseAnswer, QuestionnaireResponseItem,
};

/// Produces a response that structurally matches the questionnaire definition:
/// missing items are synthesized (seeded from `initial`), items whose linkId
/// has no definition counterpart are pruned, and items whose implied type no
/// longer agrees with the definition are rebuilt from scratch. Existing
/// answers are preserved verbatim wherever the structure still agrees.
///
/// Pure and idempotent: reconciling an already-conformant response returns a
/// deep-equal copy. An empty definition makes this a no-op.
pub fn sync_questionnaire_response(
    questionnaire: &Questionnaire,
    response: &QuestionnaireResponse,
) -> QuestionnaireResponse {
    if questionnaire.item.is_empty() {
        return response.clone();
    }
    debug!(
        questionnaire = questionnaire.id.as_deref().unwrap_or("<unknown>"),
        "reconciling response against definition"
    );

    let mut reconciled = response.clone();
    reconciled.item = reconcile_level(&questionnaire.item, &response.item);
    reconciled
}

/// Definition-driven walk over one sibling level. Anything the definition
/// does not name is dropped here, which is where superfluous-item pruning
/// happens.
fn reconcile_level(
    definitions: &[QuestionnaireItem],
    existing: &[QuestionnaireResponseItem],
) -> Vec<QuestionnaireResponseItem> {
    let mut result = Vec::new();

    for definition in definitions {
        // Display items carry no data and are never materialized in the response.
        if definition.item_type == ItemType::Display {
            continue;
        }

        let matches: Vec<&QuestionnaireResponseItem> = existing
            .iter()
            .filter(|item| item.link_id == definition.link_id)
            .collect();

        if matches.is_empty() {
            result.push(build_new_item(definition));
            continue;
        }

        // Repeating items keep every instance that still validates; nothing
        // is collapsed. A type mismatch rebuilds that instance as if absent.
        for item in matches {
            if implied_type_matches(definition, item) {
                result.push(reconcile_item(definition, item));
            } else {
                debug!(
                    link_id = %definition.link_id,
                    expected = %definition.item_type,
                    "type changed underneath response item, rebuilding"
                );
                result.push(build_new_item(definition));
            }
        }
    }

    result
}

fn reconcile_item(
    definition: &QuestionnaireItem,
    existing: &QuestionnaireResponseItem,
) -> QuestionnaireResponseItem {
    let answer = if definition.item_type.is_answerable() {
        existing
            .answer
            .iter()
            .map(|answer| QuestionnaireResponseAnswer {
                value: answer.value.clone(),
                // Answer-nested items belong to the same definition item's
                // children, not to a sibling definition.
                item: reconcile_level(&definition.item, &answer.item),
            })
            .collect()
    } else {
        Vec::new()
    };

    QuestionnaireResponseItem {
        link_id: existing.link_id.clone(),
        text: existing.text.clone(),
        answer,
        item: reconcile_level(&definition.item, &existing.item),
    }
}

fn build_new_item(definition: &QuestionnaireItem) -> QuestionnaireResponseItem {
    let answer = if definition.item_type.is_answerable() {
        definition
            .initial
            .iter()
            .map(|initial| QuestionnaireResponseAnswer::new(initial.value.clone()))
            .collect()
    } else {
        Vec::new()
    };

    QuestionnaireResponseItem {
        link_id: definition.link_id.clone(),
        text: definition.text.clone(),
        answer,
        item: reconcile_level(&definition.item, &[]),
    }
}

/// Whether the existing item could have been produced by this definition.
/// Groups must not carry answer values; answerable items must only hold
/// values of the definition's type.
fn implied_type_matches(
    definition: &QuestionnaireItem,
    existing: &QuestionnaireResponseItem,
) -> bool {
    let values = existing.answer.iter().filter_map(|a| a.value.as_ref());
    if definition.item_type.is_answerable() {
        values
            .into_iter()
            .all(|value| value.matches_type(definition.item_type))
    } else {
        existing.answer.iter().all(|a| a.value.is_none())
    }
}
