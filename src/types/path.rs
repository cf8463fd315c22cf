use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::response::{QuestionnaireResponse, QuestionnaireResponseItem};

/// One step in a response-tree address: the item's linkId plus the index
/// disambiguating repeating siblings with the same linkId.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSegment {
    pub link_id: String,
    #[serde(default)]
    pub index: usize,
}

impl PathSegment {
    pub fn new(link_id: impl Into<String>, index: usize) -> Self {
        Self {
            link_id: link_id.into(),
            index,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}^{}", self.link_id, self.index)
    }
}

/// Ordered address of a response item. Only valid until the next structural
/// reconciliation changes sibling ordering or counts.
pub type ItemPath = Vec<PathSegment>;

/// Every response item matching `link_id`, paired with its path. Walks flat
/// children and answer-nested children depth-first, in document order.
pub fn find_items_with_path<'a>(
    link_id: &str,
    response: &'a QuestionnaireResponse,
) -> Vec<(&'a QuestionnaireResponseItem, ItemPath)> {
    let mut found = Vec::new();
    collect_matches(link_id, &response.item, &Vec::new(), &mut found);
    found
}

fn collect_matches<'a>(
    link_id: &str,
    items: &'a [QuestionnaireResponseItem],
    prefix: &ItemPath,
    found: &mut Vec<(&'a QuestionnaireResponseItem, ItemPath)>,
) {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for item in items {
        let counter = seen.entry(item.link_id.as_str()).or_insert(0);
        let index = *counter;
        *counter += 1;

        let mut path = prefix.clone();
        path.push(PathSegment::new(item.link_id.clone(), index));

        if item.link_id == link_id {
            found.push((item, path.clone()));
        }
        collect_matches(link_id, &item.item, &path, found);
        for answer in &item.answer {
            collect_matches(link_id, &answer.item, &path, found);
        }
    }
}

/// Mutable lookup of the item addressed by `path`. Returns `None` when the
/// path no longer resolves (stale after reconciliation).
pub fn item_at_path_mut<'a>(
    path: &[PathSegment],
    response: &'a mut QuestionnaireResponse,
) -> Option<&'a mut QuestionnaireResponseItem> {
    descend_mut(path, &mut response.item)
}

fn descend_mut<'a>(
    path: &[PathSegment],
    items: &'a mut [QuestionnaireResponseItem],
) -> Option<&'a mut QuestionnaireResponseItem> {
    let (segment, rest) = path.split_first()?;
    let position = nth_with_link_id(items, &segment.link_id, segment.index)?;
    let item = &mut items[position];
    let Some(next) = rest.first() else {
        return Some(item);
    };

    // Probe immutably so the mutable descent only ever takes one branch.
    if nth_with_link_id(&item.item, &next.link_id, next.index).is_some() {
        return descend_mut(rest, &mut item.item);
    }
    for answer in &mut item.answer {
        if nth_with_link_id(&answer.item, &next.link_id, next.index).is_some() {
            return descend_mut(rest, &mut answer.item);
        }
    }
    None
}

fn nth_with_link_id(
    items: &[QuestionnaireResponseItem],
    link_id: &str,
    index: usize,
) -> Option<usize> {
    items
        .iter()
        .enumerate()
        .filter(|(_, i)| i.link_id == link_id)
        .map(|(pos, _)| pos)
        .nth(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnswerValue;

    fn response() -> QuestionnaireResponse {
        QuestionnaireResponse::new()
            .with_item(
                QuestionnaireResponseItem::new("group").with_item(
                    QuestionnaireResponseItem::new("field")
                        .with_answer(AnswerValue::Integer(1)),
                ),
            )
            .with_item(
                QuestionnaireResponseItem::new("group").with_item(
                    QuestionnaireResponseItem::new("field")
                        .with_answer(AnswerValue::Integer(2)),
                ),
            )
    }

    #[test]
    fn finds_repeating_items_with_distinct_indices() {
        let response = response();
        let matches = find_items_with_path("field", &response);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].1[0], PathSegment::new("group", 0));
        assert_eq!(matches[1].1[0], PathSegment::new("group", 1));
        assert_eq!(matches[0].1[1].index, 0);
        assert_eq!(matches[1].1[1].index, 0);
    }

    #[test]
    fn path_resolves_back_to_the_same_item() {
        let mut response = response();
        let path = find_items_with_path("field", &response)[1].1.clone();
        let item = item_at_path_mut(&path, &mut response).unwrap();
        assert_eq!(item.answer_values(), vec![AnswerValue::Integer(2)]);
    }

    #[test]
    fn stale_path_resolves_to_none() {
        let mut response = response();
        let path = vec![PathSegment::new("group", 5), PathSegment::new("field", 0)];
        assert!(item_at_path_mut(&path, &mut response).is_none());
    }
}
