use serde::{Deserialize, Serialize};

use super::questionnaire::{ItemType, ORDINAL_VALUE_URL};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<super::questionnaire::Extension>,
}

impl Coding {
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: Some(code.into()),
            display: None,
            extension: Vec::new(),
        }
    }

    /// Ordinal weight carried by the `ordinalValue` extension, if any.
    pub fn ordinal_value(&self) -> Option<f64> {
        self.extension
            .iter()
            .find(|e| e.url == ORDINAL_VALUE_URL)
            .and_then(|e| e.value_decimal)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quantity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// One FHIR answer choice value, externally tagged so it serializes to the
/// standard `{"valueInteger": 42}` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnswerValue {
    #[serde(rename = "valueBoolean")]
    Boolean(bool),
    #[serde(rename = "valueDecimal")]
    Decimal(f64),
    #[serde(rename = "valueInteger")]
    Integer(i64),
    #[serde(rename = "valueDate")]
    Date(String),
    #[serde(rename = "valueDateTime")]
    DateTime(String),
    #[serde(rename = "valueTime")]
    Time(String),
    #[serde(rename = "valueString")]
    String(String),
    #[serde(rename = "valueUri")]
    Uri(String),
    #[serde(rename = "valueCoding")]
    Coding(Coding),
    #[serde(rename = "valueQuantity")]
    Quantity(Quantity),
    #[serde(rename = "valueAttachment")]
    Attachment(Attachment),
    #[serde(rename = "valueReference")]
    Reference(Reference),
}

impl AnswerValue {
    /// Whether this value is an acceptable answer for the given definition type.
    /// Used to detect stale response items when the definition changed underneath.
    pub fn matches_type(&self, item_type: ItemType) -> bool {
        match (self, item_type) {
            (AnswerValue::Boolean(_), ItemType::Boolean) => true,
            (AnswerValue::Decimal(_), ItemType::Decimal) => true,
            (AnswerValue::Integer(_), ItemType::Integer) => true,
            (AnswerValue::Date(_), ItemType::Date) => true,
            (AnswerValue::DateTime(_), ItemType::DateTime) => true,
            (AnswerValue::Time(_), ItemType::Time) => true,
            (AnswerValue::String(_), ItemType::String | ItemType::Text) => true,
            (AnswerValue::Uri(_), ItemType::Url) => true,
            (AnswerValue::Coding(_), ItemType::Choice | ItemType::OpenChoice) => true,
            (AnswerValue::String(_), ItemType::OpenChoice) => true,
            (AnswerValue::Quantity(_), ItemType::Quantity) => true,
            (AnswerValue::Attachment(_), ItemType::Attachment) => true,
            (AnswerValue::Reference(_), ItemType::Reference) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireResponseAnswer {
    #[serde(flatten)]
    pub value: Option<AnswerValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item: Vec<QuestionnaireResponseItem>,
}

impl QuestionnaireResponseAnswer {
    pub fn new(value: AnswerValue) -> Self {
        Self {
            value: Some(value),
            item: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireResponseItem {
    pub link_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answer: Vec<QuestionnaireResponseAnswer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item: Vec<QuestionnaireResponseItem>,
}

impl QuestionnaireResponseItem {
    pub fn new(link_id: impl Into<String>) -> Self {
        Self {
            link_id: link_id.into(),
            text: None,
            answer: Vec::new(),
            item: Vec::new(),
        }
    }

    pub fn with_answer(mut self, value: AnswerValue) -> Self {
        self.answer.push(QuestionnaireResponseAnswer::new(value));
        self
    }

    pub fn with_item(mut self, item: QuestionnaireResponseItem) -> Self {
        self.item.push(item);
        self
    }

    /// The answer values currently held by this item, ignoring nested items.
    pub fn answer_values(&self) -> Vec<AnswerValue> {
        self.answer.iter().filter_map(|a| a.value.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questionnaire: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authored: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item: Vec<QuestionnaireResponseItem>,
}

impl QuestionnaireResponse {
    pub fn new() -> Self {
        Self {
            id: None,
            questionnaire: None,
            status: Some("in-progress".to_string()),
            authored: None,
            item: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: QuestionnaireResponseItem) -> Self {
        self.item.push(item);
        self
    }
}

impl Default for QuestionnaireResponse {
    fn default() -> Self {
        Self::new()
    }
}
