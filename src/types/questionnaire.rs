use serde::{Deserialize, Serialize};
use std::fmt;

use super::response::AnswerValue;

/// Calculated-expression extension carried by `ehelse`-profiled questionnaires.
pub const CALCULATED_EXPRESSION_URL: &str =
    "http://ehelse.no/fhir/StructureDefinition/sdf-calculatedExpression";

/// SDC calculated-expression extension; treated the same as the profile-local one.
pub const SDC_CALCULATED_EXPRESSION_URL: &str =
    "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-calculatedExpression";

/// Ordinal weight attached to a Coding, consumed by score aggregation.
pub const ORDINAL_VALUE_URL: &str = "http://hl7.org/fhir/StructureDefinition/ordinalValue";

/// Unit coding for quantity-typed calculated items.
pub const QUESTIONNAIRE_UNIT_URL: &str =
    "http://hl7.org/fhir/StructureDefinition/questionnaire-unit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemType {
    Group,
    Display,
    Boolean,
    Decimal,
    Integer,
    Date,
    DateTime,
    Time,
    String,
    Text,
    Url,
    Choice,
    #[serde(rename = "open-choice")]
    OpenChoice,
    Attachment,
    Reference,
    Quantity,
}

impl ItemType {
    /// Groups and display items never carry answers of their own.
    pub fn is_answerable(&self) -> bool {
        !matches!(self, ItemType::Group | ItemType::Display)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ItemType::Group => "group",
            ItemType::Display => "display",
            ItemType::Boolean => "boolean",
            ItemType::Decimal => "decimal",
            ItemType::Integer => "integer",
            ItemType::Date => "date",
            ItemType::DateTime => "dateTime",
            ItemType::Time => "time",
            ItemType::String => "string",
            ItemType::Text => "text",
            ItemType::Url => "url",
            ItemType::Choice => "choice",
            ItemType::OpenChoice => "open-choice",
            ItemType::Attachment => "attachment",
            ItemType::Reference => "reference",
            ItemType::Quantity => "quantity",
        };
        f.write_str(code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_expression: Option<ExpressionDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_decimal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_coding: Option<super::response::Coding>,
}

impl Extension {
    pub fn expression(url: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            value_expression: Some(ExpressionDef {
                language: Some("text/fhirpath".to_string()),
                expression: expression.into(),
                name: None,
            }),
            value_string: None,
            value_decimal: None,
            value_coding: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireItemInitial {
    #[serde(flatten)]
    pub value: AnswerValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireItem {
    pub link_id: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeats: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub initial: Vec<QuestionnaireItemInitial>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item: Vec<QuestionnaireItem>,
}

impl QuestionnaireItem {
    pub fn new(link_id: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            link_id: link_id.into(),
            item_type,
            text: None,
            required: None,
            repeats: None,
            read_only: None,
            initial: Vec::new(),
            extension: Vec::new(),
            item: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_repeats(mut self, repeats: bool) -> Self {
        self.repeats = Some(repeats);
        self
    }

    pub fn with_initial(mut self, value: AnswerValue) -> Self {
        self.initial.push(QuestionnaireItemInitial { value });
        self
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extension.push(extension);
        self
    }

    pub fn with_item(mut self, item: QuestionnaireItem) -> Self {
        self.item.push(item);
        self
    }

    pub fn with_calculated_expression(self, expression: impl Into<String>) -> Self {
        self.with_extension(Extension::expression(CALCULATED_EXPRESSION_URL, expression))
    }

    pub fn repeats(&self) -> bool {
        self.repeats.unwrap_or(false)
    }

    /// The calculated (or score) expression attached to this item, if any.
    pub fn calculated_expression(&self) -> Option<&str> {
        self.extension
            .iter()
            .find(|e| {
                e.url == CALCULATED_EXPRESSION_URL || e.url == SDC_CALCULATED_EXPRESSION_URL
            })
            .and_then(|e| e.value_expression.as_ref())
            .map(|e| e.expression.as_str())
    }

    /// Unit coding for quantity-typed calculated items.
    pub fn unit_coding(&self) -> Option<&super::response::Coding> {
        self.extension
            .iter()
            .find(|e| e.url == QUESTIONNAIRE_UNIT_URL)
            .and_then(|e| e.value_coding.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Questionnaire {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item: Vec<QuestionnaireItem>,
}

impl Questionnaire {
    pub fn new() -> Self {
        Self {
            id: None,
            url: None,
            name: None,
            title: None,
            status: Some("active".to_string()),
            item: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: QuestionnaireItem) -> Self {
        self.item.push(item);
        self
    }

    /// Depth-first lookup of a definition item by linkId.
    pub fn find_item(&self, link_id: &str) -> Option<&QuestionnaireItem> {
        fn walk<'a>(items: &'a [QuestionnaireItem], link_id: &str) -> Option<&'a QuestionnaireItem> {
            for item in items {
                if item.link_id == link_id {
                    return Some(item);
                }
                if let Some(found) = walk(&item.item, link_id) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.item, link_id)
    }
}

impl Default for Questionnaire {
    fn default() -> Self {
        Self::new()
    }
}
