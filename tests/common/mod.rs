use refero_core::*;

#[allow(dead_code)]
pub fn create_test_questionnaire() -> Questionnaire {
    Questionnaire::new()
        .with_item(QuestionnaireItem::new("input", ItemType::Integer).with_text("Input"))
        .with_item(
            QuestionnaireItem::new("calculated", ItemType::Integer)
                .with_text("Calculated")
                .with_calculated_expression(
                    "QuestionnaireResponse.descendants().where(linkId='input').answer.value",
                ),
        )
}

#[allow(dead_code)]
pub fn create_test_response() -> QuestionnaireResponse {
    QuestionnaireResponse::new()
        .with_item(QuestionnaireResponseItem::new("input").with_answer(AnswerValue::Integer(42)))
        .with_item(QuestionnaireResponseItem::new("calculated"))
}

/// Two integer inputs feeding a sum, and an average depending on the sum.
#[allow(dead_code)]
pub fn create_scoring_questionnaire() -> Questionnaire {
    Questionnaire::new()
        .with_item(QuestionnaireItem::new("input1", ItemType::Integer))
        .with_item(QuestionnaireItem::new("input2", ItemType::Integer))
        .with_item(
            QuestionnaireItem::new("sum", ItemType::Integer).with_calculated_expression(
                "QuestionnaireResponse.descendants().where(linkId='input1').answer.value.first() \
                 + QuestionnaireResponse.descendants().where(linkId='input2').answer.value.first()",
            ),
        )
        .with_item(
            QuestionnaireItem::new("average", ItemType::Decimal).with_calculated_expression(
                "QuestionnaireResponse.descendants().where(linkId='sum').answer.value.first() / 2",
            ),
        )
}

#[allow(dead_code)]
pub fn create_scoring_response(input1: i64, input2: i64) -> QuestionnaireResponse {
    QuestionnaireResponse::new()
        .with_item(
            QuestionnaireResponseItem::new("input1").with_answer(AnswerValue::Integer(input1)),
        )
        .with_item(
            QuestionnaireResponseItem::new("input2").with_answer(AnswerValue::Integer(input2)),
        )
        .with_item(QuestionnaireResponseItem::new("sum"))
        .with_item(QuestionnaireResponseItem::new("average"))
}
