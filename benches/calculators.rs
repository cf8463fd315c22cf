use criterion::{criterion_group, criterion_main, Criterion};
use refero_core::*;
use std::hint::black_box;

fn create_large_questionnaire() -> Questionnaire {
    let mut questionnaire = Questionnaire::new();

    let mut section = QuestionnaireItem::new("section", ItemType::Group);
    for i in 0..50 {
        section = section.with_item(QuestionnaireItem::new(
            format!("input{i}"),
            ItemType::Integer,
        ));
    }
    questionnaire = questionnaire.with_item(section);

    for i in 0..10 {
        questionnaire = questionnaire.with_item(
            QuestionnaireItem::new(format!("score{i}"), ItemType::Integer)
                .with_calculated_expression(format!(
                    "QuestionnaireResponse.descendants().where(linkId='input{i}').answer.value.first() \
                     + QuestionnaireResponse.descendants().where(linkId='input{}').answer.value.first()",
                    i + 10
                )),
        );
    }

    questionnaire
}

fn create_filled_response(questionnaire: &Questionnaire) -> QuestionnaireResponse {
    let skeleton = sync_questionnaire_response(questionnaire, &QuestionnaireResponse::new());
    let mut response = skeleton;
    for (i, item) in response.item[0].item.iter_mut().enumerate() {
        item.answer = vec![QuestionnaireResponseAnswer::new(AnswerValue::Integer(
            i as i64,
        ))];
    }
    response
}

fn bench_reconcile(c: &mut Criterion) {
    let questionnaire = create_large_questionnaire();
    let response = create_filled_response(&questionnaire);

    c.bench_function("reconcile", |b| {
        b.iter(|| black_box(sync_questionnaire_response(&questionnaire, &response)))
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let questionnaire = create_large_questionnaire();
    let response = create_filled_response(&questionnaire);
    let extensions = FhirPathExtensions::new();

    c.bench_function("evaluate_calculators", |b| {
        b.iter(|| {
            black_box(
                extensions
                    .evaluate_all_expressions(&questionnaire, &response)
                    .unwrap(),
            )
        })
    });
}

criterion_group!(benches, bench_reconcile, bench_evaluate);
criterion_main!(benches);
