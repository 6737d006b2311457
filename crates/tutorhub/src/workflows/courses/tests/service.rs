use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::common::*;
use crate::notifications::NotificationKind;
use crate::workflows::courses::{
    Article, ArticleUpdate, ContentType, Course, CourseRepository, CourseService, CourseStatus,
    CourseUpdate, Section, SectionUpdate,
};
use crate::workflows::WorkflowError;

#[test]
fn create_requires_an_accepted_tutor() {
    let harness = build_service();
    match harness.service.create(new_course(None), &user("student-1")) {
        Err(WorkflowError::Forbidden(message)) => assert!(message.contains("student-1")),
        other => panic!("expected forbidden, got {other:?}"),
    }
}

#[test]
fn create_defaults_price_and_starts_in_draft() {
    let harness = build_service();
    let course = harness
        .service
        .create(new_course(None), &user(TUTOR))
        .expect("created");

    assert_eq!(course.status, CourseStatus::Draft);
    assert_eq!(course.price, Decimal::ZERO);
    assert_eq!(course.tutor_id, user(TUTOR));
    assert!(course.review_feedback.is_none());
}

#[test]
fn create_rejects_negative_price_and_blank_title() {
    let harness = build_service();
    assert!(matches!(
        harness.service.create(new_course(Some(dec!(-1.00))), &user(TUTOR)),
        Err(WorkflowError::BadRequest(_))
    ));

    let mut untitled = new_course(Some(dec!(10)));
    untitled.title = "   ".to_string();
    assert!(matches!(
        harness.service.create(untitled, &user(TUTOR)),
        Err(WorkflowError::BadRequest(_))
    ));
}

#[test]
fn update_applies_only_present_fields() {
    let harness = build_service();
    let course = harness
        .service
        .create(new_course(Some(dec!(25.00))), &user(TUTOR))
        .expect("created");

    let updated = harness
        .service
        .update(
            &course.id,
            CourseUpdate {
                price: Some(dec!(30.50)),
                ..CourseUpdate::default()
            },
            &user(TUTOR),
        )
        .expect("updated");

    assert_eq!(updated.price, dec!(30.50));
    assert_eq!(updated.title, course.title);
    assert_eq!(updated.tutor_id, course.tutor_id);
    assert!(updated.updated_at >= course.updated_at);
}

#[test]
fn ownership_is_enforced_through_every_entity() {
    let harness = build_service();
    let (course, section, article) = complete_draft(&harness);
    let intruder = user(OTHER_TUTOR);

    let attempts = [
        harness
            .service
            .update(&course.id, CourseUpdate::default(), &intruder)
            .map(|_| ()),
        harness.service.delete(&course.id, &intruder),
        harness
            .service
            .add_section(&course.id, new_section("Hijack"), &intruder)
            .map(|_| ()),
        harness
            .service
            .update_section(&section.id, SectionUpdate::default(), &intruder)
            .map(|_| ()),
        harness.service.delete_section(&section.id, &intruder),
        harness
            .service
            .add_article(&section.id, new_article("Hijack"), &intruder)
            .map(|_| ()),
        harness
            .service
            .update_article(&article.id, ArticleUpdate::default(), &intruder)
            .map(|_| ()),
        harness.service.delete_article(&article.id, &intruder),
        harness
            .service
            .submit_for_review(&course.id, &intruder)
            .map(|_| ()),
    ];

    for attempt in attempts {
        assert!(
            matches!(attempt, Err(WorkflowError::Forbidden(_))),
            "expected forbidden, got {attempt:?}"
        );
    }
}

#[test]
fn submit_without_sections_is_rejected() {
    let harness = build_service();
    let course = harness
        .service
        .create(new_course(None), &user(TUTOR))
        .expect("created");

    match harness.service.submit_for_review(&course.id, &user(TUTOR)) {
        Err(WorkflowError::BadRequest(message)) => assert!(message.contains("section")),
        other => panic!("expected bad request, got {other:?}"),
    }
}

#[test]
fn submit_with_an_empty_section_names_section_and_article() {
    let harness = build_service();
    let tutor = user(TUTOR);
    let course = harness
        .service
        .create(new_course(None), &tutor)
        .expect("created");
    harness
        .service
        .add_section(&course.id, new_section("Empty"), &tutor)
        .expect("section");

    match harness.service.submit_for_review(&course.id, &tutor) {
        Err(WorkflowError::BadRequest(message)) => {
            assert!(message.contains("section"));
            assert!(message.contains("article"));
        }
        other => panic!("expected bad request, got {other:?}"),
    }
    let stored = harness.service.get(&course.id).expect("tree");
    assert_eq!(stored.course.status, CourseStatus::Draft);
}

#[test]
fn pending_review_locks_course_content() {
    let harness = build_service();
    let tutor = user(TUTOR);
    let (course, section, article) = complete_draft(&harness);
    harness
        .service
        .submit_for_review(&course.id, &tutor)
        .expect("submitted");

    let attempts = [
        harness
            .service
            .update(&course.id, CourseUpdate::default(), &tutor)
            .map(|_| ()),
        harness
            .service
            .add_section(&course.id, new_section("Late addition"), &tutor)
            .map(|_| ()),
        harness
            .service
            .update_section(&section.id, SectionUpdate::default(), &tutor)
            .map(|_| ()),
        harness.service.delete_section(&section.id, &tutor),
        harness
            .service
            .add_article(&section.id, new_article("Late"), &tutor)
            .map(|_| ()),
        harness
            .service
            .update_article(
                &article.id,
                ArticleUpdate {
                    content_type: Some(ContentType::Video),
                    ..ArticleUpdate::default()
                },
                &tutor,
            )
            .map(|_| ()),
        harness.service.delete_article(&article.id, &tutor),
    ];
    for attempt in attempts {
        assert!(
            matches!(attempt, Err(WorkflowError::Forbidden(_))),
            "expected locked course, got {attempt:?}"
        );
    }

    assert!(matches!(
        harness.service.submit_for_review(&course.id, &tutor),
        Err(WorkflowError::BadRequest(_))
    ));
}

#[test]
fn publication_scenario_notifies_the_tutor() {
    let mut harness = build_service();
    let tutor = user(TUTOR);
    let (course, _, _) = complete_draft(&harness);
    assert_eq!(course.price, Decimal::ZERO);

    let submitted = harness
        .service
        .submit_for_review(&course.id, &tutor)
        .expect("submitted");
    assert_eq!(submitted.status, CourseStatus::PendingReview);
    assert_eq!(harness.service.list_pending_review().expect("queue").len(), 1);

    let published = harness
        .service
        .review_by_staff(&course.id, CourseStatus::Published, "", &user(STAFF))
        .expect("published");
    assert_eq!(published.status, CourseStatus::Published);
    assert!(published.review_feedback.is_none());

    let listed = harness.service.list_published().expect("catalog");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, course.id);

    assert_eq!(harness.worker.drain(), 1);
    let events = harness.sink.events();
    assert_eq!(events[0].kind, NotificationKind::CoursePublished);
    assert_eq!(events[0].recipient, tutor);
}

#[test]
fn rejected_course_can_be_edited_and_resubmitted() {
    let harness = build_service();
    let tutor = user(TUTOR);
    let (course, _, _) = complete_draft(&harness);
    harness
        .service
        .submit_for_review(&course.id, &tutor)
        .expect("submitted");

    let rejected = harness
        .service
        .review_by_staff(&course.id, CourseStatus::Rejected, "add exercises", &user(STAFF))
        .expect("rejected");
    assert_eq!(rejected.review_feedback.as_deref(), Some("add exercises"));

    harness
        .service
        .update(
            &course.id,
            CourseUpdate {
                description: Some("Now with exercises".to_string()),
                ..CourseUpdate::default()
            },
            &tutor,
        )
        .expect("editable again");
    let resubmitted = harness
        .service
        .submit_for_review(&course.id, &tutor)
        .expect("resubmitted");
    assert_eq!(resubmitted.status, CourseStatus::PendingReview);
}

#[test]
fn review_rejects_non_terminal_targets() {
    let harness = build_service();
    let (course, _, _) = complete_draft(&harness);
    harness
        .service
        .submit_for_review(&course.id, &user(TUTOR))
        .expect("submitted");

    for target in [CourseStatus::Draft, CourseStatus::PendingReview] {
        assert!(matches!(
            harness
                .service
                .review_by_staff(&course.id, target, "", &user(STAFF)),
            Err(WorkflowError::IllegalArgument(_))
        ));
    }
}

#[test]
fn review_requires_pending_review() {
    let harness = build_service();
    let (course, _, _) = complete_draft(&harness);

    assert!(matches!(
        harness
            .service
            .review_by_staff(&course.id, CourseStatus::Published, "", &user(STAFF)),
        Err(WorkflowError::BadRequest(_))
    ));

    let missing = crate::workflows::courses::CourseId("course-999999".to_string());
    assert!(matches!(
        harness
            .service
            .review_by_staff(&missing, CourseStatus::Published, "", &user(STAFF)),
        Err(WorkflowError::NotFound(_))
    ));
}

#[test]
fn content_is_kept_in_insertion_order() {
    let harness = build_service();
    let tutor = user(TUTOR);
    let (course, first_section, _) = complete_draft(&harness);
    let second_section = harness
        .service
        .add_section(&course.id, new_section("Borrowing"), &tutor)
        .expect("second section");
    harness
        .service
        .add_article(&first_section.id, new_article("Cargo basics"), &tutor)
        .expect("second article");

    let tree = harness.service.get(&course.id).expect("tree");
    assert_eq!(tree.sections.len(), 2);
    assert_eq!(tree.sections[0].section.id, first_section.id);
    assert_eq!(tree.sections[1].section.id, second_section.id);
    let titles: Vec<&str> = tree.sections[0]
        .articles
        .iter()
        .map(|article| article.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Installing the toolchain", "Cargo basics"]);
}

#[test]
fn deleting_a_course_removes_its_content() {
    let harness = build_service();
    let tutor = user(TUTOR);
    let (course, section, article) = complete_draft(&harness);

    harness.service.delete(&course.id, &tutor).expect("deleted");

    assert!(matches!(
        harness.service.get(&course.id),
        Err(WorkflowError::NotFound(_))
    ));
    assert!(harness
        .store
        .fetch_section(&section.id)
        .expect("fetch")
        .is_none());
    assert!(harness
        .store
        .fetch_article(&article.id)
        .expect("fetch")
        .is_none());
}

#[test]
fn list_by_tutor_only_returns_own_courses() {
    let harness = build_service();
    harness
        .service
        .create(new_course(None), &user(TUTOR))
        .expect("mine");
    harness
        .service
        .create(new_course(None), &user(OTHER_TUTOR))
        .expect("theirs");

    let mine = harness.service.list_by_tutor(&user(TUTOR)).expect("list");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].tutor_id, user(TUTOR));
}

fn interleaved_draft(
    service: &CourseService<InterleavingStore>,
) -> (Course, Section, Article) {
    let tutor = user(TUTOR);
    let course = service.create(new_course(None), &tutor).expect("course");
    let section = service
        .add_section(&course.id, new_section("Week 1"), &tutor)
        .expect("section");
    let article = service
        .add_article(&section.id, new_article("Kickoff"), &tutor)
        .expect("article");
    (course, section, article)
}

#[test]
fn submission_rechecks_content_removed_after_its_read() {
    let (service, store) = build_interleaved_service();
    let (course, _, article) = interleaved_draft(&service);

    store.before_next_write(move |inner| {
        inner.delete_article(&article.id).expect("article removed");
    });

    match service.submit_for_review(&course.id, &user(TUTOR)) {
        Err(WorkflowError::BadRequest(message)) => assert!(message.contains("article")),
        other => panic!("expected incomplete course, got {other:?}"),
    }
    let stored = store
        .fetch_course(&course.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.status, CourseStatus::Draft);
}

#[test]
fn publication_rechecks_content_under_the_store_lock() {
    let (service, store) = build_interleaved_service();
    let (course, section, _) = interleaved_draft(&service);
    service
        .submit_for_review(&course.id, &user(TUTOR))
        .expect("submitted");

    // Unlock, strip the only section, and relock behind the service's back.
    store.before_next_write(move |inner| {
        let mut draft = inner
            .fetch_course(&section.course_id)
            .expect("fetch")
            .expect("present");
        draft.status = CourseStatus::Draft;
        assert!(inner
            .replace_course_if(draft, CourseStatus::PendingReview)
            .expect("unlock"));
        inner.delete_section(&section.id).expect("section removed");
        force_pending_review(inner, &section.course_id);
    });

    assert!(matches!(
        service.review_by_staff(&course.id, CourseStatus::Published, "", &user(STAFF)),
        Err(WorkflowError::BadRequest(_))
    ));
    let stored = store
        .fetch_course(&course.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.status, CourseStatus::PendingReview);
}

#[test]
fn article_insert_is_refused_once_review_begins() {
    let (service, store) = build_interleaved_service();
    let (course, section, _) = interleaved_draft(&service);

    let locked = course.id.clone();
    store.before_next_write(move |inner| force_pending_review(inner, &locked));

    assert!(matches!(
        service.add_article(&section.id, new_article("Sneaky addition"), &user(TUTOR)),
        Err(WorkflowError::Forbidden(_))
    ));
    let articles = store.articles_for(&section.id).expect("articles");
    assert_eq!(articles.len(), 1);
}

#[test]
fn section_delete_is_refused_once_review_begins() {
    let (service, store) = build_interleaved_service();
    let (course, section, _) = interleaved_draft(&service);

    let locked = course.id.clone();
    store.before_next_write(move |inner| force_pending_review(inner, &locked));

    assert!(matches!(
        service.delete_section(&section.id, &user(TUTOR)),
        Err(WorkflowError::Forbidden(_))
    ));
    let tree = service.get(&course.id).expect("tree");
    assert_eq!(tree.course.status, CourseStatus::PendingReview);
    assert_eq!(tree.sections.len(), 1);
    assert_eq!(tree.sections[0].articles.len(), 1);
}
