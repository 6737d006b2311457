use crate::infra::{
    build_marketplace, InMemoryNotificationSink, RecordingPaymentGateway, SimulatedPaymentGateway,
    StaticIdentityDirectory,
};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tutorhub::config::MarketplaceConfig;
use tutorhub::error::AppError;
use tutorhub::workflows::courses::{ContentType, CourseStatus, NewArticle, NewCourse, NewSection};
use tutorhub::workflows::enrollment::{EnrolledCourseView, PaymentCallback};
use tutorhub::workflows::tutors::{TutorApplicationSubmission, TutorDecision};
use tutorhub::workflows::{UserId, WorkflowError};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Course price charged at enrollment (defaults to 100).
    #[arg(long, value_parser = parse_price)]
    pub(crate) price: Option<Decimal>,
    /// Have the provider report the first payment as failed before the student retries.
    #[arg(long)]
    pub(crate) decline_first_payment: bool,
    /// Stop after the course is published.
    #[arg(long)]
    pub(crate) skip_enrollment: bool,
}

#[derive(Debug, Serialize)]
struct DemoSummary {
    tutor_application: String,
    course_id: String,
    course_status: CourseStatus,
    dashboard: Vec<EnrolledCourseView>,
    notifications: Vec<String>,
}

pub(crate) fn parse_price(raw: &str) -> Result<Decimal, String> {
    let price = Decimal::from_str(raw.trim())
        .map_err(|err| format!("failed to parse '{raw}' as a decimal price ({err})"))?;
    if price < Decimal::ZERO {
        return Err(format!("price must not be negative, got {price}"));
    }
    Ok(price)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        price,
        decline_first_payment,
        skip_enrollment,
    } = args;
    let price = price.unwrap_or(Decimal::ONE_HUNDRED);

    let tutor = UserId::new("tina");
    let staff = UserId::new("staff-1");
    let student = UserId::new("sam");

    let config = MarketplaceConfig::default();
    let gateway = Arc::new(RecordingPaymentGateway::<SimulatedPaymentGateway>::default());
    let inbox = Arc::new(InMemoryNotificationSink::default());
    let directory = StaticIdentityDirectory::default().with_name(tutor.as_str(), "Tina Turing");
    let (marketplace, mut worker) =
        build_marketplace(&config, gateway.clone(), Arc::new(directory), inbox.clone());

    println!("TutorHub marketplace demo");
    println!("\nTutor vetting");
    let application = marketplace.tutors.apply(
        &tutor,
        TutorApplicationSubmission {
            experience: "Seven years teaching systems programming".to_string(),
            qualifications: "MSc Computer Science".to_string(),
            bio: "Makes borrow checker errors feel friendly.".to_string(),
        },
    )?;
    println!(
        "- {} applied -> application {} ({})",
        tutor,
        application.id.0,
        application.status.label()
    );
    let decided = marketplace.tutors.decide(
        &application.id,
        TutorDecision::Accepted,
        "Welcome to the faculty",
        &staff,
    )?;
    println!(
        "- {} decided {} -> {}",
        staff,
        decided.id.0,
        decided.status.label()
    );

    println!("\nCourse lifecycle");
    let course = marketplace.courses.create(
        NewCourse {
            title: "Rust for Service Developers".to_string(),
            description: "Build and ship an axum service".to_string(),
            category: "programming".to_string(),
            price: Some(price),
        },
        &tutor,
    )?;
    println!(
        "- Draft course {} created at {} {}",
        course.id.0, course.price, config.currency
    );

    match marketplace.courses.submit_for_review(&course.id, &tutor) {
        Err(WorkflowError::BadRequest(reason)) => {
            println!("  Empty course rejected for review: {reason}")
        }
        Err(err) => return Err(err.into()),
        Ok(_) => println!("  Unexpected: empty course accepted for review"),
    }

    let section = marketplace.courses.add_section(
        &course.id,
        NewSection {
            title: "Getting started".to_string(),
        },
        &tutor,
    )?;
    let article = marketplace.courses.add_article(
        &section.id,
        NewArticle {
            title: "Installing the toolchain".to_string(),
            content: "rustup, cargo, and your first crate".to_string(),
            content_type: ContentType::Video,
        },
        &tutor,
    )?;
    println!(
        "- Added section {} with article {}",
        section.id.0, article.id.0
    );

    let submitted = marketplace.courses.submit_for_review(&course.id, &tutor)?;
    println!("- Submitted for review -> {}", submitted.status.label());
    let published =
        marketplace
            .courses
            .review_by_staff(&course.id, CourseStatus::Published, "", &staff)?;
    println!("- Staff review -> {}", published.status.label());

    let mut dashboard = Vec::new();
    if !skip_enrollment {
        println!("\nEnrollment and payment reconciliation");
        if decline_first_payment {
            let failed = marketplace.enrollments.enroll(&student, &course.id, "card")?;
            let outcome = marketplace
                .enrollments
                .process_payment_callback(PaymentCallback {
                    enrollment_id: failed.id.clone(),
                    student_id: student.clone(),
                    course_id: course.id.clone(),
                    approved: false,
                    message: "insufficient funds".to_string(),
                })?;
            println!(
                "- Enrollment {} -> {} (student may retry)",
                failed.id.0,
                outcome.status().label()
            );
        }

        let enrollment = marketplace.enrollments.enroll(&student, &course.id, "card")?;
        println!(
            "- {} requested enrollment {} for {} {}",
            student, enrollment.id.0, enrollment.amount, config.currency
        );

        let callback = PaymentCallback {
            enrollment_id: enrollment.id.clone(),
            student_id: student.clone(),
            course_id: course.id.clone(),
            approved: true,
            message: String::new(),
        };
        let first = marketplace
            .enrollments
            .process_payment_callback(callback.clone())?;
        let replay = marketplace.enrollments.process_payment_callback(callback)?;
        println!("- Payment callback -> {:?}", first);
        println!("- Duplicate callback -> {:?}", replay);

        dashboard = marketplace.enrollments.get_student_enrollments(&student)?;
        println!(
            "- Payment provider saw {} initiation request(s)",
            gateway.requests().len()
        );
    }

    worker.drain();
    let notifications = inbox
        .events()
        .into_iter()
        .map(|notification| {
            format!(
                "{} -> {} ({})",
                notification.kind.label(),
                notification.recipient,
                notification.subject_id
            )
        })
        .collect();

    let summary = DemoSummary {
        tutor_application: decided.id.0,
        course_id: published.id.0,
        course_status: published.status,
        dashboard,
        notifications,
    };
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("\nSummary payload:\n{}", json),
        Err(err) => println!("\nSummary payload unavailable: {}", err),
    }

    Ok(())
}
