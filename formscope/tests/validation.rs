//! Tests for scope and field validation.

mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::*;
use formscope::prelude::*;

#[tokio::test]
async fn test_field_validation_records_single_error() {
    let form = ScopeNode::new(Person::default(), ScopeConfig::new());
    let name = FieldBinding::attach(&form, name_field());

    assert!(!name.validate().await.unwrap());
    let errors = form.errors().expect("errors committed");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.message("name"), Some(NAME_REQUIRED));
    assert_eq!(name.error().unwrap().as_deref(), Some(NAME_REQUIRED));

    name.on_change("Alex".to_string()).unwrap();
    assert!(name.validate().await.unwrap());
    assert!(form.errors().is_none());
}

#[tokio::test]
async fn test_field_without_validators_is_valid() {
    let form = ScopeNode::new(Person::default(), ScopeConfig::new());
    let plain = FieldBinding::attach(
        &form,
        FieldConfig::new(
            "nickname",
            |p: &Person| p.name.clone(),
            |mut p: Person, v| {
                p.name = v;
                p
            },
        ),
    );

    assert!(plain.validate().await.unwrap());
    assert_eq!(form.revision(), 0);
}

#[tokio::test]
async fn test_first_failing_validator_wins() {
    let form = ScopeNode::new(person("Ab", vec![]), ScopeConfig::new());
    FieldBinding::attach(
        &form,
        FieldConfig::new(
            "name",
            |p: &Person| p.name.clone(),
            |mut p: Person, v| {
                p.name = v;
                p
            },
        )
        .validator(rules::required(NAME_REQUIRED))
        .validator(rules::min_length(3, "Too short"))
        .validator(rules::max_length(1, "Too long")),
    );

    assert!(!form.validate(form.value(), false).await);
    assert_eq!(form.error("name").as_deref(), Some("Too short"));
}

#[tokio::test]
async fn test_repeated_validation_does_not_notify() {
    let form = ScopeNode::new(Person::default(), ScopeConfig::new());
    FieldBinding::attach(&form, name_field());
    let notified = count_notifications(&form);

    assert!(!form.validate(form.value(), false).await);
    let revision = form.revision();
    assert_eq!(notified.load(Ordering::SeqCst), 1);

    assert!(!form.validate(form.value(), false).await);
    assert_eq!(form.revision(), revision);
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert_eq!(form.error("name").as_deref(), Some(NAME_REQUIRED));
}

#[tokio::test]
async fn test_interrupt_stops_at_first_failure() {
    let form = ScopeNode::new(Person::default(), ScopeConfig::new().interrupt());
    FieldBinding::attach(&form, name_field());
    FieldBinding::attach(
        &form,
        FieldConfig::new(
            "companies",
            |p: &Person| p.companies.clone(),
            |mut p: Person, v| {
                p.companies = v;
                p
            },
        )
        .validator(rules::non_empty("You should add a company")),
    );

    assert!(!form.validate(form.value(), false).await);
    let errors = form.errors().expect("errors committed");
    assert_eq!(errors.len(), 1);
    assert!(errors.contains_key("name"));
}

#[tokio::test]
async fn test_validator_interrupt_flag() {
    let form = ScopeNode::new(Person::default(), ScopeConfig::new());
    FieldBinding::attach(
        &form,
        FieldConfig::new(
            "name",
            |p: &Person| p.name.clone(),
            |mut p: Person, v| {
                p.name = v;
                p
            },
        )
        .validator(rules::required(NAME_REQUIRED).interrupt()),
    );
    FieldBinding::attach(
        &form,
        FieldConfig::new(
            "companies",
            |p: &Person| p.companies.clone(),
            |mut p: Person, v| {
                p.companies = v;
                p
            },
        )
        .validator(rules::non_empty("You should add a company")),
    );

    assert!(!form.validate(form.value(), false).await);
    assert!(form.error("companies").is_none());
}

#[tokio::test]
async fn test_scope_validators_report_under_scope_name() {
    let form = ScopeNode::new(
        person("Alex", vec![]),
        ScopeConfig::new()
            .named("person")
            .validator(Validator::new(
                "Add at least one company",
                |p: &Person, _: &Person| !p.companies.is_empty(),
            )),
    );

    assert!(!form.validate(form.value(), false).await);
    assert_eq!(form.error("person").as_deref(), Some("Add at least one company"));

    let unnamed = ScopeNode::new(
        Person::default(),
        ScopeConfig::new().validator(Validator::new("Always", |_: &Person, _: &Person| false)),
    );
    assert!(!unnamed.validate(unnamed.value(), false).await);
    assert_eq!(unnamed.error(DEFAULT_SCOPE_NAME).as_deref(), Some("Always"));
}

#[tokio::test]
async fn test_async_validator_marks_scope_in_process() {
    let form = ScopeNode::new(person("taken", vec![]), ScopeConfig::new());
    FieldBinding::attach(
        &form,
        FieldConfig::new(
            "name",
            |p: &Person| p.name.clone(),
            |mut p: Person, v| {
                p.name = v;
                p
            },
        )
        .validator(Validator::new_async(
            "Name is taken",
            |args: ValidatorArgs<String, Person>| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                args.field_value != "taken"
            },
        )),
    );

    let running = form.clone();
    let handle = tokio::spawn(async move { running.validate(running.value(), false).await });

    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(form.in_process());
    assert_eq!(form.phase(), ScopePhase::Validating);

    assert!(!handle.await.unwrap());
    assert!(!form.in_process());
    assert_eq!(form.phase(), ScopePhase::Idle);
    assert_eq!(form.error("name").as_deref(), Some("Name is taken"));
}

#[tokio::test]
async fn test_validator_sees_whole_form_value() {
    let form = ScopeNode::new(
        person("Acme", vec![Company::new(1, "Acme")]),
        ScopeConfig::new(),
    );
    FieldBinding::attach(
        &form,
        FieldConfig::new(
            "name",
            |p: &Person| p.name.clone(),
            |mut p: Person, v| {
                p.name = v;
                p
            },
        )
        .validator(Validator::new(
            "Name clashes with a company",
            |name: &String, p: &Person| p.companies.iter().all(|c| c.name != *name),
        )),
    );

    assert!(!form.validate(form.value(), false).await);
    assert_eq!(form.error("name").as_deref(), Some("Name clashes with a company"));
}

#[tokio::test]
async fn test_on_validate_receives_focus_target() {
    let seen: Arc<Mutex<Vec<(bool, String, Option<&'static str>)>>> = Arc::default();
    let record = Arc::clone(&seen);

    let form = ScopeNode::new(Person::default(), ScopeConfig::new());
    let name = FieldBinding::attach(
        &form,
        name_field()
            .focus_target(FocusTarget::new("name-input"))
            .on_validate(move |event: &OnValidateField<String>| {
                let target = event
                    .focus_target
                    .as_ref()
                    .and_then(|t| t.downcast_ref::<&'static str>())
                    .copied();
                record
                    .lock()
                    .unwrap()
                    .push((event.is_valid, event.field_value.clone(), target));
            }),
    );

    name.validate().await.unwrap();
    name.on_change("Alex".to_string()).unwrap();
    name.validate().await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            (false, String::new(), Some("name-input")),
            (true, "Alex".to_string(), Some("name-input")),
        ]
    );
}

#[tokio::test]
async fn test_scope_on_validate_reports_committed_errors() {
    let outcomes: Arc<Mutex<Vec<(bool, usize)>>> = Arc::default();
    let record = Arc::clone(&outcomes);

    let form = ScopeNode::new(
        Person::default(),
        ScopeConfig::new().on_validate(move |result: &ScopeValidation<Person>| {
            record
                .lock()
                .unwrap()
                .push((result.is_valid, result.visible_errors().len()));
        }),
    );
    FieldBinding::attach(&form, name_field());

    form.validate(form.value(), false).await;
    form.modify(person("Alex", vec![]));
    form.validate(form.value(), false).await;

    assert_eq!(*outcomes.lock().unwrap(), vec![(false, 1), (true, 0)]);
}

#[tokio::test]
async fn test_modify_does_not_validate() {
    let form = ScopeNode::new(Person::default(), ScopeConfig::new());
    FieldBinding::attach(&form, name_field());

    form.modify(person("", vec![]));
    assert!(form.errors().is_none());
    assert_eq!(form.revision(), 1);
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Applicant {
    age: u32,
}

fn age_field(validators: Vec<Validator<u32, Applicant>>) -> FieldConfig<Applicant, u32> {
    FieldConfig::new(
        "age",
        |a: &Applicant| a.age,
        |mut a: Applicant, age| {
            a.age = age;
            a
        },
    )
    .validators(validators)
}

#[tokio::test]
async fn test_required_then_adult() {
    let form = ScopeNode::new(Applicant::default(), ScopeConfig::new());
    let age = FieldBinding::attach(
        &form,
        age_field(vec![
            Validator::new("Age is required", |age: &u32, _: &Applicant| *age > 0),
            rules::min(18, "You must be an adult"),
        ]),
    );

    assert!(!age.validate().await.unwrap());
    assert_eq!(age.error().unwrap().as_deref(), Some("Age is required"));

    age.on_change(10).unwrap();
    assert!(!age.validate().await.unwrap());
    assert_eq!(age.error().unwrap().as_deref(), Some("You must be an adult"));

    age.on_change(18).unwrap();
    assert!(age.validate().await.unwrap());
    assert!(form.errors().is_none());
}

#[tokio::test]
async fn test_interrupt_skips_later_validators_and_side_effects() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let events = Arc::new(Mutex::new(0));

    let first_calls = Arc::clone(&calls);
    let second_calls = Arc::clone(&calls);
    let event_count = Arc::clone(&events);

    let form = ScopeNode::new(Applicant::default(), ScopeConfig::new().interrupt());
    FieldBinding::attach(
        &form,
        age_field(vec![
            Validator::new("first", move |_: &u32, _: &Applicant| {
                first_calls.lock().unwrap().push("first");
                false
            }),
            Validator::new("second", move |_: &u32, _: &Applicant| {
                second_calls.lock().unwrap().push("second");
                false
            }),
        ])
        .on_validate(move |_: &OnValidateField<u32>| *event_count.lock().unwrap() += 1),
    );

    assert!(!form.validate(form.value(), false).await);
    assert_eq!(*calls.lock().unwrap(), vec!["first"]);
    assert_eq!(*events.lock().unwrap(), 1);
    assert_eq!(form.error("age").as_deref(), Some("first"));
}
