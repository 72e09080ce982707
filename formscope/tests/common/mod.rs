//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use formscope::prelude::*;
use serde::Serialize;

pub const NAME_REQUIRED: &str = "It is required field";
pub const COMPANY_NAME_REQUIRED: &str = "Company name is required";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Person {
    pub name: String,
    pub companies: Vec<Company>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Company {
    pub id: u32,
    pub name: String,
}

impl Company {
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

pub fn person(name: &str, companies: Vec<Company>) -> Person {
    Person {
        name: name.to_string(),
        companies,
    }
}

pub fn name_field() -> FieldConfig<Person, String> {
    FieldConfig::new(
        "name",
        |p: &Person| p.name.clone(),
        |mut p: Person, name| {
            p.name = name;
            p
        },
    )
    .validator(rules::required(NAME_REQUIRED))
}

pub fn company_name_field() -> FieldConfig<Company, String> {
    FieldConfig::new(
        "name",
        |c: &Company| c.name.clone(),
        |mut c: Company, name| {
            c.name = name;
            c
        },
    )
    .validator(rules::required(COMPANY_NAME_REQUIRED))
}

/// Repeater over `Person::companies`, keyed by id, without fields.
pub fn companies_config() -> RepeaterConfig<Person, Company> {
    RepeaterConfig::new(
        "companies",
        |p: &Person| p.companies.clone(),
        |mut p: Person, companies| {
            p.companies = companies;
            p
        },
    )
    .key(|c: &Company| ItemKey::from(c.id))
}

/// Same repeater, attaching a required name field to every item.
pub fn companies_with_fields() -> RepeaterConfig<Person, Company> {
    companies_config().on_mount(|_, scope| {
        FieldBinding::attach(scope, company_name_field());
    })
}

/// Subscribe a counter to `scope`'s notifications.
pub fn count_notifications<T>(scope: &ScopeNode<T>) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    scope.subscribe(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    count
}

pub fn item_scope(repeater: &RepeaterController<Person, Company>, id: u32) -> ScopeNode<Company> {
    repeater
        .scope(&ItemKey::from(id))
        .expect("item scope exists")
}
