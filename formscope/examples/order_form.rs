//! Drives an order form without a UI: edit fields, add line items, submit.
//!
//! Run with `cargo run -p formscope --example order_form`; engine logs go to
//! `order_form.log`.

use std::fs::File;

use formscope::prelude::*;
use serde::Serialize;
use simplelog::{Config, LevelFilter, WriteLogger};

#[derive(Debug, Clone, Default, Serialize)]
struct Order {
    name: String,
    address: String,
    phone: String,
    items: Vec<LineItem>,
}

#[derive(Debug, Clone, Default, Serialize)]
struct LineItem {
    id: u32,
    product: String,
    quantity: u32,
}

/// Format digits as `+0-000-000-0000`, dropping anything past the mask.
fn mask_phone(next: &str) -> String {
    const GROUPS: [usize; 4] = [1, 3, 3, 4];

    let mut digits = next.chars().filter(char::is_ascii_digit);
    let mut out = String::new();
    for (i, len) in GROUPS.iter().enumerate() {
        let group: String = digits.by_ref().take(*len).collect();
        if group.is_empty() {
            break;
        }
        out.push(if i == 0 { '+' } else { '-' });
        out.push_str(&group);
    }
    out
}

fn text_field(
    name: &str,
    get: fn(&Order) -> &String,
    set: fn(&mut Order, String),
) -> FieldConfig<Order, String> {
    FieldConfig::new(
        name,
        move |order: &Order| get(order).clone(),
        move |mut order: Order, value| {
            set(&mut order, value);
            order
        },
    )
    .validator(rules::required("It's required field"))
}

fn print_errors(form: &ScopeNode<Order>, items: &RepeaterController<Order, LineItem>) {
    match form.visible_errors() {
        Some(errors) => {
            for (field, message) in errors {
                println!("  {field}: {message}");
            }
        }
        None => println!("  (no form errors)"),
    }
    for item in items.items() {
        if let Some(errors) = item.scope.visible_errors() {
            for (field, message) in errors {
                println!("  items[{}].{field}: {message}", item.key);
            }
        }
    }
}

#[tokio::main]
async fn main() -> formscope::Result<()> {
    if let Ok(log_file) = File::create("order_form.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, Config::default(), log_file);
    }

    let initial = Order {
        name: "Alex".to_string(),
        ..Order::default()
    };
    let form = ScopeNode::new(
        initial,
        ScopeConfig::new()
            .named("order")
            .on_submit(|order: &Arc<Order>| println!("Submitted order for {}", order.name)),
    );

    let name = FieldBinding::attach(
        &form,
        text_field("name", |o| &o.name, |o, v| o.name = v).validate_on_change(),
    );
    let address = FieldBinding::attach(
        &form,
        text_field("address", |o| &o.address, |o, v| o.address = v).validate_on_change(),
    );
    let phone = FieldBinding::attach(
        &form,
        text_field("phone", |o| &o.phone, |o, v| o.phone = v)
            .validator(Validator::new(
                "Phone number is incorrect",
                |phone: &String, _: &Order| phone.len() == 15,
            ))
            .formatter(|_prev: &String, next: String| mask_phone(&next))
            .validate_on_change(),
    );
    FieldBinding::attach(
        &form,
        FieldConfig::new(
            "items",
            |o: &Order| o.items.clone(),
            |mut o: Order, items| {
                o.items = items;
                o
            },
        )
        .validator(rules::non_empty("You should add item")),
    );

    let items = RepeaterController::attach(
        &form,
        RepeaterConfig::new(
            "items",
            |o: &Order| o.items.clone(),
            |mut o: Order, items| {
                o.items = items;
                o
            },
        )
        .key(|item: &LineItem| ItemKey::from(item.id))
        .on_mount(|key, scope| {
            log::debug!("Mounted line item {key}");
            FieldBinding::attach(
                scope,
                FieldConfig::new(
                    "product",
                    |i: &LineItem| i.product.clone(),
                    |mut i: LineItem, v| {
                        i.product = v;
                        i
                    },
                )
                .validator(rules::required("Pick a product")),
            );
            FieldBinding::attach(
                scope,
                FieldConfig::new(
                    "quantity",
                    |i: &LineItem| i.quantity,
                    |mut i: LineItem, v| {
                        i.quantity = v;
                        i
                    },
                )
                .validator(rules::min(1, "Quantity must be at least 1")),
            );
        }),
    );

    println!("Submitting an empty order:");
    form.submit().await;
    print_errors(&form, &items);

    if let Some(handle) = name.on_change(String::new())? {
        let _ = handle.await;
    }
    println!("After clearing the name: {:?}", name.error()?);

    name.on_change("Alex".to_string())?;
    address.on_change("221B Baker Street".to_string())?;
    if let Some(handle) = phone.on_change("15550001234".to_string())? {
        let _ = handle.await;
    }
    println!("Phone formatted as {}", phone.value()?);

    items.append(
        LineItem {
            id: 1,
            product: String::new(),
            quantity: 0,
        },
        true,
    )?;

    println!("Submitting with an incomplete line item:");
    form.submit().await;
    print_errors(&form, &items);

    if let Some(item) = items.render().items.into_iter().find(|item| item.should_focus) {
        item.scope.update(|mut line| {
            line.product = "Coffee beans".to_string();
            line.quantity = 2;
            line
        });
    }

    println!("Submitting the completed order:");
    if form.submit().await {
        println!("{}", form.debug_json()?);
    }

    form.reset().await;
    println!("After reset: {} items, name {:?}", items.size(), name.value()?);

    Ok(())
}
