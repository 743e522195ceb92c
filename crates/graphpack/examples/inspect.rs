//! Simple decoder to inspect graphpack container files.

use graphpack::{ContainerReader, FieldType, FieldValue};

fn format_value(v: &FieldValue) -> String {
    match v {
        FieldValue::Str(s) => {
            let preview: String = s.chars().take(80).collect();
            if s.len() > 80 {
                format!("\"{}...\"", preview)
            } else {
                format!("\"{}\"", preview)
            }
        }
        FieldValue::Int(i) => format!("{}", i),
        FieldValue::Bool(b) => format!("{}", b),
        FieldValue::References(refs) => {
            let targets: Vec<&str> = refs.iter().take(5).map(|r| r.target.as_str()).collect();
            if refs.len() > 5 {
                format!("[{} ... {} entries]", targets.join(", "), refs.len())
            } else {
                format!("[{}]", targets.join(", "))
            }
        }
    }
}

fn main() {
    let path = std::env::args()
        .nth(1)
        .expect("usage: inspect <container.gpk>");

    println!("Reading: {}", path);

    let mut reader = ContainerReader::open(&path).expect("Failed to open container");
    let schema = reader.schema().clone();

    println!("\n=== Schema ===");
    match schema.namespace() {
        Some(ns) => println!("Name: {}.{}", ns, schema.name()),
        None => println!("Name: {}", schema.name()),
    }
    println!("Codec: {}", reader.codec().name());
    println!("Fields:");
    for field in schema.fields() {
        match &field.field_type {
            FieldType::References(spec) => println!(
                "  {}: references ({} {} edges)",
                field.name,
                spec.direction.name(),
                spec.relationship
            ),
            other => println!("  {}: {}", field.name, other.name()),
        }
    }

    let mut records = 0usize;
    let mut errors = 0usize;
    println!("\n=== Records ===");
    for (i, item) in reader.records().enumerate() {
        match item {
            Ok(record) => {
                records += 1;
                if i < 20 {
                    println!("[{}] {}", i, record.id().unwrap_or("<no id>"));
                    for (name, value) in record.fields() {
                        println!("      {} = {}", name, format_value(value));
                    }
                }
            }
            Err(err) => {
                errors += 1;
                println!("[{}] error: {}", i, err);
            }
        }
    }

    println!("\n{} record(s), {} error(s)", records, errors);
}
