pub mod render;
pub mod run;

use convey_core::{ContentType, DocumentSnapshot};

/// Prints the document, optionally followed by its content-type spans.
pub fn print_snapshot(snapshot: &DocumentSnapshot, annotate: bool) {
    print!("{}", snapshot.text);
    if !snapshot.text.is_empty() && !snapshot.text.ends_with('\n') {
        println!();
    }
    if annotate {
        for range in &snapshot.highlighters {
            let label = match range.content_type {
                ContentType::Normal => "stdout",
                ContentType::Error => "stderr",
                ContentType::System => "system",
                ContentType::UserInput => "input",
                ContentType::Custom(_) => "custom",
            };
            match range.link {
                Some(link) => eprintln!("{}..{} {label} link={}", range.start, range.end, link.0),
                None => eprintln!("{}..{} {label}", range.start, range.end),
            }
        }
    }
}
