// Minimal CLI demo: reads HTML on stdin, anchors JSON (an array of anchor
// records) from the path given as the first argument, and writes the
// result as JSON to stdout. Not part of the library's contract — useful
// for manual smoke-testing.

use std::env;
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use html_highlight::Anchor;

fn main() -> ExitCode {
    let Some(anchors_path) = env::args().nth(1) else {
        eprintln!("usage: apply <anchors.json> [article_id] < input.html");
        return ExitCode::FAILURE;
    };

    let mut html = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut html) {
        eprintln!("failed to read stdin: {e}");
        return ExitCode::FAILURE;
    }

    let anchors_json = match fs::read_to_string(&anchors_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to read {anchors_path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let raw_anchors: Vec<serde_json::Value> = match serde_json::from_str(&anchors_json) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("malformed anchors JSON: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut anchors = Vec::with_capacity(raw_anchors.len());
    for value in &raw_anchors {
        match Anchor::from_json(&value.to_string()) {
            Ok(anchor) => anchors.push(anchor),
            Err(e) => {
                eprintln!("invalid anchor: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let article_id = env::args().nth(2);
    let result = html_highlight::apply(&html, &anchors, article_id.as_deref(), false);

    let output = serde_json::json!({
        "html": result.html,
        "applied": result.applied,
        "orphaned_ids": result.orphaned_ids,
        "orphaned_count": result.orphaned_count(),
        "all_applied": result.all_applied(),
        "total": result.total,
    });
    println!("{output}");
    ExitCode::SUCCESS
}
