//! Terminal rendering for annotation reports, taxonomy entries and usage
//! counters.

use privlens_core::report::{AnnotatedSentence, AnnotationReport};
use privlens_core::taxonomy::{Rating, TaxonomyEntry};
use privlens_core::usage::{QuotaDecision, UsageRecord};

const MAX_TEXT_WIDTH: usize = 72;

/// Print a per-sentence table plus a rating tally.
pub fn print_report(report: &AnnotationReport) {
    println!("=== Annotation report ===");
    println!("  {:<14} {}", "grade", report.overall_grade);
    println!("  {:<14} {}", "sentences", report.num_sentences);
    println!();

    for row in &report.rows {
        print_row(row);
    }

    print_tally(&report.rows);
}

fn print_row(row: &AnnotatedSentence) {
    println!(
        "{:>3}  [{:<7}]  {:<24}  conf {:.2}",
        row.id,
        row.rating.as_str(),
        truncate(&row.label, 24),
        row.confidence,
    );
    println!("     {}", truncate(&row.text, MAX_TEXT_WIDTH));
    println!(
        "     {} > {} > {}",
        row.category, row.sub_category, row.fine_grained
    );
    if let Some(action) = &row.action {
        println!("     action: {}", truncate(action, MAX_TEXT_WIDTH));
    }
    println!();
}

fn print_tally(rows: &[AnnotatedSentence]) {
    let mut blocker = 0usize;
    let mut bad = 0usize;
    let mut good = 0usize;
    let mut neutral = 0usize;
    for row in rows {
        match row.rating {
            Rating::Blocker => blocker += 1,
            Rating::Bad => bad += 1,
            Rating::Good => good += 1,
            Rating::Neutral => neutral += 1,
        }
    }
    println!("{blocker} blocker, {bad} bad, {good} good, {neutral} neutral");
}

/// Print one resolved taxonomy entry.
pub fn print_entry(label: &str, entry: &TaxonomyEntry) {
    println!("=== {} ===", label);
    println!(
        "  {:<14} {} > {} > {}",
        "category", entry.category, entry.sub_category, entry.fine_grained
    );
    println!("  {:<14} {}", "rating", entry.rating.as_str());
    println!(
        "  {:<14} {}",
        "action",
        entry.action.as_deref().unwrap_or("-")
    );
}

/// Print the counters for one (user, feature) pair.
pub fn print_counters(user: &str, feature: &str, record: &UsageRecord) {
    println!("=== {} / {} ===", user, feature);
    println!("  {:<14} {}", "free runs", record.free_runs_used);
    println!("  {:<14} {}", "pro runs", record.pro_runs_used);
    println!("  {:<14} {}", "total runs", record.usage_count);
}

/// Print a quota decision with the counters it carries.
pub fn print_decision(user: &str, feature: &str, decision: &QuotaDecision) {
    match decision {
        QuotaDecision::Allowed(record) => {
            println!("allowed");
            print_counters(user, feature, record);
        }
        QuotaDecision::Denied(record) => {
            println!("denied: free quota exhausted");
            print_counters(user, feature, record);
        }
    }
}

/// Truncate to `max` characters, marking the cut with an ellipsis.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
