// Colored terminal summaries for bias runs, topic evolution and anchors.
//
// main.rs delegates all human-facing formatting here; the CSV files carry
// the full data.

use colored::Colorize;

use crate::narrative::anchors::{Anchor, ReferenceAnchors};
use crate::narrative::bias::BiasRecord;
use crate::narrative::pipeline::WordStats;
use crate::topics::alignment::{ChangeType, EvolutionRow};
use crate::vector::cosine_similarity;

/// Display counts and the score distribution for one target word.
pub fn display_word_summary(stats: &WordStats, records: &[BiasRecord]) {
    println!(
        "\n{}",
        format!("=== Narrative Bias: {} ===", stats.target_word).bold()
    );
    println!(
        "  Documents matched: {}  Occurrences: {}  Scored: {}",
        stats.documents_matched, stats.occurrences, stats.documents_scored
    );

    if stats.missing_embeddings > 0 || stats.documents_dropped() > 0 {
        println!(
            "  {} {} occurrences without embedding, {} documents dropped",
            "!".yellow(),
            stats.missing_embeddings,
            stats.documents_dropped()
        );
    }

    if records.is_empty() {
        println!("  {}", "No documents scored.".dimmed());
        return;
    }

    let n = records.len() as f64;
    let mean = records.iter().map(|r| r.bias_score).sum::<f64>() / n;
    let personal = records.iter().filter(|r| r.bias_score > 0.0).count();
    let structural = records.iter().filter(|r| r.bias_score < 0.0).count();

    println!("  Mean bias: {}", colorize_bias(mean));
    println!(
        "  Leaning personal: {}  Leaning structural: {}  Neutral: {}",
        personal,
        structural,
        records.len() - personal - structural
    );
}

/// Display the evolution table and its totals.
pub fn display_evolution(rows: &[EvolutionRow], threshold: f64) {
    let count = |kind: ChangeType| rows.iter().filter(|r| r.change_type == kind).count();

    println!(
        "\n{}",
        format!("=== Topic Evolution (threshold {threshold}) ===").bold()
    );
    println!(
        "  Aligned: {}  Disappeared: {}  Emerging: {}",
        count(ChangeType::Aligned).to_string().green(),
        count(ChangeType::Disappeared).to_string().red(),
        count(ChangeType::Emerging).to_string().cyan()
    );
    println!();

    for row in rows {
        match row.change_type {
            ChangeType::Aligned => println!(
                "  {} {:<8} -> {:<8} {:.3}  {} -> {}",
                "=".green(),
                row.topic_label_p1,
                row.topic_label_p2,
                row.similarity.unwrap_or(0.0),
                super::truncate_chars(&row.keywords_p1, 40).dimmed(),
                super::truncate_chars(&row.keywords_p2, 40).dimmed()
            ),
            ChangeType::Disappeared => println!(
                "  {} {:<8}  {}",
                "-".red(),
                row.topic_label_p1,
                super::truncate_chars(&row.keywords_p1, 80).dimmed()
            ),
            ChangeType::Emerging => println!(
                "  {} {:<8}  {}",
                "+".cyan(),
                row.topic_label_p2,
                super::truncate_chars(&row.keywords_p2, 80).dimmed()
            ),
        }
    }
}

/// Display which seeds built each anchor and how far apart the poles are.
pub fn display_anchor_summary(anchors: &ReferenceAnchors) {
    println!("\n{}", "=== Reference Anchors ===".bold());
    display_anchor(&anchors.personal);
    display_anchor(&anchors.structural);

    let between = cosine_similarity(&anchors.personal.vector, &anchors.structural.vector);
    println!("\n  Cosine between poles: {between:.4}");
    if between > 0.95 {
        println!(
            "  {} Poles are nearly identical; bias scores will be noisy.",
            "!".yellow()
        );
    }
}

fn display_anchor(anchor: &Anchor) {
    println!(
        "\n  {} (dim {}): {} seeds used",
        anchor.label.bold(),
        anchor.vector.len(),
        anchor.seeds_used.len()
    );
    println!("    {}", anchor.seeds_used.join(" ").dimmed());
    if !anchor.seeds_skipped.is_empty() {
        println!(
            "    {} skipped: {}",
            "!".yellow(),
            anchor.seeds_skipped.join(" ")
        );
    }
}

/// Color a bias score by the pole it leans towards.
fn colorize_bias(score: f64) -> colored::ColoredString {
    let text = format!("{score:+.4}");
    if score > 0.05 {
        text.cyan()
    } else if score < -0.05 {
        text.yellow()
    } else {
        text.normal()
    }
}
