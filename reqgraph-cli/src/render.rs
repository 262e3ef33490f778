//! Colored terminal rendering of an analysis result.

use colored::Colorize;

use reqgraph_core::{AnalysisResult, RecommendationSeverity, Verdict};

pub fn text_report(result: &AnalysisResult) {
    let summary = &result.report.summary;

    let verdict = match result.health.verdict {
        Verdict::Pass => summary.verdict.green().bold(),
        Verdict::PassWithWarning => summary.verdict.yellow().bold(),
        Verdict::ActionRequired => summary.verdict.red().bold(),
    };
    println!("{}", "Requirement graph health".bold());
    println!(
        "  {} requirements, {} violations, taxonomy {}",
        summary.requirement_count, summary.violation_count, summary.taxonomy_version
    );
    println!(
        "  score {} ({})  level {}  verdict {}",
        summary.display.to_string().bold(),
        format!("{:+.1}", summary.overall),
        summary.level,
        verdict
    );
    if let Some(domain) = summary.worst_domain {
        println!("  worst domain: {domain}");
    }
    if !summary.degraded_detectors.is_empty() {
        println!(
            "  {} degraded detectors: {}",
            "warning:".yellow(),
            summary.degraded_detectors.join(", ")
        );
    }

    println!("\n{}", "Domains".bold());
    for section in &result.report.domains {
        let score = if section.score < -50.0 {
            format!("{:8.1}", section.score).red()
        } else if section.score < -20.0 {
            format!("{:8.1}", section.score).yellow()
        } else {
            format!("{:8.1}", section.score).green()
        };
        println!(
            "  {:<18} {}  weight {:.2}  confidence {:.2}  violations {}",
            section.domain.to_string(),
            score,
            section.weight,
            section.confidence,
            section.violation_count
        );
    }

    if !result.report.reasoning.is_empty() {
        println!("\n{}", "Reasoning".bold());
        for entry in &result.report.reasoning {
            println!(
                "  {} [{} {}] {} ({:+})",
                entry.requirement_id.cyan(),
                entry.code,
                entry.code_name,
                entry.message,
                entry.scaled_penalty
            );
        }
    }

    if !result.report.recommendations.is_empty() {
        println!("\n{}", "Recommendations".bold());
        for recommendation in &result.report.recommendations {
            let tag = match recommendation.severity {
                RecommendationSeverity::High => "high".red(),
                RecommendationSeverity::Medium => "medium".yellow(),
                RecommendationSeverity::Low => "low".normal(),
            };
            println!("  [{tag}] {}", recommendation.message);
        }
    }
}
