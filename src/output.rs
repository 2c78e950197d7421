use heritage_graph::AnalyzerQueryResult;

use crate::cli::OutputFormat;

/// Print an analyzer result to stdout according to the selected output format.
///
/// Warnings always go to **stderr** so that stdout stays clean for JSON consumers.
pub fn print_result(result: &AnalyzerQueryResult, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
        OutputFormat::Compact => {
            for item in &result.query_output {
                let spec = &item.export_specifier;
                let mixin = if spec.is_mixin { " mixin" } else { "" };
                if item.matches_per_project.is_empty() {
                    println!("export {}{}", spec.id, mixin);
                    continue;
                }
                for group in &item.matches_per_project {
                    for entry in &group.files {
                        let overrides = match &entry.member_overrides {
                            Some(members) if !members.is_empty() => {
                                format!(" overrides={}", members.join(","))
                            }
                            _ => String::new(),
                        };
                        println!(
                            "match {} {}:{} {}{}",
                            spec.id, group.project, entry.file, entry.identifier, overrides
                        );
                    }
                }
            }
            println!(
                "{} exports, {} matches ({})",
                result.query_output.len(),
                result.match_count(),
                result.analyzer
            );
        }
    }

    for warning in &result.warnings {
        let kind = serde_json::to_value(warning.kind)?;
        let kind = kind.as_str().unwrap_or("warning");
        match &warning.file {
            Some(file) => eprintln!(
                "warning[{kind}] {}:{}: {}",
                warning.project, file, warning.message
            ),
            None => eprintln!("warning[{kind}] {}: {}", warning.project, warning.message),
        }
    }
    Ok(())
}
