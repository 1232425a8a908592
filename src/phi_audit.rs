// Static audit: scans every Rust source file for tracing calls that would
// write patient identity or raw report content to the logs.

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    /// Field names and interpolations that MUST NOT appear in tracing macros.
    const PHI_PATTERNS: &[&str] = &[
        // Identity fields
        "patient_name",
        "patient_phone",
        "info.name",
        "info.phone",
        "patient.name",
        "patient.phone",
        "filter.name",
        "filter.phone",
        "stored.name",
        "stored.phone",
        // Report content
        "original_value",
        "record.value",
        "raw_text",
        "extracted_text",
        "range_line",
        "value_line",
        "%text",
        "?text",
        "api_key",
    ];

    const ALLOWLIST: &[&str] = &["phi_audit.rs"];

    const TRACING_MACROS: &[&str] = &[
        "tracing::info!",
        "tracing::warn!",
        "tracing::error!",
        "tracing::debug!",
        "tracing::trace!",
        "tracing::info_span!",
        "tracing::debug_span!",
    ];

    #[test]
    fn no_phi_in_tracing_calls() {
        let src_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
        assert!(src_dir.exists(), "Source directory not found: {}", src_dir.display());

        let mut violations = Vec::new();
        scan_directory(&src_dir, &mut violations);

        if !violations.is_empty() {
            let report = violations
                .iter()
                .map(|(file, line_num, line, pattern)| {
                    format!("  {}:{}: found '{}' in: {}", file, line_num, pattern, line.trim())
                })
                .collect::<Vec<_>>()
                .join("\n");
            panic!(
                "PHI AUDIT FAILED: {} violation(s) found in tracing calls:\n{}\n\n\
                 Fix: log patient_id or report_id instead of identity or report content.",
                violations.len(),
                report
            );
        }
    }

    #[test]
    fn phi_patterns_list_is_not_empty() {
        assert!(PHI_PATTERNS.len() >= 10);
    }

    #[test]
    fn scanner_detects_known_violation() {
        let lines = [
            r#"tracing::info!(name = %info.name, "patient stored");"#,
            r#"    tracing::warn!("#,
            r#"        raw = %record.original_value,"#,
            r#"        "bad value""#,
            r#"    );"#,
        ];
        let found = collect_violations(&lines);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0, 1);
        assert_eq!(found[1].0, 2);
    }

    #[test]
    fn scanner_passes_clean_tracing() {
        let lines = [
            r#"tracing::info!(report_id = %report.report_id, indicator_count = 3, "Report stored");"#,
        ];
        assert!(collect_violations(&lines).is_empty());
    }

    fn scan_directory(dir: &Path, violations: &mut Vec<(String, usize, String, String)>) {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                scan_directory(&path, violations);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                scan_file(&path, violations);
            }
        }
    }

    fn scan_file(path: &Path, violations: &mut Vec<(String, usize, String, String)>) {
        let filename = path.file_name().unwrap_or_default().to_string_lossy();
        if ALLOWLIST.iter().any(|a| filename.contains(a)) {
            return;
        }

        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return,
        };

        let relative_path = path
            .strip_prefix(Path::new(env!("CARGO_MANIFEST_DIR")).join("src"))
            .unwrap_or(path)
            .display()
            .to_string();

        let lines: Vec<&str> = content.lines().collect();
        for (line_num, call, pattern) in collect_violations(&lines) {
            violations.push((relative_path.clone(), line_num, call, pattern));
        }
    }

    /// Returns `(1-indexed line, full macro call, matched pattern)`.
    fn collect_violations(lines: &[&str]) -> Vec<(usize, String, String)> {
        let mut found = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            let trimmed = lines[i].trim();
            let is_tracing = TRACING_MACROS
                .iter()
                .any(|m| trimmed.starts_with(m) || trimmed.contains(&format!("= {m}")));
            if !is_tracing {
                i += 1;
                continue;
            }

            // Collect the full call; it may span several lines.
            let mut call = String::from(trimmed);
            let start_line = i + 1;
            let mut depth = paren_delta(trimmed);
            let mut j = i + 1;
            while depth > 0 && j < lines.len() {
                let next = lines[j].trim();
                call.push(' ');
                call.push_str(next);
                depth += paren_delta(next);
                j += 1;
            }

            for pattern in PHI_PATTERNS {
                if call.contains(pattern) {
                    found.push((start_line, call.clone(), pattern.to_string()));
                }
            }
            i = j;
        }
        found
    }

    fn paren_delta(s: &str) -> i32 {
        s.chars().fold(0, |d, ch| match ch {
            '(' => d + 1,
            ')' => d - 1,
            _ => d,
        })
    }
}
