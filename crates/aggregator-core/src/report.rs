//! Summary report over finished builds and skipped projects.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::domain::{Build, Skip};

pub const REPORT_TEXT_KEY: &str = "REPORT_TEXT";
pub const REPORT_PRETEXT_KEY: &str = "REPORT_PRETEXT";
pub const REPORT_COLOR_KEY: &str = "REPORT_COLOR";

pub const ALL_SUCCESSFUL_TEXT: &str = "All scheduled builds successful";
pub const SUCCESS_HEADLINE: &str = "*Build Succeeded!*";
pub const FAILURE_HEADLINE: &str = "*Scheduled build failures!*";

/// Default for both report colors.
pub const DEFAULT_REPORT_COLOR: &str = "#f0741f";

/// Colors attached to the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStyle {
    pub success_color: String,
    pub failure_color: String,
}

impl Default for ReportStyle {
    fn default() -> Self {
        // Both outcomes share one color until product decides otherwise.
        Self {
            success_color: DEFAULT_REPORT_COLOR.to_string(),
            failure_color: DEFAULT_REPORT_COLOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub text: String,
    pub pretext: String,
    pub color: String,
}

impl Report {
    /// Render the report for `finished` builds and `skips`.
    ///
    /// One `[FAIL]` line per failed build comes first, then one `[SKIP]`
    /// line per skip. With no lines at all the report is a success.
    pub fn generate(finished: &[Build], skips: &[Skip], style: &ReportStyle) -> Self {
        let mut lines = String::new();
        for build in finished.iter().filter(|b| b.failed()) {
            let _ = writeln!(lines, "[FAIL] {}|build: {}", build.title, build.build_url);
        }
        for skip in skips {
            let _ = writeln!(lines, "[SKIP] {}|reason: {}", skip.title, skip.reason);
        }

        if lines.is_empty() {
            Self {
                text: ALL_SUCCESSFUL_TEXT.to_string(),
                pretext: SUCCESS_HEADLINE.to_string(),
                color: style.success_color.clone(),
            }
        } else {
            Self {
                text: lines,
                pretext: FAILURE_HEADLINE.to_string(),
                color: style.failure_color.clone(),
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.pretext == SUCCESS_HEADLINE
    }

    /// The exported key/value mapping.
    pub fn outputs(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            (REPORT_TEXT_KEY, self.text.clone()),
            (REPORT_PRETEXT_KEY, self.pretext.clone()),
            (REPORT_COLOR_KEY, self.color.clone()),
        ])
    }
}
