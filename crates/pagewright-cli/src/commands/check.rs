//! The `check` management command.
//!
//! Validates the settings and the template directory: `template.conf`
//! parses, every layout region exists, and every route pattern parses and
//! points at a known fragment.

use async_trait::async_trait;
use pagewright_core::{PagewrightError, PagewrightResult, Settings};
use pagewright_template::TemplateSource;

use crate::command::ManagementCommand;

/// Reports problems with the settings and template directory.
pub struct CheckCommand;

/// Runs every check. An empty list means no problems were found.
pub fn run_checks(settings: &Settings) -> Vec<String> {
    let mut problems = Vec::new();

    if settings.site_url.is_empty() {
        problems.push("site_url is not set".to_string());
    } else if url::Url::parse(&settings.site_url).is_err() {
        problems.push(format!("site_url '{}' is not a valid URL", settings.site_url));
    }
    if settings.max_include_depth == 0 {
        problems.push("max_include_depth must be at least 1".to_string());
    }

    match TemplateSource::new(&settings.template_dir).validate() {
        Ok(found) => problems.extend(found),
        Err(e) => problems.push(e.to_string()),
    }
    problems
}

#[async_trait]
impl ManagementCommand for CheckCommand {
    fn name(&self) -> &'static str {
        "check"
    }

    fn help(&self) -> &'static str {
        "Checks the settings and template directory for problems"
    }

    async fn handle(&self, _matches: &clap::ArgMatches, settings: &Settings) -> PagewrightResult<()> {
        let problems = run_checks(settings);
        if problems.is_empty() {
            println!("System check identified no issues.");
            return Ok(());
        }

        for problem in &problems {
            println!("ERROR: {problem}");
        }
        Err(PagewrightError::Configuration(format!(
            "System check identified {} issue(s)",
            problems.len()
        )))
    }
}
