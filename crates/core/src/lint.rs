// Static checks over a workflow before it runs

use crate::seed::UNIQUE_PLACEHOLDER;
use crate::template::TemplateRenderer;
use crate::types::{Assertion, Extraction, Generator, StepId, WorkflowSpec};
use std::collections::HashSet;

/// A problem found by [`lint`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintIssue {
    pub step: Option<StepId>,
    pub message: String,
}

impl LintIssue {
    fn workflow(message: impl Into<String>) -> Self {
        Self {
            step: None,
            message: message.into(),
        }
    }

    fn step(step: &StepId, message: impl Into<String>) -> Self {
        Self {
            step: Some(step.clone()),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for LintIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.step {
            Some(step) => write!(f, "step '{}': {}", step, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Check that every template only reads keys that are seeded or extracted by
/// a strictly earlier step, and that no key is produced twice.
///
/// `seeded` lists keys supplied from outside the workflow document (CLI or
/// config vars); the workflow's own vars and generators are added here.
pub fn lint(workflow: &WorkflowSpec, seeded: &[String]) -> Vec<LintIssue> {
    let mut issues = Vec::new();

    if workflow.steps.is_empty() {
        issues.push(LintIssue::workflow("workflow has no steps"));
        return issues;
    }

    let mut available: HashSet<String> = seeded.iter().cloned().collect();
    available.extend(workflow.vars.keys().cloned());

    let mut generated = HashSet::new();
    for generator in &workflow.generate {
        let key = generator.key();
        // Externally seeded keys suppress their generators
        if seeded.iter().any(|k| k == key) {
            continue;
        }

        if workflow.vars.contains_key(key) {
            issues.push(LintIssue::workflow(format!(
                "generated key '{}' is also a workflow var",
                key
            )));
        } else if !generated.insert(key) {
            issues.push(LintIssue::workflow(format!(
                "generated key '{}' is produced by more than one generator",
                key
            )));
        }

        if let Generator::Unique { template, .. } = generator {
            for name in TemplateRenderer::extract_parameters(template) {
                if name != UNIQUE_PLACEHOLDER && !available.contains(&name) {
                    issues.push(LintIssue::workflow(format!(
                        "generator for '{}' reads '{}', which is not seeded before it",
                        key, name
                    )));
                }
            }
        }
        available.insert(key.to_string());
    }

    let extracted_anywhere: HashSet<&str> = workflow
        .steps
        .iter()
        .flat_map(|s| s.extractions.iter().map(Extraction::key))
        .collect();

    let mut step_ids = HashSet::new();
    let mut produced: HashSet<String> = HashSet::new();

    for step in &workflow.steps {
        if !step_ids.insert(step.id.clone()) {
            issues.push(LintIssue::step(&step.id, "duplicate step id"));
        }

        let mut references = TemplateRenderer::extract_parameters(&step.path);
        for template in workflow.headers.values().chain(step.headers.values()) {
            references.extend(TemplateRenderer::extract_parameters(template));
        }
        if let Some(body) = &step.body {
            references.extend(TemplateRenderer::extract_value_parameters(body));
        }
        for assertion in &step.assertions {
            match assertion {
                Assertion::Contains { value, .. } => {
                    references.extend(TemplateRenderer::extract_parameters(value))
                }
                Assertion::Equals { value, .. } => {
                    references.extend(TemplateRenderer::extract_value_parameters(value))
                }
                Assertion::Present { .. } => {}
            }
        }
        for extraction in &step.extractions {
            if let Extraction::Lookup { equals, .. } = extraction {
                references.extend(TemplateRenderer::extract_parameters(equals));
            }
        }

        references.sort();
        references.dedup();
        for name in references {
            if !available.contains(&name) {
                let message = if extracted_anywhere.contains(name.as_str()) {
                    format!("'{}' is read before the step that extracts it has run", name)
                } else {
                    format!("'{}' is never seeded or extracted", name)
                };
                issues.push(LintIssue::step(&step.id, message));
            }
        }

        for extraction in &step.extractions {
            let key = extraction.key();
            if available.contains(key) || !produced.insert(key.to_string()) {
                issues.push(LintIssue::step(
                    &step.id,
                    format!("'{}' is already set and would be rejected", key),
                ));
            }
        }
        available.extend(step.extractions.iter().map(|e| e.key().to_string()));
    }

    if let Some(auth) = &workflow.auth {
        if !available.contains(&auth.token_key) {
            issues.push(LintIssue::workflow(format!(
                "auth token key '{}' is never seeded or extracted",
                auth.token_key
            )));
        }
    }

    issues
}
