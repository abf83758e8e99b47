//! Package assessment: every test of a package against every target it
//! exercises.

use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, info_span, instrument, warn};

use assay_core::config::AssayConfig;
use assay_core::errors::AssessError;
use assay_core::types::collections::FxHashMap;

use super::detection::Detector;
use super::inference::{InferredTarget, Inferrer};
use super::mapping::Mapper;
use super::scoring::{contract_coverage, detection_confidence, over_specification, summarize};
use super::types::{
    AssertionKind, AssertionSite, Assessment, QualityReport, ReportMetadata, UnmappedReason,
};
use super::vocabulary::Vocabulary;
use crate::effects::{EffectCatalogue, SideEffect};
use crate::model::program::{Program, TestFunction};

struct Context<'a> {
    program: &'a Program,
    catalogue: &'a EffectCatalogue,
    vocab: Vocabulary,
    target_package: String,
    max_target_depth: u32,
    max_helper_depth: u32,
}

#[derive(Default)]
struct TestOutcome {
    reports: Vec<QualityReport>,
    warnings: Vec<String>,
}

/// Assess every test function of `package_path`.
///
/// The target package defaults to `package_path` without a `_test` suffix.
/// Degraded conditions become warnings; only a missing or test-less
/// package is an error.
#[instrument(name = "assay.assess", skip(program, catalogue, config))]
pub fn assess(
    program: &Program,
    package_path: &str,
    catalogue: &EffectCatalogue,
    config: &AssayConfig,
) -> Result<Assessment, AssessError> {
    if package_path.trim().is_empty() {
        return Err(AssessError::EmptyPackagePath);
    }
    if program.package(package_path).is_none() {
        return Err(AssessError::PackageNotFound {
            path: package_path.to_string(),
        });
    }
    if !program.has_test_files(package_path) {
        return Err(AssessError::NoTestFiles {
            path: package_path.to_string(),
        });
    }

    let assessment = &config.assessment;
    let target_package = assessment.target_package.clone().unwrap_or_else(|| {
        package_path
            .strip_suffix("_test")
            .unwrap_or(package_path)
            .to_string()
    });
    let ctx = Context {
        program,
        catalogue,
        vocab: Vocabulary::from_config(&config.vocabulary),
        target_package,
        max_target_depth: assessment.effective_max_target_depth(),
        max_helper_depth: assessment.effective_max_helper_depth(),
    };

    let tests = program.test_functions(package_path);
    debug!(tests = tests.len(), target_package = %ctx.target_package, "assessing package");

    let outcomes: Vec<TestOutcome> = if assessment.effective_parallel() {
        tests.par_iter().map(|test| assess_test(&ctx, test)).collect()
    } else {
        tests.iter().map(|test| assess_test(&ctx, test)).collect()
    };

    let mut reports = Vec::new();
    let mut warnings = Vec::new();
    for outcome in outcomes {
        reports.extend(outcome.reports);
        warnings.extend(outcome.warnings);
    }
    reports.sort_by(|a, b| {
        a.test_function
            .cmp(&b.test_function)
            .then_with(|| a.target_function.cmp(&b.target_function))
    });

    let summary = summarize(&reports, assessment.effective_worst_coverage_limit());
    info!(
        reports = reports.len(),
        tests = summary.total_tests,
        average_coverage = summary.average_contract_coverage,
        warnings = warnings.len(),
        "assessment complete"
    );

    Ok(Assessment {
        reports,
        summary,
        warnings,
    })
}

fn assess_test(ctx: &Context<'_>, test: &TestFunction) -> TestOutcome {
    let mut outcome = TestOutcome::default();

    let inference = Inferrer::new(ctx.program, &ctx.target_package, ctx.max_target_depth).infer(test.function);
    for warning in &inference.warnings {
        warn!(test = %test.name, "{warning}");
    }
    outcome.warnings.extend(inference.warnings.iter().cloned());
    if inference.targets.is_empty() {
        return outcome;
    }

    let sites = Detector::new(ctx.program, &ctx.vocab, ctx.max_helper_depth).detect(test.function);

    for target in &inference.targets {
        let _span = info_span!("assay.pair", test = %test.name, target = %target.qualified_name).entered();
        let Some(effects) = ctx.catalogue.effects_for(&target.qualified_name) else {
            let warning = format!(
                "target {} of {} not found in effect catalogue; skipping",
                target.qualified_name, test.name
            );
            warn!("{warning}");
            outcome.warnings.push(warning);
            continue;
        };

        let started = Instant::now();
        let mut report = assess_pair(ctx, test, target, effects, &sites);
        report.metadata.warnings = inference.warnings.clone();
        for warning in helper_warnings(ctx, &sites, &report, target) {
            warn!("{warning}");
            outcome.warnings.push(warning.clone());
            report.metadata.warnings.push(warning);
        }
        report.metadata.duration_ms = started.elapsed().as_millis() as u64;

        debug!(
            coverage = report.contract_coverage.percentage,
            mapped = report.mapped_assertions.len(),
            unmapped = report.unmapped_assertions.len(),
            discarded = report.discarded_returns.len(),
            "pair assessed"
        );
        outcome.reports.push(report);
    }
    outcome
}

fn assess_pair(
    ctx: &Context<'_>,
    test: &TestFunction,
    target: &InferredTarget,
    effects: &[SideEffect],
    sites: &[AssertionSite<'_>],
) -> QualityReport {
    let mapped = Mapper::new(ctx.program).map(test.function, target.function, effects, sites);

    let discarded_ids: Vec<&str> = mapped.discarded.iter().map(|&i| effects[i].id.as_str()).collect();
    let contract_coverage = contract_coverage(effects, &mapped.mappings, &discarded_ids);
    let over_specification = over_specification(effects, &mapped.mappings);
    let kinds: Vec<AssertionKind> = sites.iter().map(|s| s.kind).collect();

    let (mapped_assertions, unmapped_assertions) =
        mapped.mappings.into_iter().partition(|m| m.is_mapped());

    QualityReport {
        test_function: test.name.clone(),
        test_location: test.location.to_string(),
        target_function: target.qualified_name.clone(),
        contract_coverage,
        over_specification,
        ambiguous_effects: effects.iter().filter(|e| e.is_ambiguous()).cloned().collect(),
        mapped_assertions,
        unmapped_assertions,
        discarded_returns: mapped.discarded.iter().map(|&i| effects[i].clone()).collect(),
        assertion_detection_confidence: detection_confidence(&kinds),
        metadata: ReportMetadata::default(),
    }
}

/// One warning per helper whose assertions could not be traced.
fn helper_warnings(
    ctx: &Context<'_>,
    sites: &[AssertionSite<'_>],
    report: &QualityReport,
    target: &InferredTarget,
) -> Vec<String> {
    let mut untraced: FxHashMap<&str, usize> = FxHashMap::default();
    for site in sites.iter().filter(|s| s.depth > 0) {
        let location = site.location.to_string();
        let helper_parameter = report.unmapped_assertions.iter().any(|m| {
            m.assertion_location == location && m.unmapped_reason == Some(UnmappedReason::HelperParameter)
        });
        if helper_parameter {
            let name = ctx.program.dataflow.function(site.enclosing).name.as_str();
            *untraced.entry(name).or_default() += 1;
        }
    }
    let mut helpers: Vec<(&str, usize)> = untraced.into_iter().collect();
    helpers.sort();
    helpers
        .into_iter()
        .map(|(helper, count)| {
            format!(
                "{count} assertion(s) in helper {helper} cannot be traced to {}",
                target.qualified_name
            )
        })
        .collect()
}
