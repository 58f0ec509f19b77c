/// Whole-program entry point: build the call graph, run both checkers and
/// collect their findings into one ordered report.
///
/// The two checkers share nothing but read-only inputs, so they run side by
/// side and only meet in the diagnostic sink.
use tracing::{info, instrument};

use crate::ast::{ModelError, Program};
use crate::call_graph::CallGraph;
use crate::config::AnalyzerConfig;
use crate::diagnostics::{DiagnosticSink, Report};
use crate::exhaustiveness;
use crate::purity::{self, PurityAnalysis};
use crate::types::TypeEnv;

/// Results of one analysis run.
#[derive(Debug)]
pub struct Analysis {
    pub graph: CallGraph,
    pub purity: PurityAnalysis,
    pub report: Report,
}

/// Analyze a validated program. Deterministic: the same program and config
/// always give the same report, whatever the thread count.
///
/// `program` must have passed [`Program::validate`]; out-of-range node ids
/// panic here. Use [`analyze_checked`] for programs built by other code.
#[instrument(skip_all, fields(modules = program.modules.len()))]
pub fn analyze(program: &Program, config: &AnalyzerConfig) -> Report {
    run(program, config).report
}

/// Like [`analyze`], but also hands back the call graph and the computed
/// effective purity of every function. Same precondition as [`analyze`].
pub fn run(program: &Program, config: &AnalyzerConfig) -> Analysis {
    let env = TypeEnv::new(program);
    let graph = CallGraph::build(program, config);
    let sink = DiagnosticSink::new();

    let (purity, ()) = rayon::join(
        || purity::check_purity(&graph, config, &sink),
        || exhaustiveness::check_program(program, &env, config, &sink),
    );

    let report = sink.finish();
    info!(
        functions = graph.len(),
        errors = report.summary.errors,
        warnings = report.summary.warnings,
        "analysis finished"
    );
    Analysis {
        graph,
        purity,
        report,
    }
}

/// Validate `program`, then analyze it.
pub fn analyze_checked(program: &Program, config: &AnalyzerConfig) -> Result<Report, ModelError> {
    program.validate()?;
    Ok(analyze(program, config))
}

/// Parse, validate and analyze a JSON program model.
pub fn analyze_json(src: &str, config: &AnalyzerConfig) -> Result<Report, ModelError> {
    let program = Program::from_json(src)?;
    Ok(analyze(&program, config))
}
