use std::fs;
use std::path::Path;
use std::process;

use colored::Colorize;

use avow::analyzer;
use avow::ast::{Program, Purity};
use avow::config::AnalyzerConfig;
use avow::diagnostics::{Diagnostic, Report, Severity};
use avow::purity::EffectivePurity;

pub(super) struct CheckOptions<'a> {
    pub(super) config: Option<&'a str>,
    pub(super) json: bool,
    pub(super) strict: bool,
    pub(super) no_unreachable: bool,
    pub(super) no_hygiene: bool,
    pub(super) jobs: Option<usize>,
}

fn read_file(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Cannot open file '{}': {}", path, e))
}

fn load_program(path: &str) -> Result<Program, String> {
    let source = read_file(path)?;
    Program::from_json(&source).map_err(|e| format!("{}: {}", path, e))
}

fn load_config(path: Option<&str>) -> Result<AnalyzerConfig, String> {
    match path {
        Some(p) => AnalyzerConfig::load(Path::new(p)).map_err(|e| e.to_string()),
        None => Ok(AnalyzerConfig::default()),
    }
}

fn or_exit<T>(result: Result<T, String>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            process::exit(1);
        }
    }
}

fn print_diagnostic(d: &Diagnostic) {
    let line = d.to_string();
    match d.severity {
        Severity::Error => println!("  {}", line.red()),
        Severity::Warning => println!("  {}", line.yellow()),
    }
}

fn print_report(file: &str, report: &Report) {
    println!("Check: {}", file.cyan());
    for d in &report.diagnostics {
        print_diagnostic(d);
    }
    if report.is_clean() {
        println!("  {} No problems found", "✓".green());
    } else {
        println!(
            "  {} error(s), {} warning(s)",
            report.summary.errors, report.summary.warnings
        );
    }
}

pub(super) fn cmd_check(file: &str, opts: CheckOptions<'_>) {
    let mut config = or_exit(load_config(opts.config));
    if opts.no_unreachable {
        config.report_unreachable = false;
    }
    if opts.no_hygiene {
        config.warn_declared_effectful_but_pure = false;
    }

    if let Some(jobs) = opts.jobs {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global();
        if let Err(e) = pool {
            eprintln!("{} cannot configure worker threads: {}", "WARNING:".yellow(), e);
        }
    }

    let program = or_exit(load_program(file));
    let report = analyzer::analyze(&program, &config);

    if opts.json {
        println!("{}", report.to_json_pretty());
    } else {
        print_report(file, &report);
    }

    let failed = report.has_errors() || (opts.strict && !report.is_clean());
    if failed {
        process::exit(1);
    }
}

pub(super) fn cmd_purity(file: &str, config: Option<&str>) {
    let config = or_exit(load_config(config));
    let program = or_exit(load_program(file));
    let analysis = analyzer::run(&program, &config);
    let recursive = analysis.graph.recursive_functions();

    println!("Purity: {}", file.cyan());
    for (id, node) in analysis.graph.nodes() {
        let declared = match node.purity {
            Purity::Pure => "pure",
            Purity::Effectful => "effectful",
        };
        let effective = match analysis.purity.effective(id) {
            EffectivePurity::Pure => "pure".green(),
            EffectivePurity::Impure { proven: true } => "effectful".red(),
            EffectivePurity::Impure { proven: false } => "assumed effectful".yellow(),
        };
        let mut line = format!(
            "  {:<32} declared {:<9} effective {}",
            node.path.to_string(),
            declared,
            effective
        );
        if recursive.contains(&id) {
            line.push_str(" (recursive)");
        }
        println!("{}", line);

        if !analysis.purity.effective(id).is_pure() {
            if let Some(chain) = analysis.purity.call_chain(&analysis.graph, id) {
                let mut names: Vec<String> = chain
                    .functions
                    .iter()
                    .map(|&f| analysis.graph.node(f).path.to_string())
                    .collect();
                names.push(chain.leaf.name().to_string());
                println!("      via {}", names.join(" → ").dimmed());
            }
        }
    }
}
