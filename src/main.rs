// SPDX: CC0-1.0

use anyhow::Context;
use chrono::{DateTime, Local};
use fortegn::{
    chart,
    compile::{compile_evaluator, sanitize_expression, Evaluator},
    normalize::normalize,
    shell::{self, Bound, Command},
    solution::{self, resolve_domain, Solution, SolveErr},
    stdlib, Domain, DomainOverride, Number,
};
use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode};
use std::{
    fs::OpenOptions,
    io::{stdout, BufWriter, Write},
    process::ExitCode,
    sync::Arc,
};

const LOG_ENV: &str = "FORTEGN_LOG";

fn output_report_filename(now: DateTime<Local>) -> String {
    format!(
        "{}_output-{}.{}",
        env!("CARGO_PKG_NAME"),
        now.format("%Y-%m-%d_%H-%M-%S"),
        "txt"
    )
}

fn init_logging() {
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|level| level.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn);
    // the shell works the same without a logger
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn main() -> ExitCode {
    init_logging();
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("unexpected error: {err}");
            let chain = err.chain();
            if chain.len() > 1 {
                eprintln!();
                eprintln!("context:");
                for it in chain.skip(1) {
                    eprintln!("  {it}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
struct State {
    expr: Option<Arc<String>>,
    /// Cached until the expression changes.
    solution: Option<Solution>,
    /// Auto domain of the last solution, reused for single-point charts.
    auto_domain: Option<Domain>,
    user_domain: DomainOverride,
    width: usize,
}

fn try_main() -> anyhow::Result<()> {
    let mut state = State {
        expr: Some(Arc::new(String::from("(x+1)(x-2)/(x-3)"))),
        solution: None,
        auto_domain: None,
        user_domain: DomainOverride::default(),
        width: chart::DEFAULT_WIDTH,
    };

    let mut stdout = BufWriter::new(stdout());
    loop {
        if let Some(ref expr) = state.expr {
            writeln!(stdout, "f(x) = {expr}")?;
        } else {
            writeln!(stdout, "f(x) is not set")?;
        }

        let mut try_cmd = shell::input(&mut stdout, "> ")?;
        try_cmd.make_ascii_lowercase();
        writeln!(stdout)?;

        if let Ok(cmd) = try_cmd.parse::<Command>() {
            match cmd {
                Command::Help => {
                    for c in Command::exhaustive() {
                        writeln!(stdout, "{name}: {help}", name = c.name(), help = c.help())?;
                    }
                }

                Command::Quit => break,

                Command::SetExpr => set_expr(&mut stdout, &mut state)?,

                Command::Solve => solve_expr(&mut stdout, &mut state)?,

                Command::SetDomain => set_domain(&mut stdout, &mut state)?,

                Command::Eval => eval_expr(&mut stdout, &state)?,

                Command::PrintProg => {
                    if let Some(fun) = compile_expr(&mut stdout, &state)? {
                        shell::dump_program(
                            &mut stdout,
                            fun.program(),
                            format_args!("program for '{}'", fun.source()),
                        )?;
                    }
                }

                Command::Save => save_report(&mut stdout, &mut state)?,
            }
        } else {
            writeln!(stdout, r#"Unknown command, try "help" for help"#)?;
        }

        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

fn set_expr<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let input = shell::input(&mut out, "f(x) = ")?;
    if input.is_empty() {
        return Ok(());
    }

    log::info!("expression set to '{}'", normalize(&input));
    state.solution = None;
    state.expr = Some(Arc::new(input));

    solve_expr(&mut out, state)
}

fn report_solve_err<W: Write>(mut out: W, err: SolveErr) -> anyhow::Result<()> {
    match err {
        SolveErr::CompileFailure(err) => {
            shell::report_compile_err(&mut out, &err, &stdlib::standard_idents())?;
        }
        SolveErr::DisallowedCharacters { .. } => {
            writeln!(out, "error: {err}")?;
            writeln!(
                out,
                "note: '{eval}' and '{prog}' still accept any supported function",
                eval = Command::Eval.name(),
                prog = Command::PrintProg.name(),
            )?;
        }
        SolveErr::EmptyInput | SolveErr::Unparseable => writeln!(out, "error: {err}")?,
    }
    Ok(())
}

/// Fill the solution cache. `false` if there is nothing to show.
fn ensure_solution<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<bool> {
    if state.solution.is_some() {
        return Ok(true);
    }
    let Some(ref expr) = state.expr else {
        shell::expr_undefined(&mut out)?;
        return Ok(false);
    };

    match solution::generate_solution_with(expr, state.auto_domain) {
        Ok(solution) => {
            state.auto_domain = Some(solution.domain);
            state.solution = Some(solution);
            Ok(true)
        }
        Err(err) => {
            report_solve_err(&mut out, err)?;
            Ok(false)
        }
    }
}

fn solve_expr<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    if !ensure_solution(&mut out, state)? {
        return Ok(());
    }
    if let Some(ref solution) = state.solution {
        let domain = resolve_domain(&state.user_domain, &solution.domain);
        writeln!(out)?;
        shell::write_solution(&mut out, solution, &domain, state.width)?;
        if !state.user_domain.is_empty() {
            writeln!(out, "note: automatic domain is {}", solution.domain)?;
        }
    }
    Ok(())
}

fn set_domain<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    writeln!(out, "domain = {}", state.user_domain)?;
    writeln!(out)?;
    writeln!(out, "note: leave blank to skip, 'auto' to follow the critical points")?;

    for (name, dst) in [
        ("x min", &mut state.user_domain.min),
        ("x max", &mut state.user_domain.max),
    ] {
        let cur = dst.map_or_else(|| String::from("auto"), |val| val.to_string());
        match shell::read_fromstr::<_, Bound>(&mut out, format_args!("?{name} (is {cur}) = "), true)? {
            Ok(Some(Bound(new))) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }

    writeln!(out, "note: width must be at least {}", chart::MIN_WIDTH)?;
    match shell::read_fromstr::<_, usize>(
        &mut out,
        format_args!("?width (is {cur}) = ", cur = state.width),
        true,
    )? {
        Ok(Some(new)) => state.width = new.max(chart::MIN_WIDTH),
        Ok(None) => {}
        Err(_) => return Ok(()),
    }

    Ok(())
}

/// Compile the expression with every supported function allowed.
fn compile_expr<W: Write>(mut out: W, state: &State) -> anyhow::Result<Option<Evaluator>> {
    let Some(ref expr) = state.expr else {
        shell::expr_undefined(&mut out)?;
        return Ok(None);
    };

    match compile_evaluator(&sanitize_expression(&normalize(expr))) {
        Ok(fun) => Ok(Some(fun)),
        Err(err) => {
            writeln!(out)?;
            shell::report_compile_err(&mut out, &err, &stdlib::standard_idents())?;
            Ok(None)
        }
    }
}

fn eval_expr<W: Write>(mut out: W, state: &State) -> anyhow::Result<()> {
    let Some(fun) = compile_expr(&mut out, state)? else {
        return Ok(());
    };

    let x = match shell::read_fromstr::<_, Number>(&mut out, format_args!("?{} = ", stdlib::X), false)? {
        Ok(Some(x)) => x,
        Ok(None) | Err(_) => return Ok(()),
    };

    match fun.try_call(x) {
        Ok(val) => writeln!(out, "f({x}) = {val}")?,
        Err(err) => writeln!(out, "evaluation error: {err}")?,
    }
    Ok(())
}

fn save_report<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    if !ensure_solution(&mut out, state)? {
        return Ok(());
    }
    let Some(ref solution) = state.solution else {
        return Ok(());
    };

    let path = output_report_filename(Local::now());
    let mut report = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .context("failed to open output report file")?,
    );
    let domain = resolve_domain(&state.user_domain, &solution.domain);
    shell::write_solution(&mut report, solution, &domain, state.width)
        .context("failed to write to output report file")?;
    report.flush()?;
    report.get_mut().sync_data()?;
    drop(report);

    log::info!("saved sign chart of '{}' to {path}", solution.expression);
    writeln!(out, "wrote {path}")?;
    Ok(())
}
