use std::io::{self, BufRead, IsTerminal, Write};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use crossterm::event;
use tracing_appender::{
    non_blocking,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt::layer, layer::SubscriberExt, util::SubscriberInitExt};

use bigsql_core::logs_dir;
use bigsql_runner::{
    ConsoleReporter, JsonReporter, Reporter, RunSession,
    args::{Args, OutputFormat},
    config::RunConfig,
    error::RunnerError,
    keys::{KeyWatcher, RawMode, wait_for_escape},
    prompt::Prompter,
};

/// 初始化诊断日志：按天滚动的文件，`--verbose` 时同时输出到 stderr
fn init_logging(verbose: bool) -> Option<non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_env("BIGSQL_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("bigsql")
        .filename_suffix("log")
        .build(logs_dir());
    let (file_layer, guard) = match appender {
        Ok(appender) => {
            let (non_blocking, guard) = non_blocking(appender);
            (Some(layer().with_writer(non_blocking).with_ansi(false)), Some(guard))
        }
        Err(err) => {
            eprintln!("[Error] Cannot open diagnostic log: {}", err);
            (None, None)
        }
    };
    let stderr_layer = verbose.then(|| layer().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    guard
}

fn main() -> ExitCode {
    // 1. 解析命令行参数
    let args = Args::parse();

    // 2. 初始化日志系统
    let _log_guard = init_logging(args.verbose);
    tracing::info!("bigsql 启动，版本 {}", env!("CARGO_PKG_VERSION"));

    match run(&args) {
        Ok(()) => {
            tracing::info!("bigsql 退出");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("bigsql 异常退出: {}", err);
            eprintln!("[Error] {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), RunnerError> {
    // 3. 读取运行配置，命令行参数优先
    let config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    }
    .merge_args(args);

    // 4. 准备资源并执行
    match args.format {
        OutputFormat::Text => {
            let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
            let mut reporter = ConsoleReporter::stdout();
            execute(&config, &mut prompter, &mut reporter)?;
        }
        OutputFormat::Json => {
            // stdout 只输出 JSON，交互提示改走 stderr
            let mut prompter = Prompter::new(io::stdin().lock(), io::stderr());
            let mut reporter = JsonReporter::new(io::stdout());
            execute(&config, &mut prompter, &mut reporter)?;
            return Ok(());
        }
    }

    // 5. 等待 ESC 退出
    if !args.no_wait && io::stdin().is_terminal() {
        let _raw = RawMode::enable()?;
        wait_for_escape(event::read)?;
    }

    Ok(())
}

fn execute<R: BufRead, W: Write>(
    config: &RunConfig,
    prompter: &mut Prompter<R, W>,
    reporter: &mut dyn Reporter,
) -> Result<(), RunnerError> {
    prompter.notes()?;
    let session = RunSession::establish(config, prompter)?;

    let started = Instant::now();
    let mut watcher = KeyWatcher::attach();
    let summary = session.run(reporter, &mut watcher);
    drop(watcher);

    let elapsed = started.elapsed();
    reporter.elapsed(elapsed);
    tracing::info!(
        "运行结束: {:?}，累计影响 {} 行，耗时 {:.2} 秒",
        summary.end,
        summary.affected,
        elapsed.as_secs_f64()
    );

    Ok(())
}
