//! Scout - 网格世界重规划智能体
//!
//! 入口：初始化日志、加载配置、装配一次运行并输出 JSON 报告。
//!
//! 用法：`scout [--config FILE] [--strategy NAME] [--scenario ID]`，其余参数走 `SCOUT__*` 环境变量。

use std::path::PathBuf;

use anyhow::{bail, Context};
use scout::{config::load_config, execution::RunEvent, observability, RunBuilder, Strategy};

#[derive(Default)]
struct CliArgs {
    config: Option<PathBuf>,
    strategy: Option<Strategy>,
    scenario: Option<String>,
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut args = std::env::args().skip(1);
    while let Some(flag) = args.next() {
        let mut value = || args.next().with_context(|| format!("missing value for {flag}"));
        match flag.as_str() {
            "--config" => out.config = Some(PathBuf::from(value()?)),
            "--strategy" => {
                out.strategy = Some(value()?.parse().map_err(|e: String| anyhow::anyhow!(e))?)
            }
            "--scenario" => out.scenario = Some(value()?),
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(out)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let args = parse_args()?;
    let mut cfg = load_config(args.config).context("Failed to load config")?;
    if let Some(scenario) = args.scenario {
        cfg.world.scenario = scenario;
        cfg.world.scenario_file = None;
    }

    let mut builder = RunBuilder::new(cfg);
    if let Some(strategy) = args.strategy {
        builder = builder.with_strategy(strategy);
    }
    let execution = builder.build().await.context("Failed to assemble run")?;

    // 过程事件转为 debug 日志
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<RunEvent>();
    let sink = tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            if let Ok(line) = serde_json::to_string(&ev) {
                tracing::debug!(event = %line, "run event");
            }
        }
    });

    let report = execution.with_event_tx(tx).run().await.context("Run failed")?;
    let _ = sink.await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.outcome.is_done() {
        std::process::exit(2);
    }
    Ok(())
}
