//! `tagprobe run` and `tagprobe stage` command handlers

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use tagprobe_core::config::TagprobeConfig;
use tagprobe_harness::{
    AwsCli, Harness, RunReport, ScriptImagePublisher, StageStatus, TaggingValidator, TerraformCli,
};

use crate::cli::{RunArgs, StageArgs};
use crate::error::CliError;
use crate::output::OutputWriter;

type CliHarness = Harness<TerraformCli, ScriptImagePublisher, AwsCli>;

/// Execute the `run` command.
pub async fn execute(
    args: RunArgs,
    config: TagprobeConfig,
    cancel: CancellationToken,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut harness = build_harness(config, cancel);
    if args.force {
        harness = harness.force_all();
    }

    info!(force = args.force, "running full lifecycle");
    let report = harness.run().await;
    writer.render(&report)?;
    outcome(&report)
}

/// Execute the `stage` command.
pub async fn execute_stage(
    args: StageArgs,
    config: TagprobeConfig,
    cancel: CancellationToken,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut harness = build_harness(config, cancel);
    if args.force {
        harness = harness.force(args.stage);
    }

    info!(stage = %args.stage, force = args.force, "running single stage");
    let report = harness.run_stage(args.stage).await;
    writer.render(&report)?;
    outcome(&report)
}

/// Wire the CLI-backed adapters and the tagging validator into a harness.
fn build_harness(config: TagprobeConfig, cancel: CancellationToken) -> CliHarness {
    let aws = Arc::new(AwsCli::new(config.aws.cli.clone()));
    let terraform = Arc::new(TerraformCli::new(config.terraform.binary.clone()));
    let images = Arc::new(ScriptImagePublisher::new(config.image.push_script.clone()));

    let validator = TaggingValidator::new(
        Arc::clone(&aws),
        Arc::clone(&aws),
        Arc::clone(&terraform),
        config.terraform.topic_output.clone(),
        config.image.baseline_tag.clone(),
    )
    .with_initial_policy(config.poller.initial_policy())
    .with_settle_policy(config.poller.settle_policy());

    Harness::new(config, terraform, images, aws)
        .with_validator(Arc::new(validator))
        .with_cancel_token(cancel)
        .with_env_skips()
}

/// Map the first failed stage of a report to an error.
fn outcome(report: &RunReport) -> Result<(), CliError> {
    let failed = report.stages.iter().find_map(|s| match &s.status {
        StageStatus::Failed { class, message } => Some(CliError::Stage {
            stage: s.stage,
            class: *class,
            message: message.clone(),
        }),
        _ => None,
    });

    match failed {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
