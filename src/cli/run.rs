//! Scan command handler

use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use super::console::ConsoleObserver;
use super::{Cli, RunContext};
use crate::error::{Error, Result};
use crate::models::{ReportOutcome, RunOutcome};
use crate::report::{TemplateRenderer, save_report};
use crate::scan::{ScanRun, run_scan};
use crate::supervisor::{self, ScannerProcess};

/// Run one scan end to end.
///
/// Remote failures during the scan end up in the returned outcome. Errors are
/// returned only for problems that should fail the process: bad config, a
/// report conflict, or a scanner that could not be started.
pub async fn run(cli: &Cli, cancel: &CancellationToken) -> Result<RunOutcome> {
    let ctx = RunContext::new(cli)?;
    let target = ctx.plan.target.as_str();
    debug!("Scanner API at {}", ctx.client.base_url());

    if let Some(ref report) = ctx.report {
        report.check_destination(ctx.force)?;
    }

    let process = match ctx.start {
        Some(ref zap_sh) => Some(start_scanner(&ctx, zap_sh, cancel).await?),
        None => None,
    };

    let observer = ConsoleObserver::new();
    let scan = tokio::select! {
        result = run_scan(ctx.client.as_ref(), &ctx.plan, &ctx.settings, cancel, &observer) => result,
        _ = cancel.cancelled() => Ok(ScanRun::Cancelled),
    };

    let mut outcome = match scan {
        Ok(run) => RunOutcome::from_run(target, run),
        Err(err) => {
            error!("Scan of {} failed: {}", target, err);
            RunOutcome::failed(target, err.to_string())
        }
    };

    let mut conflict = None;
    if outcome.has_results() && !cancel.is_cancelled() {
        if let Some(ref report) = ctx.report {
            let renderer = TemplateRenderer::discover(ctx.config.report.template_dir.as_deref());
            debug!("Report template: {:?}", renderer.source());

            match save_report(
                ctx.client.as_ref(),
                report,
                &outcome.alerts,
                target,
                &renderer,
                ctx.force,
            )
            .await
            {
                Ok(()) => {
                    info!("{} report saved at {}", report.kind, report.path.display());
                    outcome.report = Some(ReportOutcome::Saved {
                        path: report.path.clone(),
                        kind: report.kind,
                    });
                }
                Err(err) if err.is_conflict() => conflict = Some(err),
                Err(err) => {
                    warn!("Unable to save report {}: {}", report.path.display(), err);
                    outcome.report = Some(ReportOutcome::Failed {
                        path: report.path.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    if ctx.stop {
        let stopped = supervisor::stop(
            ctx.client.as_ref(),
            process,
            ctx.config.timing.shutdown_grace(),
        )
        .await;
        outcome.scanner_stopped = Some(stopped);
    } else if let Some(process) = process {
        info!("Leaving scanner running (pid {:?})", process.id());
    }

    match conflict {
        Some(err) => Err(Error::Report(err)),
        None => Ok(outcome),
    }
}

/// Launch zap.sh and wait for its API; the process is killed if it never
/// becomes ready
async fn start_scanner(
    ctx: &RunContext,
    zap_sh: &std::path::Path,
    cancel: &CancellationToken,
) -> Result<ScannerProcess> {
    let mut process = supervisor::spawn(zap_sh, &ctx.config.zap_url, ctx.config.api_key.as_deref())?;

    let ready = supervisor::wait_until_ready(
        ctx.client.as_ref(),
        ctx.client.base_url(),
        Some(&mut process),
        ctx.config.timing.startup_probe(),
        ctx.config.timing.startup_timeout(),
        cancel,
    )
    .await;

    match ready {
        Ok(version) => {
            eprintln!("ZAP {} started", version);
            Ok(process)
        }
        Err(err) => {
            process.kill().await;
            Err(err)
        }
    }
}
