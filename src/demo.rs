// src/demo.rs

//! Bundled job graph used by the `jobdag` binary: publishing a static site.
//!
//! It exercises every job kind, jobs generated from input (one notification
//! job per subscriber), retries that need several rounds, shared global
//! state and cleanup hooks.
//!
//! Named arguments read by the jobs:
//!
//! | key                  | meaning                                         |
//! |----------------------|-------------------------------------------------|
//! | `target`             | deployment target, one of [`AVAILABLE_TARGETS`] |
//! | `token_state`        | credentials are usable when `"valid"`           |
//! | `lock_free`          | whether the deploy lock can be taken            |
//! | `cache_success_try`  | cache warm run that first succeeds              |
//! | `build_success_try`  | build run that first produces assets            |
//! | `upload_success_try` | upload attempt that first succeeds              |

use anyhow::{Context, bail, ensure};
use tracing::info;

use crate::errors::Result;
use crate::job::{CheckFailure, CheckResult, JobCatalog, JobContext, JobId, JobSpec};
use crate::storage::Arguments;

pub const AVAILABLE_TARGETS: &[&str] = &["staging", "production", "preview"];

/// Inputs a caller chooses for one run of the pipeline.
#[derive(Debug, Clone)]
pub struct DemoInputs {
    pub target: String,
    pub token_state: String,
    pub lock_free: bool,
    pub cache_success_try: i64,
    pub build_success_try: i64,
    pub upload_success_try: i64,
}

impl Default for DemoInputs {
    fn default() -> Self {
        Self {
            target: "staging".to_string(),
            token_state: "valid".to_string(),
            lock_free: true,
            cache_success_try: 3,
            build_success_try: 2,
            upload_success_try: 1,
        }
    }
}

impl DemoInputs {
    pub fn arguments(&self) -> Arguments {
        Arguments::new()
            .named("target", self.target.as_str())
            .named("token_state", self.token_state.as_str())
            .named("lock_free", self.lock_free)
            .named("cache_success_try", self.cache_success_try)
            .named("build_success_try", self.build_success_try)
            .named("upload_success_try", self.upload_success_try)
    }
}

/// Register the pipeline in a fresh catalog and return it with its root,
/// `VerifyDeployment`.
pub fn release_pipeline(subscribers: &[String]) -> Result<(JobCatalog, JobId)> {
    let mut c = JobCatalog::new();

    let fetch = c.add(
        JobSpec::standard("FetchSources", check_flag("sources_fetched"), |ctx| {
            ctx.local_mut().insert("checkout", "/tmp/jobdag-demo/site");
            ctx.global_mut().insert("sources_fetched", true);
            Ok(())
        })
        .with_cleanup(|ctx| {
            info!(checkout = ?ctx.local().get_str("checkout"), "removing checkout");
            ctx.global_mut().insert("workspace_removed", true);
            Ok(())
        }),
    )?;

    let toolchain = c.add(JobSpec::run_only("InstallToolchain", |ctx| {
        ctx.global_mut().insert("toolchain", "stable");
        Ok(())
    }))?;

    let workspace = c.add(JobSpec::dummy("PrepareWorkspace").after(fetch).after(toolchain))?;

    let tag = c.add(JobSpec::standard(
        "PickReleaseTag",
        |ctx| match ctx.global().get_str("release_tag") {
            Some(_) => Ok(()),
            None => Err(CheckFailure::not_ready("no release tag chosen")),
        },
        |ctx| {
            ctx.global_mut().insert("release_tag", "v1.4.0");
            Ok(())
        },
    ))?;

    let target = c.add(
        JobSpec::standard(
            "ValidateTarget",
            |ctx| {
                let target = ctx.args().get_str("target").unwrap_or_default();
                if AVAILABLE_TARGETS.contains(&target) {
                    Ok(())
                } else {
                    Err(CheckFailure::not_ready(format!(
                        "{target:?} is not one of the available targets"
                    )))
                }
            },
            |_| Ok(()),
        )
        .with_tries(1),
    )?;

    let release = c.add(JobSpec::dummy("ResolveRelease").after(tag).after(target))?;

    let cache = c.add(
        JobSpec::standard(
            "WarmCache",
            |ctx| reached("cache_runs", "cache_success_try", "cache is still cold", ctx),
            |ctx| {
                ctx.global_mut().increment("cache_runs", 1);
                Ok(())
            },
        )
        .with_tries(8)
        .with_retry_delay(0.001),
    )?;

    let build = c.add(
        JobSpec::standard(
            "BuildAssets",
            |ctx| reached("build_runs", "build_success_try", "assets not built", ctx),
            |ctx| {
                ctx.global_mut().increment("build_runs", 1);
                Ok(())
            },
        )
        .after(cache)
        .after(workspace)
        .with_tries(5)
        .with_retry_delay(0.001),
    )?;

    let upload = c.add(
        JobSpec::run_only("UploadArtifacts", |ctx| {
            let runs = ctx.global_mut().increment("upload_runs", 1);
            let needed = ctx.args().get_i64("upload_success_try").unwrap_or(1);
            if runs < needed {
                bail!("artifact store returned 503 (upload {runs})");
            }
            Ok(())
        })
        .after(build)
        .with_tries(3)
        .with_retry_delay(0.001),
    )?;

    let artifacts = c.add(JobSpec::dummy("Artifacts").after(upload))?;

    let lock = c.add(
        JobSpec::standard("AcquireDeployLock", check_flag("deploy_lock"), |ctx| {
            if !ctx.args().get_bool("lock_free") {
                bail!("deploy lock is held by another release");
            }
            ctx.global_mut().insert("deploy_lock", true);
            Ok(())
        })
        .after(workspace)
        .with_tries(2)
        .with_retry_delay(0.001)
        .with_cleanup(|ctx| {
            if ctx.global_mut().remove("deploy_lock").is_some() {
                info!("deploy lock released");
            }
            Ok(())
        }),
    )?;

    let locate = c.add(JobSpec::standard(
        "LocateCredentials",
        |ctx| match ctx.global().get_str("credentials_path") {
            Some(_) => Ok(()),
            None => Err(CheckFailure::not_ready("credentials not located")),
        },
        |ctx| {
            ctx.global_mut().insert("credentials_path", "~/.config/site/token");
            Ok(())
        },
    ))?;

    let credentials = c.add(
        JobSpec::standard(
            "CheckCredentials",
            |ctx| {
                let state = ctx.args().get_str("token_state").unwrap_or("missing");
                if state == "valid" {
                    Ok(())
                } else {
                    let path = ctx
                        .global()
                        .get_str("credentials_path")
                        .context("credentials path vanished")?;
                    Err(CheckFailure::not_ready(format!("token at {path} is {state}")))
                }
            },
            |_| Ok(()),
        )
        .after(locate)
        .with_tries(1),
    )?;

    let mut notifications = Vec::with_capacity(subscribers.len());
    for subscriber in subscribers {
        let who = subscriber.clone();
        let job = c.add(JobSpec::run_only(format!("Notify {subscriber}"), move |ctx| {
            let mut notified: Vec<String> = ctx.global().get_as("notified").unwrap_or_default();
            notified.push(who.clone());
            ctx.global_mut().insert("notified", notified);
            Ok(())
        }))?;
        notifications.push(job);
    }
    let notify = c.add(JobSpec::dummy("NotifySubscribers").after_all(notifications))?;

    let publish = c.add(
        JobSpec::standard(
            "PublishSite",
            |ctx| {
                let tag = ctx.global().get_str("release_tag");
                let published = ctx.global().get_str("published_tag");
                if tag.is_some() && tag == published {
                    Ok(())
                } else {
                    Err(CheckFailure::not_ready("release not published"))
                }
            },
            |ctx| {
                let tag = ctx
                    .global()
                    .get_str("release_tag")
                    .context("no release tag to publish")?
                    .to_string();
                info!(%tag, target = ?ctx.args().get_str("target"), "publishing site");
                ctx.global_mut().insert("published_tag", tag);
                Ok(())
            },
        )
        .after_all([artifacts, release, lock, credentials]),
    )?;

    let root = c.add(
        JobSpec::standard(
            "VerifyDeployment",
            |ctx| {
                ensure_published(ctx)?;
                Ok(())
            },
            |_| Ok(()),
        )
        .after(publish)
        .after(notify),
    )?;

    Ok((c, root))
}

fn check_flag(key: &'static str) -> impl FnMut(&mut JobContext<'_>) -> CheckResult + Send + 'static {
    move |ctx| {
        if ctx.global().get_bool(key) {
            Ok(())
        } else {
            Err(CheckFailure::not_ready(format!("{key} not set")))
        }
    }
}

fn reached(
    counter: &str,
    threshold_arg: &str,
    not_yet: &str,
    ctx: &mut JobContext<'_>,
) -> CheckResult {
    let done = ctx.global().get_i64(counter).unwrap_or(0);
    let needed = ctx.args().get_i64(threshold_arg).unwrap_or(1);
    if done >= needed {
        Ok(())
    } else {
        Err(CheckFailure::not_ready(format!("{not_yet} ({done}/{needed})")))
    }
}

fn ensure_published(ctx: &JobContext<'_>) -> anyhow::Result<()> {
    let tag = ctx.global().get_str("published_tag");
    ensure!(tag.is_some(), "nothing was published");
    Ok(())
}
