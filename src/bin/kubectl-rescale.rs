use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;

use kubectl_rescale::{
    context, resolve, run_cycle, CancelToken, CycleOptions, KubeWorkloadApi, ScaleCycleRequest,
};

const EXAMPLES: &str = "\
Examples:
  # scale a deployment to 0 replicas then back up to the original count
  kubectl rescale deployment/nginx

  # scale a statefulset to 0 replicas then back up, waiting up to 600 seconds
  kubectl rescale statefulset/mysql --max-wait-seconds=600

  # short names work too
  kubectl rescale sts/mysql

  # without a kind, a deployment is tried first, then a statefulset
  kubectl rescale nginx -n dev";

/// Scale a deployment or statefulset to 0 then back up
#[derive(Clone, Debug, Parser)]
#[clap(name = "kubectl-rescale", version, after_help = EXAMPLES)]
struct Opts {
    /// Deployment or statefulset to rescale, as [kind/]name
    #[clap(value_name = "NAME")]
    targets: Vec<String>,

    /// Namespace of the workload; defaults to the context's namespace
    #[clap(short, long)]
    namespace: Option<String>,

    /// Kubeconfig context to use; defaults to the current context
    #[clap(long)]
    context: Option<String>,

    /// Path to the kubeconfig file
    #[clap(long)]
    kubeconfig: Option<PathBuf>,

    /// Max number of seconds to wait for the scale-down to complete
    #[clap(short = 'w', long, default_value = "300", allow_negative_numbers = true)]
    max_wait_seconds: i64,

    /// Update the scale with a resourceVersion precondition and retry on conflict
    #[clap(long)]
    guard_conflicts: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    match rescale(Opts::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", render(&err));
            ExitCode::FAILURE
        }
    }
}

async fn rescale(opts: Opts) -> anyhow::Result<()> {
    let request = ScaleCycleRequest::new(&opts.targets, opts.max_wait_seconds)?;

    let (client, selection) = context::connect(
        opts.kubeconfig.as_deref(),
        opts.context.as_deref(),
        opts.namespace.as_deref(),
    )
    .await?;
    let api = KubeWorkloadApi::new(client).with_conflict_guard(opts.guard_conflicts);

    let workload = resolve(&api, &request.target, &selection.namespace).await?;

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, on_interrupt).await {
            std::process::exit(130);
        }
    });

    run_cycle(
        &api,
        &workload,
        request.max_wait_seconds,
        &CycleOptions::default(),
        &cancel,
        |event| println!("{event}"),
    )
    .await?;

    Ok(())
}

fn render(err: &anyhow::Error) -> String {
    format!("Error: {err}")
}

/// Cancel on the first interrupt. Returns `true` on a second one, when the
/// caller should exit without waiting for the cycle to unwind.
async fn watch_interrupts<F, Fut>(mut interrupted: F, cancel: CancelToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    while interrupted().await.is_ok() {
        if cancel.is_cancelled() {
            log::warn!("interrupted again, exiting");
            return true;
        }
        log::warn!("interrupted, stopping the wait (press Ctrl-C again to exit)");
        cancel.cancel();
    }
    false
}
