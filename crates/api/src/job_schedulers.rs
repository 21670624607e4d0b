use crate::{
    occurrence::ProcessPendingCallsUseCase, reminder::ProcessDueRemindersUseCase,
    shared::usecase::execute,
};
use carecall_infra::CarecallContext;
use std::{cell::Cell, future::Future, rc::Rc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{info, warn};

/// The interval loops driving the scheduler pass and the voice sweep
pub struct JobSchedulers {
    handles: Vec<JoinHandle<()>>,
}

impl JobSchedulers {
    /// Has to be called from within the actix runtime
    pub fn start(ctx: CarecallContext) -> Self {
        let reminders_ctx = ctx.clone();
        let reminders = start_job(
            "reminders",
            ctx.config.reminder_check_interval,
            move || run_reminders_pass(reminders_ctx.clone()),
        );
        let calls_ctx = ctx.clone();
        let calls = start_job("voice calls", ctx.config.voice_call_interval, move || {
            run_calls_pass(calls_ctx.clone())
        });

        Self {
            handles: vec![reminders, calls],
        }
    }

    pub fn stop(self) {
        for handle in self.handles {
            handle.abort();
        }
        info!("Job schedulers stopped");
    }
}

/// Runs `job` every `period`, the first time one period from now. A tick
/// that comes while the previous run is still going is skipped.
fn start_job<F, Fut>(name: &'static str, period: Duration, job: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + 'static,
    Fut: Future<Output = ()> + 'static,
{
    actix_web::rt::spawn(async move {
        let running = Rc::new(Cell::new(false));
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Started the {} job, running every {:?}", name, period);

        loop {
            interval.tick().await;
            if running.replace(true) {
                warn!(
                    "The previous {} run is still in progress, skipping this tick",
                    name
                );
                continue;
            }

            let running = running.clone();
            let run = job();
            actix_web::rt::spawn(async move {
                run.await;
                running.set(false);
            });
        }
    })
}

async fn run_reminders_pass(ctx: CarecallContext) {
    if let Ok(summary) = execute(ProcessDueRemindersUseCase, &ctx).await {
        if summary.processed > 0 {
            info!(
                "Reminders pass done, processed: {}, successful: {}, failed: {}",
                summary.processed, summary.successful, summary.failed
            );
        }
    }
}

async fn run_calls_pass(ctx: CarecallContext) {
    if let Ok(summary) = execute(ProcessPendingCallsUseCase, &ctx).await {
        if summary.processed > 0 {
            info!(
                "Voice calls pass done, processed: {}, successful: {}, failed: {}",
                summary.processed, summary.successful, summary.failed
            );
        }
    }
}
