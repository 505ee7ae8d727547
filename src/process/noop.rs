use crate::context::Context;
use crate::error::ProcessError;
use crate::process::Process;

/// Process named `noop` that does nothing until cancelled.
///
/// Returns the cancellation cause, which the supervisor treats as a clean exit.
pub fn noop() -> Process {
    Process::new("noop", |ctx: Context| async move {
        Err::<(), ProcessError>(ctx.cancelled().await.into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Cause;

    #[tokio::test]
    async fn test_noop_returns_cause() {
        let ctx = Context::background();
        ctx.cancel();
        let run = noop().run_fn().unwrap().clone();
        assert_eq!(run(ctx).await, Err(ProcessError::Canceled(Cause::Canceled)));
    }
}
