#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::time::Instant;
    use tokio_util::bytes::Bytes;

    use crate::api::Stage;
    use crate::events::Framing;
    use crate::session::{
        DEFAULT_GRACE_PERIOD, RunHandle, RunMode, RunSession, RunSnapshot, SessionOptions,
        SessionOutcome, StepStatus, TRANSPORT_FAILURE_TOAST, ToastKind,
    };
    use crate::source::{FrameSource, FrameStream, ReplayFrameSource, TransportError};
    use crate::types::{RunId, StepKey};

    fn sse(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|line| format!("data: {line}\n\n")).collect()
    }

    fn builder_mode() -> RunMode {
        RunMode::Builder {
            stages: vec![Stage::new("10s", 5)],
        }
    }

    fn start(frames: Vec<String>, options: SessionOptions) -> RunHandle {
        RunSession::new(ReplayFrameSource::from_frames(frames), options).start()
    }

    fn quick(mode: RunMode) -> SessionOptions {
        SessionOptions::new(mode).with_grace_period(Duration::ZERO)
    }

    async fn final_snapshot(handle: RunHandle) -> (SessionOutcome, RunSnapshot) {
        let mut rx = handle.snapshots();
        let outcome = handle.wait().await.unwrap();
        let snapshot = rx.wait_for(RunSnapshot::is_final).await.unwrap().clone();
        (outcome, snapshot)
    }

    fn status(snapshot: &RunSnapshot, key: &str) -> StepStatus {
        snapshot
            .steps
            .iter()
            .find(|step| step.key == StepKey::from(key))
            .map(|step| step.status)
            .unwrap()
    }

    #[tokio::test]
    async fn completed_run_navigates_to_result() {
        let handle = start(
            sse(&[
                "PROGRESS:security_headers:start",
                "PROGRESS:security_headers:done",
                "RUN_ID:abc123",
            ]),
            quick(builder_mode()),
        );
        let (outcome, snapshot) = final_snapshot(handle).await;

        assert_eq!(
            outcome,
            SessionOutcome::Succeeded {
                run_id: RunId::new("abc123").unwrap()
            }
        );
        assert_eq!(snapshot.progress, 100);
        assert_eq!(status(&snapshot, "security_headers"), StepStatus::Done);
        assert!(snapshot.steps.iter().all(|s| s.status.is_settled()));
        assert!(!snapshot.loading);
        assert!(!snapshot.panel_open);
        assert_eq!(
            snapshot.navigate_to.map(|route| route.path()),
            Some("/result/abc123".to_string())
        );
        assert_eq!(snapshot.toast.map(|t| t.kind), Some(ToastKind::Success));
    }

    #[tokio::test]
    async fn error_then_close_fails_with_error_message() {
        let handle = start(
            sse(&["PROGRESS:load:start", "ERROR: upstream timeout"]),
            quick(builder_mode()),
        );
        let (outcome, snapshot) = final_snapshot(handle).await;

        assert_eq!(outcome, SessionOutcome::failed("upstream timeout"));
        assert!(snapshot.panel_open);
        assert!(snapshot.navigate_to.is_none());
        assert!(snapshot.log.contains(&"ERROR: upstream timeout".to_string()));
        assert_eq!(snapshot.toast.map(|t| t.kind), Some(ToastKind::Error));
    }

    #[tokio::test]
    async fn close_without_marker_fails() {
        let handle = start(
            sse(&["starting k6", "PROGRESS:ssl:done", "__FINISHED__"]),
            quick(RunMode::Script),
        );
        let (outcome, snapshot) = final_snapshot(handle).await;

        assert_eq!(outcome, SessionOutcome::failed("execution failed"));
        assert_eq!(snapshot.progress, 88);
        assert_eq!(snapshot.log, vec!["starting k6".to_string()]);
    }

    #[tokio::test]
    async fn failed_sentinel_fails_without_touching_progress() {
        let handle = start(sse(&["__FAILED__"]), quick(builder_mode()));
        let (outcome, snapshot) = final_snapshot(handle).await;

        assert_eq!(outcome, SessionOutcome::failed("execution failed"));
        assert_eq!(snapshot.progress, 0);
    }

    #[tokio::test]
    async fn marker_split_across_fragments_is_one_line() {
        let frames = vec![
            "data: PROGRESS:ss".to_string(),
            "l:done\n\ndata: RUN_".to_string(),
            "ID:xyz".to_string(),
            "\n\n".to_string(),
        ];
        let (outcome, snapshot) = final_snapshot(start(frames, quick(builder_mode()))).await;

        assert_eq!(
            outcome,
            SessionOutcome::Succeeded {
                run_id: RunId::new("xyz").unwrap()
            }
        );
        assert_eq!(status(&snapshot, "ssl"), StepStatus::Done);
    }

    #[tokio::test]
    async fn second_terminal_marker_is_ignored() {
        let handle = start(
            sse(&["__FAILED__", "RUN_ID:late", "after the end"]),
            quick(builder_mode()),
        );
        let (outcome, snapshot) = final_snapshot(handle).await;

        assert_eq!(outcome, SessionOutcome::failed("execution failed"));
        assert!(snapshot.navigate_to.is_none());
        assert!(snapshot.log.is_empty());
    }

    #[tokio::test]
    async fn plain_framing_reads_bare_lines() {
        let frames = vec!["PROGRESS:wpt:skip\nRUN_ID:plain-1".to_string()];
        let options = quick(RunMode::Script).with_framing(Framing::Plain);
        let (outcome, snapshot) = final_snapshot(start(frames, options)).await;

        assert!(outcome.is_success());
        assert_eq!(status(&snapshot, "wpt"), StepStatus::Skip);
    }

    #[tokio::test]
    async fn builder_ticks_advance_but_script_ticks_only_log() {
        let ticks = sse(&["running (0m01s)", "running (0m02s)", "running (0m03s)"]);

        let (_, builder) = final_snapshot(start(ticks.clone(), quick(builder_mode()))).await;
        assert_eq!(builder.progress, 30);
        assert_eq!(builder.log.len(), 3);

        let (_, script) = final_snapshot(start(ticks, quick(RunMode::Script))).await;
        assert_eq!(script.progress, 0);
        assert_eq!(script.log.len(), 3);
    }

    #[tokio::test]
    async fn concurrent_sessions_are_isolated() {
        let first = start(
            sse(&["PROGRESS:ssl:done", "ERROR: first only"]),
            quick(builder_mode()),
        );
        let second = start(
            sse(&["PROGRESS:lighthouse:skip", "RUN_ID:second"]),
            quick(builder_mode()),
        );
        assert_ne!(first.id(), second.id());

        let ((first_outcome, first_snap), (second_outcome, second_snap)) =
            tokio::join!(final_snapshot(first), final_snapshot(second));

        assert_eq!(first_outcome, SessionOutcome::failed("first only"));
        assert_eq!(first_snap.progress, 88);
        assert_eq!(status(&first_snap, "lighthouse"), StepStatus::Pending);

        assert!(second_outcome.is_success());
        assert_eq!(status(&second_snap, "ssl"), StepStatus::Done);
        assert_eq!(status(&second_snap, "lighthouse"), StepStatus::Skip);
        assert!(second_snap.log.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn success_stays_visible_for_grace_period() {
        let handle = start(
            sse(&["RUN_ID:grace"]),
            SessionOptions::new(builder_mode()),
        );
        let mut rx = handle.snapshots();
        let started = Instant::now();

        let outcome = handle.wait().await.unwrap();
        assert!(outcome.is_success());
        {
            let visible = rx.borrow_and_update();
            assert_eq!(visible.progress, 100);
            assert!(visible.panel_open);
            assert!(visible.navigate_to.is_none());
        }

        let navigated = rx.wait_for(RunSnapshot::is_final).await.unwrap().clone();
        assert!(started.elapsed() >= DEFAULT_GRACE_PERIOD);
        assert!(!navigated.panel_open);
        assert_eq!(navigated.navigate_to.unwrap().path(), "/result/grace");
    }

    #[tokio::test]
    async fn detached_session_runs_to_completion() {
        let handle = start(
            sse(&["PROGRESS:load:done", "RUN_ID:detached"]),
            quick(builder_mode()),
        );
        handle.detach().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_resolves_as_unterminated() {
        let source = ReplayFrameSource::from_frames(sse(&["ERROR: boom", "RUN_ID:never"]))
            .with_pace(Duration::from_secs(10));
        let handle = RunSession::new(source, quick(builder_mode())).start();
        let mut rx = handle.snapshots();

        rx.wait_for(|snapshot| !snapshot.log.is_empty()).await.unwrap();
        handle.cancel();

        assert_eq!(handle.wait().await.unwrap(), SessionOutcome::failed("boom"));
    }

    #[tokio::test]
    async fn empty_stream_is_a_transport_failure() {
        let (outcome, snapshot) = final_snapshot(start(vec![], quick(builder_mode()))).await;

        assert_eq!(outcome, SessionOutcome::failed("execution failed"));
        let toast = snapshot.toast.unwrap();
        assert_eq!(toast.kind, ToastKind::Error);
        assert!(toast.message.starts_with(TRANSPORT_FAILURE_TOAST));
    }

    struct BrokenSource {
        before_failure: Vec<Bytes>,
        fail_to_open: bool,
    }

    #[async_trait]
    impl FrameSource for BrokenSource {
        async fn open(&self) -> Result<FrameStream, TransportError> {
            if self.fail_to_open {
                return Err(TransportError::Interrupted {
                    details: "connection refused".to_string(),
                });
            }
            let frames = self.before_failure.clone();
            Ok(Box::pin(async_stream::stream! {
                for frame in frames {
                    yield Ok(frame);
                }
                yield Err(TransportError::Interrupted {
                    details: "connection reset".to_string(),
                });
            }))
        }
    }

    #[tokio::test]
    async fn open_failure_fails_the_session() {
        let source = BrokenSource {
            before_failure: vec![],
            fail_to_open: true,
        };
        let handle = RunSession::new(source, quick(builder_mode())).start();
        let (outcome, snapshot) = final_snapshot(handle).await;

        assert_eq!(outcome, SessionOutcome::failed("execution failed"));
        assert!(snapshot.toast.unwrap().message.contains("connection refused"));
    }

    #[tokio::test]
    async fn mid_stream_failure_uses_last_error() {
        let source = BrokenSource {
            before_failure: vec![Bytes::from_static(b"data: ERROR: scanner crashed\n\n")],
            fail_to_open: false,
        };
        let handle = RunSession::new(source, quick(builder_mode())).start();
        let (outcome, snapshot) = final_snapshot(handle).await;

        assert_eq!(outcome, SessionOutcome::failed("scanner crashed"));
        assert!(snapshot.toast.unwrap().message.contains("connection reset"));
    }

    #[tokio::test]
    async fn failure_after_outcome_keeps_success() {
        let source = BrokenSource {
            before_failure: vec![Bytes::from_static(b"data: RUN_ID:kept\n\n")],
            fail_to_open: false,
        };
        let handle = RunSession::new(source, quick(builder_mode())).start();
        let (outcome, snapshot) = final_snapshot(handle).await;

        assert!(outcome.is_success());
        assert_eq!(snapshot.toast.map(|t| t.kind), Some(ToastKind::Success));
    }
}
