use crate::app_error::AppError;
use crate::models::{RecordingSaveOutcome, SessionSnapshot};
use crate::session_actions::SessionController;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const COMMAND_BUFFER: usize = 32;

/// User actions accepted by a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    ChooseRecording { record: bool },
    Pause,
    Resume,
    TogglePause,
    Next,
    Previous,
    JumpTo { index: usize },
    ToggleFocusMode,
    RecordingSaved(RecordingSaveOutcome),
    SaveRecordingNow,
    Restart,
    Exit,
}

pub async fn dispatch(
    controller: &mut SessionController,
    command: SessionCommand,
) -> Result<(), String> {
    tracing::debug!(?command, "session command");
    let result = match command {
        SessionCommand::ChooseRecording { record } => controller.choose_recording(record).await,
        SessionCommand::Pause => controller.pause(),
        SessionCommand::Resume => controller.resume(),
        SessionCommand::TogglePause => controller.toggle_pause().map(|_| ()),
        SessionCommand::Next => controller.next().await.map(|_| ()),
        SessionCommand::Previous => controller.previous().map(|_| ()),
        SessionCommand::JumpTo { index } => controller.jump_to(index).map(|_| ()),
        SessionCommand::ToggleFocusMode => {
            controller.toggle_focus_mode();
            Ok(())
        }
        SessionCommand::RecordingSaved(outcome) => controller.recording_saved(outcome).await,
        SessionCommand::SaveRecordingNow => controller.save_recording_now().await.map(|_| ()),
        SessionCommand::Restart => controller.restart().await,
        SessionCommand::Exit => Ok(()),
    };
    result.map_err(|err| report_error(controller, err))
}

/// Serializes user commands and timer ticks onto one task until the user
/// exits or every command sender is dropped.
pub async fn run_session(
    mut controller: SessionController,
    mut commands: mpsc::Receiver<SessionCommand>,
) -> SessionSnapshot {
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(SessionCommand::Exit) | None => break,
                Some(command) => {
                    let _ = dispatch(&mut controller, command).await;
                }
            },
            Some(tick) = controller.recv_tick() => {
                controller.handle_tick(tick).await;
            }
        }
    }
    controller.exit()
}

pub fn spawn_session(
    controller: SessionController,
) -> (mpsc::Sender<SessionCommand>, JoinHandle<SessionSnapshot>) {
    let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
    let handle = tokio::spawn(run_session(controller, receiver));
    (sender, handle)
}

fn report_error(controller: &SessionController, error: AppError) -> String {
    controller.events().emit_app_error(error.payload());
    if let Some(detail) = error.detail() {
        tracing::warn!(kind = ?error.kind(), %detail, "session command failed");
    } else {
        tracing::warn!(kind = ?error.kind(), message = error.message(), "session command failed");
    }
    error.message().to_string()
}

#[cfg(test)]
mod tests {
    use super::{dispatch, spawn_session, SessionCommand};
    use crate::app_error::AppErrorKind;
    use crate::events::SessionEvent;
    use crate::models::SessionState;
    use crate::navigation::NavigationReason;
    use crate::session_actions::tests::{routine, Harness};
    use tokio::sync::broadcast::error::RecvError;

    #[tokio::test(start_paused = true)]
    async fn session_runs_to_completion_on_its_own_task() {
        let harness = Harness::new(vec![routine("routine-1", &[1])]);
        let mut controller = harness.controller();
        controller.load_routine("routine-1").await.expect("load");
        let mut events = controller.subscribe();

        let (commands, handle) = spawn_session(controller);
        commands
            .send(SessionCommand::ChooseRecording { record: false })
            .await
            .expect("send");

        let mut ticks = 0;
        loop {
            match events.recv().await {
                Ok(SessionEvent::TimerTick(_)) => ticks += 1,
                Ok(SessionEvent::SessionCompleted(summary)) => {
                    assert_eq!(summary.seconds_practiced, 60);
                    break;
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => panic!("session ended early"),
            }
        }
        assert!(ticks > 0);

        commands.send(SessionCommand::Exit).await.expect("exit");
        let snapshot = handle.await.expect("join");
        assert_eq!(snapshot.state, SessionState::Completed);
        assert_eq!(
            harness.navigator.visits.lock().expect("lock").as_slice(),
            &[NavigationReason::Completed]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_command_emits_app_error() {
        let harness = Harness::new(vec![routine("routine-1", &[1])]);
        let mut controller = harness.controller();
        controller.load_routine("routine-1").await.expect("load");
        let mut events = controller.subscribe();

        let message = dispatch(&mut controller, SessionCommand::Pause)
            .await
            .expect_err("not running");
        assert_eq!(message, "That action is not available right now");

        match events.try_recv().expect("event") {
            SessionEvent::AppError(payload) => {
                assert_eq!(payload.kind, AppErrorKind::Session);
                assert!(payload.recoverable);
            }
            other => panic!("unexpected event {}", other.name()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_senders_exits_session() {
        let harness = Harness::new(vec![routine("routine-1", &[5])]);
        let mut controller = harness.controller();
        controller.load_routine("routine-1").await.expect("load");

        let (commands, handle) = spawn_session(controller);
        commands
            .send(SessionCommand::ChooseRecording { record: false })
            .await
            .expect("send");
        commands.send(SessionCommand::Pause).await.expect("send");
        drop(commands);

        let snapshot = handle.await.expect("join");
        assert_eq!(snapshot.state, SessionState::Paused);
        assert_eq!(
            harness.navigator.visits.lock().expect("lock").as_slice(),
            &[NavigationReason::Exited]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn focus_mode_toggles_without_touching_timer() {
        let harness = Harness::new(vec![routine("routine-1", &[1])]);
        let mut controller = harness.controller();
        controller.load_routine("routine-1").await.expect("load");

        dispatch(&mut controller, SessionCommand::ToggleFocusMode)
            .await
            .expect("toggle");
        let snapshot = controller.snapshot();
        assert!(snapshot.focus_mode);
        assert_eq!(snapshot.state, SessionState::AwaitingRecordingChoice);
        assert!(!controller.is_timer_active());
    }
}
