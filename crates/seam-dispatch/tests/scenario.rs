//! End-to-end dispatch scenarios: validated machines, an in-memory store and
//! a channel notifier standing in for the executors.

use std::sync::Arc;

use seam_config::MachineDocument;
use seam_dispatch::{
  ChannelNotifier, DispatchError, Dispatcher, EventRequest, RETRY_FAILED_TASKS,
  RETRY_PENDING_TASKS, TASK_COMPLETED, TASK_ERROR, TaskNotification,
};
use seam_machine::{MachineError, StateMachine};
use seam_registry::MachineRegistry;
use seam_stack::{StackError, TaskStatus};
use seam_store::{MemoryStore, StackStore};
use tokio::sync::mpsc::UnboundedReceiver;

const LAUNCH_MACHINE: &str = r#"
version: 1
events: [LAUNCH]
states:
  INIT:
    on:
      LAUNCH:
        - action: advance
          state: PROVISION
  PROVISION:
    tasks: [setup-machines]
    on:
      NEXT:
        - action: advance
          state: LAUNCH
  LAUNCH:
    tasks: [launch-tasks]
    on:
      NEXT:
        - action: advance
          state: RUN
  RUN:
    terminal: true
tasks:
  setup-machines:
    executor: terraform
    config:
      source:
        type: s3
        bucket: infra-scripts
        key: qa/machines
      action: apply
  launch-tasks:
    executor: lambda
    config:
      name: launch-tasks
"#;

const QA_MACHINE: &str = r#"
version: 1
events: [LAUNCH, DESTROY]
states:
  INIT:
    on:
      LAUNCH:
        - action: advance
          state: PROVISION
  PROVISION:
    tasks: [setup-machines, setup-dns]
    on:
      NEXT:
        - action: advance
          state: RUN
      DESTROY:
        - action: advance
          state: TEARDOWN
  RUN:
    on:
      DESTROY:
        - action: advance
          state: TEARDOWN
  TEARDOWN:
    tasks: [destroy-machines]
    on:
      NEXT:
        - action: advance
          state: DONE
  DONE:
    terminal: true
tasks:
  setup-machines:
    executor: lambda
    config:
      name: machines
  setup-dns:
    executor: lambda
    config:
      name: dns-setup
  destroy-machines:
    executor: terraform
    config:
      source:
        type: local
        location: /opt/terraform/machines
      action: destroy
"#;

struct Harness {
  dispatcher: Dispatcher,
  store: Arc<MemoryStore>,
  notifications: UnboundedReceiver<TaskNotification>,
}

impl Harness {
  fn new() -> Self {
    let registry = MachineRegistry::new()
      .with_machine("launch", load(LAUNCH_MACHINE))
      .unwrap()
      .with_machine("qa", load(QA_MACHINE))
      .unwrap();

    let store = Arc::new(MemoryStore::new());
    let (notifier, notifications) = ChannelNotifier::channel();
    let dispatcher = Dispatcher::new(store.clone(), Arc::new(registry), Arc::new(notifier));

    Self {
      dispatcher,
      store,
      notifications,
    }
  }

  /// Drain the notifications sent so far.
  fn sent(&mut self) -> Vec<TaskNotification> {
    let mut sent = Vec::new();
    while let Ok(notification) = self.notifications.try_recv() {
      sent.push(notification);
    }
    sent
  }

  fn sent_names(&mut self) -> Vec<String> {
    self.sent().into_iter().map(|n| n.task.name).collect()
  }
}

fn load(yaml: &str) -> StateMachine {
  let document = MachineDocument::from_yaml_str(yaml).unwrap();
  StateMachine::new(seam_validator::validate(&document).unwrap())
}

#[tokio::test]
async fn test_launch_to_run_lifecycle() {
  let mut harness = Harness::new();

  let outcome = harness
    .dispatcher
    .dispatch(EventRequest::new("crest-1234", "LAUNCH").with_machine("launch"))
    .await
    .unwrap();
  assert_eq!(outcome.stack.state(), "PROVISION");
  assert_eq!(outcome.stack.tasks().len(), 1);
  assert_eq!(outcome.stack.tasks()[0].status, TaskStatus::Pending);

  let sent = harness.sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].task.name, "setup-machines");
  assert_eq!(sent[0].stack.state(), "PROVISION");

  // The executor replies through the normal event path.
  let outcome = harness
    .dispatcher
    .dispatch(sent[0].completed().into())
    .await
    .unwrap();
  assert_eq!(outcome.stack.state(), "LAUNCH");
  assert_eq!(outcome.stack.previous_state(), Some("PROVISION"));
  assert_eq!(harness.sent_names(), vec!["launch-tasks"]);

  let outcome = harness
    .dispatcher
    .dispatch(EventRequest::new("crest-1234", TASK_COMPLETED).with_task("launch-tasks"))
    .await
    .unwrap();
  assert_eq!(outcome.stack.state(), "RUN");
  assert!(outcome.stack.tasks().is_empty());
  assert!(outcome.removed);
  assert!(harness.sent().is_empty());
  assert!(harness.store.is_empty());
}

#[tokio::test]
async fn test_event_after_removal_starts_fresh() {
  let mut harness = Harness::new();

  for request in [
    EventRequest::new("master", "LAUNCH").with_machine("launch"),
    EventRequest::new("master", TASK_COMPLETED).with_task("setup-machines"),
    EventRequest::new("master", TASK_COMPLETED).with_task("launch-tasks"),
  ] {
    harness.dispatcher.dispatch(request).await.unwrap();
  }
  assert!(harness.store.is_empty());

  let outcome = harness
    .dispatcher
    .dispatch(EventRequest::new("master", "LAUNCH").with_machine("launch"))
    .await
    .unwrap();
  assert_eq!(outcome.stack.state(), "PROVISION");
  assert_eq!(outcome.stack.previous_state(), Some("INIT"));
}

#[tokio::test]
async fn test_task_error_and_retry() {
  let mut harness = Harness::new();

  harness
    .dispatcher
    .dispatch(EventRequest::new("master", "LAUNCH").with_machine("qa"))
    .await
    .unwrap();
  assert_eq!(harness.sent_names(), vec!["setup-machines", "setup-dns"]);

  let outcome = harness
    .dispatcher
    .dispatch(
      EventRequest::new("master", TASK_ERROR)
        .with_task("setup-dns")
        .with_description("disk full"),
    )
    .await
    .unwrap();
  assert!(outcome.stack.has_error());
  assert!(!outcome.stack.is_satisfied());
  assert_eq!(
    outcome.stack.get_task("setup-dns").unwrap().error_message.as_deref(),
    Some("disk full")
  );
  assert!(outcome.notified.is_empty());

  let outcome = harness
    .dispatcher
    .dispatch(EventRequest::new("master", RETRY_FAILED_TASKS))
    .await
    .unwrap();
  assert!(!outcome.stack.has_error());
  assert_eq!(outcome.stack.state(), "PROVISION");
  assert_eq!(
    outcome.stack.get_task("setup-dns").unwrap().status,
    TaskStatus::Pending
  );
  assert_eq!(harness.sent_names(), vec!["setup-dns"]);

  let saved = harness.store.find_stack("master").await.unwrap().unwrap();
  assert_eq!(saved, outcome.stack);
}

#[tokio::test]
async fn test_retry_pending_only_renotifies() {
  let mut harness = Harness::new();

  harness
    .dispatcher
    .dispatch(EventRequest::new("master", "LAUNCH").with_machine("qa"))
    .await
    .unwrap();
  harness
    .dispatcher
    .dispatch(EventRequest::new("master", TASK_COMPLETED).with_task("setup-machines"))
    .await
    .unwrap();
  harness.sent();

  let before = harness.store.find_stack("master").await.unwrap().unwrap();
  let outcome = harness
    .dispatcher
    .dispatch(EventRequest::new("master", RETRY_PENDING_TASKS))
    .await
    .unwrap();

  assert_eq!(outcome.notified, vec!["setup-dns"]);
  assert_eq!(outcome.stack, before);
  assert_eq!(harness.sent_names(), vec!["setup-dns"]);
}

#[tokio::test]
async fn test_destroy_from_unsatisfied_state() {
  let mut harness = Harness::new();

  harness
    .dispatcher
    .dispatch(EventRequest::new("master", "LAUNCH").with_machine("qa"))
    .await
    .unwrap();
  harness.sent();

  let outcome = harness
    .dispatcher
    .dispatch(EventRequest::new("master", "DESTROY"))
    .await
    .unwrap();
  assert_eq!(outcome.stack.state(), "TEARDOWN");
  assert_eq!(harness.sent_names(), vec!["destroy-machines"]);

  let outcome = harness
    .dispatcher
    .dispatch(EventRequest::new("master", TASK_COMPLETED).with_task("destroy-machines"))
    .await
    .unwrap();
  assert_eq!(outcome.stack.state(), "DONE");
  assert!(outcome.removed);
}

#[tokio::test]
async fn test_external_next_is_rejected() {
  let mut harness = Harness::new();

  harness
    .dispatcher
    .dispatch(EventRequest::new("master", "LAUNCH").with_machine("qa"))
    .await
    .unwrap();
  let before = harness.store.find_stack("master").await.unwrap();

  let err = harness
    .dispatcher
    .dispatch(EventRequest::new("master", "NEXT"))
    .await
    .unwrap_err();
  assert!(matches!(err, DispatchError::ReservedEvent { .. }));
  assert_eq!(harness.store.find_stack("master").await.unwrap(), before);
}

#[tokio::test]
async fn test_unavailable_event_is_not_persisted() {
  let mut harness = Harness::new();

  harness
    .dispatcher
    .dispatch(EventRequest::new("master", "LAUNCH").with_machine("qa"))
    .await
    .unwrap();
  harness.sent();

  let err = harness
    .dispatcher
    .dispatch(EventRequest::new("master", "LAUNCH"))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    DispatchError::Machine(MachineError::ActionNotAvailable { .. })
  ));

  let saved = harness.store.find_stack("master").await.unwrap().unwrap();
  assert_eq!(saved.state(), "PROVISION");
  assert!(harness.sent().is_empty());
}

#[tokio::test]
async fn test_machine_mismatch() {
  let harness = Harness::new();

  harness
    .dispatcher
    .dispatch(EventRequest::new("master", "LAUNCH").with_machine("qa"))
    .await
    .unwrap();

  let err = harness
    .dispatcher
    .dispatch(EventRequest::new("master", "DESTROY").with_machine("launch"))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    DispatchError::Stack(StackError::MachineChange { .. })
  ));

  // Repeating the recorded machine is fine.
  harness
    .dispatcher
    .dispatch(EventRequest::new("master", "DESTROY").with_machine("qa"))
    .await
    .unwrap();
}

#[tokio::test]
async fn test_unknown_task_on_stack() {
  let harness = Harness::new();

  harness
    .dispatcher
    .dispatch(EventRequest::new("master", "LAUNCH").with_machine("qa"))
    .await
    .unwrap();

  let err = harness
    .dispatcher
    .dispatch(EventRequest::new("master", TASK_COMPLETED).with_task("launch-tasks"))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    DispatchError::Machine(MachineError::Stack(StackError::TaskNotFound { .. }))
  ));
}

#[tokio::test]
async fn test_legacy_action_field() {
  let mut harness = Harness::new();

  let request = EventRequest {
    stack_id: Some("master".to_string()),
    action: Some("LAUNCH".to_string()),
    machine: Some("qa".to_string()),
    ..EventRequest::default()
  };
  let outcome = harness.dispatcher.dispatch(request).await.unwrap();

  assert_eq!(outcome.stack.state(), "PROVISION");
  assert_eq!(harness.sent().len(), 2);
}

#[tokio::test]
async fn test_metadata_is_merged() {
  let harness = Harness::new();

  harness
    .dispatcher
    .dispatch(
      EventRequest::new("master", "LAUNCH")
        .with_machine("qa")
        .with_metadata("slug", "t-1")
        .with_metadata("owner", "infra"),
    )
    .await
    .unwrap();

  let outcome = harness
    .dispatcher
    .dispatch(EventRequest::new("master", RETRY_PENDING_TASKS).with_metadata("slug", "t-2"))
    .await
    .unwrap();

  let metadata = outcome.stack.metadata();
  assert_eq!(metadata["slug"], "t-2");
  assert_eq!(metadata["owner"], "infra");
}

#[tokio::test]
async fn test_nested_metadata_is_rejected() {
  let harness = Harness::new();

  let err = harness
    .dispatcher
    .dispatch(
      EventRequest::new("master", "LAUNCH")
        .with_machine("qa")
        .with_metadata("labels", serde_json::json!({ "team": "infra" })),
    )
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    DispatchError::Stack(StackError::NestedMetadata { .. })
  ));
  assert!(harness.store.is_empty());
}
