use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use backend::{ApiError, Backend, InMemoryBackend, ProgressApi};
use learn_core::model::{
    Item, ItemId, ItemKind, Module, ModuleId, ProgressSnapshot, Unit, UnitId,
};
use learn_core::sequence::{ContinueTarget, Position};
use services::{AdvanceOutcome, AppServices, CompletionStatus, MarkOutcome, ProgressStore};
use tokio::sync::oneshot;

type Reply = Result<Option<ProgressSnapshot>, ApiError>;

/// Progress API whose mark-complete answers are released by the test.
#[derive(Default)]
struct ScriptedApi {
    replies: Mutex<VecDeque<oneshot::Receiver<Reply>>>,
}

impl ScriptedApi {
    fn script(&self) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back(rx);
        tx
    }

    fn waiting(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl ProgressApi for ScriptedApi {
    async fn get_all_progress(&self) -> Result<Vec<ProgressSnapshot>, ApiError> {
        Ok(Vec::new())
    }

    async fn get_progress(&self, _module_id: &ModuleId) -> Result<ProgressSnapshot, ApiError> {
        Err(ApiError::NotFound)
    }

    async fn mark_item_complete(
        &self,
        _module_id: &ModuleId,
        _unit_id: &UnitId,
        _item_id: &ItemId,
    ) -> Result<Option<ProgressSnapshot>, ApiError> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("a scripted reply");
        reply
            .await
            .unwrap_or_else(|_| Err(ApiError::Unavailable("reply dropped".into())))
    }
}

fn ids() -> (ModuleId, UnitId, ItemId) {
    (ModuleId::new("m1"), UnitId::new("u1"), ItemId::new("i1"))
}

fn confirmed() -> Reply {
    Ok(Some(ProgressSnapshot::from_item_ids(
        ModuleId::new("m1"),
        [ItemId::new("i1")],
    )))
}

fn spawn_mark(store: &ProgressStore) -> tokio::task::JoinHandle<MarkOutcome> {
    let store = store.clone();
    tokio::spawn(async move {
        let (module_id, unit_id, item_id) = ids();
        store.mark_complete(&module_id, &unit_id, &item_id).await
    })
}

async fn until_waiting(api: &ScriptedApi, remaining: usize) {
    while api.waiting() > remaining {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn stale_rollback_after_newer_success_is_ignored() {
    let api = Arc::new(ScriptedApi::default());
    let first_reply = api.script();
    let second_reply = api.script();
    let store = ProgressStore::new(api.clone());

    let first = spawn_mark(&store);
    until_waiting(&api, 1).await;
    assert!(store.is_completed(&ItemId::new("i1")));

    let second = spawn_mark(&store);
    until_waiting(&api, 0).await;

    second_reply.send(confirmed()).unwrap();
    assert_eq!(second.await.unwrap(), MarkOutcome::Confirmed);

    first_reply
        .send(Err(ApiError::Unavailable("timed out".into())))
        .unwrap();
    assert_eq!(first.await.unwrap(), MarkOutcome::Superseded);

    assert!(store.is_completed(&ItemId::new("i1")));
}

#[tokio::test]
async fn newest_failure_restores_state_from_before_first_request() {
    let api = Arc::new(ScriptedApi::default());
    let first_reply = api.script();
    let second_reply = api.script();
    let store = ProgressStore::new(api.clone());

    let first = spawn_mark(&store);
    until_waiting(&api, 1).await;
    let second = spawn_mark(&store);
    until_waiting(&api, 0).await;

    second_reply.send(Ok(None)).unwrap();
    assert_eq!(second.await.unwrap(), MarkOutcome::RolledBack);
    assert!(!store.is_completed(&ItemId::new("i1")));

    first_reply.send(confirmed()).unwrap();
    assert_eq!(first.await.unwrap(), MarkOutcome::Superseded);
    assert!(!store.is_completed(&ItemId::new("i1")));
}

#[tokio::test]
async fn superseded_confirmation_still_refreshes_snapshot() {
    let api = Arc::new(ScriptedApi::default());
    let first_reply = api.script();
    let second_reply = api.script();
    let store = ProgressStore::new(api.clone());

    let first = spawn_mark(&store);
    until_waiting(&api, 1).await;
    let second = spawn_mark(&store);
    until_waiting(&api, 0).await;

    let revision = store.revision();
    first_reply.send(confirmed()).unwrap();
    assert_eq!(first.await.unwrap(), MarkOutcome::Superseded);

    let cached = store.snapshot(&ModuleId::new("m1")).expect("confirmed record cached");
    assert_eq!(cached.completed_items.len(), 1);
    assert!(store.revision() > revision);

    second_reply.send(confirmed()).unwrap();
    assert_eq!(second.await.unwrap(), MarkOutcome::Confirmed);
    assert!(store.is_completed(&ItemId::new("i1")));
}

#[tokio::test]
async fn hydrate_supersedes_in_flight_requests() {
    let api = Arc::new(ScriptedApi::default());
    let reply = api.script();
    let store = ProgressStore::new(api.clone());

    let pending = spawn_mark(&store);
    until_waiting(&api, 0).await;

    store.hydrate(Vec::new());
    reply.send(confirmed()).unwrap();

    assert_eq!(pending.await.unwrap(), MarkOutcome::Superseded);
    assert!(!store.is_completed(&ItemId::new("i1")));
    assert!(store.snapshot(&ModuleId::new("m1")).is_none());
}

fn course() -> Module {
    Module::new(
        ModuleId::new("rust-101"),
        "Rust 101",
        "Ownership from the ground up",
        vec![
            Unit::new(
                UnitId::new("intro"),
                "Intro",
                vec![
                    Item::new(ItemId::new("welcome"), "Welcome", ItemKind::Video)
                        .with_duration("3 min")
                        .with_video_url("https://videos.example/welcome"),
                    Item::new(ItemId::new("setup"), "Setup", ItemKind::Reading),
                ],
            ),
            Unit::new(
                UnitId::new("basics"),
                "Basics",
                vec![Item::new(ItemId::new("lesson1"), "Lesson 1", ItemKind::Article)],
            ),
        ],
    )
    .unwrap()
}

#[tokio::test]
async fn app_services_learning_loop() {
    let backend = InMemoryBackend::new();
    backend.insert_module(course()).unwrap();
    backend
        .set_progress(ProgressSnapshot::from_item_ids(
            ModuleId::new("rust-101"),
            [ItemId::new("welcome")],
        ))
        .unwrap();

    let app = AppServices::new(Backend::from_in_memory(&backend));
    assert!(app.start_session().await);

    let module = app.open_module(&ModuleId::new("rust-101")).await.unwrap();
    let store = app.store();
    assert_eq!(store.module_percentage(&module), 33);

    let learning = app.learning();
    let mut position = match learning.continue_learning(&module) {
        ContinueTarget::Resume(target) => target.position(),
        other => panic!("expected resume, got {other:?}"),
    };
    assert_eq!(position, Position::new(UnitId::new("intro"), ItemId::new("setup")));

    loop {
        match learning.mark_and_advance(&module, &position).await {
            AdvanceOutcome::Advanced {
                status,
                next: Some(next),
            } => {
                assert_eq!(status, CompletionStatus::Marked(MarkOutcome::Confirmed));
                position = next;
            }
            AdvanceOutcome::Advanced { next: None, .. } => break,
            AdvanceOutcome::NotInModule => panic!("position escaped the module"),
        }
    }

    let progress = store.module_progress(&module);
    assert!(progress.is_complete);
    assert_eq!(progress.percentage, 100);
    assert!(matches!(
        learning.continue_learning(&module),
        ContinueTarget::Review(_)
    ));

    let recorded = backend.get_progress(&ModuleId::new("rust-101")).await.unwrap();
    assert_eq!(recorded.completed_items.len(), 3);
}

#[tokio::test]
async fn offline_backend_degrades_softly() {
    let backend = InMemoryBackend::new();
    backend.insert_module(course()).unwrap();
    backend.fail_progress_reads(true);
    backend.fail_marks(true);

    let app = AppServices::new(Backend::from_in_memory(&backend));
    assert!(!app.start_session().await);

    let module = app.open_module(&ModuleId::new("rust-101")).await.unwrap();
    let outcome = app
        .learning()
        .mark_and_advance(
            &module,
            &Position::new(UnitId::new("basics"), ItemId::new("lesson1")),
        )
        .await;

    assert_eq!(
        outcome,
        AdvanceOutcome::Advanced {
            status: CompletionStatus::Marked(MarkOutcome::RolledBack),
            next: None,
        }
    );
    assert_eq!(app.store().module_percentage(&module), 0);
    assert!(app.open_module(&ModuleId::new("missing")).await.is_err());
}
