use std::future::Future;
use std::sync::Arc;

use taskflow_shared::{normalize_title, Priority, Suggestion, Task};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api::TaskApi;
use crate::reconcile::{Mutation, TaskList, Ticket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddState {
    Idle,
    Submitting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionState {
    Idle,
    Pending { task_id: Uuid },
    Resolved { task_id: Uuid, suggestion: Suggestion },
}

/// Results of background work, fed back through [`App::handle_event`].
/// `tasks` is the refetch that follows every mutation; `None` when the
/// refetch itself failed.
#[derive(Debug)]
pub enum AppEvent {
    SuggestionReady {
        task_id: Uuid,
        suggestion: Option<Suggestion>,
    },
    MutationSettled {
        ticket: Ticket,
        confirmed: bool,
        tasks: Option<Vec<Task>>,
    },
    AddFinished {
        created: bool,
        tasks: Option<Vec<Task>>,
    },
    Refreshed {
        tasks: Option<Vec<Task>>,
    },
}

pub struct App {
    api: Arc<dyn TaskApi>,
    tasks: TaskList,
    load: LoadState,
    add: AddState,
    suggestion: SuggestionState,
    events: mpsc::UnboundedSender<AppEvent>,
}

async fn fetch(api: &dyn TaskApi) -> Option<Vec<Task>> {
    match api.list().await {
        Ok(tasks) => Some(tasks),
        Err(err) => {
            log::error!("fetch error: {err}");
            None
        }
    }
}

impl App {
    pub fn new(api: Arc<dyn TaskApi>) -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let app = Self {
            api,
            tasks: TaskList::new(),
            load: LoadState::Loading,
            add: AddState::Idle,
            suggestion: SuggestionState::Idle,
            events,
        };
        (app, rx)
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.view()
    }

    pub fn counts(&self) -> (usize, usize) {
        self.tasks.counts()
    }

    pub fn load_state(&self) -> LoadState {
        self.load
    }

    pub fn add_state(&self) -> AddState {
        self.add
    }

    pub fn suggestion_state(&self) -> &SuggestionState {
        &self.suggestion
    }

    /// Initial fetch. Leaves `Loading` whether or not the fetch worked.
    pub async fn load(&mut self) {
        if let Some(tasks) = fetch(self.api.as_ref()).await {
            self.tasks.resync(tasks);
        }
        self.load = LoadState::Ready;
    }

    fn spawn<F>(&self, work: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let events = self.events.clone();
        tokio::spawn(async move {
            // The receiver only disappears on shutdown.
            let _ = events.send(work.await);
        });
    }

    /// Submits a new task in the background. Returns `false` when the title
    /// is blank or another submit is still in flight.
    pub fn add(&mut self, title: &str, priority: Priority) -> bool {
        let Some(title) = normalize_title(title) else {
            return false;
        };
        if self.add == AddState::Submitting {
            return false;
        }

        self.add = AddState::Submitting;
        let api = Arc::clone(&self.api);
        let title = title.to_string();
        self.spawn(async move {
            let created = match api.create(&title, priority).await {
                Ok(task) => {
                    log::info!("added task {}", task.id);
                    true
                }
                Err(err) => {
                    log::error!("add error: {err}");
                    false
                }
            };
            AppEvent::AddFinished {
                created,
                tasks: fetch(api.as_ref()).await,
            }
        });
        true
    }

    /// Flips the flag locally right away; the server call settles later.
    pub fn toggle(&mut self, id: Uuid) -> Option<Ticket> {
        let completed = !self.tasks.get(id)?.completed;
        let ticket = self.tasks.apply(Mutation::SetCompleted { id, completed });

        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let confirmed = match api.set_completed(id, completed).await {
                Ok(_) => true,
                Err(err) => {
                    log::error!("toggle error: {err}");
                    false
                }
            };
            AppEvent::MutationSettled {
                ticket,
                confirmed,
                tasks: fetch(api.as_ref()).await,
            }
        });
        Some(ticket)
    }

    pub fn delete(&mut self, id: Uuid) -> Ticket {
        let ticket = self.tasks.apply(Mutation::Remove { id });

        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let confirmed = match api.delete(id).await {
                Ok(()) => true,
                // Already gone on the server; nothing to undo.
                Err(err) if err.is_not_found() => {
                    log::warn!("delete of missing task {id}");
                    true
                }
                Err(err) => {
                    log::error!("delete error: {err}");
                    false
                }
            };
            AppEvent::MutationSettled {
                ticket,
                confirmed,
                tasks: fetch(api.as_ref()).await,
            }
        });
        ticket
    }

    /// Starts a background suggestion request for `id`. Ignored while
    /// another request is pending; returns whether a request was issued.
    pub fn request_suggestion(&mut self, id: Uuid) -> bool {
        if matches!(self.suggestion, SuggestionState::Pending { .. }) {
            return false;
        }
        let Some(task) = self.tasks.get(id) else {
            return false;
        };

        self.suggestion = SuggestionState::Pending { task_id: id };
        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let suggestion = match api.suggest(&task.title).await {
                Ok(suggestion) => Some(suggestion),
                Err(err) => {
                    log::error!("AI service error: {err}");
                    None
                }
            };
            AppEvent::SuggestionReady {
                task_id: id,
                suggestion,
            }
        });
        true
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::SuggestionReady {
                task_id,
                suggestion,
            } => {
                if self.suggestion != (SuggestionState::Pending { task_id }) {
                    return;
                }
                self.suggestion = match suggestion {
                    Some(suggestion) if self.tasks.contains(task_id) => {
                        SuggestionState::Resolved {
                            task_id,
                            suggestion,
                        }
                    }
                    Some(_) => {
                        log::debug!("discarding suggestion for removed task {task_id}");
                        SuggestionState::Idle
                    }
                    None => SuggestionState::Idle,
                };
            }
            AppEvent::MutationSettled {
                ticket,
                confirmed,
                tasks,
            } => {
                if confirmed {
                    self.tasks.confirm(ticket);
                } else {
                    self.tasks.revert(ticket);
                }
                self.resync(tasks);
            }
            AppEvent::AddFinished { created, tasks } => {
                if !created {
                    log::warn!("add failed; showing the server's list");
                }
                self.add = AddState::Idle;
                self.resync(tasks);
            }
            AppEvent::Refreshed { tasks } => self.resync(tasks),
        }
    }

    fn resync(&mut self, tasks: Option<Vec<Task>>) {
        if let Some(tasks) = tasks {
            self.tasks.resync(tasks);
        }
    }

    /// The resolved suggestion, provided its task is still listed.
    pub fn visible_suggestion(&self) -> Option<(Uuid, &Suggestion)> {
        match &self.suggestion {
            SuggestionState::Resolved {
                task_id,
                suggestion,
            } if self.tasks.contains(*task_id) => Some((*task_id, suggestion)),
            _ => None,
        }
    }

    pub fn dismiss_suggestion(&mut self) {
        if matches!(self.suggestion, SuggestionState::Resolved { .. }) {
            self.suggestion = SuggestionState::Idle;
        }
    }

    /// Renames the suggestion's task to the refined title and closes the panel.
    pub fn accept_suggestion(&mut self) {
        let Some((task_id, suggestion)) = self.visible_suggestion() else {
            return;
        };
        let title = suggestion.refined_title.clone();
        self.suggestion = SuggestionState::Idle;

        let api = Arc::clone(&self.api);
        self.spawn(async move {
            if let Err(err) = api.rename(task_id, &title).await {
                log::error!("rename error: {err}");
            }
            AppEvent::Refreshed {
                tasks: fetch(api.as_ref()).await,
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, ApiResult};
    use crate::reconcile::Phase;
    use async_trait::async_trait;
    use chrono::Utc;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct FakeApi {
        tasks: Mutex<Vec<Task>>,
        fail_mutations: AtomicBool,
        hold_mutations: AtomicBool,
        release_mutations: Notify,
        list_calls: AtomicUsize,
        create_calls: AtomicUsize,
        suggest_calls: AtomicUsize,
        hold_suggestions: AtomicBool,
        release: Notify,
    }

    impl FakeApi {
        fn failure() -> ApiError {
            ApiError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "storage failure".to_string(),
            }
        }

        fn not_found() -> ApiError {
            ApiError::Status {
                status: StatusCode::NOT_FOUND,
                message: "not found".to_string(),
            }
        }

        async fn check(&self) -> ApiResult<()> {
            if self.hold_mutations.load(Ordering::SeqCst) {
                self.release_mutations.notified().await;
            }
            if self.fail_mutations.load(Ordering::SeqCst) {
                Err(Self::failure())
            } else {
                Ok(())
            }
        }

        fn seed(&self, title: &str) -> Task {
            let task = Task {
                id: Uuid::new_v4(),
                title: title.to_string(),
                completed: false,
                priority: Priority::Low,
                created_at: Utc::now(),
            };
            self.tasks.lock().unwrap().insert(0, task.clone());
            task
        }
    }

    #[async_trait]
    impl TaskApi for FakeApi {
        async fn list(&self) -> ApiResult<Vec<Task>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.tasks.lock().unwrap().clone())
        }

        async fn create(&self, title: &str, priority: Priority) -> ApiResult<Task> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            self.check().await?;
            let mut task = self.seed(title);
            task.priority = priority;
            self.tasks.lock().unwrap()[0].priority = priority;
            Ok(task)
        }

        async fn set_completed(&self, id: Uuid, completed: bool) -> ApiResult<Task> {
            self.check().await?;
            let mut tasks = self.tasks.lock().unwrap();
            let task = tasks.iter_mut().find(|t| t.id == id).ok_or_else(Self::not_found)?;
            task.completed = completed;
            Ok(task.clone())
        }

        async fn rename(&self, id: Uuid, title: &str) -> ApiResult<Task> {
            self.check().await?;
            let mut tasks = self.tasks.lock().unwrap();
            let task = tasks.iter_mut().find(|t| t.id == id).ok_or_else(Self::not_found)?;
            task.title = title.to_string();
            Ok(task.clone())
        }

        async fn delete(&self, id: Uuid) -> ApiResult<()> {
            self.check().await?;
            let mut tasks = self.tasks.lock().unwrap();
            let before = tasks.len();
            tasks.retain(|t| t.id != id);
            if tasks.len() == before {
                return Err(Self::not_found());
            }
            Ok(())
        }

        async fn suggest(&self, title: &str) -> ApiResult<Suggestion> {
            self.suggest_calls.fetch_add(1, Ordering::SeqCst);
            if self.hold_suggestions.load(Ordering::SeqCst) {
                self.release.notified().await;
            }
            Ok(Suggestion {
                refined_title: format!("Refined: {title}"),
                subtasks: vec!["one".into(), "two".into(), "three".into()],
            })
        }
    }

    async fn loaded(api: &Arc<FakeApi>) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (mut app, rx) = App::new(api.clone());
        assert_eq!(app.load_state(), LoadState::Loading);
        app.load().await;
        assert_eq!(app.load_state(), LoadState::Ready);
        (app, rx)
    }

    async fn next_event(app: &mut App, rx: &mut mpsc::UnboundedReceiver<AppEvent>) {
        let event = rx.recv().await.unwrap();
        app.handle_event(event);
    }

    #[tokio::test]
    async fn blank_title_never_reaches_the_server() {
        let api = Arc::new(FakeApi::default());
        let (mut app, _rx) = loaded(&api).await;

        assert!(!app.add("   ", Priority::High));
        tokio::task::yield_now().await;
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(app.add_state(), AddState::Idle);
    }

    #[tokio::test]
    async fn add_refetches_newest_first() {
        let api = Arc::new(FakeApi::default());
        let (mut app, mut rx) = loaded(&api).await;

        assert!(app.add("A", Priority::Low));
        next_event(&mut app, &mut rx).await;
        assert!(app.add(" B ", Priority::High));
        next_event(&mut app, &mut rx).await;

        let titles: Vec<String> = app.tasks().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["B", "A"]);
        assert_eq!(app.tasks()[0].priority, Priority::High);
        assert_eq!(app.add_state(), AddState::Idle);
    }

    #[tokio::test]
    async fn second_submit_is_ignored_while_submitting() {
        let api = Arc::new(FakeApi::default());
        api.hold_mutations.store(true, Ordering::SeqCst);
        let (mut app, mut rx) = loaded(&api).await;

        assert!(app.add("A", Priority::Low));
        assert_eq!(app.add_state(), AddState::Submitting);
        assert!(!app.add("B", Priority::Low));

        api.release_mutations.notify_one();
        next_event(&mut app, &mut rx).await;

        assert_eq!(app.add_state(), AddState::Idle);
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(app.tasks().len(), 1);
    }

    #[tokio::test]
    async fn failed_add_resyncs_and_returns_to_idle() {
        let api = Arc::new(FakeApi::default());
        api.seed("already stored");
        let (mut app, mut rx) = loaded(&api).await;
        api.seed("stored by the timed-out request");
        api.fail_mutations.store(true, Ordering::SeqCst);
        let lists_before = api.list_calls.load(Ordering::SeqCst);

        assert!(app.add("A", Priority::Low));
        next_event(&mut app, &mut rx).await;

        assert_eq!(app.add_state(), AddState::Idle);
        assert_eq!(api.list_calls.load(Ordering::SeqCst), lists_before + 1);
        assert_eq!(app.tasks().len(), 2);
    }

    #[tokio::test]
    async fn toggle_shows_before_the_server_answers() {
        let api = Arc::new(FakeApi::default());
        let task = api.seed("A");
        let (mut app, mut rx) = loaded(&api).await;
        api.hold_mutations.store(true, Ordering::SeqCst);

        let ticket = app.toggle(task.id).unwrap();

        assert!(app.tasks()[0].completed);
        assert_eq!(app.counts(), (1, 1));
        assert!(!api.tasks.lock().unwrap()[0].completed);

        api.release_mutations.notify_one();
        next_event(&mut app, &mut rx).await;

        assert!(app.tasks()[0].completed);
        assert!(api.tasks.lock().unwrap()[0].completed);
        assert_eq!(app.tasks.phase(ticket), None);
    }

    #[tokio::test]
    async fn toggle_twice_round_trips() {
        let api = Arc::new(FakeApi::default());
        let task = api.seed("A");
        let (mut app, mut rx) = loaded(&api).await;

        app.toggle(task.id);
        next_event(&mut app, &mut rx).await;
        assert!(app.tasks()[0].completed);
        app.toggle(task.id);
        next_event(&mut app, &mut rx).await;
        assert!(!app.tasks()[0].completed);
    }

    #[tokio::test]
    async fn failed_toggle_resyncs_to_server_state() {
        let api = Arc::new(FakeApi::default());
        let task = api.seed("A");
        let (mut app, mut rx) = loaded(&api).await;
        api.fail_mutations.store(true, Ordering::SeqCst);
        let lists_before = api.list_calls.load(Ordering::SeqCst);

        let ticket = app.toggle(task.id).unwrap();
        assert_eq!(app.tasks.phase(ticket), Some(Phase::Optimistic));
        assert!(app.tasks()[0].completed);
        next_event(&mut app, &mut rx).await;

        assert!(!app.tasks()[0].completed);
        assert_eq!(api.list_calls.load(Ordering::SeqCst), lists_before + 1);
    }

    #[tokio::test]
    async fn failed_delete_brings_the_task_back() {
        let api = Arc::new(FakeApi::default());
        let task = api.seed("A");
        let (mut app, mut rx) = loaded(&api).await;
        api.fail_mutations.store(true, Ordering::SeqCst);

        app.delete(task.id);
        assert!(app.tasks().is_empty());
        next_event(&mut app, &mut rx).await;

        assert_eq!(app.tasks().len(), 1);
    }

    #[tokio::test]
    async fn deleting_a_missing_task_is_not_fatal() {
        let api = Arc::new(FakeApi::default());
        api.seed("keep");
        let (mut app, mut rx) = loaded(&api).await;

        app.delete(Uuid::new_v4());
        next_event(&mut app, &mut rx).await;

        assert_eq!(app.tasks().len(), 1);
    }

    #[tokio::test]
    async fn only_one_suggestion_in_flight() {
        let api = Arc::new(FakeApi::default());
        api.hold_suggestions.store(true, Ordering::SeqCst);
        api.seed("A");
        api.seed("B");
        let (mut app, mut rx) = loaded(&api).await;
        let ids: Vec<Uuid> = app.tasks().iter().map(|t| t.id).collect();

        assert!(app.request_suggestion(ids[0]));
        assert!(!app.request_suggestion(ids[1]));
        assert!(!app.request_suggestion(ids[0]));
        assert_eq!(
            app.suggestion_state(),
            &SuggestionState::Pending { task_id: ids[0] }
        );

        api.release.notify_one();
        next_event(&mut app, &mut rx).await;

        assert_eq!(api.suggest_calls.load(Ordering::SeqCst), 1);
        let (task_id, suggestion) = app.visible_suggestion().unwrap();
        assert_eq!(task_id, ids[0]);
        assert_eq!(suggestion.refined_title, "Refined: B");

        // The gate is open again once the first request resolved.
        api.hold_suggestions.store(false, Ordering::SeqCst);
        assert!(app.request_suggestion(ids[1]));
        next_event(&mut app, &mut rx).await;
        assert_eq!(api.suggest_calls.load(Ordering::SeqCst), 2);
        assert_eq!(app.visible_suggestion().unwrap().0, ids[1]);
    }

    #[tokio::test]
    async fn suggestion_for_deleted_task_is_discarded() {
        let api = Arc::new(FakeApi::default());
        api.hold_suggestions.store(true, Ordering::SeqCst);
        let task = api.seed("A");
        let (mut app, mut rx) = loaded(&api).await;

        assert!(app.request_suggestion(task.id));
        app.delete(task.id);
        api.release.notify_one();
        next_event(&mut app, &mut rx).await;
        next_event(&mut app, &mut rx).await;

        assert_eq!(app.suggestion_state(), &SuggestionState::Idle);
        assert!(app.visible_suggestion().is_none());
    }

    #[tokio::test]
    async fn resolved_suggestion_hides_when_its_task_goes() {
        let api = Arc::new(FakeApi::default());
        let task = api.seed("A");
        let (mut app, mut rx) = loaded(&api).await;

        app.request_suggestion(task.id);
        next_event(&mut app, &mut rx).await;
        assert!(app.visible_suggestion().is_some());

        app.delete(task.id);
        assert!(app.visible_suggestion().is_none());
    }

    #[tokio::test]
    async fn dismiss_and_accept() {
        let api = Arc::new(FakeApi::default());
        let task = api.seed("milk");
        let (mut app, mut rx) = loaded(&api).await;

        app.request_suggestion(task.id);
        next_event(&mut app, &mut rx).await;
        app.dismiss_suggestion();
        assert_eq!(app.suggestion_state(), &SuggestionState::Idle);

        app.request_suggestion(task.id);
        next_event(&mut app, &mut rx).await;
        app.accept_suggestion();
        assert_eq!(app.suggestion_state(), &SuggestionState::Idle);
        next_event(&mut app, &mut rx).await;

        assert_eq!(app.tasks()[0].title, "Refined: milk");
    }

    #[tokio::test]
    async fn stale_event_does_not_clobber_state() {
        let api = Arc::new(FakeApi::default());
        let (mut app, _rx) = loaded(&api).await;

        app.handle_event(AppEvent::SuggestionReady {
            task_id: Uuid::new_v4(),
            suggestion: None,
        });
        assert_eq!(app.suggestion_state(), &SuggestionState::Idle);
    }
}
