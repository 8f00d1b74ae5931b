use anyhow::{Context, Result};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use shared::types::{ApiError, Comment, CommentPayload, News, NewsContent, NewsPayload, RegisterRequest};

use crate::api::ApiClient;
use crate::authz;
use crate::collections::{CollectionKey, Collections};
use crate::edit::{EditSessions, SaveError};
use crate::session::{SessionStore, now_ms};

pub mod view;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Everything that can wake the update loop: terminal input and completions
/// of background fetches.
#[derive(Debug)]
pub enum AppEvent {
    Input(Event),
    NewsLoaded {
        generation: u64,
        result: Result<Vec<News>, ApiError>,
    },
    DetailLoaded {
        generation: u64,
        news_id: i64,
        result: Result<(News, Vec<Comment>), ApiError>,
    },
}

/// Forward terminal events into the update loop from a dedicated thread —
/// `crossterm::event::read` blocks, and the loop must stay free to receive
/// fetch completions.
pub fn spawn_input_thread(tx: UnboundedSender<AppEvent>) {
    std::thread::spawn(move || {
        loop {
            match crossterm::event::read() {
                Ok(event) => {
                    if tx.send(AppEvent::Input(event)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Input thread terminated: {}", e);
                    break;
                }
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Screens
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Screen {
    Feed(FeedState),
    Detail(DetailState),
    Login(LoginState),
    Register(RegisterState),
    Compose(ComposeState),
}

#[derive(Debug, Default)]
struct FeedState {
    selected: usize,
    loading: bool,
    error: Option<String>,
}

#[derive(Debug)]
struct DetailState {
    news_id: i64,
    news: Option<News>,
    selected: usize,
    comment_draft: String,
    focus: DetailFocus,
    loading: bool,
    error: Option<String>,
    /// Armed by the first `d`/`D`; the second keypress confirms, anything
    /// else disarms.  Stands in for the browser confirm dialog.
    confirm_delete: Option<DeleteTarget>,
}

impl DetailState {
    fn open(news_id: i64) -> Self {
        Self {
            news_id,
            news: None,
            selected: 0,
            comment_draft: String::new(),
            focus: DetailFocus::Thread,
            loading: true,
            error: None,
            confirm_delete: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailFocus {
    Thread,
    CommentBox,
    Edit(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeleteTarget {
    News,
    Comment(i64),
}

#[derive(Debug, Default)]
struct LoginState {
    username: String,
    password: String,
    field: usize,
    error: Option<String>,
    submitting: bool,
}

#[derive(Debug, Default)]
struct RegisterState {
    name: String,
    email: String,
    password: String,
    field: usize,
    error: Option<String>,
    submitting: bool,
}

#[derive(Debug)]
struct ComposeState {
    /// `Some(id)` when editing an existing news item.
    target: Option<i64>,
    title: String,
    text: String,
    cover: String,
    field: usize,
    error: Option<String>,
    submitting: bool,
}

impl ComposeState {
    fn create() -> Self {
        Self {
            target: None,
            title: String::new(),
            text: String::new(),
            cover: String::new(),
            field: 0,
            error: None,
            submitting: false,
        }
    }

    fn edit_of(news: &News) -> Self {
        Self {
            target: Some(news.id),
            title: news.title.clone(),
            text: news.content.text.clone(),
            cover: news.cover.clone().unwrap_or_default(),
            field: 0,
            error: None,
            submitting: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Deferred actions
// ---------------------------------------------------------------------------

/// A submission queued by input handling.  Performed only after one redraw,
/// so the pending indicator set alongside it is on screen while the request
/// runs.
#[derive(Debug)]
enum Action {
    Login,
    Register,
    CreateComment { news_id: i64, text: String },
    SaveComment { comment_id: i64, news_id: i64 },
    DeleteComment { comment_id: i64, news_id: i64 },
    SubmitNews,
    DeleteNews { news_id: i64 },
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    api: ApiClient,
    session: SessionStore,
    collections: Collections,
    edits: EditSessions,
    screen: Screen,
    /// Bumped on every navigation.  A finished background fetch whose stamp
    /// no longer matches is discarded — its target view is gone.
    generation: u64,
    /// One-shot message line; cleared by the next keypress.
    status: Option<String>,
    running: bool,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        api: ApiClient,
        session: SessionStore,
        edits: EditSessions,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            api,
            session,
            collections: Collections::default(),
            edits,
            screen: Screen::Feed(FeedState::default()),
            generation: 0,
            status: None,
            running: true,
            events,
        }
    }

    pub async fn run(
        mut self,
        terminal: &mut DefaultTerminal,
        events: &mut UnboundedReceiver<AppEvent>,
    ) -> Result<()> {
        self.open_feed();

        while self.running {
            terminal
                .draw(|frame| view::render(&self, frame))
                .context("Failed to draw frame")?;

            let Some(event) = events.recv().await else {
                break;
            };

            if let Some(action) = self.handle(event) {
                terminal
                    .draw(|frame| view::render(&self, frame))
                    .context("Failed to draw frame")?;
                self.perform(action).await;
            }
        }

        Ok(())
    }

    // -- event routing ------------------------------------------------------

    fn handle(&mut self, event: AppEvent) -> Option<Action> {
        match event {
            AppEvent::Input(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                self.handle_key(key)
            }
            AppEvent::Input(_) => None,
            AppEvent::NewsLoaded { generation, result } => {
                self.apply_news(generation, result);
                None
            }
            AppEvent::DetailLoaded {
                generation,
                news_id,
                result,
            } => {
                self.apply_detail(generation, news_id, result);
                None
            }
        }
    }

    fn apply_news(&mut self, generation: u64, result: Result<Vec<News>, ApiError>) {
        if generation != self.generation {
            debug!("Dropping stale news response (generation {})", generation);
            return;
        }
        if let Screen::Feed(state) = &mut self.screen {
            state.loading = false;
            match result {
                Ok(items) => {
                    state.error = None;
                    if state.selected >= items.len() {
                        state.selected = items.len().saturating_sub(1);
                    }
                    self.collections.replace_news(items);
                }
                Err(e) => {
                    warn!("News fetch failed: {}", e);
                    state.error = Some(format!("Could not load news: {}", e));
                }
            }
        }
    }

    fn apply_detail(
        &mut self,
        generation: u64,
        news_id: i64,
        result: Result<(News, Vec<Comment>), ApiError>,
    ) {
        if generation != self.generation {
            debug!(
                "Dropping stale detail response for news {} (generation {})",
                news_id, generation
            );
            return;
        }
        if let Screen::Detail(state) = &mut self.screen {
            if state.news_id != news_id {
                return;
            }
            state.loading = false;
            match result {
                Ok((news, comments)) => {
                    state.error = None;
                    state.news = Some(news);
                    if state.selected >= comments.len() {
                        state.selected = comments.len().saturating_sub(1);
                    }
                    self.collections.replace_comments(news_id, comments);
                }
                Err(e) => {
                    warn!("Detail fetch failed for news {}: {}", news_id, e);
                    state.error = Some(format!("Could not load the article: {}", e));
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        self.status = None;
        match self.screen {
            Screen::Feed(_) => self.feed_key(key),
            Screen::Detail(_) => self.detail_key(key),
            Screen::Login(_) => self.login_key(key),
            Screen::Register(_) => self.register_key(key),
            Screen::Compose(_) => self.compose_key(key),
        }
    }

    // -- navigation ---------------------------------------------------------

    fn open_feed(&mut self) {
        self.generation += 1;
        self.screen = Screen::Feed(FeedState {
            selected: 0,
            loading: true,
            error: None,
        });
        self.spawn_news_fetch();
    }

    fn spawn_news_fetch(&self) {
        let api = self.api.clone();
        let bearer = self.session.bearer().map(str::to_string);
        let tx = self.events.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = api.list_news(bearer.as_deref()).await;
            let _ = tx.send(AppEvent::NewsLoaded { generation, result });
        });
    }

    fn open_detail(&mut self, news_id: i64) {
        self.generation += 1;
        self.screen = Screen::Detail(DetailState::open(news_id));
        self.spawn_detail_fetch(news_id);
    }

    fn spawn_detail_fetch(&self, news_id: i64) {
        let api = self.api.clone();
        let bearer = self.session.bearer().map(str::to_string);
        let tx = self.events.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = match api.get_news(news_id, bearer.as_deref()).await {
                Ok(news) => match api.list_comments(news_id, bearer.as_deref()).await {
                    Ok(comments) => Ok((news, comments)),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };
            let _ = tx.send(AppEvent::DetailLoaded {
                generation,
                news_id,
                result,
            });
        });
    }

    fn reload_feed(&mut self) {
        self.generation += 1;
        if let Screen::Feed(state) = &mut self.screen {
            state.loading = true;
            state.error = None;
        }
        self.spawn_news_fetch();
    }

    fn reload_detail(&mut self) {
        self.generation += 1;
        let news_id = match &mut self.screen {
            Screen::Detail(state) => {
                state.loading = true;
                state.error = None;
                state.news_id
            }
            _ => return,
        };
        self.spawn_detail_fetch(news_id);
    }

    // -- feed keys ----------------------------------------------------------

    fn feed_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Char('q') => {
                self.running = false;
                None
            }
            KeyCode::Char('r') => {
                self.reload_feed();
                None
            }
            KeyCode::Char('l') if !self.session.is_authenticated() => {
                self.generation += 1;
                self.screen = Screen::Login(LoginState::default());
                None
            }
            KeyCode::Char('g') if !self.session.is_authenticated() => {
                self.generation += 1;
                self.screen = Screen::Register(RegisterState::default());
                None
            }
            KeyCode::Char('o') if self.session.is_authenticated() => {
                self.session.logout();
                self.status = Some("Logged out".into());
                self.reload_feed();
                None
            }
            KeyCode::Char('n') if authz::can_create_news(self.session.principal()) => {
                self.generation += 1;
                self.screen = Screen::Compose(ComposeState::create());
                None
            }
            KeyCode::Up => {
                if let Screen::Feed(state) = &mut self.screen {
                    state.selected = state.selected.saturating_sub(1);
                }
                None
            }
            KeyCode::Down => {
                let count = self.collections.news().map_or(0, |n| n.len());
                if let Screen::Feed(state) = &mut self.screen {
                    if count > 0 && state.selected + 1 < count {
                        state.selected += 1;
                    }
                }
                None
            }
            KeyCode::Enter => {
                if let Some(id) = self.selected_news_id() {
                    self.open_detail(id);
                }
                None
            }
            _ => None,
        }
    }

    fn selected_news_id(&self) -> Option<i64> {
        let Screen::Feed(state) = &self.screen else {
            return None;
        };
        self.collections.news()?.get(state.selected).map(|n| n.id)
    }

    // -- detail keys --------------------------------------------------------

    fn detail_key(&mut self, key: KeyEvent) -> Option<Action> {
        let focus = match &self.screen {
            Screen::Detail(state) => state.focus,
            _ => return None,
        };
        match focus {
            DetailFocus::Thread => self.detail_thread_key(key),
            DetailFocus::CommentBox => self.detail_comment_box_key(key),
            DetailFocus::Edit(comment_id) => self.detail_edit_key(key, comment_id),
        }
    }

    fn detail_thread_key(&mut self, key: KeyEvent) -> Option<Action> {
        let armed = match &self.screen {
            Screen::Detail(state) => state.confirm_delete,
            _ => None,
        };

        match key.code {
            KeyCode::Char('q') => {
                self.running = false;
                None
            }
            KeyCode::Esc | KeyCode::Char('h') => {
                self.open_feed();
                None
            }
            KeyCode::Char('r') => {
                self.reload_detail();
                None
            }
            KeyCode::Up => {
                if let Screen::Detail(state) = &mut self.screen {
                    state.selected = state.selected.saturating_sub(1);
                    state.confirm_delete = None;
                }
                None
            }
            KeyCode::Down => {
                let count = match &self.screen {
                    Screen::Detail(state) => self
                        .collections
                        .comments(state.news_id)
                        .map_or(0, |c| c.len()),
                    _ => 0,
                };
                if let Screen::Detail(state) = &mut self.screen {
                    if count > 0 && state.selected + 1 < count {
                        state.selected += 1;
                    }
                    state.confirm_delete = None;
                }
                None
            }
            KeyCode::Char('c') if self.session.is_authenticated() => {
                if let Screen::Detail(state) = &mut self.screen {
                    state.focus = DetailFocus::CommentBox;
                    state.confirm_delete = None;
                }
                None
            }
            KeyCode::Char('e') => {
                let Some(comment) = self.selected_comment() else {
                    return None;
                };
                if !authz::can_modify(self.session.principal(), &comment) {
                    return None;
                }
                self.edits.begin(comment.id, &comment.text);
                if let Screen::Detail(state) = &mut self.screen {
                    state.focus = DetailFocus::Edit(comment.id);
                    state.confirm_delete = None;
                }
                None
            }
            KeyCode::Char('d') => {
                let Some(comment) = self.selected_comment() else {
                    return None;
                };
                if !authz::can_modify(self.session.principal(), &comment) {
                    return None;
                }
                let target = DeleteTarget::Comment(comment.id);
                if armed == Some(target) {
                    if let Screen::Detail(state) = &mut self.screen {
                        state.confirm_delete = None;
                        return Some(Action::DeleteComment {
                            comment_id: comment.id,
                            news_id: state.news_id,
                        });
                    }
                    None
                } else {
                    if let Screen::Detail(state) = &mut self.screen {
                        state.confirm_delete = Some(target);
                    }
                    self.status = Some("Press d again to delete the comment".into());
                    None
                }
            }
            KeyCode::Char('E') => {
                let news = match &self.screen {
                    Screen::Detail(state) => state.news.clone(),
                    _ => None,
                }?;
                if !authz::can_modify(self.session.principal(), &news) {
                    return None;
                }
                self.generation += 1;
                self.screen = Screen::Compose(ComposeState::edit_of(&news));
                None
            }
            KeyCode::Char('D') => {
                let news = match &self.screen {
                    Screen::Detail(state) => state.news.clone(),
                    _ => None,
                }?;
                if !authz::can_modify(self.session.principal(), &news) {
                    return None;
                }
                if armed == Some(DeleteTarget::News) {
                    if let Screen::Detail(state) = &mut self.screen {
                        state.confirm_delete = None;
                    }
                    Some(Action::DeleteNews { news_id: news.id })
                } else {
                    if let Screen::Detail(state) = &mut self.screen {
                        state.confirm_delete = Some(DeleteTarget::News);
                    }
                    self.status = Some("Press D again to delete the news item".into());
                    None
                }
            }
            _ => {
                if let Screen::Detail(state) = &mut self.screen {
                    state.confirm_delete = None;
                }
                None
            }
        }
    }

    fn detail_comment_box_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Esc => {
                if let Screen::Detail(state) = &mut self.screen {
                    state.focus = DetailFocus::Thread;
                }
                None
            }
            KeyCode::Enter => {
                let (news_id, text) = match &self.screen {
                    Screen::Detail(state) => {
                        (state.news_id, state.comment_draft.trim().to_string())
                    }
                    _ => return None,
                };
                if text.is_empty() {
                    self.status = Some("Nothing to send".into());
                    return None;
                }
                Some(Action::CreateComment { news_id, text })
            }
            KeyCode::Backspace => {
                if let Screen::Detail(state) = &mut self.screen {
                    state.comment_draft.pop();
                }
                None
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Screen::Detail(state) = &mut self.screen {
                    state.comment_draft.push(c);
                }
                None
            }
            _ => None,
        }
    }

    fn detail_edit_key(&mut self, key: KeyEvent, comment_id: i64) -> Option<Action> {
        // The save trigger stays dead until the in-flight attempt settles.
        if self.edits.is_saving(comment_id) {
            return None;
        }
        match key.code {
            KeyCode::Esc => {
                self.edits.cancel(comment_id);
                if let Screen::Detail(state) = &mut self.screen {
                    state.focus = DetailFocus::Thread;
                }
                None
            }
            KeyCode::Enter => {
                let news_id = match &self.screen {
                    Screen::Detail(state) => state.news_id,
                    _ => return None,
                };
                Some(Action::SaveComment {
                    comment_id,
                    news_id,
                })
            }
            KeyCode::Backspace => {
                if let Some(draft) = self.edits.draft(comment_id) {
                    let mut draft = draft.to_string();
                    draft.pop();
                    self.edits.update_draft(comment_id, draft);
                }
                None
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some(draft) = self.edits.draft(comment_id) {
                    let mut draft = draft.to_string();
                    draft.push(c);
                    self.edits.update_draft(comment_id, draft);
                }
                None
            }
            _ => None,
        }
    }

    fn selected_comment(&self) -> Option<Comment> {
        let Screen::Detail(state) = &self.screen else {
            return None;
        };
        self.collections
            .comments(state.news_id)?
            .get(state.selected)
            .cloned()
    }

    // -- login / register keys ----------------------------------------------

    fn login_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Esc => {
                self.open_feed();
                None
            }
            KeyCode::Tab | KeyCode::Down => {
                if let Screen::Login(state) = &mut self.screen {
                    state.field = (state.field + 1) % 2;
                }
                None
            }
            KeyCode::BackTab | KeyCode::Up => {
                if let Screen::Login(state) = &mut self.screen {
                    state.field = (state.field + 1) % 2;
                }
                None
            }
            KeyCode::Enter => {
                if let Screen::Login(state) = &mut self.screen {
                    // Presence only; everything else is the server's call.
                    if state.username.trim().is_empty() || state.password.is_empty() {
                        state.error = Some("Email and password are required".into());
                        return None;
                    }
                    state.error = None;
                    state.submitting = true;
                    return Some(Action::Login);
                }
                None
            }
            KeyCode::Backspace => {
                if let Screen::Login(state) = &mut self.screen {
                    match state.field {
                        0 => state.username.pop(),
                        _ => state.password.pop(),
                    };
                }
                None
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Screen::Login(state) = &mut self.screen {
                    match state.field {
                        0 => state.username.push(c),
                        _ => state.password.push(c),
                    }
                }
                None
            }
            _ => None,
        }
    }

    fn register_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Esc => {
                self.open_feed();
                None
            }
            KeyCode::Tab | KeyCode::Down => {
                if let Screen::Register(state) = &mut self.screen {
                    state.field = (state.field + 1) % 3;
                }
                None
            }
            KeyCode::BackTab | KeyCode::Up => {
                if let Screen::Register(state) = &mut self.screen {
                    state.field = (state.field + 2) % 3;
                }
                None
            }
            KeyCode::Enter => {
                if let Screen::Register(state) = &mut self.screen {
                    if state.name.trim().is_empty()
                        || state.email.trim().is_empty()
                        || state.password.is_empty()
                    {
                        state.error = Some("All fields are required".into());
                        return None;
                    }
                    state.error = None;
                    state.submitting = true;
                    return Some(Action::Register);
                }
                None
            }
            KeyCode::Backspace => {
                if let Screen::Register(state) = &mut self.screen {
                    match state.field {
                        0 => state.name.pop(),
                        1 => state.email.pop(),
                        _ => state.password.pop(),
                    };
                }
                None
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Screen::Register(state) = &mut self.screen {
                    match state.field {
                        0 => state.name.push(c),
                        1 => state.email.push(c),
                        _ => state.password.push(c),
                    }
                }
                None
            }
            _ => None,
        }
    }

    // -- compose keys --------------------------------------------------------

    fn compose_key(&mut self, key: KeyEvent) -> Option<Action> {
        // Ctrl+S submits from any field; Enter inside the body inserts a
        // newline instead of submitting.
        if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
            if let Screen::Compose(state) = &mut self.screen {
                if state.title.trim().is_empty() || state.text.trim().is_empty() {
                    state.error = Some("Title and text are required".into());
                    return None;
                }
                state.error = None;
                state.submitting = true;
                return Some(Action::SubmitNews);
            }
            return None;
        }

        match key.code {
            KeyCode::Esc => {
                let target = match &self.screen {
                    Screen::Compose(state) => state.target,
                    _ => None,
                };
                match target {
                    Some(id) => self.open_detail(id),
                    None => self.open_feed(),
                }
                None
            }
            KeyCode::Tab => {
                if let Screen::Compose(state) = &mut self.screen {
                    state.field = (state.field + 1) % 3;
                }
                None
            }
            KeyCode::BackTab => {
                if let Screen::Compose(state) = &mut self.screen {
                    state.field = (state.field + 2) % 3;
                }
                None
            }
            KeyCode::Enter => {
                if let Screen::Compose(state) = &mut self.screen {
                    if state.field == 2 {
                        state.text.push('\n');
                    }
                }
                None
            }
            KeyCode::Backspace => {
                if let Screen::Compose(state) = &mut self.screen {
                    match state.field {
                        0 => state.title.pop(),
                        1 => state.cover.pop(),
                        _ => state.text.pop(),
                    };
                }
                None
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Screen::Compose(state) = &mut self.screen {
                    match state.field {
                        0 => state.title.push(c),
                        1 => state.cover.push(c),
                        _ => state.text.push(c),
                    }
                }
                None
            }
            _ => None,
        }
    }

    // -- deferred actions ----------------------------------------------------

    async fn perform(&mut self, action: Action) {
        match action {
            Action::Login => self.perform_login().await,
            Action::Register => self.perform_register().await,
            Action::CreateComment { news_id, text } => {
                self.perform_create_comment(news_id, text).await
            }
            Action::SaveComment {
                comment_id,
                news_id,
            } => self.perform_save_comment(comment_id, news_id).await,
            Action::DeleteComment {
                comment_id,
                news_id,
            } => self.perform_delete_comment(comment_id, news_id).await,
            Action::SubmitNews => self.perform_submit_news().await,
            Action::DeleteNews { news_id } => self.perform_delete_news(news_id).await,
        }
    }

    async fn perform_login(&mut self) {
        let (username, password) = match &self.screen {
            Screen::Login(state) => (state.username.clone(), state.password.clone()),
            _ => return,
        };

        match self
            .session
            .login(&self.api, &username, &password, now_ms())
            .await
        {
            Ok(principal) => {
                info!("Login succeeded for user {}", principal.id);
                self.status = Some("Logged in".into());
                self.open_feed();
            }
            Err(e) => {
                warn!("Login failed: {}", e);
                if let Screen::Login(state) = &mut self.screen {
                    state.submitting = false;
                    state.error = Some(e.to_string());
                }
            }
        }
    }

    async fn perform_register(&mut self) {
        let request = match &self.screen {
            Screen::Register(state) => RegisterRequest {
                name: state.name.trim().to_string(),
                email: state.email.trim().to_string(),
                password: state.password.clone(),
            },
            _ => return,
        };

        match self.api.register(&request).await {
            Ok(()) => {
                info!("Registered new account {}", request.name);
                self.status = Some("Registration successful — log in now".into());
                self.generation += 1;
                self.screen = Screen::Login(LoginState {
                    username: request.email,
                    ..LoginState::default()
                });
            }
            Err(e) => {
                warn!("Registration failed: {}", e);
                if let Screen::Register(state) = &mut self.screen {
                    state.submitting = false;
                    state.error = Some(e.to_string());
                }
            }
        }
    }

    async fn perform_create_comment(&mut self, news_id: i64, text: String) {
        let payload = CommentPayload { news_id, text };
        let bearer = self.session.bearer().map(str::to_string);

        match self.api.create_comment(&payload, bearer.as_deref()).await {
            Ok(()) => {
                if let Screen::Detail(state) = &mut self.screen {
                    state.comment_draft.clear();
                    state.focus = DetailFocus::Thread;
                }
                self.status = Some("Comment posted".into());
                self.refetch_comments(news_id).await;
            }
            Err(e) => {
                warn!("Comment post failed: {}", e);
                // Draft stays in the box so the user can retry.
                self.status = Some(format!("Could not post comment: {}", e));
            }
        }
    }

    async fn perform_save_comment(&mut self, comment_id: i64, news_id: i64) {
        let api = self.api.clone();
        let bearer = self.session.bearer().map(str::to_string);

        let result = self
            .edits
            .save(comment_id, |draft| async move {
                api.update_comment(
                    comment_id,
                    &CommentPayload {
                        news_id,
                        text: draft,
                    },
                    bearer.as_deref(),
                )
                .await
            })
            .await;

        match result {
            Ok(()) => {
                if let Screen::Detail(state) = &mut self.screen {
                    if state.focus == DetailFocus::Edit(comment_id) {
                        state.focus = DetailFocus::Thread;
                    }
                }
                self.status = Some("Comment updated".into());
                self.refetch_comments(news_id).await;
            }
            Err(SaveError::NotEditing) => {}
            Err(SaveError::Failed(e)) => {
                warn!("Comment save failed: {}", e);
                // The slot is back in editing with the draft intact.
                self.status = Some(format!("Could not save comment: {}", e));
            }
        }
    }

    async fn perform_delete_comment(&mut self, comment_id: i64, news_id: i64) {
        let bearer = self.session.bearer().map(str::to_string);
        match self.api.delete_comment(comment_id, bearer.as_deref()).await {
            Ok(()) => {
                self.edits.cancel(comment_id);
                self.status = Some("Comment deleted".into());
                self.refetch_comments(news_id).await;
            }
            Err(e) => {
                warn!("Comment delete failed: {}", e);
                self.status = Some(format!("Could not delete comment: {}", e));
            }
        }
    }

    async fn perform_submit_news(&mut self) {
        let (target, payload) = match &self.screen {
            Screen::Compose(state) => (
                state.target,
                NewsPayload {
                    title: state.title.trim().to_string(),
                    content: NewsContent {
                        text: state.text.trim().to_string(),
                    },
                    cover: match state.cover.trim() {
                        "" => None,
                        cover => Some(cover.to_string()),
                    },
                },
            ),
            _ => return,
        };
        let bearer = self.session.bearer().map(str::to_string);

        let result = match target {
            Some(id) => self.api.update_news(id, &payload, bearer.as_deref()).await,
            None => self.api.create_news(&payload, bearer.as_deref()).await,
        };

        match result {
            Ok(()) => match target {
                Some(id) => {
                    self.status = Some("News updated".into());
                    self.open_detail(id);
                }
                None => {
                    self.status = Some("News published".into());
                    self.open_feed();
                }
            },
            Err(e) => {
                warn!("News submit failed: {}", e);
                if let Screen::Compose(state) = &mut self.screen {
                    state.submitting = false;
                    state.error = Some(e.to_string());
                }
            }
        }
    }

    async fn perform_delete_news(&mut self, news_id: i64) {
        let bearer = self.session.bearer().map(str::to_string);
        match self.api.delete_news(news_id, bearer.as_deref()).await {
            Ok(()) => {
                // The detail view now points at a dead item — leave it.
                self.collections.forget_comments(news_id);
                self.status = Some("News deleted".into());
                self.open_feed();
            }
            Err(e) => {
                warn!("News delete failed: {}", e);
                self.status = Some(format!("Could not delete news: {}", e));
            }
        }
    }

    /// Post-mutation refetch of one comment thread; the cache is replaced
    /// wholesale and the selection clamped to the fresh list.
    async fn refetch_comments(&mut self, news_id: i64) {
        if let Err(e) = self
            .collections
            .refetch(&self.api, &self.session, CollectionKey::Comments(news_id))
            .await
        {
            warn!("Refetch after mutation failed: {}", e);
            self.status = Some(format!("Could not refresh comments: {}", e));
        }
        let count = self.collections.comments(news_id).map_or(0, |c| c.len());
        if let Screen::Detail(state) = &mut self.screen {
            if state.selected >= count {
                state.selected = count.saturating_sub(1);
            }
        }
    }
}
