// src/chat/dashboard.rs
use super::messages::MessageList;
use super::sessions::SessionList;
use crate::models::auth::AuthContext;
use crate::models::chat::{session_title, ChatMessage, ChatSession, Role};
use crate::realtime::SessionChange;
use crate::responder::Responder;
use crate::store::ChatStore;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

pub const SUGGESTIONS: [&str; 4] = [
    "What are my rights as a tenant?",
    "How to apply for old age pension?",
    "Women's safety helplines",
    "Ration card eligibility",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Welcome {
    pub greeting: String,
    pub prompt: &'static str,
    pub hint: &'static str,
    pub suggestions: [&'static str; 4],
}

/// Everything a client needs to render the chat screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub display_name: String,
    pub sessions: Vec<ChatSession>,
    pub sessions_loading: bool,
    pub active_session_id: Option<Uuid>,
    pub messages: Vec<ChatMessage>,
    pub is_typing: bool,
    pub input_disabled: bool,
    pub welcome: Option<Welcome>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The assistant reply was generated and stored.
    Replied(ChatMessage),
    /// The reply was generated but could not be stored.
    ReplyNotStored,
    /// Blank prompt, or a reply is still pending.
    Ignored,
    /// No session could be created.
    SessionUnavailable,
    /// The responder failed; the typing indicator was cleared.
    GenerationFailed,
}

/// Chat screen state machine: no active session, or one active session.
pub struct Dashboard {
    auth: AuthContext,
    sessions: SessionList,
    messages: MessageList,
    responder: Arc<dyn Responder>,
    active_session: Option<Uuid>,
    is_typing: bool,
    updates: Option<mpsc::UnboundedSender<DashboardView>>,
}

impl Dashboard {
    pub fn new(store: Arc<dyn ChatStore>, responder: Arc<dyn Responder>, auth: AuthContext) -> Self {
        Self {
            sessions: SessionList::new(store.clone(), auth.clone()),
            messages: MessageList::new(store),
            auth,
            responder,
            active_session: None,
            is_typing: false,
            updates: None,
        }
    }

    /// Sends a fresh view to `updates` after every state change.
    pub fn with_updates(mut self, updates: mpsc::UnboundedSender<DashboardView>) -> Self {
        self.updates = Some(updates);
        self
    }

    pub fn active_session(&self) -> Option<Uuid> {
        self.active_session
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    pub fn sessions(&self) -> &[ChatSession] {
        self.sessions.sessions()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.messages.messages()
    }

    pub async fn mount(&mut self) {
        self.sessions.refresh().await;
        self.emit();
    }

    pub fn new_chat(&mut self) {
        self.active_session = None;
        self.messages.clear();
        self.emit();
    }

    /// Makes `id` active and loads its transcript. Returns false when the
    /// session is not one of the user's.
    pub async fn select_session(&mut self, id: Uuid) -> bool {
        if self.sessions.find(id).is_none() {
            self.sessions.refresh().await;
        }
        if self.sessions.find(id).is_none() {
            tracing::warn!(session_id = %id, "Ignoring selection of unknown chat session");
            return false;
        }

        self.active_session = Some(id);
        self.messages.load(Some(id)).await;
        self.emit();
        true
    }

    pub async fn delete_session(&mut self, id: Uuid) {
        self.sessions.delete(id).await;
        if self.active_session == Some(id) {
            self.active_session = None;
            self.messages.clear();
        }
        self.emit();
    }

    /// Reloads the session list. An active session that is no longer listed
    /// was deleted elsewhere, so the screen returns to a new chat.
    pub async fn refresh(&mut self) {
        if self.sessions.refresh().await {
            if let Some(id) = self.active_session {
                if self.sessions.find(id).is_none() {
                    tracing::info!(session_id = %id, "Active chat session was removed elsewhere");
                    self.active_session = None;
                    self.messages.clear();
                }
            }
        }
        self.emit();
    }

    pub async fn on_session_change(&mut self, change: &SessionChange) {
        if self.sessions.is_affected_by(change) {
            self.refresh().await;
        }
    }

    /// Runs one prompt through create-session, store, respond, store.
    pub async fn submit(&mut self, prompt: &str) -> SubmitOutcome {
        let prompt = prompt.trim();
        if prompt.is_empty() || self.is_typing {
            return SubmitOutcome::Ignored;
        }

        let is_new_session = self.active_session.is_none();
        let session_id = match self.active_session {
            Some(id) => id,
            None => {
                let Some(id) = self.sessions.create(&session_title(prompt)).await else {
                    return SubmitOutcome::SessionUnavailable;
                };
                self.active_session = Some(id);
                self.messages.attach(id);
                id
            }
        };

        self.messages.append(Role::User, prompt, Some(session_id)).await;
        self.is_typing = true;
        self.emit();

        let outcome = match self.responder.respond(prompt).await {
            Ok(reply) => {
                let stored = self.messages.append(Role::Assistant, &reply, Some(session_id)).await;
                if is_new_session {
                    self.sessions.rename(session_id, &session_title(prompt)).await;
                }
                match stored {
                    Some(message) => SubmitOutcome::Replied(message),
                    None => SubmitOutcome::ReplyNotStored,
                }
            }
            Err(e) => {
                tracing::error!(session_id = %session_id, "Error generating response: {}", e);
                SubmitOutcome::GenerationFailed
            }
        };

        self.is_typing = false;
        self.emit();
        outcome
    }

    pub fn view(&self) -> DashboardView {
        let display_name = self
            .auth
            .user()
            .map(|u| u.label().to_string())
            .unwrap_or_else(|| "User".to_string());

        let welcome = self.messages.messages().is_empty().then(|| Welcome {
            greeting: match self.auth.user().and_then(|u| u.display_name.as_deref()) {
                Some(name) if !name.trim().is_empty() => format!("Hello, {}!", name),
                _ => "Hello!".to_string(),
            },
            prompt: "How can I help you today?",
            hint: "Ask about laws, women's safety, or welfare schemes.",
            suggestions: SUGGESTIONS,
        });

        DashboardView {
            display_name,
            sessions: self.sessions.sessions().to_vec(),
            sessions_loading: self.sessions.loading(),
            active_session_id: self.active_session,
            messages: self.messages.messages().to_vec(),
            is_typing: self.is_typing,
            input_disabled: self.is_typing,
            welcome,
        }
    }

    fn emit(&self) {
        if let Some(updates) = &self.updates {
            // The receiver is gone once the client disconnects.
            let _ = updates.send(self.view());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResponderError;
    use crate::models::auth::CurrentUser;
    use crate::responder::KeywordResponder;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FailingResponder;

    #[async_trait]
    impl Responder for FailingResponder {
        async fn respond(&self, _prompt: &str) -> Result<String, ResponderError> {
            Err(ResponderError::EmptyReply)
        }
    }

    fn meena() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "meena@example.com".to_string(),
            display_name: Some("Meena".to_string()),
        }
    }

    fn instant_responder() -> Arc<dyn Responder> {
        Arc::new(KeywordResponder::new(Duration::ZERO))
    }

    fn dashboard(store: Arc<MemoryStore>, user: &CurrentUser) -> Dashboard {
        Dashboard::new(store, instant_responder(), AuthContext::signed_in(user.clone()))
    }

    #[tokio::test]
    async fn first_prompt_creates_exactly_one_session() {
        let store = Arc::new(MemoryStore::new());
        let user = meena();
        let mut dash = dashboard(store.clone(), &user);
        dash.mount().await;

        let outcome = dash.submit("Tell me about women's safety").await;

        let sessions = store.list_sessions(user.id).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].title, "Tell me about women's safety");
        assert_eq!(dash.active_session(), Some(sessions[0].id));

        let messages = store.list_messages(sessions[0].id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert!(messages[1].content.starts_with("**Women's Safety Resources in Tamil Nadu**"));
        assert_eq!(dash.messages(), messages.as_slice());
        assert!(matches!(outcome, SubmitOutcome::Replied(ref m) if m.id == messages[1].id));
        assert!(!dash.is_typing());
    }

    #[tokio::test]
    async fn follow_up_prompt_reuses_active_session() {
        let store = Arc::new(MemoryStore::new());
        let user = meena();
        let mut dash = dashboard(store.clone(), &user);
        dash.mount().await;

        dash.submit("What schemes am I eligible for?").await;
        dash.submit("And legal aid?").await;

        let sessions = store.list_sessions(user.id).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].title, "What schemes am I eligible for?");
        assert_eq!(store.list_messages(sessions[0].id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn long_prompt_title_is_truncated() {
        let store = Arc::new(MemoryStore::new());
        let user = meena();
        let mut dash = dashboard(store.clone(), &user);

        let prompt = "I want to know about the procedure to file a complaint at the consumer forum";
        dash.submit(prompt).await;

        let sessions = store.list_sessions(user.id).await.unwrap();
        assert_eq!(sessions[0].title, prompt.chars().take(50).collect::<String>());
    }

    #[tokio::test]
    async fn selecting_a_session_loads_its_messages() {
        let store = Arc::new(MemoryStore::new());
        let user = meena();
        let older = store.create_session(user.id, "older").await.unwrap();
        store.append_message(older.id, Role::User, "first").await.unwrap();
        store.append_message(older.id, Role::Assistant, "second").await.unwrap();

        let mut dash = dashboard(store.clone(), &user);
        dash.mount().await;
        assert!(dash.select_session(older.id).await);

        let contents: Vec<&str> = dash.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert_eq!(dash.active_session(), Some(older.id));
        assert!(dash.view().welcome.is_none());
    }

    #[tokio::test]
    async fn cannot_select_another_users_session() {
        let store = Arc::new(MemoryStore::new());
        let other = store.create_session(Uuid::new_v4(), "private").await.unwrap();
        let user = meena();
        let mut dash = dashboard(store.clone(), &user);
        dash.mount().await;

        assert!(!dash.select_session(other.id).await);
        assert_eq!(dash.active_session(), None);
        assert!(dash.messages().is_empty());
    }

    #[tokio::test]
    async fn deleting_active_session_returns_to_new_chat() {
        let store = Arc::new(MemoryStore::new());
        let user = meena();
        let mut dash = dashboard(store.clone(), &user);
        dash.submit("legal help").await;
        let active = dash.active_session().unwrap();

        dash.delete_session(active).await;

        assert_eq!(dash.active_session(), None);
        assert!(dash.messages().is_empty());
        assert!(dash.sessions().is_empty());
        assert!(store.list_sessions(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_other_session_keeps_active_one() {
        let store = Arc::new(MemoryStore::new());
        let user = meena();
        let other = store.create_session(user.id, "other").await.unwrap();
        let mut dash = dashboard(store.clone(), &user);
        dash.mount().await;
        dash.submit("legal help").await;
        let active = dash.active_session().unwrap();

        dash.delete_session(other.id).await;

        assert_eq!(dash.active_session(), Some(active));
        assert_eq!(dash.messages().len(), 2);
        assert_eq!(dash.sessions().len(), 1);
    }

    #[tokio::test]
    async fn new_chat_clears_transcript() {
        let store = Arc::new(MemoryStore::new());
        let user = meena();
        let mut dash = dashboard(store.clone(), &user);
        dash.submit("legal help").await;

        dash.new_chat();
        assert_eq!(dash.active_session(), None);
        assert!(dash.messages().is_empty());

        dash.submit("welfare").await;
        assert_eq!(store.list_sessions(user.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn responder_failure_clears_typing_indicator() {
        let store = Arc::new(MemoryStore::new());
        let user = meena();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut dash = Dashboard::new(
            store.clone(),
            Arc::new(FailingResponder),
            AuthContext::signed_in(user.clone()),
        )
        .with_updates(tx);

        let outcome = dash.submit("hello").await;
        assert_eq!(outcome, SubmitOutcome::GenerationFailed);
        assert!(!dash.is_typing());

        // The user message is kept; there is no assistant reply.
        let session = dash.active_session().unwrap();
        let messages = store.list_messages(session).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);

        let mut views = Vec::new();
        while let Ok(view) = rx.try_recv() {
            views.push(view);
        }
        assert!(views.iter().any(|v| v.is_typing && v.input_disabled));
        assert!(!views.last().unwrap().is_typing);
    }

    #[tokio::test]
    async fn blank_prompt_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        let user = meena();
        let mut dash = dashboard(store.clone(), &user);
        assert_eq!(dash.submit("   ").await, SubmitOutcome::Ignored);
        assert!(store.list_sessions(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn anonymous_dashboard_does_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut dash = Dashboard::new(store, instant_responder(), AuthContext::anonymous());
        dash.mount().await;

        assert_eq!(dash.submit("legal help").await, SubmitOutcome::SessionUnavailable);
        assert!(dash.sessions().is_empty());
        assert_eq!(dash.view().display_name, "User");
    }

    #[tokio::test]
    async fn welcome_greets_by_display_name() {
        let store = Arc::new(MemoryStore::new());
        let user = meena();
        let dash = dashboard(store, &user);
        let welcome = dash.view().welcome.unwrap();
        assert_eq!(welcome.greeting, "Hello, Meena!");
        assert_eq!(welcome.suggestions, SUGGESTIONS);

        let nameless = CurrentUser {
            display_name: None,
            ..meena()
        };
        let dash = dashboard(Arc::new(MemoryStore::new()), &nameless);
        assert_eq!(dash.view().welcome.unwrap().greeting, "Hello!");
    }

    #[tokio::test]
    async fn change_from_another_tab_refreshes_list() {
        let store = Arc::new(MemoryStore::new());
        let user = meena();
        let mut dash = dashboard(store.clone(), &user);
        dash.mount().await;
        assert!(dash.sessions().is_empty());

        let created = store.create_session(user.id, "from phone").await.unwrap();
        dash.on_session_change(&SessionChange {
            user_id: user.id,
            session_id: created.id,
            kind: crate::realtime::ChangeKind::Insert,
        })
        .await;
        assert_eq!(dash.sessions().len(), 1);
    }

    #[tokio::test]
    async fn active_session_deleted_elsewhere_returns_to_new_chat() {
        let store = Arc::new(MemoryStore::new());
        let user = meena();
        let mut dash = dashboard(store.clone(), &user);
        dash.mount().await;
        dash.submit("legal help").await;
        let active = dash.active_session().unwrap();

        store.delete_session(user.id, active).await.unwrap();
        dash.on_session_change(&SessionChange {
            user_id: user.id,
            session_id: active,
            kind: crate::realtime::ChangeKind::Delete,
        })
        .await;

        assert_eq!(dash.active_session(), None);
        assert!(dash.messages().is_empty());
        assert!(dash.view().welcome.is_some());

        // The next prompt starts a fresh session instead of writing to the deleted one.
        let outcome = dash.submit("welfare").await;
        assert!(matches!(outcome, SubmitOutcome::Replied(_)));
        let sessions = store.list_sessions(user.id).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(store.list_messages(sessions[0].id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn sessions_stay_ordered_by_last_update() {
        let store = Arc::new(MemoryStore::new());
        let user = meena();
        let mut dash = dashboard(store.clone(), &user);
        dash.submit("legal help").await;
        dash.new_chat();
        dash.submit("welfare").await;

        let view = dash.view();
        assert_eq!(view.sessions.len(), 2);
        assert!(view
            .sessions
            .windows(2)
            .all(|pair| pair[0].updated_at >= pair[1].updated_at));
        assert_eq!(view.sessions[0].title, "welfare");
    }
}
