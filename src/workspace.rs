//! Role-gated entry point for a front end: ties the session to the
//! directory, form registry and mailbox, and reports every outcome through
//! the notifier/navigator ports.

use std::collections::HashMap;

use crate::auth::{validate_document, CredentialSet, DocumentKind};
use crate::config::Config;
use crate::directory::Directory;
use crate::error::{LexflowError, Result};
use crate::forms::{FormDraft, FormRegistry};
use crate::mailbox::Mailbox;
use crate::models::{FormDefinition, Identity, Message, Response, Role, Submission};
use crate::ports::{Action, Navigator, NotifyKind, Notifier, Route, Silent};
use crate::session::{Session, SessionManager};
use crate::storage::Storage;

const MIN_PASSWORD_LEN: usize = 6;
const MIN_DISPLAY_NAME_LEN: usize = 2;
const MIN_USERNAME_LEN: usize = 3;

/// Client self-registration; the identity document becomes the username.
#[derive(Debug, Clone)]
pub struct Registration {
    pub kind: DocumentKind,
    pub document: String,
    pub display_name: String,
    pub password: String,
    pub confirm: String,
}

/// Admin-initiated account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub display_name: String,
    pub password: String,
    pub role: Role,
}

pub struct Workspace {
    directory: Directory,
    forms: FormRegistry,
    mailbox: Mailbox,
    sessions: SessionManager,
    notifier: Box<dyn Notifier>,
    navigator: Box<dyn Navigator>,
}

impl Workspace {
    /// Headless workspace over `storage`; the session is restored from it.
    pub fn new(storage: Storage, credentials: CredentialSet, bcrypt_cost: u32) -> Self {
        Self {
            directory: Directory::new(storage.clone(), credentials, bcrypt_cost),
            forms: FormRegistry::new(storage.clone()),
            mailbox: Mailbox::new(storage.clone()),
            sessions: SessionManager::restore(storage),
            notifier: Box::new(Silent),
            navigator: Box::new(Silent),
        }
    }

    /// Sled-backed workspace at `config.data_dir` with the demo accounts.
    pub fn open(config: &Config) -> Result<Self> {
        let storage = Storage::open(&config.data_dir)?;
        Ok(Self::new(storage, CredentialSet::demo(), config.bcrypt_cost))
    }

    pub fn with_ports(
        mut self,
        notifier: impl Notifier + 'static,
        navigator: impl Navigator + 'static,
    ) -> Self {
        self.notifier = Box::new(notifier);
        self.navigator = Box::new(navigator);
        self
    }

    pub fn session(&self) -> &Session {
        self.sessions.current()
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<Identity> {
        let outcome = self.sessions.login(&self.directory, username, password);
        let identity = self.report(outcome, |i| format!("Welcome, {}", i.display_name))?;
        self.navigator.navigate_to(Route::Dashboard);
        Ok(identity)
    }

    pub fn logout(&mut self) -> Result<()> {
        let outcome = self.sessions.logout();
        self.report(outcome, |_| "Signed out".to_string())?;
        self.navigator.navigate_to(Route::Login);
        Ok(())
    }

    /// Register a client account and sign it in.
    pub fn register(&mut self, registration: &Registration) -> Result<Identity> {
        let outcome = self.try_register(registration);
        let identity = self.report(outcome, |_| "Registration complete. Welcome!".to_string())?;
        self.navigator.navigate_to(Route::Dashboard);
        Ok(identity)
    }

    fn try_register(&mut self, r: &Registration) -> Result<Identity> {
        let document = r.document.trim();
        validate_document(r.kind, document)?;
        check_min_len("displayName", r.display_name.trim(), MIN_DISPLAY_NAME_LEN)?;
        check_min_len("password", &r.password, MIN_PASSWORD_LEN)?;
        if r.password != r.confirm {
            return Err(LexflowError::invalid("confirm", "passwords do not match"));
        }
        let identity = self
            .directory
            .register_self(document, &r.password, r.display_name.trim())?;
        self.sessions.begin(identity.clone())?;
        Ok(identity)
    }

    pub fn create_user(&self, new_user: &NewUser) -> Result<Identity> {
        let outcome = self.require(Action::ManageUsers).and_then(|_| {
            let username = new_user.username.trim();
            check_min_len("username", username, MIN_USERNAME_LEN)?;
            check_min_len("displayName", new_user.display_name.trim(), MIN_DISPLAY_NAME_LEN)?;
            check_min_len("password", &new_user.password, MIN_PASSWORD_LEN)?;
            self.directory.create_user(
                username,
                &new_user.password,
                new_user.display_name.trim(),
                new_user.role,
            )
        });
        self.report(outcome, |i| format!("User {} created", i.username))
    }

    pub fn list_users(&self) -> Result<Vec<Identity>> {
        let outcome = self
            .require(Action::ManageUsers)
            .map(|_| self.directory.list_users());
        self.report_failure(outcome)
    }

    pub fn save_form(&self, draft: &FormDraft) -> Result<FormDefinition> {
        let outcome = self
            .require(Action::AuthorForms)
            .and_then(|_| self.forms.save_draft(draft));
        self.report(outcome, |f| format!("Form \"{}\" saved", f.name))
    }

    pub fn list_forms(&self) -> Result<Vec<FormDefinition>> {
        let outcome = self
            .require(Action::BrowseForms)
            .map(|_| self.forms.list_forms());
        self.report_failure(outcome)
    }

    pub fn get_form(&self, form_id: &str) -> Result<FormDefinition> {
        let outcome = self
            .require(Action::BrowseForms)
            .and_then(|_| self.forms.get_form(form_id));
        self.report_failure(outcome)
    }

    /// Fill `form_id` with `values` (keyed by field id) and send it to the
    /// legal inbox. The form is re-read here, so input is checked against
    /// the definition current at send time.
    pub fn send_request(&self, form_id: &str, values: &HashMap<String, String>) -> Result<Submission> {
        let outcome = self.require(Action::SendRequests).and_then(|me| {
            let form = self.forms.get_form(form_id)?;
            let payload = form.fill(values)?;
            self.mailbox
                .submit(&form.id, &form.name, &me.username, &me.display_name, payload)
        });
        let submission = self.report(outcome, |_| "Request sent to the legal team".to_string())?;
        self.navigator.navigate_to(Route::Messages);
        Ok(submission)
    }

    /// Mailbox view of the signed-in user.
    pub fn inbox(&self) -> Result<Vec<Message>> {
        let outcome = self
            .sessions
            .require("read messages")
            .map(|me| self.mailbox.list_for(me.role, &me.username));
        self.report_failure(outcome)
    }

    pub fn reply(&self, submission_id: &str, body: &str) -> Result<Response> {
        let outcome = self.require(Action::ReplyToRequests).and_then(|_| {
            let submission = self.mailbox.get_submission(submission_id)?;
            self.mailbox.reply_to(&submission, body)
        });
        self.report(outcome, |r| format!("Reply sent to {}", r.to_display))
    }

    pub fn is_answered(&self, submission_id: &str) -> bool {
        self.mailbox.is_answered(submission_id)
    }

    fn require(&self, action: Action) -> Result<&Identity> {
        let me = self.sessions.require(action.describe())?;
        if me.role.can(action) {
            Ok(me)
        } else {
            Err(LexflowError::Forbidden {
                role: me.role,
                action: action.describe(),
            })
        }
    }

    fn report<T>(&self, outcome: Result<T>, success: impl FnOnce(&T) -> String) -> Result<T> {
        match &outcome {
            Ok(value) => self.notifier.notify(NotifyKind::Success, &success(value)),
            Err(e) => self.notifier.notify(NotifyKind::Error, &e.to_string()),
        }
        outcome
    }

    /// Reads stay quiet on success.
    fn report_failure<T>(&self, outcome: Result<T>) -> Result<T> {
        if let Err(e) = &outcome {
            self.notifier.notify(NotifyKind::Error, &e.to_string());
        }
        outcome
    }
}

fn check_min_len(field: &'static str, value: &str, min: usize) -> Result<()> {
    if value.chars().count() < min {
        return Err(LexflowError::invalid(
            field,
            format!("must be at least {min} characters"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIN_BCRYPT_COST;
    use crate::forms::FieldDraft;
    use crate::models::FieldType;
    use crate::ports::Recorder;
    use std::sync::Arc;

    fn workspace() -> (Workspace, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let ws = Workspace::new(Storage::in_memory(), CredentialSet::demo(), MIN_BCRYPT_COST)
            .with_ports(recorder.clone(), recorder.clone());
        (ws, recorder)
    }

    fn registration(document: &str) -> Registration {
        Registration {
            kind: DocumentKind::Dni,
            document: document.to_string(),
            display_name: "Ana Torres".to_string(),
            password: "secreto".to_string(),
            confirm: "secreto".to_string(),
        }
    }

    #[test]
    fn test_login_errors_are_distinct_and_notified() {
        let (mut ws, recorder) = workspace();
        let unknown = ws.login("ghost", "x").unwrap_err();
        let wrong = ws.login("juez", "x").unwrap_err();
        assert_ne!(unknown.to_string(), wrong.to_string());

        ws.login("juez", "juez1").unwrap();
        let notices = recorder.notices();
        assert_eq!(notices.len(), 3);
        assert_eq!(notices[0], (NotifyKind::Error, "user `ghost` not found".to_string()));
        assert_eq!(notices[1], (NotifyKind::Error, "incorrect password for `juez`".to_string()));
        assert_eq!(notices[2].0, NotifyKind::Success);
        assert_eq!(recorder.routes(), vec![Route::Dashboard]);
    }

    #[test]
    fn test_register_validates_and_signs_in() {
        let (mut ws, _) = workspace();
        let mut bad = registration("1234");
        assert!(matches!(
            ws.register(&bad),
            Err(LexflowError::ValidationFailed { field: "document", .. })
        ));
        bad = registration("12345678");
        bad.confirm = "otra".to_string();
        assert!(matches!(
            ws.register(&bad),
            Err(LexflowError::ValidationFailed { field: "confirm", .. })
        ));
        bad = registration("12345678");
        bad.password = "corta".to_string();
        bad.confirm = "corta".to_string();
        assert!(matches!(
            ws.register(&bad),
            Err(LexflowError::ValidationFailed { field: "password", .. })
        ));
        assert_eq!(ws.session(), &Session::Anonymous);

        let ana = ws.register(&registration("12345678")).unwrap();
        assert_eq!(ana.role, Role::Client);
        assert_eq!(ws.session().identity(), Some(&ana));
        assert!(matches!(
            ws.register(&registration("12345678")),
            Err(LexflowError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn test_only_admin_manages_users() {
        let (mut ws, _) = workspace();
        let new_user = NewUser {
            username: "lucia".to_string(),
            display_name: "Lucía".to_string(),
            password: "clave123".to_string(),
            role: Role::Legal,
        };
        assert!(matches!(
            ws.create_user(&new_user),
            Err(LexflowError::NotAuthenticated { .. })
        ));
        ws.login("juez", "juez1").unwrap();
        assert_eq!(
            ws.create_user(&new_user),
            Err(LexflowError::Forbidden { role: Role::Legal, action: "manage users" })
        );

        ws.login("admin", "admin1").unwrap();
        ws.create_user(&new_user).unwrap();
        let short = NewUser { username: "lu".to_string(), ..new_user.clone() };
        assert!(matches!(
            ws.create_user(&short),
            Err(LexflowError::ValidationFailed { field: "username", .. })
        ));
        assert_eq!(ws.list_users().unwrap().len(), 1);

        ws.login("lucia", "clave123").unwrap();
        assert_eq!(ws.session().role(), Some(Role::Legal));
    }

    #[test]
    fn test_send_request_checks_current_form() {
        let (mut ws, recorder) = workspace();
        ws.login("juez", "juez1").unwrap();
        let mut draft = FormDraft::new("Consulta");
        draft.add_field(&FieldDraft::new(FieldType::Text, "Asunto").required()).unwrap();
        let form = ws.save_form(&draft).unwrap();
        let asunto = form.fields[0].id.clone();

        ws.login("prueba", "prueba").unwrap();
        assert!(matches!(ws.save_form(&draft), Err(LexflowError::Forbidden { .. })));
        assert!(ws.send_request(&form.id, &HashMap::new()).is_err());
        assert!(matches!(
            ws.send_request("missing", &HashMap::new()),
            Err(LexflowError::NotFound { entity: "form", .. })
        ));

        let values = HashMap::from([(asunto, "Despido".to_string())]);
        let sent = ws.send_request(&form.id, &values).unwrap();
        assert_eq!(sent.from, "prueba");
        assert_eq!(sent.from_display, "Cliente");
        assert_eq!(recorder.routes().last(), Some(&Route::Messages));
        assert_eq!(ws.inbox().unwrap().len(), 1);
    }

    #[test]
    fn test_admin_inbox_is_empty() {
        let (mut ws, _) = workspace();
        ws.login("admin", "admin1").unwrap();
        assert!(ws.inbox().unwrap().is_empty());
        assert!(matches!(ws.list_forms(), Err(LexflowError::Forbidden { .. })));
    }
}
