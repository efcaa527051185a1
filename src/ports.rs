//! Outbound ports to the presentation layer: user-visible notices and
//! navigation. Rendering is not this crate's concern; these only carry the
//! outcome.

use std::sync::Mutex;

use crate::models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    Users,
    FormBuilder,
    Requests,
    Messages,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Dashboard => "/dashboard",
            Route::Users => "/dashboard/usuarios",
            Route::FormBuilder => "/dashboard/formularios",
            Route::Requests => "/dashboard/solicitudes",
            Route::Messages => "/dashboard/mensajes",
        }
    }
}

/// What each role may do. Checked by `Workspace` before any role-bound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ManageUsers,
    AuthorForms,
    BrowseForms,
    SendRequests,
    ReplyToRequests,
}

impl Action {
    pub fn describe(&self) -> &'static str {
        match self {
            Action::ManageUsers => "manage users",
            Action::AuthorForms => "author forms",
            Action::BrowseForms => "browse forms",
            Action::SendRequests => "send requests",
            Action::ReplyToRequests => "reply to requests",
        }
    }
}

impl Role {
    pub fn can(&self, action: Action) -> bool {
        match self {
            Role::Admin => matches!(action, Action::ManageUsers),
            Role::Legal => matches!(
                action,
                Action::AuthorForms | Action::BrowseForms | Action::ReplyToRequests
            ),
            Role::Client => matches!(action, Action::BrowseForms | Action::SendRequests),
        }
    }

    /// Navigation entries shown to this role, in display order.
    pub fn home_sections(&self) -> &'static [Route] {
        match self {
            Role::Admin => &[Route::Dashboard, Route::Users],
            Role::Legal => &[Route::Dashboard, Route::FormBuilder, Route::Messages],
            Role::Client => &[Route::Dashboard, Route::Requests, Route::Messages],
        }
    }
}

pub trait Notifier {
    fn notify(&self, kind: NotifyKind, message: &str);
}

pub trait Navigator {
    fn navigate_to(&self, route: Route);
}

/// Discards everything. Default ports for a headless `Workspace`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Notifier for Silent {
    fn notify(&self, _kind: NotifyKind, _message: &str) {}
}

impl Navigator for Silent {
    fn navigate_to(&self, _route: Route) {}
}

/// Keeps every notice and navigation, for assertions.
#[derive(Debug, Default)]
pub struct Recorder {
    notices: Mutex<Vec<(NotifyKind, String)>>,
    routes: Mutex<Vec<Route>>,
}

impl Recorder {
    pub fn notices(&self) -> Vec<(NotifyKind, String)> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Notifier for Recorder {
    fn notify(&self, kind: NotifyKind, message: &str) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push((kind, message.to_string()));
        }
    }
}

impl Navigator for Recorder {
    fn navigate_to(&self, route: Route) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(route);
        }
    }
}

// Lets one shared recorder serve as both ports.
impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    fn notify(&self, kind: NotifyKind, message: &str) {
        (**self).notify(kind, message)
    }
}

impl<T: Navigator + ?Sized> Navigator for std::sync::Arc<T> {
    fn navigate_to(&self, route: Route) {
        (**self).navigate_to(route)
    }
}
