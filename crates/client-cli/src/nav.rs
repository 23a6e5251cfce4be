//! Client-side routing: where the dashboard currently is and who is watching.

use std::sync::Arc;

use shared::User;
use tokio::sync::watch;

/// Dashboard tabs. `Admin` is only offered to administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Overview,
    Contacts,
    Studies,
    Reservations,
    Admin,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Overview,
        Section::Contacts,
        Section::Studies,
        Section::Reservations,
        Section::Admin,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Section::Overview => "Dashboard",
            Section::Contacts => "Contacts",
            Section::Studies => "Bible Studies",
            Section::Reservations => "Rooms",
            Section::Admin => "Admin",
        }
    }

    pub fn requires_admin(self) -> bool {
        matches!(self, Section::Admin)
    }

    /// Tabs the given user may open, in display order.
    pub fn visible_for(user: Option<&User>) -> Vec<Section> {
        let admin = user.map(User::is_admin).unwrap_or(false);
        Self::ALL
            .into_iter()
            .filter(|section| admin || !section.requires_admin())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard(Section),
    ContactDetail(i64),
    /// `None` creates a new contact, `Some(id)` edits an existing one
    ContactForm(Option<i64>),
}

impl Route {
    pub fn is_login(&self) -> bool {
        matches!(self, Route::Login)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Dashboard(Section::Overview) => "/dashboard".to_string(),
            Route::Dashboard(section) => format!("/dashboard/{}", section.label().to_lowercase().replace(' ', "-")),
            Route::ContactDetail(id) => format!("/contacts/{}", id),
            Route::ContactForm(None) => "/contacts/new".to_string(),
            Route::ContactForm(Some(id)) => format!("/contacts/{}/edit", id),
        }
    }
}

/// Shared handle to the current route. Cloning shares the same route.
#[derive(Clone)]
pub struct Navigator {
    tx: Arc<watch::Sender<Route>>,
}

impl Navigator {
    pub fn new(initial: Route) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Route {
        *self.tx.borrow()
    }

    pub fn navigate(&self, route: Route) {
        let previous = self.tx.send_replace(route);
        if previous != route {
            tracing::debug!(from = %previous.path(), to = %route.path(), "Navigate");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Role;

    fn user(role: Role) -> User {
        User {
            id: 1,
            username: "jsmith".to_string(),
            email: "j@example.com".to_string(),
            role,
            full_name: "Jane Smith".to_string(),
            phone: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_admin_tab_only_for_admins() {
        let admin = user(Role::Admin);
        let member = user(Role::User);
        assert!(Section::visible_for(Some(&admin)).contains(&Section::Admin));
        assert!(!Section::visible_for(Some(&member)).contains(&Section::Admin));
        assert!(!Section::visible_for(None).contains(&Section::Admin));
        assert_eq!(Section::visible_for(Some(&member)).len(), 4);
    }

    #[test]
    fn test_navigator_shares_route() {
        let navigator = Navigator::new(Route::Dashboard(Section::Overview));
        let handle = navigator.clone();
        let rx = navigator.subscribe();

        handle.navigate(Route::ContactDetail(7));
        assert_eq!(navigator.current(), Route::ContactDetail(7));
        assert_eq!(*rx.borrow(), Route::ContactDetail(7));
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Login.path(), "/login");
        assert_eq!(Route::Dashboard(Section::Studies).path(), "/dashboard/bible-studies");
        assert_eq!(Route::ContactForm(Some(3)).path(), "/contacts/3/edit");
    }
}
